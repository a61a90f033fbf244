pub mod server;
pub mod progress;
pub mod persistence;
pub mod time;

// Re-exports
pub use server::*;
pub use progress::*;
pub use persistence::*;
pub use time::*;
