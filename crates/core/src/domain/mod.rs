pub mod repo;
pub mod progress;
pub mod job;
pub mod browse;
pub mod events;

// Re-exports for convenience
pub use repo::*;
pub use progress::*;
pub use job::*;
pub use browse::*;
pub use events::*;
