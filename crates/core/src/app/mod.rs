pub mod commands;
pub mod notifications;
pub mod queries;

pub use commands::*;
pub use notifications::*;
pub use queries::*;
