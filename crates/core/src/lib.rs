//! Sentinel Core - Pure domain logic with no I/O
//!
//! This crate contains the operation trackers, the directory navigator, the
//! repository view-model and the ports (interfaces) they are driven through.
//! It has no dependencies on HTTP clients, async runtimes or terminals - those
//! are handled by adapters in the app crate.

pub mod domain;
pub mod ports;
pub mod app;
pub mod error;
pub mod tracker;
pub mod navigator;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
