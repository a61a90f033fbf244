//! Pure state machines for server-side jobs.
//!
//! Trackers never perform I/O. Each transition returns the [`Effect`]s the
//! caller has to carry out against the live channel and the repository
//! collection.

pub mod log;
pub mod pull;
pub mod scan;

pub use log::*;
pub use pull::*;
pub use scan::*;

/// Side effects requested by a tracker transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Tear down the live channel of the tracker's concern
    CloseChannel,
    /// Refetch the repository collection
    RefreshRepositories,
    /// Empty the displayed repository collection
    ClearRepositories,
}
