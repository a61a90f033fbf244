use super::{
    browse::DirectoryListing,
    job::JobAck,
    progress::ProgressEvent,
    repo::{RepoId, Repository},
};

/// Generation number of a live progress channel.
///
/// Every open gets a fresh id, so events still in flight from a closed or
/// replaced channel can be told apart from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a request as it travels over the event bus
pub type Outcome<T> = std::result::Result<T, String>;

/// Events flowing over the coordinator's internal bus
#[derive(Debug, Clone)]
pub enum Event {
    /// The repository collection was fetched; `generation` is the projection's fetch stamp
    RepositoriesLoaded { generation: u64, result: Outcome<Vec<Repository>> },

    /// Live details for the repository in the detail view
    DetailsLoaded { id: RepoId, result: Outcome<Repository> },

    /// The pull initiation request returned; `channel` identifies the attempt it belongs to
    PullAcknowledged { id: RepoId, channel: ChannelId, result: Outcome<JobAck> },

    /// An event arrived on the pull channel
    PullProgress { id: RepoId, channel: ChannelId, event: ProgressEvent },

    /// The scan initiation request returned
    ScanAcknowledged { result: Outcome<JobAck> },

    /// An event arrived on the scan channel
    ScanProgress { channel: ChannelId, event: ProgressEvent },

    StatusLoaded { id: RepoId, result: Outcome<String> },

    DiscardFinished { id: RepoId, result: Outcome<String> },

    /// A directory listing requested by the navigator
    ListingLoaded { ticket: u64, result: Outcome<DirectoryListing> },

    /// User requested to quit the application
    QuitRequested,
}
