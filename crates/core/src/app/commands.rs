use crate::app::queries::SortKey;
use crate::domain::{DirectoryEntry, RepoId};
use crate::tracker::PullTrigger;

/// Commands that can be sent to the application service
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Refetch the repository collection
    LoadRepositories,

    /// Change the filter and sort of the collection view
    SetFilter { query: String, sort: SortKey },

    /// Open the detail view of a repository, selecting it
    OpenDetails { id: RepoId },

    /// Close the detail view; cancels its pull tracking
    CloseDetails,

    /// Start a pull, from the list (`Quick`) or the detail view
    Pull { id: RepoId, trigger: PullTrigger },

    /// Fetch `git status` output for the repository in the detail view
    FetchStatus { id: RepoId },

    /// Arm the discard confirmation gate
    RequestDiscard { id: RepoId },

    /// Go ahead with the armed discard
    ConfirmDiscard,

    /// Disarm the gate without touching the server
    CancelDiscard,

    /// Start a filesystem scan
    StartScan { path: String, depth: u32 },

    OpenBrowser,
    Descend { entry: DirectoryEntry },
    Ascend,
    SelectDirectory,
    RetryListing,
    CloseBrowser,

    /// Quit the application
    Quit,
}
