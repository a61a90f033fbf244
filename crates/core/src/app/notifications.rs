use crate::app::queries::CollectionView;
use crate::domain::{RepoId, Repository};
use crate::navigator::DirectoryCursor;
use crate::tracker::{LogEntry, OperationPhase, ScanPhase};

/// What the application service reports back to its front end
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The collection view changed (fetch, clear or filter change)
    RepositoriesChanged(CollectionView),

    /// Fetching the collection failed
    RepositoriesFailed { message: String },

    /// Details for the repository in the detail view
    Details(Repository),

    /// A line was appended to, or replaced, a pull log
    PullLog { id: RepoId, entry: LogEntry },

    /// A pull reached a terminal phase, or was cancelled (`Idle`)
    PullFinished { id: RepoId, phase: OperationPhase },

    ScanMessage(String),

    ScanFinished { phase: ScanPhase, error: Option<String> },

    StatusOutput { id: RepoId, output: String },

    StatusFailed { id: RepoId, message: String },

    /// The discard gate is armed; only `ConfirmDiscard` goes further
    DiscardConfirmationRequired { id: RepoId },

    DiscardCancelled { id: RepoId },

    Discarded { id: RepoId, message: String },

    DiscardFailed { id: RepoId, message: String },

    /// The navigator moved, or a failed fetch cleared its entries (`error`)
    Listing { cursor: DirectoryCursor, error: Option<String> },

    /// A navigation step was refused without any fetch
    BrowserError(String),

    /// The navigator closed on a selected directory
    PathSelected(String),

    /// Any other failure worth showing
    Error(String),
}
