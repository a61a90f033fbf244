use super::{Effect, LogEntry, LogStatus};
use crate::domain::{JobAck, ProgressEvent, RepoId};
use crate::ports::{Clock, SystemClock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const PULL_STARTED_MESSAGE: &str = "Pull operation started";
pub const PULL_COMPLETED_MESSAGE: &str = "Pull completed successfully";
pub const PULL_FAILED_MESSAGE: &str = "Error during pull";
pub const PULL_REJECTED_MESSAGE: &str = "Error initiating pull";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Completed,
    Error,
}

impl OperationPhase {
    pub fn is_active(self) -> bool {
        matches!(self, OperationPhase::Starting | OperationPhase::Running)
    }
}

/// Tracked state of the single pull operation of one repository
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationState {
    pub phase: OperationPhase,
    pub logs: Vec<LogEntry>,
    /// True exactly while `phase` is starting or running
    pub busy: bool,
}

/// Where a pull was triggered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullTrigger {
    /// The per-repository button in the list; only flags the repository busy
    Quick,
    /// The detail view; also wipes the repository's previous log
    Detailed,
}

/// Per-repository pull state machine.
///
/// States exist only between a trigger and the close of the repository's
/// detail view. Events for repositories without state are ignored.
pub struct PullTracker {
    clock: Arc<dyn Clock>,
    operations: HashMap<RepoId, OperationState>,
    quick: HashSet<RepoId>,
}

impl PullTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            operations: HashMap::new(),
            quick: HashSet::new(),
        }
    }

    /// Begin tracking a pull. Callers must not trigger while `is_busy(id)`.
    pub fn start(&mut self, id: &RepoId, trigger: PullTrigger) {
        let state = self.operations.entry(id.clone()).or_default();
        state.phase = OperationPhase::Starting;
        state.busy = true;

        match trigger {
            PullTrigger::Quick => {
                self.quick.insert(id.clone());
            }
            PullTrigger::Detailed => {
                state.logs.clear();
            }
        }
    }

    /// Apply one channel event for `id`
    pub fn advance(&mut self, id: &RepoId, event: &ProgressEvent) -> Vec<Effect> {
        let time = self.clock.wall_time();
        let Some(state) = self.operations.get_mut(id) else {
            return Vec::new();
        };
        if !state.phase.is_active() {
            return Vec::new();
        }

        match event {
            ProgressEvent::Started(_) => {
                // A repeated `started` resets the log the same way the first one does
                state.phase = OperationPhase::Running;
                state.logs = vec![LogEntry::new(time, PULL_STARTED_MESSAGE, LogStatus::Info)];
                Vec::new()
            }
            ProgressEvent::Progress(detail) | ProgressEvent::Running(detail) => {
                state.phase = OperationPhase::Running;
                if let Some(text) = detail.pull_text() {
                    state.logs.push(LogEntry::new(time, text, LogStatus::Info));
                }
                Vec::new()
            }
            ProgressEvent::Completed(detail) => {
                let message = detail.summary().unwrap_or(PULL_COMPLETED_MESSAGE);
                state.logs.push(LogEntry::new(time, message, LogStatus::Success));
                state.phase = OperationPhase::Completed;
                state.busy = false;
                self.quick.remove(id);
                vec![Effect::CloseChannel, Effect::RefreshRepositories]
            }
            ProgressEvent::Error(detail) => {
                let message = detail.summary().unwrap_or(PULL_FAILED_MESSAGE).to_string();
                self.fail(id, message)
            }
            ProgressEvent::Other(_) => Vec::new(),
        }
    }

    /// Fold the initiation request's acknowledgment into the state
    pub fn acknowledge(&mut self, id: &RepoId, ack: &JobAck) -> Vec<Effect> {
        if ack.pull_accepted() {
            return Vec::new();
        }
        self.fail(id, ack.rejection_message(PULL_REJECTED_MESSAGE))
    }

    /// The initiation request could not be completed at all
    pub fn request_failed(&mut self, id: &RepoId, message: &str) -> Vec<Effect> {
        self.fail(id, format!("Error: {}", message))
    }

    /// Forget everything about `id`, whatever its phase
    pub fn close(&mut self, id: &RepoId) -> Vec<Effect> {
        self.operations.remove(id);
        self.quick.remove(id);
        vec![Effect::CloseChannel]
    }

    fn fail(&mut self, id: &RepoId, message: String) -> Vec<Effect> {
        let time = self.clock.wall_time();
        let Some(state) = self.operations.get_mut(id) else {
            return Vec::new();
        };
        if !state.phase.is_active() {
            return Vec::new();
        }

        state.logs.push(LogEntry::new(time, message, LogStatus::Error));
        state.phase = OperationPhase::Error;
        state.busy = false;
        self.quick.remove(id);
        vec![Effect::CloseChannel]
    }

    pub fn state(&self, id: &RepoId) -> Option<&OperationState> {
        self.operations.get(id)
    }

    pub fn phase(&self, id: &RepoId) -> OperationPhase {
        self.operations.get(id).map(|s| s.phase).unwrap_or_default()
    }

    pub fn logs(&self, id: &RepoId) -> &[LogEntry] {
        self.operations.get(id).map(|s| s.logs.as_slice()).unwrap_or(&[])
    }

    pub fn is_busy(&self, id: &RepoId) -> bool {
        self.operations.get(id).is_some_and(|s| s.busy)
    }

    /// Busy flag raised by a quick trigger
    pub fn is_quick_busy(&self, id: &RepoId) -> bool {
        self.quick.contains(id)
    }

    pub fn tracked(&self) -> usize {
        self.operations.len()
    }
}

impl Default for PullTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
