use super::Effect;
use crate::domain::{JobAck, ProgressEvent};
use crate::error::{CoreError, Result};

pub const EMPTY_SCAN_PATH_MESSAGE: &str = "Please enter a directory path to scan";
pub const SCAN_STARTED_MESSAGE: &str = "Scan started";
pub const SCAN_COMPLETED_MESSAGE: &str = "Scan completed";
pub const SCAN_FAILED_MESSAGE: &str = "Error during scan";
pub const SCAN_REJECTED_MESSAGE: &str = "Error starting scan";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanState {
    pub phase: ScanPhase,
    pub messages: Vec<String>,
    pub error: Option<String>,
}

/// The global filesystem-scan state machine (the server runs one scan at a time)
#[derive(Debug, Default)]
pub struct ScanTracker {
    state: ScanState,
}

impl ScanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `path` and reset for a new scan.
    ///
    /// A blank path fails here, before any request or channel is opened.
    pub fn start(&mut self, path: &str) -> Result<Vec<Effect>> {
        if path.trim().is_empty() {
            self.state = ScanState {
                phase: ScanPhase::Error,
                messages: Vec::new(),
                error: Some(EMPTY_SCAN_PATH_MESSAGE.to_string()),
            };
            return Err(CoreError::validation(EMPTY_SCAN_PATH_MESSAGE));
        }

        self.state = ScanState {
            phase: ScanPhase::Running,
            messages: Vec::new(),
            error: None,
        };
        Ok(vec![Effect::ClearRepositories])
    }

    pub fn advance(&mut self, event: &ProgressEvent) -> Vec<Effect> {
        if self.state.phase != ScanPhase::Running {
            return Vec::new();
        }

        match event {
            ProgressEvent::Started(detail) => {
                let text = detail.scan_text().unwrap_or(SCAN_STARTED_MESSAGE);
                self.state.messages.push(text.to_string());
                Vec::new()
            }
            ProgressEvent::Progress(detail) | ProgressEvent::Running(detail) => {
                if let Some(text) = detail.scan_text() {
                    self.state.messages.push(text.to_string());
                }
                Vec::new()
            }
            ProgressEvent::Completed(detail) => {
                let text = detail
                    .summary()
                    .or(detail.progress_message.as_deref())
                    .unwrap_or(SCAN_COMPLETED_MESSAGE);
                self.state.messages.push(text.to_string());
                self.state.phase = ScanPhase::Completed;
                vec![Effect::CloseChannel, Effect::RefreshRepositories]
            }
            ProgressEvent::Error(detail) => {
                let text = detail
                    .summary()
                    .or(detail.scan_text())
                    .unwrap_or(SCAN_FAILED_MESSAGE)
                    .to_string();
                self.fail(text)
            }
            ProgressEvent::Other(_) => Vec::new(),
        }
    }

    pub fn acknowledge(&mut self, ack: &JobAck) -> Vec<Effect> {
        if ack.scan_accepted() {
            return Vec::new();
        }
        self.fail(ack.rejection_message(SCAN_REJECTED_MESSAGE))
    }

    pub fn request_failed(&mut self, message: &str) -> Vec<Effect> {
        self.fail(format!("Error: {}", message))
    }

    fn fail(&mut self, message: String) -> Vec<Effect> {
        if self.state.phase != ScanPhase::Running {
            return Vec::new();
        }
        self.state.phase = ScanPhase::Error;
        self.state.error = Some(message);
        vec![Effect::CloseChannel]
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.phase == ScanPhase::Running
    }
}
