use crate::error::{CoreError, Result};
use serde::Deserialize;

/// Message carried by the synthetic error emitted when the live channel drops
pub const CONNECTION_FAILED_MESSAGE: &str = "Connection to progress stream failed";

/// One message as the server pushes it on a progress channel
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawProgressEvent {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub update: Option<RawUpdate>,
    /// Server-side progress snapshot; only its message is of interest
    #[serde(default)]
    pub progress: Option<RawSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawUpdate {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub message: Option<String>,
}

/// Text fields an event may carry. Empty strings are dropped at normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDetail {
    pub message: Option<String>,
    pub update_message: Option<String>,
    pub update_path: Option<String>,
    pub progress_message: Option<String>,
}

impl EventDetail {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Text for a pull log line: the update's message, else the bare message
    pub fn pull_text(&self) -> Option<&str> {
        self.update_message.as_deref().or(self.message.as_deref())
    }

    /// Text for a scan message line. The server snapshot and the scanned path
    /// win over the bare message fields.
    pub fn scan_text(&self) -> Option<&str> {
        self.progress_message
            .as_deref()
            .or(self.update_path.as_deref())
            .or(self.message.as_deref())
            .or(self.update_message.as_deref())
    }

    /// Text for a terminal line: the event's own summary first
    pub fn summary(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// A normalized, non-heartbeat event from a progress channel
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started(EventDetail),
    Progress(EventDetail),
    Running(EventDetail),
    Completed(EventDetail),
    Error(EventDetail),
    /// Status tags with no tracker meaning (`idle`, `scanning`, `pulling`, ...)
    Other(String),
}

impl ProgressEvent {
    /// Parse one channel message. Heartbeats yield `Ok(None)`.
    pub fn parse(data: &str) -> Result<Option<Self>> {
        let raw: RawProgressEvent = serde_json::from_str(data).map_err(|e| CoreError::Decode {
            message: e.to_string(),
        })?;
        Ok(raw.normalize())
    }

    pub fn started() -> Self {
        Self::Started(EventDetail::default())
    }

    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress(EventDetail::with_message(message))
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self::Completed(EventDetail::with_message(message))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(EventDetail::with_message(message))
    }

    /// The synthetic event a channel delivers when its transport fails
    pub fn connection_failed() -> Self {
        Self::error(CONNECTION_FAILED_MESSAGE)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Error(_))
    }

    pub fn status(&self) -> &str {
        match self {
            Self::Started(_) => "started",
            Self::Progress(_) => "progress",
            Self::Running(_) => "running",
            Self::Completed(_) => "completed",
            Self::Error(_) => "error",
            Self::Other(status) => status,
        }
    }
}

impl RawProgressEvent {
    /// Turn a wire event into a `ProgressEvent`, swallowing heartbeats
    pub fn normalize(self) -> Option<ProgressEvent> {
        let detail = EventDetail {
            message: non_empty(self.message),
            update_message: non_empty(self.update.as_ref().and_then(|u| u.message.clone())),
            update_path: non_empty(self.update.and_then(|u| u.path)),
            progress_message: non_empty(self.progress.and_then(|p| p.message)),
        };

        let event = match self.status.as_str() {
            "heartbeat" => return None,
            "started" => ProgressEvent::Started(detail),
            "progress" => ProgressEvent::Progress(detail),
            "running" => ProgressEvent::Running(detail),
            "completed" => ProgressEvent::Completed(detail),
            "error" => ProgressEvent::Error(detail),
            _ => ProgressEvent::Other(self.status),
        };
        Some(event)
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}
