use serde::Deserialize;

/// Synchronous acknowledgment of a job-initiation request (pull or scan)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobAck {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            status: Some("rejected".to_string()),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Whether a pull was started, or one was already running for the repository
    pub fn pull_accepted(&self) -> bool {
        matches!(self.status.as_deref(), Some("started") | Some("already_pulling"))
    }

    /// Whether a scan was started, or the server is already scanning
    pub fn scan_accepted(&self) -> bool {
        matches!(self.status.as_deref(), Some("started") | Some("already_scanning"))
    }

    /// The server's `error` verbatim, or `fallback`
    pub fn rejection_message(&self, fallback: &str) -> String {
        self.error
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}
