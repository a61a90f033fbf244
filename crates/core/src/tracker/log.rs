use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Info,
    Success,
    Error,
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LogStatus::Info => "info",
            LogStatus::Success => "success",
            LogStatus::Error => "error",
        };
        f.pad(label)
    }
}

/// One line of an operation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub time: String,
    pub message: String,
    pub status: LogStatus,
}

impl LogEntry {
    pub fn new(time: impl Into<String>, message: impl Into<String>, status: LogStatus) -> Self {
        Self {
            time: time.into(),
            message: message.into(),
            status,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != LogStatus::Info
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {:<7} {}", self.time, self.status, self.message)
    }
}
