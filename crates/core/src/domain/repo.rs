use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Server-assigned repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(pub String);

impl RepoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A configured remote of a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remote {
    #[serde(default)]
    pub name: Option<String>,
    /// The detail endpoint reports this as `url`
    #[serde(default, alias = "url")]
    pub fetch_url: Option<String>,
}

/// A server-tracked Git repository.
///
/// The collection replaces these wholesale; only `last_discard_message` is
/// ever written in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub current_branch: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// ISO-8601 local time, or "N/A" when the server could not stat the directory
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub remotes: Vec<Remote>,
    #[serde(skip)]
    pub last_discard_message: Option<String>,
}

impl Repository {
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: RepoId::new(id),
            name: name.into(),
            path: path.into(),
            current_branch: None,
            status: None,
            last_modified: String::new(),
            remotes: Vec::new(),
            last_discard_message: None,
        }
    }

    pub fn with_last_modified(mut self, last_modified: impl Into<String>) -> Self {
        self.last_modified = last_modified.into();
        self
    }

    /// Parsed modification time, if the server sent a usable timestamp
    pub fn modified_at(&self) -> Option<NaiveDateTime> {
        let raw = self.last_modified.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Local).naive_local());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }

    /// Fetch URL of the first remote
    pub fn primary_remote_url(&self) -> Option<&str> {
        self.remotes.first().and_then(|r| r.fetch_url.as_deref())
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}
