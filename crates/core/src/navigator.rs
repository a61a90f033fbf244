//! Directory browser used to pick a scan path.
//!
//! The navigator never fetches anything itself. Every navigation hands back a
//! [`ListingRequest`]; the caller performs it and feeds the outcome back with
//! [`Navigator::apply_listing`] or [`Navigator::apply_failure`]. Outcomes whose
//! ticket is no longer the pending one are dropped.

use crate::domain::{DirectoryEntry, DirectoryListing, VIRTUAL_ROOT_PATH};
use crate::error::{CoreError, Result};

pub const NOT_OPEN_MESSAGE: &str = "Directory browser is not open";
pub const NOT_A_DIRECTORY_MESSAGE: &str = "Only directories can be opened";
pub const AT_ROOT_MESSAGE: &str = "Already at the top level";
pub const SELECT_ROOT_MESSAGE: &str = "Choose a directory inside one of the base paths";
pub const NOTHING_TO_RETRY_MESSAGE: &str = "Nothing to retry";

/// Where `ascend` leads from the current position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentPath {
    /// The list of server-configured base paths
    VirtualRoot,
    Path(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryCursor {
    /// `None` is the virtual root
    pub current_path: Option<String>,
    /// `None` only at the virtual root, which has no parent
    pub parent_path: Option<ParentPath>,
    pub entries: Vec<DirectoryEntry>,
}

impl DirectoryCursor {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.current_path.is_none()
    }

    fn from_listing(listing: DirectoryListing, requested: Option<&str>) -> Self {
        // Only a request without a path lands on the virtual root; a base path may itself be "/"
        let reported = listing.current_path;
        let current_path = requested.map(|path| reported.unwrap_or_else(|| path.to_string()));

        let parent_path = match (&current_path, listing.parent_path) {
            (None, _) => None,
            (Some(_), Some(parent)) if parent != VIRTUAL_ROOT_PATH => Some(ParentPath::Path(parent)),
            (Some(_), _) => Some(ParentPath::VirtualRoot),
        };

        Self {
            current_path,
            parent_path,
            entries: listing.items,
        }
    }
}

/// A listing the caller has to fetch. `path: None` lists the base paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub ticket: u64,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Session {
    cursor: DirectoryCursor,
    error: Option<String>,
    pending: Option<ListingRequest>,
    failed: Option<ListingRequest>,
}

/// Cursor over the server's directory tree; state lives for one open/close session
#[derive(Debug, Default)]
pub struct Navigator {
    session: Option<Session>,
    next_ticket: u64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session at the virtual root
    pub fn open(&mut self) -> ListingRequest {
        self.session = Some(Session::default());
        self.request(None)
    }

    pub fn descend(&mut self, entry: &DirectoryEntry) -> Result<ListingRequest> {
        self.session()?;
        if !entry.is_directory() {
            return Err(CoreError::validation(NOT_A_DIRECTORY_MESSAGE));
        }
        Ok(self.request(Some(entry.path.clone())))
    }

    pub fn ascend(&mut self) -> Result<ListingRequest> {
        let cursor = &self.session()?.cursor;
        if cursor.is_root() {
            return Err(CoreError::validation(AT_ROOT_MESSAGE));
        }

        let target = match &cursor.parent_path {
            Some(ParentPath::Path(parent)) => Some(parent.clone()),
            Some(ParentPath::VirtualRoot) | None => None,
        };
        Ok(self.request(target))
    }

    /// Hand back the current directory and end the session
    pub fn select_current(&mut self) -> Result<String> {
        let current = self.session()?.cursor.current_path.clone();
        match current {
            Some(path) => {
                self.close();
                Ok(path)
            }
            None => Err(CoreError::validation(SELECT_ROOT_MESSAGE)),
        }
    }

    pub fn close(&mut self) {
        self.session = None;
    }

    /// Re-issue the last request that failed
    pub fn retry(&mut self) -> Result<ListingRequest> {
        let failed = self.session()?.failed.clone();
        match failed {
            Some(request) => Ok(self.request(request.path)),
            None => Err(CoreError::validation(NOTHING_TO_RETRY_MESSAGE)),
        }
    }

    /// Install a fetched listing. Returns false when the ticket is stale.
    pub fn apply_listing(&mut self, ticket: u64, listing: DirectoryListing) -> bool {
        let Some(session) = self.session_for(ticket) else {
            return false;
        };
        let requested = session.pending.take().and_then(|r| r.path);
        session.cursor = DirectoryCursor::from_listing(listing, requested.as_deref());
        session.error = None;
        session.failed = None;
        true
    }

    /// Record a failed fetch; the position is kept, the entries are not
    pub fn apply_failure(&mut self, ticket: u64, message: impl Into<String>) -> bool {
        let Some(session) = self.session_for(ticket) else {
            return false;
        };
        session.failed = session.pending.take();
        session.error = Some(message.into());
        session.cursor.entries.clear();
        true
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.pending.is_some())
    }

    pub fn cursor(&self) -> Option<&DirectoryCursor> {
        self.session.as_ref().map(|s| &s.cursor)
    }

    pub fn error(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.error.as_deref())
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| CoreError::validation(NOT_OPEN_MESSAGE))
    }

    fn session_for(&mut self, ticket: u64) -> Option<&mut Session> {
        self.session
            .as_mut()
            .filter(|s| s.pending.as_ref().is_some_and(|p| p.ticket == ticket))
    }

    fn request(&mut self, path: Option<String>) -> ListingRequest {
        self.next_ticket += 1;
        let request = ListingRequest {
            ticket: self.next_ticket,
            path,
        };
        if let Some(session) = self.session.as_mut() {
            session.pending = Some(request.clone());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_listing() -> DirectoryListing {
        DirectoryListing {
            items: vec![
                DirectoryEntry::directory("data", "/data"),
                DirectoryEntry::directory("code", "/home/me/code"),
            ],
            current_path: Some(VIRTUAL_ROOT_PATH.to_string()),
            parent_path: None,
        }
    }

    fn data_listing() -> DirectoryListing {
        DirectoryListing {
            items: vec![
                DirectoryEntry::directory("projects", "/data/projects"),
                DirectoryEntry::file("README", "/data/README"),
            ],
            current_path: Some("/data".to_string()),
            parent_path: None,
        }
    }

    fn opened() -> Navigator {
        let mut nav = Navigator::new();
        let request = nav.open();
        assert!(nav.apply_listing(request.ticket, root_listing()));
        nav
    }

    #[test]
    fn test_open_starts_at_root() {
        let mut nav = Navigator::new();
        let request = nav.open();
        assert_eq!(request.path, None);
        assert!(nav.is_loading());

        nav.apply_listing(request.ticket, root_listing());
        let cursor = nav.cursor().unwrap();
        assert!(cursor.is_root());
        assert_eq!(cursor.parent_path, None);
        assert_eq!(cursor.entries.len(), 2);
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_descend_into_directory() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("data", "/data"))?;
        assert_eq!(request.path.as_deref(), Some("/data"));

        nav.apply_listing(request.ticket, data_listing());
        assert_eq!(nav.cursor().unwrap().current_path.as_deref(), Some("/data"));
        Ok(())
    }

    #[test]
    fn test_filesystem_root_base_path_is_selectable() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("/", "/"))?;
        nav.apply_listing(request.ticket, DirectoryListing {
            items: vec![DirectoryEntry::directory("srv", "/srv")],
            current_path: Some("/".to_string()),
            parent_path: None,
        });

        let cursor = nav.cursor().unwrap();
        assert!(!cursor.is_root());
        assert_eq!(cursor.parent_path, Some(ParentPath::VirtualRoot));
        assert_eq!(nav.ascend()?.path, None);

        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("/", "/"))?;
        nav.apply_listing(request.ticket, DirectoryListing {
            items: Vec::new(),
            current_path: Some("/".to_string()),
            parent_path: None,
        });
        assert_eq!(nav.select_current()?, "/");
        Ok(())
    }

    #[test]
    fn test_descend_rejects_files() {
        let mut nav = opened();
        let err = nav.descend(&DirectoryEntry::file("README", "/data/README")).unwrap_err();
        assert_eq!(err.to_string(), NOT_A_DIRECTORY_MESSAGE);
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_ascend_without_parent_returns_to_root() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("data", "/data"))?;
        nav.apply_listing(request.ticket, data_listing());

        let request = nav.ascend()?;
        assert_eq!(request.path, None);
        nav.apply_listing(request.ticket, root_listing());
        assert!(nav.cursor().unwrap().is_root());
        Ok(())
    }

    #[test]
    fn test_ascend_to_real_parent() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("projects", "/data/projects"))?;
        nav.apply_listing(request.ticket, DirectoryListing {
            items: Vec::new(),
            current_path: Some("/data/projects".to_string()),
            parent_path: Some("/data".to_string()),
        });

        let cursor = nav.cursor().unwrap();
        assert_eq!(cursor.parent_path, Some(ParentPath::Path("/data".to_string())));
        assert_eq!(nav.ascend()?.path.as_deref(), Some("/data"));
        Ok(())
    }

    #[test]
    fn test_base_path_parent_is_virtual_root() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("code", "/home/me/code"))?;
        nav.apply_listing(request.ticket, DirectoryListing {
            items: Vec::new(),
            current_path: Some("/home/me/code".to_string()),
            parent_path: Some(VIRTUAL_ROOT_PATH.to_string()),
        });

        assert_eq!(nav.cursor().unwrap().parent_path, Some(ParentPath::VirtualRoot));
        assert_eq!(nav.ascend()?.path, None);
        Ok(())
    }

    #[test]
    fn test_ascend_at_root_rejected() {
        let mut nav = opened();
        assert!(matches!(nav.ascend(), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn test_select_at_root_always_fails() {
        let mut nav = opened();
        let err = nav.select_current().unwrap_err();
        assert_eq!(err.to_string(), SELECT_ROOT_MESSAGE);
        assert!(nav.is_open());
    }

    #[test]
    fn test_select_returns_path_and_closes() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("data", "/data"))?;
        nav.apply_listing(request.ticket, data_listing());

        assert_eq!(nav.select_current()?, "/data");
        assert!(!nav.is_open());
        assert!(nav.cursor().is_none());
        Ok(())
    }

    #[test]
    fn test_failure_keeps_position() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("data", "/data"))?;
        nav.apply_listing(request.ticket, data_listing());

        let request = nav.descend(&DirectoryEntry::directory("projects", "/data/projects"))?;
        nav.apply_failure(request.ticket, "Permission denied");

        let cursor = nav.cursor().unwrap();
        assert_eq!(cursor.current_path.as_deref(), Some("/data"));
        assert!(cursor.entries.is_empty());
        assert_eq!(nav.error(), Some("Permission denied"));

        let retry = nav.retry()?;
        assert_eq!(retry.path.as_deref(), Some("/data/projects"));
        assert!(retry.ticket > request.ticket);
        Ok(())
    }

    #[test]
    fn test_stale_results_ignored() -> Result<()> {
        let mut nav = opened();
        let first = nav.descend(&DirectoryEntry::directory("data", "/data"))?;
        let second = nav.descend(&DirectoryEntry::directory("code", "/home/me/code"))?;

        assert!(!nav.apply_listing(first.ticket, data_listing()));
        assert!(!nav.apply_failure(first.ticket, "late"));
        assert!(nav.cursor().unwrap().is_root());
        assert!(nav.is_loading());

        nav.close();
        assert!(!nav.apply_listing(second.ticket, data_listing()));
        Ok(())
    }

    #[test]
    fn test_reopen_forgets_previous_session() -> Result<()> {
        let mut nav = opened();
        let request = nav.descend(&DirectoryEntry::directory("data", "/data"))?;
        nav.apply_listing(request.ticket, data_listing());
        nav.close();

        nav.open();
        assert!(nav.cursor().unwrap().is_root());
        assert!(nav.cursor().unwrap().entries.is_empty());
        Ok(())
    }

    #[test]
    fn test_operations_require_open_session() {
        let mut nav = Navigator::new();
        assert!(nav.ascend().is_err());
        assert!(nav.select_current().is_err());
        assert!(nav.retry().is_err());
    }
}
