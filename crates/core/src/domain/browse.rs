use serde::{Deserialize, Serialize};

/// Path the server uses for the virtual root of the directory browser
pub const VIRTUAL_ROOT_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl DirectoryEntry {
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// One page of `GET /api/browse_directories`, as the server sends it
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectoryListing {
    #[serde(default)]
    pub items: Vec<DirectoryEntry>,
    #[serde(default)]
    pub current_path: Option<String>,
    #[serde(default)]
    pub parent_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_deserializes() {
        let json = r#"{
            "current_path": "/srv/code",
            "parent_path": "/",
            "items": [
                {"name": "app", "path": "/srv/code/app", "type": "directory"},
                {"name": "notes.txt", "path": "/srv/code/notes.txt", "type": "file"}
            ]
        }"#;
        let listing: DirectoryListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.items.len(), 2);
        assert!(listing.items[0].is_directory());
        assert!(!listing.items[1].is_directory());
        assert_eq!(listing.parent_path.as_deref(), Some(VIRTUAL_ROOT_PATH));
    }
}
