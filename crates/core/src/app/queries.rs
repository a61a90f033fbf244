use crate::domain::{RepoId, Repository};
use crate::tracker::PullTracker;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Order of the collection view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    /// Most recently modified first
    Modified,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "modified" => Ok(SortKey::Modified),
            other => Err(format!("unknown sort key '{}', expected 'name' or 'modified'", other)),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Name => f.write_str("name"),
            SortKey::Modified => f.write_str("modified"),
        }
    }
}

/// One repository as the list shows it
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryRow {
    pub repository: Repository,
    /// A pull for this repository is in flight, from either trigger surface
    pub busy: bool,
    /// Modified in the last 24 hours
    pub is_new: bool,
    pub modified_ago: Option<String>,
}

/// Filtered, sorted projection of the repository collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionView {
    pub rows: Vec<RepositoryRow>,
    pub total: usize,
    pub loading: bool,
}

impl CollectionView {
    pub fn shown(&self) -> usize {
        self.rows.len()
    }

    pub fn summary(&self) -> String {
        format!("Showing {} of {} repositories", self.shown(), self.total)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusView {
    pub loading: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

/// Confirmation gate in front of the destructive discard call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscardGate {
    pub pending_confirmation: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// State of the open detail view
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub repo_id: RepoId,
    pub status: StatusView,
    pub discard: DiscardGate,
}

impl DetailView {
    pub fn new(repo_id: RepoId) -> Self {
        Self {
            repo_id,
            status: StatusView::default(),
            discard: DiscardGate::default(),
        }
    }
}

/// Read-only projection of application state for front-end consumption
#[derive(Debug, Default)]
pub struct ReadProjection {
    /// The collection; only ever replaced wholesale
    pub repositories: Vec<Repository>,

    /// Whether a collection fetch is in flight
    pub loading: bool,

    pub query: String,
    pub sort: SortKey,

    /// The selected repository's detail view, if open
    pub detail: Option<DetailView>,

    /// Last directory picked in the browser
    pub scan_path: Option<String>,

    /// Bumped by every fetch and every clear; older fetch replies are stale
    generation: u64,
}

impl ReadProjection {
    pub fn new(sort: SortKey) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn replace_repositories(&mut self, repositories: Vec<Repository>) {
        self.repositories = repositories;
        self.loading = false;
    }

    /// Empty the collection and orphan any fetch still in flight
    pub fn clear_repositories(&mut self) {
        self.generation += 1;
        self.repositories.clear();
        self.loading = false;
    }

    /// Mark a collection fetch in flight; its reply must carry the returned generation
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.generation
    }

    /// Install a fetch reply. Returns false, changing nothing, when it is stale.
    pub fn apply_fetch(&mut self, generation: u64, repositories: Vec<Repository>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.replace_repositories(repositories);
        true
    }

    /// Settle a failed fetch. Returns false when it is stale.
    pub fn fetch_failed(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.loading = false;
        true
    }

    pub fn selected(&self) -> Option<&RepoId> {
        self.detail.as_ref().map(|d| &d.repo_id)
    }

    /// The detail view, if it belongs to `id`
    pub fn detail_for(&mut self, id: &RepoId) -> Option<&mut DetailView> {
        self.detail.as_mut().filter(|d| &d.repo_id == id)
    }

    /// Stamp the transient discard result on the repository record
    pub fn record_discard(&mut self, id: &RepoId, message: &str) {
        if let Some(repo) = self.repositories.iter_mut().find(|r| &r.id == id) {
            repo.last_discard_message = Some(message.to_string());
        }
    }

    pub fn find(&self, id: &RepoId) -> Option<&Repository> {
        self.repositories.iter().find(|r| &r.id == id)
    }

    /// Derive the collection view from the current filter, sort and pull state
    pub fn project(&self, pulls: &PullTracker, now: NaiveDateTime) -> CollectionView {
        let selected = self.selected();
        let rows = filter_and_sort(&self.repositories, &self.query, self.sort)
            .into_iter()
            .map(|repo| {
                let detail_busy = selected == Some(&repo.id) && pulls.is_busy(&repo.id);
                let modified = repo.modified_at();
                RepositoryRow {
                    busy: pulls.is_quick_busy(&repo.id) || detail_busy,
                    is_new: modified.is_some_and(|at| at > now - Duration::hours(24)),
                    modified_ago: modified.map(|at| format_time_ago(at, now)),
                    repository: repo.clone(),
                }
            })
            .collect();

        CollectionView {
            rows,
            total: self.repositories.len(),
            loading: self.loading,
        }
    }
}

/// Case-insensitive substring match on name or path, then `sort`
pub fn filter_and_sort<'a>(repositories: &'a [Repository], query: &str, sort: SortKey) -> Vec<&'a Repository> {
    let needle = query.trim().to_lowercase();
    let mut matched: Vec<&Repository> = repositories
        .iter()
        .filter(|r| {
            needle.is_empty()
                || r.name.to_lowercase().contains(&needle)
                || r.path.to_lowercase().contains(&needle)
        })
        .collect();

    match sort {
        SortKey::Name => matched.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        }),
        SortKey::Modified => matched.sort_by(|a, b| match (a.modified_at(), b.modified_at()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
    matched
}

/// Short relative age: "Just now", "5m ago", "3h ago", "2d ago", else the date
pub fn format_time_ago(at: NaiveDateTime, now: NaiveDateTime) -> String {
    let secs = (now - at).num_seconds();
    match secs {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 604_800 => format!("{}d ago", s / 86_400),
        _ => at.format("%Y-%m-%d").to_string(),
    }
}
