use crate::domain::{DirectoryListing, JobAck, RepoId, Repository};
use crate::error::Result;
use async_trait::async_trait;

/// Request/response side of the repository server.
///
/// Non-ok responses come back as `CoreError::Rejected` carrying the body's
/// `error` field, except for the job-initiation calls: those return the
/// acknowledgment body whatever the status code, and the trackers decide.
#[async_trait]
pub trait RepositoryServer: Send + Sync {
    /// `GET /api/repositories`
    async fn list_repositories(&self) -> Result<Vec<Repository>>;

    /// `GET /api/repository/{id}`, the record merged with live Git details
    async fn repository_details(&self, id: &RepoId) -> Result<Repository>;

    /// `POST /api/repository/{id}/pull`
    async fn start_pull(&self, id: &RepoId) -> Result<JobAck>;

    /// `GET /api/repository/{id}/status`, returns the raw status output
    async fn repository_status(&self, id: &RepoId) -> Result<String>;

    /// `POST /api/repository/{id}/discard_changes`. Irreversible.
    async fn discard_changes(&self, id: &RepoId) -> Result<String>;

    /// `GET /api/scan?path=&depth=`
    async fn start_scan(&self, path: &str, depth: u32) -> Result<JobAck>;

    /// `GET /api/browse_directories`; `None` lists the virtual root
    async fn browse(&self, path: Option<&str>) -> Result<DirectoryListing>;
}
