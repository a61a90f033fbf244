use async_trait::async_trait;
use reqwest::{Client, Response};
use sentinel_core::ports::RepositoryServer;
use sentinel_core::{CoreError, DirectoryListing, JobAck, RepoId, Repository, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DISCARDED_MESSAGE: &str = "Local changes discarded successfully.";

/// Error body every non-ok response is expected to carry
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    status_output: String,
}

#[derive(Debug, Deserialize)]
struct DiscardBody {
    #[serde(default)]
    message: Option<String>,
}

/// `RepositoryServer` over the server's JSON HTTP API
pub struct HttpRepositoryServer {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRepositoryServer {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }
}

pub(crate) fn transport(err: reqwest::Error) -> CoreError {
    CoreError::transport(err.to_string())
}

fn decode(err: serde_json::Error) -> CoreError {
    CoreError::Decode {
        message: err.to_string(),
    }
}

/// The body's `error` field, or `HTTP <code>` when there is none
fn rejection(code: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", code.as_u16()))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let code = response.status();
    let body = response.text().await.map_err(transport)?;
    if !code.is_success() {
        return Err(CoreError::rejected(rejection(code, &body)));
    }
    serde_json::from_str(&body).map_err(decode)
}

/// Job acknowledgments are judged by the trackers, so a non-ok response
/// becomes a rejected ack rather than an error.
async fn read_ack(response: Response) -> Result<JobAck> {
    let code = response.status();
    let body = response.text().await.map_err(transport)?;
    if !code.is_success() {
        return Ok(JobAck::rejected(rejection(code, &body)));
    }
    serde_json::from_str(&body).map_err(decode)
}

#[async_trait]
impl RepositoryServer for HttpRepositoryServer {
    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.get("/api/repositories").await
    }

    async fn repository_details(&self, id: &RepoId) -> Result<Repository> {
        self.get(&format!("/api/repository/{}", id)).await
    }

    async fn start_pull(&self, id: &RepoId) -> Result<JobAck> {
        let response = self
            .client
            .post(self.url(&format!("/api/repository/{}/pull", id)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        read_ack(response).await
    }

    async fn repository_status(&self, id: &RepoId) -> Result<String> {
        let body: StatusBody = self.get(&format!("/api/repository/{}/status", id)).await?;
        Ok(body.status_output)
    }

    async fn discard_changes(&self, id: &RepoId) -> Result<String> {
        let body: DiscardBody = self.post(&format!("/api/repository/{}/discard_changes", id)).await?;
        Ok(body
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DISCARDED_MESSAGE.to_string()))
    }

    async fn start_scan(&self, path: &str, depth: u32) -> Result<JobAck> {
        let depth = depth.to_string();
        let response = self
            .client
            .get(self.url("/api/scan"))
            .query(&[("path", path), ("depth", depth.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        read_ack(response).await
    }

    async fn browse(&self, path: Option<&str>) -> Result<DirectoryListing> {
        let mut request = self
            .client
            .get(self.url("/api/browse_directories"))
            .timeout(self.timeout);
        if let Some(path) = path {
            request = request.query(&[("path", path)]);
        }
        let response = request.send().await.map_err(transport)?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server(mock: &MockServer) -> HttpRepositoryServer {
        HttpRepositoryServer::new(Client::new(), format!("{}/", mock.uri()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_list_repositories() -> anyhow::Result<()> {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "_srv_app", "name": "app", "path": "/srv/app", "last_modified": "2024-05-01T10:00:00"},
                {"id": "_srv_lib", "name": "lib", "path": "/srv/lib", "last_modified": "N/A"}
            ])))
            .mount(&mock)
            .await;

        let repos = server(&mock).list_repositories().await?;
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[1].id, RepoId::from("_srv_lib"));
        Ok(())
    }

    #[tokio::test]
    async fn test_error_body_is_used_verbatim() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/repository/nope/status"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Repository not found"})))
            .mount(&mock)
            .await;

        let err = server(&mock).repository_status(&RepoId::from("nope")).await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));
        assert_eq!(err.to_string(), "Repository not found");
    }

    #[tokio::test]
    async fn test_error_without_body_uses_status_code() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/repositories"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock)
            .await;

        let err = server(&mock).list_repositories().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_pull_rejection_becomes_ack() -> anyhow::Result<()> {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/repository/app/pull"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "locked"})))
            .mount(&mock)
            .await;

        let ack = server(&mock).start_pull(&RepoId::from("app")).await?;
        assert!(!ack.pull_accepted());
        assert_eq!(ack.rejection_message("fallback"), "locked");
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_sends_path_and_depth() -> anyhow::Result<()> {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/scan"))
            .and(query_param("path", "/srv/code"))
            .and(query_param("depth", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "started",
                "message": "Scan started for /srv/code with max depth 3",
                "listen_url": "/api/scan/progress"
            })))
            .expect(1)
            .mount(&mock)
            .await;

        let ack = server(&mock).start_scan("/srv/code", 3).await?;
        assert!(ack.scan_accepted());
        Ok(())
    }

    #[tokio::test]
    async fn test_browse_root_and_path() -> anyhow::Result<()> {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/browse_directories"))
            .and(query_param("path", "/srv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "code", "path": "/srv/code", "type": "directory"}],
                "current_path": "/srv",
                "parent_path": "/"
            })))
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/browse_directories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "srv", "path": "/srv", "type": "directory"}],
                "current_path": "/",
                "parent_path": null
            })))
            .mount(&mock)
            .await;

        let server = server(&mock);
        let root = server.browse(None).await?;
        assert_eq!(root.items[0].path, "/srv");

        let listing = server.browse(Some("/srv")).await?;
        assert_eq!(listing.current_path.as_deref(), Some("/srv"));
        assert_eq!(listing.items[0].name, "code");
        Ok(())
    }

    #[tokio::test]
    async fn test_discard_falls_back_to_default_message() -> anyhow::Result<()> {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/repository/app/discard_changes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&mock)
            .await;

        let message = server(&mock).discard_changes(&RepoId::from("app")).await?;
        assert_eq!(message, DISCARDED_MESSAGE);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let server = HttpRepositoryServer::new(Client::new(), "http://127.0.0.1:9", Duration::from_secs(2));
        let err = server.list_repositories().await.unwrap_err();
        assert!(matches!(err, CoreError::Transport { .. }));
    }
}
