use async_trait::async_trait;
use eventsource_stream::{Event as SseEvent, EventStream};
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use sentinel_core::ports::{ProgressEndpoint, ProgressStream, ProgressTransport};
use sentinel_core::{CoreError, ProgressEvent, Result};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::http::transport;

/// `ProgressTransport` over the server's server-sent-event endpoints
pub struct SseProgressTransport {
    client: Client,
    base_url: String,
    idle_timeout: Option<Duration>,
}

impl SseProgressTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            idle_timeout: None,
        }
    }

    /// Fail a channel that stays silent for `timeout`. Heartbeats count as traffic.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

#[async_trait]
impl ProgressTransport for SseProgressTransport {
    async fn connect(&self, endpoint: &ProgressEndpoint) -> Result<ProgressStream> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        debug!("Connecting to progress stream {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(CoreError::transport(format!("HTTP {}", response.status().as_u16())));
        }

        let events = Box::pin(EventStream::new(response.bytes_stream()));
        Ok(progress_events(events, self.idle_timeout).boxed())
    }
}

/// Turn raw SSE messages into progress events.
///
/// Heartbeats and undecodable messages are dropped here. A transport error or
/// an idle timeout yields one `Err` and ends the stream.
pub fn progress_events<S, E>(
    events: S,
    idle_timeout: Option<Duration>,
) -> impl Stream<Item = Result<ProgressEvent>> + Send
where
    S: Stream<Item = std::result::Result<SseEvent, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    stream::unfold(Some(events), move |state| async move {
        let mut events = state?;
        loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, events.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let message = format!("No progress traffic for {}s", limit.as_secs());
                        return Some((Err(CoreError::transport(message)), None));
                    }
                },
                None => events.next().await,
            };

            match next {
                Some(Ok(message)) => match ProgressEvent::parse(&message.data) {
                    Ok(Some(event)) => return Some((Ok(event), Some(events))),
                    Ok(None) => trace!("heartbeat"),
                    Err(e) => warn!("Skipping progress message: {}, data: {}", e, message.data),
                },
                Some(Err(e)) => return Some((Err(CoreError::transport(e.to_string())), None)),
                None => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::RepoId;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(events: &[&str]) -> String {
        events.iter().map(|event| format!("data: {}\n\n", event)).collect()
    }

    async fn collect(transport: &SseProgressTransport, endpoint: ProgressEndpoint) -> Vec<Result<ProgressEvent>> {
        let stream = transport.connect(&endpoint).await.unwrap();
        stream.collect().await
    }

    #[tokio::test]
    async fn test_pull_stream_swallows_heartbeats() {
        let mock = MockServer::start().await;
        let body = sse_body(&[
            r#"{"status": "heartbeat", "repo_id": "app"}"#,
            r#"{"status": "started", "repo_id": "app"}"#,
            r#"{"status": "progress", "update": {"message": "Fetching"}}"#,
            r#"{"status": "heartbeat", "repo_id": "app"}"#,
            r#"{"status": "completed", "message": "Done"}"#,
        ]);
        Mock::given(method("GET"))
            .and(path("/api/repository/app/pull/progress"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .insert_header("content-type", "text/event-stream"),
            )
            .mount(&mock)
            .await;

        let transport = SseProgressTransport::new(Client::new(), mock.uri());
        let events: Vec<ProgressEvent> = collect(&transport, ProgressEndpoint::Pull(RepoId::from("app")))
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(
            events.iter().map(|e| e.status()).collect::<Vec<_>>(),
            vec!["started", "progress", "completed"]
        );
        assert_eq!(events[2], ProgressEvent::completed("Done"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_skipped() {
        let mock = MockServer::start().await;
        let body = sse_body(&["not json", r#"{"status": "error", "message": "Access denied"}"#]);
        Mock::given(method("GET"))
            .and(path("/api/scan/progress"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock)
            .await;

        let transport = SseProgressTransport::new(Client::new(), mock.uri());
        let events = collect(&transport, ProgressEndpoint::Scan).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &ProgressEvent::error("Access denied"));
    }

    #[tokio::test]
    async fn test_non_ok_connect_fails() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/scan/progress"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock)
            .await;

        let transport = SseProgressTransport::new(Client::new(), mock.uri());
        let err = transport.connect(&ProgressEndpoint::Scan).await.err().unwrap();
        assert!(matches!(err, CoreError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_idle_stream_times_out() {
        let silent = Box::pin(stream::pending::<std::result::Result<SseEvent, String>>());
        let mut events = Box::pin(progress_events(silent, Some(Duration::from_millis(20))));

        let first = events.next().await.unwrap();
        assert!(matches!(first, Err(CoreError::Transport { .. })));
        assert!(events.next().await.is_none());
    }
}
