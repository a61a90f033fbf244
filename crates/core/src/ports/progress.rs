use crate::domain::{ProgressEvent, RepoId};
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A live progress channel endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProgressEndpoint {
    Pull(RepoId),
    Scan,
}

impl ProgressEndpoint {
    pub fn path(&self) -> String {
        match self {
            ProgressEndpoint::Pull(id) => format!("/api/repository/{}/pull/progress", id),
            ProgressEndpoint::Scan => "/api/scan/progress".to_string(),
        }
    }
}

/// Parsed, heartbeat-free events of one channel, in delivery order.
///
/// An `Err` item is a transport failure; nothing follows it.
pub type ProgressStream = BoxStream<'static, Result<ProgressEvent>>;

/// Opens live progress channels
#[async_trait]
pub trait ProgressTransport: Send + Sync {
    async fn connect(&self, endpoint: &ProgressEndpoint) -> Result<ProgressStream>;
}
