use futures::StreamExt;
use sentinel_core::ports::{ProgressEndpoint, ProgressTransport};
use sentinel_core::{ChannelId, ProgressEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One live progress connection, pumped by a background task.
///
/// The consumer sees every non-heartbeat event in delivery order. If the
/// transport fails, or the stream ends before a terminal event, it sees one
/// synthetic error instead and the pump stops.
pub struct ProgressChannel {
    id: ChannelId,
    endpoint: ProgressEndpoint,
    pump: JoinHandle<()>,
}

impl ProgressChannel {
    pub fn open<F>(
        transport: Arc<dyn ProgressTransport>,
        endpoint: ProgressEndpoint,
        id: ChannelId,
        deliver: F,
    ) -> Self
    where
        F: Fn(ProgressEvent) + Send + 'static,
    {
        debug!("Opening progress channel {} for {:?}", id, endpoint);
        let target = endpoint.clone();
        let pump = tokio::spawn(async move {
            let mut stream = match transport.connect(&target).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Progress channel {} could not connect: {}", id, e);
                    deliver(ProgressEvent::connection_failed());
                    return;
                }
            };

            while let Some(item) = stream.next().await {
                match item {
                    Ok(event) => {
                        let terminal = event.is_terminal();
                        deliver(event);
                        if terminal {
                            debug!("Progress channel {} reached a terminal event", id);
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Progress channel {} failed: {}", id, e);
                        deliver(ProgressEvent::connection_failed());
                        return;
                    }
                }
            }

            warn!("Progress channel {} ended without a terminal event", id);
            deliver(ProgressEvent::connection_failed());
        });

        Self { id, endpoint, pump }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn endpoint(&self) -> &ProgressEndpoint {
        &self.endpoint
    }

    /// Stop delivering. Safe to call any number of times.
    pub fn close(&self) {
        if !self.pump.is_finished() {
            debug!("Closing progress channel {}", self.id);
        }
        self.pump.abort();
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Holder of at most one channel for a concern
#[derive(Default)]
pub struct ChannelSlot {
    current: Option<ProgressChannel>,
}

impl ChannelSlot {
    /// Install `channel`, closing whatever was there first
    pub fn replace(&mut self, channel: ProgressChannel) {
        if let Some(previous) = self.current.take() {
            previous.close();
        }
        self.current = Some(channel);
    }

    pub fn close(&mut self) {
        if let Some(channel) = self.current.take() {
            channel.close();
        }
    }

    /// Close the held channel only if it serves `endpoint`
    pub fn close_if(&mut self, endpoint: &ProgressEndpoint) {
        if self.endpoint() == Some(endpoint) {
            self.close();
        }
    }

    /// Whether events tagged `id` come from the live channel
    pub fn is_current(&self, id: ChannelId) -> bool {
        self.current.as_ref().is_some_and(|c| c.id() == id)
    }

    pub fn id(&self) -> Option<ChannelId> {
        self.current.as_ref().map(|c| c.id())
    }

    pub fn endpoint(&self) -> Option<&ProgressEndpoint> {
        self.current.as_ref().map(|c| c.endpoint())
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }
}
