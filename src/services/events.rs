use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::services::processor::EventPublisher;

/// Events older than this are dropped for dashboards that read too slowly.
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DashboardEvent {
    CvReceived,
    MatchesFound,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventEnvelope {
    event: DashboardEvent,
    request_id: Uuid,
    payload: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fan-out of processing events to connected dashboards.
///
/// Messages are pre-encoded JSON so every listener shares one allocation.
pub struct DashboardEvents {
    sender: broadcast::Sender<Arc<str>>,
}

impl Default for DashboardEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for DashboardEvents {
    fn publish(
        &self,
        event: DashboardEvent,
        request_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<(), EventError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }

        let message = serde_json::to_string(&EventEnvelope {
            event,
            request_id,
            payload,
        })?;
        // A send only fails when the last listener left in the meantime.
        let _ = self.sender.send(Arc::from(message));
        Ok(())
    }
}
