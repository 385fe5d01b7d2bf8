//! Telemetry sink abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::telemetry::events::UsageEvent;

/// Destination for batched usage events.
///
/// Implementations should be lightweight; delivery runs on the batching
/// worker, never on the request path. Delivery failures are counted by
/// the emitter and never surfaced to callers.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Delivers one batch of events.
    async fn deliver(&self, events: &[UsageEvent]) -> Result<()>;
}

/// Sink that writes each event as structured JSON to the `telemetry`
/// tracing target. The default for operator deployments.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

#[async_trait]
impl TelemetrySink for TracingSink {
    async fn deliver(&self, events: &[UsageEvent]) -> Result<()> {
        for event in events {
            match serde_json::to_string(event) {
                Ok(json) => tracing::info!(target: "telemetry", event = %json, "usage_event"),
                Err(err) => tracing::warn!(target: "telemetry", error = %err, "unserializable usage event"),
            }
        }
        Ok(())
    }
}

/// Sink that captures events in memory for test assertions.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<UsageEvent>>,
}

impl MemorySink {
    /// Creates an empty capture sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<UsageEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns the number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Returns true when nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    async fn deliver(&self, events: &[UsageEvent]) -> Result<()> {
        if let Ok(mut guard) = self.events.lock() {
            guard.extend_from_slice(events);
        }
        Ok(())
    }
}
