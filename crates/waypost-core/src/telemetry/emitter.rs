//! Non-blocking telemetry emitter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::telemetry::batcher;
use crate::telemetry::events::UsageEvent;
use crate::telemetry::sink::TelemetrySink;

/// Tuning for the emitter queue and batching worker.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Maximum queued events before emits are dropped.
    pub queue_capacity: usize,
    /// Events per delivered batch.
    pub batch_size: usize,
    /// Maximum time an event sits in the batch buffer.
    pub flush_interval: Duration,
    /// Bound on the final drain during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 1_000,
            flush_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Emitter counters surfaced through `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TelemetryStats {
    /// Events accepted onto the queue.
    pub emitted: u64,
    /// Events dropped because the queue was full or the emitter stopped.
    pub dropped: u64,
    /// Sink delivery failures.
    pub errors: u64,
    /// Events currently queued.
    pub queue_depth: u64,
}

#[derive(Debug, Default)]
pub(super) struct Counters {
    emitted: AtomicU64,
    dropped: AtomicU64,
    errors: AtomicU64,
    queued: AtomicU64,
}

impl Counters {
    pub(super) fn note_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        self.queued.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("telemetry_events_emitted_total").increment(1);
    }

    pub(super) fn note_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("telemetry_events_dropped_total").increment(1);
    }

    pub(super) fn note_dequeued(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
    }

    pub(super) fn note_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("telemetry_sink_errors_total").increment(1);
    }
}

/// Non-blocking, best-effort usage event emitter.
///
/// [`emit`](TelemetryEmitter::emit) pushes onto a bounded queue and
/// returns immediately; when the queue is full the event is dropped and
/// counted. A background worker batches queued events and hands them to
/// the configured sink. [`stop`](TelemetryEmitter::stop) drains the
/// queue with a bounded timeout.
pub struct TelemetryEmitter {
    tx: RwLock<Option<mpsc::Sender<UsageEvent>>>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for TelemetryEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryEmitter")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl TelemetryEmitter {
    /// Starts the emitter and its batching worker.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(config: TelemetryConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(batcher::run(
            rx,
            sink,
            Arc::clone(&counters),
            config.batch_size.max(1),
            config.flush_interval,
        ));
        tracing::info!(
            queue_capacity = config.queue_capacity,
            batch_size = config.batch_size,
            "telemetry emitter started"
        );
        Self {
            tx: RwLock::new(Some(tx)),
            worker: std::sync::Mutex::new(Some(worker)),
            counters,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Emits an event without blocking.
    ///
    /// Returns true when the event was queued, false when it was dropped
    /// (queue full or emitter stopped).
    pub fn emit(&self, event: UsageEvent) -> bool {
        let guard = match self.tx.read() {
            Ok(guard) => guard,
            Err(_) => {
                self.counters.note_dropped();
                return false;
            }
        };
        let Some(tx) = guard.as_ref() else {
            self.counters.note_dropped();
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => {
                self.counters.note_emitted();
                true
            }
            Err(_) => {
                self.counters.note_dropped();
                false
            }
        }
    }

    /// Stops the emitter, draining queued events with a bounded timeout.
    ///
    /// Subsequent emits are dropped and counted.
    pub async fn stop(&self) {
        if let Ok(mut guard) = self.tx.write() {
            guard.take();
        }
        let handle = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if tokio::time::timeout(self.shutdown_timeout, handle)
                .await
                .is_err()
            {
                tracing::warn!("telemetry drain exceeded shutdown timeout");
            }
        }
        let stats = self.stats();
        tracing::info!(
            emitted = stats.emitted,
            dropped = stats.dropped,
            errors = stats.errors,
            "telemetry emitter stopped"
        );
    }

    /// Returns a snapshot of the emitter counters.
    #[must_use]
    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            queue_depth: self.counters.queued.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::events::{CallerIdentity, EventOutcome, Operation};
    use crate::telemetry::sink::MemorySink;

    fn event(moniker: &str) -> UsageEvent {
        UsageEvent::new(
            moniker,
            Operation::Resolve,
            CallerIdentity::default(),
            EventOutcome::Success,
        )
    }

    #[tokio::test]
    async fn delivers_batches_to_sink() {
        let sink = Arc::new(MemorySink::new());
        let emitter = TelemetryEmitter::start(
            TelemetryConfig {
                batch_size: 2,
                flush_interval: Duration::from_millis(10),
                ..TelemetryConfig::default()
            },
            sink.clone(),
        );

        assert!(emitter.emit(event("prices.equity/AAPL")));
        assert!(emitter.emit(event("prices.equity/MSFT")));
        assert!(emitter.emit(event("rates.sofr/usd")));
        emitter.stop().await;

        assert_eq!(sink.len(), 3);
        let stats = emitter.stats();
        assert_eq!(stats.emitted, 3);
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.queue_depth, 0);
    }

    #[tokio::test]
    async fn drops_when_queue_is_full() {
        let sink = Arc::new(MemorySink::new());
        let emitter = TelemetryEmitter::start(
            TelemetryConfig {
                queue_capacity: 1,
                // Long flush interval so the worker does not drain the
                // queue between emits.
                batch_size: 100,
                flush_interval: Duration::from_secs(60),
                ..TelemetryConfig::default()
            },
            sink.clone(),
        );

        // Fill well past capacity; at least one must be dropped and no
        // emit may block.
        let mut accepted = 0;
        for i in 0..50 {
            if emitter.emit(event(&format!("prices.equity/S{i}"))) {
                accepted += 1;
            }
        }
        let stats = emitter.stats();
        assert!(stats.dropped > 0, "expected drops, got {stats:?}");
        assert_eq!(stats.emitted, accepted);
        emitter.stop().await;
    }

    #[tokio::test]
    async fn emits_after_stop_are_dropped() {
        let sink = Arc::new(MemorySink::new());
        let emitter = TelemetryEmitter::start(TelemetryConfig::default(), sink.clone());
        emitter.stop().await;

        assert!(!emitter.emit(event("prices.equity/AAPL")));
        assert_eq!(emitter.stats().dropped, 1);
    }
}
