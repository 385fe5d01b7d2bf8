//! Background batching worker.
//!
//! Pulls events off the bounded queue and delivers them to the sink in
//! batches of `batch_size`, or whatever has accumulated when the flush
//! interval elapses. The worker exits after draining the queue once the
//! sender side is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::telemetry::emitter::Counters;
use crate::telemetry::events::UsageEvent;
use crate::telemetry::sink::TelemetrySink;

pub(super) async fn run(
    mut rx: mpsc::Receiver<UsageEvent>,
    sink: Arc<dyn TelemetrySink>,
    counters: Arc<Counters>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let mut batch: Vec<UsageEvent> = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => {
                    counters.note_dequeued();
                    batch.push(event);
                    if batch.len() >= batch_size {
                        flush(&sink, &mut batch, &counters).await;
                    }
                }
                None => {
                    flush(&sink, &mut batch, &counters).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                flush(&sink, &mut batch, &counters).await;
            }
        }
    }
}

async fn flush(sink: &Arc<dyn TelemetrySink>, batch: &mut Vec<UsageEvent>, counters: &Counters) {
    if batch.is_empty() {
        return;
    }
    let events = std::mem::take(batch);
    if let Err(err) = sink.deliver(&events).await {
        counters.note_error();
        tracing::warn!(
            target: "telemetry",
            error = %err,
            batch_len = events.len(),
            "telemetry sink delivery failed"
        );
    }
}
