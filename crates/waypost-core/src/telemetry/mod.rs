//! Usage telemetry core.
//!
//! Resolution and governance operations emit [`UsageEvent`]s describing
//! who accessed which moniker and how it went. Emission is non-blocking
//! and best-effort: events land on a bounded queue, a background worker
//! batches them, and full batches (or a flush interval, whichever comes
//! first) are handed to a [`TelemetrySink`]. Producers never wait on a
//! slow sink; overflow is counted and dropped.

mod batcher;
mod emitter;
mod events;
mod sink;

pub use emitter::{TelemetryConfig, TelemetryEmitter, TelemetryStats};
pub use events::{CallerIdentity, EventOutcome, Operation, UsageEvent};
pub use sink::{MemorySink, TelemetrySink, TracingSink};
