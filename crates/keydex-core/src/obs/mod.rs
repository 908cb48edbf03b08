//! Observability: runtime counters and the sink abstraction.
//!
//! Engine code never touches `metrics` directly; every event flows through
//! `sink::record`. Diagnostic logging goes through `tracing` at the call site.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EventOps, EventReport, EventState};
pub use sink::{
    MetricsEvent, MetricsSink, QueryKind, metrics_report, metrics_reset_all, with_metrics_sink,
};
