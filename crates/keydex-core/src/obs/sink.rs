//! Metrics sink boundary.
//!
//! Index engine code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between engine logic
//! and the thread-local metrics state.
use crate::{db::interceptor::WriteKind, obs::metrics};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// QueryKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryKind {
    Equality,
    Paged,
    Range,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricsEvent {
    IndexInsert {
        entity: &'static str,
        ordered: bool,
    },
    IndexRemove {
        entity: &'static str,
        ordered: bool,
    },
    CacheInvalidated {
        entity: &'static str,
        keys: u64,
    },
    Query {
        entity: &'static str,
        kind: QueryKind,
        keys: u64,
    },
    RangeCacheHit {
        entity: &'static str,
    },
    Vetoed {
        entity: &'static str,
        kind: WriteKind,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::IndexInsert { entity, ordered } => {
                metrics::with_state_mut(|m| {
                    m.ops.index_inserts = m.ops.index_inserts.saturating_add(1);
                    if ordered {
                        m.ops.ordering_writes = m.ops.ordering_writes.saturating_add(1);
                    }
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.index_inserts = entry.index_inserts.saturating_add(1);
                });
            }

            MetricsEvent::IndexRemove { entity, ordered } => {
                metrics::with_state_mut(|m| {
                    m.ops.index_removes = m.ops.index_removes.saturating_add(1);
                    if ordered {
                        m.ops.ordering_writes = m.ops.ordering_writes.saturating_add(1);
                    }
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.index_removes = entry.index_removes.saturating_add(1);
                });
            }

            MetricsEvent::CacheInvalidated { entity, keys } => {
                metrics::with_state_mut(|m| {
                    m.ops.cache_invalidations = m.ops.cache_invalidations.saturating_add(1);
                    m.ops.cache_keys_deleted = m.ops.cache_keys_deleted.saturating_add(keys);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.cache_keys_deleted = entry.cache_keys_deleted.saturating_add(keys);
                });
            }

            MetricsEvent::Query { entity, kind, keys } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        QueryKind::Equality => {
                            m.ops.equality_queries = m.ops.equality_queries.saturating_add(1);
                        }
                        QueryKind::Paged => {
                            m.ops.paged_queries = m.ops.paged_queries.saturating_add(1);
                        }
                        QueryKind::Range => {
                            m.ops.range_queries = m.ops.range_queries.saturating_add(1);
                        }
                    }
                    m.ops.keys_returned = m.ops.keys_returned.saturating_add(keys);

                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.queries = entry.queries.saturating_add(1);
                    entry.keys_returned = entry.keys_returned.saturating_add(keys);
                });
            }

            MetricsEvent::RangeCacheHit { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.range_cache_hits = m.ops.range_cache_hits.saturating_add(1);
                });
            }

            MetricsEvent::Vetoed { entity, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.vetoed_writes = m.ops.vetoed_writes.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.vetoed_writes = entry.vetoed_writes.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a live `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` restores the previous slot on every exit, including
        //   unwinding, so `ptr` never outlives the borrowed sink.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start, not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state for the calling thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The pointer is installed only for this dynamic scope and `Guard`
    //   restores the previous slot on all exits.
    // - Only shared access is ever materialized from it.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}
