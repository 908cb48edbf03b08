use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};
use time::OffsetDateTime;

///
/// EventState
/// Ephemeral, in-memory counters for index operations.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Index maintenance
    pub index_inserts: u64,
    pub index_removes: u64,
    pub ordering_writes: u64,
    pub cache_invalidations: u64,
    pub cache_keys_deleted: u64,

    // Reads
    pub equality_queries: u64,
    pub paged_queries: u64,
    pub range_queries: u64,
    pub range_cache_hits: u64,
    pub keys_returned: u64,

    // Write path
    pub vetoed_writes: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub index_inserts: u64,
    pub index_removes: u64,
    pub cache_keys_deleted: u64,
    pub queries: u64,
    pub keys_returned: u64,
    pub vetoed_writes: u64,
}

///
/// EventReport
/// Point-in-time snapshot returned by `metrics_report`.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// `None` when the requested window starts after the current one.
    pub counters: Option<EventState>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot counters if the current window started at or after `window_start_ms`.
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    with_state(|m| {
        let included = window_start_ms.is_none_or(|start| start <= m.window_start_ms);

        EventReport {
            counters: included.then(|| m.clone()),
        }
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn now_millis() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}
