use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for conditions the engine absorbs instead of failing the call.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub(crate) calls: AtomicU64,
    pub(crate) store_read_failures: AtomicU64,
    pub(crate) store_write_failures: AtomicU64,
    pub(crate) store_delete_failures: AtomicU64,
    pub(crate) route_misses: AtomicU64,
    pub(crate) handler_faults: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub calls: u64,
    pub store_read_failures: u64,
    pub store_write_failures: u64,
    pub store_delete_failures: u64,
    pub route_misses: u64,
    pub handler_faults: u64,
}

impl EngineStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            store_read_failures: self.store_read_failures.load(Ordering::Relaxed),
            store_write_failures: self.store_write_failures.load(Ordering::Relaxed),
            store_delete_failures: self.store_delete_failures.load(Ordering::Relaxed),
            route_misses: self.route_misses.load(Ordering::Relaxed),
            handler_faults: self.handler_faults.load(Ordering::Relaxed),
        }
    }
}
