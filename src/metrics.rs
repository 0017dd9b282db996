//! Process-wide persistence counters.
//! Cheap relaxed atomics; read them with [`snapshot`].
use std::sync::atomic::{AtomicU64, Ordering};

static RECORDS_LOADED: AtomicU64 = AtomicU64::new(0);
static RECORDS_PERSISTED: AtomicU64 = AtomicU64::new(0);
static PERSIST_FAILURES: AtomicU64 = AtomicU64::new(0);
static REFRESH_FAILURES: AtomicU64 = AtomicU64::new(0);
static ASSETS_RESOLVED: AtomicU64 = AtomicU64::new(0);
static ASSETS_SKIPPED: AtomicU64 = AtomicU64::new(0);

pub fn inc_records_loaded() {
    RECORDS_LOADED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_records_persisted() {
    RECORDS_PERSISTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_persist_failures() {
    PERSIST_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_refresh_failures() {
    REFRESH_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_assets_resolved() {
    ASSETS_RESOLVED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_assets_skipped() {
    ASSETS_SKIPPED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub records_loaded: u64,
    pub records_persisted: u64,
    pub persist_failures: u64,
    pub refresh_failures: u64,
    pub assets_resolved: u64,
    pub assets_skipped: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        records_loaded: RECORDS_LOADED.load(Ordering::Relaxed),
        records_persisted: RECORDS_PERSISTED.load(Ordering::Relaxed),
        persist_failures: PERSIST_FAILURES.load(Ordering::Relaxed),
        refresh_failures: REFRESH_FAILURES.load(Ordering::Relaxed),
        assets_resolved: ASSETS_RESOLVED.load(Ordering::Relaxed),
        assets_skipped: ASSETS_SKIPPED.load(Ordering::Relaxed),
    }
}
