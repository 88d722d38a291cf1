// src/metrics.rs
// Process-wide counters surfaced through `/readyz`. Deliberately plain
// atomics rather than a metrics-exporter crate: wiring a full exporter is
// out of this core's scope.

use std::sync::atomic::{AtomicU64, Ordering};

pub static DLQ_RECORDS: AtomicU64 = AtomicU64::new(0);
pub static FALLBACK_INVOCATIONS: AtomicU64 = AtomicU64::new(0);

pub fn record_dlq() {
    DLQ_RECORDS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_fallback() {
    FALLBACK_INVOCATIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn dlq_records() -> u64 {
    DLQ_RECORDS.load(Ordering::Relaxed)
}

pub fn fallback_invocations() -> u64 {
    FALLBACK_INVOCATIONS.load(Ordering::Relaxed)
}
