//! Observability metrics for quota decisions.
//!
//! Counters are atomics behind an `Arc`, so a clone of [`Metrics`] can be read
//! from another thread (a scrape endpoint, a periodic logger) while the engine
//! that owns it keeps deciding.

use crate::domain::decision::Outcome;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking quota decisions for one engine.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Records admitted by their matched quota
    records_admitted: AtomicU64,
    /// Records admitted by a fallback allowance
    records_fallback_admitted: AtomicU64,
    /// Records discarded
    records_dropped: AtomicU64,
    /// Records redirected to the secondary destination
    records_reemitted: AtomicU64,
    /// Buckets removed from the store
    buckets_evicted: AtomicU64,
    /// Per-quota input and exceeded counters, keyed by quota name
    quotas: DashMap<Arc<str>, QuotaCounters>,
}

#[derive(Debug, Default)]
struct QuotaCounters {
    input: AtomicU64,
    exceeded: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_outcome(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Admit => &self.inner.records_admitted,
            Outcome::FallbackAdmit => &self.inner.records_fallback_admitted,
            Outcome::Drop => &self.inner.records_dropped,
            Outcome::Reemit => &self.inner.records_reemitted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record entering `quota`'s bucket.
    pub(crate) fn record_input(&self, quota: &Arc<str>) {
        self.with_quota(quota, |c| c.input.fetch_add(1, Ordering::Relaxed));
    }

    /// Record a rejection by `quota`'s bucket.
    pub(crate) fn record_exceeded(&self, quota: &Arc<str>) {
        self.with_quota(quota, |c| c.exceeded.fetch_add(1, Ordering::Relaxed));
    }

    pub(crate) fn record_eviction(&self) {
        self.inner.buckets_evicted.fetch_add(1, Ordering::Relaxed);
    }

    fn with_quota(&self, quota: &Arc<str>, f: impl FnOnce(&QuotaCounters) -> u64) {
        // Fast path avoids cloning the name once the quota has been seen.
        if let Some(counters) = self.inner.quotas.get(quota.as_ref()) {
            f(counters.value());
            return;
        }
        let counters = self.inner.quotas.entry(Arc::clone(quota)).or_default();
        f(counters.value());
    }

    pub fn records_admitted(&self) -> u64 {
        self.inner.records_admitted.load(Ordering::Relaxed)
    }

    pub fn records_fallback_admitted(&self) -> u64 {
        self.inner.records_fallback_admitted.load(Ordering::Relaxed)
    }

    pub fn records_dropped(&self) -> u64 {
        self.inner.records_dropped.load(Ordering::Relaxed)
    }

    pub fn records_reemitted(&self) -> u64 {
        self.inner.records_reemitted.load(Ordering::Relaxed)
    }

    pub fn buckets_evicted(&self) -> u64 {
        self.inner.buckets_evicted.load(Ordering::Relaxed)
    }

    /// Input and exceeded counts for one quota, if it has seen any record.
    pub fn quota_stats(&self, quota: &str) -> Option<QuotaStats> {
        self.inner.quotas.get(quota).map(|c| QuotaStats {
            input: c.input.load(Ordering::Relaxed),
            exceeded: c.exceeded.load(Ordering::Relaxed),
        })
    }

    /// Input and exceeded counts for every quota seen so far.
    pub fn all_quota_stats(&self) -> BTreeMap<String, QuotaStats> {
        self.inner
            .quotas
            .iter()
            .map(|entry| {
                (
                    entry.key().to_string(),
                    QuotaStats {
                        input: entry.input.load(Ordering::Relaxed),
                        exceeded: entry.exceeded.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }

    /// Get a snapshot of the record and eviction counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_admitted: self.records_admitted(),
            records_fallback_admitted: self.records_fallback_admitted(),
            records_dropped: self.records_dropped(),
            records_reemitted: self.records_reemitted(),
            buckets_evicted: self.buckets_evicted(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.records_admitted.store(0, Ordering::Relaxed);
        self.inner.records_fallback_admitted.store(0, Ordering::Relaxed);
        self.inner.records_dropped.store(0, Ordering::Relaxed);
        self.inner.records_reemitted.store(0, Ordering::Relaxed);
        self.inner.buckets_evicted.store(0, Ordering::Relaxed);
        self.inner.quotas.clear();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-quota counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaStats {
    /// Records that reached the quota's buckets
    pub input: u64,
    /// Records its buckets rejected
    pub exceeded: u64,
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_admitted: u64,
    pub records_fallback_admitted: u64,
    pub records_dropped: u64,
    pub records_reemitted: u64,
    pub buckets_evicted: u64,
}

impl MetricsSnapshot {
    /// Total records decided.
    pub fn total_records(&self) -> u64 {
        self.records_admitted
            .saturating_add(self.records_fallback_admitted)
            .saturating_add(self.records_dropped)
            .saturating_add(self.records_reemitted)
    }

    /// Share of records not passed through (dropped or reemitted), 0.0 to 1.0.
    ///
    /// Returns 0.0 if no records have been decided.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_records();
        if total == 0 {
            0.0
        } else {
            self.records_dropped.saturating_add(self.records_reemitted) as f64 / total as f64
        }
    }
}
