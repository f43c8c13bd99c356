//! Recording observer for testing.

use crate::application::ports::{QuotaEvent, QuotaObserver};
use crate::application::store::BucketKey;
use crate::domain::decision::{BreachReport, Outcome};
use crate::domain::record::GroupKey;
use std::sync::{Arc, Mutex};

/// Owned copy of a [`QuotaEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Decided {
        quota: String,
        group: GroupKey,
        outcome: Outcome,
        used_fallback: bool,
    },
    Breached(BreachReport),
    Cooldown(BreachReport),
    Evicted(BucketKey),
}

/// Observer that keeps every event it receives. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in arrival order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    pub fn breaches(&self) -> Vec<BreachReport> {
        self.filter(|e| match e {
            RecordedEvent::Breached(report) => Some(report.clone()),
            _ => None,
        })
    }

    pub fn cooldowns(&self) -> Vec<BreachReport> {
        self.filter(|e| match e {
            RecordedEvent::Cooldown(report) => Some(report.clone()),
            _ => None,
        })
    }

    pub fn evictions(&self) -> Vec<BucketKey> {
        self.filter(|e| match e {
            RecordedEvent::Evicted(key) => Some(key.clone()),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn filter<T>(&self, f: impl FnMut(&RecordedEvent) -> Option<T>) -> Vec<T> {
        self.lock().iter().filter_map(f).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        self.events
            .lock()
            .expect("RecordingObserver mutex poisoned - a test thread panicked while holding the lock")
    }
}

impl QuotaObserver for RecordingObserver {
    fn observe(&self, event: &QuotaEvent<'_>) {
        let recorded = match event {
            QuotaEvent::Decided(decision) => RecordedEvent::Decided {
                quota: decision.quota.name().to_string(),
                group: decision.group.clone(),
                outcome: decision.outcome,
                used_fallback: decision.used_fallback,
            },
            QuotaEvent::Breached(report) => RecordedEvent::Breached((*report).clone()),
            QuotaEvent::Cooldown(report) => RecordedEvent::Cooldown((*report).clone()),
            QuotaEvent::Evicted(key) => RecordedEvent::Evicted((*key).clone()),
        };
        self.lock().push(recorded);
    }
}
