//! Ports (interfaces) for the application layer.
//!
//! The engine reads time and reports what it decides through these traits;
//! infrastructure provides the concrete adapters.

use crate::application::store::BucketKey;
use crate::domain::decision::{BreachReport, Decision};
use std::fmt::Debug;
use std::time::SystemTime;

/// Port for obtaining the current wall-clock time.
///
/// Infrastructure provides `SystemClock` for production and `MockClock` for
/// tests.
pub trait Clock: Send + Sync + Debug {
    /// Get the current time.
    fn now(&self) -> SystemTime;
}

/// Something the engine did that an outside collaborator may care about.
#[derive(Debug, Clone, Copy)]
pub enum QuotaEvent<'a> {
    /// A record received its final decision.
    Decided(&'a Decision),
    /// A bucket rejected a record and a warning was due.
    Breached(&'a BreachReport),
    /// A closed bucket reopened at a window boundary.
    Cooldown(&'a BreachReport),
    /// A bucket was removed from the store.
    Evicted(&'a BucketKey),
}

/// Port receiving engine events, in place of a process-wide metrics registry.
///
/// Called synchronously on the decision path, so implementations must not
/// block.
pub trait QuotaObserver: Send + Sync + Debug {
    fn observe(&self, event: &QuotaEvent<'_>);
}
