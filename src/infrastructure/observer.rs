//! Observer adapters.

use crate::application::ports::{QuotaEvent, QuotaObserver};
use tracing::{debug, trace};

/// Observer that ignores every event. The engine's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QuotaObserver for NoopObserver {
    fn observe(&self, _event: &QuotaEvent<'_>) {}
}

/// Observer that logs every engine event through `tracing`.
///
/// Rejections and window events go to `debug`, admissions to `trace`.
/// Breach warnings and cooldown notices are already logged by the engine at
/// `warn` and `info`; this adds the per-record detail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl QuotaObserver for TracingObserver {
    fn observe(&self, event: &QuotaEvent<'_>) {
        match event {
            QuotaEvent::Decided(decision) if decision.admitted() => trace!(
                quota = decision.quota.name(),
                group = %decision.group,
                outcome = %decision.outcome,
                "record admitted"
            ),
            QuotaEvent::Decided(decision) => debug!(
                quota = decision.quota.name(),
                group = %decision.group,
                outcome = %decision.outcome,
                used_fallback = decision.used_fallback,
                "record rejected"
            ),
            QuotaEvent::Breached(report) => debug!(
                quota = %report.quota,
                group = %report.group,
                rate_s = report.rate_s,
                "bucket closed"
            ),
            QuotaEvent::Cooldown(report) => debug!(
                quota = %report.quota,
                group = %report.group,
                rate_s = report.rate_s,
                "bucket reopened"
            ),
            QuotaEvent::Evicted(key) => debug!(bucket = %key, "bucket dropped from store"),
        }
    }
}
