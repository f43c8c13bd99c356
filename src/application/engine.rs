//! Quota engine - per-record admission decisions.
//!
//! For every record the engine:
//! 1. evicts at most one stale bucket from the store,
//! 2. selects the most specific quota,
//! 3. derives the group key and consumes from that group's bucket,
//! 4. on rejection, consults the quota's fallback allowance or applies its
//!    action.
//!
//! Breaches are reported at most once per warning delay per bucket, and a
//! bucket reopening after a hysteresis hold is reported as a cooldown.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, QuotaEvent, QuotaObserver};
use crate::application::store::{BucketKey, BucketStore};
use crate::domain::bucket::{BucketSnapshot, RateSummary, WindowTransition};
use crate::domain::decision::{BreachReport, Decision, Outcome};
use crate::domain::matcher::Matcher;
use crate::domain::quota::{Action, Capacity, QuotaDescriptor};
use crate::domain::record::GroupKey;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::Configuration;
use crate::infrastructure::observer::NoopObserver;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default minimum interval between two breach warnings for one bucket.
pub const DEFAULT_WARNING_DELAY: Duration = Duration::from_secs(10);

/// Default prefix of the tag reemitted records are redirected to.
pub const DEFAULT_SECONDARY_TAG_PREFIX: &str = "secondary";

/// Error returned when building a [`QuotaEngine`] fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Warning delay must be at least one second
    #[error("warning_delay must be at least 1s, got {0:?}")]
    ZeroWarningDelay(Duration),
    /// Secondary tag prefix must not be empty
    #[error("secondary tag prefix cannot be empty")]
    EmptyTagPrefix,
    /// A default quota is required but the configuration has none
    #[error("configuration has no default quota")]
    MissingDefaultQuota,
    /// Maximum buckets must be greater than zero
    #[error("max_buckets must be greater than 0")]
    ZeroMaxBuckets,
    /// A quota with a fallback needs room for both of its buckets
    #[error("max_buckets must be at least 2 when a quota has a fallback, got {0}")]
    MaxBucketsBelowFallbackPair(usize),
}

/// Where a record should go after its decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Pass the record through under its own tag.
    Emit,
    /// Discard the record.
    Discard,
    /// Re-emit the record under a secondary tag.
    Redirect { tag: String },
}

/// Builder for constructing a [`QuotaEngine`].
#[derive(Debug)]
pub struct QuotaEngineBuilder {
    config: Configuration,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn QuotaObserver>>,
    metrics: Option<Metrics>,
    warning_delay: Duration,
    hysteresis: bool,
    secondary_tag_prefix: String,
    max_buckets: Option<usize>,
    require_default: bool,
}

impl QuotaEngineBuilder {
    fn new(config: Configuration) -> Self {
        Self {
            config,
            clock: None,
            observer: None,
            metrics: None,
            warning_delay: DEFAULT_WARNING_DELAY,
            hysteresis: true,
            secondary_tag_prefix: DEFAULT_SECONDARY_TAG_PREFIX.to_string(),
            max_buckets: None,
            require_default: false,
        }
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the observer notified of decisions, breaches, cooldowns and
    /// evictions.
    pub fn with_observer(mut self, observer: Arc<dyn QuotaObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Share an existing metrics handle instead of creating a fresh one.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the minimum interval between breach warnings for one bucket.
    ///
    /// Default: 10 seconds. Validated when `build()` is called.
    pub fn with_warning_delay(mut self, delay: Duration) -> Self {
        self.warning_delay = delay;
        self
    }

    /// Keep closed buckets closed across window boundaries while their
    /// approximate rate stays above the limit.
    ///
    /// Default: enabled.
    pub fn with_approx_rate_hysteresis(mut self, enabled: bool) -> Self {
        self.hysteresis = enabled;
        self
    }

    /// Set the prefix of the tag reemitted records are redirected to.
    ///
    /// Default: `"secondary"`.
    pub fn with_secondary_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.secondary_tag_prefix = prefix.into();
        self
    }

    /// Cap the number of buckets held at once.
    ///
    /// When full, creating a bucket evicts the least recently touched one,
    /// stale or not. Unbounded by default. Must be at least 2 when any quota
    /// has a fallback, since the fallback's bucket would otherwise evict the
    /// parent's on every rejection.
    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = Some(max_buckets);
        self
    }

    /// Reject configurations without a `default` section.
    pub fn require_default_quota(mut self, required: bool) -> Self {
        self.require_default = required;
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    /// Returns `BuildError` if the settings are invalid.
    pub fn build(self) -> Result<QuotaEngine, BuildError> {
        if self.warning_delay < Duration::from_secs(1) {
            return Err(BuildError::ZeroWarningDelay(self.warning_delay));
        }
        if self.secondary_tag_prefix.is_empty() {
            return Err(BuildError::EmptyTagPrefix);
        }
        if self.require_default && !self.config.has_configured_default() {
            return Err(BuildError::MissingDefaultQuota);
        }
        match self.max_buckets {
            Some(0) => return Err(BuildError::ZeroMaxBuckets),
            Some(1) if self.config.quotas().iter().any(|q| q.fallback().is_some()) => {
                return Err(BuildError::MaxBucketsBelowFallbackPair(1));
            }
            _ => {}
        }

        Ok(QuotaEngine::assemble(self))
    }
}

/// Decides, record by record, whether each is admitted, dropped or reemitted.
///
/// The engine is not internally synchronized; share it behind a `Mutex` if
/// several threads decide. Its [`Metrics`] can be read from anywhere.
#[derive(Debug)]
pub struct QuotaEngine {
    matcher: Matcher,
    store: BucketStore,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn QuotaObserver>,
    metrics: Metrics,
    warning_delay: Duration,
    secondary_tag_prefix: String,
}

/// What one bucket attempt produced.
struct Attempt {
    admitted: bool,
    bucket: BucketSnapshot,
}

impl QuotaEngine {
    /// Create an engine with default settings.
    pub fn new(config: Configuration) -> Self {
        Self::assemble(QuotaEngineBuilder::new(config))
    }

    /// Create a builder for configuring the engine.
    pub fn builder(config: Configuration) -> QuotaEngineBuilder {
        QuotaEngineBuilder::new(config)
    }

    fn assemble(builder: QuotaEngineBuilder) -> Self {
        let matcher = Matcher::new(
            builder.config.quotas().to_vec(),
            Arc::clone(builder.config.default_quota()),
        );

        let mut store = BucketStore::new().with_hysteresis(builder.hysteresis);
        if let Some(max) = builder.max_buckets.and_then(NonZeroUsize::new) {
            store = store.with_max_buckets(max);
        }

        Self {
            matcher,
            store,
            clock: builder.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            observer: builder.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
            metrics: builder.metrics.unwrap_or_default(),
            warning_delay: builder.warning_delay,
            secondary_tag_prefix: builder.secondary_tag_prefix,
        }
    }

    /// Decide one record at the clock's current time.
    pub fn decide(&mut self, record: &Value) -> Decision {
        let now = self.clock.now();
        self.decide_at(record, now)
    }

    /// Decide one record at `now`.
    pub fn decide_at(&mut self, record: &Value, now: SystemTime) -> Decision {
        self.evict_stale(now);

        let quota = Arc::clone(self.matcher.select(record));
        let group = GroupKey::from_record(record, quota.group_by());
        let attempt = self.attempt(&quota, &group, now);

        let decision = if attempt.admitted {
            Decision {
                outcome: Outcome::Admit,
                quota,
                group,
                bucket: attempt.bucket,
                used_fallback: false,
            }
        } else {
            let fallback = match quota.action() {
                Action::Fallback => quota.fallback().cloned(),
                Action::Drop | Action::Reemit => None,
            };
            match fallback {
                Some(fallback) => {
                    let group = GroupKey::from_record(record, fallback.group_by());
                    let attempt = self.attempt(&fallback, &group, now);
                    let outcome = if attempt.admitted {
                        Outcome::FallbackAdmit
                    } else {
                        Outcome::for_rejection(fallback.action())
                    };
                    Decision {
                        outcome,
                        quota: fallback,
                        group,
                        bucket: attempt.bucket,
                        used_fallback: true,
                    }
                }
                None => Decision {
                    outcome: Outcome::for_rejection(quota.action()),
                    quota,
                    group,
                    bucket: attempt.bucket,
                    used_fallback: false,
                },
            }
        };

        self.metrics.record_outcome(decision.outcome);
        self.observer.observe(&QuotaEvent::Decided(&decision));
        decision
    }

    /// Decide one record and map the outcome to a routing instruction.
    pub fn route(&mut self, tag: &str, record: &Value) -> Route {
        let now = self.clock.now();
        self.route_at(tag, record, now)
    }

    /// Like [`route`](Self::route), at `now`.
    pub fn route_at(&mut self, tag: &str, record: &Value, now: SystemTime) -> Route {
        match self.decide_at(record, now).outcome {
            Outcome::Admit | Outcome::FallbackAdmit => Route::Emit,
            Outcome::Drop => Route::Discard,
            Outcome::Reemit => Route::Redirect {
                tag: self.secondary_tag(tag),
            },
        }
    }

    /// Tag a reemitted record is redirected to.
    pub fn secondary_tag(&self, tag: &str) -> String {
        format!("{}.{}", self.secondary_tag_prefix, tag)
    }

    /// Evict the least recently touched bucket if it has expired.
    ///
    /// Runs automatically before every decision.
    pub fn evict_stale(&mut self, now: SystemTime) -> Option<BucketKey> {
        let key = self.store.evict_stale(now)?;
        self.on_evicted(&key);
        Some(key)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn warning_delay(&self) -> Duration {
        self.warning_delay
    }

    fn attempt(&mut self, quota: &QuotaDescriptor, group: &GroupKey, now: SystemTime) -> Attempt {
        // Unlimited quotas admit everything; a bucket for them would only
        // crowd limited buckets out of a capped store.
        if quota.capacity() == Capacity::Unlimited {
            self.metrics.record_input(quota.name_arc());
            return Attempt {
                admitted: true,
                bucket: BucketSnapshot::unlimited(now),
            };
        }

        if let Some(evicted) = self.store.make_room(group, quota) {
            self.on_evicted(&evicted);
        }
        self.metrics.record_input(quota.name_arc());

        let bucket = self.store.get(group.clone(), quota, now);
        let held_rate = bucket.is_closed().then(|| bucket.rate_summary(now));
        let consumption = bucket.consume(now);

        let breach = if !consumption.admitted && bucket.should_warn(now, self.warning_delay) {
            bucket.mark_warned(now);
            Some(bucket.rate_summary(now))
        } else {
            None
        };
        let cooldown = match consumption.transition {
            Some(WindowTransition::Reopened) => held_rate,
            _ => None,
        };
        let snapshot = bucket.snapshot();

        if !consumption.admitted {
            self.metrics.record_exceeded(quota.name_arc());
        }
        if let Some(summary) = cooldown {
            self.report_cooldown(quota, group, summary);
        }
        if let Some(summary) = breach {
            self.report_breach(quota, group, summary);
        }

        Attempt {
            admitted: consumption.admitted,
            bucket: snapshot,
        }
    }

    fn report_breach(&self, quota: &QuotaDescriptor, group: &GroupKey, summary: RateSummary) {
        let report = BreachReport::new(Arc::clone(quota.name_arc()), group.clone(), summary);
        warn!(
            quota = %report.quota,
            group = %report.group,
            rate_s = report.rate_s,
            period_s = report.period_s,
            limit = ?report.limit,
            rate_limit_s = ?report.rate_limit_s,
            "rate exceeded"
        );
        self.observer.observe(&QuotaEvent::Breached(&report));
    }

    fn report_cooldown(&self, quota: &QuotaDescriptor, group: &GroupKey, summary: RateSummary) {
        let report = BreachReport::new(Arc::clone(quota.name_arc()), group.clone(), summary);
        info!(
            quota = %report.quota,
            group = %report.group,
            rate_s = report.rate_s,
            period_s = report.period_s,
            limit = ?report.limit,
            rate_limit_s = ?report.rate_limit_s,
            "rate back down"
        );
        self.observer.observe(&QuotaEvent::Cooldown(&report));
    }

    fn on_evicted(&self, key: &BucketKey) {
        debug!(bucket = %key, "bucket evicted");
        self.metrics.record_eviction();
        self.observer.observe(&QuotaEvent::Evicted(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bucket::WindowState;
    use crate::infrastructure::mocks::{MockCaptureLayer, MockClock, RecordedEvent, RecordingObserver};
    use serde_json::json;
    use std::time::UNIX_EPOCH;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    const CONFIG: &str = r#"
quotas:
  - name: limited
    group_by: [group1.a]
    match_by: { group1.a: value1 }
    bucket_size: 3
    duration: 60
    action: drop
  - name: reemitted
    group_by: [group1.a]
    match_by: { group1.a: value2 }
    bucket_size: 1
    duration: 60
    action: reemit
  - name: with_fallback
    group_by: [group1.a]
    match_by: { group1.a: value_fallback }
    bucket_size: 3
    duration: 60
    action: fallback
    fallback:
      bucket_size: 2
      duration: 60
      action: drop
  - name: held
    group_by: [group1.a]
    match_by: { group1.a: value_held }
    bucket_size: 2
    duration: 60
    action: drop
"#;

    fn t0() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_800_000_000)
    }

    fn config() -> Configuration {
        Configuration::from_yaml(CONFIG).unwrap()
    }

    fn record(a: &str) -> Value {
        json!({ "group1": { "a": a } })
    }

    fn engine_with(clock: &MockClock, observer: &RecordingObserver) -> QuotaEngine {
        QuotaEngine::builder(config())
            .with_clock(Arc::new(clock.clone()))
            .with_observer(Arc::new(observer.clone()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_admits_up_to_bucket_size() {
        let clock = MockClock::new(t0());
        let mut engine = engine_with(&clock, &RecordingObserver::new());

        let outcomes: Vec<_> = (0..5).map(|_| engine.decide(&record("value1")).outcome).collect();
        assert_eq!(
            outcomes,
            [Outcome::Admit, Outcome::Admit, Outcome::Admit, Outcome::Drop, Outcome::Drop]
        );

        let last = engine.decide(&record("value1"));
        assert_eq!(last.quota.name(), "limited");
        assert_eq!(last.bucket.state, WindowState::Closed);
        assert!(!last.used_fallback);
    }

    #[test]
    fn test_groups_are_independent() {
        let clock = MockClock::new(t0());
        let mut engine = engine_with(&clock, &RecordingObserver::new());

        for _ in 0..3 {
            assert!(engine.decide(&record("value1")).admitted());
        }
        assert!(!engine.decide(&record("value1")).admitted());

        // Unmatched value lands on the built-in unlimited default.
        let other = engine.decide(&record("other"));
        assert!(other.admitted());
        assert_eq!(other.quota.name(), "default");
    }

    #[test]
    fn test_window_reset_readmits() {
        let clock = MockClock::new(t0());
        let mut engine = QuotaEngine::builder(config())
            .with_clock(Arc::new(clock.clone()))
            .with_approx_rate_hysteresis(false)
            .build()
            .unwrap();

        for _ in 0..4 {
            engine.decide(&record("value1"));
        }
        clock.advance(Duration::from_secs(60));
        assert_eq!(engine.decide(&record("value1")).outcome, Outcome::Admit);
    }

    #[test]
    fn test_fallback_cascade() {
        let clock = MockClock::new(t0());
        let mut engine = engine_with(&clock, &RecordingObserver::new());

        let decisions: Vec<_> = (0..6).map(|_| engine.decide(&record("value_fallback"))).collect();
        let outcomes: Vec<_> = decisions.iter().map(|d| d.outcome).collect();
        assert_eq!(
            outcomes,
            [
                Outcome::Admit,
                Outcome::Admit,
                Outcome::Admit,
                Outcome::FallbackAdmit,
                Outcome::FallbackAdmit,
                Outcome::Drop,
            ]
        );
        assert_eq!(decisions[3].quota.name(), "with_fallback.fallback");
        assert!(decisions[5].used_fallback);

        let metrics = engine.metrics();
        assert_eq!(metrics.records_admitted(), 3);
        assert_eq!(metrics.records_fallback_admitted(), 2);
        assert_eq!(metrics.records_dropped(), 1);

        let primary = metrics.quota_stats("with_fallback").unwrap();
        assert_eq!((primary.input, primary.exceeded), (6, 3));
        let fallback = metrics.quota_stats("with_fallback.fallback").unwrap();
        assert_eq!((fallback.input, fallback.exceeded), (3, 1));
    }

    #[test]
    fn test_reemit_routing() {
        let clock = MockClock::new(t0());
        let mut engine = engine_with(&clock, &RecordingObserver::new());

        assert_eq!(engine.route("app.logs", &record("value2")), Route::Emit);
        assert_eq!(
            engine.route("app.logs", &record("value2")),
            Route::Redirect {
                tag: "secondary.app.logs".to_string()
            }
        );
        assert_eq!(engine.metrics().records_reemitted(), 1);
    }

    #[test]
    fn test_drop_routes_to_discard() {
        let clock = MockClock::new(t0());
        let mut engine = engine_with(&clock, &RecordingObserver::new());

        for _ in 0..3 {
            assert_eq!(engine.route("t", &record("value1")), Route::Emit);
        }
        assert_eq!(engine.route("t", &record("value1")), Route::Discard);
    }

    #[test]
    fn test_custom_secondary_prefix() {
        let engine = QuotaEngine::builder(config())
            .with_secondary_tag_prefix("throttled")
            .build()
            .unwrap();
        assert_eq!(engine.secondary_tag("app"), "throttled.app");
    }

    #[test]
    fn test_breach_warning_throttled_by_delay() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let clock = MockClock::new(t0());
        let observer = RecordingObserver::new();
        let mut engine = engine_with(&clock, &observer);

        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..5 {
                engine.decide(&record("value1"));
            }
            clock.advance(Duration::from_secs(5));
            engine.decide(&record("value1"));
            clock.advance(Duration::from_secs(5));
            engine.decide(&record("value1"));
        });

        let warnings: Vec<_> = capture
            .get_captured()
            .into_iter()
            .filter(|e| e.message == "rate exceeded")
            .collect();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].level, Level::WARN);
        assert_eq!(warnings[0].field("quota"), Some("limited"));
        assert_eq!(warnings[0].field("group"), Some("[value1]"));
        assert_eq!(warnings[0].field("limit"), Some("Some(3)"));

        let breaches = observer.breaches();
        assert_eq!(breaches.len(), 2);
        assert_eq!(breaches[0].period_s, 60);
        assert_eq!(breaches[0].limit, Some(3));
    }

    #[test]
    fn test_hysteresis_holds_then_cools_down() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let clock = MockClock::new(t0());
        let observer = RecordingObserver::new();
        let mut engine = engine_with(&clock, &observer);

        tracing::subscriber::with_default(subscriber, || {
            let first: Vec<_> = (0..3).map(|_| engine.decide(&record("value_held")).outcome).collect();
            assert_eq!(first, [Outcome::Admit, Outcome::Admit, Outcome::Drop]);

            // 4 arrivals over 60s is above 2 per 60s: the bucket stays closed.
            clock.advance(Duration::from_secs(60));
            assert_eq!(engine.decide(&record("value_held")).outcome, Outcome::Drop);

            // 1 arrival over the next 60s is below the limit: reopened.
            clock.advance(Duration::from_secs(60));
            assert_eq!(engine.decide(&record("value_held")).outcome, Outcome::Admit);
        });

        let cooldowns = observer.cooldowns();
        assert_eq!(cooldowns.len(), 1);
        assert_eq!(&*cooldowns[0].quota, "held");

        let notices: Vec<_> = capture
            .get_captured()
            .into_iter()
            .filter(|e| e.message == "rate back down")
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, Level::INFO);
    }

    #[test]
    fn test_stale_bucket_evicted_before_decision() {
        let observer = RecordingObserver::new();
        let clock = MockClock::new(t0());
        let mut engine = engine_with(&clock, &observer);

        engine.decide_at(&record("value1"), t0());
        engine.decide_at(&record("value2"), t0() + Duration::from_secs(120));
        assert_eq!(engine.store().len(), 2);

        engine.decide_at(&record("value2"), t0() + Duration::from_secs(121));
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.metrics().buckets_evicted(), 1);

        let evicted = observer.evictions();
        assert_eq!(evicted.len(), 1);
        assert_eq!(&*evicted[0].quota, "limited");
    }

    #[test]
    fn test_max_buckets_evicts_oldest() {
        let mut engine = QuotaEngine::builder(config()).with_max_buckets(2).build().unwrap();

        engine.decide_at(&record("value1"), t0());
        engine.decide_at(&record("value2"), t0());
        engine.decide_at(&record("value_held"), t0());

        let quotas: Vec<_> = engine.store().keys().map(|k| k.quota.to_string()).collect();
        assert_eq!(quotas, ["reemitted", "held"]);
        assert_eq!(engine.metrics().buckets_evicted(), 1);
    }

    #[test]
    fn test_observer_sees_every_decision() {
        let observer = RecordingObserver::new();
        let clock = MockClock::new(t0());
        let mut engine = engine_with(&clock, &observer);

        for _ in 0..4 {
            engine.decide(&record("value1"));
        }

        let decided: Vec<_> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::Decided { outcome, .. } => Some(outcome),
                _ => None,
            })
            .collect();
        assert_eq!(decided, [Outcome::Admit, Outcome::Admit, Outcome::Admit, Outcome::Drop]);
    }

    #[test]
    fn test_shared_metrics_handle() {
        let metrics = Metrics::new();
        let mut engine = QuotaEngine::builder(config())
            .with_metrics(metrics.clone())
            .build()
            .unwrap();

        engine.decide_at(&record("value1"), t0());
        assert_eq!(metrics.records_admitted(), 1);
    }

    #[test]
    fn test_build_errors() {
        let result = QuotaEngine::builder(config())
            .with_warning_delay(Duration::from_millis(500))
            .build();
        assert!(matches!(result, Err(BuildError::ZeroWarningDelay(_))));

        let result = QuotaEngine::builder(config()).with_secondary_tag_prefix("").build();
        assert!(matches!(result, Err(BuildError::EmptyTagPrefix)));

        let result = QuotaEngine::builder(config()).require_default_quota(true).build();
        assert!(matches!(result, Err(BuildError::MissingDefaultQuota)));

        let result = QuotaEngine::builder(config()).with_max_buckets(0).build();
        assert!(matches!(result, Err(BuildError::ZeroMaxBuckets)));

        let result = QuotaEngine::builder(config()).with_max_buckets(1).build();
        assert_eq!(result.err(), Some(BuildError::MaxBucketsBelowFallbackPair(1)));

        let without_fallback = Configuration::from_yaml(
            "quotas:\n  - { name: q, group_by: [a], bucket_size: 1, duration: 60, action: drop }\n",
        )
        .unwrap();
        assert!(QuotaEngine::builder(without_fallback).with_max_buckets(1).build().is_ok());
    }

    #[test]
    fn test_fallback_pair_fits_smallest_cap() {
        let mut engine = QuotaEngine::builder(config()).with_max_buckets(2).build().unwrap();
        let record = record("value_fallback");

        let outcomes: Vec<_> = (0..7).map(|_| engine.decide_at(&record, t0()).outcome).collect();
        assert_eq!(
            outcomes,
            [
                Outcome::Admit,
                Outcome::Admit,
                Outcome::Admit,
                Outcome::FallbackAdmit,
                Outcome::FallbackAdmit,
                Outcome::Drop,
                Outcome::Drop,
            ]
        );
        assert_eq!(engine.store().len(), 2);
        assert_eq!(engine.metrics().buckets_evicted(), 0);
    }

    #[test]
    fn test_unlimited_quota_keeps_no_buckets() {
        let mut engine = QuotaEngine::new(Configuration::default());
        let record = record("anything");

        for ms in 0..100 {
            let decision = engine.decide_at(&record, t0() + Duration::from_millis(ms));
            assert_eq!(decision.outcome, Outcome::Admit);
            assert_eq!(decision.bucket.capacity, Capacity::Unlimited);
        }
        assert!(engine.store().is_empty());
        assert_eq!(engine.metrics().buckets_evicted(), 0);
        assert_eq!(engine.metrics().records_admitted(), 100);
    }

    #[test]
    fn test_unlimited_records_do_not_evict_under_cap() {
        let mut engine = QuotaEngine::builder(config()).with_max_buckets(2).build().unwrap();

        engine.decide_at(&record("value1"), t0());
        engine.decide_at(&record("value2"), t0());
        // Unmatched records fall to the unlimited built-in default.
        for _ in 0..10 {
            engine.decide_at(&record("other"), t0());
        }

        let quotas: Vec<_> = engine.store().keys().map(|k| k.quota.to_string()).collect();
        assert_eq!(quotas, ["limited", "reemitted"]);
        assert_eq!(engine.metrics().buckets_evicted(), 0);
    }

    #[test]
    fn test_defaults() {
        let engine = QuotaEngine::new(Configuration::default());
        assert_eq!(engine.warning_delay(), DEFAULT_WARNING_DELAY);
        assert_eq!(engine.secondary_tag("x"), "secondary.x");
        assert!(engine.matcher().quotas().is_empty());
        assert!(engine.store().is_empty());
    }
}
