//! # quota-throttle
//!
//! Per-group quota throttling for structured log records.
//!
//! Each record is a JSON-like document. A set of named quotas decides, record
//! by record, whether it is admitted, dropped, or redirected to a secondary
//! destination. A quota names:
//! - **match conditions** (`match_by`): dotted field paths and the values they
//!   must hold; the most specific matching quota wins,
//! - **grouping keys** (`group_by`): field paths whose values partition
//!   records into independently counted groups,
//! - **a bucket**: `bucket_size` records per `duration` seconds, counted in
//!   tumbling windows aligned to the UNIX epoch,
//! - **an action** for rejected records: `drop`, `reemit`, or `fallback` to a
//!   secondary allowance.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quota_throttle::{Configuration, QuotaEngine, Route};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Configuration::from_yaml(
//!     r#"
//! quotas:
//!   - name: noisy-app
//!     group_by: [kubernetes.namespace]
//!     match_by: { kubernetes.labels.app: noisy }
//!     bucket_size: 100
//!     duration: 60
//!     action: reemit
//! default:
//!   group_by: [kubernetes.namespace]
//!   bucket_size: 1000
//!   duration: 60
//!   action: drop
//! "#,
//! )?;
//!
//! let mut engine = QuotaEngine::builder(config)
//!     .with_secondary_tag_prefix("throttled")
//!     .build()?;
//!
//! let record = json!({
//!     "kubernetes": { "namespace": "prod", "labels": { "app": "noisy" } },
//!     "message": "hello",
//! });
//!
//! match engine.route("app.logs", &record) {
//!     Route::Emit => { /* forward unchanged */ }
//!     Route::Discard => { /* drop */ }
//!     Route::Redirect { tag } => assert_eq!(tag, "throttled.app.logs"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Hysteresis
//!
//! A bucket that closed during a window normally reopens at the next window
//! boundary. With approximate-rate hysteresis (the default), it stays closed
//! while the group's sampled arrival rate remains above
//! `bucket_size / duration`, so a sustained flood is not let through in a
//! burst at every boundary. Disable it with
//! [`QuotaEngineBuilder::with_approx_rate_hysteresis`].
//!
//! ## Memory
//!
//! Buckets live in an LRU-ordered store. Before every decision the least
//! recently touched bucket is evicted if it has seen no activity (a window
//! reset or a rate sample) for more than twice its period. Unlimited quotas
//! keep no buckets. A hard cap is available through
//! [`QuotaEngineBuilder::with_max_buckets`].
//!
//! ## Observability
//!
//! - Breaches are logged with `tracing::warn!` at most once per warning delay
//!   per bucket, and a bucket reopening after a hold with `tracing::info!`.
//! - [`Metrics`] counts outcomes, evictions, and per-quota input and exceeded
//!   records; clones share the counters.
//! - A [`QuotaObserver`] receives every decision, breach, cooldown and
//!   eviction.
//!
//! ```rust,no_run
//! # use quota_throttle::{Configuration, QuotaEngine};
//! let engine = QuotaEngine::new(Configuration::default());
//! let metrics = engine.metrics().clone();
//!
//! // From a reporter thread:
//! let snapshot = metrics.snapshot();
//! println!(
//!     "{} records, {:.1}% rejected",
//!     snapshot.total_records(),
//!     snapshot.rejection_rate() * 100.0
//! );
//! ```
//!
//! ## Concurrency
//!
//! An engine is a single-threaded state machine (`&mut self` per decision).
//! Run one engine per worker, or share one behind a `Mutex`; limits are
//! enforced per engine instance.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    bucket::{Bucket, BucketSnapshot, WindowState, WindowTransition},
    decision::{BreachReport, Decision, Outcome},
    matcher::Matcher,
    quota::{Action, Capacity, FieldPath, QuotaDescriptor},
    record::{GroupKey, GroupValue},
};

pub use application::{
    engine::{BuildError, QuotaEngine, QuotaEngineBuilder, Route},
    metrics::{Metrics, MetricsSnapshot, QuotaStats},
    ports::{Clock, QuotaEvent, QuotaObserver},
    store::{BucketKey, BucketStore},
};

pub use infrastructure::{
    clock::SystemClock,
    config::{ConfigError, Configuration},
    observer::{NoopObserver, TracingObserver},
};
