//! Admission decisions and the reports emitted alongside them.

use crate::domain::bucket::{BucketSnapshot, RateSummary};
use crate::domain::quota::{Action, QuotaDescriptor};
use crate::domain::record::GroupKey;
use std::fmt;
use std::sync::Arc;

/// Final outcome for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Admitted by the matched quota.
    Admit,
    /// Rejected and discarded.
    Drop,
    /// Rejected and redirected to a secondary destination.
    Reemit,
    /// Rejected by the matched quota, admitted by its fallback allowance.
    FallbackAdmit,
}

impl Outcome {
    /// Outcome of a rejection under `action`.
    pub(crate) fn for_rejection(action: Action) -> Self {
        match action {
            Action::Reemit => Outcome::Reemit,
            Action::Drop | Action::Fallback => Outcome::Drop,
        }
    }

    /// True for outcomes that pass the record through unchanged.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Outcome::Admit | Outcome::FallbackAdmit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Admit => "admit",
            Outcome::Drop => "drop",
            Outcome::Reemit => "reemit",
            Outcome::FallbackAdmit => "fallback_admit",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's verdict on one record.
#[derive(Debug, Clone)]
pub struct Decision {
    pub outcome: Outcome,
    /// Quota whose bucket made the final call: the matched quota, or its
    /// fallback when one was consulted.
    pub quota: Arc<QuotaDescriptor>,
    pub group: GroupKey,
    /// State of the deciding bucket right after the attempt.
    pub bucket: BucketSnapshot,
    /// True when the fallback allowance was consulted.
    pub used_fallback: bool,
}

impl Decision {
    pub fn admitted(&self) -> bool {
        self.outcome.is_admitted()
    }
}

/// Rate figures for one group under one quota, emitted when it breaches its
/// limit or cools back down.
#[derive(Debug, Clone, PartialEq)]
pub struct BreachReport {
    pub quota: Arc<str>,
    pub group: GroupKey,
    pub rate_s: f64,
    pub period_s: u64,
    pub limit: Option<u64>,
    pub rate_limit_s: Option<f64>,
}

impl BreachReport {
    pub(crate) fn new(quota: Arc<str>, group: GroupKey, summary: RateSummary) -> Self {
        Self {
            quota,
            group,
            rate_s: summary.rate_s,
            period_s: summary.period_s,
            limit: summary.limit,
            rate_limit_s: summary.rate_limit_s,
        }
    }
}
