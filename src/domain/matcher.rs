//! Best-match quota selection.
//!
//! Each quota scores a record by counting its satisfied match conditions, but
//! only if all of them are satisfied: one miss makes the whole quota score 0.
//! The highest score wins; ties go to the quota declared first, and a record
//! no quota fully matches falls through to the default quota.

use crate::domain::quota::{FieldPath, QuotaDescriptor};
use crate::domain::record::lookup;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Selects the quota governing a record.
#[derive(Debug, Clone)]
pub struct Matcher {
    quotas: Vec<Arc<QuotaDescriptor>>,
    default_quota: Arc<QuotaDescriptor>,
}

impl Matcher {
    /// Create a matcher over quotas in declaration order.
    pub fn new(quotas: Vec<Arc<QuotaDescriptor>>, default_quota: Arc<QuotaDescriptor>) -> Self {
        Self {
            quotas,
            default_quota,
        }
    }

    /// Return the single best-matching quota for `record`.
    ///
    /// Replacement requires a strictly higher score, so the first declared
    /// quota reaching the top score wins and the default (score 0) only wins
    /// when nothing matches fully.
    pub fn select(&self, record: &Value) -> &Arc<QuotaDescriptor> {
        let mut best = &self.default_quota;
        let mut best_score = 0;

        for quota in &self.quotas {
            let score = match_score(quota.match_by(), record);
            if score > best_score {
                best = quota;
                best_score = score;
            }
        }

        best
    }

    /// Configured quotas in declaration order.
    pub fn quotas(&self) -> &[Arc<QuotaDescriptor>] {
        &self.quotas
    }

    pub fn default_quota(&self) -> &Arc<QuotaDescriptor> {
        &self.default_quota
    }
}

/// Number of conditions in `match_by` satisfied by `record`, or 0 if any one
/// of them is not.
///
/// An empty condition set scores 0. A missing path never matches, not even an
/// expected `null`.
pub fn match_score(match_by: &BTreeMap<FieldPath, Value>, record: &Value) -> usize {
    for (path, expected) in match_by {
        match lookup(record, path) {
            Some(actual) if actual == expected => {}
            _ => return 0,
        }
    }
    match_by.len()
}
