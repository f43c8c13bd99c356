//! Quota descriptors.
//!
//! A quota names the conditions a record must satisfy, how matching records are
//! split into groups, how many of them each group may emit per period, and what
//! happens to the excess. Descriptors are immutable once built and are shared
//! through `Arc` between the matcher, the bucket store and returned decisions.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Name of the quota applied when no configured quota matches.
pub const DEFAULT_QUOTA_NAME: &str = "default";

/// Suffix appended to a quota's name to name its fallback allowance.
pub const FALLBACK_SUFFIX: &str = "fallback";

/// Sequence of keys identifying a nested value inside a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Create a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Split a dotted path such as `kubernetes.container_name` into segments.
    ///
    /// This is the only place dotted strings are split; lookups work on the
    /// resulting segments directly.
    pub fn parse_dotted(path: &str) -> Self {
        Self(path.split('.').map(str::to_owned).collect())
    }

    /// The keys of this path, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True if the path has no segments or any segment is empty.
    pub fn has_empty_segment(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(String::is_empty)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// What happens to a record once its bucket is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Discard the record.
    Drop,
    /// Redirect the record to a secondary destination.
    Reemit,
    /// Try the quota's fallback allowance before giving up.
    Fallback,
}

impl Action {
    /// Parse an action from its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "drop" => Some(Action::Drop),
            "reemit" => Some(Action::Reemit),
            "fallback" => Some(Action::Fallback),
            _ => None,
        }
    }

    /// Configuration name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Drop => "drop",
            Action::Reemit => "reemit",
            Action::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many records a bucket admits per period.
///
/// Configured as an integer where `-1` means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capacity {
    /// Every record is admitted.
    Unlimited,
    /// At most this many records are admitted per period.
    Limited(u64),
}

impl Capacity {
    /// Interpret a configured bucket size. Values below `-1` are invalid.
    pub fn from_bucket_size(bucket_size: i64) -> Option<Self> {
        match bucket_size {
            -1 => Some(Capacity::Unlimited),
            n if n >= 0 => Some(Capacity::Limited(n as u64)),
            _ => None,
        }
    }

    /// The limit, if any.
    pub fn limit(&self) -> Option<u64> {
        match self {
            Capacity::Unlimited => None,
            Capacity::Limited(n) => Some(*n),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Capacity::Unlimited)
    }
}

/// An immutable quota definition.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaDescriptor {
    name: Arc<str>,
    description: Option<String>,
    group_by: Vec<FieldPath>,
    match_by: BTreeMap<FieldPath, Value>,
    capacity: Capacity,
    duration: Duration,
    action: Action,
    fallback: Option<Arc<QuotaDescriptor>>,
}

impl QuotaDescriptor {
    /// Create a descriptor with no grouping and no match conditions.
    pub fn new(name: impl Into<Arc<str>>, capacity: Capacity, duration: Duration, action: Action) -> Self {
        Self {
            name: name.into(),
            description: None,
            group_by: Vec::new(),
            match_by: BTreeMap::new(),
            capacity,
            duration,
            action,
            fallback: None,
        }
    }

    /// The quota used when a configuration declares no default: unlimited,
    /// ungrouped, action `drop`.
    pub fn builtin_default() -> Self {
        Self::new(DEFAULT_QUOTA_NAME, Capacity::Unlimited, Duration::ZERO, Action::Drop)
            .with_description("Default quota")
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group_by(mut self, group_by: Vec<FieldPath>) -> Self {
        self.group_by = group_by;
        self
    }

    /// Add a condition: the value at `path` must equal `expected`.
    pub fn with_match(mut self, path: FieldPath, expected: impl Into<Value>) -> Self {
        self.match_by.insert(path, expected.into());
        self
    }

    /// Attach a fallback allowance.
    ///
    /// Only the configuration parser calls this, after checking that the
    /// fallback carries no fallback of its own.
    pub(crate) fn with_fallback(mut self, fallback: QuotaDescriptor) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the name, used as part of bucket keys.
    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn group_by(&self) -> &[FieldPath] {
        &self.group_by
    }

    pub fn match_by(&self) -> &BTreeMap<FieldPath, Value> {
        &self.match_by
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Window length.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// The fallback allowance, if one is attached.
    pub fn fallback(&self) -> Option<&Arc<QuotaDescriptor>> {
        self.fallback.as_ref()
    }

    /// Sustainable records per second (`bucket_size / duration`), or `None`
    /// for unlimited quotas.
    pub fn rate_per_second_limit(&self) -> Option<f64> {
        let limit = self.capacity.limit()?;
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            Some(limit as f64 / secs)
        } else {
            None
        }
    }
}

impl fmt::Display for QuotaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capacity {
            Capacity::Unlimited => write!(f, "{} (unlimited)", self.name),
            Capacity::Limited(n) => write!(
                f,
                "{} ({} per {}s, {})",
                self.name,
                n,
                self.duration.as_secs(),
                self.action
            ),
        }
    }
}
