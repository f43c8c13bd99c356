//! Field lookup and group keys.
//!
//! Records are arbitrary nested JSON-like values. A lookup walks a
//! [`FieldPath`] one key at a time and yields nothing as soon as a segment is
//! missing or an intermediate value is not a mapping. Lookups never fail.

use crate::domain::quota::FieldPath;
use serde_json::Value;
use std::fmt;

/// Resolve `path` against `record`.
///
/// Returns `None` on the first missing segment or non-object intermediate.
pub fn lookup<'a>(record: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(record, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            _ => None,
        })
}

/// One grouping value, typed so that the string `"1"` and the number `1`
/// land in different groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupValue {
    /// A JSON string, held raw.
    Text(String),
    /// Any other non-null JSON value, held as its JSON text.
    Json(String),
}

impl GroupValue {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            other => Some(Self::Json(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Json(s) => s,
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a rate-limiting group: one component per `group_by` path.
///
/// Absent fields and explicit nulls both become `None`; such keys are still
/// valid, distinct groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Vec<Option<GroupValue>>);

impl GroupKey {
    /// Build a key from string components.
    pub fn new(components: Vec<Option<String>>) -> Self {
        Self(components.into_iter().map(|c| c.map(GroupValue::Text)).collect())
    }

    /// Reduce `record` to its group under `group_by`.
    pub fn from_record(record: &Value, group_by: &[FieldPath]) -> Self {
        Self(
            group_by
                .iter()
                .map(|path| lookup(record, path).and_then(GroupValue::from_value))
                .collect(),
        )
    }

    pub fn components(&self) -> &[Option<GroupValue>] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match part {
                Some(value) => write!(f, "{value}")?,
                None => f.write_str("null")?,
            }
        }
        f.write_str("]")
    }
}
