//! YAML quota configuration.
//!
//! The document is deserialized into loose raw structures first so that a
//! wrong type (a float bucket size, a string duration) surfaces as a precise
//! [`ConfigError`] naming the quota, rather than a generic decoding failure.
//! Validation then turns the raw quotas into immutable descriptors.
//!
//! ```yaml
//! quotas:
//!   - name: noisy-app
//!     description: chatty debug logs
//!     group_by: [kubernetes.namespace, kubernetes.container_name]
//!     match_by: { kubernetes.labels.app: noisy }
//!     bucket_size: 3
//!     duration: 60
//!     action: fallback
//!     fallback:
//!       bucket_size: 2
//!       duration: 60
//!       action: drop
//! default:
//!   group_by: [kubernetes.namespace]
//!   bucket_size: 300
//!   duration: 180
//!   action: reemit
//! ```

use crate::domain::quota::{
    Action, Capacity, FieldPath, QuotaDescriptor, DEFAULT_QUOTA_NAME, FALLBACK_SUFFIX,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error returned when a quota configuration cannot be loaded.
///
/// Configuration errors are fatal: an engine is never built from an invalid
/// configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read quota config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse quota config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("quota #{position} has an empty name")]
    EmptyName { position: usize },

    #[error("quota name `{quota}` is declared more than once")]
    DuplicateName { quota: String },

    #[error("quota name `{quota}` is reserved for {owner}")]
    ReservedName { quota: String, owner: String },

    #[error("quota `{quota}`: group_by cannot be empty")]
    EmptyGroupBy { quota: String },

    #[error("quota `{quota}`: field path `{path}` has an empty segment")]
    EmptyFieldPath { quota: String, path: String },

    #[error("quota `{quota}`: {field} must be an integer")]
    NotInteger { quota: String, field: &'static str },

    #[error("quota `{quota}`: bucket_size must be -1 or greater, got {value}")]
    InvalidBucketSize { quota: String, value: i64 },

    #[error("quota `{quota}`: duration must be greater than 0 for a limited bucket, got {value}")]
    InvalidDuration { quota: String, value: i64 },

    #[error("quota `{quota}`: action must be one of {allowed}, got `{action}`")]
    InvalidAction {
        quota: String,
        action: String,
        allowed: &'static str,
    },

    #[error("quota `{quota}`: a fallback requires action `fallback`, got `{action}`")]
    UnexpectedFallback { quota: String, action: Action },

    #[error("quota `{quota}`: a fallback cannot declare a fallback of its own")]
    NestedFallback { quota: String },

    #[error("quota `{quota}`: match_by value for `{path}` must be a scalar")]
    NonScalarMatch { quota: String, path: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    quotas: Option<Vec<RawQuota>>,
    default: Option<RawQuota>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuota {
    name: Option<String>,
    description: Option<String>,
    group_by: Option<Vec<String>>,
    match_by: Option<BTreeMap<String, Value>>,
    bucket_size: Option<Value>,
    duration: Option<Value>,
    action: Option<String>,
    fallback: Option<Box<RawQuota>>,
}

/// Where a raw quota sits in the document; decides which rules apply.
enum Role<'a> {
    Configured,
    Default,
    Fallback { parent: &'a str, group_by: &'a [FieldPath] },
}

impl Role<'_> {
    fn allowed_actions(&self) -> &'static str {
        match self {
            Role::Configured => "drop, reemit, fallback",
            Role::Default | Role::Fallback { .. } => "drop, reemit",
        }
    }
}

/// Parsed, validated quota configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    quotas: Vec<Arc<QuotaDescriptor>>,
    default_quota: Arc<QuotaDescriptor>,
    has_configured_default: bool,
}

impl Configuration {
    /// Build a configuration from descriptors directly.
    pub fn new(quotas: Vec<QuotaDescriptor>, default_quota: Option<QuotaDescriptor>) -> Self {
        let has_configured_default = default_quota.is_some();
        Self {
            quotas: quotas.into_iter().map(Arc::new).collect(),
            default_quota: Arc::new(default_quota.unwrap_or_else(QuotaDescriptor::builtin_default)),
            has_configured_default,
        }
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawDocument = serde_yaml::from_str(yaml)?;

        let mut seen = HashSet::new();
        let mut quotas = Vec::new();
        for (position, raw_quota) in raw.quotas.unwrap_or_default().into_iter().enumerate() {
            let quota = parse_quota(raw_quota, Role::Configured, position)?;
            if quota.name() == DEFAULT_QUOTA_NAME {
                return Err(ConfigError::ReservedName {
                    quota: quota.name().to_string(),
                    owner: "the default quota".to_string(),
                });
            }
            if !seen.insert(quota.name().to_string()) {
                return Err(ConfigError::DuplicateName {
                    quota: quota.name().to_string(),
                });
            }
            quotas.push(quota);
        }

        // Buckets are keyed by quota name, so a fallback must not share its
        // generated name with a configured quota, whichever comes first.
        for quota in &quotas {
            if let Some(fallback) = quota.fallback() {
                if seen.contains(fallback.name()) {
                    return Err(ConfigError::ReservedName {
                        quota: fallback.name().to_string(),
                        owner: format!("the fallback of quota `{}`", quota.name()),
                    });
                }
            }
        }

        let default_quota = raw
            .default
            .map(|raw_default| parse_quota(raw_default, Role::Default, 0))
            .transpose()?;

        if default_quota.is_none() {
            tracing::debug!("no default quota configured, using the built-in unlimited default");
        }

        let config = Self::new(quotas, default_quota);
        tracing::debug!(
            quotas = config.quotas.len(),
            default = %config.default_quota,
            "quota configuration loaded"
        );
        Ok(config)
    }

    /// Configured quotas in declaration order.
    pub fn quotas(&self) -> &[Arc<QuotaDescriptor>] {
        &self.quotas
    }

    pub fn default_quota(&self) -> &Arc<QuotaDescriptor> {
        &self.default_quota
    }

    /// False when the built-in default stands in for a missing `default`
    /// section.
    pub fn has_configured_default(&self) -> bool {
        self.has_configured_default
    }

    /// Find a configured quota by name.
    pub fn find(&self, name: &str) -> Option<&Arc<QuotaDescriptor>> {
        self.quotas.iter().find(|q| q.name() == name)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

impl FromStr for Configuration {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml(s)
    }
}

fn parse_quota(raw: RawQuota, role: Role<'_>, position: usize) -> Result<QuotaDescriptor, ConfigError> {
    let name = match &role {
        Role::Configured => match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ConfigError::EmptyName { position }),
        },
        Role::Default => DEFAULT_QUOTA_NAME.to_string(),
        Role::Fallback { parent, .. } => format!("{parent}.{FALLBACK_SUFFIX}"),
    };

    let group_by = parse_paths(&name, raw.group_by.unwrap_or_default())?;
    let group_by = match &role {
        Role::Fallback {
            group_by: inherited,
            ..
        } if group_by.is_empty() => inherited.to_vec(),
        _ if group_by.is_empty() => return Err(ConfigError::EmptyGroupBy { quota: name }),
        _ => group_by,
    };

    let match_by = raw.match_by.unwrap_or_default();
    if !matches!(role, Role::Configured) && !match_by.is_empty() {
        tracing::warn!(quota = %name, "match_by is ignored on default and fallback quotas");
    }

    let bucket_size = integer_field(&name, "bucket_size", raw.bucket_size.as_ref())?;
    let capacity = Capacity::from_bucket_size(bucket_size).ok_or_else(|| ConfigError::InvalidBucketSize {
        quota: name.clone(),
        value: bucket_size,
    })?;

    let duration = integer_field(&name, "duration", raw.duration.as_ref())?;
    let duration_ok = match capacity {
        Capacity::Unlimited => duration >= 0,
        Capacity::Limited(_) => duration > 0,
    };
    if !duration_ok {
        return Err(ConfigError::InvalidDuration {
            quota: name,
            value: duration,
        });
    }

    let action_name = raw.action.unwrap_or_default();
    let action = match Action::from_name(&action_name) {
        Some(Action::Fallback) if !matches!(role, Role::Configured) => {
            return Err(match role {
                Role::Fallback { .. } => ConfigError::NestedFallback { quota: name },
                _ => ConfigError::InvalidAction {
                    quota: name,
                    action: action_name,
                    allowed: role.allowed_actions(),
                },
            });
        }
        Some(action) => action,
        None => {
            return Err(ConfigError::InvalidAction {
                quota: name,
                action: action_name,
                allowed: role.allowed_actions(),
            })
        }
    };

    let mut quota = QuotaDescriptor::new(
        name.as_str(),
        capacity,
        Duration::from_secs(duration as u64),
        action,
    )
    .with_group_by(group_by);

    if let Some(description) = raw.description {
        quota = quota.with_description(description);
    }

    if matches!(role, Role::Configured) {
        for (path, expected) in match_by {
            let field = FieldPath::parse_dotted(&path);
            if field.has_empty_segment() {
                return Err(ConfigError::EmptyFieldPath { quota: name, path });
            }
            if matches!(expected, Value::Array(_) | Value::Object(_)) {
                return Err(ConfigError::NonScalarMatch { quota: name, path });
            }
            quota = quota.with_match(field, expected);
        }
    }

    match (raw.fallback, &role) {
        (Some(_), Role::Fallback { .. }) => Err(ConfigError::NestedFallback { quota: name }),
        (Some(_), Role::Default) => Err(ConfigError::UnexpectedFallback {
            quota: name,
            action,
        }),
        (Some(raw_fallback), Role::Configured) => {
            if action != Action::Fallback {
                return Err(ConfigError::UnexpectedFallback {
                    quota: name,
                    action,
                });
            }
            let fallback = parse_quota(
                *raw_fallback,
                Role::Fallback {
                    parent: &name,
                    group_by: quota.group_by(),
                },
                position,
            )?;
            Ok(quota.with_fallback(fallback))
        }
        (None, _) => {
            if action == Action::Fallback {
                tracing::warn!(
                    quota = %name,
                    "action is fallback but no fallback is configured; rejected records are dropped"
                );
            }
            Ok(quota)
        }
    }
}

fn parse_paths(quota: &str, paths: Vec<String>) -> Result<Vec<FieldPath>, ConfigError> {
    paths
        .into_iter()
        .map(|path| {
            let field = FieldPath::parse_dotted(&path);
            if field.has_empty_segment() {
                Err(ConfigError::EmptyFieldPath {
                    quota: quota.to_string(),
                    path,
                })
            } else {
                Ok(field)
            }
        })
        .collect()
}

fn integer_field(quota: &str, field: &'static str, value: Option<&Value>) -> Result<i64, ConfigError> {
    value.and_then(Value::as_i64).ok_or_else(|| ConfigError::NotInteger {
        quota: quota.to_string(),
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PARSER_CONFIG: &str = r#"
quotas:
  - name: quota1
    description: first quota
    group_by:
      - group1.a
    match_by:
      group1.a: value1
    bucket_size: 100
    duration: 60
    action: drop
  - name: quota2
    description: second quota
    group_by:
      - group1.a
      - group1.b
    match_by:
      group1.a: value2
      group1.b: value3
    bucket_size: 200
    duration: 120
    action: reemit
default:
  description: default quota
  group_by:
    - group1.a
  bucket_size: 300
  duration: 180
  action: reemit
"#;

    fn err(yaml: &str) -> ConfigError {
        Configuration::from_yaml(yaml).expect_err("config should be rejected")
    }

    #[test]
    fn test_parse_quotas() {
        let config = Configuration::from_yaml(PARSER_CONFIG).unwrap();
        let quotas = config.quotas();
        assert_eq!(quotas.len(), 2);

        assert_eq!(quotas[0].name(), "quota1");
        assert_eq!(quotas[1].name(), "quota2");
        assert_eq!(quotas[0].description(), Some("first quota"));
        assert_eq!(quotas[1].description(), Some("second quota"));
        assert_eq!(quotas[0].group_by(), [FieldPath::new(["group1", "a"])]);
        assert_eq!(
            quotas[1].group_by(),
            [FieldPath::new(["group1", "a"]), FieldPath::new(["group1", "b"])]
        );
        assert_eq!(quotas[0].capacity(), Capacity::Limited(100));
        assert_eq!(quotas[1].capacity(), Capacity::Limited(200));
        assert_eq!(quotas[0].duration(), Duration::from_secs(60));
        assert_eq!(quotas[1].duration(), Duration::from_secs(120));
        assert_eq!(quotas[0].action(), Action::Drop);
        assert_eq!(quotas[1].action(), Action::Reemit);
        assert_eq!(
            quotas[0].match_by().get(&FieldPath::new(["group1", "a"])),
            Some(&json!("value1"))
        );
        assert_eq!(quotas[1].match_by().len(), 2);

        let default = config.default_quota();
        assert!(config.has_configured_default());
        assert_eq!(default.name(), "default");
        assert_eq!(default.description(), Some("default quota"));
        assert_eq!(default.group_by(), [FieldPath::new(["group1", "a"])]);
        assert!(default.match_by().is_empty());
        assert_eq!(default.capacity(), Capacity::Limited(300));
        assert_eq!(default.duration(), Duration::from_secs(180));
        assert_eq!(default.action(), Action::Reemit);
    }

    #[test]
    fn test_missing_default_uses_builtin() {
        let config = Configuration::from_yaml(
            r#"
quotas:
  - name: q
    group_by: [a]
    bucket_size: 1
    duration: 1
    action: drop
"#,
        )
        .unwrap();

        assert!(!config.has_configured_default());
        assert_eq!(**config.default_quota(), QuotaDescriptor::builtin_default());
    }

    #[test]
    fn test_no_quotas_section() {
        let config = Configuration::from_yaml(
            "default:\n  group_by: [a]\n  bucket_size: 5\n  duration: 10\n  action: drop\n",
        )
        .unwrap();
        assert!(config.quotas().is_empty());
        assert_eq!(config.default_quota().capacity(), Capacity::Limited(5));
    }

    #[test]
    fn test_fallback_parsed_and_named() {
        let config = Configuration::from_yaml(
            r#"
quotas:
  - name: quota_fallback
    group_by: [group1.a]
    match_by: { group1.a: value_fallback }
    bucket_size: 3
    duration: 60
    action: fallback
    fallback:
      bucket_size: 2
      duration: 60
      action: drop
"#,
        )
        .unwrap();

        let quota = config.find("quota_fallback").unwrap();
        let fallback = quota.fallback().expect("fallback attached");
        assert_eq!(fallback.name(), "quota_fallback.fallback");
        assert_eq!(fallback.capacity(), Capacity::Limited(2));
        assert_eq!(fallback.action(), Action::Drop);
        assert_eq!(fallback.group_by(), quota.group_by());
        assert!(fallback.match_by().is_empty());
        assert!(fallback.fallback().is_none());
    }

    #[test]
    fn test_fallback_may_group_differently() {
        let config = Configuration::from_yaml(
            r#"
quotas:
  - name: q
    group_by: [a, b]
    match_by: { a: x }
    bucket_size: 3
    duration: 60
    action: fallback
    fallback:
      group_by: [a]
      bucket_size: 2
      duration: 60
      action: reemit
"#,
        )
        .unwrap();
        let fallback = config.quotas()[0].fallback().unwrap();
        assert_eq!(fallback.group_by(), [FieldPath::new(["a"])]);
        assert_eq!(fallback.action(), Action::Reemit);
    }

    #[test]
    fn test_fallback_action_without_fallback_is_accepted() {
        let config = Configuration::from_yaml(
            "quotas:\n  - name: q\n    group_by: [a]\n    bucket_size: 1\n    duration: 1\n    action: fallback\n",
        )
        .unwrap();
        assert_eq!(config.quotas()[0].action(), Action::Fallback);
        assert!(config.quotas()[0].fallback().is_none());
    }

    #[test]
    fn test_unlimited_quota_allows_zero_duration() {
        let config = Configuration::from_yaml(
            "quotas:\n  - name: q\n    group_by: [a]\n    bucket_size: -1\n    duration: 0\n    action: drop\n",
        )
        .unwrap();
        assert!(config.quotas()[0].capacity().is_unlimited());
    }

    #[test]
    fn test_match_by_scalar_types() {
        let config = Configuration::from_yaml(
            r#"
quotas:
  - name: q
    group_by: [a]
    match_by: { code: 500, retry: true, tag: null }
    bucket_size: 1
    duration: 1
    action: drop
"#,
        )
        .unwrap();
        let match_by = config.quotas()[0].match_by();
        assert_eq!(match_by.get(&FieldPath::new(["code"])), Some(&json!(500)));
        assert_eq!(match_by.get(&FieldPath::new(["retry"])), Some(&json!(true)));
        assert_eq!(match_by.get(&FieldPath::new(["tag"])), Some(&Value::Null));
    }

    #[test]
    fn test_empty_name_rejected() {
        let e = err("quotas:\n  - name: ''\n    group_by: [a]\n    bucket_size: 1\n    duration: 1\n    action: drop\n");
        assert!(matches!(e, ConfigError::EmptyName { position: 0 }));

        let e = err("quotas:\n  - group_by: [a]\n    bucket_size: 1\n    duration: 1\n    action: drop\n");
        assert!(matches!(e, ConfigError::EmptyName { position: 0 }));
    }

    #[test]
    fn test_duplicate_and_reserved_names_rejected() {
        let e = err(r#"
quotas:
  - { name: q, group_by: [a], bucket_size: 1, duration: 1, action: drop }
  - { name: q, group_by: [a], bucket_size: 1, duration: 1, action: drop }
"#);
        assert!(matches!(e, ConfigError::DuplicateName { quota } if quota == "q"));

        let e = err("quotas:\n  - { name: default, group_by: [a], bucket_size: 1, duration: 1, action: drop }\n");
        assert!(matches!(e, ConfigError::ReservedName { .. }));
    }

    #[test]
    fn test_fallback_name_cannot_be_claimed() {
        let fallback_first = r#"
quotas:
  - name: a
    group_by: [g]
    match_by: { k: a }
    bucket_size: 1
    duration: 60
    action: fallback
    fallback: { bucket_size: 1, duration: 60, action: drop }
  - { name: a.fallback, group_by: [g], match_by: { k: b }, bucket_size: 100, duration: 60, action: drop }
"#;
        let e = err(fallback_first);
        assert!(matches!(&e, ConfigError::ReservedName { quota, .. } if quota == "a.fallback"));
        assert_eq!(
            e.to_string(),
            "quota name `a.fallback` is reserved for the fallback of quota `a`"
        );

        let claimed_first = r#"
quotas:
  - { name: a.fallback, group_by: [g], match_by: { k: b }, bucket_size: 100, duration: 60, action: drop }
  - name: a
    group_by: [g]
    match_by: { k: a }
    bucket_size: 1
    duration: 60
    action: fallback
    fallback: { bucket_size: 1, duration: 60, action: drop }
"#;
        assert!(matches!(err(claimed_first), ConfigError::ReservedName { .. }));
    }

    #[test]
    fn test_fallback_suffix_allowed_without_collision() {
        let config = Configuration::from_yaml(
            "quotas:\n  - { name: b.fallback, group_by: [g], bucket_size: 1, duration: 60, action: drop }\n",
        )
        .unwrap();
        assert!(config.find("b.fallback").is_some());
    }

    #[test]
    fn test_empty_group_by_rejected() {
        let e = err("quotas:\n  - { name: q, group_by: [], bucket_size: 1, duration: 1, action: drop }\n");
        assert!(matches!(e, ConfigError::EmptyGroupBy { quota } if quota == "q"));

        let e = err("quotas:\n  - { name: q, bucket_size: 1, duration: 1, action: drop }\n");
        assert!(matches!(e, ConfigError::EmptyGroupBy { .. }));

        let e = err("default:\n  bucket_size: 1\n  duration: 1\n  action: drop\n");
        assert!(matches!(e, ConfigError::EmptyGroupBy { quota } if quota == "default"));
    }

    #[test]
    fn test_empty_path_segment_rejected() {
        let e = err("quotas:\n  - { name: q, group_by: [a..b], bucket_size: 1, duration: 1, action: drop }\n");
        assert!(matches!(e, ConfigError::EmptyFieldPath { path, .. } if path == "a..b"));
    }

    #[test]
    fn test_non_integer_fields_rejected() {
        let e = err("quotas:\n  - { name: q, group_by: [a], bucket_size: 1.5, duration: 1, action: drop }\n");
        assert!(matches!(e, ConfigError::NotInteger { field: "bucket_size", .. }));

        let e = err("quotas:\n  - { name: q, group_by: [a], bucket_size: 1, duration: '60', action: drop }\n");
        assert!(matches!(e, ConfigError::NotInteger { field: "duration", .. }));

        let e = err("quotas:\n  - { name: q, group_by: [a], duration: 60, action: drop }\n");
        assert!(matches!(e, ConfigError::NotInteger { field: "bucket_size", .. }));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let e = err("quotas:\n  - { name: q, group_by: [a], bucket_size: -2, duration: 1, action: drop }\n");
        assert!(matches!(e, ConfigError::InvalidBucketSize { value: -2, .. }));

        let e = err("quotas:\n  - { name: q, group_by: [a], bucket_size: 10, duration: 0, action: drop }\n");
        assert!(matches!(e, ConfigError::InvalidDuration { value: 0, .. }));

        let e = err("quotas:\n  - { name: q, group_by: [a], bucket_size: -1, duration: -5, action: drop }\n");
        assert!(matches!(e, ConfigError::InvalidDuration { value: -5, .. }));
    }

    #[test]
    fn test_invalid_action_rejected() {
        let e = err("quotas:\n  - { name: q, group_by: [a], bucket_size: 1, duration: 1, action: delete }\n");
        assert!(matches!(e, ConfigError::InvalidAction { action, .. } if action == "delete"));

        let e = err("quotas:\n  - { name: q, group_by: [a], bucket_size: 1, duration: 1 }\n");
        assert!(matches!(e, ConfigError::InvalidAction { action, .. } if action.is_empty()));

        let e = err("default:\n  group_by: [a]\n  bucket_size: 1\n  duration: 1\n  action: fallback\n");
        assert!(matches!(e, ConfigError::InvalidAction { quota, .. } if quota == "default"));
    }

    #[test]
    fn test_fallback_on_non_fallback_action_rejected() {
        let e = err(r#"
quotas:
  - name: q
    group_by: [a]
    bucket_size: 1
    duration: 1
    action: drop
    fallback: { bucket_size: 1, duration: 1, action: drop }
"#);
        assert!(matches!(e, ConfigError::UnexpectedFallback { action: Action::Drop, .. }));
    }

    #[test]
    fn test_nested_fallback_rejected() {
        let e = err(r#"
quotas:
  - name: q
    group_by: [a]
    bucket_size: 1
    duration: 1
    action: fallback
    fallback:
      bucket_size: 1
      duration: 1
      action: fallback
"#);
        assert!(matches!(e, ConfigError::NestedFallback { quota } if quota == "q.fallback"));

        let e = err(r#"
quotas:
  - name: q
    group_by: [a]
    bucket_size: 1
    duration: 1
    action: fallback
    fallback:
      bucket_size: 1
      duration: 1
      action: drop
      fallback: { bucket_size: 1, duration: 1, action: drop }
"#);
        assert!(matches!(e, ConfigError::NestedFallback { .. }));
    }

    #[test]
    fn test_non_scalar_match_rejected() {
        let e = err(r#"
quotas:
  - name: q
    group_by: [a]
    match_by: { a: [1, 2] }
    bucket_size: 1
    duration: 1
    action: drop
"#);
        assert!(matches!(e, ConfigError::NonScalarMatch { path, .. } if path == "a"));
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(err("quotas: [unclosed"), ConfigError::Yaml(_)));
    }

    #[test]
    fn test_error_messages_name_the_quota() {
        let e = err("quotas:\n  - { name: noisy, group_by: [a], bucket_size: x, duration: 1, action: drop }\n");
        assert_eq!(e.to_string(), "quota `noisy`: bucket_size must be an integer");
    }

    #[test]
    fn test_from_str() {
        let config: Configuration = PARSER_CONFIG.parse().unwrap();
        assert_eq!(config.quotas().len(), 2);
    }
}
