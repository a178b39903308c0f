//! Configuration types for failover groups
//!
//! Parses TOML group files and environment-style endpoint lists, and provides
//! typed access to endpoint and policy settings.

use crate::error::{RouterError, RouterResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Static configuration for a single upstream endpoint
///
/// Fields are private to prevent mutation after a group is registered; the
/// registry clones these into selections.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
    url: String,
    /// Opaque credential injected by the transport (e.g. a bearer token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credential: Option<String>,
}

impl EndpointConfig {
    /// Create an endpoint with no credential
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credential: None,
        }
    }

    /// Create an endpoint with a credential
    pub fn with_credential(url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credential: Some(credential.into()),
        }
    }

    /// Get the endpoint base URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the endpoint credential, if one is configured
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

/// Health policy for a failover group
///
/// The failure threshold is deliberately configurable: a latency-sensitive
/// LLM group may want to fail over after a single retryable failure, while a
/// search-provider group may tolerate a few before demoting an endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FailoverPolicy {
    /// Consecutive retryable failures before an endpoint is marked unhealthy
    #[serde(default = "default_failure_threshold")]
    failure_threshold: u32,
    /// Base recovery-probe interval in milliseconds
    #[serde(default = "default_base_recovery_ms")]
    base_recovery_ms: u64,
    /// Cap on the recovery-probe interval in milliseconds
    #[serde(default = "default_max_recovery_ms")]
    max_recovery_ms: u64,
}

fn default_failure_threshold() -> u32 {
    1
}

fn default_base_recovery_ms() -> u64 {
    60_000
}

fn default_max_recovery_ms() -> u64 {
    1_800_000
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            base_recovery_ms: default_base_recovery_ms(),
            max_recovery_ms: default_max_recovery_ms(),
        }
    }
}

impl FailoverPolicy {
    /// Set the consecutive-failure threshold (minimum 1)
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the base recovery-probe interval
    pub fn base_recovery(mut self, interval: Duration) -> Self {
        self.base_recovery_ms = interval.as_millis() as u64;
        self
    }

    /// Set the maximum recovery-probe interval
    pub fn max_recovery(mut self, interval: Duration) -> Self {
        self.max_recovery_ms = interval.as_millis() as u64;
        self
    }

    /// Get the consecutive-failure threshold
    pub fn threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Get the base recovery-probe interval
    pub fn base_recovery_interval(&self) -> Duration {
        Duration::from_millis(self.base_recovery_ms)
    }

    /// Get the maximum recovery-probe interval
    pub fn max_recovery_interval(&self) -> Duration {
        Duration::from_millis(self.max_recovery_ms)
    }

    /// Validate internal consistency
    pub fn validate(&self) -> RouterResult<()> {
        if self.failure_threshold == 0 {
            return Err(RouterError::Config(
                "failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.base_recovery_ms == 0 {
            return Err(RouterError::Config(
                "base_recovery_ms must be positive".to_string(),
            ));
        }
        if self.max_recovery_ms < self.base_recovery_ms {
            return Err(RouterError::Config(format!(
                "max_recovery_ms ({}) must be >= base_recovery_ms ({})",
                self.max_recovery_ms, self.base_recovery_ms
            )));
        }
        Ok(())
    }
}

/// One named failover group in a TOML config file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    name: String,
    endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    policy: FailoverPolicy,
}

impl GroupConfig {
    /// Get the group name (used as the registration group id)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the ordered endpoint list (index 0 is the primary)
    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    /// Get the group's health policy
    pub fn policy(&self) -> &FailoverPolicy {
        &self.policy
    }
}

/// Root structure of a TOML group file
///
/// ```toml
/// [[groups]]
/// name = "llm-backends"
/// endpoints = [
///     { url = "http://primary:8080/v1", credential = "sk-primary" },
///     { url = "http://fallback:8080/v1" },
/// ]
///
/// [groups.policy]
/// failure_threshold = 1
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GroupsConfig {
    #[serde(default)]
    groups: Vec<GroupConfig>,
}

impl GroupsConfig {
    /// Load and validate a group file
    pub fn from_file(path: impl AsRef<Path>) -> RouterResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RouterError::Config(format!(
                "failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| RouterError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configured groups
    pub fn groups(&self) -> &[GroupConfig] {
        &self.groups
    }

    /// Validate all groups: non-empty names and endpoint lists, unique names,
    /// consistent policies
    pub fn validate(&self) -> RouterResult<()> {
        let mut seen = std::collections::HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(RouterError::Config("group name cannot be empty".to_string()));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(RouterError::Config(format!(
                    "duplicate group name: {}",
                    group.name
                )));
            }
            if group.endpoints.is_empty() {
                return Err(RouterError::Config(format!(
                    "group {} has no endpoints",
                    group.name
                )));
            }
            for endpoint in &group.endpoints {
                if endpoint.url.trim().is_empty() {
                    return Err(RouterError::Config(format!(
                        "group {} has an endpoint with an empty url",
                        group.name
                    )));
                }
            }
            group.policy.validate()?;
        }
        Ok(())
    }
}

/// Build an endpoint list from parallel comma-separated URL and credential
/// lists (the shape callers typically consume from the environment)
///
/// The credential list, when present and non-empty, must have exactly one
/// entry per URL; an empty entry means "no credential for this endpoint".
/// A length mismatch is a configuration error and is rejected before any
/// registration can happen.
pub fn endpoints_from_lists(
    urls: &str,
    credentials: Option<&str>,
) -> RouterResult<Vec<EndpointConfig>> {
    let urls: Vec<&str> = urls
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .collect();

    if urls.is_empty() {
        return Err(RouterError::Config(
            "endpoint URL list is empty".to_string(),
        ));
    }

    let credentials: Vec<Option<String>> = match credentials.map(str::trim) {
        None | Some("") => vec![None; urls.len()],
        Some(list) => {
            let entries: Vec<&str> = list.split(',').map(str::trim).collect();
            if entries.len() != urls.len() {
                return Err(RouterError::Config(format!(
                    "credential list length ({}) does not match URL list length ({})",
                    entries.len(),
                    urls.len()
                )));
            }
            entries
                .into_iter()
                .map(|c| (!c.is_empty()).then(|| c.to_string()))
                .collect()
        }
    };

    Ok(urls
        .into_iter()
        .zip(credentials)
        .map(|(url, credential)| EndpointConfig {
            url: url.to_string(),
            credential,
        })
        .collect())
}

/// Derive a deterministic group id from an endpoint list
///
/// Sorted by URL so that logically-equivalent configurations (same endpoints,
/// any order) map to the same id and therefore share health state across
/// re-registrations within a process lifetime.
pub fn derive_group_id(endpoints: &[EndpointConfig]) -> String {
    let mut urls: Vec<&str> = endpoints.iter().map(|e| e.url.as_str()).collect();
    urls.sort_unstable();
    urls.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_from_lists_parallel() {
        let endpoints =
            endpoints_from_lists("http://a/v1,http://b/v1", Some("key-a,key-b")).unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].url(), "http://a/v1");
        assert_eq!(endpoints[0].credential(), Some("key-a"));
        assert_eq!(endpoints[1].credential(), Some("key-b"));
    }

    #[test]
    fn test_endpoints_from_lists_no_credentials() {
        let endpoints = endpoints_from_lists("http://a/v1, http://b/v1", None).unwrap();
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints.iter().all(|e| e.credential().is_none()));
    }

    #[test]
    fn test_endpoints_from_lists_blank_credential_entry() {
        let endpoints = endpoints_from_lists("http://a/v1,http://b/v1", Some("key-a,")).unwrap();
        assert_eq!(endpoints[0].credential(), Some("key-a"));
        assert_eq!(endpoints[1].credential(), None);
    }

    #[test]
    fn test_endpoints_from_lists_length_mismatch_rejected() {
        let err = endpoints_from_lists("http://a/v1,http://b/v1", Some("only-one"))
            .expect_err("mismatch must be rejected");
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_endpoints_from_lists_empty_urls_rejected() {
        assert!(endpoints_from_lists("", None).is_err());
        assert!(endpoints_from_lists(" , ", None).is_err());
    }

    #[test]
    fn test_derive_group_id_is_order_independent() {
        let forward = vec![
            EndpointConfig::new("http://a/v1"),
            EndpointConfig::new("http://b/v1"),
        ];
        let reversed = vec![
            EndpointConfig::new("http://b/v1"),
            EndpointConfig::new("http://a/v1"),
        ];
        assert_eq!(derive_group_id(&forward), derive_group_id(&reversed));
    }

    #[test]
    fn test_policy_defaults() {
        let policy = FailoverPolicy::default();
        assert_eq!(policy.threshold(), 1);
        assert_eq!(policy.base_recovery_interval(), Duration::from_secs(60));
        assert_eq!(policy.max_recovery_interval(), Duration::from_secs(1800));
        policy.validate().unwrap();
    }

    #[test]
    fn test_policy_threshold_floor() {
        let policy = FailoverPolicy::default().failure_threshold(0);
        assert_eq!(policy.threshold(), 1);
    }

    #[test]
    fn test_policy_rejects_inverted_bounds() {
        let policy = FailoverPolicy::default()
            .base_recovery(Duration::from_secs(120))
            .max_recovery(Duration::from_secs(60));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_groups_config_parses_toml() {
        let toml = r#"
            [[groups]]
            name = "llm-backends"
            endpoints = [
                { url = "http://primary:8080/v1", credential = "sk-primary" },
                { url = "http://fallback:8080/v1" },
            ]

            [groups.policy]
            failure_threshold = 3

            [[groups]]
            name = "search-providers"
            endpoints = [{ url = "https://search.example/api" }]
        "#;

        let config: GroupsConfig = toml::from_str(toml).expect("should parse TOML config");
        config.validate().expect("config should validate");

        assert_eq!(config.groups().len(), 2);
        let llm = &config.groups()[0];
        assert_eq!(llm.name(), "llm-backends");
        assert_eq!(llm.endpoints().len(), 2);
        assert_eq!(llm.endpoints()[0].credential(), Some("sk-primary"));
        assert_eq!(llm.policy().threshold(), 3);

        // Second group falls back to the default policy
        assert_eq!(config.groups()[1].policy().threshold(), 1);
    }

    #[test]
    fn test_groups_config_rejects_duplicates() {
        let toml = r#"
            [[groups]]
            name = "dup"
            endpoints = [{ url = "http://a/v1" }]

            [[groups]]
            name = "dup"
            endpoints = [{ url = "http://b/v1" }]
        "#;

        let config: GroupsConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_groups_config_rejects_empty_endpoint_list() {
        let toml = r#"
            [[groups]]
            name = "empty"
            endpoints = []
        "#;

        let config: GroupsConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }
}
