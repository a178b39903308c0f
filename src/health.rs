//! Per-endpoint health state and the process-wide health registry
//!
//! The registry owns all mutable health state, keyed by group id. Endpoints
//! that fail are marked unhealthy and excluded from selection until a
//! recovery probe re-enables them (see `selector`).

use crate::classify::Retryability;
use crate::config::{EndpointConfig, FailoverPolicy};
use crate::error::{RouterError, RouterResult};
use crate::selector::{self, EndpointHandle, Selection};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Mutable health state for a single endpoint
///
/// Fields are private to ensure state invariants are maintained: whenever a
/// transition settles with `healthy == true`, `consecutive_failures == 0`.
/// `total_failure_count` sizes the recovery backoff and is only cleared by a
/// confirmed success, so a recovered endpoint regains fast-retry eligibility.
#[derive(Debug, Clone)]
pub struct HealthRecord {
    healthy: bool,
    consecutive_failures: u32,
    total_failure_count: u32,
    last_failure_at: Option<Instant>,
}

impl HealthRecord {
    pub(crate) fn new() -> Self {
        Self {
            healthy: true,
            consecutive_failures: 0,
            total_failure_count: 0,
            last_failure_at: None,
        }
    }

    /// Check if the endpoint is currently healthy
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Failures since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Cumulative failures since the last success; sizes the recovery backoff
    pub fn total_failure_count(&self) -> u32 {
        self.total_failure_count
    }

    /// When the endpoint last failed, if ever
    pub fn last_failure_at(&self) -> Option<Instant> {
        self.last_failure_at
    }

    /// A confirmed success: fully reset, endpoint is preferred again
    pub(crate) fn note_success(&mut self) {
        self.healthy = true;
        self.consecutive_failures = 0;
        self.total_failure_count = 0;
    }

    /// A retryable failure; returns true if this crossed the unhealthy
    /// threshold
    pub(crate) fn note_failure(&mut self, now: Instant, threshold: u32) -> bool {
        self.consecutive_failures += 1;
        self.total_failure_count = self.total_failure_count.saturating_add(1);
        self.last_failure_at = Some(now);

        let crossed = self.healthy && self.consecutive_failures >= threshold;
        if self.consecutive_failures >= threshold {
            self.healthy = false;
        }
        crossed
    }

    /// Optimistic recovery probe: re-enable without clearing the total
    /// failure count, so a flapping endpoint keeps backing off
    pub(crate) fn restore(&mut self) {
        self.healthy = true;
        self.consecutive_failures = 0;
    }
}

/// An endpoint paired with its current health, for display/debugging
#[derive(Debug, Clone)]
pub struct EndpointStatus {
    endpoint: EndpointConfig,
    health: HealthRecord,
}

impl EndpointStatus {
    /// Get the endpoint configuration
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Get the health record
    pub fn health(&self) -> &HealthRecord {
        &self.health
    }
}

pub(crate) struct GroupState {
    pub(crate) endpoints: Vec<EndpointConfig>,
    pub(crate) policy: FailoverPolicy,
    pub(crate) health: Vec<HealthRecord>,
}

/// Process-wide store of per-endpoint health records, keyed by group id
///
/// All mutations happen under a single write lock, so concurrent
/// read-modify-write races cannot lose updates. Nothing in here performs
/// network I/O; every operation is in-memory bookkeeping.
///
/// Construct one per process (or per test) and share it behind the
/// `FailoverRouter` facade; there is deliberately no global singleton.
pub struct HealthRegistry {
    groups: RwLock<HashMap<String, GroupState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Register a failover group
    ///
    /// Idempotent per group id: re-registering a known id is a no-op that
    /// preserves existing health state (and ignores the new endpoint list),
    /// so logically-equivalent re-initialization does not reset health.
    /// Returns true if the group was newly registered.
    pub async fn register(
        &self,
        group_id: &str,
        endpoints: Vec<EndpointConfig>,
        policy: FailoverPolicy,
    ) -> RouterResult<bool> {
        if endpoints.is_empty() {
            return Err(RouterError::Config(format!(
                "group {group_id} must have at least one endpoint"
            )));
        }
        policy.validate()?;

        let mut groups = self.groups.write().await;
        if groups.contains_key(group_id) {
            tracing::debug!(
                group_id = %group_id,
                "Group already registered, preserving health state"
            );
            return Ok(false);
        }

        let health = endpoints.iter().map(|_| HealthRecord::new()).collect();
        tracing::info!(
            group_id = %group_id,
            endpoint_count = endpoints.len(),
            failure_threshold = policy.threshold(),
            "Registered failover group with all endpoints starting as healthy"
        );
        groups.insert(
            group_id.to_string(),
            GroupState {
                endpoints,
                policy,
                health,
            },
        );
        Ok(true)
    }

    /// Check whether a group id is known
    pub async fn is_registered(&self, group_id: &str) -> bool {
        self.groups.read().await.contains_key(group_id)
    }

    /// Record a successful request through an endpoint
    ///
    /// Resets both failure counters and marks the endpoint healthy, making it
    /// immediately eligible as the preferred choice again.
    pub async fn record_success(&self, handle: &EndpointHandle) {
        let mut groups = self.groups.write().await;
        let Some(record) = groups
            .get_mut(handle.group())
            .and_then(|state| state.health.get_mut(handle.index()))
        else {
            // Handles only come from selection, so this indicates a stale
            // handle from a different registry instance.
            tracing::warn!(
                group_id = %handle.group(),
                endpoint_index = handle.index(),
                "Attempted to record success for unknown endpoint"
            );
            return;
        };

        let was_unhealthy = !record.is_healthy();
        record.note_success();

        if was_unhealthy {
            tracing::info!(
                group_id = %handle.group(),
                endpoint_index = handle.index(),
                "Endpoint recovered to healthy state (failure counts reset)"
            );
        } else {
            tracing::debug!(
                group_id = %handle.group(),
                endpoint_index = handle.index(),
                "Endpoint success recorded"
            );
        }
    }

    /// Record a failed request through an endpoint
    ///
    /// Non-retryable failures are a no-op: they indicate a bad request, not a
    /// bad endpoint, and must never degrade health. Retryable failures bump
    /// both counters and mark the endpoint unhealthy once the group's
    /// threshold is reached.
    pub async fn record_failure(&self, handle: &EndpointHandle, retryability: Retryability) {
        if !retryability.is_retryable() {
            tracing::debug!(
                group_id = %handle.group(),
                endpoint_index = handle.index(),
                "Non-retryable failure, endpoint health unchanged"
            );
            return;
        }

        let mut groups = self.groups.write().await;
        let Some(state) = groups.get_mut(handle.group()) else {
            tracing::warn!(
                group_id = %handle.group(),
                "Attempted to record failure for unknown group"
            );
            return;
        };
        let policy = state.policy.clone();
        let Some(record) = state.health.get_mut(handle.index()) else {
            tracing::warn!(
                group_id = %handle.group(),
                endpoint_index = handle.index(),
                "Attempted to record failure for unknown endpoint index"
            );
            return;
        };

        let crossed = record.note_failure(Instant::now(), policy.threshold());
        if crossed {
            let next_probe = selector::recovery_interval(&policy, record.total_failure_count());
            tracing::warn!(
                group_id = %handle.group(),
                endpoint_index = handle.index(),
                consecutive_failures = record.consecutive_failures(),
                total_failure_count = record.total_failure_count(),
                next_probe_secs = next_probe.as_secs(),
                "Endpoint marked unhealthy"
            );
        } else {
            tracing::debug!(
                group_id = %handle.group(),
                endpoint_index = handle.index(),
                consecutive_failures = record.consecutive_failures(),
                "Endpoint failure recorded"
            );
        }
    }

    /// Select the active endpoint for a group
    ///
    /// Not a pure read: an expired recovery backoff on the primary is cleared
    /// here, piggybacking probing on real traffic instead of a background
    /// prober. Fails only if the group was never registered.
    pub async fn select(&self, group_id: &str) -> RouterResult<Selection> {
        let mut groups = self.groups.write().await;
        let state = groups
            .get_mut(group_id)
            .ok_or_else(|| RouterError::UnknownGroup(group_id.to_string()))?;

        let index = selector::select_index(
            group_id,
            &mut state.health,
            &state.policy,
            Instant::now(),
        );

        Ok(Selection::new(
            state.endpoints[index].clone(),
            EndpointHandle::new(group_id.to_string(), index),
        ))
    }

    /// Get all endpoint statuses for a group, for display/debugging
    pub async fn snapshot(&self, group_id: &str) -> RouterResult<Vec<EndpointStatus>> {
        let groups = self.groups.read().await;
        let state = groups
            .get(group_id)
            .ok_or_else(|| RouterError::UnknownGroup(group_id.to_string()))?;

        Ok(state
            .endpoints
            .iter()
            .zip(state.health.iter())
            .map(|(endpoint, health)| EndpointStatus {
                endpoint: endpoint.clone(),
                health: health.clone(),
            })
            .collect())
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}
