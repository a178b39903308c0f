//! Endpoint selection with primary preference and recovery probing
//!
//! The primary (index 0) is assumed to be the cheapest/most desirable
//! endpoint, so selection drifts back to it automatically once its recovery
//! backoff elapses, with increasing patience so a flapping primary does not
//! cause oscillation.

use crate::config::{EndpointConfig, FailoverPolicy};
use crate::health::HealthRecord;
use std::time::Duration;
use tokio::time::Instant;

/// Opaque reference to one endpoint within a registered group
///
/// Selections hand these back so callers can report outcomes without juggling
/// bare array indices that could be confused across groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointHandle {
    group: String,
    index: usize,
}

impl EndpointHandle {
    pub(crate) fn new(group: String, index: usize) -> Self {
        Self { group, index }
    }

    /// The group this handle belongs to
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Ordinal position within the group; 0 is the primary. Exposed for
    /// observability only.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// The outcome of a selection: the chosen endpoint plus its handle
#[derive(Debug, Clone)]
pub struct Selection {
    endpoint: EndpointConfig,
    handle: EndpointHandle,
}

impl Selection {
    pub(crate) fn new(endpoint: EndpointConfig, handle: EndpointHandle) -> Self {
        Self { endpoint, handle }
    }

    /// Get the selected endpoint configuration
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Get the handle identifying the selected endpoint
    pub fn handle(&self) -> &EndpointHandle {
        &self.handle
    }

    /// Shorthand for the selected index within the group
    pub fn index(&self) -> usize {
        self.handle.index
    }
}

/// Recovery-probe interval for an endpoint with the given total failure count
///
/// Exponential backoff: `min(base * 2^count, max)`. With the default policy
/// this is 60s, 120s, 240s, ... capped at 30 minutes.
pub fn recovery_interval(policy: &FailoverPolicy, total_failure_count: u32) -> Duration {
    let base_ms = policy.base_recovery_interval().as_millis() as u64;
    let max_ms = policy.max_recovery_interval().as_millis() as u64;

    let scaled_ms = match 1u64.checked_shl(total_failure_count) {
        Some(factor) => base_ms.saturating_mul(factor),
        None => u64::MAX,
    };
    Duration::from_millis(scaled_ms.min(max_ms))
}

/// Pick the active endpoint index for a group
///
/// Not a pure read: if the primary's recovery backoff has elapsed, it is
/// optimistically re-enabled here so the very next request probes it with
/// real traffic. There is no separate background prober.
///
/// Algorithm:
/// 1. If the primary is unhealthy and its backoff has elapsed, restore it.
/// 2. Return the first healthy endpoint in index order.
/// 3. If none are healthy, force-reset the primary and return it - the
///    router always attempts a request rather than refusing to route.
pub(crate) fn select_index(
    group_id: &str,
    health: &mut [HealthRecord],
    policy: &FailoverPolicy,
    now: Instant,
) -> usize {
    debug_assert!(!health.is_empty(), "registration rejects empty groups");

    if !health[0].is_healthy()
        && let Some(last_failure) = health[0].last_failure_at()
    {
        let interval = recovery_interval(policy, health[0].total_failure_count());
        let since_failure = now.duration_since(last_failure);
        if since_failure >= interval {
            tracing::info!(
                group_id = %group_id,
                since_failure_secs = since_failure.as_secs(),
                backoff_secs = interval.as_secs(),
                "Attempting recovery probe of primary endpoint"
            );
            health[0].restore();
        }
    }

    for (index, record) in health.iter().enumerate() {
        if record.is_healthy() {
            if index > 0 {
                tracing::debug!(
                    group_id = %group_id,
                    endpoint_index = index,
                    "Primary unavailable, using fallback endpoint"
                );
            }
            return index;
        }
    }

    // Last resort: probe the preferred endpoint instead of refusing to route.
    tracing::warn!(
        group_id = %group_id,
        endpoint_count = health.len(),
        "All endpoints unhealthy, force-resetting primary"
    );
    health[0].restore();
    0
}
