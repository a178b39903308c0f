//! Request execution with at-most-one failover retry
//!
//! `FailoverRouter` is the facade callers hold: register a group once, then
//! execute logical requests through it. The router selects an endpoint,
//! delegates the actual network I/O to the caller-supplied transport,
//! classifies the outcome, updates health, and retries once against a
//! different endpoint when the failure is retryable.

use crate::classify::classify;
use crate::config::{EndpointConfig, FailoverPolicy, GroupsConfig};
use crate::error::{RouterError, RouterResult, UpstreamFailure};
use crate::health::{EndpointStatus, HealthRegistry};
use crate::selector::Selection;
use std::future::Future;

/// A successful execution, carrying the serving endpoint's index as metadata
#[derive(Debug, Clone)]
pub struct Routed<T> {
    response: T,
    endpoint_index: usize,
}

impl<T> Routed<T> {
    /// Get the transport's response
    pub fn response(&self) -> &T {
        &self.response
    }

    /// Which endpoint index served the request (0 is the primary)
    pub fn endpoint_index(&self) -> usize {
        self.endpoint_index
    }

    /// Consume and return the transport's response
    pub fn into_inner(self) -> T {
        self.response
    }
}

/// Resilient outbound-request router over named groups of interchangeable
/// upstream endpoints
///
/// Explicitly constructed and dependency-injected rather than a process
/// global, so tests (and embedders running several routers) get isolated
/// health state. Cheap to share behind an `Arc`.
pub struct FailoverRouter {
    registry: HealthRegistry,
}

impl FailoverRouter {
    pub fn new() -> Self {
        Self {
            registry: HealthRegistry::new(),
        }
    }

    /// Register a failover group with the default policy
    ///
    /// Idempotent per group id: a known id is a no-op that preserves health
    /// state. Returns true if the group was newly registered.
    pub async fn register(
        &self,
        group_id: &str,
        endpoints: Vec<EndpointConfig>,
    ) -> RouterResult<bool> {
        self.registry
            .register(group_id, endpoints, FailoverPolicy::default())
            .await
    }

    /// Register a failover group with an explicit health policy
    pub async fn register_with_policy(
        &self,
        group_id: &str,
        endpoints: Vec<EndpointConfig>,
        policy: FailoverPolicy,
    ) -> RouterResult<bool> {
        self.registry.register(group_id, endpoints, policy).await
    }

    /// Register every group from a loaded TOML config
    pub async fn register_groups(&self, config: &GroupsConfig) -> RouterResult<()> {
        for group in config.groups() {
            self.registry
                .register(group.name(), group.endpoints().to_vec(), group.policy().clone())
                .await?;
        }
        Ok(())
    }

    /// Select the current best endpoint for a group
    ///
    /// Primary-preferred; may clear an expired recovery backoff as a side
    /// effect (see `selector`). Fails only for unknown group ids.
    pub async fn select(&self, group_id: &str) -> RouterResult<Selection> {
        self.registry.select(group_id).await
    }

    /// Report a successful request made outside `execute`
    pub async fn record_success(&self, selection: &Selection) {
        self.registry.record_success(selection.handle()).await;
    }

    /// Report a failed request made outside `execute`
    pub async fn record_failure(&self, selection: &Selection, failure: &UpstreamFailure) {
        self.registry
            .record_failure(selection.handle(), classify(failure))
            .await;
    }

    /// Execute one logical request through the group
    ///
    /// The transport performs the actual network I/O against the endpoint it
    /// is handed (URL and credential included); timeout and cancellation are
    /// its responsibility. The router makes at most two transport attempts:
    /// the second only happens when re-selection after a failure lands on a
    /// different endpoint, and its error is surfaced verbatim when both
    /// attempts fail. Callers needing more than one retry loop at a higher
    /// level.
    pub async fn execute<T, F, Fut>(&self, group_id: &str, mut transport: F) -> RouterResult<Routed<T>>
    where
        F: FnMut(EndpointConfig) -> Fut,
        Fut: Future<Output = Result<T, UpstreamFailure>>,
    {
        let first = self.registry.select(group_id).await?;
        tracing::debug!(
            group_id = %group_id,
            endpoint_index = first.index(),
            endpoint_url = %first.endpoint().url(),
            "Attempting request"
        );

        let first_failure = match transport(first.endpoint().clone()).await {
            Ok(response) => {
                self.registry.record_success(first.handle()).await;
                return Ok(Routed {
                    response,
                    endpoint_index: first.index(),
                });
            }
            Err(failure) => failure,
        };

        self.registry
            .record_failure(first.handle(), classify(&first_failure))
            .await;

        // Re-select: the failed endpoint is now unhealthy (if the failure was
        // retryable), so this naturally prefers a different one. Same index
        // means no alternative is available and the original error stands.
        let second = self.registry.select(group_id).await?;
        if second.index() == first.index() {
            tracing::debug!(
                group_id = %group_id,
                endpoint_index = first.index(),
                error = %first_failure,
                "No alternate endpoint available, surfacing original error"
            );
            return Err(RouterError::Upstream(first_failure));
        }

        tracing::info!(
            group_id = %group_id,
            failed_index = first.index(),
            retry_index = second.index(),
            error = %first_failure,
            "Failing over to alternate endpoint"
        );

        match transport(second.endpoint().clone()).await {
            Ok(response) => {
                self.registry.record_success(second.handle()).await;
                Ok(Routed {
                    response,
                    endpoint_index: second.index(),
                })
            }
            Err(second_failure) => {
                self.registry
                    .record_failure(second.handle(), classify(&second_failure))
                    .await;
                // The second error reflects the most recent state; surface it
                // rather than the first.
                Err(RouterError::Upstream(second_failure))
            }
        }
    }

    /// Check whether a group id has been registered
    pub async fn is_registered(&self, group_id: &str) -> bool {
        self.registry.is_registered(group_id).await
    }

    /// Get all endpoint statuses for a group, for display/debugging
    pub async fn health_snapshot(&self, group_id: &str) -> RouterResult<Vec<EndpointStatus>> {
        self.registry.snapshot(group_id).await
    }
}

impl Default for FailoverRouter {
    fn default() -> Self {
        Self::new()
    }
}
