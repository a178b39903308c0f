//! Failure classification for failover decisions
//!
//! Maps an `UpstreamFailure` observation to a retry decision. The rules, in
//! priority order:
//!
//! 1. Connection-level errors (refused, DNS, timeout, generic network) are
//!    retryable - the endpoint is unreachable, another one may not be.
//! 2. HTTP 5xx is retryable - the endpoint itself is failing.
//! 3. HTTP 4xx is NOT retryable - the request or credentials are the problem,
//!    so failing over would not help and must not penalize a healthy endpoint.
//! 4. Anything unrecognized is retryable, failing toward availability rather
//!    than risking getting stuck on a broken endpoint.

use crate::error::UpstreamFailure;

/// Whether an observed failure justifies trying a different endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// The endpoint appears to be at fault; another endpoint may succeed
    Retryable,
    /// The request or caller is at fault; health must not be degraded
    NonRetryable,
}

impl Retryability {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable)
    }
}

/// Classify an upstream failure as retryable or non-retryable
///
/// Pure function over the structured failure type; never inspects message
/// text.
pub fn classify(failure: &UpstreamFailure) -> Retryability {
    match failure {
        UpstreamFailure::Transport { .. } => Retryability::Retryable,
        UpstreamFailure::Http { status, .. } if (500..=599).contains(status) => {
            Retryability::Retryable
        }
        UpstreamFailure::Http { status, .. } if (400..=499).contains(status) => {
            Retryability::NonRetryable
        }
        // Unrecognized status ranges and opaque failures: fail safe toward
        // availability.
        _ => Retryability::Retryable,
    }
}
