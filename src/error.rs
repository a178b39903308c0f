//! Error types for steadyroute
//!
//! `UpstreamFailure` is the structured observation fed to the failure
//! classifier; `RouterError` is what callers see from the public API.

use thiserror::Error;

/// Category of a connection-level transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// TCP connect failed (refused, reset, unreachable)
    Connect,
    /// Hostname did not resolve
    Dns,
    /// The request timed out
    Timeout,
    /// Any other network-level failure
    Network,
}

/// Structured observation of one failed upstream attempt
///
/// Carries an explicit status code or error category so the classifier never
/// has to substring-match a stringified error. Callers that run their own
/// transport construct these directly; the bundled `transport` adapter maps
/// `reqwest` outcomes into them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamFailure {
    #[error("transport failure ({kind:?}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unclassified upstream failure: {0}")]
    Other(String),
}

impl UpstreamFailure {
    /// Convenience constructor for a transport-level failure
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Convenience constructor for an HTTP status failure
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status code, if this failure carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Main error type for the router's public API
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("unknown failover group: {0}")]
    UnknownGroup(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The last upstream failure after the router exhausted its attempts
    #[error(transparent)]
    Upstream(#[from] UpstreamFailure),
}

/// Convenience type alias for Results
pub type RouterResult<T> = Result<T, RouterError>;
