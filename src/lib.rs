//! Steadyroute - resilient outbound-request router
//!
//! Given a named group of interchangeable upstream HTTP endpoints (alternate
//! LLM inference backends, alternate search providers, ...), the router
//! decides per request which endpoint to use, tracks each endpoint's health,
//! and fails over to an alternate when the active one is unreliable - while
//! drifting back to the preferred primary endpoint once it recovers, with
//! exponential-backoff recovery probing piggybacked on real traffic.
//!
//! ```no_run
//! use steadyroute::{EndpointConfig, FailoverRouter, HttpTransport};
//!
//! # async fn run() -> steadyroute::RouterResult<()> {
//! let router = FailoverRouter::new();
//! router
//!     .register(
//!         "llm-backends",
//!         vec![
//!             EndpointConfig::with_credential("http://primary:8080/v1", "sk-primary"),
//!             EndpointConfig::new("http://fallback:8080/v1"),
//!         ],
//!     )
//!     .await?;
//!
//! let transport = HttpTransport::new(reqwest::Client::new());
//! let routed = router
//!     .execute("llm-backends", |endpoint| {
//!         let transport = transport.clone();
//!         async move { transport.get(&endpoint, "/models").await }
//!     })
//!     .await?;
//! println!("served by endpoint {}", routed.endpoint_index());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod health;
pub mod router;
pub mod selector;
pub mod telemetry;
pub mod transport;

pub use classify::{Retryability, classify};
pub use config::{
    EndpointConfig, FailoverPolicy, GroupConfig, GroupsConfig, derive_group_id,
    endpoints_from_lists,
};
pub use error::{RouterError, RouterResult, TransportErrorKind, UpstreamFailure};
pub use health::{EndpointStatus, HealthRecord, HealthRegistry};
pub use router::{FailoverRouter, Routed};
pub use selector::{EndpointHandle, Selection, recovery_interval};
pub use transport::HttpTransport;
