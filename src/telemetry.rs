//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently
/// ignored. Embedders that install their own subscriber should skip this and
/// let the router's `tracing` events flow into it.
///
/// Reads log level from RUST_LOG environment variable, falling back to
/// `default_level` for this crate's events.
///
/// # Examples
///
/// ```no_run
/// steadyroute::telemetry::init("info");
/// tracing::info!("Router starting");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("steadyroute={default_level}")));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
