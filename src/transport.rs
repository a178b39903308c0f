//! Bundled HTTP transport adapter
//!
//! Builds transport calls for `FailoverRouter::execute` on top of `reqwest`:
//! joins the selected endpoint's base URL with a request path, injects the
//! endpoint credential as a bearer token, and maps transport and status
//! outcomes into `UpstreamFailure` observations the classifier understands.
//!
//! Callers with their own HTTP stack can skip this module entirely and map
//! errors themselves; the router only sees `UpstreamFailure`.

use crate::config::EndpointConfig;
use crate::error::{TransportErrorKind, UpstreamFailure};

/// How much upstream error-body text to keep in failure messages
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Thin wrapper over a shared `reqwest::Client`
///
/// Cloning is cheap (the inner client is reference-counted), so one transport
/// can back closures for many concurrent `execute` calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Wrap an existing client (bring your own timeouts and TLS settings)
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `path` against the endpoint's base URL
    pub async fn get(
        &self,
        endpoint: &EndpointConfig,
        path: &str,
    ) -> Result<reqwest::Response, UpstreamFailure> {
        let request = self.client.get(request_url(endpoint, path));
        self.send(endpoint, request).await
    }

    /// POST a JSON body to `path` against the endpoint's base URL
    pub async fn post_json(
        &self,
        endpoint: &EndpointConfig,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, UpstreamFailure> {
        let request = self.client.post(request_url(endpoint, path)).json(body);
        self.send(endpoint, request).await
    }

    async fn send(
        &self,
        endpoint: &EndpointConfig,
        mut request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, UpstreamFailure> {
        if let Some(credential) = endpoint.credential() {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await.map_err(UpstreamFailure::from)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Keep a snippet of the body for diagnostics; the classifier only
        // looks at the status code.
        let body = response.text().await.unwrap_or_default();
        let mut message = status
            .canonical_reason()
            .unwrap_or("upstream error")
            .to_string();
        if !body.trim().is_empty() {
            let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            message = format!("{message}: {}", snippet.trim());
        }

        tracing::debug!(
            endpoint_url = %endpoint.url(),
            status = status.as_u16(),
            "Upstream returned error status"
        );
        Err(UpstreamFailure::http(status.as_u16(), message))
    }
}

impl From<reqwest::Error> for UpstreamFailure {
    /// Map a `reqwest` error to a structured transport failure
    ///
    /// `reqwest` does not distinguish DNS failures from other connect
    /// failures, so both land in `Connect`; the classifier treats every
    /// transport kind as retryable anyway.
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Network
        };
        UpstreamFailure::transport(kind, err.to_string())
    }
}

/// Join an endpoint base URL with a request path
///
/// Tolerates a trailing slash on the base and a missing leading slash on the
/// path, so `http://host/v1` + `chat/completions` and `http://host/v1/` +
/// `/chat/completions` both produce `http://host/v1/chat/completions`.
fn request_url(endpoint: &EndpointConfig, path: &str) -> String {
    let base = endpoint.url().trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
