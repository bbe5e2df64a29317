// crates/letta-mcp-client/src/client.rs
// ============================================================================
// Module: Backend Client
// Description: Bounded, retrying client over a backend transport.
// Purpose: Turn raw transport results into decoded outcomes or failures.
// Dependencies: tokio, tracing, serde_json
// ============================================================================

//! ## Overview
//! [`BackendClient`] is shared by every handler. Each attempt acquires a
//! permit from a semaphore and sends through the transport, and both steps
//! count against the per-request deadline. Retry-safe calls are retried with
//! exponential backoff on timeouts, connection failures, and 429/502/503/504.
//! Whatever happens last is returned as a [`BackendOutcome`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use letta_mcp_config::BackendConfig;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::outcome::BackendFailure;
use crate::outcome::BackendOutcome;
use crate::outcome::FailureKind;
use crate::request::BackendRequest;
use crate::request::HttpMethod;
use crate::request::ResponseFormat;
use crate::transport::BackendResponse;
use crate::transport::BackendTransport;
use crate::transport::ReqwestTransport;
use crate::transport::TransportError;
use crate::transport::TransportSettings;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Statuses retried on retry-safe calls.
const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];
/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Concurrency, deadline, and retry policy of a [`BackendClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientPolicy {
    /// Bound on concurrent outbound requests.
    pub max_concurrent_requests: usize,
    /// Per-attempt deadline, including the wait for a permit.
    pub request_timeout: Duration,
    /// Retries after the first attempt for retry-safe calls.
    pub max_retries: u32,
    /// Base backoff, doubled per retry.
    pub retry_backoff: Duration,
}

impl From<&BackendConfig> for ClientPolicy {
    fn from(config: &BackendConfig) -> Self {
        Self {
            max_concurrent_requests: config.max_concurrent_requests,
            request_timeout: config.request_timeout(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }
}

impl Default for ClientPolicy {
    fn default() -> Self {
        Self::from(&BackendConfig::default())
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Shared backend client.
///
/// # Invariants
/// - At most `max_concurrent_requests` attempts are in flight at once.
/// - Non-retry-safe calls are attempted exactly once.
#[derive(Clone)]
pub struct BackendClient {
    /// Underlying transport.
    transport: Arc<dyn BackendTransport>,
    /// Outbound concurrency bound.
    permits: Arc<Semaphore>,
    /// Deadline and retry policy.
    policy: ClientPolicy,
}

impl BackendClient {
    /// Builds a client over an arbitrary transport.
    #[must_use]
    pub fn new(transport: Arc<dyn BackendTransport>, policy: ClientPolicy) -> Self {
        let permits = Arc::new(Semaphore::new(policy.max_concurrent_requests.max(1)));
        Self {
            transport,
            permits,
            policy,
        }
    }

    /// Builds a pooled reqwest-backed client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the HTTP client cannot be constructed.
    pub fn from_config(config: &BackendConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&TransportSettings::from(config))?;
        Ok(Self::new(Arc::new(transport), ClientPolicy::from(config)))
    }

    /// Performs one logical call, retrying when permitted.
    ///
    /// `description` is the action label carried into any failure.
    pub async fn call(&self, description: &str, request: BackendRequest) -> BackendOutcome {
        let mut attempt: u32 = 0;
        loop {
            let result = self.attempt(&request).await;
            let transient = match &result {
                Ok(response) => RETRYABLE_STATUSES.contains(&response.status),
                Err(err) => err.is_transient(),
            };
            if !(transient && request.is_retry_safe() && attempt < self.policy.max_retries) {
                return finish(description, &request, result);
            }
            let delay = backoff(self.policy.retry_backoff, attempt);
            tracing::debug!(
                method = request.method.as_str(),
                path = %request.path(),
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retrying backend call"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Runs a single attempt under the deadline.
    async fn attempt(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        let permits = Arc::clone(&self.permits);
        let transport = Arc::clone(&self.transport);
        let work = async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| TransportError::Other("client is shut down".to_string()))?;
            transport.send(request).await
        };
        match tokio::time::timeout(self.policy.request_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Converts the final attempt into an outcome.
fn finish(
    description: &str,
    request: &BackendRequest,
    result: Result<BackendResponse, TransportError>,
) -> BackendOutcome {
    let response = match result {
        Ok(response) => response,
        Err(TransportError::Timeout) => {
            return Err(BackendFailure::new(
                description,
                FailureKind::Timeout,
                format!("no response from {} {} within deadline", request.method, request.path()),
            ));
        }
        Err(err) => {
            return Err(BackendFailure::new(description, FailureKind::Transport, err.to_string()));
        }
    };
    if !response.is_success() {
        return Err(BackendFailure::status(description, response.status, &response.body));
    }
    decode_body(description, request, &response)
}

/// Decodes a successful response body according to the expected format.
fn decode_body(
    description: &str,
    request: &BackendRequest,
    response: &BackendResponse,
) -> BackendOutcome {
    let text = std::str::from_utf8(&response.body).map_err(|_| {
        BackendFailure::new(description, FailureKind::MalformedBody, "response body is not utf-8")
    })?;
    if text.trim().is_empty() {
        if request.method == HttpMethod::Delete || response.status == 204 {
            return Ok(Value::Null);
        }
        return Err(BackendFailure::new(
            description,
            FailureKind::MalformedBody,
            "empty response body where JSON was expected",
        ));
    }
    match request.format {
        ResponseFormat::Json => serde_json::from_str(text).map_err(|err| {
            BackendFailure::new(
                description,
                FailureKind::MalformedBody,
                format!("response body is not valid JSON: {err}"),
            )
        }),
        ResponseFormat::EventStream => parse_event_stream(text).map_err(|message| {
            BackendFailure::new(description, FailureKind::MalformedBody, message)
        }),
    }
}

/// Parses a server-sent event body into the array of its JSON `data:` payloads.
///
/// `[DONE]` sentinels and blank data lines are skipped. A body without any
/// `data:` line is parsed as a plain JSON document, which covers backends
/// that answer a streaming endpoint without streaming.
///
/// # Errors
///
/// Returns a message when a payload is not valid JSON.
pub fn parse_event_stream(text: &str) -> Result<Value, String> {
    let mut events = Vec::new();
    let mut saw_data = false;
    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        saw_data = true;
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            continue;
        }
        let event: Value = serde_json::from_str(payload)
            .map_err(|err| format!("event stream payload is not valid JSON: {err}"))?;
        events.push(event);
    }
    if saw_data {
        return Ok(Value::Array(events));
    }
    serde_json::from_str(text).map_err(|err| format!("event stream body is not valid JSON: {err}"))
}

/// Returns the backoff before retry number `attempt` (zero-based).
fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::backoff;
    use super::parse_event_stream;

    #[test]
    fn backoff_doubles_and_saturates() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 0), Duration::from_millis(100));
        assert_eq!(backoff(base, 3), Duration::from_millis(800));
        assert_eq!(backoff(base, 40), Duration::from_secs(30));
    }

    #[test]
    fn event_stream_collects_data_lines() {
        let body = "event: message\ndata: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n";
        assert_eq!(parse_event_stream(body), Ok(json!([{ "a": 1 }, { "b": 2 }])));
    }

    #[test]
    fn event_stream_without_data_lines_parses_as_json() {
        assert_eq!(parse_event_stream("{\"messages\":[]}"), Ok(json!({ "messages": [] })));
        assert!(parse_event_stream("data: {broken").is_err());
    }
}
