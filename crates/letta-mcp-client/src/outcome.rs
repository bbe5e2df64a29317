// crates/letta-mcp-client/src/outcome.rs
// ============================================================================
// Module: Backend Outcomes
// Description: Terminal result of a backend call after retries.
// Purpose: Carry failures as data so handlers never panic on remote errors.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`BackendOutcome`] is either the decoded JSON body or a
//! [`BackendFailure`] describing what went wrong. Failures keep the remote
//! status and a bounded copy of the remote body so the error normalizer can
//! classify them without re-reading the response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of body characters retained in a failure.
pub const MAX_FAILURE_BODY_CHARS: usize = 2048;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of one backend call.
pub type BackendOutcome = Result<Value, BackendFailure>;

/// Classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend answered with a non-success status.
    Status(u16),
    /// No response arrived within the deadline.
    Timeout,
    /// The connection could not be made or broke mid-flight.
    Transport,
    /// The backend answered 2xx but the body was not what was expected.
    MalformedBody,
}

/// Descriptor of a failed backend call.
///
/// # Invariants
/// - `body` holds at most [`MAX_FAILURE_BODY_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}: {message}")]
pub struct BackendFailure {
    /// Caller-supplied action label, such as `"listing agents"`.
    pub description: String,
    /// Failure class.
    pub kind: FailureKind,
    /// Short human-readable detail.
    pub message: String,
    /// Remote body text, when one was received.
    pub body: Option<String>,
}

impl BackendFailure {
    /// Builds a failure for a non-success status.
    #[must_use]
    pub fn status(description: &str, status: u16, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let trimmed = text.trim();
        Self {
            description: description.to_string(),
            kind: FailureKind::Status(status),
            message: format!("backend returned status {status}"),
            body: (!trimmed.is_empty()).then(|| truncate_chars(trimmed, MAX_FAILURE_BODY_CHARS)),
        }
    }

    /// Builds a failure of the given class without a body.
    #[must_use]
    pub fn new(description: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            description: description.to_string(),
            kind,
            message: message.into(),
            body: None,
        }
    }

    /// Returns the remote status, when the backend answered.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self.kind {
            FailureKind::Status(code) => Some(code),
            FailureKind::Timeout | FailureKind::Transport | FailureKind::MalformedBody => None,
        }
    }
}

/// Truncates text to at most `limit` characters on a char boundary.
fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[.. index].to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::BackendFailure;
    use super::FailureKind;
    use super::MAX_FAILURE_BODY_CHARS;

    #[test]
    fn status_failure_keeps_trimmed_body() {
        let failure = BackendFailure::status("getting agent", 404, b"  {\"detail\":\"nope\"}\n");
        assert_eq!(failure.kind, FailureKind::Status(404));
        assert_eq!(failure.body.as_deref(), Some("{\"detail\":\"nope\"}"));
        assert_eq!(failure.status_code(), Some(404));
        assert_eq!(failure.to_string(), "getting agent: backend returned status 404");
    }

    #[test]
    fn empty_status_body_is_dropped() {
        let failure = BackendFailure::status("listing jobs", 500, b"   ");
        assert!(failure.body.is_none());
        assert_eq!(failure.status_code(), Some(500));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "é".repeat(MAX_FAILURE_BODY_CHARS + 10);
        let failure = BackendFailure::status("x", 500, body.as_bytes());
        assert_eq!(failure.body.map(|text| text.chars().count()), Some(MAX_FAILURE_BODY_CHARS));
    }
}
