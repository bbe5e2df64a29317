// crates/letta-mcp-client/src/lib.rs
// ============================================================================
// Module: Letta MCP Client
// Description: Pooled, retrying client for the Letta REST API.
// Purpose: Give tool handlers one shared, bounded path to the backend.
// Dependencies: async-trait, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! Handlers describe calls as [`BackendRequest`] values and receive a
//! [`BackendOutcome`]. The [`BackendTransport`] seam lets tests substitute an
//! in-memory backend for [`ReqwestTransport`].

pub mod client;
pub mod normalize;
pub mod outcome;
pub mod request;
pub mod transport;

pub use client::BackendClient;
pub use client::ClientPolicy;
pub use client::parse_event_stream;
pub use normalize::EntityKind;
pub use normalize::ShapeError;
pub use normalize::normalize_list;
pub use outcome::BackendFailure;
pub use outcome::BackendOutcome;
pub use outcome::FailureKind;
pub use request::BackendRequest;
pub use request::HttpMethod;
pub use request::RequestBody;
pub use request::ResponseFormat;
pub use request::RetryClass;
pub use transport::BackendResponse;
pub use transport::BackendTransport;
pub use transport::ReqwestTransport;
pub use transport::TransportError;
pub use transport::TransportSettings;
