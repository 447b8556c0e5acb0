//! REST API Server Module
//!
//! This module provides a REST API server for the swap negotiation service,
//! exposing the command surface of the engine: creating, acting on, reading
//! and listing swap proposals, plus eligibility and valuation helpers.
//!
//! ## Identity
//!
//! The service sits behind an authenticating gateway that forwards the
//! acting user in the `x-user-id`, `x-user-reputation` and `x-user-verified`
//! headers. These values are trusted as given.

// Generic shared code (response envelope, rejections, CORS, server)
mod generic;

// Swap negotiation endpoints
mod swaps;

// Re-export ApiServer for convenience
pub use generic::ApiServer;
// Re-export ApiResponse for testing
#[allow(unused_imports)]
pub use generic::ApiResponse;
// Re-export request/response types for clients and tests
#[allow(unused_imports)]
pub use swaps::{RejectRequest, SuggestionResponse};
