//! External Collaborators Module
//!
//! Boundary contracts between the negotiation engine and the services it
//! relies on: identity, listings, notification delivery and the reputation
//! ledger. Each contract is an async trait with an in-memory implementation
//! for local development and tests and an HTTP implementation for deployment.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

mod http;
mod memory;

pub use http::{HttpListingRepository, HttpReputationLedger, WebhookNotificationSink};
pub use memory::{InMemoryListingRepository, InMemoryReputationLedger, LoggingNotificationSink};

// ============================================================================
// IDENTITY
// ============================================================================

/// The authenticated user performing a call, as supplied by the identity provider.
///
/// The engine trusts these fields as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: String,
    pub reputation_score: i64,
    pub is_verified: bool,
}

impl ActingUser {
    pub fn new(id: impl Into<String>, reputation_score: i64, is_verified: bool) -> Self {
        Self {
            id: id.into(),
            reputation_score,
            is_verified,
        }
    }
}

// ============================================================================
// LISTINGS
// ============================================================================

/// Marketplace listing as seen by the negotiation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    /// User who owns the listing
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub price: Option<f64>,
    /// Whether the owner accepts swap proposals for this listing
    #[serde(default)]
    pub swap_enabled: bool,
    /// Minimum reputation score required to propose a swap
    #[serde(default)]
    pub minimum_reputation: Option<i64>,
    /// Whether proposers must be verified
    #[serde(default)]
    pub swap_verification_required: bool,
    /// Set while an accepted swap holds the listing
    #[serde(default)]
    pub reserved: bool,
}

/// Read access to listings, plus the reservation toggle.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Look up a listing; `Ok(None)` when it does not exist.
    async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>>;

    /// Mark a listing as reserved by (or released from) an accepted swap.
    async fn set_reserved(&self, listing_id: &str, reserved: bool) -> Result<()>;
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Event emitted to a party when a proposal changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapEvent {
    #[serde(rename = "swap_proposed")]
    Proposed,
    #[serde(rename = "swap_accepted")]
    Accepted,
    #[serde(rename = "swap_rejected")]
    Rejected,
    #[serde(rename = "swap_cancelled")]
    Cancelled,
    #[serde(rename = "swap_expired")]
    Expired,
    #[serde(rename = "swap_completed")]
    Completed,
    #[serde(rename = "swap_disputed")]
    Disputed,
}

impl SwapEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapEvent::Proposed => "swap_proposed",
            SwapEvent::Accepted => "swap_accepted",
            SwapEvent::Rejected => "swap_rejected",
            SwapEvent::Cancelled => "swap_cancelled",
            SwapEvent::Expired => "swap_expired",
            SwapEvent::Completed => "swap_completed",
            SwapEvent::Disputed => "swap_disputed",
        }
    }
}

impl fmt::Display for SwapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget delivery of events to users.
///
/// Delivery is best-effort: the engine logs and discards errors.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: &str, event: SwapEvent, payload: serde_json::Value)
        -> Result<()>;
}

// ============================================================================
// REPUTATION
// ============================================================================

/// Externally maintained reputation scores.
#[async_trait]
pub trait ReputationLedger: Send + Sync {
    /// Add `amount` to a user's score.
    async fn credit(&self, user_id: &str, amount: i64, reason: &str) -> Result<()>;
}
