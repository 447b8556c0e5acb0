//! Swap Proposal Storage Module
//!
//! This module provides in-memory storage for swap proposals used by the
//! negotiation engine. Proposals are inserted whole, mutated only through a
//! guarded status update keyed on the expected current status, and never
//! removed. Every creation and status change appends a transition record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

use crate::error::SwapError;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Status of a swap proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    /// Waiting for the target user to respond
    Pending,
    /// Target user agreed; the exchange is under way
    Accepted,
    /// Exchange confirmed by one of the parties
    Completed,
    /// Target user declined
    Rejected,
    /// Initiator withdrew the offer before a response
    Cancelled,
    /// Nobody responded within the expiry window
    Expired,
    /// A party raised a dispute after acceptance; resolved out of band
    Disputed,
}

impl SwapStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SwapStatus::Completed
                | SwapStatus::Rejected
                | SwapStatus::Cancelled
                | SwapStatus::Expired
                | SwapStatus::Disputed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Completed => "completed",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Cancelled => "cancelled",
            SwapStatus::Expired => "expired",
            SwapStatus::Disputed => "disputed",
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action that moves a proposal between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapAction {
    Accept,
    Reject,
    Cancel,
    Complete,
    Dispute,
    /// Time-based; only the engine itself performs it
    Expire,
}

impl SwapAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapAction::Accept => "accept",
            SwapAction::Reject => "reject",
            SwapAction::Cancel => "cancel",
            SwapAction::Complete => "complete",
            SwapAction::Dispute => "dispute",
            SwapAction::Expire => "expire",
        }
    }
}

impl fmt::Display for SwapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negotiation template fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapMode {
    DirectSwap,
    ValueDifference,
    ContractBased,
    TimeBased,
    EquityBased,
    LicenseBased,
    UpgradePath,
}

impl SwapMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapMode::DirectSwap => "direct_swap",
            SwapMode::ValueDifference => "value_difference",
            SwapMode::ContractBased => "contract_based",
            SwapMode::TimeBased => "time_based",
            SwapMode::EquityBased => "equity_based",
            SwapMode::LicenseBased => "license_based",
            SwapMode::UpgradePath => "upgrade_path",
        }
    }

    /// Whether a cash balancing amount is part of this template.
    pub fn allows_price_difference(self) -> bool {
        self == SwapMode::ValueDifference
    }

    /// Whether a contract duration is part of this template.
    pub fn allows_contract_duration(self) -> bool {
        matches!(self, SwapMode::TimeBased | SwapMode::ContractBased)
    }
}

impl fmt::Display for SwapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How ownership of the exchanged assets moves between the parties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipTransferType {
    #[default]
    Full,
    Partial,
    License,
    Lease,
}

/// Which side of a proposal a listing query is interested in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListRole {
    /// Proposals the user created
    Initiated,
    /// Proposals addressed to the user
    Received,
    /// Both
    #[default]
    All,
}

/// Swap proposal record.
///
/// Each side of the exchange is described by a listing reference, a free-text
/// description, or both (the listing being authoritative for title and image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapProposal {
    /// Unique identifier (UUID)
    pub id: String,
    /// User who created the proposal
    pub initiator_id: String,
    /// User the proposal is addressed to
    pub target_user_id: String,
    /// Listing being requested
    pub target_listing_id: Option<String>,
    /// Free-text description of what is requested
    pub requesting_description: Option<String>,
    /// Listing the initiator offers
    pub offering_listing_id: Option<String>,
    /// Free-text description of what the initiator offers
    pub offering_description: Option<String>,
    pub swap_mode: SwapMode,
    /// Initiator's estimate of what they offer
    pub offering_value: Option<f64>,
    /// Initiator's estimate of what they request
    pub requesting_value: Option<f64>,
    /// Positive: the initiator pays the difference. Negative: the initiator receives it.
    pub price_difference: Option<f64>,
    /// Length of the arrangement for time- and contract-based swaps
    pub contract_duration_days: Option<u32>,
    pub ownership_transfer_type: OwnershipTransferType,
    pub usage_rights: Option<String>,
    pub upgrade_expectations: Option<String>,
    pub status: SwapStatus,
    /// Set only on rejection
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Pending proposals become expired at this instant (None = never)
    pub expires_at: Option<DateTime<Utc>>,
}

impl SwapProposal {
    /// True when the user is the initiator or the target.
    pub fn is_party(&self, user_id: &str) -> bool {
        self.initiator_id == user_id || self.target_user_id == user_id
    }

    /// True when the proposal is still pending but its expiry window has passed.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.status == SwapStatus::Pending
            && self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }

    /// Listing ids referenced by either side.
    pub fn listing_ids(&self) -> Vec<&str> {
        self.offering_listing_id
            .iter()
            .chain(self.target_listing_id.iter())
            .map(String::as_str)
            .collect()
    }
}

/// One entry of a proposal's append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Previous status (None for creation)
    pub from: Option<SwapStatus>,
    pub to: SwapStatus,
    /// Action taken (None for creation)
    pub action: Option<SwapAction>,
    /// User who acted (None for system-driven expiry)
    pub actor_id: Option<String>,
    pub at: DateTime<Utc>,
}

// ============================================================================
// STORAGE IMPLEMENTATION
// ============================================================================

#[derive(Default)]
struct StoreState {
    /// Map of swap id -> proposal
    proposals: HashMap<String, SwapProposal>,
    /// Map of swap id -> transition history
    history: HashMap<String, Vec<TransitionRecord>>,
}

/// In-memory storage for swap proposals.
///
/// Proposals and their histories live behind a single RwLock so a status
/// update and its history entry are always written together.
pub struct SwapProposalStore {
    state: RwLock<StoreState>,
}

impl SwapProposalStore {
    /// Create a new, empty swap proposal store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Insert a fully constructed proposal.
    ///
    /// The proposal must be pending. Fails without storing anything if the
    /// id is already taken.
    ///
    /// # Arguments
    ///
    /// * `proposal` - The validated proposal to persist
    ///
    /// # Returns
    ///
    /// * `Ok(SwapProposal)` - The stored proposal
    /// * `Err(SwapError::Validation)` - Duplicate id or non-pending status
    pub async fn insert(&self, proposal: SwapProposal) -> Result<SwapProposal, SwapError> {
        if proposal.status != SwapStatus::Pending {
            return Err(SwapError::invalid(
                "status",
                "new proposals must start as pending",
            ));
        }

        let mut state = self.state.write().await;
        if state.proposals.contains_key(&proposal.id) {
            return Err(SwapError::invalid("id", "a proposal with this id already exists"));
        }

        state.history.insert(
            proposal.id.clone(),
            vec![TransitionRecord {
                from: None,
                to: SwapStatus::Pending,
                action: None,
                actor_id: Some(proposal.initiator_id.clone()),
                at: proposal.created_at,
            }],
        );
        state.proposals.insert(proposal.id.clone(), proposal.clone());
        Ok(proposal)
    }

    /// Get a proposal by ID.
    pub async fn get(&self, id: &str) -> Option<SwapProposal> {
        let state = self.state.read().await;
        state.proposals.get(id).cloned()
    }

    /// Conditionally move a proposal to a new status.
    ///
    /// The status check and the write happen under one write lock: the update
    /// only applies if the stored status still equals `expected`. Two racing
    /// callers expecting the same status therefore see exactly one success.
    ///
    /// # Arguments
    ///
    /// * `id` - Proposal to update
    /// * `expected` - Status the caller observed and validated against
    /// * `action` - Action being applied (recorded in history)
    /// * `to` - New status
    /// * `actor_id` - Acting user, or None for system-driven changes
    /// * `at` - Time of the change
    /// * `apply` - Extra field updates (timestamps, rejection reason)
    ///
    /// # Returns
    ///
    /// * `Ok(SwapProposal)` - The updated proposal
    /// * `Err(SwapError::NotFound)` - Unknown id
    /// * `Err(SwapError::InvalidTransition)` - Status changed since it was read
    #[allow(clippy::too_many_arguments)]
    pub async fn transition<F>(
        &self,
        id: &str,
        expected: SwapStatus,
        action: SwapAction,
        to: SwapStatus,
        actor_id: Option<&str>,
        at: DateTime<Utc>,
        apply: F,
    ) -> Result<SwapProposal, SwapError>
    where
        F: FnOnce(&mut SwapProposal),
    {
        let mut state = self.state.write().await;
        let proposal = state.proposals.get_mut(id).ok_or(SwapError::NotFound)?;

        if proposal.status != expected {
            return Err(SwapError::InvalidTransition {
                from: proposal.status,
                action,
            });
        }

        apply(proposal);
        proposal.status = to;
        let updated = proposal.clone();

        state.history.entry(id.to_string()).or_default().push(TransitionRecord {
            from: Some(expected),
            to,
            action: Some(action),
            actor_id: actor_id.map(str::to_string),
            at,
        });

        Ok(updated)
    }

    /// List proposals involving a user, newest first.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user whose proposals are listed
    /// * `role` - Initiated, received, or both
    /// * `limit` - Maximum number of proposals returned
    pub async fn list_for(&self, user_id: &str, role: ListRole, limit: usize) -> Vec<SwapProposal> {
        let state = self.state.read().await;

        let mut proposals: Vec<SwapProposal> = state
            .proposals
            .values()
            .filter(|proposal| match role {
                ListRole::Initiated => proposal.initiator_id == user_id,
                ListRole::Received => proposal.target_user_id == user_id,
                ListRole::All => proposal.is_party(user_id),
            })
            .cloned()
            .collect();

        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        proposals.truncate(limit);
        proposals
    }

    /// Get the transition history of a proposal, oldest first.
    pub async fn history(&self, id: &str) -> Option<Vec<TransitionRecord>> {
        let state = self.state.read().await;
        state.history.get(id).cloned()
    }

    /// IDs of pending proposals whose expiry time has passed.
    pub async fn stale_pending_ids(&self, now: DateTime<Utc>) -> Vec<String> {
        let state = self.state.read().await;
        state
            .proposals
            .values()
            .filter(|proposal| proposal.is_stale(now))
            .map(|proposal| proposal.id.clone())
            .collect()
    }

    /// Number of stored proposals.
    pub async fn len(&self) -> usize {
        self.state.read().await.proposals.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SwapProposalStore {
    fn default() -> Self {
        Self::new()
    }
}
