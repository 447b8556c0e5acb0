//! Swap Negotiation Engine
//!
//! Orchestrates the record store, eligibility checker and state machine, and
//! executes side effects against the external collaborators. Every call takes
//! the acting user explicitly; the engine keeps no session state.
//!
//! Side effects run after the status write has been committed. Their failures
//! are logged and never undo the transition.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SwapSettings;
use crate::error::SwapError;
use crate::integrations::{
    ActingUser, Listing, ListingRepository, NotificationSink, ReputationLedger, SwapEvent,
};
use crate::negotiation::draft::{build_proposal, DraftListings, SwapDraft};
use crate::negotiation::eligibility::{EligibilityChecker, EligibilityDecision};
use crate::negotiation::state_machine::{
    apply_transition_fields, next_status, side_effects, SideEffect,
};
use crate::storage::{
    ListRole, SwapAction, SwapProposal, SwapProposalStore, SwapStatus, TransitionRecord,
};

/// The swap negotiation engine.
pub struct SwapEngine {
    settings: SwapSettings,
    checker: EligibilityChecker,
    store: Arc<SwapProposalStore>,
    listings: Arc<dyn ListingRepository>,
    notifier: Arc<dyn NotificationSink>,
    ledger: Arc<dyn ReputationLedger>,
}

impl SwapEngine {
    /// Creates an engine over the given store and collaborators.
    pub fn new(
        settings: SwapSettings,
        store: Arc<SwapProposalStore>,
        listings: Arc<dyn ListingRepository>,
        notifier: Arc<dyn NotificationSink>,
        ledger: Arc<dyn ReputationLedger>,
    ) -> Self {
        Self {
            checker: EligibilityChecker::new(settings.enabled),
            settings,
            store,
            listings,
            notifier,
            ledger,
        }
    }

    pub fn settings(&self) -> &SwapSettings {
        &self.settings
    }

    // ========================================================================
    // CREATION
    // ========================================================================

    /// Creates a pending proposal from `actor`'s draft.
    ///
    /// Eligibility is checked against the target listing before the draft is
    /// validated; nothing is stored unless both pass.
    ///
    /// # Returns
    ///
    /// * `Ok(SwapProposal)` - The stored pending proposal
    /// * `Err(SwapError::Forbidden)` - Eligibility gate failed
    /// * `Err(SwapError::Validation)` - Draft broke one or more invariants
    /// * `Err(SwapError::ListingLookup)` - Listing service unavailable
    pub async fn create_swap(
        &self,
        actor: &ActingUser,
        draft: SwapDraft,
    ) -> Result<SwapProposal, SwapError> {
        let listings = DraftListings {
            target: self.lookup_listing(draft.target_listing_id.as_deref()).await?,
            offering: self.lookup_listing(draft.offering_listing_id.as_deref()).await?,
        };

        if let Err(denial) = self.checker.can_create_swap(actor, listings.target.as_ref()) {
            info!("Swap creation by {} denied: {}", actor.id, denial);
            return Err(SwapError::Forbidden(denial));
        }

        let now = Utc::now();
        let proposal = build_proposal(&actor.id, draft, &listings, now, self.expiry_deadline(now))?;
        let proposal = self.store.insert(proposal).await?;

        info!(
            "Created swap {} ({}) from {} to {}",
            proposal.id, proposal.swap_mode, proposal.initiator_id, proposal.target_user_id
        );
        self.notify(&proposal.target_user_id, SwapEvent::Proposed, &proposal)
            .await;

        Ok(proposal)
    }

    /// Previews whether `actor` may propose a swap, optionally against a listing.
    pub async fn check_eligibility(
        &self,
        actor: &ActingUser,
        listing_id: Option<&str>,
    ) -> Result<EligibilityDecision, SwapError> {
        let listing = match listing_id {
            Some(id) => Some(
                self.lookup_listing(Some(id))
                    .await?
                    .ok_or_else(|| SwapError::invalid("listing_id", "listing not found"))?,
            ),
            None => None,
        };
        Ok(self.checker.can_create_swap(actor, listing.as_ref()).into())
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Target user accepts a pending proposal.
    pub async fn accept_swap(
        &self,
        swap_id: &str,
        actor: &ActingUser,
    ) -> Result<SwapProposal, SwapError> {
        self.act(swap_id, actor, SwapAction::Accept, None).await
    }

    /// Target user rejects a pending proposal, optionally giving a reason.
    pub async fn reject_swap(
        &self,
        swap_id: &str,
        actor: &ActingUser,
        reason: Option<String>,
    ) -> Result<SwapProposal, SwapError> {
        self.act(swap_id, actor, SwapAction::Reject, reason).await
    }

    /// Initiator withdraws a pending proposal.
    pub async fn cancel_swap(
        &self,
        swap_id: &str,
        actor: &ActingUser,
    ) -> Result<SwapProposal, SwapError> {
        self.act(swap_id, actor, SwapAction::Cancel, None).await
    }

    /// Either party confirms an accepted swap took place.
    pub async fn complete_swap(
        &self,
        swap_id: &str,
        actor: &ActingUser,
    ) -> Result<SwapProposal, SwapError> {
        self.act(swap_id, actor, SwapAction::Complete, None).await
    }

    /// Either party disputes an accepted swap.
    pub async fn dispute_swap(
        &self,
        swap_id: &str,
        actor: &ActingUser,
    ) -> Result<SwapProposal, SwapError> {
        self.act(swap_id, actor, SwapAction::Dispute, None).await
    }

    /// Applies a user action to a proposal.
    ///
    /// The status observed here is passed to the store as the expected
    /// status, so a concurrent transition makes this call fail with
    /// `InvalidTransition` instead of overwriting it.
    async fn act(
        &self,
        swap_id: &str,
        actor: &ActingUser,
        action: SwapAction,
        reason: Option<String>,
    ) -> Result<SwapProposal, SwapError> {
        let proposal = self.load_for(swap_id, &actor.id).await?;

        if let Err(denial) = self.checker.can_act(actor, &proposal, action) {
            debug!("Swap {}: {} by {} denied: {:?}", swap_id, action, actor.id, denial);
            return Err(SwapError::from_denial(denial, proposal.status, action));
        }

        let to = next_status(proposal.status, action).ok_or(SwapError::InvalidTransition {
            from: proposal.status,
            action,
        })?;

        let now = Utc::now();
        let updated = self
            .store
            .transition(swap_id, proposal.status, action, to, Some(actor.id.as_str()), now, |p| {
                apply_transition_fields(p, action, now, reason)
            })
            .await
            .map_err(|e| {
                if matches!(e, SwapError::InvalidTransition { .. }) {
                    warn!("Swap {}: concurrent update lost {} by {}", swap_id, action, actor.id);
                }
                e
            })?;

        info!(
            "Swap {}: {} -> {} ({} by {})",
            swap_id, proposal.status, updated.status, action, actor.id
        );
        self.run_side_effects(&updated, action, Some(actor.id.as_str())).await;

        Ok(updated)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Gets a proposal visible to `actor`.
    ///
    /// Non-parties get `NotFound`. A pending proposal past its expiry is
    /// expired before it is returned.
    pub async fn get_swap(
        &self,
        swap_id: &str,
        actor: &ActingUser,
    ) -> Result<SwapProposal, SwapError> {
        self.load_for(swap_id, &actor.id).await
    }

    /// Lists a user's proposals, newest first.
    ///
    /// `limit` defaults to `default_list_limit` and is capped at `max_list_limit`.
    pub async fn list_swaps(
        &self,
        user_id: &str,
        role: ListRole,
        limit: Option<usize>,
    ) -> Vec<SwapProposal> {
        let limit = limit
            .unwrap_or(self.settings.default_list_limit)
            .min(self.settings.max_list_limit)
            .max(1);

        let now = Utc::now();
        let mut proposals = Vec::new();
        for proposal in self.store.list_for(user_id, role, limit).await {
            proposals.push(self.refresh_expiry(proposal, now).await);
        }
        proposals
    }

    /// Transition history of a proposal visible to `actor`, oldest first.
    pub async fn swap_history(
        &self,
        swap_id: &str,
        actor: &ActingUser,
    ) -> Result<Vec<TransitionRecord>, SwapError> {
        self.load_for(swap_id, &actor.id).await?;
        self.store.history(swap_id).await.ok_or(SwapError::NotFound)
    }

    // ========================================================================
    // EXPIRY
    // ========================================================================

    /// Expires every pending proposal past its deadline.
    ///
    /// # Returns
    ///
    /// Number of proposals this sweep expired
    pub async fn expire_stale(&self) -> usize {
        let now = Utc::now();
        let mut expired = 0;
        for swap_id in self.store.stale_pending_ids(now).await {
            if self.expire(&swap_id, now).await.is_ok() {
                expired += 1;
            }
        }
        if expired > 0 {
            info!("Expiry sweep expired {} swap proposal(s)", expired);
        }
        expired
    }

    async fn expire(&self, swap_id: &str, now: DateTime<Utc>) -> Result<SwapProposal, SwapError> {
        let updated = self
            .store
            .transition(
                swap_id,
                SwapStatus::Pending,
                SwapAction::Expire,
                SwapStatus::Expired,
                None,
                now,
                |_| {},
            )
            .await?;
        info!("Swap {}: pending -> expired", swap_id);
        self.run_side_effects(&updated, SwapAction::Expire, None).await;
        Ok(updated)
    }

    /// Expires the proposal first if it is pending past its deadline.
    async fn refresh_expiry(&self, proposal: SwapProposal, now: DateTime<Utc>) -> SwapProposal {
        if !proposal.is_stale(now) {
            return proposal;
        }
        match self.expire(&proposal.id, now).await {
            Ok(updated) => updated,
            // Someone else moved it first; return what is stored now
            Err(_) => self.store.get(&proposal.id).await.unwrap_or(proposal),
        }
    }

    fn expiry_deadline(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.settings.expiry_window_secs {
            0 => None,
            secs => i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|window| created_at.checked_add_signed(window)),
        }
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Loads a proposal for a party, applying lazy expiry.
    async fn load_for(&self, swap_id: &str, user_id: &str) -> Result<SwapProposal, SwapError> {
        let proposal = self.store.get(swap_id).await.ok_or(SwapError::NotFound)?;
        // Non-parties must not learn that the proposal exists
        if !proposal.is_party(user_id) {
            return Err(SwapError::NotFound);
        }
        Ok(self.refresh_expiry(proposal, Utc::now()).await)
    }

    async fn lookup_listing(&self, listing_id: Option<&str>) -> Result<Option<Listing>, SwapError> {
        let Some(listing_id) = listing_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        self.listings.get_listing(listing_id).await.map_err(|e| {
            warn!("Listing lookup for {} failed: {:#}", listing_id, e);
            SwapError::ListingLookup(e.to_string())
        })
    }

    async fn run_side_effects(
        &self,
        proposal: &SwapProposal,
        action: SwapAction,
        actor_id: Option<&str>,
    ) {
        let mut credits = Vec::new();

        for effect in side_effects(proposal, action, actor_id) {
            match effect {
                SideEffect::Notify { user_id, event } => {
                    self.notify(&user_id, event, proposal).await;
                }
                SideEffect::ReserveListings => {
                    if self.settings.reserve_listings_on_accept {
                        self.set_listings_reserved(proposal, true).await;
                    }
                }
                SideEffect::ReleaseListings => {
                    if self.settings.reserve_listings_on_accept {
                        self.set_listings_reserved(proposal, false).await;
                    }
                }
                SideEffect::CreditReputation { user_id } => credits.push(user_id),
                SideEffect::FlagForReview => {
                    warn!(
                        "Swap {} disputed by {}; flagged for manual review",
                        proposal.id,
                        actor_id.unwrap_or("system")
                    );
                }
            }
        }

        if !credits.is_empty() {
            self.credit_reputation(proposal, &credits).await;
        }
    }

    async fn notify(&self, user_id: &str, event: SwapEvent, proposal: &SwapProposal) {
        let payload = serde_json::json!({
            "swap_id": proposal.id,
            "status": proposal.status,
            "swap_mode": proposal.swap_mode,
            "initiator_id": proposal.initiator_id,
            "target_user_id": proposal.target_user_id,
            "rejection_reason": proposal.rejection_reason,
        });
        if let Err(e) = self.notifier.notify(user_id, event, payload).await {
            warn!("Swap {}: failed to notify {} of {}: {:#}", proposal.id, user_id, event, e);
        }
    }

    async fn credit_reputation(&self, proposal: &SwapProposal, user_ids: &[String]) {
        let amount = self.settings.completion_reputation_bonus;
        if amount == 0 {
            return;
        }
        let reason = format!("completed swap {}", proposal.id);

        let results = join_all(
            user_ids
                .iter()
                .map(|user_id| self.ledger.credit(user_id, amount, &reason)),
        )
        .await;

        for (user_id, result) in user_ids.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    "Swap {}: failed to credit {} reputation to {}: {:#}",
                    proposal.id, amount, user_id, e
                );
            }
        }
    }

    async fn set_listings_reserved(&self, proposal: &SwapProposal, reserved: bool) {
        for listing_id in proposal.listing_ids() {
            if let Err(e) = self.listings.set_reserved(listing_id, reserved).await {
                warn!(
                    "Swap {}: failed to set reserved={} on listing {}: {:#}",
                    proposal.id, reserved, listing_id, e
                );
            }
        }
    }
}
