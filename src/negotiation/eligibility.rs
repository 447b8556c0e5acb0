//! Eligibility & Authorization Checker
//!
//! Decides who may create a swap proposal and who may act on one. Every
//! refusal carries a `Denial` whose message can be shown to the user.

use serde::{Deserialize, Serialize};

use crate::error::Denial;
use crate::integrations::{ActingUser, Listing};
use crate::negotiation::state_machine::{actor_rule, next_status, role_permits, ActorRule};
use crate::storage::{SwapAction, SwapProposal};

/// A user's side of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// Created the proposal
    Initiator,
    /// The proposal is addressed to them
    Counterparty,
}

impl ParticipantRole {
    /// Role of `user_id` in the proposal, None if they are not a party.
    pub fn resolve(proposal: &SwapProposal, user_id: &str) -> Option<Self> {
        if proposal.initiator_id == user_id {
            Some(ParticipantRole::Initiator)
        } else if proposal.target_user_id == user_id {
            Some(ParticipantRole::Counterparty)
        } else {
            None
        }
    }
}

/// Outcome of an eligibility preview, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub allowed: bool,
    /// Why the user was refused (None when allowed)
    pub reason: Option<String>,
}

impl From<Result<(), Denial>> for EligibilityDecision {
    fn from(result: Result<(), Denial>) -> Self {
        match result {
            Ok(()) => Self {
                allowed: true,
                reason: None,
            },
            Err(denial) => Self {
                allowed: false,
                reason: Some(denial.to_string()),
            },
        }
    }
}

/// Applies platform-wide and per-listing gating rules.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityChecker {
    /// Platform-wide swap feature flag
    swaps_enabled: bool,
}

impl EligibilityChecker {
    pub fn new(swaps_enabled: bool) -> Self {
        Self { swaps_enabled }
    }

    /// Checks whether `user` may propose a swap, optionally against `target_listing`.
    ///
    /// Rules are checked in order: platform flag, listing swap flag, minimum
    /// reputation, verification requirement.
    pub fn can_create_swap(
        &self,
        user: &ActingUser,
        target_listing: Option<&Listing>,
    ) -> Result<(), Denial> {
        if !self.swaps_enabled {
            return Err(Denial::SwapsDisabled);
        }

        let Some(listing) = target_listing else {
            return Ok(());
        };

        if !listing.swap_enabled {
            return Err(Denial::ListingNotSwappable);
        }
        if let Some(required) = listing.minimum_reputation {
            if user.reputation_score < required {
                return Err(Denial::InsufficientReputation {
                    required,
                    actual: user.reputation_score,
                });
            }
        }
        if listing.swap_verification_required && !user.is_verified {
            return Err(Denial::VerificationRequired);
        }
        Ok(())
    }

    /// Checks whether `user` may apply `action` to `proposal`.
    ///
    /// Non-parties are refused first, then closed proposals, then actions the
    /// current status does not allow, then the actor restriction.
    pub fn can_act(
        &self,
        user: &ActingUser,
        proposal: &SwapProposal,
        action: SwapAction,
    ) -> Result<(), Denial> {
        let role = ParticipantRole::resolve(proposal, &user.id).ok_or(Denial::NotAParty)?;

        if proposal.status.is_terminal() {
            return Err(Denial::TerminalState(proposal.status));
        }

        let rule = actor_rule(action);
        if rule == ActorRule::System {
            return Err(Denial::SystemOnly);
        }

        if next_status(proposal.status, action).is_none() {
            return Err(Denial::ActionUnavailable {
                status: proposal.status,
                action,
            });
        }

        if !role_permits(rule, role) {
            return Err(match rule {
                ActorRule::Initiator => Denial::InitiatorOnly(action),
                _ => Denial::RecipientOnly(action),
            });
        }
        Ok(())
    }
}
