//! Negotiation State Machine
//!
//! Transition table, actor rules and side effects of the swap lifecycle:
//!
//! ```text
//! pending --accept--> accepted --complete--> completed
//!    |                    |
//!    +--reject--> rejected +--dispute--> disputed
//!    +--cancel--> cancelled
//!    +--expire--> expired
//! ```
//!
//! Every status other than `pending` and `accepted` is terminal.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::integrations::SwapEvent;
use crate::negotiation::eligibility::ParticipantRole;
use crate::storage::{SwapAction, SwapProposal, SwapStatus};

/// Who may perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRule {
    /// Only the user the proposal is addressed to
    TargetUser,
    /// Only the user who created the proposal
    Initiator,
    EitherParty,
    /// Only the engine (time-based)
    System,
}

/// Instruction emitted by a successful transition, executed after the status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Notify { user_id: String, event: SwapEvent },
    ReserveListings,
    ReleaseListings,
    CreditReputation { user_id: String },
    FlagForReview,
}

/// Status reached by applying `action` in `from`, or None if the action is not valid there.
pub fn next_status(from: SwapStatus, action: SwapAction) -> Option<SwapStatus> {
    match (from, action) {
        (SwapStatus::Pending, SwapAction::Accept) => Some(SwapStatus::Accepted),
        (SwapStatus::Pending, SwapAction::Reject) => Some(SwapStatus::Rejected),
        (SwapStatus::Pending, SwapAction::Cancel) => Some(SwapStatus::Cancelled),
        (SwapStatus::Pending, SwapAction::Expire) => Some(SwapStatus::Expired),
        (SwapStatus::Accepted, SwapAction::Complete) => Some(SwapStatus::Completed),
        (SwapStatus::Accepted, SwapAction::Dispute) => Some(SwapStatus::Disputed),
        _ => None,
    }
}

pub fn actor_rule(action: SwapAction) -> ActorRule {
    match action {
        SwapAction::Accept | SwapAction::Reject => ActorRule::TargetUser,
        SwapAction::Cancel => ActorRule::Initiator,
        SwapAction::Complete | SwapAction::Dispute => ActorRule::EitherParty,
        SwapAction::Expire => ActorRule::System,
    }
}

/// Whether a party in `role` satisfies `rule`.
pub fn role_permits(rule: ActorRule, role: ParticipantRole) -> bool {
    match rule {
        ActorRule::TargetUser => role == ParticipantRole::Counterparty,
        ActorRule::Initiator => role == ParticipantRole::Initiator,
        ActorRule::EitherParty => true,
        ActorRule::System => false,
    }
}

/// Actions a party in `role` may take on the proposal right now.
pub fn available_actions(proposal: &SwapProposal, role: ParticipantRole) -> Vec<SwapAction> {
    [
        SwapAction::Accept,
        SwapAction::Reject,
        SwapAction::Cancel,
        SwapAction::Complete,
        SwapAction::Dispute,
    ]
    .into_iter()
    .filter(|action| next_status(proposal.status, *action).is_some())
    .filter(|action| role_permits(actor_rule(*action), role))
    .collect()
}

/// Notification event for the status a proposal has just entered.
pub fn event_for(status: SwapStatus) -> SwapEvent {
    match status {
        SwapStatus::Pending => SwapEvent::Proposed,
        SwapStatus::Accepted => SwapEvent::Accepted,
        SwapStatus::Completed => SwapEvent::Completed,
        SwapStatus::Rejected => SwapEvent::Rejected,
        SwapStatus::Cancelled => SwapEvent::Cancelled,
        SwapStatus::Expired => SwapEvent::Expired,
        SwapStatus::Disputed => SwapEvent::Disputed,
    }
}

/// Writes the fields that accompany a transition.
///
/// Timestamps are clamped so that `created_at <= accepted_at <= completed_at`
/// holds even if the clock steps backwards.
pub fn apply_transition_fields(
    proposal: &mut SwapProposal,
    action: SwapAction,
    now: DateTime<Utc>,
    reason: Option<String>,
) {
    match action {
        SwapAction::Accept => {
            proposal.accepted_at = Some(now.max(proposal.created_at));
        }
        SwapAction::Reject => {
            proposal.rejection_reason = reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
        }
        SwapAction::Complete => {
            let floor = proposal.accepted_at.unwrap_or(proposal.created_at);
            proposal.completed_at = Some(now.max(floor));
        }
        SwapAction::Cancel | SwapAction::Dispute | SwapAction::Expire => {}
    }
}

/// Side effects of a transition that has just been written.
///
/// One notification goes to the party who did not act; expiry notifies the initiator.
///
/// # Arguments
///
/// * `proposal` - The proposal after the transition
/// * `action` - The action applied
/// * `actor_id` - Acting user, None for system-driven expiry
pub fn side_effects(
    proposal: &SwapProposal,
    action: SwapAction,
    actor_id: Option<&str>,
) -> Vec<SideEffect> {
    let other_party = match actor_id {
        Some(actor) if actor == proposal.initiator_id => proposal.target_user_id.clone(),
        _ => proposal.initiator_id.clone(),
    };
    let mut effects = vec![SideEffect::Notify {
        user_id: other_party,
        event: event_for(proposal.status),
    }];

    let has_listings = !proposal.listing_ids().is_empty();
    match action {
        SwapAction::Accept if has_listings => effects.push(SideEffect::ReserveListings),
        SwapAction::Complete => {
            effects.push(SideEffect::CreditReputation {
                user_id: proposal.initiator_id.clone(),
            });
            effects.push(SideEffect::CreditReputation {
                user_id: proposal.target_user_id.clone(),
            });
            if has_listings {
                effects.push(SideEffect::ReleaseListings);
            }
        }
        SwapAction::Dispute => effects.push(SideEffect::FlagForReview),
        _ => {}
    }
    effects
}
