//! Error Types Module
//!
//! Typed errors returned by the swap store and negotiation engine. Every
//! failure that reaches a caller carries enough information to explain to
//! the user why the request was refused.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{SwapAction, SwapStatus};

// ============================================================================
// FIELD VIOLATIONS
// ============================================================================

/// A single failed check on a swap draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Name of the offending draft field
    pub field: String,
    /// Human-readable description of the problem
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ============================================================================
// DENIAL REASONS
// ============================================================================

/// Reason an eligibility or authorization check refused an actor.
///
/// The display strings are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("swaps are currently disabled on this platform")]
    SwapsDisabled,

    #[error("this listing does not accept swap proposals")]
    ListingNotSwappable,

    #[error("minimum reputation score of {required} required (yours is {actual})")]
    InsufficientReputation { required: i64, actual: i64 },

    #[error("identity verification is required to propose a swap on this listing")]
    VerificationRequired,

    #[error("only the recipient of a proposal can {0} it")]
    RecipientOnly(SwapAction),

    #[error("only the initiator of a proposal can {0} it")]
    InitiatorOnly(SwapAction),

    #[error("proposals expire automatically and cannot be expired by hand")]
    SystemOnly,

    #[error("you are not a party to this proposal")]
    NotAParty,

    #[error("this proposal is closed")]
    TerminalState(SwapStatus),

    #[error("this action is not available for the proposal right now")]
    ActionUnavailable { status: SwapStatus, action: SwapAction },
}

// ============================================================================
// SWAP ERRORS
// ============================================================================

/// Errors produced by swap creation, lookup and state transitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwapError {
    /// The draft broke one or more data-model invariants; nothing was stored.
    #[error("invalid swap proposal: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// The actor may not perform the requested operation.
    #[error("{0}")]
    Forbidden(Denial),

    /// The action is not valid from the proposal's current status.
    #[error("this proposal can no longer be acted on")]
    InvalidTransition { from: SwapStatus, action: SwapAction },

    /// Unknown proposal, or the actor has no relationship to it.
    #[error("swap proposal not found")]
    NotFound,

    /// The listing service could not be reached while creating a proposal.
    #[error("listing lookup failed: {0}")]
    ListingLookup(String),
}

impl SwapError {
    /// Single-violation validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        SwapError::Validation(vec![FieldViolation::new(field, message)])
    }

    /// Maps an authorization denial onto the error taxonomy.
    ///
    /// Non-parties see `NotFound` so proposal existence does not leak; state
    /// problems become `InvalidTransition`; everything else is `Forbidden`.
    pub fn from_denial(denial: Denial, from: SwapStatus, action: SwapAction) -> Self {
        match denial {
            Denial::NotAParty => SwapError::NotFound,
            Denial::TerminalState(_) | Denial::ActionUnavailable { .. } => {
                SwapError::InvalidTransition { from, action }
            }
            other => SwapError::Forbidden(other),
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
