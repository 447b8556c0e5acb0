//! Participant view of a swap proposal.

use serde::{Deserialize, Serialize};

use crate::negotiation::eligibility::ParticipantRole;
use crate::negotiation::state_machine::available_actions;
use crate::negotiation::valuation::{suggest_difference, PaymentDirection};
use crate::storage::{SwapAction, SwapMode, SwapProposal};

/// A proposal as seen by one of its parties. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapParticipantView {
    #[serde(flatten)]
    pub proposal: SwapProposal,
    pub viewer_role: ParticipantRole,
    /// Actions the viewer may take now
    pub available_actions: Vec<SwapAction>,
    /// Balancing payment relative to the viewer (value_difference swaps only)
    pub payment: Option<PaymentDirection>,
    /// Advisory difference computed from the declared values
    pub suggested_difference: Option<f64>,
}

impl SwapParticipantView {
    /// Builds the view for `viewer_id`; None if they are not a party.
    pub fn for_viewer(proposal: SwapProposal, viewer_id: &str) -> Option<Self> {
        let role = ParticipantRole::resolve(&proposal, viewer_id)?;

        let payment = match (proposal.swap_mode, proposal.price_difference) {
            (SwapMode::ValueDifference, Some(difference)) => {
                Some(PaymentDirection::for_viewer(difference, role))
            }
            _ => None,
        };
        let suggested_difference =
            suggest_difference(proposal.offering_value, proposal.requesting_value);

        Some(Self {
            available_actions: available_actions(&proposal, role),
            viewer_role: role,
            payment,
            suggested_difference,
            proposal,
        })
    }
}
