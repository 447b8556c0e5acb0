//! Valuation/Parity Advisor
//!
//! Advisory helpers around the cash balancing amount of a swap. Nothing here
//! writes to a proposal: a suggested difference only becomes the
//! `price_difference` when the initiator enters it.

use serde::{Deserialize, Serialize};

use crate::negotiation::eligibility::ParticipantRole;

/// Suggested balancing amount for two declared values.
///
/// Returns `requesting - offering` when both values are present, finite and
/// non-negative; None otherwise.
pub fn suggest_difference(
    offering_value: Option<f64>,
    requesting_value: Option<f64>,
) -> Option<f64> {
    let usable = |v: f64| v.is_finite() && v >= 0.0;
    match (offering_value, requesting_value) {
        (Some(offering), Some(requesting)) if usable(offering) && usable(requesting) => {
            Some(requesting - offering)
        }
        _ => None,
    }
}

/// Who pays the balancing amount, from one party's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum PaymentDirection {
    ViewerPays { amount: f64 },
    ViewerReceives { amount: f64 },
    Even,
}

impl PaymentDirection {
    /// Interprets a stored `price_difference` for the viewing party.
    ///
    /// The sign is stored from the initiator's side; the counterparty sees it inverted.
    pub fn for_viewer(price_difference: f64, role: ParticipantRole) -> Self {
        let owed_by_viewer = match role {
            ParticipantRole::Initiator => price_difference,
            ParticipantRole::Counterparty => -price_difference,
        };

        if owed_by_viewer > 0.0 {
            PaymentDirection::ViewerPays {
                amount: owed_by_viewer,
            }
        } else if owed_by_viewer < 0.0 {
            PaymentDirection::ViewerReceives {
                amount: -owed_by_viewer,
            }
        } else {
            PaymentDirection::Even
        }
    }
}
