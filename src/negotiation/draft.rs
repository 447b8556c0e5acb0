//! Swap Draft Validation
//!
//! Turns an initiator's draft into a complete pending proposal, or reports
//! every violated invariant at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldViolation, SwapError};
use crate::integrations::Listing;
use crate::storage::{OwnershipTransferType, SwapMode, SwapProposal, SwapStatus};

/// Proposal as composed by the initiator, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapDraft {
    /// Addressee; derived from the target listing's owner when omitted
    #[serde(default)]
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub target_listing_id: Option<String>,
    /// Filled from the target listing's title when omitted
    #[serde(default)]
    pub requesting_description: Option<String>,
    #[serde(default)]
    pub offering_listing_id: Option<String>,
    #[serde(default)]
    pub offering_description: Option<String>,
    pub swap_mode: SwapMode,
    #[serde(default)]
    pub offering_value: Option<f64>,
    #[serde(default)]
    pub requesting_value: Option<f64>,
    #[serde(default)]
    pub price_difference: Option<f64>,
    #[serde(default)]
    pub contract_duration_days: Option<u32>,
    #[serde(default)]
    pub ownership_transfer_type: OwnershipTransferType,
    #[serde(default)]
    pub usage_rights: Option<String>,
    #[serde(default)]
    pub upgrade_expectations: Option<String>,
}

impl SwapDraft {
    /// Empty draft for the given mode.
    pub fn new(swap_mode: SwapMode) -> Self {
        Self {
            target_user_id: None,
            target_listing_id: None,
            requesting_description: None,
            offering_listing_id: None,
            offering_description: None,
            swap_mode,
            offering_value: None,
            requesting_value: None,
            price_difference: None,
            contract_duration_days: None,
            ownership_transfer_type: OwnershipTransferType::default(),
            usage_rights: None,
            upgrade_expectations: None,
        }
    }
}

/// Listings referenced by a draft, as returned by the listing repository.
///
/// `None` means either no id was given or the listing does not exist.
#[derive(Debug, Clone, Default)]
pub struct DraftListings {
    pub target: Option<Listing>,
    pub offering: Option<Listing>,
}

/// Trims free text and maps blank strings to None.
fn clean(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn check_value(field: &str, value: Option<f64>, violations: &mut Vec<FieldViolation>) {
    if let Some(v) = value {
        if !v.is_finite() || v < 0.0 {
            violations.push(FieldViolation::new(field, "must be a non-negative number"));
        }
    }
}

/// Validates a draft and builds the pending proposal.
///
/// # Arguments
///
/// * `initiator_id` - The acting user creating the proposal
/// * `draft` - The initiator's draft
/// * `listings` - Listings the draft references (already looked up)
/// * `now` - Creation time
/// * `expires_at` - End of the response window, if any
///
/// # Returns
///
/// * `Ok(SwapProposal)` - A pending proposal with a fresh id
/// * `Err(SwapError::Validation)` - Every violated invariant
pub fn build_proposal(
    initiator_id: &str,
    draft: SwapDraft,
    listings: &DraftListings,
    now: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<SwapProposal, SwapError> {
    let mut violations = Vec::new();

    let target_listing_id = clean(draft.target_listing_id);
    let offering_listing_id = clean(draft.offering_listing_id);

    // Listing references must resolve
    let target_listing = match &target_listing_id {
        Some(_) if listings.target.is_none() => {
            violations.push(FieldViolation::new("target_listing_id", "listing not found"));
            None
        }
        Some(_) => listings.target.as_ref(),
        None => None,
    };
    let offering_listing = match &offering_listing_id {
        Some(_) if listings.offering.is_none() => {
            violations.push(FieldViolation::new("offering_listing_id", "listing not found"));
            None
        }
        Some(_) => listings.offering.as_ref(),
        None => None,
    };

    // Parties
    let target_user_id =
        clean(draft.target_user_id).or_else(|| target_listing.map(|l| l.owner_id.clone()));
    match &target_user_id {
        None => violations.push(FieldViolation::new(
            "target_user_id",
            "a target user or a target listing is required",
        )),
        Some(target) if target == initiator_id => violations.push(FieldViolation::new(
            "target_user_id",
            "you cannot propose a swap to yourself",
        )),
        Some(target) => {
            if let Some(listing) = target_listing {
                if &listing.owner_id != target {
                    violations.push(FieldViolation::new(
                        "target_listing_id",
                        "listing does not belong to the target user",
                    ));
                }
            }
        }
    }
    if let Some(listing) = offering_listing {
        if listing.owner_id != initiator_id {
            violations.push(FieldViolation::new(
                "offering_listing_id",
                "you can only offer your own listings",
            ));
        }
    }

    // Each side needs a listing or a description
    let offering_description = clean(draft.offering_description);
    if offering_listing_id.is_none() && offering_description.is_none() {
        violations.push(FieldViolation::new(
            "offering_description",
            "describe what you offer or reference one of your listings",
        ));
    }
    let requesting_description = clean(draft.requesting_description)
        .or_else(|| target_listing.map(|l| l.title.clone()));
    if target_listing_id.is_none() && requesting_description.is_none() {
        violations.push(FieldViolation::new(
            "requesting_description",
            "describe what you want or reference the listing you are requesting",
        ));
    }

    // Mode-dependent terms
    check_value("offering_value", draft.offering_value, &mut violations);
    check_value("requesting_value", draft.requesting_value, &mut violations);

    if let Some(difference) = draft.price_difference {
        if !draft.swap_mode.allows_price_difference() {
            violations.push(FieldViolation::new(
                "price_difference",
                format!("not applicable to {} swaps", draft.swap_mode),
            ));
        } else if !difference.is_finite() {
            violations.push(FieldViolation::new("price_difference", "must be a number"));
        }
    }

    if let Some(days) = draft.contract_duration_days {
        if !draft.swap_mode.allows_contract_duration() {
            violations.push(FieldViolation::new(
                "contract_duration_days",
                format!("not applicable to {} swaps", draft.swap_mode),
            ));
        } else if days == 0 {
            violations.push(FieldViolation::new(
                "contract_duration_days",
                "must be at least one day",
            ));
        }
    }

    if !violations.is_empty() {
        return Err(SwapError::Validation(violations));
    }

    // No violations means a target user was resolved
    let target_user_id = target_user_id.ok_or_else(|| {
        SwapError::invalid("target_user_id", "a target user or a target listing is required")
    })?;

    Ok(SwapProposal {
        id: Uuid::new_v4().to_string(),
        initiator_id: initiator_id.to_string(),
        target_user_id,
        target_listing_id,
        requesting_description,
        offering_listing_id,
        offering_description,
        swap_mode: draft.swap_mode,
        offering_value: draft.offering_value,
        requesting_value: draft.requesting_value,
        price_difference: draft.price_difference,
        contract_duration_days: draft.contract_duration_days,
        ownership_transfer_type: draft.ownership_transfer_type,
        usage_rights: clean(draft.usage_rights),
        upgrade_expectations: clean(draft.upgrade_expectations),
        status: SwapStatus::Pending,
        rejection_reason: None,
        created_at: now,
        accepted_at: None,
        completed_at: None,
        expires_at,
    })
}
