//! Unit tests for swap draft validation
//!
//! Tests that drafts are turned into pending proposals only when every
//! invariant holds, and that every violation is reported.

use chrono::{Duration, Utc};
use swap_negotiation::error::SwapError;
use swap_negotiation::negotiation::draft::build_proposal;
use swap_negotiation::negotiation::{DraftListings, SwapDraft};
use swap_negotiation::storage::{OwnershipTransferType, SwapMode, SwapProposal, SwapStatus};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    offering_listing, target_listing, DUMMY_INITIATOR_ID, DUMMY_OFFERING_LISTING_ID,
    DUMMY_STRANGER_ID, DUMMY_TARGET_LISTING_ID, DUMMY_TARGET_LISTING_TITLE, DUMMY_TARGET_USER_ID,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn listings() -> DraftListings {
    DraftListings {
        target: Some(target_listing()),
        offering: Some(offering_listing()),
    }
}

/// Free-text draft addressed to the target user.
fn free_text_draft(mode: SwapMode) -> SwapDraft {
    SwapDraft {
        target_user_id: Some(DUMMY_TARGET_USER_ID.to_string()),
        requesting_description: Some("Guitar lessons".to_string()),
        offering_description: Some("Bike repair".to_string()),
        ..SwapDraft::new(mode)
    }
}

/// Build a draft from alice that references no listings.
fn build_unlisted(draft: SwapDraft) -> Result<SwapProposal, SwapError> {
    build_proposal(DUMMY_INITIATOR_ID, draft, &DraftListings::default(), Utc::now(), None)
}

/// Fields named by a validation error, in order.
fn violated_fields(result: Result<SwapProposal, SwapError>) -> Vec<String> {
    match result {
        Err(SwapError::Validation(violations)) => violations.into_iter().map(|v| v.field).collect(),
        other => panic!("expected validation error, got {:?}", other),
    }
}

// ============================================================================
// VALID DRAFTS
// ============================================================================

/// Test that a valid draft becomes a pending proposal with a fresh id
/// What is tested: build_proposal on a complete listing-for-listing draft
/// Why: Creation must set status, parties and timestamps consistently
#[test]
fn test_valid_listing_swap() {
    let now = Utc::now();
    let expires_at = Some(now + Duration::days(14));
    let draft = SwapDraft {
        target_listing_id: Some(DUMMY_TARGET_LISTING_ID.to_string()),
        offering_listing_id: Some(DUMMY_OFFERING_LISTING_ID.to_string()),
        ownership_transfer_type: OwnershipTransferType::Lease,
        usage_rights: Some("  weekends only ".to_string()),
        ..SwapDraft::new(SwapMode::DirectSwap)
    };

    let proposal = build_proposal(DUMMY_INITIATOR_ID, draft, &listings(), now, expires_at).unwrap();

    assert!(!proposal.id.is_empty());
    assert_eq!(proposal.status, SwapStatus::Pending);
    assert_eq!(proposal.initiator_id, DUMMY_INITIATOR_ID);
    assert_eq!(proposal.target_user_id, DUMMY_TARGET_USER_ID);
    assert_eq!(proposal.requesting_description.as_deref(), Some(DUMMY_TARGET_LISTING_TITLE));
    assert_eq!(proposal.ownership_transfer_type, OwnershipTransferType::Lease);
    assert_eq!(proposal.usage_rights.as_deref(), Some("weekends only"));
    assert_eq!(proposal.created_at, now);
    assert_eq!(proposal.expires_at, expires_at);
    assert!(proposal.rejection_reason.is_none());
}

/// Test that two builds of the same draft get distinct ids
/// What is tested: id generation
/// Why: Ids are the only key of the store
#[test]
fn test_ids_are_unique() {
    let a = build_unlisted(free_text_draft(SwapMode::DirectSwap)).unwrap();
    let b = build_unlisted(free_text_draft(SwapMode::DirectSwap)).unwrap();
    assert_ne!(a.id, b.id);
}

/// Test that a value-difference draft keeps its balancing amount
/// What is tested: price_difference in value_difference mode, including negative amounts
/// Why: Negative means the initiator receives the difference
#[test]
fn test_value_difference_terms() {
    let draft = SwapDraft {
        offering_value: Some(150.0),
        requesting_value: Some(100.0),
        price_difference: Some(-50.0),
        ..free_text_draft(SwapMode::ValueDifference)
    };

    let proposal = build_unlisted(draft).unwrap();

    assert_eq!(proposal.price_difference, Some(-50.0));
    assert_eq!(proposal.offering_value, Some(150.0));
}

/// Test that time-based drafts accept a contract duration
/// What is tested: contract_duration_days in time_based mode
#[test]
fn test_time_based_duration() {
    let draft = SwapDraft {
        contract_duration_days: Some(30),
        ..free_text_draft(SwapMode::TimeBased)
    };
    let proposal = build_unlisted(draft).unwrap();
    assert_eq!(proposal.contract_duration_days, Some(30));
}

// ============================================================================
// INVALID DRAFTS
// ============================================================================

/// Test that every violation is reported at once
/// What is tested: a draft that breaks several rules
/// Why: Users should fix all problems in one round trip
#[test]
fn test_collects_all_violations() {
    let draft = SwapDraft {
        target_user_id: Some(DUMMY_TARGET_USER_ID.to_string()),
        offering_value: Some(-10.0),
        price_difference: Some(25.0),
        contract_duration_days: Some(7),
        ..SwapDraft::new(SwapMode::DirectSwap)
    };

    let fields = violated_fields(build_unlisted(draft));

    assert_eq!(
        fields,
        vec![
            "offering_description",
            "requesting_description",
            "offering_value",
            "price_difference",
            "contract_duration_days",
        ]
    );
}

/// Test that a proposal to oneself is refused
/// What is tested: target_user_id equal to the initiator
#[test]
fn test_self_swap_refused() {
    let draft = SwapDraft {
        target_user_id: Some(DUMMY_INITIATOR_ID.to_string()),
        ..free_text_draft(SwapMode::DirectSwap)
    };
    let fields = violated_fields(build_unlisted(draft));
    assert_eq!(fields, vec!["target_user_id"]);
}

/// Test that a target is required when no listing names one
/// What is tested: free-text draft without target_user_id
#[test]
fn test_missing_target_refused() {
    let draft = SwapDraft {
        target_user_id: Some("   ".to_string()),
        ..free_text_draft(SwapMode::DirectSwap)
    };
    let fields = violated_fields(build_unlisted(draft));
    assert_eq!(fields, vec!["target_user_id"]);
}

/// Test that listing ownership is checked on both sides
/// What is tested: target listing of another user, offering listing not owned by the initiator
/// Why: Users can only request from the addressee and offer their own listings
#[test]
fn test_listing_ownership_enforced() {
    let draft = SwapDraft {
        target_user_id: Some(DUMMY_STRANGER_ID.to_string()),
        target_listing_id: Some(DUMMY_TARGET_LISTING_ID.to_string()),
        offering_listing_id: Some(DUMMY_OFFERING_LISTING_ID.to_string()),
        ..SwapDraft::new(SwapMode::DirectSwap)
    };

    // Offered by someone other than the listing owner
    let result = build_proposal("user-0004-carol", draft, &listings(), Utc::now(), None);
    let fields = violated_fields(result);

    assert_eq!(fields, vec!["target_listing_id", "offering_listing_id"]);
}

/// Test that referenced listings must exist
/// What is tested: listing ids that resolved to nothing
#[test]
fn test_unknown_listings_refused() {
    let draft = SwapDraft {
        target_listing_id: Some("listing-gone".to_string()),
        offering_listing_id: Some("listing-also-gone".to_string()),
        ..SwapDraft::new(SwapMode::DirectSwap)
    };

    let fields = violated_fields(build_unlisted(draft));

    assert!(fields.contains(&"target_listing_id".to_string()));
    assert!(fields.contains(&"offering_listing_id".to_string()));
    assert!(fields.contains(&"target_user_id".to_string()));
}

/// Test that a zero-day contract is refused
/// What is tested: contract_duration_days = 0 in contract_based mode
#[test]
fn test_zero_duration_refused() {
    let draft = SwapDraft {
        contract_duration_days: Some(0),
        ..free_text_draft(SwapMode::ContractBased)
    };
    let fields = violated_fields(build_unlisted(draft));
    assert_eq!(fields, vec!["contract_duration_days"]);
}

/// Test that a draft deserializes from the minimal JSON clients send
/// What is tested: serde defaults on SwapDraft
#[test]
fn test_draft_json_defaults() {
    let draft: SwapDraft = serde_json::from_value(serde_json::json!({
        "swap_mode": "direct_swap",
        "target_listing_id": DUMMY_TARGET_LISTING_ID,
        "offering_description": "2 hours of logo design"
    }))
    .unwrap();

    assert_eq!(draft.swap_mode, SwapMode::DirectSwap);
    assert_eq!(draft.ownership_transfer_type, OwnershipTransferType::Full);
    assert!(draft.target_user_id.is_none());
    assert!(draft.price_difference.is_none());
}
