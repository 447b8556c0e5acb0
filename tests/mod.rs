//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    build_test_config, build_test_harness, build_test_harness_with, build_test_settings,
    initiator, logo_design_draft, no_swap_listing, offering_listing, raw_pending_proposal,
    stranger, target_listing, target_user, RecordingNotificationSink, RecordingReputationLedger,
    TestHarness, DUMMY_INITIATOR_ID, DUMMY_NO_SWAP_LISTING_ID, DUMMY_OFFERING_LISTING_ID,
    DUMMY_REPUTATION_BONUS, DUMMY_STRANGER_ID, DUMMY_TARGET_LISTING_ID,
    DUMMY_TARGET_LISTING_TITLE, DUMMY_TARGET_USER_ID,
};
