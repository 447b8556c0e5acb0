//! Shared test helpers for unit tests
//!
//! This module provides helper functions used by unit tests.
//!
//! The module is organized into several categories:
//! - **Constants**: Dummy user and listing ids
//! - **Users and Listings**: Default acting users and listings
//! - **Recording Collaborators**: Notification sink and reputation ledger that record calls
//! - **Builders**: Test configuration, engine harness, drafts and raw proposals

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use swap_negotiation::config::{ApiConfig, Config, IntegrationsConfig, SwapSettings};
use swap_negotiation::integrations::{
    ActingUser, InMemoryListingRepository, Listing, NotificationSink, ReputationLedger, SwapEvent,
};
use swap_negotiation::negotiation::{SwapDraft, SwapEngine};
use swap_negotiation::storage::{
    OwnershipTransferType, SwapMode, SwapProposal, SwapProposalStore, SwapStatus,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Initiator of most test proposals
pub const DUMMY_INITIATOR_ID: &str = "user-0001-alice";

/// Target user of most test proposals
pub const DUMMY_TARGET_USER_ID: &str = "user-0002-bob";

/// A user with no relationship to test proposals
pub const DUMMY_STRANGER_ID: &str = "user-0003-mallory";

/// Listing owned by the target user (swap-enabled, gated)
pub const DUMMY_TARGET_LISTING_ID: &str = "listing-0001-camera";

/// Listing owned by the initiator
#[allow(dead_code)]
pub const DUMMY_OFFERING_LISTING_ID: &str = "listing-0002-bicycle";

/// Listing owned by the target user with swaps disabled
#[allow(dead_code)]
pub const DUMMY_NO_SWAP_LISTING_ID: &str = "listing-0003-sofa";

/// Title of the target listing
pub const DUMMY_TARGET_LISTING_TITLE: &str = "Vintage film camera";

/// Reputation bonus used by the test settings
#[allow(dead_code)]
pub const DUMMY_REPUTATION_BONUS: i64 = 25;

// ============================================================================
// USERS AND LISTINGS
// ============================================================================

/// Verified initiator with reputation 600.
pub fn initiator() -> ActingUser {
    ActingUser::new(DUMMY_INITIATOR_ID, 600, true)
}

/// Verified target user with reputation 700.
pub fn target_user() -> ActingUser {
    ActingUser::new(DUMMY_TARGET_USER_ID, 700, true)
}

/// Unrelated user.
#[allow(dead_code)]
pub fn stranger() -> ActingUser {
    ActingUser::new(DUMMY_STRANGER_ID, 900, true)
}

/// Target listing: swap-enabled, minimum reputation 500, verification required.
pub fn target_listing() -> Listing {
    Listing {
        id: DUMMY_TARGET_LISTING_ID.to_string(),
        owner_id: DUMMY_TARGET_USER_ID.to_string(),
        title: DUMMY_TARGET_LISTING_TITLE.to_string(),
        price: Some(450.0),
        swap_enabled: true,
        minimum_reputation: Some(500),
        swap_verification_required: true,
        reserved: false,
    }
}

/// Offering listing owned by the initiator, no gating.
pub fn offering_listing() -> Listing {
    Listing {
        id: DUMMY_OFFERING_LISTING_ID.to_string(),
        owner_id: DUMMY_INITIATOR_ID.to_string(),
        title: "Road bicycle".to_string(),
        price: Some(300.0),
        swap_enabled: true,
        minimum_reputation: None,
        swap_verification_required: false,
        reserved: false,
    }
}

/// Listing owned by the target user that does not accept swaps.
pub fn no_swap_listing() -> Listing {
    Listing {
        id: DUMMY_NO_SWAP_LISTING_ID.to_string(),
        owner_id: DUMMY_TARGET_USER_ID.to_string(),
        title: "Leather sofa".to_string(),
        price: Some(800.0),
        swap_enabled: false,
        minimum_reputation: None,
        swap_verification_required: false,
        reserved: false,
    }
}

// ============================================================================
// RECORDING COLLABORATORS
// ============================================================================

/// A recorded notification: (user_id, event, payload).
pub type RecordedNotification = (String, SwapEvent, serde_json::Value);

/// Notification sink that records every call, optionally failing each one.
#[derive(Default)]
pub struct RecordingNotificationSink {
    pub sent: Mutex<Vec<RecordedNotification>>,
    pub fail: bool,
}

impl RecordingNotificationSink {
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Recorded (user_id, event) pairs.
    #[allow(dead_code)]
    pub fn events(&self) -> Vec<(String, SwapEvent)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(user, event, _)| (user.clone(), *event))
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(
        &self,
        user_id: &str,
        event: SwapEvent,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), event, payload));
        if self.fail {
            return Err(anyhow!("notification transport down"));
        }
        Ok(())
    }
}

/// Reputation ledger that records every credit, optionally failing each one.
#[derive(Default)]
pub struct RecordingReputationLedger {
    pub credits: Mutex<Vec<(String, i64, String)>>,
    pub fail: bool,
}

impl RecordingReputationLedger {
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            credits: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Sorted ids of credited users.
    #[allow(dead_code)]
    pub fn credited_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .credits
            .lock()
            .unwrap()
            .iter()
            .map(|(user, _, _)| user.clone())
            .collect();
        users.sort();
        users
    }
}

#[async_trait]
impl ReputationLedger for RecordingReputationLedger {
    async fn credit(&self, user_id: &str, amount: i64, reason: &str) -> Result<()> {
        self.credits
            .lock()
            .unwrap()
            .push((user_id.to_string(), amount, reason.to_string()));
        if self.fail {
            return Err(anyhow!("ledger unavailable"));
        }
        Ok(())
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Swap settings used by tests: expiry after one hour, bonus of 25.
pub fn build_test_settings() -> SwapSettings {
    SwapSettings {
        enabled: true,
        expiry_window_secs: 3600,
        expiry_sweep_interval_secs: 0,
        reserve_listings_on_accept: true,
        completion_reputation_bonus: DUMMY_REPUTATION_BONUS,
        default_list_limit: 10,
        max_list_limit: 20,
    }
}

/// Build a valid in-memory test configuration.
#[allow(dead_code)]
pub fn build_test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 3999,
            cors_origins: vec![],
        },
        swaps: build_test_settings(),
        integrations: IntegrationsConfig::default(),
    }
}

/// Engine plus handles on its collaborators.
pub struct TestHarness {
    pub engine: Arc<SwapEngine>,
    pub store: Arc<SwapProposalStore>,
    pub listings: Arc<InMemoryListingRepository>,
    pub notifier: Arc<RecordingNotificationSink>,
    pub ledger: Arc<RecordingReputationLedger>,
}

/// Build an engine with seeded listings and recording collaborators.
pub async fn build_test_harness_with(
    settings: SwapSettings,
    notifier: RecordingNotificationSink,
    ledger: RecordingReputationLedger,
) -> TestHarness {
    let store = Arc::new(SwapProposalStore::new());
    let listings = Arc::new(InMemoryListingRepository::new());
    listings.upsert(target_listing()).await;
    listings.upsert(offering_listing()).await;
    listings.upsert(no_swap_listing()).await;

    let notifier = Arc::new(notifier);
    let ledger = Arc::new(ledger);

    let engine = Arc::new(SwapEngine::new(
        settings,
        store.clone(),
        listings.clone(),
        notifier.clone(),
        ledger.clone(),
    ));

    TestHarness {
        engine,
        store,
        listings,
        notifier,
        ledger,
    }
}

/// Build an engine with the default test settings.
#[allow(dead_code)]
pub async fn build_test_harness() -> TestHarness {
    build_test_harness_with(
        build_test_settings(),
        RecordingNotificationSink::default(),
        RecordingReputationLedger::default(),
    )
    .await
}

/// Draft offering free-text design work against the target listing.
pub fn logo_design_draft() -> SwapDraft {
    SwapDraft {
        target_listing_id: Some(DUMMY_TARGET_LISTING_ID.to_string()),
        offering_description: Some("2 hours of logo design".to_string()),
        ..SwapDraft::new(SwapMode::DirectSwap)
    }
}

/// Pending proposal built directly, bypassing the engine.
#[allow(dead_code)]
pub fn raw_pending_proposal(
    id: &str,
    initiator_id: &str,
    target_user_id: &str,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> SwapProposal {
    SwapProposal {
        id: id.to_string(),
        initiator_id: initiator_id.to_string(),
        target_user_id: target_user_id.to_string(),
        target_listing_id: None,
        requesting_description: Some("Guitar lessons".to_string()),
        offering_listing_id: None,
        offering_description: Some("Bike repair".to_string()),
        swap_mode: SwapMode::DirectSwap,
        offering_value: None,
        requesting_value: None,
        price_difference: None,
        contract_duration_days: None,
        ownership_transfer_type: OwnershipTransferType::Full,
        usage_rights: None,
        upgrade_expectations: None,
        status: SwapStatus::Pending,
        rejection_reason: None,
        created_at,
        accepted_at: None,
        completed_at: None,
        expires_at,
    }
}
