//! In-memory collaborators used when no external service is configured.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use super::{Listing, ListingRepository, NotificationSink, ReputationLedger, SwapEvent};

/// Listing repository backed by a HashMap.
pub struct InMemoryListingRepository {
    /// Map of listing_id -> Listing
    listings: RwLock<HashMap<String, Listing>>,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a listing.
    pub async fn upsert(&self, listing: Listing) {
        let mut listings = self.listings.write().await;
        listings.insert(listing.id.clone(), listing);
    }
}

impl Default for InMemoryListingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        let listings = self.listings.read().await;
        Ok(listings.get(listing_id).cloned())
    }

    async fn set_reserved(&self, listing_id: &str, reserved: bool) -> Result<()> {
        let mut listings = self.listings.write().await;
        let listing = listings
            .get_mut(listing_id)
            .ok_or_else(|| anyhow!("Listing {} not found", listing_id))?;
        listing.reserved = reserved;
        Ok(())
    }
}

/// Notification sink that only writes the event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(
        &self,
        user_id: &str,
        event: SwapEvent,
        payload: serde_json::Value,
    ) -> Result<()> {
        info!("Notification for {}: {} {}", user_id, event, payload);
        Ok(())
    }
}

/// Reputation ledger that keeps running balances in memory.
pub struct InMemoryReputationLedger {
    /// Map of user_id -> accumulated credit
    balances: RwLock<HashMap<String, i64>>,
}

impl InMemoryReputationLedger {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Total credit recorded for a user (0 if none).
    pub async fn balance(&self, user_id: &str) -> i64 {
        let balances = self.balances.read().await;
        balances.get(user_id).copied().unwrap_or(0)
    }
}

impl Default for InMemoryReputationLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReputationLedger for InMemoryReputationLedger {
    async fn credit(&self, user_id: &str, amount: i64, reason: &str) -> Result<()> {
        let mut balances = self.balances.write().await;
        *balances.entry(user_id.to_string()).or_insert(0) += amount;
        info!("Credited {} reputation to {} ({})", amount, user_id, reason);
        Ok(())
    }
}
