//! HTTP clients for the listing service, notification webhook and reputation ledger.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{Listing, ListingRepository, NotificationSink, ReputationLedger, SwapEvent};

fn build_client(timeout_ms: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .context("Failed to create HTTP client")
}

// ============================================================================
// LISTING SERVICE
// ============================================================================

/// Listing repository backed by the marketplace listing service.
///
/// * `GET  {base}/listings/{id}` returns the listing JSON, 404 if unknown
/// * `PUT  {base}/listings/{id}/reservation` with `{"reserved": bool}`
pub struct HttpListingRepository {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct ReservationRequest {
    reserved: bool,
}

impl HttpListingRepository {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_ms)?,
            base_url: Url::parse(base_url)
                .with_context(|| format!("Invalid listing service URL: {}", base_url))?,
        })
    }

    /// Listing endpoint URL; the id is always a single percent-encoded segment.
    fn listing_url(&self, listing_id: &str, suffix: Option<&str>) -> Result<Url> {
        if matches!(listing_id, "" | "." | "..") {
            anyhow::bail!("Invalid listing id: {:?}", listing_id);
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                anyhow::anyhow!("Listing service URL cannot be a base: {}", self.base_url)
            })?;
            segments.pop_if_empty().push("listings").push(listing_id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ListingRepository for HttpListingRepository {
    async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        let url = self.listing_url(listing_id, None)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to query listing {}", listing_id))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("Listing service rejected lookup of {}", listing_id))?;

        let listing: Listing = response
            .json()
            .await
            .with_context(|| format!("Invalid listing response for {}", listing_id))?;
        Ok(Some(listing))
    }

    async fn set_reserved(&self, listing_id: &str, reserved: bool) -> Result<()> {
        let url = self.listing_url(listing_id, Some("reservation"))?;
        debug!("PUT {} reserved={}", url, reserved);

        self.client
            .put(url)
            .json(&ReservationRequest { reserved })
            .send()
            .await
            .with_context(|| format!("Failed to update reservation of listing {}", listing_id))?
            .error_for_status()
            .with_context(|| format!("Listing service rejected reservation of {}", listing_id))?;
        Ok(())
    }
}

// ============================================================================
// NOTIFICATION WEBHOOK
// ============================================================================

/// Notification sink that POSTs each event to a webhook.
pub struct WebhookNotificationSink {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    user_id: &'a str,
    event: SwapEvent,
    payload: serde_json::Value,
}

impl WebhookNotificationSink {
    pub fn new(url: &str, timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_ms)?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(
        &self,
        user_id: &str,
        event: SwapEvent,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&WebhookBody {
                user_id,
                event,
                payload,
            })
            .send()
            .await
            .with_context(|| format!("Failed to deliver {} to {}", event, user_id))?
            .error_for_status()
            .with_context(|| format!("Webhook rejected {} for {}", event, user_id))?;
        Ok(())
    }
}

// ============================================================================
// REPUTATION LEDGER
// ============================================================================

/// Reputation ledger client: `POST {base}/credits`.
pub struct HttpReputationLedger {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct CreditRequest<'a> {
    user_id: &'a str,
    amount: i64,
    reason: &'a str,
}

impl HttpReputationLedger {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_ms)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReputationLedger for HttpReputationLedger {
    async fn credit(&self, user_id: &str, amount: i64, reason: &str) -> Result<()> {
        let url = format!("{}/credits", self.base_url);
        self.client
            .post(&url)
            .json(&CreditRequest {
                user_id,
                amount,
                reason,
            })
            .send()
            .await
            .with_context(|| format!("Failed to credit reputation to {}", user_id))?
            .error_for_status()
            .with_context(|| format!("Reputation ledger rejected credit for {}", user_id))?;
        Ok(())
    }
}
