//! Swap Negotiation Service
//!
//! A service that manages the lifecycle of swap proposals between marketplace
//! users: creation, acceptance, rejection, cancellation, completion, disputes
//! and expiry.
//!
//! ## Overview
//!
//! The service:
//! 1. Validates and stores swap proposals
//! 2. Enforces who may act on a proposal and when
//! 3. Notifies the other party of every state change
//! 4. Credits reputation on completion and reserves listings on acceptance
//!
//! Identity, listings, notification delivery and reputation scores belong to
//! external services; without configured URLs, in-memory stand-ins are used.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use swap_negotiation::api::ApiServer;
use swap_negotiation::config::{Config, CONFIG_PATH_ENV};
use swap_negotiation::integrations::{
    HttpListingRepository, HttpReputationLedger, InMemoryListingRepository,
    InMemoryReputationLedger, ListingRepository, LoggingNotificationSink, NotificationSink,
    ReputationLedger, WebhookNotificationSink,
};
use swap_negotiation::negotiation::SwapEngine;
use swap_negotiation::storage::SwapProposalStore;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs the service.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file (with environment overrides)
/// 3. Connects the external collaborators
/// 4. Starts the expiry sweep, if configured
/// 5. Runs the API server until shutdown
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Swap Negotiation Service");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Swap Negotiation Service");
        println!();
        println!("Usage: swap-negotiation [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  SWAP_SERVICE_CONFIG_PATH         Path to config file (overrides --config)");
        println!("  SWAP_SERVICE__<SECTION>__<KEY>   Override a config value");
        println!("                                   e.g. SWAP_SERVICE__SWAPS__ENABLED=false");
        return Ok(());
    }

    let config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => {
            info!("Using config from {}: {}", CONFIG_PATH_ENV, path);
            Config::load_from_path(&path)?
        }
        Err(_) => match args.iter().position(|arg| arg == "--config") {
            Some(i) if i + 1 < args.len() => {
                info!("Using custom config: {}", args[i + 1]);
                Config::load_from_path(&args[i + 1])?
            }
            _ => Config::load()?,
        },
    };
    info!("Configuration loaded successfully");

    let engine = Arc::new(build_engine(&config)?);
    info!(
        "Swap engine initialized (swaps enabled: {})",
        config.swaps.enabled
    );

    // Background expiry sweep; reads already expire proposals lazily
    let sweep_interval = config.swaps.expiry_sweep_interval_secs;
    if sweep_interval > 0 && config.swaps.expiry_window_secs > 0 {
        info!("Starting expiry sweep every {}s", sweep_interval);
        let sweep_engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
            loop {
                interval.tick().await;
                sweep_engine.expire_stale().await;
            }
        });
    }

    // Run the service (this blocks until shutdown)
    let api_server = ApiServer::new(config, engine);
    api_server.run().await?;

    Ok(())
}

/// Wires the engine to HTTP collaborators where configured, in-memory ones otherwise.
fn build_engine(config: &Config) -> Result<SwapEngine> {
    let integrations = &config.integrations;
    let timeout_ms = integrations.request_timeout_ms;

    let listings: Arc<dyn ListingRepository> = match &integrations.listing_service_url {
        Some(url) => {
            info!("Using listing service at {}", url);
            Arc::new(HttpListingRepository::new(url, timeout_ms)?)
        }
        None => {
            warn!("No listing_service_url configured; using an empty in-memory listing repository");
            Arc::new(InMemoryListingRepository::new())
        }
    };

    let notifier: Arc<dyn NotificationSink> = match &integrations.notification_webhook_url {
        Some(url) => {
            info!("Delivering notifications to {}", url);
            Arc::new(WebhookNotificationSink::new(url, timeout_ms)?)
        }
        None => Arc::new(LoggingNotificationSink),
    };

    let ledger: Arc<dyn ReputationLedger> = match &integrations.reputation_ledger_url {
        Some(url) => {
            info!("Using reputation ledger at {}", url);
            Arc::new(HttpReputationLedger::new(url, timeout_ms)?)
        }
        None => {
            warn!("No reputation_ledger_url configured; reputation credits are kept in memory");
            Arc::new(InMemoryReputationLedger::new())
        }
    };

    Ok(SwapEngine::new(
        config.swaps.clone(),
        Arc::new(SwapProposalStore::new()),
        listings,
        notifier,
        ledger,
    ))
}
