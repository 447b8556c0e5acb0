//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the swap
//! negotiation service. Configuration includes API settings, platform-wide
//! swap rules, and the endpoints of external collaborators.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "SWAP_SERVICE_CONFIG_PATH";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/swap_service.toml";

/// Prefix of environment variables overriding file values
/// (e.g. `SWAP_SERVICE__SWAPS__ENABLED=false`).
pub const ENV_OVERRIDE_PREFIX: &str = "SWAP_SERVICE";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - API server (host, port, CORS)
/// - Platform-wide swap rules (feature flag, expiry, reputation bonus)
/// - External collaborators (listing service, notifications, reputation ledger)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration (host, port, CORS settings)
    pub api: ApiConfig,
    /// Platform-wide swap negotiation rules
    #[serde(default)]
    pub swaps: SwapSettings,
    /// External service endpoints (all optional; in-memory fallbacks are used)
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

/// API server configuration for external communication.
///
/// Controls how the service exposes its REST API endpoints
/// and handles cross-origin requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Allowed CORS origins for cross-origin requests
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Platform-wide swap negotiation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapSettings {
    /// Platform-wide swap feature flag
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Pending proposals expire this many seconds after creation (0 = never)
    #[serde(default = "default_expiry_window_secs")]
    pub expiry_window_secs: u64,
    /// Interval of the background expiry sweep (0 = expiry is only checked on read)
    #[serde(default)]
    pub expiry_sweep_interval_secs: u64,
    /// Mark referenced listings as reserved when a proposal is accepted
    #[serde(default = "default_enabled")]
    pub reserve_listings_on_accept: bool,
    /// Reputation credited to each party when a swap completes
    #[serde(default = "default_completion_reputation_bonus")]
    pub completion_reputation_bonus: i64,
    /// Number of proposals returned by a list query without an explicit limit
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,
    /// Upper bound for an explicit list limit
    #[serde(default = "default_max_list_limit")]
    pub max_list_limit: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_expiry_window_secs() -> u64 {
    14 * 24 * 60 * 60
}

fn default_completion_reputation_bonus() -> i64 {
    10
}

fn default_list_limit() -> usize {
    50
}

fn default_max_list_limit() -> usize {
    200
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            expiry_window_secs: default_expiry_window_secs(),
            expiry_sweep_interval_secs: 0,
            reserve_listings_on_accept: default_enabled(),
            completion_reputation_bonus: default_completion_reputation_bonus(),
            default_list_limit: default_list_limit(),
            max_list_limit: default_max_list_limit(),
        }
    }
}

/// Endpoints of the external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    /// Base URL of the listing service
    #[serde(default)]
    pub listing_service_url: Option<String>,
    /// Webhook receiving swap notifications
    #[serde(default)]
    pub notification_webhook_url: Option<String>,
    /// Base URL of the reputation ledger
    #[serde(default)]
    pub reputation_ledger_url: Option<String>,
    /// Timeout for outgoing HTTP requests in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            listing_service_url: None,
            notification_webhook_url: None,
            reputation_ledger_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - The first problem found
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.port == 0 {
            anyhow::bail!("Configuration error: api.port must be non-zero");
        }

        let swaps = &self.swaps;
        if swaps.default_list_limit == 0 {
            anyhow::bail!("Configuration error: swaps.default_list_limit must be at least 1");
        }
        if swaps.default_list_limit > swaps.max_list_limit {
            anyhow::bail!(
                "Configuration error: swaps.default_list_limit ({}) exceeds swaps.max_list_limit ({})",
                swaps.default_list_limit,
                swaps.max_list_limit
            );
        }
        if swaps.completion_reputation_bonus < 0 {
            anyhow::bail!(
                "Configuration error: swaps.completion_reputation_bonus must not be negative (got {})",
                swaps.completion_reputation_bonus
            );
        }

        let integrations = &self.integrations;
        for (name, value) in [
            ("listing_service_url", &integrations.listing_service_url),
            ("notification_webhook_url", &integrations.notification_webhook_url),
            ("reputation_ledger_url", &integrations.reputation_ledger_url),
        ] {
            if let Some(raw) = value {
                Url::parse(raw).map_err(|e| {
                    anyhow::anyhow!(
                        "Configuration error: integrations.{} is not a valid URL: {}",
                        name,
                        e
                    )
                })?;
            }
        }
        if integrations.request_timeout_ms == 0 {
            anyhow::bail!("Configuration error: integrations.request_timeout_ms must be non-zero");
        }

        Ok(())
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, applying environment overrides.
    ///
    /// Values from the file can be overridden by `SWAP_SERVICE__<SECTION>__<KEY>`
    /// environment variables.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load_from_path(config_path: &str) -> anyhow::Result<Self> {
        if !std::path::Path::new(config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/swap_service.template.toml config/swap_service.toml\n\
                Then edit config/swap_service.toml with your actual values.",
                config_path
            ));
        }

        let config: Config = ::config::Config::builder()
            .add_source(::config::File::new(config_path, ::config::FileFormat::Toml))
            .add_source(
                ::config::Environment::with_prefix(ENV_OVERRIDE_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from '{}'", config_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse configuration from '{}'", config_path))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `SWAP_SERVICE_CONFIG_PATH` or the default path.
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(&config_path)
    }

    /// Creates a configuration suitable for local development and testing.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3340,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            swaps: SwapSettings::default(),
            integrations: IntegrationsConfig::default(),
        }
    }
}
