//! Generic API structures and handlers
//!
//! This module contains shared structures, helper functions, the rejection
//! handler and the server itself. Swap-specific handlers live in `swaps`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use warp::hyper::body::Bytes;
use warp::{
    http::{Method, StatusCode},
    Filter, Rejection, Reply,
};

use crate::config::Config;
use crate::integrations::ActingUser;
use crate::negotiation::SwapDraft;
use crate::negotiation::SwapEngine;
use crate::storage::SwapAction;

// ============================================================================
// SHARED REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Standardized response structure for all API endpoints.
///
/// This structure provides a consistent response format for all API endpoints,
/// including success/error status and relevant data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful; field violations for validation errors)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response with the given status code.
    pub fn ok(data: T, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
        warp::reply::with_status(
            warp::reply::json(&ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
            status,
        )
    }
}

impl ApiResponse<()> {
    /// Error response without data.
    pub fn failure(
        message: impl Into<String>,
        status: StatusCode,
    ) -> warp::reply::WithStatus<warp::reply::Json> {
        warp::reply::with_status(
            warp::reply::json(&ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(message.into()),
            }),
            status,
        )
    }
}

// ============================================================================
// WARP FILTER HELPERS
// ============================================================================

/// Creates a warp filter that provides access to the swap engine.
pub fn with_engine(
    engine: Arc<SwapEngine>,
) -> impl Filter<Extract = (Arc<SwapEngine>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

// ============================================================================
// CUSTOM REJECTION TYPES
// ============================================================================

/// Custom rejection for malformed request bodies, queries and headers
#[derive(Debug)]
pub struct BadRequestError(pub String);

impl warp::reject::Reject for BadRequestError {}

/// Custom rejection for requests without an acting user
#[derive(Debug)]
pub struct MissingIdentity;

impl warp::reject::Reject for MissingIdentity {}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];
    let headers = vec![
        "content-type",
        "x-user-id",
        "x-user-reputation",
        "x-user-verified",
    ];

    if allowed_origins.iter().any(|origin| origin == "*") {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods)
            .allow_headers(headers)
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(headers)
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// This function handles all warp rejections and converts them into
/// standardized API responses with appropriate HTTP status codes.
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(err) = rej.find::<BadRequestError>() {
        (StatusCode::BAD_REQUEST, err.0.clone())
    } else if rej.find::<MissingIdentity>().is_some() {
        (
            StatusCode::UNAUTHORIZED,
            "Missing acting user (x-user-id header)".to_string(),
        )
    } else if let Some(err) = rej.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", err))
    } else if let Some(err) = rej.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, format!("Invalid query: {}", err))
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(ApiResponse::<()>::failure(message, status))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server for the swap negotiation service.
pub struct ApiServer {
    /// Service configuration
    config: Arc<Config>,
    /// Negotiation engine shared by all handlers
    engine: Arc<SwapEngine>,
}

impl ApiServer {
    /// Creates a new API server over the given engine.
    pub fn new(config: Config, engine: Arc<SwapEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    /// Starts the API server and begins handling HTTP requests.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server shut down
    /// * `Err(anyhow::Error)` - Failed to start server
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting API server on {}:{}",
            self.config.api.host, self.config.api.port
        );

        let routes = self.create_routes();

        let addr: std::net::SocketAddr =
            format!("{}:{}", self.config.api.host, self.config.api.port)
                .parse()
                .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    ///
    /// # Returns
    ///
    /// A warp filter containing all API routes
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        use super::swaps;

        let engine = self.engine.clone();

        // Health check endpoint - returns service status
        let health = warp::path("health").and(warp::get()).map(|| {
            warp::reply::json(&ApiResponse::<String> {
                success: true,
                data: Some("Swap Negotiation Service is running".to_string()),
                error: None,
            })
        });

        // POST /swaps - Create a proposal
        let create_engine = engine.clone();
        let create_swap = warp::path("swaps")
            .and(warp::path::end())
            .and(warp::post())
            .and(swaps::with_acting_user())
            .and(warp::body::bytes())
            .and_then(move |actor: ActingUser, body: Bytes| {
                let engine = create_engine.clone();
                async move {
                    let body_str = String::from_utf8_lossy(&body);
                    debug!("POST /swaps - Received body: {}", body_str);

                    match serde_json::from_slice::<SwapDraft>(&body) {
                        Ok(draft) => swaps::create_swap_handler(actor, draft, engine).await,
                        Err(e) => {
                            error!("Swap draft deserialization failed: {}. Body: {}", e, body_str);
                            Err(warp::reject::custom(BadRequestError(format!(
                                "Invalid JSON: {}",
                                e
                            ))))
                        }
                    }
                }
            });

        // GET /swaps?role=&limit= - List the acting user's proposals
        let list_swaps = warp::path("swaps")
            .and(warp::path::end())
            .and(warp::get())
            .and(swaps::with_acting_user())
            .and(warp::query::<swaps::ListQuery>())
            .and(with_engine(engine.clone()))
            .and_then(swaps::list_swaps_handler);

        // GET /swaps/eligibility?listing_id= - Preview whether a proposal may be created
        let eligibility = warp::path("swaps")
            .and(warp::path("eligibility"))
            .and(warp::path::end())
            .and(warp::get())
            .and(swaps::with_acting_user())
            .and(warp::query::<swaps::EligibilityQuery>())
            .and(with_engine(engine.clone()))
            .and_then(swaps::eligibility_handler);

        // GET /swaps/:id - Proposal as seen by the acting user
        let get_swap = warp::path("swaps")
            .and(warp::path::param::<String>())
            .and(warp::path::end())
            .and(warp::get())
            .and(swaps::with_acting_user())
            .and(with_engine(engine.clone()))
            .and_then(swaps::get_swap_handler);

        // GET /swaps/:id/history - Transition history
        let history = warp::path("swaps")
            .and(warp::path::param::<String>())
            .and(warp::path("history"))
            .and(warp::path::end())
            .and(warp::get())
            .and(swaps::with_acting_user())
            .and(with_engine(engine.clone()))
            .and_then(swaps::get_history_handler);

        // POST /swaps/:id/:action - accept, reject, cancel, complete, dispute
        let action_engine = engine.clone();
        let swap_action = warp::path("swaps")
            .and(warp::path::param::<String>())
            .and(warp::path::param::<String>())
            .and(warp::path::end())
            .and(warp::post())
            .and(swaps::with_acting_user())
            .and(warp::body::bytes())
            .and_then(move |swap_id: String, action: String, actor: ActingUser, body: Bytes| {
                let engine = action_engine.clone();
                async move {
                    let action = swaps::parse_action(&action)?;
                    let reason = match action {
                        SwapAction::Reject => swaps::parse_reject_body(&body)?,
                        _ => None,
                    };
                    swaps::swap_action_handler(swap_id, action, actor, reason, engine).await
                }
            });

        // GET /valuation/suggestion - Advisory price difference
        let suggestion = warp::path("valuation")
            .and(warp::path("suggestion"))
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<swaps::SuggestionQuery>())
            .and_then(swaps::suggestion_handler);

        // Combine all routes and apply rejection handler
        health
            .or(create_swap)
            .or(list_swaps)
            .or(eligibility)
            .or(history)
            .or(get_swap)
            .or(swap_action)
            .or(suggestion)
            .with(create_cors_filter(&self.config.api.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    #[allow(dead_code)] // Used by tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}
