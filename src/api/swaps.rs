//! Swap Negotiation API Module
//!
//! This module provides API endpoints for creating swap proposals, acting on
//! them (accept, reject, cancel, complete, dispute), reading and listing
//! them, and the eligibility and valuation helpers.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use warp::hyper::body::Bytes;
use warp::{http::StatusCode, Filter, Rejection};

use crate::api::generic::{ApiResponse, BadRequestError, MissingIdentity};
use crate::error::SwapError;
use crate::integrations::ActingUser;
use crate::negotiation::{suggest_difference, SwapDraft, SwapEngine, SwapParticipantView};
use crate::storage::{ListRole, SwapAction, SwapProposal};

type JsonReply = warp::reply::WithStatus<warp::reply::Json>;

// ============================================================================
// REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Query parameters for GET /swaps.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// initiated, received or all (default)
    #[serde(default)]
    pub role: Option<ListRole>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query parameters for GET /swaps/eligibility.
#[derive(Debug, Default, Deserialize)]
pub struct EligibilityQuery {
    #[serde(default)]
    pub listing_id: Option<String>,
}

/// Query parameters for GET /valuation/suggestion.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub offering_value: Option<f64>,
    #[serde(default)]
    pub requesting_value: Option<f64>,
}

/// Response structure for GET /valuation/suggestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionResponse {
    /// requesting_value - offering_value, if both are usable
    pub suggested_difference: Option<f64>,
}

/// Optional body of POST /swaps/:id/reject.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Extracts the acting user from the gateway headers.
///
/// `x-user-id` is required; a missing reputation counts as 0 and a missing
/// verification flag as unverified.
pub fn with_acting_user() -> impl Filter<Extract = (ActingUser,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-user-id")
        .and(warp::header::optional::<String>("x-user-reputation"))
        .and(warp::header::optional::<String>("x-user-verified"))
        .and_then(
            |id: Option<String>, reputation: Option<String>, verified: Option<String>| async move {
                let id = id
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| warp::reject::custom(MissingIdentity))?;

                let reputation_score = match reputation {
                    Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                        warp::reject::custom(BadRequestError(format!(
                            "Invalid x-user-reputation header '{}': must be an integer",
                            raw
                        )))
                    })?,
                    None => 0,
                };

                let is_verified = matches!(
                    verified.as_deref().map(str::trim),
                    Some("true") | Some("1")
                );

                Ok::<_, Rejection>(ActingUser {
                    id,
                    reputation_score,
                    is_verified,
                })
            },
        )
}

// ============================================================================
// PARSING HELPERS
// ============================================================================

/// Maps the action path segment; unknown actions are a 404.
pub fn parse_action(segment: &str) -> Result<SwapAction, Rejection> {
    match segment {
        "accept" => Ok(SwapAction::Accept),
        "reject" => Ok(SwapAction::Reject),
        "cancel" => Ok(SwapAction::Cancel),
        "complete" => Ok(SwapAction::Complete),
        "dispute" => Ok(SwapAction::Dispute),
        _ => Err(warp::reject::not_found()),
    }
}

/// Reads the optional rejection reason; an empty body means no reason.
pub fn parse_reject_body(body: &Bytes) -> Result<Option<String>, Rejection> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<RejectRequest>(body)
        .map(|request| request.reason)
        .map_err(|e| warp::reject::custom(BadRequestError(format!("Invalid JSON: {}", e))))
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

/// Converts an engine error into a JSON reply with the matching status code.
fn swap_error_reply(err: SwapError) -> JsonReply {
    match err {
        SwapError::Validation(violations) => {
            let message = SwapError::Validation(violations.clone()).to_string();
            warp::reply::with_status(
                warp::reply::json(&ApiResponse {
                    success: false,
                    data: Some(violations),
                    error: Some(message),
                }),
                StatusCode::BAD_REQUEST,
            )
        }
        SwapError::Forbidden(denial) => {
            ApiResponse::<()>::failure(denial.to_string(), StatusCode::FORBIDDEN)
        }
        err @ SwapError::InvalidTransition { .. } => {
            ApiResponse::<()>::failure(err.to_string(), StatusCode::CONFLICT)
        }
        SwapError::NotFound => {
            ApiResponse::<()>::failure(SwapError::NotFound.to_string(), StatusCode::NOT_FOUND)
        }
        SwapError::ListingLookup(_) => ApiResponse::<()>::failure(
            "Listing service is unavailable, please retry later",
            StatusCode::BAD_GATEWAY,
        ),
    }
}

/// Builds the acting user's view of a proposal they are a party to.
fn view_reply(proposal: SwapProposal, actor: &ActingUser, status: StatusCode) -> JsonReply {
    match SwapParticipantView::for_viewer(proposal, &actor.id) {
        Some(view) => ApiResponse::ok(view, status),
        None => swap_error_reply(SwapError::NotFound),
    }
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Handler for POST /swaps.
///
/// Creates a pending proposal from the acting user's draft.
///
/// # Returns
///
/// * `201 Created` with the initiator's view of the proposal
/// * `400`/`403`/`502` with the reason the proposal was refused
pub async fn create_swap_handler(
    actor: ActingUser,
    draft: SwapDraft,
    engine: Arc<SwapEngine>,
) -> Result<JsonReply, Rejection> {
    info!("Received swap proposal from {}", actor.id);

    Ok(match engine.create_swap(&actor, draft).await {
        Ok(proposal) => view_reply(proposal, &actor, StatusCode::CREATED),
        Err(e) => swap_error_reply(e),
    })
}

/// Handler for GET /swaps/:id.
pub async fn get_swap_handler(
    swap_id: String,
    actor: ActingUser,
    engine: Arc<SwapEngine>,
) -> Result<JsonReply, Rejection> {
    Ok(match engine.get_swap(&swap_id, &actor).await {
        Ok(proposal) => view_reply(proposal, &actor, StatusCode::OK),
        Err(e) => swap_error_reply(e),
    })
}

/// Handler for GET /swaps/:id/history.
pub async fn get_history_handler(
    swap_id: String,
    actor: ActingUser,
    engine: Arc<SwapEngine>,
) -> Result<JsonReply, Rejection> {
    Ok(match engine.swap_history(&swap_id, &actor).await {
        Ok(history) => ApiResponse::ok(history, StatusCode::OK),
        Err(e) => swap_error_reply(e),
    })
}

/// Handler for GET /swaps.
///
/// Lists the acting user's proposals, newest first.
pub async fn list_swaps_handler(
    actor: ActingUser,
    query: ListQuery,
    engine: Arc<SwapEngine>,
) -> Result<JsonReply, Rejection> {
    let role = query.role.unwrap_or_default();
    let views: Vec<SwapParticipantView> = engine
        .list_swaps(&actor.id, role, query.limit)
        .await
        .into_iter()
        .filter_map(|proposal| SwapParticipantView::for_viewer(proposal, &actor.id))
        .collect();

    Ok(ApiResponse::ok(views, StatusCode::OK))
}

/// Handler for POST /swaps/:id/:action.
///
/// # Returns
///
/// * `200 OK` with the acting user's view of the updated proposal
/// * `403` wrong party, `404` unknown or unrelated proposal,
///   `409` the proposal can no longer be acted on
pub async fn swap_action_handler(
    swap_id: String,
    action: SwapAction,
    actor: ActingUser,
    reason: Option<String>,
    engine: Arc<SwapEngine>,
) -> Result<JsonReply, Rejection> {
    info!("Received {} for swap {} from {}", action, swap_id, actor.id);

    let result = match action {
        SwapAction::Accept => engine.accept_swap(&swap_id, &actor).await,
        SwapAction::Reject => engine.reject_swap(&swap_id, &actor, reason).await,
        SwapAction::Cancel => engine.cancel_swap(&swap_id, &actor).await,
        SwapAction::Complete => engine.complete_swap(&swap_id, &actor).await,
        SwapAction::Dispute => engine.dispute_swap(&swap_id, &actor).await,
        SwapAction::Expire => return Err(warp::reject::not_found()),
    };

    Ok(match result {
        Ok(proposal) => view_reply(proposal, &actor, StatusCode::OK),
        Err(e) => swap_error_reply(e),
    })
}

/// Handler for GET /swaps/eligibility.
///
/// Tells the acting user whether they may propose a swap (against the given
/// listing, if any) and why not.
pub async fn eligibility_handler(
    actor: ActingUser,
    query: EligibilityQuery,
    engine: Arc<SwapEngine>,
) -> Result<JsonReply, Rejection> {
    let listing_id = query
        .listing_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    Ok(match engine.check_eligibility(&actor, listing_id).await {
        Ok(decision) => ApiResponse::ok(decision, StatusCode::OK),
        Err(e) => swap_error_reply(e),
    })
}

/// Handler for GET /valuation/suggestion.
pub async fn suggestion_handler(query: SuggestionQuery) -> Result<JsonReply, Rejection> {
    Ok(ApiResponse::ok(
        SuggestionResponse {
            suggested_difference: suggest_difference(query.offering_value, query.requesting_value),
        },
        StatusCode::OK,
    ))
}
