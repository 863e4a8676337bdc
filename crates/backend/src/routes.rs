//! Steam proxy routes
//!
//! Each handler checks its required inputs before touching Steam, then either
//! passes Steam's body through untouched or reshapes it into one of the
//! `playtogether_core::messages` responses.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use playtogether_core::messages::*;
use playtogether_core::{ErrorKind, SteamApi};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Unwrap a JSON body, answering 400 for anything unparsable
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Bare vanity name from either a name or a profile URL
/// (`https://steamcommunity.com/id/name/` -> `name`)
pub fn clean_vanity_input(input: &str) -> &str {
    let name = match input.rfind("/id/") {
        Some(at) => &input[at + "/id/".len()..],
        None => input,
    };
    name.strip_suffix('/').unwrap_or(name)
}

// ============================================================================
// Pass-through endpoints
// ============================================================================

pub async fn owned_games(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SteamIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    if is_blank(&request.steam_id) || is_blank(&request.api_key) {
        return Err(ApiError::bad_request("Steam ID and API key are required"));
    }
    let games = state.steam.owned_games_json(&request.steam_id, &request.api_key).await?;
    Ok(Json(games))
}

pub async fn friends_list(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SteamIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    if is_blank(&request.steam_id) || is_blank(&request.api_key) {
        return Err(ApiError::bad_request("Steam ID and API key are required"));
    }
    let friends = state.steam.friends_list_json(&request.steam_id, &request.api_key).await?;
    Ok(Json(friends))
}

pub async fn player_summaries(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlayerSummariesRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    if request.steam_ids.is_empty() || is_blank(&request.api_key) {
        return Err(ApiError::bad_request("Steam IDs array and API key are required"));
    }
    let players = state
        .steam
        .player_summaries_json(&request.steam_ids, &request.api_key)
        .await?;
    Ok(Json(players))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDetailsQuery {
    pub app_id: Option<String>,
}

pub async fn app_details(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AppDetailsQuery>,
) -> ApiResult<Json<Value>> {
    let Some(app_id) = query.app_id.filter(|id| !is_blank(id)) else {
        return Err(ApiError::bad_request("App ID is required"));
    };
    let details = state.steam.app_details_json(&app_id).await?;
    Ok(Json(details))
}

// ============================================================================
// Reshaped endpoints
// ============================================================================

pub async fn resolve_vanity(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResolveVanityRequest>, JsonRejection>,
) -> ApiResult<Json<ResolveVanityResponse>> {
    let request = body(payload)?;
    if is_blank(&request.vanity_url) || is_blank(&request.api_key) {
        return Err(ApiError::bad_request("Vanity URL and API key are required"));
    }

    let vanity = clean_vanity_input(request.vanity_url.trim());
    match state.steam.resolve_vanity(vanity, &request.api_key).await? {
        Some(steam_id) => {
            tracing::debug!(vanity = %vanity, steam_id = %steam_id, "Resolved vanity URL");
            Ok(Json(ResolveVanityResponse { steam_id }))
        }
        None => Err(ApiError::NotFound("Steam ID not found for this vanity URL".to_string())),
    }
}

pub async fn validate_key(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidateKeyRequest>, JsonRejection>,
) -> (StatusCode, Json<ValidateKeyResponse>) {
    let invalid = |status: StatusCode, error: &str| {
        (
            status,
            Json(ValidateKeyResponse {
                valid: false,
                error: Some(error.to_string()),
            }),
        )
    };

    let api_key = payload.map(|Json(r)| r.api_key).unwrap_or_default();
    if is_blank(&api_key) {
        return invalid(StatusCode::BAD_REQUEST, "API key is required");
    }

    match state.steam.check_api_key(&api_key).await {
        Ok(valid) => (StatusCode::OK, Json(ValidateKeyResponse { valid, error: None })),
        Err(e) if matches!(e.kind, ErrorKind::Unauthorized | ErrorKind::Forbidden) => {
            invalid(StatusCode::OK, "Invalid API key")
        }
        Err(_) => invalid(StatusCode::INTERNAL_SERVER_ERROR, "Failed to validate API key"),
    }
}

pub async fn profile_visibility(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SteamIdRequest>, JsonRejection>,
) -> ApiResult<Json<ProfileVisibilityResponse>> {
    let request = body(payload)?;
    if is_blank(&request.steam_id) || is_blank(&request.api_key) {
        return Err(ApiError::bad_request("Steam ID and API key are required"));
    }
    let is_public = state
        .steam
        .profile_visibility(&request.steam_id, &request.api_key)
        .await?;
    Ok(Json(ProfileVisibilityResponse { is_public }))
}

pub async fn common_games(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CommonGamesRequest>, JsonRejection>,
) -> ApiResult<Json<CommonGamesResult>> {
    let request = body(payload)?;
    let Some(friend_ids) = request.friend_steam_ids else {
        return Err(ApiError::bad_request(
            "User Steam ID, friend Steam IDs array, and API key are required",
        ));
    };
    if is_blank(&request.user_steam_id) || is_blank(&request.api_key) {
        return Err(ApiError::bad_request(
            "User Steam ID, friend Steam IDs array, and API key are required",
        ));
    }
    if friend_ids.is_empty() {
        return Err(ApiError::bad_request("Add some friends first to find common games"));
    }

    tracing::info!(
        user = %request.user_steam_id,
        friends = friend_ids.len(),
        "Resolving common games"
    );
    let result = state
        .steam
        .common_games(&request.user_steam_id, &friend_ids, &request.api_key)
        .await?;
    tracing::info!(
        common = result.common_games.len(),
        public = result.public_friends.len(),
        private = result.private_friends.len(),
        "Common games resolved"
    );
    Ok(Json(result))
}

// ============================================================================
// Client bootstrap
// ============================================================================

pub async fn client_config(State(state): State<Arc<AppState>>) -> Json<ClientConfig> {
    Json(ClientConfig {
        app_url: state.config.app_url.clone(),
        gtm_id: state.config.gtm_id.clone(),
    })
}
