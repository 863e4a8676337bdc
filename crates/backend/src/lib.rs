//! Steam Play Together backend
//!
//! Provides:
//! - Steam Web API proxy for the browser client
//! - Common-games resolution across a friend list
//! - Steam OpenID sign-in

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod steam_api;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::SteamOpenId;
use crate::config::Config;
use crate::steam_api::SteamClient;

pub struct AppState {
    pub config: Config,
    pub steam: SteamClient,
    pub openid: SteamOpenId,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let steam = SteamClient::new(&config.steam_api_base, &config.steam_store_base);
        let openid = SteamOpenId::new(&config.steam_openid_url, &config.app_url, config.auth_return_url());
        Self { config, steam, openid }
    }
}

/// Build the router with every route and layer
pub fn create_app(config: Config) -> Router {
    let state = Arc::new(AppState::new(config));

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        .route("/api/client-config", get(routes::client_config))
        // Steam proxy
        .route("/api/steam/owned-games", post(routes::owned_games))
        .route("/api/steam/friends-list", post(routes::friends_list))
        .route("/api/steam/player-summaries", post(routes::player_summaries))
        .route("/api/steam/resolve-vanity", post(routes::resolve_vanity))
        .route("/api/steam/app-details", get(routes::app_details))
        .route("/api/steam/validate", post(routes::validate_key))
        .route("/api/steam/profile-visibility", post(routes::profile_visibility))
        .route("/api/steam/common-games", post(routes::common_games))
        // Auth
        .route("/api/auth/steam", post(auth::begin))
        .route("/api/auth/steam/return", get(auth::finish))
        .with_state(state)
        .layer(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
