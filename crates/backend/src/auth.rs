//! Authentication - Steam OpenID 2.0 sign-in
//!
//! The browser posts its API key to `/api/auth/steam`, which answers with the
//! Steam login URL and parks the key in a short-lived cookie. Steam sends the
//! user back to `/api/auth/steam/return`; the assertion is verified with
//! `check_authentication`, the profile is fetched with the parked key, and the
//! identity is handed to the client by redirect or, for popups, by
//! `postMessage` to the opener.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use playtogether_core::error::PlayTogetherError;
use playtogether_core::messages::{AuthBeginRequest, AuthBeginResponse, ErrorBody};
use playtogether_core::models::Identity;
use playtogether_core::SteamApi;
use serde_json::json;
use thiserror::Error;

use crate::AppState;

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const OPENID_IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";
pub const API_KEY_COOKIE: &str = "steam_api_key";
const API_KEY_COOKIE_MINUTES: i64 = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("OpenID response is not a positive assertion")]
    NotAnAssertion,

    #[error("OpenID assertion was issued for another return URL")]
    ReturnMismatch,

    #[error("Steam rejected the OpenID assertion")]
    Rejected,

    #[error("Claimed identity is not a Steam ID: {0}")]
    BadClaimedId(String),

    #[error("OpenID verification request failed: {0}")]
    Verification(String),

    #[error(transparent)]
    Profile(#[from] PlayTogetherError),
}

/// Steam's OpenID provider, as seen from this app
#[derive(Clone)]
pub struct SteamOpenId {
    http: reqwest::Client,
    provider_url: String,
    realm: String,
    return_url: String,
}

impl SteamOpenId {
    pub fn new(provider_url: impl Into<String>, realm: impl Into<String>, return_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider_url: provider_url.into(),
            realm: realm.into(),
            return_url: return_url.into(),
        }
    }

    /// Steam login URL (`checkid_setup`); popups get `popup=true` on the way back
    pub fn begin_auth(&self, popup: bool) -> String {
        let return_to = if popup {
            format!("{}?popup=true", self.return_url)
        } else {
            self.return_url.clone()
        };

        format!(
            "{}?openid.ns={}&openid.mode=checkid_setup&openid.return_to={}&openid.realm={}&openid.identity={}&openid.claimed_id={}",
            self.provider_url,
            urlencoding::encode(OPENID_NS),
            urlencoding::encode(&return_to),
            urlencoding::encode(&self.realm),
            urlencoding::encode(OPENID_IDENTIFIER_SELECT),
            urlencoding::encode(OPENID_IDENTIFIER_SELECT)
        )
    }

    /// Verify the assertion Steam sent back and look up the signed-in profile
    pub async fn complete_auth<A: SteamApi + ?Sized>(
        &self,
        params: &HashMap<String, String>,
        steam: &A,
        api_key: &str,
    ) -> Result<Identity, AuthError> {
        if params.get("openid.mode").map(String::as_str) != Some("id_res") {
            return Err(AuthError::NotAnAssertion);
        }
        let returned_to = params.get("openid.return_to").map(String::as_str).unwrap_or_default();
        if !returned_to.starts_with(&self.return_url) {
            return Err(AuthError::ReturnMismatch);
        }

        let steam_id = params
            .get("openid.claimed_id")
            .map(|id| steam_id_from_claimed_id(id))
            .transpose()?
            .ok_or_else(|| AuthError::BadClaimedId(String::new()))?;

        self.check_authentication(params).await?;

        let summary = steam
            .player_summaries(std::slice::from_ref(&steam_id), api_key)
            .await?
            .into_iter()
            .find(|p| p.steamid == steam_id);

        tracing::info!(steam_id = %steam_id, "Steam sign-in verified");
        Ok(Identity {
            username: summary.as_ref().map(|p| p.display_name()),
            avatar: summary.as_ref().and_then(|p| p.avatar_set()),
            steam_id,
        })
    }

    /// Ask Steam to confirm it signed this assertion
    async fn check_authentication(&self, params: &HashMap<String, String>) -> Result<(), AuthError> {
        let mut form: Vec<(&str, &str)> = params
            .iter()
            .filter(|(k, _)| k.starts_with("openid.") && k.as_str() != "openid.mode")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        form.push(("openid.mode", "check_authentication"));

        let response = self
            .http
            .post(&self.provider_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Verification(e.without_url().to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Verification(e.without_url().to_string()))?;

        if body.lines().any(|line| line.trim() == "is_valid:true") {
            Ok(())
        } else {
            Err(AuthError::Rejected)
        }
    }
}

/// `https://steamcommunity.com/openid/id/7656119...` -> the 17-digit id
pub fn steam_id_from_claimed_id(claimed_id: &str) -> Result<String, AuthError> {
    let id = claimed_id.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    if id.len() == 17 && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(id.to_string())
    } else {
        Err(AuthError::BadClaimedId(claimed_id.to_string()))
    }
}

// ============================================================================
// Routes
// ============================================================================

pub async fn begin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<AuthBeginRequest>, JsonRejection>,
) -> Response {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    if request.api_key.trim().is_empty() {
        let body = ErrorBody {
            error: "Steam API key is required".to_string(),
            retry_after: None,
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let redirect_url = state.openid.begin_auth(request.popup);
    let cookie = Cookie::build((API_KEY_COOKIE, request.api_key))
        .path("/")
        .http_only(true)
        .secure(state.config.production)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(API_KEY_COOKIE_MINUTES));

    tracing::debug!(popup = request.popup, "Starting Steam sign-in");
    (jar.add(cookie), Json(AuthBeginResponse { redirect_url })).into_response()
}

/// Where the signed-in identity goes: a redirect for full-page sign-in,
/// a `postMessage` page for popups
enum ReturnOutcome {
    Success { identity: Identity, api_key: String },
    Failed(&'static str),
}

pub async fn finish(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let popup = params.get("popup").is_some_and(|v| v == "true");

    let outcome = match jar.get(API_KEY_COOKIE).map(|c| c.value().to_string()) {
        None => {
            tracing::warn!("Steam sign-in returned without a pending API key");
            ReturnOutcome::Failed("steam_auth_expired")
        }
        Some(api_key) => match state.openid.complete_auth(&params, &state.steam, &api_key).await {
            Ok(identity) => ReturnOutcome::Success { identity, api_key },
            Err(e) => {
                tracing::error!(error = %e, "Steam sign-in failed");
                ReturnOutcome::Failed("steam_auth_failed")
            }
        },
    };

    let jar = jar.remove(Cookie::build(API_KEY_COOKIE).path("/"));
    let response = if popup {
        Html(popup_page(&outcome)).into_response()
    } else {
        Redirect::to(&redirect_target(&outcome)).into_response()
    };
    (jar, response).into_response()
}

fn redirect_target(outcome: &ReturnOutcome) -> String {
    match outcome {
        ReturnOutcome::Failed(code) => format!("/?error={}", code),
        ReturnOutcome::Success { identity, api_key } => {
            let avatar = serde_json::to_string(&identity.avatar).unwrap_or_else(|_| "null".to_string());
            format!(
                "/?steam_auth_success=true&steam_id={}&steam_name={}&steam_avatar={}&api_key={}",
                urlencoding::encode(&identity.steam_id),
                urlencoding::encode(identity.username.as_deref().unwrap_or_default()),
                urlencoding::encode(&avatar),
                urlencoding::encode(api_key)
            )
        }
    }
}

/// Small page that reports back to the opener and closes itself, falling back
/// to the full-page redirect when there is no opener
fn popup_page(outcome: &ReturnOutcome) -> String {
    let (title, message) = match outcome {
        ReturnOutcome::Success { identity, api_key } => (
            "Steam Authentication Success",
            json!({
                "type": "STEAM_AUTH_SUCCESS",
                "steamId": identity.steam_id,
                "steamName": identity.username,
                "steamAvatar": identity.avatar,
                "apiKey": api_key,
            }),
        ),
        ReturnOutcome::Failed(code) => (
            "Steam Authentication Failed",
            json!({ "type": "STEAM_AUTH_ERROR", "error": code }),
        ),
    };
    // serde_json leaves `</` alone, which would end the script block early
    let message = message.to_string().replace("</", "<\\/");
    let fallback = json!(redirect_target(outcome)).to_string().replace("</", "<\\/");

    format!(
        r#"<html>
  <head><title>{title}</title></head>
  <body>
    <script>
      if (window.opener) {{
        window.opener.postMessage({message}, window.location.origin);
        window.close();
      }} else {{
        window.location.href = {fallback};
      }}
    </script>
    <p>This window should close automatically.</p>
  </body>
</html>"#
    )
}
