//! Steam Web API calls from the backend
//!
//! Every call goes through [`SteamClient::get_json`], which turns a failed
//! request into a classified error and logs it once. Pass-through endpoints
//! use the raw `*_json` fetchers; the resolver and the identity handshake use
//! the typed [`SteamApi`] implementation.

use async_trait::async_trait;
use playtogether_core::error::{ClassifiedError, ErrorKind, Result};
use playtogether_core::messages::{
    CommonGamesResult, FriendListEnvelope, OwnedGamesEnvelope, PlayerSummariesEnvelope, VanityEnvelope,
};
use playtogether_core::models::{AppDetails, OwnedGames, PlayerSummary, SteamFriend};
use playtogether_core::{classify, log_steam_error, resolve_common_games, NetworkFailure, RawFailure, SteamApi};
use serde_json::Value;

const API_OWNED_GAMES: &str = "/IPlayerService/GetOwnedGames/v0001/";
const API_FRIEND_LIST: &str = "/ISteamUser/GetFriendList/v0001/";
const API_PLAYER_SUMMARIES: &str = "/ISteamUser/GetPlayerSummaries/v0002/";
const API_RESOLVE_VANITY: &str = "/ISteamUser/ResolveVanityURL/v0001/";
const STORE_APP_DETAILS: &str = "/api/appdetails";

/// Long-lived public profile used to test whether a key works
pub const KEY_CHECK_STEAM_ID: &str = "76561197960287930";

#[derive(Clone)]
pub struct SteamClient {
    http: reqwest::Client,
    api_base: String,
    store_base: String,
}

impl SteamClient {
    pub fn new(api_base: impl Into<String>, store_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            store_base: store_base.into(),
        }
    }

    /// GET a Steam URL and parse the body as JSON.
    ///
    /// Non-2xx answers, transport errors and non-JSON bodies (Steam's HTML
    /// error pages) all come back classified.
    async fn get_json(&self, endpoint: &str, url: &str) -> std::result::Result<Value, ClassifiedError> {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Err(fail(endpoint, transport_failure(e))),
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| fail(endpoint, transport_failure(e)))?;

        if !status.is_success() {
            let mut failure = RawFailure::http(status.as_u16(), body);
            if let Some(wait) = retry_after {
                failure = failure.with_header("retry-after", wait);
            }
            return Err(fail(endpoint, failure));
        }

        serde_json::from_str(&body).map_err(|e| {
            let failure = RawFailure {
                status: Some(status.as_u16()),
                body: Some(body),
                message: Some(format!("Unreadable Steam response: {}", e)),
                ..Default::default()
            };
            fail(endpoint, failure)
        })
    }

    // ========================================================================
    // Raw pass-through fetchers
    // ========================================================================

    pub async fn owned_games_json(&self, steam_id: &str, api_key: &str) -> std::result::Result<Value, ClassifiedError> {
        let url = format!(
            "{}{}?key={}&steamid={}&format=json&include_appinfo=true&include_played_free_games=true",
            self.api_base,
            API_OWNED_GAMES,
            urlencoding::encode(api_key),
            urlencoding::encode(steam_id)
        );
        self.get_json("GetOwnedGames", &url).await
    }

    pub async fn friends_list_json(&self, steam_id: &str, api_key: &str) -> std::result::Result<Value, ClassifiedError> {
        let url = format!(
            "{}{}?key={}&steamid={}&relationship=friend",
            self.api_base,
            API_FRIEND_LIST,
            urlencoding::encode(api_key),
            urlencoding::encode(steam_id)
        );
        self.get_json("GetFriendList", &url).await
    }

    pub async fn player_summaries_json(
        &self,
        steam_ids: &[String],
        api_key: &str,
    ) -> std::result::Result<Value, ClassifiedError> {
        let url = format!(
            "{}{}?key={}&steamids={}",
            self.api_base,
            API_PLAYER_SUMMARIES,
            urlencoding::encode(api_key),
            urlencoding::encode(&steam_ids.join(","))
        );
        self.get_json("GetPlayerSummaries", &url).await
    }

    pub async fn resolve_vanity_json(&self, vanity: &str, api_key: &str) -> std::result::Result<Value, ClassifiedError> {
        let url = format!(
            "{}{}?key={}&vanityurl={}",
            self.api_base,
            API_RESOLVE_VANITY,
            urlencoding::encode(api_key),
            urlencoding::encode(vanity)
        );
        self.get_json("ResolveVanityURL", &url).await
    }

    pub async fn app_details_json(&self, appid: &str) -> std::result::Result<Value, ClassifiedError> {
        let url = format!(
            "{}{}?appids={}",
            self.store_base,
            STORE_APP_DETAILS,
            urlencoding::encode(appid)
        );
        self.get_json("AppDetails", &url).await
    }

    /// Whether the key can read a known public profile; 401/403 come back as errors
    pub async fn check_api_key(&self, api_key: &str) -> std::result::Result<bool, ClassifiedError> {
        let body = self
            .player_summaries_json(&[KEY_CHECK_STEAM_ID.to_string()], api_key)
            .await?;
        let players = parse::<PlayerSummariesEnvelope>(body)?
            .response
            .map(|list| list.players)
            .unwrap_or_default();
        Ok(!players.is_empty())
    }
}

fn transport_failure(e: reqwest::Error) -> RawFailure {
    // The request URL carries the API key
    let e = e.without_url();
    if e.is_connect() {
        let kind = if is_dns_failure(&e) {
            NetworkFailure::DnsFailure
        } else {
            NetworkFailure::ConnectionRefused
        };
        RawFailure::network(kind, e.to_string())
    } else {
        RawFailure {
            message: Some(e.to_string()),
            ..Default::default()
        }
    }
}

/// hyper's resolver reports lookup failures as "dns error: ..." somewhere down the source chain
fn is_dns_failure(e: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if err.to_string().to_ascii_lowercase().contains("dns error") {
            return true;
        }
        source = err.source();
    }
    false
}

fn fail(endpoint: &str, failure: RawFailure) -> ClassifiedError {
    let classified = classify(&failure);
    log_steam_error(endpoint, &failure, &classified);
    classified
}

fn parse<T: serde::de::DeserializeOwned>(body: Value) -> std::result::Result<T, ClassifiedError> {
    serde_json::from_value(body).map_err(|e| {
        classify(&RawFailure {
            message: Some(format!("Unexpected Steam response shape: {}", e)),
            ..Default::default()
        })
    })
}

#[async_trait]
impl SteamApi for SteamClient {
    async fn owned_games(&self, steam_id: &str, api_key: &str) -> Result<OwnedGames> {
        let body = self.owned_games_json(steam_id, api_key).await?;
        Ok(parse::<OwnedGamesEnvelope>(body)?.response.unwrap_or_default())
    }

    async fn friends_list(&self, steam_id: &str, api_key: &str) -> Result<Vec<SteamFriend>> {
        let body = self.friends_list_json(steam_id, api_key).await?;
        Ok(parse::<FriendListEnvelope>(body)?
            .friendslist
            .map(|list| list.friends)
            .unwrap_or_default())
    }

    async fn player_summaries(&self, steam_ids: &[String], api_key: &str) -> Result<Vec<PlayerSummary>> {
        let body = self.player_summaries_json(steam_ids, api_key).await?;
        Ok(parse::<PlayerSummariesEnvelope>(body)?
            .response
            .map(|list| list.players)
            .unwrap_or_default())
    }

    async fn resolve_vanity(&self, vanity: &str, api_key: &str) -> Result<Option<String>> {
        let body = self.resolve_vanity_json(vanity, api_key).await?;
        Ok(parse::<VanityEnvelope>(body)?.steam_id())
    }

    async fn app_details(&self, appid: u64) -> Result<Option<AppDetails>> {
        let mut body = self.app_details_json(&appid.to_string()).await?;
        // Keyed by appid: {"440": {"success": true, "data": {...}}}
        let Some(entry) = body.get_mut(appid.to_string()).map(Value::take) else {
            return Ok(None);
        };
        let details: AppDetails = parse(entry)?;
        Ok(details.success.then_some(details))
    }

    async fn validate_api_key(&self, api_key: &str) -> Result<bool> {
        match self.check_api_key(api_key).await {
            Ok(valid) => Ok(valid),
            Err(e) if matches!(e.kind, ErrorKind::Unauthorized | ErrorKind::Forbidden) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn profile_visibility(&self, steam_id: &str, api_key: &str) -> Result<bool> {
        match self.owned_games(steam_id, api_key).await {
            Ok(owned) => Ok(!owned.is_private()),
            Err(e) if e.classified().is_some_and(|c| c.kind == ErrorKind::Forbidden) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn common_games(
        &self,
        user_steam_id: &str,
        friend_steam_ids: &[String],
        api_key: &str,
    ) -> Result<CommonGamesResult> {
        resolve_common_games(self, user_steam_id, friend_steam_ids, api_key).await
    }
}
