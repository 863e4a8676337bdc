//! HTTP client for the backend proxy
//!
//! Uses gloo-net for browser fetch API

use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use playtogether_core::error::{ClassifiedError, PlayTogetherError, Result};
use playtogether_core::messages::*;
use playtogether_core::models::{AppDetails, OwnedGames, PlayerSummary, SteamFriend};
use playtogether_core::{classify, NetworkFailure, RawFailure, SteamApi};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// [`SteamApi`] over the backend's `/api/steam/*` routes
#[derive(Debug, Clone)]
pub struct ProxyClient {
    base: String,
}

impl ProxyClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let request = Request::post(&self.url(path))
            .json(body)
            .map_err(|e| PlayTogetherError::InvalidData(format!("Failed to serialize request: {}", e)))?;
        let response = request.send().await.map_err(network_error)?;
        check(response).await
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let response = Request::get(&self.url(path)).send().await.map_err(network_error)?;
        check(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.post(path, body).await?;
        parse(response).await
    }

    /// Steam sign-in URL; the backend parks the key in a cookie until Steam sends the user back
    pub async fn begin_auth(&self, api_key: &str, popup: bool) -> Result<String> {
        let request = AuthBeginRequest {
            api_key: api_key.to_string(),
            popup,
        };
        let response: AuthBeginResponse = self.post_json("/api/auth/steam", &request).await?;
        Ok(response.redirect_url)
    }

    pub async fn client_config(&self) -> Result<ClientConfig> {
        let response = self.get("/api/client-config").await?;
        parse(response).await
    }
}

/// fetch() itself failed: no response to classify
fn network_error(e: gloo_net::Error) -> PlayTogetherError {
    classify(&RawFailure::network(NetworkFailure::ConnectionRefused, e.to_string())).into()
}

/// Turn a non-2xx proxy answer back into the classified error the proxy sent
async fn check(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or(ErrorBody {
        error: format!("Request failed with status {}", status),
        retry_after: None,
    });
    Err(ClassifiedError::from_proxy_response(status, body).into())
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PlayTogetherError::InvalidData(format!("Failed to parse response: {}", e)))
}

#[async_trait(?Send)]
impl SteamApi for ProxyClient {
    async fn owned_games(&self, steam_id: &str, api_key: &str) -> Result<OwnedGames> {
        let request = SteamIdRequest {
            steam_id: steam_id.to_string(),
            api_key: api_key.to_string(),
        };
        let envelope: OwnedGamesEnvelope = self.post_json("/api/steam/owned-games", &request).await?;
        Ok(envelope.response.unwrap_or_default())
    }

    async fn friends_list(&self, steam_id: &str, api_key: &str) -> Result<Vec<SteamFriend>> {
        let request = SteamIdRequest {
            steam_id: steam_id.to_string(),
            api_key: api_key.to_string(),
        };
        let envelope: FriendListEnvelope = self.post_json("/api/steam/friends-list", &request).await?;
        Ok(envelope.friendslist.map(|list| list.friends).unwrap_or_default())
    }

    async fn player_summaries(&self, steam_ids: &[String], api_key: &str) -> Result<Vec<PlayerSummary>> {
        let request = PlayerSummariesRequest {
            steam_ids: steam_ids.to_vec(),
            api_key: api_key.to_string(),
        };
        let envelope: PlayerSummariesEnvelope = self.post_json("/api/steam/player-summaries", &request).await?;
        Ok(envelope.response.map(|list| list.players).unwrap_or_default())
    }

    async fn resolve_vanity(&self, vanity: &str, api_key: &str) -> Result<Option<String>> {
        let request = ResolveVanityRequest {
            vanity_url: vanity.to_string(),
            api_key: api_key.to_string(),
        };
        match self.post_json::<_, ResolveVanityResponse>("/api/steam/resolve-vanity", &request).await {
            Ok(resolved) => Ok(Some(resolved.steam_id)),
            Err(PlayTogetherError::Steam(e)) if e.status_code == 404 => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn app_details(&self, appid: u64) -> Result<Option<AppDetails>> {
        let response = self
            .get(&format!("/api/steam/app-details?appId={}", appid))
            .await?;
        let mut body: serde_json::Value = parse(response).await?;
        let Some(entry) = body.get_mut(appid.to_string()).map(serde_json::Value::take) else {
            return Ok(None);
        };
        let details: AppDetails = serde_json::from_value(entry)?;
        Ok(details.success.then_some(details))
    }

    async fn validate_api_key(&self, api_key: &str) -> Result<bool> {
        let request = ValidateKeyRequest {
            api_key: api_key.to_string(),
        };
        let response: ValidateKeyResponse = self.post_json("/api/steam/validate", &request).await?;
        Ok(response.valid)
    }

    async fn profile_visibility(&self, steam_id: &str, api_key: &str) -> Result<bool> {
        let request = SteamIdRequest {
            steam_id: steam_id.to_string(),
            api_key: api_key.to_string(),
        };
        let response: ProfileVisibilityResponse =
            self.post_json("/api/steam/profile-visibility", &request).await?;
        Ok(response.is_public)
    }

    async fn common_games(
        &self,
        user_steam_id: &str,
        friend_steam_ids: &[String],
        api_key: &str,
    ) -> Result<CommonGamesResult> {
        let request = CommonGamesRequest {
            user_steam_id: user_steam_id.to_string(),
            friend_steam_ids: Some(friend_steam_ids.to_vec()),
            api_key: api_key.to_string(),
        };
        self.post_json("/api/steam/common-games", &request).await
    }
}
