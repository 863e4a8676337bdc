//! Request/response bodies exchanged between the browser client and the proxy,
//! plus the Steam response envelopes the proxy unwraps

use serde::{Deserialize, Serialize};
use crate::models::*;

// ============================================================================
// Client -> proxy
// ============================================================================

/// Body of the single-identity endpoints (owned games, friends list, visibility)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteamIdRequest {
    #[serde(default)]
    pub steam_id: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummariesRequest {
    #[serde(default)]
    pub steam_ids: Vec<String>,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveVanityRequest {
    #[serde(default)]
    pub vanity_url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyRequest {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonGamesRequest {
    #[serde(default)]
    pub user_steam_id: String,
    #[serde(default)]
    pub friend_steam_ids: Option<Vec<String>>,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthBeginRequest {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub popup: bool,
}

// ============================================================================
// Proxy -> client
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveVanityResponse {
    pub steam_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileVisibilityResponse {
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthBeginResponse {
    pub redirect_url: String,
}

/// Environment-supplied settings the browser client needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub app_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtm_id: Option<String>,
}

/// Outcome of a common-games resolve
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonGamesResult {
    pub common_games: Vec<Game>,
    #[serde(default)]
    pub public_friends: Vec<String>,
    #[serde(default)]
    pub private_friends: Vec<String>,
    #[serde(default)]
    pub message: String,
}

/// Error body of every failed proxy call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

// ============================================================================
// Steam response envelopes
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnedGamesEnvelope {
    #[serde(default)]
    pub response: Option<OwnedGames>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendList {
    #[serde(default)]
    pub friends: Vec<SteamFriend>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendListEnvelope {
    #[serde(default)]
    pub friendslist: Option<FriendList>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerList {
    #[serde(default)]
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSummariesEnvelope {
    #[serde(default)]
    pub response: Option<PlayerList>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VanityResolution {
    #[serde(default)]
    pub success: i64,
    #[serde(default)]
    pub steamid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VanityEnvelope {
    #[serde(default)]
    pub response: Option<VanityResolution>,
}

impl VanityEnvelope {
    /// Steam reports success as the integer 1
    pub fn steam_id(self) -> Option<String> {
        self.response
            .filter(|r| r.success == 1)
            .and_then(|r| r.steamid)
    }
}
