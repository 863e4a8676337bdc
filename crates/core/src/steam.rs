//! The Steam operations the resolver and the controllers depend on.
//!
//! Implemented by the backend against Steam directly and by the browser
//! client against the backend proxy.

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::CommonGamesResult;
use crate::models::{AppDetails, OwnedGames, PlayerSummary, SteamFriend};

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait SteamApi {
    /// GetOwnedGames `response` object for one identity
    async fn owned_games(&self, steam_id: &str, api_key: &str) -> Result<OwnedGames>;

    async fn friends_list(&self, steam_id: &str, api_key: &str) -> Result<Vec<SteamFriend>>;

    async fn player_summaries(&self, steam_ids: &[String], api_key: &str) -> Result<Vec<PlayerSummary>>;

    /// `None` when Steam has no account under that vanity name
    async fn resolve_vanity(&self, vanity: &str, api_key: &str) -> Result<Option<String>>;

    async fn app_details(&self, appid: u64) -> Result<Option<AppDetails>>;

    async fn validate_api_key(&self, api_key: &str) -> Result<bool>;

    async fn profile_visibility(&self, steam_id: &str, api_key: &str) -> Result<bool>;

    async fn common_games(
        &self,
        user_steam_id: &str,
        friend_steam_ids: &[String],
        api_key: &str,
    ) -> Result<CommonGamesResult>;
}
