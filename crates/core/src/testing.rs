//! Scripted Steam fake shared by the unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::classify::{classify, RawFailure};
use crate::error::{PlayTogetherError, Result};
use crate::messages::CommonGamesResult;
use crate::models::*;
use crate::steam::SteamApi;
use crate::controllers::ThemeEnvironment;

pub fn game(appid: u64, name: &str) -> Game {
    Game::new(appid, name)
}

pub fn rate_limited(retry_after: u64) -> RawFailure {
    RawFailure::http(429, "").with_header("retry-after", retry_after.to_string())
}

enum Library {
    Games(Vec<Game>),
    Private,
    Failure(RawFailure),
}

#[derive(Default)]
struct Script {
    libraries: HashMap<String, Library>,
    summaries: HashMap<String, PlayerSummary>,
    friends: Vec<SteamFriend>,
    vanity: HashMap<String, String>,
    calls: Vec<String>,
}

/// Steam fake driven by a script. Clones share the script and the call log.
#[derive(Clone, Default)]
pub struct ScriptedSteam {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSteam {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn library(self, steam_id: &str, games: Vec<Game>) -> Self {
        self.set_library(steam_id, games);
        self
    }

    pub fn private(self, steam_id: &str) -> Self {
        self.script().libraries.insert(steam_id.to_string(), Library::Private);
        self
    }

    pub fn failure(self, steam_id: &str, failure: RawFailure) -> Self {
        self.set_failure(steam_id, failure);
        self
    }

    pub fn player(self, steam_id: &str, name: &str) -> Self {
        self.script().summaries.insert(
            steam_id.to_string(),
            PlayerSummary {
                steamid: steam_id.to_string(),
                personaname: Some(name.to_string()),
                avatar: Some(format!("https://avatars.example/{}.jpg", steam_id)),
                avatarmedium: None,
                avatarfull: None,
            },
        );
        self
    }

    pub fn steam_friend(self, steam_id: &str) -> Self {
        self.script().friends.push(SteamFriend {
            steamid: steam_id.to_string(),
            relationship: "friend".to_string(),
            friend_since: 0,
        });
        self
    }

    pub fn vanity(self, name: &str, steam_id: &str) -> Self {
        self.script().vanity.insert(name.to_string(), steam_id.to_string());
        self
    }

    pub fn set_library(&self, steam_id: &str, games: Vec<Game>) {
        self.script().libraries.insert(steam_id.to_string(), Library::Games(games));
    }

    pub fn set_failure(&self, steam_id: &str, failure: RawFailure) {
        self.script().libraries.insert(steam_id.to_string(), Library::Failure(failure));
    }

    fn record(&self, call: String) {
        self.script().calls.push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.script().calls.clear();
    }

    pub fn owned_games_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("owned_games:").map(String::from))
            .collect()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl SteamApi for ScriptedSteam {
    async fn owned_games(&self, steam_id: &str, _api_key: &str) -> Result<OwnedGames> {
        self.record(format!("owned_games:{}", steam_id));
        match self.script().libraries.get(steam_id) {
            Some(Library::Games(games)) => Ok(OwnedGames {
                game_count: Some(games.len() as u32),
                games: Some(games.clone()),
            }),
            Some(Library::Private) | None => Ok(OwnedGames::default()),
            Some(Library::Failure(failure)) => Err(classify(failure).into()),
        }
    }

    async fn friends_list(&self, steam_id: &str, _api_key: &str) -> Result<Vec<SteamFriend>> {
        self.record(format!("friends_list:{}", steam_id));
        Ok(self.script().friends.clone())
    }

    async fn player_summaries(&self, steam_ids: &[String], _api_key: &str) -> Result<Vec<PlayerSummary>> {
        self.record(format!("player_summaries:{}", steam_ids.len()));
        let script = self.script();
        Ok(steam_ids
            .iter()
            .filter_map(|id| script.summaries.get(id).cloned())
            .collect())
    }

    async fn resolve_vanity(&self, vanity: &str, _api_key: &str) -> Result<Option<String>> {
        self.record(format!("resolve_vanity:{}", vanity));
        Ok(self.script().vanity.get(vanity).cloned())
    }

    async fn app_details(&self, appid: u64) -> Result<Option<AppDetails>> {
        self.record(format!("app_details:{}", appid));
        Ok(None)
    }

    async fn validate_api_key(&self, api_key: &str) -> Result<bool> {
        self.record("validate_api_key".to_string());
        Ok(!api_key.is_empty())
    }

    async fn profile_visibility(&self, steam_id: &str, _api_key: &str) -> Result<bool> {
        self.record(format!("profile_visibility:{}", steam_id));
        match self.script().libraries.get(steam_id) {
            Some(Library::Games(_)) => Ok(true),
            Some(Library::Failure(failure)) => Err(PlayTogetherError::Steam(classify(failure))),
            _ => Ok(false),
        }
    }

    async fn common_games(
        &self,
        user_steam_id: &str,
        friend_steam_ids: &[String],
        api_key: &str,
    ) -> Result<CommonGamesResult> {
        crate::resolver::resolve_common_games(self, user_steam_id, friend_steam_ids, api_key).await
    }
}

/// Theme environment that records what it was told
#[derive(Debug, Default)]
pub struct FakeTheme {
    pub dark: bool,
    pub system_dark: bool,
    pub watching: bool,
}

impl ThemeEnvironment for FakeTheme {
    fn set_dark(&mut self, dark: bool) {
        self.dark = dark;
    }

    fn system_prefers_dark(&self) -> bool {
        self.system_dark
    }

    fn watch_system_preference(&mut self) {
        self.watching = true;
    }

    fn unwatch_system_preference(&mut self) {
        self.watching = false;
    }
}
