//! Saved comparison friends, Steam friend import and common-games results.
//!
//! Visibility history lives here. It is seeded from the common-games
//! snapshot, updated by probes and resolves, and merged into every new
//! snapshot, so invalidating common games never forgets who was private.

use std::collections::HashSet;

use serde::Serialize;

use crate::cache::{
    merge_visibility, CacheDomain, Clock, CommonGamesSnapshot, FriendsSnapshot, KeyValueStore,
    SnapshotCache, VisibilityPartitions,
};
use crate::error::{PlayTogetherError, Result};
use crate::models::{Credentials, Friend, Game, Visibility};
use crate::steam::SteamApi;
use crate::table::matches_search;

use super::LoadPhase;

/// GetPlayerSummaries accepts at most this many ids per call
const SUMMARY_BATCH_SIZE: usize = 100;

fn search_key(steam_id: &str) -> String {
    format!("play-together-search-{}", steam_id)
}

fn selected_key(steam_id: &str) -> String {
    format!("play-together-selected-{}", steam_id)
}

/// Counts reported after a common-games search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonGamesSummary {
    pub games_count: usize,
    pub public_friends_count: usize,
    pub private_friends_count: usize,
    pub message: String,
}

impl CommonGamesSummary {
    /// One-line outcome for a notification
    pub fn notice(&self) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        let have = |n: usize| if n == 1 { " has" } else { "s have" };
        let (games, public, private) = (
            self.games_count,
            self.public_friends_count,
            self.private_friends_count,
        );

        if games > 0 {
            let found = format!(
                "Found {} games you can play together with {} friend{}!",
                games,
                public,
                plural(public)
            );
            if private > 0 {
                format!(
                    "{} Note: {} friend{} private profiles and couldn't be included.",
                    found,
                    private,
                    have(private)
                )
            } else {
                found
            }
        } else if private > 0 && public == 0 {
            format!(
                "All {} friend{} private Steam profiles. Ask them to make their game details public to find common games.",
                private,
                have(private)
            )
        } else if public > 0 && private > 0 {
            format!(
                "No common games found with {} public friend{}. {} friend{} private profiles and couldn't be included.",
                public,
                plural(public),
                private,
                have(private)
            )
        } else if public > 0 {
            format!("No common games found with {} friend{}.", public, plural(public))
        } else {
            "No common games found.".to_string()
        }
    }
}

/// Current members split by last known visibility
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilitySummary {
    pub public: Vec<Friend>,
    pub private: Vec<Friend>,
}

impl VisibilitySummary {
    /// "Games found with N friends: …" and "N friends couldn't be included …", when non-empty
    pub fn lines(&self) -> Vec<String> {
        let names = |friends: &[Friend]| {
            friends
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let plural = |n: usize| if n == 1 { "" } else { "s" };

        let mut lines = Vec::new();
        if !self.public.is_empty() {
            let n = self.public.len();
            lines.push(format!(
                "Games found with {} friend{}: {}",
                n,
                plural(n),
                names(&self.public)
            ));
        }
        if !self.private.is_empty() {
            let n = self.private.len();
            lines.push(format!(
                "{} friend{} couldn't be included (private profile{}): {}",
                n,
                plural(n),
                plural(n),
                names(&self.private)
            ));
        }
        lines
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsState {
    pub friends: Vec<Friend>,
    pub friends_phase: LoadPhase,
    pub available_steam_friends: Vec<Friend>,
    pub steam_friends_loaded: bool,
    pub common_games: Vec<Game>,
    pub filtered_common_games: Vec<Game>,
    pub common_games_phase: LoadPhase,
    pub visibility: VisibilitySummary,
    pub search_term: String,
    pub selected: Vec<String>,
    pub last_friends_update: Option<i64>,
    pub last_steam_friends_update: Option<i64>,
    pub last_common_games_update: Option<i64>,
}

pub struct FriendsController<P, S, C> {
    api: P,
    store: S,
    friends_cache: SnapshotCache<FriendsSnapshot, S, C>,
    common_cache: SnapshotCache<CommonGamesSnapshot, S, C>,
    credentials: Option<Credentials>,

    friends: Vec<Friend>,
    friends_phase: LoadPhase,
    last_friends_update: Option<i64>,

    steam_friends: Vec<Friend>,
    steam_friends_loaded: bool,
    last_steam_friends_update: Option<i64>,

    common_games: Vec<Game>,
    common_query: Vec<String>,
    common_phase: LoadPhase,
    last_common_update: Option<i64>,

    history: VisibilityPartitions,
    search_term: String,
    selected: Vec<String>,
}

impl<P, S, C> FriendsController<P, S, C>
where
    P: SteamApi,
    S: KeyValueStore + Clone,
    C: Clock + Clone,
{
    pub fn new(api: P, store: S, clock: C) -> Self {
        Self {
            api,
            friends_cache: SnapshotCache::new(CacheDomain::Friends, store.clone(), clock.clone()),
            common_cache: SnapshotCache::new(CacheDomain::CommonGames, store.clone(), clock),
            store,
            credentials: None,
            friends: Vec::new(),
            friends_phase: LoadPhase::Uninitialized,
            last_friends_update: None,
            steam_friends: Vec::new(),
            steam_friends_loaded: false,
            last_steam_friends_update: None,
            common_games: Vec::new(),
            common_query: Vec::new(),
            common_phase: LoadPhase::Uninitialized,
            last_common_update: None,
            history: VisibilityPartitions::default(),
            search_term: String::new(),
            selected: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn friends_phase(&self) -> LoadPhase {
        self.friends_phase
    }

    pub fn steam_friends(&self) -> &[Friend] {
        &self.steam_friends
    }

    pub fn common_games(&self) -> &[Game] {
        &self.common_games
    }

    pub fn common_games_phase(&self) -> LoadPhase {
        self.common_phase
    }

    /// Friend ids the current common games were resolved for
    pub fn common_query(&self) -> &[String] {
        &self.common_query
    }

    /// Common games narrowed by the saved search term
    pub fn filtered_common_games(&self) -> Vec<Game> {
        self.common_games
            .iter()
            .filter(|g| matches_search(g, &self.search_term))
            .cloned()
            .collect()
    }

    /// Steam friends not yet in the comparison list, by name
    pub fn available_steam_friends(&self) -> Vec<Friend> {
        let added: HashSet<&str> = self.friends.iter().map(|f| f.steam_id.as_str()).collect();
        let mut available: Vec<Friend> = self
            .steam_friends
            .iter()
            .filter(|f| !added.contains(f.steam_id.as_str()))
            .cloned()
            .collect();
        available.sort_by_key(|f| f.name.to_lowercase());
        available
    }

    pub fn visibility(&self, steam_id: &str) -> Visibility {
        if self.history.public.iter().any(|id| id == steam_id) {
            Visibility::Public
        } else if self.history.private.iter().any(|id| id == steam_id) {
            Visibility::Private
        } else {
            Visibility::Unknown
        }
    }

    /// Visibility history restricted to current members
    pub fn current_partitions(&self) -> VisibilityPartitions {
        let members: HashSet<&str> = self.friends.iter().map(|f| f.steam_id.as_str()).collect();
        let keep = |ids: &[String]| -> Vec<String> {
            ids.iter()
                .filter(|id| members.contains(id.as_str()))
                .cloned()
                .collect()
        };
        VisibilityPartitions {
            public: keep(&self.history.public),
            private: keep(&self.history.private),
        }
    }

    pub fn visibility_summary(&self) -> VisibilitySummary {
        let partitions = self.current_partitions();
        let lookup = |ids: &[String]| -> Vec<Friend> {
            ids.iter()
                .filter_map(|id| self.friends.iter().find(|f| &f.steam_id == id).cloned())
                .collect()
        };
        VisibilitySummary {
            public: lookup(&partitions.public),
            private: lookup(&partitions.private),
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn state(&self) -> FriendsState {
        FriendsState {
            friends: self.friends.clone(),
            friends_phase: self.friends_phase,
            available_steam_friends: self.available_steam_friends(),
            steam_friends_loaded: self.steam_friends_loaded,
            common_games: self.common_games.clone(),
            filtered_common_games: self.filtered_common_games(),
            common_games_phase: self.common_phase,
            visibility: self.visibility_summary(),
            search_term: self.search_term.clone(),
            selected: self.selected.clone(),
            last_friends_update: self.last_friends_update,
            last_steam_friends_update: self.last_steam_friends_update,
            last_common_games_update: self.last_common_update,
        }
    }

    // ========================================================================
    // Cache and preferences
    // ========================================================================

    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        let previous = self.credentials.as_ref().map(|c| c.steam_id.clone());
        let next = credentials.as_ref().map(|c| c.steam_id.clone());
        self.credentials = credentials;
        if previous != next {
            self.friends.clear();
            self.friends_phase = LoadPhase::Uninitialized;
            self.last_friends_update = None;
            self.steam_friends.clear();
            self.steam_friends_loaded = false;
            self.last_steam_friends_update = None;
            self.reset_common_games();
            self.history = VisibilityPartitions::default();
            self.search_term.clear();
            self.selected.clear();
        }
    }

    fn owner(&self) -> Option<String> {
        self.credentials.as_ref().map(|c| c.steam_id.clone())
    }

    fn require_api_key(&self, message: &str) -> Result<Credentials> {
        self.credentials
            .clone()
            .ok_or_else(|| PlayTogetherError::Precondition(message.to_string()))
    }

    /// Restore saved friends, common games, visibility history and view preferences
    pub fn check_cache(&mut self) {
        let Some(owner) = self.owner() else {
            self.friends_phase = LoadPhase::Empty;
            self.common_phase = LoadPhase::Empty;
            return;
        };

        match self.friends_cache.read(&owner) {
            Some(snapshot) => {
                self.friends = snapshot.friends;
                self.last_friends_update = Some(snapshot.timestamp);
                self.friends_phase = LoadPhase::Fresh;
            }
            None => {
                self.friends.clear();
                self.last_friends_update = None;
                self.friends_phase = LoadPhase::Empty;
            }
        }

        match self.common_cache.read(&owner) {
            Some(snapshot) => {
                self.common_games = snapshot.common_games;
                self.common_query = snapshot.friend_ids;
                self.history = VisibilityPartitions {
                    public: snapshot.public_friends,
                    private: snapshot.private_friends,
                };
                self.last_common_update = Some(snapshot.timestamp);
                self.common_phase = LoadPhase::Fresh;
            }
            None => self.reset_common_games(),
        }

        self.search_term = self.read_preference(&search_key(&owner)).unwrap_or_default();
        self.selected = self.read_preference(&selected_key(&owner)).unwrap_or_default();
    }

    fn read_preference<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key).ok()??;
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(key = %key, error = %e, "Ignoring unreadable preference"))
            .ok()
    }

    fn write_preference<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(PlayTogetherError::from)
            .and_then(|json| self.store.set(key, &json));
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Failed to save preference");
        }
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
        if let Some(owner) = self.owner() {
            self.write_preference(&search_key(&owner), &self.search_term);
        }
    }

    /// Steam friends picked for adding; ids no longer available are dropped
    pub fn set_selected(&mut self, ids: Vec<String>) {
        self.selected = ids;
        self.prune_selection();
    }

    fn prune_selection(&mut self) {
        let available: HashSet<String> = self
            .available_steam_friends()
            .into_iter()
            .map(|f| f.steam_id)
            .collect();
        // Until the Steam friend list is fetched nothing is known to be unavailable
        if self.steam_friends_loaded {
            self.selected.retain(|id| available.contains(id));
        }
        if let Some(owner) = self.owner() {
            self.write_preference(&selected_key(&owner), &self.selected);
        }
    }

    fn save_friends(&mut self) {
        let Some(owner) = self.owner() else {
            return;
        };
        let timestamp = self.friends_cache.now();
        self.friends_cache.write(
            &owner,
            &FriendsSnapshot {
                steam_id: owner.clone(),
                friends: self.friends.clone(),
                timestamp,
            },
        );
        self.last_friends_update = Some(timestamp);
        self.friends_phase = LoadPhase::Fresh;
    }

    fn reset_common_games(&mut self) {
        self.common_games.clear();
        self.common_query.clear();
        self.common_phase = LoadPhase::Empty;
        self.last_common_update = None;
    }

    /// Membership changed: the last result no longer answers the question
    fn invalidate_common_games(&mut self) {
        if let Some(owner) = self.owner() {
            self.common_cache.invalidate(&owner);
        }
        self.reset_common_games();
    }

    /// Forget saved friends and view preferences
    pub fn clear_friends_cache(&mut self) {
        if let Some(owner) = self.owner() {
            self.friends_cache.invalidate(&owner);
            for key in [search_key(&owner), selected_key(&owner)] {
                if let Err(e) = self.store.remove(&key) {
                    tracing::warn!(key = %key, error = %e, "Failed to remove preference");
                }
            }
        }
        self.friends.clear();
        self.friends_phase = LoadPhase::Empty;
        self.last_friends_update = None;
        self.search_term.clear();
        self.selected.clear();
    }

    /// Forget common games together with the visibility history
    pub fn clear_common_games_cache(&mut self) {
        self.invalidate_common_games();
        self.history = VisibilityPartitions::default();
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Add a friend by Steam ID or vanity name
    pub async fn add_friend(&mut self, input: &str, name: Option<String>) -> Result<Friend> {
        let credentials = self.require_api_key("Steam API key is required")?;
        let input = input.trim();
        if input.is_empty() {
            return Err(PlayTogetherError::InvalidInput(
                "Enter a Steam ID or username".to_string(),
            ));
        }
        if self.is_member(input) {
            return Err(already_added());
        }

        let steam_id = if input.chars().all(|c| c.is_ascii_digit()) {
            input.to_string()
        } else {
            self.api
                .resolve_vanity(input, &credentials.api_key)
                .await?
                .ok_or_else(|| {
                    PlayTogetherError::InvalidInput(
                        "Could not find Steam ID for this username".to_string(),
                    )
                })?
        };
        if self.is_member(&steam_id) {
            return Err(already_added());
        }

        let summaries = self
            .api
            .player_summaries(std::slice::from_ref(&steam_id), &credentials.api_key)
            .await?;
        let summary = summaries.into_iter().find(|p| p.steamid == steam_id);

        let friend = Friend {
            name: name
                .filter(|n| !n.is_empty())
                .or_else(|| summary.as_ref().map(|s| s.display_name()))
                .unwrap_or_else(|| format!("User {}", steam_id)),
            avatar: summary.and_then(|s| s.avatar),
            steam_id,
        };
        tracing::info!(steam_id = %friend.steam_id, "Added friend");

        self.friends.push(friend.clone());
        self.save_friends();
        self.invalidate_common_games();
        self.prune_selection();
        Ok(friend)
    }

    fn is_member(&self, steam_id: &str) -> bool {
        self.friends.iter().any(|f| f.steam_id == steam_id)
    }

    /// Fetch the user's Steam friend list with names and avatars. Returns how many were found.
    pub async fn load_steam_friends(&mut self) -> Result<usize> {
        let credentials = self.require_api_key("Please configure your Steam settings first")?;
        let list = self
            .api
            .friends_list(&credentials.steam_id, &credentials.api_key)
            .await?;
        if list.is_empty() {
            return Err(PlayTogetherError::Precondition(
                "No friends found on your Steam friends list".to_string(),
            ));
        }

        let ids: Vec<String> = list.into_iter().map(|f| f.steamid).collect();
        let mut loaded = Vec::with_capacity(ids.len());
        for batch in ids.chunks(SUMMARY_BATCH_SIZE) {
            let summaries = self.api.player_summaries(batch, &credentials.api_key).await?;
            loaded.extend(summaries.iter().map(Friend::from_summary));
        }
        tracing::info!(count = loaded.len(), "Loaded Steam friends");

        let count = loaded.len();
        self.steam_friends = loaded;
        self.steam_friends_loaded = true;
        self.last_steam_friends_update = Some(self.friends_cache.now());
        self.prune_selection();
        Ok(count)
    }

    /// Move the chosen Steam friends into the comparison list. Returns how many were added.
    pub fn add_selected_steam_friends(&mut self, steam_ids: &[String]) -> usize {
        let wanted: HashSet<&str> = steam_ids.iter().map(String::as_str).collect();
        let new_friends: Vec<Friend> = self
            .steam_friends
            .iter()
            .filter(|f| wanted.contains(f.steam_id.as_str()) && !self.is_member(&f.steam_id))
            .cloned()
            .collect();
        let added = new_friends.len();

        self.friends.extend(new_friends);
        self.save_friends();
        self.invalidate_common_games();
        self.prune_selection();
        added
    }

    pub fn remove_friend(&mut self, steam_id: &str) {
        self.friends.retain(|f| f.steam_id != steam_id);
        self.save_friends();
        self.invalidate_common_games();
        self.prune_selection();
    }

    pub fn remove_all_friends(&mut self) {
        self.friends.clear();
        self.save_friends();
        self.invalidate_common_games();
        self.prune_selection();
    }

    pub fn clear_steam_friends(&mut self) {
        self.steam_friends.clear();
        self.steam_friends_loaded = false;
        self.last_steam_friends_update = None;
    }

    // ========================================================================
    // Common games and visibility
    // ========================================================================

    /// Resolve common games with `subset` of the saved friends, or all of them
    pub async fn find_common_games(&mut self, subset: Option<&[String]>) -> Result<CommonGamesSummary> {
        let credentials = self.require_api_key("Steam API key and Steam ID are required")?;
        let friend_ids: Vec<String> = match subset {
            Some(ids) => self
                .friends
                .iter()
                .filter(|f| ids.contains(&f.steam_id))
                .map(|f| f.steam_id.clone())
                .collect(),
            None => self.friends.iter().map(|f| f.steam_id.clone()).collect(),
        };
        if friend_ids.is_empty() {
            return Err(PlayTogetherError::Precondition(
                "Add some friends first to find common games".to_string(),
            ));
        }

        let previous_phase = self.common_phase;
        self.common_phase = LoadPhase::Loading;
        let result = match self
            .api
            .common_games(&credentials.steam_id, &friend_ids, &credentials.api_key)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to find common games");
                self.common_phase = if previous_phase.has_data() {
                    LoadPhase::Stale
                } else {
                    LoadPhase::Empty
                };
                return Err(e);
            }
        };

        let latest = VisibilityPartitions {
            public: result.public_friends.clone(),
            private: result.private_friends.clone(),
        };
        self.history = merge_visibility(&self.history, &friend_ids, &latest);

        let timestamp = self.common_cache.now();
        self.common_cache.write(
            &credentials.steam_id,
            &CommonGamesSnapshot {
                steam_id: credentials.steam_id.clone(),
                common_games: result.common_games.clone(),
                friend_ids: friend_ids.clone(),
                public_friends: self.history.public.clone(),
                private_friends: self.history.private.clone(),
                timestamp,
            },
        );

        let summary = CommonGamesSummary {
            games_count: result.common_games.len(),
            public_friends_count: result.public_friends.len(),
            private_friends_count: result.private_friends.len(),
            message: result.message,
        };
        self.common_games = result.common_games;
        self.common_query = friend_ids;
        self.last_common_update = Some(timestamp);
        self.common_phase = LoadPhase::Fresh;
        Ok(summary)
    }

    /// Ask Steam whether `steam_id`'s library is visible and remember the answer
    pub async fn probe_visibility(&mut self, steam_id: &str) -> Result<Visibility> {
        let credentials = self.require_api_key("Steam API key is required")?;
        let is_public = self
            .api
            .profile_visibility(steam_id, &credentials.api_key)
            .await?;
        let visibility = Visibility::from_public(is_public);
        self.record_visibility(steam_id, visibility);
        Ok(visibility)
    }

    /// Remember an observed visibility, also in the cached common-games snapshot
    pub fn record_visibility(&mut self, steam_id: &str, visibility: Visibility) {
        if visibility == Visibility::Unknown || self.visibility(steam_id) == visibility {
            return;
        }
        let queried = [steam_id.to_string()];
        let observed = match visibility {
            Visibility::Public => VisibilityPartitions {
                public: queried.to_vec(),
                private: Vec::new(),
            },
            _ => VisibilityPartitions {
                public: Vec::new(),
                private: queried.to_vec(),
            },
        };
        self.history = merge_visibility(&self.history, &queried, &observed);

        let Some(owner) = self.owner() else {
            return;
        };
        if let Some(mut snapshot) = self.common_cache.read(&owner) {
            let cached = VisibilityPartitions {
                public: snapshot.public_friends,
                private: snapshot.private_friends,
            };
            let merged = merge_visibility(&cached, &queried, &observed);
            snapshot.public_friends = merged.public;
            snapshot.private_friends = merged.private;
            self.common_cache.write(&owner, &snapshot);
        }
    }
}

fn already_added() -> PlayTogetherError {
    PlayTogetherError::AlreadyExists("This friend is already in your list".to_string())
}
