//! Owned-games library of the user, or of whichever identity is being viewed

use serde::Serialize;

use crate::cache::{CacheDomain, Clock, KeyValueStore, LibrarySnapshot, SnapshotCache};
use crate::error::{PlayTogetherError, Result};
use crate::models::{Credentials, Game, SortColumn, SortOrder, TableViewState, ViewingUser, Visibility};
use crate::steam::SteamApi;
use crate::table::{self, GamePage};

use super::LoadPhase;

/// Display name used for the authenticated user's own library
pub const OWN_LIBRARY_NAME: &str = "Steam Games Library";

/// Oldest snapshot still shown after a failed fetch
fn stale_max_age() -> i64 {
    CacheDomain::Library.ttl_millis().unwrap_or_default() * 2
}

/// Visibility observed for the identity last loaded, other than the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileVisibility {
    pub steam_id: String,
    pub visibility: Visibility,
}

/// Everything a view needs to render the library
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryState {
    pub phase: LoadPhase,
    pub game_count: u32,
    pub error: Option<String>,
    pub last_updated: Option<i64>,
    pub viewing_user: Option<ViewingUser>,
    pub profile_visibility: Option<ProfileVisibility>,
    pub table_view: TableViewState,
    pub page: GamePage,
}

pub struct LibraryController<P, S, C> {
    api: P,
    cache: SnapshotCache<LibrarySnapshot, S, C>,
    credentials: Option<Credentials>,
    games: Vec<Game>,
    game_count: u32,
    phase: LoadPhase,
    error: Option<String>,
    last_updated: Option<i64>,
    viewing: Option<ViewingUser>,
    profile_visibility: Option<ProfileVisibility>,
    view: TableViewState,
    /// Own snapshot `check_cache` found expired, kept for a failed first load
    expired: Option<LibrarySnapshot>,
}

impl<P, S, C> LibraryController<P, S, C>
where
    P: SteamApi,
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(api: P, store: S, clock: C) -> Self {
        Self {
            api,
            cache: SnapshotCache::new(CacheDomain::Library, store, clock),
            credentials: None,
            games: Vec::new(),
            game_count: 0,
            phase: LoadPhase::Uninitialized,
            error: None,
            last_updated: None,
            viewing: None,
            profile_visibility: None,
            view: TableViewState::default(),
            expired: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn game_count(&self) -> u32 {
        self.game_count
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn is_loaded(&self) -> bool {
        self.phase.has_data()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_updated(&self) -> Option<i64> {
        self.last_updated
    }

    pub fn viewing_user(&self) -> Option<&ViewingUser> {
        self.viewing.as_ref()
    }

    pub fn profile_visibility(&self) -> Option<&ProfileVisibility> {
        self.profile_visibility.as_ref()
    }

    pub fn clear_profile_visibility(&mut self) {
        self.profile_visibility = None;
    }

    pub fn table_view(&self) -> &TableViewState {
        &self.view
    }

    /// Current page of the table after search and sort
    pub fn visible_page(&self) -> GamePage {
        table::page(&self.games, &self.view)
    }

    pub fn state(&self) -> LibraryState {
        LibraryState {
            phase: self.phase,
            game_count: self.game_count,
            error: self.error.clone(),
            last_updated: self.last_updated,
            viewing_user: self.viewing.clone(),
            profile_visibility: self.profile_visibility.clone(),
            table_view: self.view.clone(),
            page: self.visible_page(),
        }
    }

    // ========================================================================
    // Cache
    // ========================================================================

    /// Switching identity forgets everything loaded for the previous one
    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        let previous = self.credentials.as_ref().map(|c| c.steam_id.clone());
        let next = credentials.as_ref().map(|c| c.steam_id.clone());
        self.credentials = credentials;
        if previous != next {
            self.reset();
        }
    }

    fn own_steam_id(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.steam_id.as_str())
    }

    fn reset(&mut self) {
        self.games.clear();
        self.game_count = 0;
        self.phase = LoadPhase::Uninitialized;
        self.error = None;
        self.last_updated = None;
        self.viewing = None;
        self.profile_visibility = None;
        self.view = TableViewState::default();
        self.expired = None;
    }

    fn is_own(&self, steam_id: &str) -> bool {
        self.own_steam_id() == Some(steam_id)
    }

    fn display_name(&self, steam_id: &str, name: Option<String>) -> String {
        name.filter(|n| !n.is_empty()).unwrap_or_else(|| {
            if self.is_own(steam_id) {
                OWN_LIBRARY_NAME.to_string()
            } else {
                format!("User {}", steam_id)
            }
        })
    }

    fn apply_snapshot(&mut self, snapshot: LibrarySnapshot, phase: LoadPhase) {
        let is_own_library = self.is_own(&snapshot.steam_id);
        self.viewing = Some(ViewingUser {
            name: self.display_name(&snapshot.steam_id, Some(snapshot.user_name)),
            steam_id: snapshot.steam_id,
            is_own_library,
        });
        self.games = snapshot.games;
        self.game_count = snapshot.game_count;
        self.last_updated = Some(snapshot.timestamp);
        self.view = snapshot.table_view_state;
        self.phase = phase;
    }

    /// Show the user's own cached library if it is still fresh
    pub fn check_cache(&mut self) {
        self.expired = self
            .own_steam_id()
            .and_then(|id| self.cache.read_stale(id, stale_max_age()));
        let cached = self.own_steam_id().and_then(|id| self.cache.read(id));
        match cached {
            Some(snapshot) => {
                tracing::debug!(games = snapshot.games.len(), "Loaded library from cache");
                self.error = None;
                self.apply_snapshot(snapshot, LoadPhase::Fresh);
            }
            None => {
                self.games.clear();
                self.game_count = 0;
                self.last_updated = None;
                self.viewing = None;
                self.phase = LoadPhase::Empty;
            }
        }
    }

    /// Store the current view state without touching the fetch timestamp
    fn persist_view(&self) {
        let (Some(viewing), Some(timestamp)) = (&self.viewing, self.last_updated) else {
            return;
        };
        if !self.is_loaded() || self.games.is_empty() {
            return;
        }
        self.cache.write(
            &viewing.steam_id,
            &LibrarySnapshot {
                steam_id: viewing.steam_id.clone(),
                user_name: viewing.name.clone(),
                games: self.games.clone(),
                game_count: self.game_count,
                timestamp,
                table_view_state: self.view.clone(),
            },
        );
    }

    /// Drop the viewed library's snapshot and the user's own
    pub fn clear_cache(&mut self) {
        if let Some(viewing) = &self.viewing {
            self.cache.invalidate(&viewing.steam_id);
        }
        if let Some(own) = self.own_steam_id() {
            if self.viewing.as_ref().map(|v| v.steam_id.as_str()) != Some(own) {
                self.cache.invalidate(own);
            }
        }
        self.reset();
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Never true while another identity's library is on screen, even after a failure
    pub fn should_auto_load(&self) -> bool {
        self.credentials.is_some()
            && !matches!(self.phase, LoadPhase::Uninitialized | LoadPhase::Loading)
            && !self.is_loaded()
            && self.viewing.as_ref().map_or(true, |v| v.is_own_library)
    }

    /// Load the user's own library if nothing is showing yet. Returns whether a load ran.
    pub async fn auto_load(&mut self) -> Result<bool> {
        if !self.should_auto_load() {
            return Ok(false);
        }
        self.load_library().await?;
        Ok(true)
    }

    pub async fn load_library(&mut self) -> Result<()> {
        let Some(own) = self.own_steam_id().map(str::to_string) else {
            return Err(self.precondition("Steam ID is required"));
        };
        self.load_for(&own, Some(OWN_LIBRARY_NAME.to_string()), false).await
    }

    /// View another identity's library, starting from a default table view
    pub async fn load_user_library(&mut self, steam_id: &str, name: Option<String>) -> Result<()> {
        self.view = TableViewState::default();
        self.load_for(steam_id, name, false).await
    }

    pub async fn reset_to_own_library(&mut self) -> Result<()> {
        let Some(own) = self.own_steam_id().map(str::to_string) else {
            return Err(self.precondition("Steam ID is required"));
        };
        self.view = TableViewState::default();
        if self.viewing.as_ref().is_some_and(|v| v.is_own_library) {
            return Ok(());
        }
        self.load_for(&own, Some(OWN_LIBRARY_NAME.to_string()), false).await
    }

    /// Reload whichever library is on screen, ignoring the cache
    pub async fn refresh_library(&mut self) -> Result<()> {
        let target = match &self.viewing {
            Some(v) => Some((v.steam_id.clone(), v.name.clone())),
            None => self
                .own_steam_id()
                .map(|id| (id.to_string(), OWN_LIBRARY_NAME.to_string())),
        };
        let Some((steam_id, name)) = target else {
            return Err(self.precondition("No user library to refresh"));
        };
        self.load_for(&steam_id, Some(name), true).await
    }

    fn precondition(&mut self, message: &str) -> PlayTogetherError {
        self.error = Some(message.to_string());
        PlayTogetherError::Precondition(message.to_string())
    }

    async fn load_for(&mut self, steam_id: &str, name: Option<String>, force: bool) -> Result<()> {
        let Some(api_key) = self.credentials.as_ref().map(|c| c.api_key.clone()) else {
            return Err(self.precondition("Steam API key is required"));
        };

        // Taken before `read` can evict an expired entry, so a failed fetch still has it
        let stashed = self.expired.take().filter(|s| s.steam_id == steam_id);
        let fallback = self.cache.read_stale(steam_id, stale_max_age()).or(stashed);

        if !force {
            if let Some(snapshot) = self.cache.read(steam_id) {
                self.error = None;
                self.apply_snapshot(snapshot, LoadPhase::Fresh);
                return Ok(());
            }
        }

        let is_own_library = self.is_own(steam_id);
        let display_name = self.display_name(steam_id, name);
        let viewing = ViewingUser {
            steam_id: steam_id.to_string(),
            name: display_name.clone(),
            is_own_library,
        };

        self.phase = LoadPhase::Loading;
        self.error = None;

        match self.api.owned_games(steam_id, &api_key).await {
            Ok(owned) if owned.is_private() => {
                tracing::info!(steam_id = %steam_id, "Library is private");
                self.games.clear();
                self.game_count = 0;
                self.last_updated = Some(self.cache.now());
                self.viewing = Some(viewing);
                if !is_own_library {
                    self.profile_visibility = Some(ProfileVisibility {
                        steam_id: steam_id.to_string(),
                        visibility: Visibility::Private,
                    });
                }
                self.error = Some(if is_own_library {
                    "Your profile appears to be private or there was an issue loading your games".to_string()
                } else {
                    format!("{}'s profile is private - no games visible", display_name)
                });
                self.phase = LoadPhase::Fresh;
                Ok(())
            }
            Ok(owned) => {
                let games = owned.games.unwrap_or_default();
                let game_count = owned.game_count.unwrap_or(games.len() as u32);
                let timestamp = self.cache.now();
                tracing::info!(steam_id = %steam_id, games = games.len(), "Library loaded");

                if !is_own_library {
                    self.profile_visibility = Some(ProfileVisibility {
                        steam_id: steam_id.to_string(),
                        visibility: Visibility::Public,
                    });
                }
                self.cache.write(
                    steam_id,
                    &LibrarySnapshot {
                        steam_id: steam_id.to_string(),
                        user_name: display_name,
                        games: games.clone(),
                        game_count,
                        timestamp,
                        table_view_state: self.view.clone(),
                    },
                );
                self.games = games;
                self.game_count = game_count;
                self.last_updated = Some(timestamp);
                self.viewing = Some(viewing);
                self.phase = LoadPhase::Fresh;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(steam_id = %steam_id, error = %e, "Failed to load library");
                self.error = Some(e.toast_message());
                self.serve_stale(steam_id, viewing, fallback);
                Err(e)
            }
        }
    }

    /// Keep showing the last good data for `steam_id` after a failed fetch: what is
    /// already on screen, else `fallback` (a snapshot up to twice the library TTL old)
    fn serve_stale(&mut self, steam_id: &str, viewing: ViewingUser, fallback: Option<LibrarySnapshot>) {
        let in_memory = self
            .viewing
            .as_ref()
            .is_some_and(|v| v.steam_id == steam_id)
            && !self.games.is_empty();
        let is_own_library = viewing.is_own_library;
        self.viewing = Some(viewing);

        if in_memory {
            self.phase = LoadPhase::Stale;
            return;
        }

        if let Some(snapshot) = fallback {
            self.games = snapshot.games;
            self.game_count = snapshot.game_count;
            self.last_updated = Some(snapshot.timestamp);
            self.view = snapshot.table_view_state;
            self.phase = LoadPhase::Stale;
            return;
        }

        self.games.clear();
        self.game_count = 0;
        self.last_updated = None;
        // Another identity's page stays "loaded" so the own library doesn't auto-load over it
        self.phase = if is_own_library {
            LoadPhase::Empty
        } else {
            LoadPhase::Stale
        };
    }

    // ========================================================================
    // Table view
    // ========================================================================

    pub fn set_current_page(&mut self, page: u32) {
        self.view.current_page = page.max(1);
        self.persist_view();
    }

    pub fn set_items_per_page(&mut self, items: u32) {
        self.view.items_per_page = items;
        self.view.current_page = 1;
        self.persist_view();
    }

    pub fn set_sort_by(&mut self, column: SortColumn) {
        self.view.sort_by = column;
        self.view.current_page = 1;
        self.persist_view();
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.view.sort_order = order;
        self.view.current_page = 1;
        self.persist_view();
    }

    /// Clicking the active column flips the direction, another column sorts ascending
    pub fn toggle_sort(&mut self, column: SortColumn) {
        if self.view.sort_by == column {
            self.set_sort_order(self.view.sort_order.toggle());
        } else {
            self.view.sort_order = SortOrder::Asc;
            self.set_sort_by(column);
        }
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.view.search_term = term.to_string();
        self.view.current_page = 1;
        self.persist_view();
    }

    pub fn reset_table_view(&mut self) {
        self.view = TableViewState::default();
        self.persist_view();
    }
}
