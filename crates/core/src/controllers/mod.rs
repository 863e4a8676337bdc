//! Domain state controllers.
//!
//! Each controller owns the in-memory state of one data domain and keeps it
//! in step with the snapshot cache. `PlayTogether` wires the three together
//! and hands settings credentials to the data controllers.

mod friends;
mod library;
mod settings;

pub use friends::{CommonGamesSummary, FriendsController, FriendsState, VisibilitySummary};
pub use library::{LibraryController, LibraryState, ProfileVisibility, OWN_LIBRARY_NAME};
pub use settings::{SettingsController, SettingsUpdate};

use serde::{Deserialize, Serialize};

use crate::cache::{Clock, KeyValueStore};
use crate::error::Result;
use crate::steam::SteamApi;

/// Where a data domain is in its load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    /// Cache not consulted yet
    #[default]
    Uninitialized,
    /// Cache checked, nothing to show
    Empty,
    Loading,
    Fresh,
    /// Showing older data after a failed refresh
    Stale,
}

impl LoadPhase {
    pub fn has_data(&self) -> bool {
        matches!(self, LoadPhase::Fresh | LoadPhase::Stale)
    }
}

/// Where the selected theme gets applied (the document root in a browser)
pub trait ThemeEnvironment {
    fn set_dark(&mut self, dark: bool);
    fn system_prefers_dark(&self) -> bool;
    /// Keep following the system preference until unwatched
    fn watch_system_preference(&mut self);
    fn unwatch_system_preference(&mut self);
}

/// The application's controllers, composed explicitly
pub struct PlayTogether<P, S, C, E> {
    pub settings: SettingsController<S, E>,
    pub library: LibraryController<P, S, C>,
    pub friends: FriendsController<P, S, C>,
}

impl<P, S, C, E> PlayTogether<P, S, C, E>
where
    P: SteamApi + Clone,
    S: KeyValueStore + Clone,
    C: Clock + Clone,
    E: ThemeEnvironment,
{
    pub fn new(api: P, store: S, clock: C, theme: E) -> Self {
        Self {
            settings: SettingsController::new(store.clone(), theme),
            library: LibraryController::new(api.clone(), store.clone(), clock.clone()),
            friends: FriendsController::new(api, store, clock),
        }
    }

    /// Load settings, then let the data controllers pick up their cached snapshots
    pub fn start(&mut self) {
        self.settings.load();
        self.sync_credentials();
    }

    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<()> {
        self.settings.update(update)?;
        self.sync_credentials();
        Ok(())
    }

    fn sync_credentials(&mut self) {
        let credentials = self.settings.credentials();
        self.library.set_credentials(credentials.clone());
        self.friends.set_credentials(credentials);
        // A changed identity resets a controller to Uninitialized
        if self.library.phase() == LoadPhase::Uninitialized {
            self.library.check_cache();
        }
        if self.friends.friends_phase() == LoadPhase::Uninitialized {
            self.friends.check_cache();
        }
    }

    /// Drop every cached snapshot and the settings themselves
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.library.clear_cache();
        self.friends.clear_friends_cache();
        self.friends.clear_common_games_cache();
        self.friends.clear_steam_friends();
        self.settings.clear()?;
        self.sync_credentials();
        tracing::info!("Cleared all local data");
        Ok(())
    }
}
