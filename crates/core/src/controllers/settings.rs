//! User settings: credentials, identity and theme

use serde::Deserialize;

use crate::cache::{KeyValueStore, SETTINGS_KEY};
use crate::error::Result;
use crate::models::{Avatar, Credentials, Theme, UserSettings};

use super::ThemeEnvironment;

/// Partial settings change; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub steam_api_key: Option<String>,
    pub steam_id: Option<String>,
    pub steam_username: Option<String>,
    pub steam_avatar: Option<Avatar>,
    pub theme: Option<Theme>,
}

pub struct SettingsController<S, E> {
    store: S,
    theme_env: E,
    settings: UserSettings,
    loaded: bool,
    watching_system: bool,
}

impl<S: KeyValueStore, E: ThemeEnvironment> SettingsController<S, E> {
    pub fn new(store: S, theme_env: E) -> Self {
        Self {
            store,
            theme_env,
            settings: UserSettings::default(),
            loaded: false,
            watching_system: false,
        }
    }

    /// Read persisted settings, falling back to defaults when absent or unreadable
    pub fn load(&mut self) -> &UserSettings {
        self.settings = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to parse stored settings, using defaults");
                UserSettings::default()
            }),
            Ok(None) => UserSettings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored settings");
                UserSettings::default()
            }
        };
        self.loaded = true;
        self.apply_theme();
        &self.settings
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn update(&mut self, update: SettingsUpdate) -> Result<()> {
        let mut next = self.settings.clone();
        if let Some(key) = update.steam_api_key {
            next.steam_api_key = key;
        }
        if let Some(id) = update.steam_id {
            next.steam_id = id;
        }
        if let Some(name) = update.steam_username {
            next.steam_username = Some(name);
        }
        if let Some(avatar) = update.steam_avatar {
            next.steam_avatar = Some(avatar);
        }
        if let Some(theme) = update.theme {
            next.theme = theme;
        }

        let json = serde_json::to_string(&next)?;
        self.store.set(SETTINGS_KEY, &json)?;
        self.settings = next;
        self.apply_theme();
        Ok(())
    }

    /// Back to defaults, persisted copy removed
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(SETTINGS_KEY)?;
        self.settings = UserSettings::default();
        self.apply_theme();
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.settings.credentials()
    }

    pub fn theme_environment(&self) -> &E {
        &self.theme_env
    }

    fn apply_theme(&mut self) {
        match self.settings.theme {
            Theme::System => {
                let dark = self.theme_env.system_prefers_dark();
                self.theme_env.set_dark(dark);
                if !self.watching_system {
                    self.theme_env.watch_system_preference();
                    self.watching_system = true;
                }
            }
            explicit => {
                if self.watching_system {
                    self.theme_env.unwatch_system_preference();
                    self.watching_system = false;
                }
                self.theme_env.set_dark(explicit == Theme::Dark);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::testing::FakeTheme;

    fn controller(store: &MemoryStore) -> SettingsController<MemoryStore, FakeTheme> {
        SettingsController::new(store.clone(), FakeTheme::default())
    }

    #[test]
    fn load_defaults_when_nothing_stored() {
        let store = MemoryStore::new();
        let mut settings = controller(&store);
        let loaded = settings.load().clone();
        assert_eq!(loaded, UserSettings::default());
        assert_eq!(loaded.theme, Theme::System);
        assert!(!settings.is_configured());
        assert!(settings.credentials().is_none());
    }

    #[test]
    fn unparsable_settings_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(SETTINGS_KEY, "not json").unwrap();
        let mut settings = controller(&store);
        assert_eq!(settings.load(), &UserSettings::default());
    }

    #[test]
    fn update_merges_and_persists() {
        let store = MemoryStore::new();
        let mut settings = controller(&store);
        settings.load();
        settings
            .update(SettingsUpdate {
                steam_api_key: Some("key".to_string()),
                steam_id: Some("76561197960287930".to_string()),
                ..Default::default()
            })
            .unwrap();
        settings
            .update(SettingsUpdate {
                steam_username: Some("gaben".to_string()),
                ..Default::default()
            })
            .unwrap();

        let mut reloaded = controller(&store);
        let stored = reloaded.load();
        assert_eq!(stored.steam_api_key, "key");
        assert_eq!(stored.steam_username.as_deref(), Some("gaben"));
        assert!(reloaded.is_configured());
        assert_eq!(reloaded.credentials().unwrap().steam_id, "76561197960287930");
    }

    #[test]
    fn stored_settings_use_camel_case_keys() {
        let store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, r#"{"steamApiKey":"k","steamId":"1","theme":"dark"}"#)
            .unwrap();
        let mut settings = controller(&store);
        settings.load();
        assert!(settings.is_configured());
        assert!(settings.theme_environment().dark);
    }

    #[test]
    fn watches_system_preference_only_for_system_theme() {
        let store = MemoryStore::new();
        let mut settings = SettingsController::new(
            store.clone(),
            FakeTheme {
                system_dark: true,
                ..Default::default()
            },
        );
        settings.load();
        assert!(settings.theme_environment().watching);
        assert!(settings.theme_environment().dark);

        settings
            .update(SettingsUpdate {
                theme: Some(Theme::Light),
                ..Default::default()
            })
            .unwrap();
        assert!(!settings.theme_environment().watching);
        assert!(!settings.theme_environment().dark);
    }

    #[test]
    fn clear_removes_persisted_copy() {
        let store = MemoryStore::new();
        let mut settings = controller(&store);
        settings
            .update(SettingsUpdate {
                steam_api_key: Some("key".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(store.contains(SETTINGS_KEY));

        settings.clear().unwrap();
        assert!(!store.contains(SETTINGS_KEY));
        assert_eq!(settings.settings(), &UserSettings::default());
    }
}
