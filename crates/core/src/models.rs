//! Shared data models used by the backend and the browser client

use serde::{Deserialize, Serialize};

/// Color theme selected in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the operating system preference
    #[default]
    System,
}

impl Theme {
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::System => "System",
        }
    }
}

/// Animated avatar variant (static preview plus movie)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnimatedAvatar {
    #[serde(rename = "static")]
    pub static_url: Option<String>,
    pub movie: Option<String>,
}

/// Avatar images at the resolutions Steam serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AvatarSet {
    pub small: String,
    pub medium: String,
    pub large: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<AnimatedAvatar>,
}

/// Avatar as stored in settings: either a bare URL or a full set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Avatar {
    Url(String),
    Set(AvatarSet),
}

impl Avatar {
    /// Best URL for a small badge
    pub fn small_url(&self) -> &str {
        match self {
            Avatar::Url(url) => url,
            Avatar::Set(set) => &set.small,
        }
    }
}

/// A Steam account as returned by the identity handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub steam_id: String,
    pub username: Option<String>,
    pub avatar: Option<AvatarSet>,
}

/// One owned game, field names as Steam's GetOwnedGames returns them.
///
/// Per-platform playtime and last-played are only present for the
/// authenticated user's own library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub playtime_forever: u32,
    #[serde(default)]
    pub img_icon_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_windows_forever: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_mac_forever: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_linux_forever: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_deck_forever: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtime_last_played: Option<u32>,
}

impl Game {
    pub fn new(appid: u64, name: impl Into<String>) -> Self {
        Self {
            appid,
            name: name.into(),
            playtime_forever: 0,
            img_icon_url: String::new(),
            playtime_windows_forever: None,
            playtime_mac_forever: None,
            playtime_linux_forever: None,
            playtime_deck_forever: None,
            rtime_last_played: None,
        }
    }

    /// Unix timestamp of the last session, 0 = never
    pub fn last_played(&self) -> u32 {
        self.rtime_last_played.unwrap_or(0)
    }
}

/// The `response` object of GetOwnedGames.
///
/// Private profiles answer with an empty object, so both fields are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OwnedGames {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games: Option<Vec<Game>>,
}

impl OwnedGames {
    /// Steam hides both keys for private profiles
    pub fn is_private(&self) -> bool {
        self.game_count.is_none() && self.games.is_none()
    }

    pub fn into_games(self) -> Vec<Game> {
        self.games.unwrap_or_default()
    }
}

/// Entry of GetFriendList
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteamFriend {
    pub steamid: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub friend_since: i64,
}

/// Entry of GetPlayerSummaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub steamid: String,
    #[serde(default)]
    pub personaname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub avatarmedium: Option<String>,
    #[serde(default)]
    pub avatarfull: Option<String>,
}

impl PlayerSummary {
    pub fn display_name(&self) -> String {
        self.personaname
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("User {}", self.steamid))
    }

    pub fn avatar_set(&self) -> Option<AvatarSet> {
        let small = self.avatar.clone()?;
        Some(AvatarSet {
            medium: self.avatarmedium.clone().unwrap_or_else(|| small.clone()),
            large: self.avatarfull.clone().unwrap_or_else(|| small.clone()),
            small,
            animated: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppPlatforms {
    #[serde(default)]
    pub windows: bool,
    #[serde(default)]
    pub mac: bool,
    #[serde(default)]
    pub linux: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    pub name: String,
    pub steam_appid: u64,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub header_image: String,
    #[serde(default)]
    pub platforms: AppPlatforms,
}

/// Store details for one appid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDetails {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AppData>,
}

/// Friend saved to the comparison list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub steam_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Friend {
    pub fn from_summary(summary: &PlayerSummary) -> Self {
        Self {
            steam_id: summary.steamid.clone(),
            name: summary.display_name(),
            avatar: summary.avatar.clone(),
        }
    }
}

/// Profile visibility as last observed by a probe or a resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Unknown,
    Public,
    Private,
}

impl Visibility {
    pub fn from_public(is_public: bool) -> Self {
        if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

/// Persisted user settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub steam_api_key: String,
    #[serde(default)]
    pub steam_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_avatar: Option<Avatar>,
    #[serde(default)]
    pub theme: Theme,
}

impl UserSettings {
    pub fn is_configured(&self) -> bool {
        !self.steam_api_key.is_empty() && !self.steam_id.is_empty()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.is_configured().then(|| Credentials {
            api_key: self.steam_api_key.clone(),
            steam_id: self.steam_id.clone(),
        })
    }
}

/// API key plus the authenticated Steam ID, handed to the data controllers
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub steam_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("steam_id", &self.steam_id)
            .finish()
    }
}

/// Library table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Name,
    Appid,
    Playtime,
    PlaytimeWindows,
    PlaytimeMac,
    PlaytimeLinux,
    PlaytimeDeck,
    LastPlayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggle(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

pub const DEFAULT_ITEMS_PER_PAGE: u32 = 25;

/// Pagination, sorting and search of the library table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableViewState {
    pub current_page: u32,
    pub items_per_page: u32,
    pub sort_by: SortColumn,
    pub sort_order: SortOrder,
    pub search_term: String,
}

impl Default for TableViewState {
    fn default() -> Self {
        Self {
            current_page: 1,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            sort_by: SortColumn::Name,
            sort_order: SortOrder::Asc,
            search_term: String::new(),
        }
    }
}

/// Whose library is on screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewingUser {
    pub steam_id: String,
    pub name: String,
    pub is_own_library: bool,
}
