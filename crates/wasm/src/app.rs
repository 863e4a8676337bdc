//! JavaScript-facing application handle
//!
//! The page creates one [`PlayTogetherApp`] and calls into it. Every call that
//! touches a controller returns a `Promise`; the controllers sit behind one
//! async mutex, so overlapping calls from the page run one after another.

use std::rc::Rc;

use futures_util::lock::Mutex;
use js_sys::Promise;
use playtogether_core::controllers::SettingsUpdate;
use playtogether_core::error::{ErrorKind, PlayTogetherError};
use playtogether_core::models::{Avatar, AvatarSet, SortColumn};
use playtogether_core::{PlayTogether, SteamApi, SystemClock};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::http_client::ProxyClient;
use crate::storage::{self, AuthRedirect, LocalStorageStore};
use crate::theme::DomTheme;

type App = PlayTogether<ProxyClient, LocalStorageStore, SystemClock, DomTheme>;
type Shared = Rc<Mutex<App>>;

/// Error shape handed to JavaScript
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsFailure {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

fn to_js_error(e: PlayTogetherError) -> JsValue {
    let failure = JsFailure {
        message: e.toast_message(),
        kind: e.classified().map(|c| c.kind),
        retry_after: e.classified().and_then(|c| c.retry_after_seconds),
    };
    to_js(&failure).unwrap_or_else(|_| JsValue::from_str(&failure.message))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&json)
}

fn from_json<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| to_js_error(e.into()))
}

/// Payload the sign-in popup posts to its opener
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInMessage {
    steam_id: String,
    #[serde(default)]
    steam_name: Option<String>,
    #[serde(default)]
    steam_avatar: Option<AvatarSet>,
    api_key: String,
}

fn sign_in_update(
    steam_id: String,
    steam_name: Option<String>,
    steam_avatar: Option<AvatarSet>,
    api_key: String,
) -> SettingsUpdate {
    SettingsUpdate {
        steam_api_key: Some(api_key),
        steam_id: Some(steam_id),
        steam_username: steam_name,
        steam_avatar: steam_avatar.map(Avatar::Set),
        theme: None,
    }
}

#[wasm_bindgen]
pub struct PlayTogetherApp {
    app: Shared,
    client: ProxyClient,
    sign_in_error: Option<String>,
}

#[wasm_bindgen]
impl PlayTogetherApp {
    /// `api_base` defaults to the page's origin
    #[wasm_bindgen(constructor)]
    pub fn new(api_base: Option<String>) -> PlayTogetherApp {
        let client = ProxyClient::new(api_base.unwrap_or_else(storage::default_api_base));
        let mut app = PlayTogether::new(client.clone(), LocalStorageStore, SystemClock, DomTheme::default());
        app.start();

        let mut sign_in_error = None;
        match storage::auth_redirect_from_url() {
            Some(AuthRedirect::Success {
                steam_id,
                steam_name,
                steam_avatar,
                api_key,
            }) => {
                if let Err(e) = app.update_settings(sign_in_update(steam_id, steam_name, steam_avatar, api_key)) {
                    tracing::error!(error = %e, "Failed to save Steam sign-in");
                    sign_in_error = Some(e.toast_message());
                }
                storage::clear_url_query();
            }
            Some(AuthRedirect::Failed(code)) => {
                tracing::warn!(code = %code, "Steam sign-in failed");
                sign_in_error = Some(code);
                storage::clear_url_query();
            }
            None => {}
        }

        PlayTogetherApp {
            app: Rc::new(Mutex::new(app)),
            client,
            sign_in_error,
        }
    }

    /// Error code left by a failed sign-in redirect, reported once
    pub fn take_sign_in_error(&mut self) -> Option<String> {
        self.sign_in_error.take()
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn settings(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let app = app.lock().await;
            to_js(app.settings.settings())
        })
    }

    /// Merge a partial settings object (`{steamApiKey?, steamId?, theme?, ...}`)
    pub fn update_settings(&self, patch_json: String) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let update: SettingsUpdate = from_json(&patch_json)?;
            let mut app = app.lock().await;
            app.update_settings(update).map_err(to_js_error)?;
            to_js(app.settings.settings())
        })
    }

    /// Apply the identity the sign-in popup posted back
    pub fn apply_sign_in(&self, message_json: String) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let message: SignInMessage = from_json(&message_json)?;
            let update = sign_in_update(message.steam_id, message.steam_name, message.steam_avatar, message.api_key);
            let mut app = app.lock().await;
            app.update_settings(update).map_err(to_js_error)?;
            to_js(app.settings.settings())
        })
    }

    pub fn clear_all_data(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            app.lock().await.clear_all_data().map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn validate_api_key(&self, api_key: String) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            let valid = client.validate_api_key(&api_key).await.map_err(to_js_error)?;
            Ok(JsValue::from_bool(valid))
        })
    }

    /// Steam login URL to open in a popup or navigate to
    pub fn begin_steam_sign_in(&self, api_key: String, popup: bool) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            let url = client.begin_auth(&api_key, popup).await.map_err(to_js_error)?;
            Ok(JsValue::from_str(&url))
        })
    }

    pub fn client_config(&self) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            let config = client.client_config().await.map_err(to_js_error)?;
            to_js(&config)
        })
    }

    // ========================================================================
    // Library
    // ========================================================================

    pub fn library_state(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move { to_js(&app.lock().await.library.state()) })
    }

    /// Load the own library when settings are complete and nothing is cached
    pub fn auto_load_library(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            app.library.auto_load().await.map_err(to_js_error)?;
            to_js(&app.library.state())
        })
    }

    pub fn load_library(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            app.library.load_library().await.map_err(to_js_error)?;
            to_js(&app.library.state())
        })
    }

    pub fn load_user_library(&self, steam_id: String, name: Option<String>) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            app.library.load_user_library(&steam_id, name).await.map_err(to_js_error)?;
            to_js(&app.library.state())
        })
    }

    pub fn reset_to_own_library(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            app.library.reset_to_own_library().await.map_err(to_js_error)?;
            to_js(&app.library.state())
        })
    }

    pub fn refresh_library(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            app.library.refresh_library().await.map_err(to_js_error)?;
            to_js(&app.library.state())
        })
    }

    pub fn set_page(&self, page: u32) -> Promise {
        self.with_library(move |app| app.library.set_current_page(page))
    }

    pub fn set_items_per_page(&self, items: u32) -> Promise {
        self.with_library(move |app| app.library.set_items_per_page(items))
    }

    pub fn set_library_search(&self, term: String) -> Promise {
        self.with_library(move |app| app.library.set_search_term(&term))
    }

    /// `column` is one of `name`, `appid`, `playtime`, `playtime_windows`, ...
    pub fn toggle_sort(&self, column: String) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let column: SortColumn = from_json(&format!("\"{}\"", column))?;
            let mut app = app.lock().await;
            app.library.toggle_sort(column);
            to_js(&app.library.state())
        })
    }

    pub fn reset_table_view(&self) -> Promise {
        self.with_library(|app| app.library.reset_table_view())
    }

    // ========================================================================
    // Friends and common games
    // ========================================================================

    pub fn friends_state(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move { to_js(&app.lock().await.friends.state()) })
    }

    /// Add by Steam ID or vanity name / profile URL
    pub fn add_friend(&self, input: String, name: Option<String>) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            let friend = app.friends.add_friend(&input, name).await.map_err(to_js_error)?;
            to_js(&friend)
        })
    }

    pub fn remove_friend(&self, steam_id: String) -> Promise {
        self.with_friends(move |app| app.friends.remove_friend(&steam_id))
    }

    pub fn remove_all_friends(&self) -> Promise {
        self.with_friends(|app| app.friends.remove_all_friends())
    }

    pub fn load_steam_friends(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            app.friends.load_steam_friends().await.map_err(to_js_error)?;
            to_js(&app.friends.state())
        })
    }

    pub fn add_selected_steam_friends(&self, steam_ids: Vec<String>) -> Promise {
        self.with_friends(move |app| {
            app.friends.add_selected_steam_friends(&steam_ids);
        })
    }

    pub fn set_selected_friends(&self, steam_ids: Vec<String>) -> Promise {
        self.with_friends(move |app| app.friends.set_selected(steam_ids))
    }

    pub fn set_common_games_search(&self, term: String) -> Promise {
        self.with_friends(move |app| app.friends.set_search_term(&term))
    }

    /// Resolve against every saved friend, or only the ids in `steam_ids_json`
    /// when given. Resolves to the counts summary with a ready-made `notice`.
    pub fn find_common_games(&self, steam_ids_json: Option<String>) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let steam_ids = steam_ids_json.as_deref().map(from_json::<Vec<String>>).transpose()?;
            let mut app = app.lock().await;
            let summary = app
                .friends
                .find_common_games(steam_ids.as_deref())
                .await
                .map_err(to_js_error)?;

            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            struct Outcome<'a> {
                #[serde(flatten)]
                summary: &'a playtogether_core::controllers::CommonGamesSummary,
                notice: String,
                visibility_lines: Vec<String>,
            }
            to_js(&Outcome {
                notice: summary.notice(),
                visibility_lines: app.friends.visibility_summary().lines(),
                summary: &summary,
            })
        })
    }

    pub fn probe_visibility(&self, steam_id: String) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            let visibility = app.friends.probe_visibility(&steam_id).await.map_err(to_js_error)?;
            to_js(&visibility)
        })
    }

    pub fn clear_common_games(&self) -> Promise {
        self.with_friends(|app| app.friends.clear_common_games_cache())
    }
}

impl PlayTogetherApp {
    /// Run a synchronous library change, resolve to the new library state
    fn with_library(&self, change: impl FnOnce(&mut App) + 'static) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            change(&mut app);
            to_js(&app.library.state())
        })
    }

    /// Run a synchronous friends change, resolve to the new friends state
    fn with_friends(&self, change: impl FnOnce(&mut App) + 'static) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.lock().await;
            change(&mut app);
            to_js(&app.friends.state())
        })
    }
}

// ============================================================================
// Display helpers
// ============================================================================

#[wasm_bindgen]
pub fn format_playtime(minutes: u32) -> String {
    playtogether_core::format::format_playtime(minutes)
}

#[wasm_bindgen]
pub fn format_last_played(timestamp: u32) -> String {
    playtogether_core::format::format_last_played(timestamp, chrono::Utc::now())
}

#[wasm_bindgen]
pub fn steam_icon_url(appid: u32, icon_hash: String) -> String {
    playtogether_core::format::steam_icon_url(appid.into(), &icon_hash)
}

#[wasm_bindgen]
pub fn steam_launch_url(appid: u32) -> String {
    playtogether_core::format::steam_launch_url(appid.into())
}
