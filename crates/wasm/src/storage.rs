//! Browser storage and URL helpers

use gloo_storage::{LocalStorage, Storage};
use playtogether_core::error::{PlayTogetherError, Result};
use playtogether_core::models::AvatarSet;
use playtogether_core::KeyValueStore;

// ============================================================================
// localStorage
// ============================================================================

/// `window.localStorage` as a [`KeyValueStore`]; values are stored as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageStore;

fn storage_error(op: &str, key: &str, e: wasm_bindgen::JsValue) -> PlayTogetherError {
    PlayTogetherError::Storage(format!("{} {}: {:?}", op, key, e))
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        LocalStorage::raw()
            .get_item(key)
            .map_err(|e| storage_error("read", key, e))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Fails when the quota is exhausted
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| storage_error("write", key, e))
    }

    fn remove(&self, key: &str) -> Result<()> {
        LocalStorage::raw()
            .remove_item(key)
            .map_err(|e| storage_error("remove", key, e))
    }
}

// ============================================================================
// Sign-in result handed back in the URL
// ============================================================================

/// What the Steam sign-in redirect left in the query string
#[derive(Debug, Clone, PartialEq)]
pub enum AuthRedirect {
    Success {
        steam_id: String,
        steam_name: Option<String>,
        steam_avatar: Option<AvatarSet>,
        api_key: String,
    },
    Failed(String),
}

fn query_param(search: &str, name: &str) -> Option<String> {
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| js_sys::decode_uri_component(&v.replace('+', " ")).ok())
        .map(String::from)
        .filter(|v| !v.is_empty())
}

/// Read the sign-in outcome from the current URL, if any
pub fn auth_redirect_from_url() -> Option<AuthRedirect> {
    let search = web_sys::window()?.location().search().ok()?;

    if let Some(error) = query_param(&search, "error") {
        return Some(AuthRedirect::Failed(error));
    }
    if query_param(&search, "steam_auth_success").as_deref() != Some("true") {
        return None;
    }

    Some(AuthRedirect::Success {
        steam_id: query_param(&search, "steam_id")?,
        steam_name: query_param(&search, "steam_name"),
        steam_avatar: query_param(&search, "steam_avatar").and_then(|json| serde_json::from_str(&json).ok()),
        api_key: query_param(&search, "api_key")?,
    })
}

/// Drop the query string so the API key does not linger in history
pub fn clear_url_query() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(path) = window.location().pathname() else {
        return;
    };
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&path));
    }
}

/// Backend origin; the page's own origin unless told otherwise
pub fn default_api_base() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default()
}
