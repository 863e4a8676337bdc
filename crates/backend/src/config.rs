//! Server configuration from the environment

use std::env::var;

pub const DEFAULT_STEAM_API_BASE: &str = "https://api.steampowered.com";
pub const DEFAULT_STEAM_STORE_BASE: &str = "https://store.steampowered.com";
pub const DEFAULT_STEAM_OPENID_URL: &str = "https://steamcommunity.com/openid/login";

#[derive(Debug, Clone)]
pub struct Config {
    /// Public URL of the app; OpenID realm and return base.
    /// Env: APP_URL (default: http://localhost:3000)
    pub app_url: String,

    /// Env: BIND_ADDRESS (default: 0.0.0.0:8080)
    pub bind_address: String,

    /// Google Tag Manager container handed to the browser client.
    /// Env: GTM_ID (optional)
    pub gtm_id: Option<String>,

    /// Env: APP_ENV; "production" turns on secure cookies
    pub production: bool,

    /// Env: STEAM_API_BASE
    pub steam_api_base: String,

    /// Env: STEAM_STORE_BASE
    pub steam_store_base: String,

    /// Env: STEAM_OPENID_URL
    pub steam_openid_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3000".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
            gtm_id: None,
            production: false,
            steam_api_base: DEFAULT_STEAM_API_BASE.to_string(),
            steam_store_base: DEFAULT_STEAM_STORE_BASE.to_string(),
            steam_openid_url: DEFAULT_STEAM_OPENID_URL.to_string(),
        }
    }
}

impl Config {
    /// Read `.env` if present, then the process environment
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            app_url: trimmed_var("APP_URL").unwrap_or(defaults.app_url),
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            gtm_id: var("GTM_ID").ok().filter(|id| !id.trim().is_empty()),
            production: var("APP_ENV").is_ok_and(|env| env.eq_ignore_ascii_case("production")),
            steam_api_base: trimmed_var("STEAM_API_BASE").unwrap_or(defaults.steam_api_base),
            steam_store_base: trimmed_var("STEAM_STORE_BASE").unwrap_or(defaults.steam_store_base),
            steam_openid_url: var("STEAM_OPENID_URL").unwrap_or(defaults.steam_openid_url),
        }
    }

    /// Where Steam sends the user back after sign-in
    pub fn auth_return_url(&self) -> String {
        format!("{}/api/auth/steam/return", self.app_url)
    }
}

/// Base URLs without a trailing slash
fn trimmed_var(name: &str) -> Option<String> {
    var(name).ok().map(|v| v.trim_end_matches('/').to_string())
}
