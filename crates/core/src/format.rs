//! Display helpers for playtime, dates and Steam URLs

use chrono::{DateTime, TimeZone, Utc};

pub const PLACEHOLDER_ICON: &str = "/placeholder-game-icon.svg";

/// "Never played", "45m", "2h" or "2h 5m"
pub fn format_playtime(minutes: u32) -> String {
    if minutes == 0 {
        return "Never played".to_string();
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Relative description of a Steam `rtime_last_played` (unix seconds, 0 = never)
pub fn format_last_played(timestamp: u32, now: DateTime<Utc>) -> String {
    if timestamp == 0 {
        return "Never".to_string();
    }
    let Some(played) = Utc.timestamp_opt(timestamp as i64, 0).single() else {
        return "Never".to_string();
    };

    let days = (now - played).num_days();
    match days {
        d if d <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d if d < 7 => format!("{} days ago", d),
        d if d < 30 => format!("{} weeks ago", d / 7),
        d if d < 365 => format!("{} months ago", d / 30),
        _ => played.format("%-m/%-d/%Y").to_string(),
    }
}

/// Community CDN icon, or the placeholder when Steam sent no icon hash
pub fn steam_icon_url(appid: u64, icon_hash: &str) -> String {
    if icon_hash.is_empty() {
        return PLACEHOLDER_ICON.to_string();
    }
    format!(
        "https://media.steampowered.com/steamcommunity/public/images/apps/{}/{}.jpg",
        appid, icon_hash
    )
}

pub fn steam_launch_url(appid: u64) -> String {
    format!("steam://run/{}", appid)
}
