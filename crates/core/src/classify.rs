//! Maps failed Steam Web API calls to an [`ErrorKind`] with a user-facing message

use std::collections::BTreeMap;

use crate::error::{ClassifiedError, ErrorKind};

/// Seconds to back off when Steam rate-limits us without a `retry-after` header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 300;

/// Transport-level failure before any HTTP response arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    ConnectionRefused,
    DnsFailure,
}

/// Everything known about a failed upstream call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFailure {
    pub status: Option<u16>,
    pub body: Option<String>,
    /// Header names are matched case-insensitively
    pub headers: BTreeMap<String, String>,
    pub network: Option<NetworkFailure>,
    pub message: Option<String>,
}

impl RawFailure {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn network(failure: NetworkFailure, message: impl Into<String>) -> Self {
        Self {
            network: Some(failure),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn retry_after(&self) -> u64 {
        self.header("retry-after")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    }
}

fn html_body(body: Option<&str>) -> Option<&str> {
    body.filter(|b| b.to_ascii_lowercase().contains("<html"))
}

fn html_title(body: &str) -> Option<&str> {
    let lower = body.to_ascii_lowercase();
    let start = lower.find("<title>")? + "<title>".len();
    let end = start + lower[start..].find("</title>")?;
    Some(body[start..end].trim())
}

fn title_says_rate_limited(body: Option<&str>) -> bool {
    html_body(body)
        .and_then(html_title)
        .is_some_and(|t| t.contains("429") || t.contains("Too Many Requests"))
}

/// A failure that arrived with a 2xx/3xx status still has to reach the browser as an error
fn error_status(status: Option<u16>) -> u16 {
    status.filter(|code| *code >= 400).unwrap_or(500)
}

fn classified(
    kind: ErrorKind,
    status_code: u16,
    message: String,
    user_message: &str,
) -> ClassifiedError {
    ClassifiedError {
        kind,
        message,
        user_message: user_message.to_string(),
        status_code,
        retry_after_seconds: None,
    }
}

/// Classify a failed upstream call. Pure: the same input always gives the same output.
pub fn classify(failure: &RawFailure) -> ClassifiedError {
    let body = failure.body.as_deref();

    if failure.status == Some(429) || title_says_rate_limited(body) {
        let wait = failure.retry_after();
        return ClassifiedError {
            kind: ErrorKind::RateLimited,
            message: format!("Steam API rate limit exceeded. Retry after {} seconds.", wait),
            user_message: "You've made too many requests to Steam's servers. Steam limits API calls to prevent server overload.".to_string(),
            status_code: 429,
            retry_after_seconds: Some(wait),
        };
    }

    match failure.status {
        Some(401) => {
            return classified(
                ErrorKind::Unauthorized,
                401,
                "Steam API authentication failed (401)".to_string(),
                "Your Steam API key is invalid or has expired. Please check your API key in settings.",
            )
        }
        Some(403) => {
            return classified(
                ErrorKind::Forbidden,
                403,
                "Steam API access forbidden (403)".to_string(),
                "Access denied. The Steam profile may be private, or your API key doesn't have permission for this action.",
            )
        }
        Some(404) => {
            return classified(
                ErrorKind::NotFound,
                404,
                "Steam API resource not found (404)".to_string(),
                "The requested Steam user or data was not found. Please verify the Steam ID is correct.",
            )
        }
        Some(500) => {
            return classified(
                ErrorKind::UpstreamError,
                500,
                "Steam API server error (500)".to_string(),
                "Steam's servers are experiencing issues. Please try again in a few minutes.",
            )
        }
        Some(code @ (502 | 503 | 504)) => {
            return classified(
                ErrorKind::UpstreamUnavailable,
                code,
                format!("Steam API service unavailable ({})", code),
                "Steam's servers are temporarily unavailable. Please try again in a few minutes.",
            )
        }
        _ => {}
    }

    if let Some(html) = html_body(body) {
        let title = html_title(html).filter(|t| !t.is_empty()).unwrap_or("Steam API Error");
        return classified(
            ErrorKind::UpstreamError,
            error_status(failure.status),
            format!("Steam API HTML error: {}", title),
            "Steam's servers returned an unexpected response. Please try again in a few minutes.",
        );
    }

    if let Some(network) = failure.network {
        return classified(
            ErrorKind::NetworkError,
            503,
            format!("Network error: {:?}", network),
            "Unable to connect to Steam's servers. Please check your internet connection and try again.",
        );
    }

    classified(
        ErrorKind::Unknown,
        error_status(failure.status),
        failure
            .message
            .clone()
            .unwrap_or_else(|| "Unknown Steam API error".to_string()),
        "An unexpected error occurred while connecting to Steam. Please try again.",
    )
}

/// Log a classified failure. Never pass URLs or credentials in `failure`.
pub fn log_steam_error(endpoint: &str, failure: &RawFailure, error: &ClassifiedError) {
    let raw = failure
        .body
        .as_deref()
        .or(failure.message.as_deref())
        .unwrap_or_default();
    tracing::error!(
        endpoint = %endpoint,
        kind = %error.kind,
        status = error.status_code,
        retry_after = ?error.retry_after_seconds,
        message = %error.message,
        raw = %raw,
        "Steam API error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_behind_success_status_becomes_server_error() {
        let body = "<html><title>Steam Maintenance</title></html>";
        let err = classify(&RawFailure::http(200, body));
        assert_eq!(err.kind, ErrorKind::UpstreamError);
        assert_eq!(err.status_code, 500);
        assert_eq!(err.message, "Steam API HTML error: Steam Maintenance");
        assert_eq!(err.retry_after_seconds, None);
    }

    #[test]
    fn unreadable_success_body_becomes_server_error() {
        let failure = RawFailure {
            status: Some(200),
            body: Some("not json".to_string()),
            message: Some("Unreadable Steam response".to_string()),
            ..Default::default()
        };
        let err = classify(&failure);
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.status_code, 500);
    }

    #[test]
    fn status_429_uses_retry_after_header() {
        let failure = RawFailure::http(429, "").with_header("Retry-After", "120");
        let err = classify(&failure);
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.retry_after_seconds, Some(120));
        assert_eq!(err.status_code, 429);
    }

    #[test]
    fn status_429_defaults_to_five_minutes() {
        let err = classify(&RawFailure::http(429, ""));
        assert_eq!(err.retry_after_seconds, Some(DEFAULT_RETRY_AFTER_SECS));

        let unparsable = RawFailure::http(429, "").with_header("retry-after", "soon");
        assert_eq!(classify(&unparsable).retry_after_seconds, Some(300));
    }

    #[test]
    fn html_title_429_is_rate_limited_even_without_status() {
        let body = "<html><head><title>429 Too Many Requests</title></head></html>";
        let failure = RawFailure {
            body: Some(body.to_string()),
            ..Default::default()
        };
        let err = classify(&failure);
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.retry_after_seconds, Some(300));

        let err = classify(&RawFailure::http(200, "<html><title>Too Many Requests</title></html>"));
        assert_eq!(err.kind, ErrorKind::RateLimited);
    }

    #[test]
    fn status_codes_map_in_order() {
        assert_eq!(classify(&RawFailure::http(401, "")).kind, ErrorKind::Unauthorized);
        assert_eq!(classify(&RawFailure::http(403, "")).kind, ErrorKind::Forbidden);
        assert_eq!(classify(&RawFailure::http(404, "")).kind, ErrorKind::NotFound);
        assert_eq!(classify(&RawFailure::http(500, "")).kind, ErrorKind::UpstreamError);
        for code in [502, 503, 504] {
            let err = classify(&RawFailure::http(code, ""));
            assert_eq!(err.kind, ErrorKind::UpstreamUnavailable);
            assert_eq!(err.status_code, code);
        }
    }

    #[test]
    fn status_wins_over_html_body() {
        let err = classify(&RawFailure::http(403, "<html><title>Forbidden</title></html>"));
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[test]
    fn other_html_is_upstream_error() {
        let err = classify(&RawFailure::http(418, "<html><body>nope</body></html>"));
        assert_eq!(err.kind, ErrorKind::UpstreamError);
        assert_eq!(err.status_code, 418);
        assert!(err.message.contains("Steam API Error"));

        let err = classify(&RawFailure::http(200, "<html><title>Maintenance</title></html>"));
        assert_eq!(err.kind, ErrorKind::UpstreamError);
        assert!(err.message.contains("Maintenance"));
    }

    #[test]
    fn network_failures() {
        let err = classify(&RawFailure::network(NetworkFailure::ConnectionRefused, "refused"));
        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert_eq!(err.status_code, 503);

        let err = classify(&RawFailure::network(NetworkFailure::DnsFailure, "no such host"));
        assert_eq!(err.kind, ErrorKind::NetworkError);
    }

    #[test]
    fn unknown_passes_raw_message_through() {
        let failure = RawFailure {
            status: Some(400),
            message: Some("bad steamid".to_string()),
            ..Default::default()
        };
        let err = classify(&failure);
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "bad steamid");
        assert_eq!(err.status_code, 400);

        let err = classify(&RawFailure::default());
        assert_eq!(err.message, "Unknown Steam API error");
        assert_eq!(err.status_code, 500);
    }

    #[test]
    fn classify_is_pure() {
        let failure = RawFailure::http(429, "<html><title>429</title></html>")
            .with_header("retry-after", "42");
        let first = classify(&failure);
        let second = classify(&failure.clone());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
