mod support;

use axum::http::StatusCode;
use playtogether_core::error::{ClassifiedError, ErrorKind};
use playtogether_core::messages::ErrorBody;
use serde_json::json;
use support::*;

// =============================================================================
// HEALTH / CONFIG
// =============================================================================

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = test_app().await;
    let (status, _) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn client_config_exposes_app_url() {
    let (app, _) = test_app().await;
    let (status, body) = get_json(app, "/api/client-config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appUrl"], "http://localhost:3000");
    assert!(body.get("gtmId").is_none());
}

// =============================================================================
// PASS-THROUGH ENDPOINTS
// =============================================================================

#[tokio::test]
async fn owned_games_passes_body_through() {
    let (app, upstream) = test_app().await;
    let (status, body) = post_json(
        app,
        "/api/steam/owned-games",
        json!({ "steamId": USER, "apiKey": GOOD_KEY }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["game_count"], 3);
    assert_eq!(body["response"]["games"][1]["name"], "Zeta");
    assert_eq!(upstream.owned_games_calls(), vec![USER.to_string()]);
}

#[tokio::test]
async fn missing_inputs_are_rejected_without_upstream_calls() {
    let (app, upstream) = test_app().await;
    let (status, body) = post_json(
        app.clone(),
        "/api/steam/owned-games",
        json!({ "steamId": "", "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Steam ID and API key are required");

    let (status, _) = post_json(app.clone(), "/api/steam/friends-list", json!({ "steamId": USER })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        app.clone(),
        "/api/steam/player-summaries",
        json!({ "steamIds": [], "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Steam IDs array and API key are required");

    let (status, body) = get_json(app, "/api/steam/app-details").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "App ID is required");

    assert!(upstream.owned_games_calls().is_empty());
}

#[tokio::test]
async fn friends_list_and_summaries_pass_through() {
    let (app, _) = test_app().await;
    let (status, body) = post_json(
        app.clone(),
        "/api/steam/friends-list",
        json!({ "steamId": USER, "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["friendslist"]["friends"].as_array().unwrap().len(), 2);

    let (status, body) = post_json(
        app,
        "/api/steam/player-summaries",
        json!({ "steamIds": [FRIEND_A, FRIEND_B], "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["players"][1]["steamid"], FRIEND_B);
}

#[tokio::test]
async fn app_details_passes_store_body_through() {
    let (app, _) = test_app().await;
    let (status, body) = get_json(app, "/api/steam/app-details?appId=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["1"]["data"]["name"], "Alpha");
}

// =============================================================================
// FAILURE CLASSIFICATION
// =============================================================================

#[tokio::test]
async fn rate_limit_is_answered_with_retry_after() {
    let (app, _) = test_app().await;
    let (status, body) = post_json(
        app,
        "/api/steam/owned-games",
        json!({ "steamId": RATE_LIMITED, "apiKey": GOOD_KEY }),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["retryAfter"], 120);
    assert!(body["error"].as_str().unwrap().contains("too many requests"));
}

#[tokio::test]
async fn forbidden_is_answered_with_403() {
    let (app, _) = test_app().await;
    let (status, body) = post_json(
        app,
        "/api/steam/owned-games",
        json!({ "steamId": FORBIDDEN, "apiKey": GOOD_KEY }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("retryAfter").is_none());
}

#[tokio::test]
async fn html_page_with_success_status_is_a_server_error() {
    let (app, _) = test_app().await;
    let (status, body) = post_json(
        app.clone(),
        "/api/steam/owned-games",
        json!({ "steamId": MAINTENANCE, "apiKey": GOOD_KEY }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Steam's servers returned an unexpected response. Please try again in a few minutes."
    );

    // What the browser client rebuilds from that answer is an upstream error, not a private library
    let rebuilt = ClassifiedError::from_proxy_response(
        status.as_u16(),
        serde_json::from_value::<ErrorBody>(body).unwrap(),
    );
    assert_eq!(rebuilt.kind, ErrorKind::UpstreamError);

    let (status, body) = post_json(
        app,
        "/api/steam/profile-visibility",
        json!({ "steamId": MAINTENANCE, "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("isPublic").is_none());
}

#[tokio::test]
async fn unreachable_steam_is_a_network_error() {
    let app = unreachable_app();
    let (status, body) = post_json(
        app,
        "/api/steam/owned-games",
        json!({ "steamId": USER, "apiKey": GOOD_KEY }),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Unable to connect"));
    assert!(!message.contains(GOOD_KEY));
}

// =============================================================================
// RESHAPED ENDPOINTS
// =============================================================================

#[tokio::test]
async fn resolve_vanity_cleans_profile_urls() {
    let (app, _) = test_app().await;
    let (status, body) = post_json(
        app.clone(),
        "/api/steam/resolve-vanity",
        json!({ "vanityUrl": "https://steamcommunity.com/id/robin/", "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["steamId"], FRIEND_A);

    let (status, body) = post_json(
        app,
        "/api/steam/resolve-vanity",
        json!({ "vanityUrl": "nobody", "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Steam ID not found for this vanity URL");
}

#[tokio::test]
async fn validate_reports_key_state() {
    let (app, _) = test_app().await;
    let (status, body) = post_json(app.clone(), "/api/steam/validate", json!({ "apiKey": GOOD_KEY })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true }));

    let (status, body) = post_json(app.clone(), "/api/steam/validate", json!({ "apiKey": BAD_KEY })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false, "error": "Invalid API key" }));

    let (status, body) = post_json(app, "/api/steam/validate", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["valid"], false);
    assert_eq!(body["error"], "API key is required");
}

#[tokio::test]
async fn profile_visibility_treats_empty_response_and_403_as_private() {
    let (app, _) = test_app().await;
    for (steam_id, expected) in [(USER, true), (PRIVATE, false), (FORBIDDEN, false)] {
        let (status, body) = post_json(
            app.clone(),
            "/api/steam/profile-visibility",
            json!({ "steamId": steam_id, "apiKey": GOOD_KEY }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", steam_id);
        assert_eq!(body["isPublic"], expected, "{}", steam_id);
    }
}

// =============================================================================
// COMMON GAMES
// =============================================================================

#[tokio::test]
async fn common_games_intersects_public_friends() {
    let (app, upstream) = test_app().await;
    let (status, body) = post_json(
        app,
        "/api/steam/common-games",
        json!({
            "userSteamId": USER,
            "friendSteamIds": [FRIEND_A, PRIVATE, FRIEND_B, FRIEND_A],
            "apiKey": GOOD_KEY
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["commonGames"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alpha", "beta"]);
    assert_eq!(body["publicFriends"], json!([FRIEND_A, FRIEND_B]));
    assert_eq!(body["privateFriends"], json!([PRIVATE]));
    assert_eq!(body["message"], "Found 2 common games with 2 friends");
    // Duplicate friend fetched once
    assert_eq!(upstream.owned_games_calls(), vec![USER, FRIEND_A, PRIVATE, FRIEND_B]);
}

#[tokio::test]
async fn common_games_aborts_on_rate_limit() {
    let (app, upstream) = test_app().await;
    let (status, body) = post_json(
        app,
        "/api/steam/common-games",
        json!({
            "userSteamId": USER,
            "friendSteamIds": [FRIEND_A, RATE_LIMITED, FRIEND_B],
            "apiKey": GOOD_KEY
        }),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["retryAfter"], 120);
    assert_eq!(upstream.owned_games_calls(), vec![USER, FRIEND_A, RATE_LIMITED]);
}

#[tokio::test]
async fn common_games_with_only_private_friends() {
    let (app, _) = test_app().await;
    let (status, body) = post_json(
        app,
        "/api/steam/common-games",
        json!({
            "userSteamId": USER,
            "friendSteamIds": [PRIVATE, FORBIDDEN],
            "apiKey": GOOD_KEY
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["commonGames"], json!([]));
    assert_eq!(body["publicFriends"], json!([]));
    assert_eq!(body["privateFriends"], json!([PRIVATE, FORBIDDEN]));
    assert_eq!(body["message"], "No friends with public profiles found");
}

#[tokio::test]
async fn common_games_needs_friends() {
    let (app, upstream) = test_app().await;
    let (status, body) = post_json(
        app.clone(),
        "/api/steam/common-games",
        json!({ "userSteamId": USER, "friendSteamIds": [], "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Add some friends first to find common games");

    let (status, _) = post_json(
        app,
        "/api/steam/common-games",
        json!({ "userSteamId": USER, "apiKey": GOOD_KEY }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(upstream.owned_games_calls().is_empty());
}
