//! Fake Steam upstream served on an ephemeral local port

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Form, Query, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http_body_util::BodyExt;
use playtogether_backend::{config::Config, create_app};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const USER: &str = "76561190000000001";
pub const FRIEND_A: &str = "76561190000000002";
pub const FRIEND_B: &str = "76561190000000003";
pub const PRIVATE: &str = "76561190000000004";
pub const FORBIDDEN: &str = "76561190000000403";
pub const RATE_LIMITED: &str = "76561190000000429";
/// Answers 200 with an HTML maintenance page
pub const MAINTENANCE: &str = "76561190000000503";
pub const GOOD_KEY: &str = "good-key";
pub const BAD_KEY: &str = "bad-key";

#[derive(Clone, Default)]
pub struct Upstream {
    /// `steamid` of every GetOwnedGames call, in order
    pub owned_games_calls: Arc<Mutex<Vec<String>>>,
}

impl Upstream {
    pub fn owned_games_calls(&self) -> Vec<String> {
        self.owned_games_calls.lock().unwrap().clone()
    }
}

fn games(ids: &[(u64, &str)]) -> Value {
    let games: Vec<Value> = ids
        .iter()
        .map(|(appid, name)| json!({ "appid": appid, "name": name, "playtime_forever": 10, "img_icon_url": "" }))
        .collect();
    json!({ "response": { "game_count": games.len(), "games": games } })
}

async fn owned_games(State(upstream): State<Upstream>, Query(q): Query<HashMap<String, String>>) -> Response {
    let steam_id = q.get("steamid").cloned().unwrap_or_default();
    upstream.owned_games_calls.lock().unwrap().push(steam_id.clone());

    match steam_id.as_str() {
        USER => Json(games(&[(1, "Alpha"), (2, "Zeta"), (3, "beta")])).into_response(),
        FRIEND_A => Json(games(&[(1, "Alpha"), (3, "beta")])).into_response(),
        FRIEND_B => Json(games(&[(1, "Alpha"), (2, "Zeta"), (3, "beta")])).into_response(),
        FORBIDDEN => (StatusCode::FORBIDDEN, "<html><title>Forbidden</title></html>").into_response(),
        RATE_LIMITED => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "120")],
            "<html><title>429 Too Many Requests</title></html>",
        )
            .into_response(),
        MAINTENANCE => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html")],
            "<html><title>Steam Maintenance</title></html>",
        )
            .into_response(),
        _ => Json(json!({ "response": {} })).into_response(),
    }
}

async fn friend_list(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(q.get("relationship").map(String::as_str), Some("friend"));
    Json(json!({
        "friendslist": { "friends": [
            { "steamid": FRIEND_A, "relationship": "friend", "friend_since": 1 },
            { "steamid": FRIEND_B, "relationship": "friend", "friend_since": 2 }
        ]}
    }))
}

async fn player_summaries(Query(q): Query<HashMap<String, String>>) -> Response {
    if q.get("key").map(String::as_str) == Some(BAD_KEY) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    let players: Vec<Value> = q
        .get("steamids")
        .map(|ids| ids.split(',').collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .map(|id| {
            json!({
                "steamid": id,
                "personaname": format!("Player {}", &id[id.len() - 1..]),
                "avatar": format!("https://avatars.example/{}.jpg", id),
            })
        })
        .collect();
    Json(json!({ "response": { "players": players } })).into_response()
}

async fn resolve_vanity(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    match q.get("vanityurl").map(String::as_str) {
        Some("robin") => Json(json!({ "response": { "success": 1, "steamid": FRIEND_A } })),
        _ => Json(json!({ "response": { "success": 42, "message": "No match" } })),
    }
}

async fn app_details(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let appid = q.get("appids").cloned().unwrap_or_default();
    let mut body = serde_json::Map::new();
    body.insert(appid, json!({ "success": true, "data": { "name": "Alpha", "steam_appid": 1 } }));
    Json(Value::Object(body))
}

async fn check_authentication(Form(form): Form<HashMap<String, String>>) -> String {
    let valid = form.get("openid.mode").map(String::as_str) == Some("check_authentication")
        && form.get("openid.sig").map(String::as_str) == Some("good-signature");
    format!("ns:http://specs.openid.net/auth/2.0\nis_valid:{}\n", valid)
}

/// Start the fake upstream; returns its base URL
pub async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/IPlayerService/GetOwnedGames/v0001/", get(owned_games))
        .route("/ISteamUser/GetFriendList/v0001/", get(friend_list))
        .route("/ISteamUser/GetPlayerSummaries/v0002/", get(player_summaries))
        .route("/ISteamUser/ResolveVanityURL/v0001/", get(resolve_vanity))
        .route("/api/appdetails", get(app_details))
        .route("/openid/login", post(check_authentication))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// App wired to a fresh fake upstream
pub async fn test_app() -> (Router, Upstream) {
    let upstream = Upstream::default();
    let base = spawn_upstream(upstream.clone()).await;
    let config = Config {
        steam_api_base: base.clone(),
        steam_store_base: base.clone(),
        steam_openid_url: format!("{}/openid/login", base),
        ..Config::default()
    };
    (create_app(config), upstream)
}

/// App whose upstream refuses connections
pub fn unreachable_app() -> Router {
    let config = Config {
        steam_api_base: "http://127.0.0.1:1".to_string(),
        ..Config::default()
    };
    create_app(config)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };
    (status, json)
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}
