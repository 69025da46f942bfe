//! End-to-end tests for the REST surface: auth, channel directory, and the
//! encode/decode pipeline behind membership checks.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use cipherchan_api::{AppState, AppStateInner, router};
use cipherchan_crypto::{MapSigner, SymbolMap, full_encrypt};
use cipherchan_db::Database;
use cipherchan_gateway::dispatcher::Dispatcher;

fn setup() -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        jwt_secret: "test-jwt-secret".into(),
        signer: MapSigner::new("test-signing-secret"),
        token_ttl: chrono::Duration::days(1),
        dispatcher: Dispatcher::new(),
    });
    (router(state.clone()), state)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse battery",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_channel(app: &Router, token: &str, name: &str) -> Value {
    let (status, body) = call(app, "POST", "/channels", Some(token), Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn secret_of(body: &Value) -> Vec<i64> {
    body["secret_key"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn encrypt_then_decrypt_round_trip() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    let channel = create_channel(&app, &alice, "general").await;
    let id = channel["id"].as_i64().unwrap();
    assert_eq!(channel["key"].as_str().unwrap().len(), 22);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/channels/{id}/encrypt"),
        Some(&alice),
        Some(json!({ "message": "Hello, World!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let secret = secret_of(&body);
    assert_eq!(secret, full_encrypt("Hello, World!", &SymbolMap::default(), id).unwrap());
    assert_eq!(body["original_message"], "Hello, World!");

    let typed = format!("[{}]", secret.iter().map(i64::to_string).collect::<Vec<_>>().join(", "));
    let (status, body) = call(
        &app,
        "POST",
        &format!("/channels/{id}/decrypt"),
        Some(&alice),
        Some(json!({ "secret_key": typed })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["plaintext"], "hello, world!");

    let (status, body) = call(&app, "GET", &format!("/channels/{id}/messages"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["author_username"], "alice");
    assert_eq!(secret_of(&messages[0]), secret);
}

#[tokio::test]
async fn first_channel_scrambles_with_seed_12346() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    let channel = create_channel(&app, &alice, "first").await;
    assert_eq!(channel["id"], 1);

    let (_, body) = call(&app, "POST", "/channels/1/encrypt", Some(&alice), Some(json!({ "message": "a" }))).await;
    assert_eq!(secret_of(&body), vec![9691]);

    let (_, body) = call(&app, "POST", "/channels/1/decrypt", Some(&alice), Some(json!({ "secret_key": "9691" }))).await;
    assert_eq!(body["plaintext"], "a");
}

#[tokio::test]
async fn unsupported_character_is_not_stored() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    let id = create_channel(&app, &alice, "general").await["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/channels/{id}/encrypt"),
        Some(&alice),
        Some(json!({ "message": "costs $5" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported character in text: '$'");

    let (_, body) = call(&app, "GET", &format!("/channels/{id}/messages"), Some(&alice), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn decrypt_input_errors() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    create_channel(&app, &alice, "general").await;

    let (status, body) = call(&app, "POST", "/channels/1/decrypt", Some(&alice), Some(json!({ "secret_key": "12, abc, 34" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid secret key format"));

    // 1 ^ 8588 has no symbol
    let (status, body) = call(&app, "POST", "/channels/1/decrypt", Some(&alice), Some(json!({ "secret_key": "[1]" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Code not in decrypt map: 8589");

    let (status, body) = call(&app, "POST", "/channels/1/decrypt", Some(&alice), Some(json!({ "secret_key": "" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plaintext"], "");
}

#[tokio::test]
async fn non_members_are_refused() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let id = create_channel(&app, &alice, "private").await["id"].as_i64().unwrap();

    for (method, path, body) in [
        ("POST", "encrypt", Some(json!({ "message": "hi" }))),
        ("POST", "decrypt", Some(json!({ "secret_key": "[9691]" }))),
        ("GET", "messages", None),
        ("GET", "symbol-map", None),
    ] {
        let (status, resp) = call(&app, method, &format!("/channels/{id}/{path}"), Some(&bob), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        assert_eq!(resp["error"], "You are not a member of this channel.");
    }

    let (status, _) = call(&app, "GET", "/channels/999/messages", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn joining_is_idempotent() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let channel = create_channel(&app, &alice, "general").await;
    let id = channel["id"].as_i64().unwrap();
    let key = channel["key"].as_str().unwrap();

    let (_, sent) = call(&app, "POST", &format!("/channels/{id}/encrypt"), Some(&alice), Some(json!({ "message": "see you at 5" }))).await;

    let (status, body) = call(&app, "POST", "/channels/join", Some(&bob), Some(json!({ "channel_key": key }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "joined");

    let (status, body) = call(&app, "POST", "/channels/join", Some(&bob), Some(json!({ "channel_key": key }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "already_member");

    let (status, body) = call(&app, "POST", "/channels/join", Some(&bob), Some(json!({ "channel_key": "not-a-key" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid channel key.");

    // Members share the channel's map and seed
    let typed = secret_of(&sent).iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    let (status, body) = call(&app, "POST", &format!("/channels/{id}/decrypt"), Some(&bob), Some(json!({ "secret_key": typed }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plaintext"], "see you at 5");

    let (_, body) = call(&app, "GET", "/channels", Some(&bob), None).await;
    assert_eq!(body["total_channels"], 1);
    assert_eq!(body["channels"][0]["name"], "general");
}

#[tokio::test]
async fn channel_names_are_unique() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    create_channel(&app, &alice, "general").await;

    let (status, _) = call(&app, "POST", "/channels", Some(&alice), Some(json!({ "name": "general" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "POST", "/channels", Some(&alice), Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auth_is_required() {
    let (app, _) = setup();

    let (status, _) = call(&app, "GET", "/channels", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/channels", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_and_login() {
    let (app, _) = setup();
    register(&app, "alice").await;

    let (status, _) = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "email": "other@example.com", "password": "long enough pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "carol", "email": "nope", "password": "long enough pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "POST", "/auth/login", None, Some(json!({ "username": "alice", "password": "wrong password" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, "POST", "/auth/login", None, Some(json!({ "username": "alice", "password": "correct horse battery" }))).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, _) = call(&app, "GET", "/channels", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn custom_symbol_maps() {
    let (app, _) = setup();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let channel = create_channel(&app, &alice, "money").await;
    let id = channel["id"].as_i64().unwrap();
    call(&app, "POST", "/channels/join", Some(&bob), Some(json!({ "channel_key": channel["key"] }))).await;

    let (status, body) = call(&app, "GET", &format!("/channels/{id}/symbol-map"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "stored");
    assert_eq!(body["symbols"]["a"], 1111);

    let uri = format!("/channels/{id}/symbol-map");
    let (status, _) = call(&app, "PUT", &uri, Some(&bob), Some(json!({ "symbols": { "$": 10 } }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "PUT", &uri, Some(&alice), Some(json!({ "symbols": { "a": 10, "b": 10 } }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("code 10"));

    let (status, _) = call(&app, "PUT", &uri, Some(&alice), Some(json!({ "symbols": { "ab": 10 } }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "PUT", &uri, Some(&alice), Some(json!({ "symbols": { "$": 10, "5": 20 } }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", &format!("/channels/{id}/encrypt"), Some(&bob), Some(json!({ "message": "$5" }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let typed = secret_of(&body).iter().map(i64::to_string).collect::<Vec<_>>().join(",");

    let (_, body) = call(&app, "POST", &format!("/channels/{id}/decrypt"), Some(&alice), Some(json!({ "secret_key": typed }))).await;
    assert_eq!(body["plaintext"], "$5");
}

#[tokio::test]
async fn corrupt_stored_map_falls_back_to_default() {
    let (app, state) = setup();
    let alice = register(&app, "alice").await;
    let id = create_channel(&app, &alice, "general").await["id"].as_i64().unwrap();

    state.db.set_symbol_map(id, "{\"a\":1}:forged").unwrap();

    let (_, body) = call(&app, "GET", &format!("/channels/{id}/symbol-map"), Some(&alice), None).await;
    assert_eq!(body["source"], "recovered_default");
    assert!(body["reason"].is_string());

    let (status, body) = call(&app, "POST", &format!("/channels/{id}/encrypt"), Some(&alice), Some(json!({ "message": "a" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(secret_of(&body), full_encrypt("a", &SymbolMap::default(), id).unwrap());
}
