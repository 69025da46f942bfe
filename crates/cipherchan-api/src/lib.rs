pub mod auth;
pub mod channels;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod symbol_maps;

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tracing::error;

use cipherchan_crypto::MapSigner;
use cipherchan_db::Database;
use cipherchan_gateway::dispatcher::Dispatcher;

pub use error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Signs and verifies stored symbol maps
    pub signer: MapSigner,
    pub token_ttl: chrono::Duration,
    pub dispatcher: Dispatcher,
}

/// All REST routes. The live WebSocket is mounted by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/channels", get(channels::dashboard).post(channels::create_channel))
        .route("/channels/join", post(channels::join_channel))
        .route("/channels/{channel_id}/encrypt", post(messages::encrypt_message))
        .route("/channels/{channel_id}/decrypt", post(messages::decrypt_message))
        .route("/channels/{channel_id}/messages", get(messages::get_messages))
        .route(
            "/channels/{channel_id}/symbol-map",
            get(symbol_maps::get_symbol_map).put(symbol_maps::update_symbol_map),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    public_routes.merge(protected_routes).with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run blocking DB work off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("blocking task failed"))
        })?
}
