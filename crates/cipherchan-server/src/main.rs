mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cipherchan_api::channels::member_channel;
use cipherchan_api::middleware::decode_token;
use cipherchan_api::{ApiError, AppState, AppStateInner, run_db};
use cipherchan_crypto::MapSigner;
use cipherchan_gateway::connection;
use cipherchan_gateway::dispatcher::Dispatcher;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct LiveQuery {
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cipherchan=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = cipherchan_db::Database::open(&config.db_path)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        signer: MapSigner::new(&config.signing_secret),
        token_ttl: chrono::Duration::days(config.token_ttl_days),
        dispatcher: Dispatcher::new(),
    });

    let live_route = Router::new()
        .route("/channels/{channel_id}/live", get(live_upgrade))
        .with_state(state.clone());

    let app = Router::new()
        .merge(cipherchan_api::router(state))
        .merge(live_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("cipherchan server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// GET /channels/{channel_id}/live?token=JWT: browsers cannot set headers on
/// WebSocket requests, so the token rides in the query string. Token and
/// membership are checked before the upgrade.
async fn live_upgrade(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Query(query): Query<LiveQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let claims = decode_token(&state.jwt_secret, &query.token)?;

    let user_id = claims.sub.to_string();
    run_db(&state, move |s| member_channel(&s.db, &user_id, channel_id).map(|_| ())).await?;

    let dispatcher = state.dispatcher.clone();
    Ok(ws
        .on_upgrade(move |socket| {
            connection::handle_connection(socket, dispatcher, channel_id, claims.sub, claims.username)
        })
        .into_response())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
