use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use cipherchan_crypto::SymbolMap;
use cipherchan_db::Database;
use cipherchan_db::models::ChannelRow;
use cipherchan_types::api::{
    Claims, CreateChannelRequest, DashboardResponse, JoinChannelRequest, JoinChannelResponse,
};
use cipherchan_types::models::JoinOutcome;

use crate::{ApiError, AppState, run_db};

const MAX_CHANNEL_NAME: usize = 100;
const MAX_CHANNEL_KEY: usize = 32;

/// Load a channel the user belongs to. Unknown channels are 404, channels the
/// user has not joined are 403, whatever else the request carries.
pub fn member_channel(db: &Database, user_id: &str, channel_id: i64) -> Result<ChannelRow, ApiError> {
    let channel = db
        .get_channel(channel_id)?
        .ok_or_else(|| ApiError::NotFound("Channel not found.".into()))?;

    if !db.is_member(user_id, channel_id)? {
        return Err(ApiError::not_a_member());
    }

    Ok(channel)
}

/// GET /channels: the caller's channels.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = run_db(&state, move |s| Ok(s.db.channels_for_user(&user_id)?)).await?;

    let channels: Vec<_> = rows.iter().map(ChannelRow::to_model).collect();
    Ok(Json(DashboardResponse {
        total_channels: channels.len(),
        channels,
    }))
}

/// POST /channels: create a channel with the default symbol map; the creator
/// becomes its first member.
pub async fn create_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_CHANNEL_NAME {
        return Err(ApiError::BadRequest(format!(
            "Channel name must be 1 to {} characters.",
            MAX_CHANNEL_NAME
        )));
    }

    let creator_id = claims.sub.to_string();
    let channel = run_db(&state, move |s| {
        let sealed_map = s.signer.seal(&SymbolMap::default());
        Ok(s.db.create_channel(&name, &creator_id, None, &sealed_map)?)
    })
    .await?;

    info!("{} created channel \"{}\" ({})", claims.username, channel.name, channel.id);

    Ok((StatusCode::CREATED, Json(channel.to_model())))
}

/// POST /channels/join: join with a channel key. Joining twice is harmless and
/// reported as `already_member` (200) instead of `joined` (201).
pub async fn join_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = req.channel_key.trim().to_string();
    if key.is_empty() {
        return Err(ApiError::BadRequest("Channel key is required.".into()));
    }
    if key.len() > MAX_CHANNEL_KEY {
        return Err(ApiError::NotFound("Invalid channel key.".into()));
    }

    let user_id = claims.sub.to_string();
    let (channel, outcome) = run_db(&state, move |s| {
        let channel = s
            .db
            .get_channel_by_key(&key)?
            .ok_or_else(|| ApiError::NotFound("Invalid channel key.".into()))?;
        let outcome = s.db.join_channel(&user_id, channel.id)?;
        Ok((channel, outcome))
    })
    .await?;

    let (status, message) = match outcome {
        JoinOutcome::Joined => {
            info!("{} joined channel \"{}\" ({})", claims.username, channel.name, channel.id);
            (StatusCode::CREATED, format!("Successfully joined channel \"{}\"!", channel.name))
        }
        JoinOutcome::AlreadyMember => (
            StatusCode::OK,
            format!("You are already a member of \"{}\".", channel.name),
        ),
    };

    Ok((
        status,
        Json(JoinChannelResponse {
            outcome,
            channel: channel.to_model(),
            message,
        }),
    ))
}
