use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};
use uuid::Uuid;

use cipherchan_crypto::secret_key::{encode_stored, parse_secret_key};
use cipherchan_types::api::{
    Claims, DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, MessageResponse,
};

use crate::channels::member_channel;
use crate::{ApiError, AppState, run_db};

/// Messages returned by the channel listing.
const MESSAGE_LIST_LIMIT: u32 = 50;

/// POST /channels/{channel_id}/encrypt: scramble a message under the
/// channel's map and seed, store the secret key, and hand it back.
///
/// Nothing is stored when the text contains a character outside the map.
pub async fn encrypt_message(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EncryptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required.".into()));
    }

    let message_id = Uuid::new_v4();
    let user_id = claims.sub.to_string();
    let text = req.message.clone();

    let secret_key = run_db(&state, move |s| {
        let channel = member_channel(&s.db, &user_id, channel_id)?;
        let secret_key = channel.cipher(&s.signer).encrypt(&text)?;

        s.db.insert_message(
            &message_id.to_string(),
            channel.id,
            &user_id,
            &encode_stored(&secret_key),
        )?;
        Ok(secret_key)
    })
    .await?;

    info!(
        "{} stored a {}-symbol message in channel {}",
        claims.username,
        secret_key.len(),
        channel_id
    );

    Ok((
        StatusCode::CREATED,
        Json(EncryptResponse {
            message_id,
            channel_id,
            original_message: req.message,
            secret_key,
        }),
    ))
}

/// POST /channels/{channel_id}/decrypt: recover text from a typed secret key.
pub async fn decrypt_message(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DecryptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    let (secret_key, plaintext) = run_db(&state, move |s| {
        let channel = member_channel(&s.db, &user_id, channel_id)?;
        let secret_key = parse_secret_key(&req.secret_key)?;
        let plaintext = channel.cipher(&s.signer).decrypt(&secret_key)?;
        Ok((secret_key, plaintext))
    })
    .await?;

    debug!("{} decoded {} symbols in channel {}", claims.username, secret_key.len(), channel_id);

    Ok(Json(DecryptResponse {
        channel_id,
        secret_key,
        plaintext,
    }))
}

/// GET /channels/{channel_id}/messages: the newest stored secret keys.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    let rows = run_db(&state, move |s| {
        member_channel(&s.db, &user_id, channel_id)?;
        Ok(s.db.get_messages(channel_id, MESSAGE_LIST_LIMIT)?)
    })
    .await?;

    let messages: Vec<MessageResponse> = rows
        .into_iter()
        .map(|row| {
            let message = row.to_model();
            MessageResponse {
                id: message.id,
                channel_id: message.channel_id,
                created_by: message.created_by,
                author_username: row.author_username,
                secret_key: message.secret_key,
                created_at: message.created_at,
            }
        })
        .collect();

    Ok(Json(messages))
}
