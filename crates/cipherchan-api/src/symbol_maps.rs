use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::warn;

use cipherchan_crypto::SymbolMap;
use cipherchan_types::api::{Claims, SymbolMapResponse, UpdateSymbolMapRequest};
use cipherchan_types::models::MapSource;

use crate::channels::member_channel;
use crate::{ApiError, AppState, run_db};

/// GET /channels/{channel_id}/symbol-map: the map in force, and whether it
/// had to be recovered to the default because the stored blob was unusable.
pub async fn get_symbol_map(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    let load = run_db(&state, move |s| {
        let channel = member_channel(&s.db, &user_id, channel_id)?;
        Ok(channel.symbol_map(&s.signer))
    })
    .await?;

    let (source, reason) = match load.failure() {
        None => (MapSource::Stored, None),
        Some(reason) => (MapSource::RecoveredDefault, Some(reason.to_string())),
    };

    Ok(Json(SymbolMapResponse {
        channel_id,
        source,
        reason,
        symbols: load.map().to_string_keys(),
    }))
}

/// PUT /channels/{channel_id}/symbol-map: install a custom map. Creator only.
///
/// Maps that assign one code to two symbols are refused here, at write time.
/// Messages stored under the previous map stop decoding.
pub async fn update_symbol_map(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateSymbolMapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let map = SymbolMap::from_string_keys(&req.symbols)
        .map_err(|e| ApiError::BadRequest(format!("Invalid symbol map: {}", e)))?;
    if map.is_empty() {
        return Err(ApiError::BadRequest("Symbol map must not be empty.".into()));
    }

    let user_id = claims.sub.to_string();
    let symbols = map.to_string_keys();

    run_db(&state, move |s| {
        let channel = member_channel(&s.db, &user_id, channel_id)?;
        if channel.creator_id != user_id {
            return Err(ApiError::Forbidden(
                "Only the channel creator can change its symbol map.".into(),
            ));
        }
        s.db.set_symbol_map(channel.id, &s.signer.seal(&map))?;
        Ok(())
    })
    .await?;

    warn!(
        "{} replaced the symbol map of channel {} ({} symbols); earlier messages may no longer decode",
        claims.username,
        channel_id,
        symbols.len()
    );

    Ok(Json(SymbolMapResponse {
        channel_id,
        source: MapSource::Stored,
        reason: None,
        symbols,
    }))
}
