use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Channel, JoinOutcome, MapSource};

// -- JWT Claims --

/// JWT claims shared across cipherchan-api (REST middleware) and the
/// WebSocket upgrade in cipherchan-server. Canonical definition lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinChannelRequest {
    pub channel_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinChannelResponse {
    pub outcome: JoinOutcome,
    pub channel: Channel,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub channels: Vec<Channel>,
    pub total_channels: usize,
}

// -- Encode / decode --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub message_id: Uuid,
    pub channel_id: i64,
    pub original_message: String,
    pub secret_key: Vec<i64>,
}

/// `secret_key` is what a person typed: comma-separated integers,
/// optionally wrapped in one pair of brackets.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecryptRequest {
    pub secret_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub channel_id: i64,
    pub secret_key: Vec<i64>,
    pub plaintext: String,
}

// -- Messages --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub channel_id: i64,
    pub created_by: Uuid,
    pub author_username: String,
    pub secret_key: Vec<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Symbol maps --

#[derive(Debug, Serialize, Deserialize)]
pub struct SymbolMapResponse {
    pub channel_id: i64,
    pub source: MapSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub symbols: BTreeMap<String, i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSymbolMapRequest {
    pub symbols: BTreeMap<String, i64>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
