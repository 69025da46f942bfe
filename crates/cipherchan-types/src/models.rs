use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a channel. The symbol map never leaves the server in this form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub key: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Messages stored on the server are always scrambled.
/// `secret_key` is the output of the full encode pipeline, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub channel_id: i64,
    pub created_by: Uuid,
    pub secret_key: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

/// Result of presenting a valid channel key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
}

/// Where a channel's symbol map came from on the last load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapSource {
    Stored,
    RecoveredDefault,
}
