//! Database row types. These map directly to SQLite rows and stay distinct
//! from the cipherchan-types API models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use cipherchan_crypto::secret_key::decode_stored;
use cipherchan_crypto::{ChannelCipher, MapLoad, MapSigner};
use cipherchan_types::models::{Channel, StoredMessage};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ChannelRow {
    pub id: i64,
    pub name: String,
    pub key: String,
    pub creator_id: String,
    pub encrypted_custom_map: String,
    pub created_at: String,
}

impl ChannelRow {
    /// The channel's current symbol map, or the default one if the stored
    /// blob does not verify.
    pub fn symbol_map(&self, signer: &MapSigner) -> MapLoad {
        let load = signer.load(&self.encrypted_custom_map);
        if let Some(reason) = load.failure() {
            warn!(
                "Channel {} ({}): stored symbol map unusable ({}), using default map",
                self.id, self.name, reason
            );
        }
        load
    }

    /// Seed identity and map bundled for the transform pipeline.
    pub fn cipher(&self, signer: &MapSigner) -> ChannelCipher {
        ChannelCipher::new(self.id, self.symbol_map(signer).into_map())
    }

    pub fn to_model(&self) -> Channel {
        Channel {
            id: self.id,
            name: self.name.clone(),
            key: self.key.clone(),
            creator_id: parse_uuid(&self.creator_id, "creator_id"),
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

pub struct MessageRow {
    pub id: String,
    pub channel_id: i64,
    pub created_by: String,
    pub author_username: String,
    pub encrypted_data: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn to_model(&self) -> StoredMessage {
        StoredMessage {
            id: parse_uuid(&self.id, "message id"),
            channel_id: self.channel_id,
            created_by: parse_uuid(&self.created_by, "created_by"),
            secret_key: decode_stored(&self.encrypted_data).unwrap_or_else(|e| {
                warn!("Corrupt encrypted_data on message '{}': {}", self.id, e);
                Vec::new()
            }),
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
