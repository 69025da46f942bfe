use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent over a channel's live WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the upgrade was authenticated and the socket is subscribed
    Ready {
        user_id: Uuid,
        username: String,
        channel_id: i64,
    },

    /// A chat line, already prefixed with its `[YYYY-MM-DD HH:MM:SS]` stamp
    ChannelMessage { channel_id: i64, message: String },
}

impl GatewayEvent {
    /// Returns the channel this event belongs to.
    pub fn channel_id(&self) -> i64 {
        match self {
            Self::Ready { channel_id, .. } => *channel_id,
            Self::ChannelMessage { channel_id, .. } => *channel_id,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Publish a line to everyone subscribed to this channel
    Send { message: String },
}
