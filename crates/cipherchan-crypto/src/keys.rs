use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use rand::RngCore;

/// Random bytes behind a channel join key.
pub const CHANNEL_KEY_BYTES: usize = 16;

/// Generate a channel join key: 16 random bytes, base64url without padding
/// (22 characters). Holding it is the only credential needed to join.
pub fn generate_channel_key() -> String {
    let mut key = [0u8; CHANNEL_KEY_BYTES];
    rand::rng().fill_bytes(&mut key);
    BASE64URL.encode(key)
}
