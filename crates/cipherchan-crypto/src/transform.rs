//! The three-stage pipeline: text -> codes -> channel-keyed secret, and back.
//!
//! Everything here is pure. The only state is the keystream, rebuilt from the
//! channel seed on every call.

use crate::error::TransformError;
use crate::keystream::Keystream;
use crate::symbol_map::SymbolMap;

/// Stage 1: lower-case `text` and look every character up in `map`.
pub fn text_to_codes(text: &str, map: &SymbolMap) -> Result<Vec<i64>, TransformError> {
    text.to_lowercase()
        .chars()
        .map(|c| map.code_for(c).ok_or(TransformError::UnsupportedCharacter(c)))
        .collect()
}

/// Stage 2 forward: XOR each code with the next draw of the channel keystream.
pub fn codes_to_secret(codes: &[i64], channel_id: i64) -> Vec<i64> {
    apply_keystream(codes, channel_id)
}

/// Stage 2 reverse. XOR is its own inverse, so this replays the same stream
/// from the same seed with the same number of draws.
pub fn secret_to_codes(secret: &[i64], channel_id: i64) -> Vec<i64> {
    apply_keystream(secret, channel_id)
}

fn apply_keystream(values: &[i64], channel_id: i64) -> Vec<i64> {
    values
        .iter()
        .zip(Keystream::for_channel(channel_id))
        .map(|(value, draw)| value ^ draw)
        .collect()
}

/// Stage 3: map codes back to characters.
pub fn codes_to_text(codes: &[i64], map: &SymbolMap) -> Result<String, TransformError> {
    codes
        .iter()
        .map(|&code| map.symbol_for(code).ok_or(TransformError::UnknownCode(code)))
        .collect()
}

/// Text to secret key under `channel_id`'s seed and `map`.
pub fn full_encrypt(text: &str, map: &SymbolMap, channel_id: i64) -> Result<Vec<i64>, TransformError> {
    let codes = text_to_codes(text, map)?;
    Ok(codes_to_secret(&codes, channel_id))
}

/// Secret key back to (lower-cased) text.
pub fn full_decrypt(secret: &[i64], map: &SymbolMap, channel_id: i64) -> Result<String, TransformError> {
    let codes = secret_to_codes(secret, channel_id);
    codes_to_text(&codes, map)
}

/// A channel's identity and symbol map bundled for the pipeline.
#[derive(Debug, Clone)]
pub struct ChannelCipher {
    channel_id: i64,
    map: SymbolMap,
}

impl ChannelCipher {
    pub fn new(channel_id: i64, map: SymbolMap) -> Self {
        Self { channel_id, map }
    }

    pub fn channel_id(&self) -> i64 {
        self.channel_id
    }

    pub fn symbol_map(&self) -> &SymbolMap {
        &self.map
    }

    pub fn encrypt(&self, text: &str) -> Result<Vec<i64>, TransformError> {
        full_encrypt(text, &self.map, self.channel_id)
    }

    pub fn decrypt(&self, secret: &[i64]) -> Result<String, TransformError> {
        full_decrypt(secret, &self.map, self.channel_id)
    }
}
