use serde::Deserialize;

use crate::error::TransformError;

/// Parse a secret key as a person types it: `1, 2, 3` or `[1,2,3]`.
///
/// Blank input is an empty key. Any element that is not an integer fails the
/// whole parse.
pub fn parse_secret_key(input: &str) -> Result<Vec<i64>, TransformError> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed)
        .trim();

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i64>()
                .map_err(|_| TransformError::MalformedKey(part.to_string()))
        })
        .collect()
}

/// Element of a stored sequence: older rows may carry numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCode {
    Int(i64),
    Text(String),
}

/// Serialize a secret key for the `encrypted_data` column.
pub fn encode_stored(secret: &[i64]) -> String {
    serde_json::to_string(secret).unwrap_or_else(|_| "[]".into())
}

/// Read back an `encrypted_data` column.
pub fn decode_stored(data: &str) -> Result<Vec<i64>, TransformError> {
    let raw: Vec<StoredCode> =
        serde_json::from_str(data).map_err(|_| TransformError::MalformedKey(data.to_string()))?;

    raw.into_iter()
        .map(|code| match code {
            StoredCode::Int(n) => Ok(n),
            StoredCode::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| TransformError::MalformedKey(s.clone())),
        })
        .collect()
}
