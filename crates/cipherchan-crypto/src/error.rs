use thiserror::Error;

/// Failures of the encode/decode pipeline. Each one is reported back to the
/// requester as-is; none leaves a partial result behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("Unsupported character in text: {0:?}")]
    UnsupportedCharacter(char),

    #[error("Code not in decrypt map: {0}")]
    UnknownCode(i64),

    #[error("Invalid secret key format: {0:?} is not an integer")]
    MalformedKey(String),
}

/// Reasons a character/code table is not a usable symbol map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolMapError {
    #[error("code {code} is assigned to both {first:?} and {second:?}")]
    DuplicateCode { code: i64, first: char, second: char },

    #[error("symbol {0:?} must be exactly one character")]
    InvalidSymbol(String),

    #[error("malformed symbol map: {0}")]
    Malformed(String),
}

/// Why a persisted map blob was replaced by the default map on load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapLoadFailure {
    #[error("signature missing or invalid")]
    BadSignature,

    #[error("signed payload rejected: {0}")]
    Invalid(#[from] SymbolMapError),
}
