//! cipherchan Crypto Library
//!
//! Reversible per-channel obfuscation of chat text. This is NOT encryption in
//! the cryptographic sense: it only keeps plaintext from sitting at rest.
//!
//! Pipeline: text -> symbol codes (per-channel [`SymbolMap`]) -> XOR with a
//! keystream seeded from the channel id -> secret key. Decoding runs the same
//! stages backwards.

pub mod error;
pub mod keys;
pub mod keystream;
pub mod secret_key;
pub mod signing;
pub mod symbol_map;
pub mod transform;

pub use error::{MapLoadFailure, SymbolMapError, TransformError};
pub use signing::{MapLoad, MapSigner};
pub use symbol_map::SymbolMap;
pub use transform::{ChannelCipher, full_decrypt, full_encrypt};
