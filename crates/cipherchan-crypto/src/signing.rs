//! Tamper-evident persisted form of a symbol map: `<json>:<base64url mac>`.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::MapLoadFailure;
use crate::symbol_map::SymbolMap;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = ':';

/// Outcome of reading a channel's stored map.
///
/// A blob that fails verification or parsing yields the default map together
/// with the reason, so the caller decides whether to log or alert. The fallback
/// cannot be told apart from a lost custom map.
#[derive(Debug, Clone)]
pub enum MapLoad {
    Loaded(SymbolMap),
    RecoveredDefault { map: SymbolMap, reason: MapLoadFailure },
}

impl MapLoad {
    pub fn map(&self) -> &SymbolMap {
        match self {
            Self::Loaded(map) | Self::RecoveredDefault { map, .. } => map,
        }
    }

    pub fn into_map(self) -> SymbolMap {
        match self {
            Self::Loaded(map) | Self::RecoveredDefault { map, .. } => map,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::RecoveredDefault { .. })
    }

    pub fn failure(&self) -> Option<&MapLoadFailure> {
        match self {
            Self::Loaded(_) => None,
            Self::RecoveredDefault { reason, .. } => Some(reason),
        }
    }
}

/// Signs and verifies map blobs with a server-side secret.
#[derive(Clone)]
pub struct MapSigner {
    secret: Vec<u8>,
}

impl MapSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take a key of any size")
    }

    pub fn seal(&self, map: &SymbolMap) -> String {
        let json = map.to_json();
        let mut mac = self.mac();
        mac.update(json.as_bytes());
        let signature = B64URL.encode(mac.finalize().into_bytes());
        format!("{json}{SEPARATOR}{signature}")
    }

    /// Verify and parse a blob produced by [`MapSigner::seal`].
    pub fn unseal(&self, blob: &str) -> Result<SymbolMap, MapLoadFailure> {
        let (json, signature) = blob
            .rsplit_once(SEPARATOR)
            .ok_or(MapLoadFailure::BadSignature)?;
        let signature = B64URL
            .decode(signature)
            .map_err(|_| MapLoadFailure::BadSignature)?;

        let mut mac = self.mac();
        mac.update(json.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| MapLoadFailure::BadSignature)?;

        Ok(SymbolMap::from_json(json)?)
    }

    /// Like [`MapSigner::unseal`], falling back to the default map on failure.
    pub fn load(&self, blob: &str) -> MapLoad {
        match self.unseal(blob) {
            Ok(map) => MapLoad::Loaded(map),
            Err(reason) => MapLoad::RecoveredDefault {
                map: SymbolMap::default(),
                reason,
            },
        }
    }
}
