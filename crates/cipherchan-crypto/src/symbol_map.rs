use std::collections::{BTreeMap, HashMap};

use crate::error::SymbolMapError;

/// Canonical default table. Messages of every channel that never installed a
/// custom map are only recoverable against these exact assignments.
pub const DEFAULT_SYMBOLS: [(char, i64); 42] = [
    ('a', 1111), ('b', 5411), ('c', 6888), ('d', 6666), ('e', 2091),
    ('f', 3101), ('g', 6212), ('h', 7480), ('i', 1021), ('j', 5090),
    ('k', 2780), ('l', 9710), ('m', 8301), ('n', 6571), ('o', 3551),
    ('p', 4201), ('q', 3441), ('r', 4910), ('s', 7010), ('t', 3912),
    ('u', 8421), ('v', 8120), ('w', 6630), ('x', 7021), ('y', 4530),
    ('z', 9780), (' ', 1119), ('.', 9998), (',', 8889), ('!', 7779),
    ('?', 6670), ('\'', 7777), ('0', 1000), ('1', 2000), ('2', 3000),
    ('3', 4000), ('4', 5000), ('5', 6000), ('6', 7000), ('7', 8000),
    ('8', 9000), ('9', 1500),
];

/// A bijection between single characters and integer codes.
///
/// Construction rejects duplicate codes, so a value of this type always
/// decodes unambiguously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMap {
    forward: BTreeMap<char, i64>,
    reverse: HashMap<i64, char>,
}

impl SymbolMap {
    pub fn new<I>(entries: I) -> Result<Self, SymbolMapError>
    where
        I: IntoIterator<Item = (char, i64)>,
    {
        let mut forward = BTreeMap::new();
        let mut reverse = HashMap::new();

        for (symbol, code) in entries {
            // A later entry for the same symbol replaces the earlier one
            if let Some(old) = forward.insert(symbol, code) {
                reverse.remove(&old);
            }
            if let Some(&first) = reverse.get(&code) {
                if first != symbol {
                    return Err(SymbolMapError::DuplicateCode { code, first, second: symbol });
                }
            }
            reverse.insert(code, symbol);
        }

        Ok(Self { forward, reverse })
    }

    /// Build from string keys, as found in JSON objects and API requests.
    pub fn from_string_keys<'a, I>(entries: I) -> Result<Self, SymbolMapError>
    where
        I: IntoIterator<Item = (&'a String, &'a i64)>,
    {
        let mut pairs = Vec::new();
        for (key, &code) in entries {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => pairs.push((c, code)),
                _ => return Err(SymbolMapError::InvalidSymbol(key.clone())),
            }
        }
        Self::new(pairs)
    }

    pub fn code_for(&self, symbol: char) -> Option<i64> {
        self.forward.get(&symbol).copied()
    }

    pub fn symbol_for(&self, code: i64) -> Option<char> {
        self.reverse.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, i64)> + '_ {
        self.forward.iter().map(|(&c, &code)| (c, code))
    }

    pub fn to_string_keys(&self) -> BTreeMap<String, i64> {
        self.iter().map(|(c, code)| (c.to_string(), code)).collect()
    }

    pub fn to_json(&self) -> String {
        // BTreeMap<String, i64> always serializes
        serde_json::to_string(&self.to_string_keys()).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, SymbolMapError> {
        let raw: BTreeMap<String, i64> =
            serde_json::from_str(json).map_err(|e| SymbolMapError::Malformed(e.to_string()))?;
        Self::from_string_keys(&raw)
    }
}

impl Default for SymbolMap {
    fn default() -> Self {
        let forward: BTreeMap<char, i64> = DEFAULT_SYMBOLS.into_iter().collect();
        let reverse = DEFAULT_SYMBOLS.into_iter().map(|(c, code)| (code, c)).collect();
        Self { forward, reverse }
    }
}
