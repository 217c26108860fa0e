//! Entity replacement dictionaries
//!
//! Two name-to-replacement maps: one for forward parsing and one for reverse
//! parsing, the latter holding every name and replacement character-reversed.
//!
//! The pre-reversed reverse map is load-bearing: reverse parsing appends
//! replacement text into a buffer that is reversed once at emission, so the
//! stored replacement must already be reversed. Reversing each replacement at
//! lookup time would be equivalent but would hide that invariant.

use std::collections::HashMap;

use memchr::memchr2;

use crate::error::{Error, Result};

/// The five predefined XML entities. Registering any of these names is an
/// error.
const PREDEFINED: [(&str, &str); 5] = [
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("apos", "'"),
    ("quot", "\""),
];

/// Forward and reverse entity replacement maps.
pub struct EntityDictionary {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl EntityDictionary {
    /// Create the dictionaries seeded with the predefined entities, stored
    /// forwards in one map and character-reversed in the other (`amp` -> `&`
    /// alongside `pma` -> `&`).
    pub fn new() -> Self {
        let mut forward = HashMap::new();
        let mut reverse = HashMap::new();

        for (name, replacement) in PREDEFINED {
            forward.insert(name.to_string(), replacement.to_string());
            reverse.insert(reversed(name), reversed(replacement));
        }

        EntityDictionary { forward, reverse }
    }

    /// Register a user entity in both maps.
    ///
    /// The name must be non-empty, must not collide with a predefined entity
    /// name, and must not contain the entity delimiters `&` or `;`.
    pub fn register(&mut self, name: &str, replacement: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("entity name is empty".to_string()));
        }

        if PREDEFINED.iter().any(|(predefined, _)| *predefined == name) {
            return Err(Error::InvalidArgument(format!(
                "redefinition of predefined entity '{}'",
                name
            )));
        }

        if memchr2(b'&', b';', name.as_bytes()).is_some() {
            return Err(Error::InvalidArgument(format!(
                "entity name '{}' contains a delimiter byte",
                name
            )));
        }

        self.forward.insert(name.to_string(), replacement.to_string());
        self.reverse.insert(reversed(name), reversed(replacement));

        Ok(())
    }

    /// Look up a name scanned in document order.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.forward.get(name).map(String::as_str)
    }

    /// Look up a name as accumulated by the reverse scanner (i.e. already
    /// reversed). The returned replacement is reversed as well.
    pub fn resolve_reversed(&self, name: &str) -> Option<&str> {
        self.reverse.get(name).map(String::as_str)
    }
}

impl Default for EntityDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// Character-wise reversal.
fn reversed(s: &str) -> String {
    s.chars().rev().collect()
}
