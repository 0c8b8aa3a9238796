//! Content fingerprinting and per-controller change detection
//!
//! A fingerprint is the SHA-256 digest of the canonical encoding of
//! (collected objects, controller metadata, controller spec), in that fixed
//! order. It is always recomputed from scratch. The [`HashTable`] maps each
//! controller name to the fingerprint of its last fully successful cycle and
//! is owned by the tick driver; it starts empty, so every controller gets one
//! unconditional apply after a restart.

use std::collections::HashMap;
use std::fmt;

use serde_yaml::Value;
use sha2::{Digest, Sha256};

use crate::canonical::to_canonical_string;
use crate::Result;

/// Sentinel stored by [`HashTable::invalidate`]; never equal to a real
/// fingerprint (real fingerprints are 64 hex characters)
const INVALID: &str = "";

/// Content hash of a collected object set plus controller metadata and spec
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The lowercase hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint for one controller cycle
///
/// The three parts are canonicalized and concatenated in fixed order, then
/// hashed. The encoding is deterministic for equal values; any enumeration
/// order differences in the collected set flow through unchanged and show up
/// as a different fingerprint.
///
/// # Errors
///
/// Returns [`crate::Error::Serialization`] if any part cannot be
/// canonicalized.
pub fn fingerprint(objects: &[Value], metadata: &Value, spec: &Value) -> Result<Fingerprint> {
    let objects = Value::Sequence(objects.to_vec());
    let mut text = to_canonical_string(&objects)?;
    text.push_str(&to_canonical_string(metadata)?);
    text.push_str(&to_canonical_string(spec)?);

    let digest = Sha256::digest(text.as_bytes());
    Ok(Fingerprint(format!("{:x}", digest)))
}

/// Per-controller table of last-committed fingerprints
///
/// Entries are created on first success, updated on change, cleared (set to
/// a sentinel) on failure, and never otherwise removed.
#[derive(Debug, Default)]
pub struct HashTable {
    entries: HashMap<String, String>,
}

impl HashTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// False iff an entry for `name` exists and equals `fingerprint`;
    /// true otherwise, including on first sighting
    pub fn should_proceed(&self, name: &str, fingerprint: &Fingerprint) -> bool {
        self.entries.get(name).map(String::as_str) != Some(fingerprint.as_str())
    }

    /// Record a fully successful render+apply for `name`
    pub fn commit(&mut self, name: &str, fingerprint: &Fingerprint) {
        self.entries
            .insert(name.to_string(), fingerprint.as_str().to_string());
    }

    /// Force the next tick to run the full pipeline for `name`
    pub fn invalidate(&mut self, name: &str) {
        self.entries.insert(name.to_string(), INVALID.to_string());
    }

    /// Number of controllers with an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no controller has an entry yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
