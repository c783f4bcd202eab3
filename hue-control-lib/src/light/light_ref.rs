use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Identifier the hub uses to address a light, e.g. `"3"`.
///
/// The hub hands out decimal strings, so ordering is numeric whenever both sides parse as
/// numbers and falls back to plain string order otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightRef(String);

impl LightRef {
    pub fn new(id: impl Into<String>) -> Self {
        LightRef(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// Stable per-light offset used to stagger animations.
    ///
    /// Numeric identifiers use their value. Anything else is folded with FNV-1a, which does
    /// not depend on the process or platform, so runs stay reproducible.
    pub fn stagger_index(&self) -> u64 {
        self.numeric().unwrap_or_else(|| {
            self.0.bytes().fold(FNV_OFFSET, |hash, byte| {
                (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
            }) % 3
        })
    }
}

impl Ord for LightRef {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for LightRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LightRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LightRef {
    fn from(id: &str) -> Self {
        LightRef::new(id)
    }
}

impl From<String> for LightRef {
    fn from(id: String) -> Self {
        LightRef(id)
    }
}
