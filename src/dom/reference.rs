use crate::error::BrowserError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Address of one node in one snapshot generation.
///
/// Rendered as `f{frame}s{generation}e{ordinal}`, e.g. `f0s3e12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    /// 0 for the main frame, then child frames in depth-first discovery order
    pub frame: usize,

    /// Snapshot generation the reference was minted in
    pub generation: u64,

    /// 1-based pre-order position within the frame
    pub ordinal: usize,
}

impl Reference {
    pub fn new(frame: usize, generation: u64, ordinal: usize) -> Self {
        Self { frame, generation, ordinal }
    }

    /// Frame and ordinal, which stay equal across captures of an unchanged page
    pub fn address(&self) -> (usize, usize) {
        (self.frame, self.ordinal)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}s{}e{}", self.frame, self.generation, self.ordinal)
    }
}

impl FromStr for Reference {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            BrowserError::InvalidReference(format!(
                "'{}' is not a snapshot reference (expected a value like f0s1e5)",
                s
            ))
        };

        let rest = s.trim().strip_prefix('f').ok_or_else(invalid)?;
        let (frame, rest) = rest.split_once('s').ok_or_else(invalid)?;
        let (generation, ordinal) = rest.split_once('e').ok_or_else(invalid)?;

        let parse = |part: &str| -> Option<u64> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse().ok()
        };

        let frame = parse(frame).ok_or_else(invalid)? as usize;
        let generation = parse(generation).ok_or_else(invalid)?;
        let ordinal = parse(ordinal).ok_or_else(invalid)? as usize;

        if ordinal == 0 {
            return Err(invalid());
        }

        Ok(Self { frame, generation, ordinal })
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
