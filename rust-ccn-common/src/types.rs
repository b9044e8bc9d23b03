//! Identifiers and limits shared between the forwarding tables and the
//! applications attached to them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default content store capacity, in entries.
pub const MAX_CS_ENTRIES: usize = 4096;

/// Lifetime applied to Interests that carry none.
pub const DEFAULT_INTEREST_LIFETIME_MS: u64 = 4000;

/// Upper bound applied to the lifetime an Interest asks for.
pub const MAX_INTEREST_LIFETIME_MS: u64 = 120_000;

/// Unique identifier for a face: one consumer-side attachment point that
/// sends Interests and receives answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u32);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaceId({})", self.0)
    }
}

/// Unique identifier for a registered producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProducerId(pub u32);

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProducerId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(FaceId(7).to_string(), "FaceId(7)");
        assert_eq!(ProducerId(1).to_string(), "ProducerId(1)");
    }
}
