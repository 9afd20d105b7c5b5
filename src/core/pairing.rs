use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An unordered pair of users in canonical order.
///
/// `low` sorts before `high` by raw byte comparison, so both sides of a
/// relationship map to the same mutual-match row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalPair {
    low: Uuid,
    high: Uuid,
}

impl CanonicalPair {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a.as_bytes() <= b.as_bytes() {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.low == user_id || self.high == user_id
    }
}

impl fmt::Display for CanonicalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}
