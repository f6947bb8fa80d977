//! Order partition selection.

use serde::{Deserialize, Serialize};

use crate::trip::TripId;

/// Prefixes of high-speed services stored in the primary partition.
pub const DEFAULT_PRIMARY_PREFIXES: &str = "GD";

/// One of the two order partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shard {
    /// High-speed (fast-class) orders.
    Primary,
    /// Every other order.
    Secondary,
}

impl Shard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shard::Primary => "primary",
            Shard::Secondary => "secondary",
        }
    }

    /// The opposite partition.
    pub fn other(&self) -> Shard {
        match self {
            Shard::Primary => Shard::Secondary,
            Shard::Secondary => Shard::Primary,
        }
    }
}

impl std::fmt::Display for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps trip identifiers to partitions by their leading character.
///
/// Total and pure: empty or malformed ids land in [`Shard::Secondary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardResolver {
    primary_prefixes: Vec<char>,
}

impl ShardResolver {
    pub fn new(primary_prefixes: impl IntoIterator<Item = char>) -> Self {
        Self {
            primary_prefixes: primary_prefixes.into_iter().collect(),
        }
    }

    /// Builds a resolver from a prefix string such as `"GD"`.
    pub fn from_prefixes(prefixes: &str) -> Self {
        Self::new(prefixes.chars().filter(|c| !c.is_whitespace()))
    }

    pub fn primary_prefixes(&self) -> &[char] {
        &self.primary_prefixes
    }

    pub fn resolve(&self, trip_id: &TripId) -> Shard {
        match trip_id.leading_char() {
            Some(c) if self.primary_prefixes.contains(&c) => Shard::Primary,
            _ => Shard::Secondary,
        }
    }
}

impl Default for ShardResolver {
    fn default() -> Self {
        Self::from_prefixes(DEFAULT_PRIMARY_PREFIXES)
    }
}

/// Resolves with the default prefixes.
pub fn resolve_shard(trip_id: &TripId) -> Shard {
    ShardResolver::default().resolve(trip_id)
}
