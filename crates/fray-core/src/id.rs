//! Identifiers for peers and projectiles.
//!
//! Both are ordered: peer ids lexicographically (host election relies on
//! this) and projectile ids by (owner, sequence), which gives every
//! iteration over entity maps a reproducible order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A peer's identity as assigned by the signaling layer.
///
/// Treated as an opaque string everywhere except host election, which picks
/// the lexicographically lowest id in the roster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Projectile identity: owning peer plus a per-peer spawn counter.
///
/// The wire form is `"<owner>-proj-<seq>"`. Keeping the owner inside the id
/// is what lets collision resolution skip the shooter without a separate
/// ownership table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ProjectileId {
    pub owner: PeerId,
    pub seq: u64,
}

impl ProjectileId {
    pub fn new(owner: PeerId, seq: u64) -> Self {
        Self { owner, seq }
    }
}

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-proj-{}", self.owner, self.seq)
    }
}

impl From<ProjectileId> for String {
    fn from(id: ProjectileId) -> Self {
        id.to_string()
    }
}

/// Error for a projectile id that does not match `"<owner>-proj-<seq>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadProjectileId(pub String);

impl fmt::Display for BadProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad projectile id: {:?}", self.0)
    }
}

impl std::error::Error for BadProjectileId {}

impl FromStr for ProjectileId {
    type Err = BadProjectileId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The owner id may itself contain '-', so split on the last marker.
        let marker = s
            .rfind("-proj-")
            .ok_or_else(|| BadProjectileId(s.to_owned()))?;
        let owner = &s[..marker];
        let seq = &s[marker + "-proj-".len()..];
        if owner.is_empty() {
            return Err(BadProjectileId(s.to_owned()));
        }
        let seq: u64 = seq.parse().map_err(|_| BadProjectileId(s.to_owned()))?;
        Ok(Self::new(PeerId::from(owner), seq))
    }
}

impl TryFrom<String> for ProjectileId {
    type Error = BadProjectileId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
