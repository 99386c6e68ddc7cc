use std::collections::BTreeMap;

use fray_core::{Frame, PeerId, ProjectileId};
use serde::{Deserialize, Serialize};

/// One player's full state inside an [`InitialSync`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: PeerId,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: String,
}

/// One projectile's full state inside an [`InitialSync`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectileState {
    pub id: ProjectileId,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
}

/// Everything a fresh peer needs to start simulating.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SyncState {
    /// Wall-clock milliseconds at capture. Lets the receiver reject a stale
    /// sync that was overtaken by a newer one.
    pub timestamp: u64,
    pub players: Vec<PlayerState>,
    pub projectiles: Vec<ProjectileState>,
}

/// Full-state bootstrap pushed by the elected host to a new joiner, and
/// re-sent as the recovery path after a detected desync.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InitialSync {
    pub frame: Frame,
    pub state: SyncState,
}

/// Delay-strategy feedback: the sender's current measured delay per peer,
/// in milliseconds. The payload is the mapping itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Pong {
    pub delays: BTreeMap<PeerId, f64>,
}
