//! Frame-tagged copies of the world for rollback.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{Player, Projectile};
use crate::id::{PeerId, ProjectileId};
use crate::world::World;
use crate::Frame;

/// A complete copy of the world as it stood entering `frame`, before that
/// frame simulates.
///
/// Restoring is clear-and-recreate: the live world is replaced wholesale,
/// so entities spawned after the capture do not survive a restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub frame: Frame,
    pub players: BTreeMap<PeerId, Player>,
    pub projectiles: BTreeMap<ProjectileId, Projectile>,
}

impl WorldSnapshot {
    pub fn capture(frame: Frame, world: &World) -> Self {
        Self {
            frame,
            players: world.players.clone(),
            projectiles: world.projectiles.clone(),
        }
    }

    pub fn restore(&self, world: &mut World) {
        world.players = self.players.clone();
        world.projectiles = self.projectiles.clone();
    }
}
