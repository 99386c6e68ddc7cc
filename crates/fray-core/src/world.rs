//! The deterministic simulation core.
//!
//! A [`World`] is the complete authoritative state for one frame: every
//! player and every projectile, keyed by ordered ids in `BTreeMap`s so that
//! iteration order (and therefore collision resolution order) is identical
//! on every run. [`World::step`] is a pure function of the current state and
//! the per-peer inputs for the frame, which is what makes rollback
//! resimulation produce bit-identical results.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::constants::{HITSCAN_DAMAGE, OUT_OF_BOUNDS_MARGIN, PROJECTILE_DAMAGE};
use crate::entity::{circles_overlap, Player, Projectile};
use crate::id::{PeerId, ProjectileId};
use crate::input::Input;

/// Arena extent. Projectiles are culled once they fly a margin past it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub width: f64,
    pub height: f64,
}

impl ArenaBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True while a point is still worth simulating, i.e. inside the arena
    /// or within the grace margin around it.
    pub fn holds(&self, x: f64, y: f64) -> bool {
        x >= -OUT_OF_BOUNDS_MARGIN
            && x <= self.width + OUT_OF_BOUNDS_MARGIN
            && y >= -OUT_OF_BOUNDS_MARGIN
            && y <= self.height + OUT_OF_BOUNDS_MARGIN
    }
}

/// A projectile connecting with a player during [`World::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct Impact {
    pub projectile: ProjectileId,
    pub victim: PeerId,
    pub damage: f64,
}

/// A hitscan shot connecting with a player.
#[derive(Debug, Clone, PartialEq)]
pub struct HitscanHit {
    pub victim: PeerId,
    /// Distance from the shooter along the ray.
    pub range: f64,
}

/// All simulated state for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    pub players: BTreeMap<PeerId, Player>,
    pub projectiles: BTreeMap<ProjectileId, Projectile>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&mut self, id: PeerId, player: Player) {
        self.players.insert(id, player);
    }

    pub fn remove_player(&mut self, id: &PeerId) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn add_projectile(&mut self, id: ProjectileId, projectile: Projectile) {
        self.projectiles.insert(id, projectile);
    }

    pub fn remove_projectile(&mut self, id: &ProjectileId) -> Option<Projectile> {
        self.projectiles.remove(id)
    }

    /// Removes every projectile owned by `peer`. Used when a peer leaves.
    pub fn remove_projectiles_of(&mut self, peer: &PeerId) {
        self.projectiles.retain(|id, _| id.owner != *peer);
    }

    /// Advances the world by exactly one frame.
    ///
    /// Phases run in a fixed order: movement, projectile flight, then
    /// collisions. Players with no entry in `inputs` stand still. The same
    /// state plus the same inputs always yields the same next state.
    pub fn step(&mut self, inputs: &BTreeMap<PeerId, Input>) -> Vec<Impact> {
        for (id, player) in &mut self.players {
            let input = inputs.get(id).copied().unwrap_or(Input::NONE);
            player.apply_movement(input);
        }
        for projectile in self.projectiles.values_mut() {
            projectile.advance();
        }
        self.resolve_collisions()
    }

    /// Projectile-versus-player collisions, resolved in id order so every
    /// peer agrees on who got hit when several contacts land the same frame.
    /// Each projectile hits at most one player (the lowest-id overlap) and
    /// never its own shooter; damage lands immediately, so a later
    /// projectile the same frame sees the already-shrunken radius.
    fn resolve_collisions(&mut self) -> Vec<Impact> {
        let ids: Vec<ProjectileId> = self.projectiles.keys().cloned().collect();
        let mut impacts = Vec::new();
        for id in ids {
            let Some(projectile) = self.projectiles.get(&id) else {
                continue;
            };
            let victim = self.players.iter().find_map(|(peer, player)| {
                if *peer == id.owner {
                    return None;
                }
                circles_overlap(
                    projectile.x,
                    projectile.y,
                    projectile.radius,
                    player.x,
                    player.y,
                    player.radius,
                )
                .then(|| peer.clone())
            });
            if let Some(victim) = victim {
                if let Some(player) = self.players.get_mut(&victim) {
                    player.take_damage(PROJECTILE_DAMAGE);
                }
                self.projectiles.remove(&id);
                impacts.push(Impact {
                    projectile: id,
                    victim,
                    damage: PROJECTILE_DAMAGE,
                });
            }
        }
        impacts
    }

    /// Finds what a hitscan shot from `shooter` along `angle` would hit,
    /// cast from the shooter's own position.
    pub fn hitscan_target(
        &self,
        shooter: &PeerId,
        angle: f64,
        max_range: f64,
    ) -> Option<HitscanHit> {
        let origin = self.players.get(shooter)?;
        self.raycast(origin.x, origin.y, angle, max_range, shooter)
    }

    /// Casts a ray from an arbitrary origin and reports the nearest player
    /// it passes through.
    ///
    /// A target counts when it is in front of the origin, within
    /// `max_range` along the ray, and the ray crosses its circle. The
    /// nearest qualifying target wins; ties break toward the lower id.
    /// Pure query: the caller decides whether damage is applied. The
    /// explicit origin exists because the delay strategy shoots from the
    /// delayed position, not the true one.
    pub fn raycast(
        &self,
        origin_x: f64,
        origin_y: f64,
        angle: f64,
        max_range: f64,
        skip: &PeerId,
    ) -> Option<HitscanHit> {
        let (dir_x, dir_y) = (angle.cos(), angle.sin());
        let mut best: Option<HitscanHit> = None;
        for (id, player) in &self.players {
            if id == skip {
                continue;
            }
            let dx = player.x - origin_x;
            let dy = player.y - origin_y;
            let along = dx * dir_x + dy * dir_y;
            if along <= 0.0 || along > max_range {
                continue;
            }
            let perp = (dy * dir_x - dx * dir_y).abs();
            if perp > player.radius {
                continue;
            }
            if best.as_ref().is_none_or(|b| along < b.range) {
                best = Some(HitscanHit {
                    victim: id.clone(),
                    range: along,
                });
            }
        }
        best
    }

    /// Applies hitscan damage to `victim`. Returns the victim's radius
    /// afterwards, or `None` if the victim is not in the world.
    pub fn apply_hitscan_damage(&mut self, victim: &PeerId) -> Option<f64> {
        let player = self.players.get_mut(victim)?;
        player.take_damage(HITSCAN_DAMAGE);
        Some(player.radius)
    }

    /// Projectiles that have flown past the arena margin, in id order.
    pub fn out_of_bounds(&self, bounds: ArenaBounds) -> Vec<ProjectileId> {
        self.projectiles
            .iter()
            .filter(|(_, p)| !bounds.holds(p.x, p.y))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Order-independent fingerprint of the full state.
    ///
    /// Floats are hashed by bit pattern, so two worlds digest equal exactly
    /// when their states are bit-identical. Stable within one build of the
    /// game, which is all desync detection between peers needs.
    pub fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (id, player) in &self.players {
            id.hash(&mut hasher);
            player.x.to_bits().hash(&mut hasher);
            player.y.to_bits().hash(&mut hasher);
            player.radius.to_bits().hash(&mut hasher);
            player.color.hash(&mut hasher);
        }
        for (id, projectile) in &self.projectiles {
            id.hash(&mut hasher);
            projectile.x.to_bits().hash(&mut hasher);
            projectile.y.to_bits().hash(&mut hasher);
            projectile.vx.to_bits().hash(&mut hasher);
            projectile.vy.to_bits().hash(&mut hasher);
            projectile.radius.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}
