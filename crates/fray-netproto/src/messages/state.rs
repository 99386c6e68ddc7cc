use fray_core::ProjectileId;
use serde::{Deserialize, Serialize};

/// Authoritative position of the sending player.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PosUpdate {
    pub x: f64,
    pub y: f64,
    /// Radius rides along so that damage taken locally propagates even if a
    /// hit notification is lost.
    pub radius: f64,
}

/// A projectile spawned by the sending player.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewProjectile {
    pub id: ProjectileId,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
}

/// Position correction for a projectile the receiver already knows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectilePos {
    pub id: ProjectileId,
    pub x: f64,
    pub y: f64,
}

/// The owner removed a projectile (expiry or impact).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectileGone {
    pub id: ProjectileId,
}
