use fray_core::{PeerId, ProjectileId};
use serde::{Deserialize, Serialize};

/// Which weapon dealt a hit. Tags are part of the wire format.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    Projectile,
    Hitscan,
}

/// Damage notification.
///
/// The victim is named in the payload rather than smuggled through the
/// envelope's sender field; the sender field stays the peer who dealt the
/// hit. `proj_id` is present for projectile hits and doubles as the
/// deduplication key against redelivery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    pub victim: PeerId,
    pub by: PeerId,
    pub weapon: WeaponKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proj_id: Option<ProjectileId>,
    pub damage: f64,
}

/// Instantaneous hitscan beam, start to end point.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Laser {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}
