//! Gameplay constants shared by both netcode strategies.
//!
//! Every value here feeds the deterministic per-frame step, so changing any
//! of them is a compatibility break between peers running different builds.

/// Radius a player spawns with.
pub const PLAYER_SPAWN_RADIUS: f64 = 30.0;

/// Radius of every projectile.
pub const PROJECTILE_RADIUS: f64 = 5.0;

/// Distance a player moves per frame along each held direction.
pub const MOVE_SPEED: f64 = 3.0;

/// Speed of a freshly spawned projectile (units per frame).
pub const PROJECTILE_SPEED: f64 = 2.0;

/// Radius lost when a projectile connects.
pub const PROJECTILE_DAMAGE: f64 = 5.0;

/// Radius lost when a hitscan beam connects.
pub const HITSCAN_DAMAGE: f64 = 10.0;

/// Minimum time between hitscan shots, in milliseconds.
pub const HITSCAN_COOLDOWN_MS: u64 = 1000;

/// Radius floor. A player clamped to this value is defeated; radius never
/// goes below it, so it can never be negative.
pub const DEFEAT_RADIUS: f64 = 10.0;

/// How far beyond the arena rectangle a projectile may travel before it
/// expires.
pub const OUT_OF_BOUNDS_MARGIN: f64 = 50.0;
