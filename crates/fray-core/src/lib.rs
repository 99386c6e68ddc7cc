//! Deterministic Arena Simulation
//!
//! This crate holds the game state and the frame step function shared by
//! every peer. Everything network-related lives above it; given the same
//! starting state and the same per-peer inputs, [`World::step`] produces
//! bit-identical results, which is the property the rollback layer builds on.
//!
//! # Architecture
//!
//! - [`world`]: entity maps and the per-frame step (movement, flight, collisions)
//! - [`entity`]: players and projectiles
//! - [`snapshot`]: frame-tagged world copies for rollback restore
//! - [`input`]: one frame of directional input
//! - [`id`]: ordered peer and projectile identifiers
//! - [`constants`]: gameplay tuning shared by all peers

pub mod constants;
pub mod entity;
pub mod id;
pub mod input;
pub mod snapshot;
pub mod world;

/// Frame index, counted from the start of the session.
pub type Frame = u64;

// Re-export commonly used types
pub use entity::{Player, Projectile};
pub use id::{BadProjectileId, PeerId, ProjectileId};
pub use input::Input;
pub use snapshot::WorldSnapshot;
pub use world::{ArenaBounds, HitscanHit, Impact, World};
