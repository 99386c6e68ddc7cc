//! Netcode core for the arena game.
//!
//! This crate runs one peer's side of a real-time multiplayer session over
//! any broadcast transport. It puts both classic synchronization
//! strategies (delay compensation and rollback) behind one session API.
//!
//! # Architecture
//!
//! - [`session`]: Per-peer session loop, roster, spawns, hits, state sync
//! - [`sync`]: The two strategies plus their input/snapshot/delay machinery
//! - [`transport`]: Broadcast transport seam and the in-process loopback hub
//! - [`config`]: Session tuning knobs
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod session;
pub mod sync;
pub mod transport;

// Re-export commonly used types
pub use config::{DelayPolicy, NetcodeConfig};
pub use error::NetcodeError;
pub use session::{NetcodeEvent, NetcodeSession};
pub use sync::delay::{DelayNetcode, DelayTracker};
pub use sync::rollback::RollbackNetcode;
pub use sync::{HitscanShot, NetcodeMode, NetcodeStrategy, Outbox, SyncStats};
pub use transport::{LoopbackHub, LoopbackTransport, PeerTransport};
