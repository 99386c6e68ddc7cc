//! Synchronization strategies for netplay.
//!
//! This module provides two netcode modes:
//! - **Delay**: defer applying remote state by the measured network delay
//!   so every peer acts on equally old data (no resimulation, added input
//!   latency)
//! - **Rollback**: predict remote inputs, simulate immediately, and
//!   rollback/resimulate when a prediction turns out wrong (no added
//!   latency, needs deterministic simulation and snapshots)

pub mod delay;
pub mod input_buffer;
pub mod rollback;
pub mod snapshot;

use clap::ValueEnum;
use fray_core::{Frame, HitscanHit, Input, PeerId, World};
use fray_netproto::{Inbound, Message};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NetcodeError;

/// Synchronization mode for a netcode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum NetcodeMode {
    /// Apply remote state after the measured delay. Cheap and simple;
    /// every input is felt one effective-delay later.
    #[default]
    Delay,
    /// Predict remote inputs and resimulate on misprediction. Immediate
    /// local response at the cost of snapshotting and occasional replays.
    Rollback,
}

impl fmt::Display for NetcodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetcodeMode::Delay => f.write_str("delay"),
            NetcodeMode::Rollback => f.write_str("rollback"),
        }
    }
}

/// Messages queued for broadcast while a tick or message handler runs.
///
/// Strategies never touch the transport directly: they queue here and the
/// session flushes once the call returns. Resimulated frames run without an
/// outbox in reach, which is what keeps rollback replays silent on the wire.
#[derive(Debug, Default)]
pub struct Outbox {
    queued: Vec<Message>,
}

impl Outbox {
    pub fn push(&mut self, message: Message) {
        self.queued.push(message);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Message> + '_ {
        self.queued.drain(..)
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

/// Counters a strategy accumulates over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Rollbacks performed (restore plus resimulation).
    pub rollbacks: u64,
    /// Frames resimulated across all rollbacks.
    pub frames_resimulated: u64,
    /// Remote inputs too stale to act on (recorded, no rollback).
    pub stale_inputs: u64,
    /// Packets whose application was deferred for delay compensation.
    pub deferred_packets: u64,
}

/// A resolved hitscan shot: where the ray left from under this mode's view
/// of the arena, and who (if anyone) it connected with.
#[derive(Debug, Clone, PartialEq)]
pub struct HitscanShot {
    pub origin: (f64, f64),
    pub hit: Option<HitscanHit>,
}

/// Strategy trait for the two synchronization modes.
///
/// A strategy owns the frame counter and all speculative state (input
/// history, snapshots, delay rings, pending queues); the session owns the
/// world, the transport, and everything both modes share (spawns, hits,
/// roster, bootstrap).
pub trait NetcodeStrategy: Send {
    /// Which mode this strategy implements.
    fn mode(&self) -> NetcodeMode;

    /// The next frame this strategy will simulate.
    fn current_frame(&self) -> Frame;

    /// Advances the session by one tick.
    ///
    /// For Delay: move the local player immediately, commit remote and
    /// deferred state whose delay has elapsed, then broadcast positions.
    /// For Rollback: run one deterministic step with confirmed-or-predicted
    /// inputs and broadcast the local input for this frame.
    fn tick(
        &mut self,
        world: &mut World,
        local_input: Input,
        now_ms: u64,
        outbox: &mut Outbox,
    ) -> Result<(), NetcodeError>;

    /// Feeds one inbound message to the strategy.
    ///
    /// Returns `true` when the message was consumed. Traffic both modes
    /// share (spawns, hits, sync, roster) returns `false` and is handled by
    /// the session.
    fn on_message(
        &mut self,
        world: &mut World,
        inbound: &Inbound,
        now_ms: u64,
        outbox: &mut Outbox,
    ) -> Result<bool, NetcodeError>;

    /// A peer was admitted to the session and just added to `world`.
    /// Strategies that keep world history fold the newcomer into it.
    fn observe_peer(&mut self, _peer: &PeerId, _world: &World) {}

    /// Drops all per-peer state for a departed peer.
    fn forget_peer(&mut self, peer: &PeerId);

    /// Adopts a full-state sync: the world was just replaced wholesale and
    /// the frame counter moves to `frame`. All speculative state is reset.
    fn adopt_sync(&mut self, frame: Frame, world: &World);

    /// Resolves a hitscan shot from the local player through this mode's
    /// view of the arena (true positions under rollback, delayed positions
    /// under delay).
    fn hitscan(&self, world: &World, angle: f64, max_range: f64) -> Option<HitscanShot>;

    /// The peer whose projectile most recently damaged the local player
    /// inside this strategy's own simulation, if any.
    fn last_attacker(&self) -> Option<PeerId>;

    /// Stops simulating. Later ticks become no-ops.
    fn halt(&mut self);

    /// Lifetime counters for diagnostics and tests.
    fn stats(&self) -> SyncStats;
}
