//! Rollback synchronization strategy.
//!
//! Simulates every frame immediately using confirmed inputs where present
//! and predicted inputs everywhere else. When a remote input arrives for a
//! frame already simulated and disagrees with the prediction that was used,
//! the strategy restores the newest snapshot at or before that frame and
//! deterministically resimulates up to the present. Snapshots invalidated
//! by the corrected timeline are dropped and re-captured on the way
//! forward, so repeating a rollback lands on the same state.

use std::collections::BTreeMap;

use fray_core::{Frame, Input, PeerId, World, WorldSnapshot};
use fray_netproto::messages::input::InputFrame;
use fray_netproto::messages::state::PosUpdate;
use fray_netproto::{Inbound, Message};
use tracing::{debug, info};

use super::input_buffer::InputBuffer;
use super::snapshot::SnapshotBuffer;
use super::{HitscanShot, NetcodeMode, NetcodeStrategy, Outbox, SyncStats};
use crate::config::NetcodeConfig;
use crate::error::NetcodeError;

/// The rollback state machine.
///
/// `current_frame` is always the next frame to simulate; a snapshot tagged
/// `F` is the state entering frame `F`. The constructor seeds a frame-0
/// snapshot so the very first frames are always reachable.
#[derive(Debug)]
pub struct RollbackNetcode {
    local: PeerId,
    config: NetcodeConfig,
    current_frame: Frame,
    inputs: InputBuffer,
    snapshots: SnapshotBuffer,
    last_attacker: Option<PeerId>,
    stats: SyncStats,
    halted: bool,
}

impl RollbackNetcode {
    pub fn new(local: PeerId, config: NetcodeConfig, world: &World) -> Self {
        let mut snapshots =
            SnapshotBuffer::new(config.snapshot_capacity, config.snapshot_interval);
        snapshots.push(WorldSnapshot::capture(0, world));
        Self {
            inputs: InputBuffer::new(config.input_window),
            local,
            config,
            current_frame: 0,
            snapshots,
            last_attacker: None,
            stats: SyncStats::default(),
            halted: false,
        }
    }

    /// One deterministic frame: resolve every player's input, step, track
    /// impacts on the local player, expire out-of-range projectiles. Both
    /// the live tick and resimulation run through here, and the arena
    /// bounds are part of the step, so every peer expires the same
    /// projectile on the same frame.
    fn step_frame(&mut self, world: &mut World, frame: Frame) {
        let mut resolved = BTreeMap::new();
        for peer in world.players.keys() {
            resolved.insert(peer.clone(), self.inputs.input_for(peer, frame));
        }
        let impacts = world.step(&resolved);
        for impact in impacts {
            if impact.victim == self.local {
                self.last_attacker = Some(impact.projectile.owner);
            }
        }
        for id in world.out_of_bounds(self.config.arena) {
            world.remove_projectile(&id);
        }
    }

    /// The correctness-sensitive path: decide whether a remote input is
    /// stale, future, converged, or a misprediction needing a rollback.
    fn on_remote_input(
        &mut self,
        world: &mut World,
        peer: PeerId,
        frame: Frame,
        input: Input,
    ) -> Result<(), NetcodeError> {
        // Below this line a correction is either pointless (older than the
        // ignore window) or unreachable (older than the snapshot ring).
        // The input is still recorded for prediction continuity.
        let cutoff = self.current_frame.saturating_sub(self.config.ignore_threshold);
        let reachable = self.snapshots.oldest_frame().unwrap_or(0);
        if frame < cutoff.max(reachable) {
            self.inputs.record(peer.clone(), frame, input);
            self.inputs.update_prediction(&peer);
            self.stats.stale_inputs += 1;
            debug!(
                %peer,
                frame,
                current = self.current_frame,
                "stale input recorded without rollback"
            );
            return Ok(());
        }

        if frame >= self.current_frame {
            // Not simulated yet; it will be used at its own frame.
            self.inputs.record(peer.clone(), frame, input);
            self.inputs.update_prediction(&peer);
            return Ok(());
        }

        // What did the simulation use for this (peer, frame)? Must be
        // computed before recording, or the comparison sees the new value.
        let used = self.inputs.input_for(&peer, frame);
        self.inputs.record(peer.clone(), frame, input);
        self.inputs.update_prediction(&peer);
        if used == input {
            return Ok(());
        }
        debug!(%peer, frame, "misprediction, rolling back");
        self.rollback(world, frame)
    }

    /// Restores the newest snapshot at or before `to_frame` and resimulates
    /// to the present with the corrected input buffer. Resimulation only
    /// mutates local state; nothing is broadcast and no input is
    /// re-recorded.
    fn rollback(&mut self, world: &mut World, to_frame: Frame) -> Result<(), NetcodeError> {
        let Some(snapshot) = self.snapshots.find_at_or_before(to_frame).cloned() else {
            return Err(NetcodeError::RollbackImpossible {
                target: to_frame,
                oldest: self.snapshots.oldest_frame(),
            });
        };
        let restored = snapshot.frame;
        // Snapshots past the restore point describe the old timeline; drop
        // them and re-capture as resimulation passes the cadence marks.
        self.snapshots.truncate_after(restored);
        snapshot.restore(world);

        let mut frame = restored;
        while frame < self.current_frame {
            self.step_frame(world, frame);
            frame += 1;
            if self.snapshots.should_save(frame) {
                self.snapshots.push(WorldSnapshot::capture(frame, world));
            }
            self.stats.frames_resimulated += 1;
        }
        self.stats.rollbacks += 1;
        info!(
            to_frame,
            restored,
            resimulated = self.current_frame - restored,
            "rolled back and resimulated"
        );
        Ok(())
    }
}

impl NetcodeStrategy for RollbackNetcode {
    fn mode(&self) -> NetcodeMode {
        NetcodeMode::Rollback
    }

    fn current_frame(&self) -> Frame {
        self.current_frame
    }

    fn tick(
        &mut self,
        world: &mut World,
        local_input: Input,
        _now_ms: u64,
        outbox: &mut Outbox,
    ) -> Result<(), NetcodeError> {
        if self.halted {
            return Ok(());
        }
        let frame = self.current_frame;
        self.inputs.record(self.local.clone(), frame, local_input);
        self.inputs.update_prediction(&self.local);
        outbox.push(Message::Input(InputFrame {
            frame,
            input: local_input.into(),
        }));

        self.step_frame(world, frame);

        // Position corrections ride alongside the input stream; they heal
        // state that the input-driven step cannot see (hitscan damage,
        // missed spawns).
        if let Some(me) = world.players.get(&self.local) {
            outbox.push(Message::Pos(PosUpdate {
                x: me.x,
                y: me.y,
                radius: me.radius,
            }));
        }

        self.current_frame += 1;
        if self.snapshots.should_save(self.current_frame) {
            self.snapshots
                .push(WorldSnapshot::capture(self.current_frame, world));
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        world: &mut World,
        inbound: &Inbound,
        _now_ms: u64,
        _outbox: &mut Outbox,
    ) -> Result<bool, NetcodeError> {
        match &inbound.message {
            Message::Input(input_frame) => {
                let input = Input::from(input_frame.input);
                self.on_remote_input(world, inbound.sender.clone(), input_frame.frame, input)?;
                Ok(true)
            }
            Message::Pos(update) => {
                if let Some(player) = world.players.get_mut(&inbound.sender) {
                    player.x = update.x;
                    player.y = update.y;
                    player.radius = update.radius;
                }
                Ok(true)
            }
            Message::ProjPos(update) => {
                if let Some(projectile) = world.projectiles.get_mut(&update.id) {
                    projectile.x = update.x;
                    projectile.y = update.y;
                }
                Ok(true)
            }
            Message::Pong(_) => {
                debug!(sender = %inbound.sender, "pong ignored in rollback mode");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn observe_peer(&mut self, peer: &PeerId, world: &World) {
        // Retained history predates the join; backfill it or a rollback
        // across the join would erase the newcomer.
        if let Some(player) = world.players.get(peer) {
            self.snapshots.admit_peer(peer, player);
        }
    }

    fn forget_peer(&mut self, peer: &PeerId) {
        self.inputs.remove_peer(peer);
        // Scrub retained snapshots too: a later rollback must not
        // resurrect the departed peer's entities.
        self.snapshots.forget_peer(peer);
    }

    fn adopt_sync(&mut self, frame: Frame, world: &World) {
        self.current_frame = frame;
        self.snapshots.clear();
        self.snapshots.push(WorldSnapshot::capture(frame, world));
        info!(frame, "adopted synced state");
    }

    fn hitscan(&self, world: &World, angle: f64, max_range: f64) -> Option<HitscanShot> {
        let me = world.players.get(&self.local)?;
        Some(HitscanShot {
            origin: (me.x, me.y),
            hit: world.hitscan_target(&self.local, angle, max_range),
        })
    }

    fn last_attacker(&self) -> Option<PeerId> {
        self.last_attacker.clone()
    }

    fn halt(&mut self) {
        self.halted = true;
    }

    fn stats(&self) -> SyncStats {
        self.stats
    }
}
