//! Delay-compensated synchronization strategy.
//!
//! Instead of predicting and resimulating, this mode measures how late
//! remote state arrives and schedules everything (remote packets and the
//! local player's own authoritative position) to take effect one
//! "effective delay" after it was produced. All peers then act on equally
//! old data, which keeps them consistent without snapshots, at the price of
//! added input latency.
//!
//! Two queues carry the deferrals: a min-heap of remote packets ordered by
//! send timestamp (so late-but-earlier packets still apply in send order),
//! and a due-time heap of local position commits (so the delayed position
//! trails the true one by the effective delay). Both drain once per tick;
//! there are no ambient timers.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};

use fray_core::constants::PROJECTILE_DAMAGE;
use fray_core::entity::circles_overlap;
use fray_core::{Frame, Input, PeerId, ProjectileId, World};
use fray_netproto::messages::combat::{Hit, WeaponKind};
use fray_netproto::messages::session::Pong;
use fray_netproto::messages::state::{PosUpdate, ProjectileGone, ProjectilePos};
use fray_netproto::{Inbound, Message};
use tracing::{debug, info};

use super::{HitscanShot, NetcodeMode, NetcodeStrategy, Outbox, SyncStats};
use crate::config::{DelayPolicy, NetcodeConfig};
use crate::error::NetcodeError;

/// Per-peer delay measurement: bounded sample rings and the running means
/// the pong broadcast carries.
#[derive(Debug)]
pub struct DelayTracker {
    samples: BTreeMap<PeerId, VecDeque<f64>>,
    capacity: usize,
}

impl DelayTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records one observed delay for a peer, evicting the oldest sample
    /// past the ring capacity.
    pub fn observe(&mut self, peer: &PeerId, delay_ms: f64) {
        let ring = self.samples.entry(peer.clone()).or_default();
        ring.push_back(delay_ms.max(0.0));
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    pub fn mean_for(&self, peer: &PeerId) -> Option<f64> {
        let ring = self.samples.get(peer)?;
        if ring.is_empty() {
            return None;
        }
        Some(ring.iter().sum::<f64>() / ring.len() as f64)
    }

    /// Every peer's mean delay; the payload of a pong broadcast.
    pub fn means(&self) -> BTreeMap<PeerId, f64> {
        self.samples
            .iter()
            .filter(|(_, ring)| !ring.is_empty())
            .map(|(peer, ring)| {
                (
                    peer.clone(),
                    ring.iter().sum::<f64>() / ring.len() as f64,
                )
            })
            .collect()
    }

    /// Collapses the per-peer means into the one scalar scheduling uses.
    /// With no samples yet there is nothing to compensate for: zero.
    pub fn effective_delay(&self, policy: DelayPolicy) -> f64 {
        let means = self.means();
        if means.is_empty() {
            return 0.0;
        }
        match policy {
            DelayPolicy::Average => means.values().sum::<f64>() / means.len() as f64,
            DelayPolicy::Maximum => means.values().fold(0.0_f64, |worst, &mean| worst.max(mean)),
        }
    }

    pub fn remove_peer(&mut self, peer: &PeerId) {
        self.samples.remove(peer);
    }
}

/// A remote state update held back until its delay elapses. Orders by send
/// timestamp, then arrival sequence for same-millisecond sends.
#[derive(Debug, Clone)]
struct PendingPacket {
    sent_ms: u64,
    seq: u64,
    payload: PendingPayload,
}

#[derive(Debug, Clone)]
enum PendingPayload {
    Pos { peer: PeerId, update: PosUpdate },
    ProjPos(ProjectilePos),
}

impl PartialEq for PendingPacket {
    fn eq(&self, other: &Self) -> bool {
        self.sent_ms == other.sent_ms && self.seq == other.seq
    }
}

impl Eq for PendingPacket {}

impl PartialOrd for PendingPacket {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingPacket {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.sent_ms, self.seq).cmp(&(other.sent_ms, other.seq))
    }
}

/// A deferred commit of the local player's position to its delayed view.
#[derive(Debug, Clone)]
struct DelayedCommit {
    due_ms: u64,
    source_ms: u64,
    x: f64,
    y: f64,
}

impl PartialEq for DelayedCommit {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.source_ms == other.source_ms
    }
}

impl Eq for DelayedCommit {}

impl PartialOrd for DelayedCommit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedCommit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due_ms, self.source_ms).cmp(&(other.due_ms, other.source_ms))
    }
}

/// The delay-compensation strategy.
///
/// The world's entry for the local player holds the *true* position
/// (moved immediately, for responsive aiming); `delayed` is the position
/// remote peers currently treat as authoritative. Collision checks use the
/// delayed side of every pairing, never a mix.
#[derive(Debug)]
pub struct DelayNetcode {
    local: PeerId,
    config: NetcodeConfig,
    frame: Frame,
    tracker: DelayTracker,
    /// Local position as remote peers see it, once the first commit lands.
    delayed: Option<(f64, f64)>,
    /// Source timestamp of the newest applied commit; older commits are
    /// discarded (last write wins by source time, not arrival).
    delayed_source_ms: u64,
    commits: BinaryHeap<Reverse<DelayedCommit>>,
    pending: BinaryHeap<Reverse<PendingPacket>>,
    arrival_seq: u64,
    /// Monotonic apply guards: newest applied send timestamp per entity.
    applied_pos: BTreeMap<PeerId, u64>,
    applied_proj: BTreeMap<ProjectileId, u64>,
    last_pong_ms: Option<u64>,
    last_attacker: Option<PeerId>,
    stats: SyncStats,
    halted: bool,
}

impl DelayNetcode {
    pub fn new(local: PeerId, config: NetcodeConfig) -> Self {
        Self {
            tracker: DelayTracker::new(config.delay_samples),
            local,
            config,
            frame: 0,
            delayed: None,
            delayed_source_ms: 0,
            commits: BinaryHeap::new(),
            pending: BinaryHeap::new(),
            arrival_seq: 0,
            applied_pos: BTreeMap::new(),
            applied_proj: BTreeMap::new(),
            last_pong_ms: None,
            last_attacker: None,
            stats: SyncStats::default(),
            halted: false,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.arrival_seq += 1;
        self.arrival_seq
    }

    /// Applies due position commits to the delayed view. An older commit
    /// popping after a newer one (possible when the effective delay
    /// shrinks between ticks) is discarded.
    fn drain_commits(&mut self, now_ms: u64) {
        while self
            .commits
            .peek()
            .is_some_and(|Reverse(commit)| commit.due_ms <= now_ms)
        {
            let Some(Reverse(commit)) = self.commits.pop() else {
                break;
            };
            if commit.source_ms < self.delayed_source_ms {
                continue;
            }
            self.delayed = Some((commit.x, commit.y));
            self.delayed_source_ms = commit.source_ms;
        }
    }

    /// Applies due remote packets in send order, with a per-entity
    /// monotonic guard so a straggler can never clobber newer state.
    fn drain_pending(&mut self, world: &mut World, now_ms: u64) {
        let effective = self.tracker.effective_delay(self.config.delay_policy) as u64;
        while self
            .pending
            .peek()
            .is_some_and(|Reverse(packet)| packet.sent_ms.saturating_add(effective) <= now_ms)
        {
            let Some(Reverse(packet)) = self.pending.pop() else {
                break;
            };
            match packet.payload {
                PendingPayload::Pos { peer, update } => {
                    if self
                        .applied_pos
                        .get(&peer)
                        .is_some_and(|&newest| packet.sent_ms < newest)
                    {
                        continue;
                    }
                    if let Some(player) = world.players.get_mut(&peer) {
                        player.x = update.x;
                        player.y = update.y;
                        player.radius = update.radius;
                    }
                    self.applied_pos.insert(peer, packet.sent_ms);
                }
                PendingPayload::ProjPos(update) => {
                    if let Some(projectile) = world.projectiles.get_mut(&update.id) {
                        if self
                            .applied_proj
                            .get(&update.id)
                            .is_some_and(|&newest| packet.sent_ms < newest)
                        {
                            continue;
                        }
                        projectile.x = update.x;
                        projectile.y = update.y;
                        self.applied_proj.insert(update.id, packet.sent_ms);
                    } else {
                        // Already deleted; drop the guard entry with it.
                        self.applied_proj.remove(&update.id);
                    }
                }
            }
        }
    }

    /// Victim-side hit detection: remote projectiles against the local
    /// player, both on delayed coordinates. The victim applies its own
    /// damage and tells everyone: the shooter learns their projectile
    /// landed, the rest see the radius in the next pos broadcast.
    fn detect_hits(&mut self, world: &mut World, outbox: &mut Outbox) {
        let Some((delayed_x, delayed_y)) = self.delayed else {
            return;
        };
        let Some(me) = world.players.get(&self.local) else {
            return;
        };
        let my_radius = me.radius;

        let mut landed = Vec::new();
        for (id, projectile) in &world.projectiles {
            if id.owner == self.local {
                continue;
            }
            if circles_overlap(
                projectile.x,
                projectile.y,
                projectile.radius,
                delayed_x,
                delayed_y,
                my_radius,
            ) {
                landed.push(id.clone());
            }
        }

        for id in landed {
            world.remove_projectile(&id);
            let attacker = id.owner.clone();
            info!(by = %attacker, projectile = %id, "hit by projectile");
            if let Some(me) = world.players.get_mut(&self.local) {
                me.take_damage(PROJECTILE_DAMAGE);
            }
            outbox.push(Message::Hit(Hit {
                victim: self.local.clone(),
                by: attacker.clone(),
                weapon: WeaponKind::Projectile,
                proj_id: Some(id.clone()),
                damage: PROJECTILE_DAMAGE,
            }));
            outbox.push(Message::ProjDel(ProjectileGone { id }));
            self.last_attacker = Some(attacker);
        }
    }
}

impl NetcodeStrategy for DelayNetcode {
    fn mode(&self) -> NetcodeMode {
        NetcodeMode::Delay
    }

    fn current_frame(&self) -> Frame {
        self.frame
    }

    fn tick(
        &mut self,
        world: &mut World,
        local_input: Input,
        now_ms: u64,
        outbox: &mut Outbox,
    ) -> Result<(), NetcodeError> {
        if self.halted {
            return Ok(());
        }

        // Local movement is immediate on the true position; the view the
        // other peers hold catches up one effective delay later.
        let mut moved = None;
        if let Some(me) = world.players.get_mut(&self.local) {
            me.apply_movement(local_input);
            moved = Some((me.x, me.y));
        }
        if let Some((x, y)) = moved {
            if self.delayed.is_none() {
                self.delayed = Some((x, y));
            }
            let effective = self.tracker.effective_delay(self.config.delay_policy);
            self.commits.push(Reverse(DelayedCommit {
                due_ms: now_ms.saturating_add(effective as u64),
                source_ms: now_ms,
                x,
                y,
            }));
        }

        // Every projectile flies between corrections; only our own get
        // broadcast and expired here (their owner is authoritative).
        let mut expired = Vec::new();
        for (id, projectile) in &mut world.projectiles {
            projectile.advance();
            if id.owner == self.local {
                if self.config.arena.holds(projectile.x, projectile.y) {
                    outbox.push(Message::ProjPos(ProjectilePos {
                        id: id.clone(),
                        x: projectile.x,
                        y: projectile.y,
                    }));
                } else {
                    expired.push(id.clone());
                }
            }
        }
        for id in expired {
            world.remove_projectile(&id);
            debug!(projectile = %id, "projectile left the arena");
            outbox.push(Message::ProjDel(ProjectileGone { id }));
        }

        self.drain_commits(now_ms);
        self.drain_pending(world, now_ms);
        self.detect_hits(world, outbox);

        if let Some(me) = world.players.get(&self.local) {
            outbox.push(Message::Pos(PosUpdate {
                x: me.x,
                y: me.y,
                radius: me.radius,
            }));
        }

        if self
            .last_pong_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.config.pong_interval_ms)
        {
            let delays = self.tracker.means();
            if !delays.is_empty() {
                outbox.push(Message::Pong(Pong { delays }));
            }
            self.last_pong_ms = Some(now_ms);
        }

        self.frame += 1;
        Ok(())
    }

    fn on_message(
        &mut self,
        world: &mut World,
        inbound: &Inbound,
        now_ms: u64,
        _outbox: &mut Outbox,
    ) -> Result<bool, NetcodeError> {
        // Every envelope doubles as a delay sample for its sender.
        let sample = now_ms.saturating_sub(inbound.sent_ms) as f64;
        self.tracker.observe(&inbound.sender, sample);

        match &inbound.message {
            Message::Pos(update) => {
                let packet = PendingPacket {
                    sent_ms: inbound.sent_ms,
                    seq: self.next_seq(),
                    payload: PendingPayload::Pos {
                        peer: inbound.sender.clone(),
                        update: *update,
                    },
                };
                self.pending.push(Reverse(packet));
                self.stats.deferred_packets += 1;
                Ok(true)
            }
            Message::ProjPos(update) => {
                let packet = PendingPacket {
                    sent_ms: inbound.sent_ms,
                    seq: self.next_seq(),
                    payload: PendingPayload::ProjPos(update.clone()),
                };
                self.pending.push(Reverse(packet));
                self.stats.deferred_packets += 1;
                Ok(true)
            }
            Message::Pong(pong) => {
                // An entry measured against us describes the sender's own
                // link; any other entry is gossip about that peer.
                for (peer, &delay) in &pong.delays {
                    if *peer == self.local {
                        self.tracker.observe(&inbound.sender, delay);
                    } else if *peer != inbound.sender {
                        self.tracker.observe(peer, delay);
                    }
                }
                Ok(true)
            }
            Message::Input(_) => {
                debug!(sender = %inbound.sender, "input broadcast ignored in delay mode");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn forget_peer(&mut self, peer: &PeerId) {
        self.tracker.remove_peer(peer);
        self.applied_pos.remove(peer);
        self.applied_proj.retain(|id, _| id.owner != *peer);
        self.pending.retain(|Reverse(packet)| match &packet.payload {
            PendingPayload::Pos { peer: from, .. } => from != peer,
            PendingPayload::ProjPos(update) => update.id.owner != *peer,
        });
    }

    fn adopt_sync(&mut self, frame: Frame, world: &World) {
        self.frame = frame;
        self.pending.clear();
        self.commits.clear();
        self.applied_pos.clear();
        self.applied_proj.clear();
        self.delayed = world.players.get(&self.local).map(|me| (me.x, me.y));
        self.delayed_source_ms = 0;
        info!(frame, "adopted synced state");
    }

    fn hitscan(&self, world: &World, angle: f64, max_range: f64) -> Option<HitscanShot> {
        let me = world.players.get(&self.local)?;
        // Shoot from where everyone sees us, at where we see everyone:
        // delayed coordinates on both sides of the pairing.
        let (origin_x, origin_y) = self.delayed.unwrap_or((me.x, me.y));
        Some(HitscanShot {
            origin: (origin_x, origin_y),
            hit: world.raycast(origin_x, origin_y, angle, max_range, &self.local),
        })
    }

    fn last_attacker(&self) -> Option<PeerId> {
        self.last_attacker.clone()
    }

    fn halt(&mut self) {
        self.halted = true;
        self.commits.clear();
        self.pending.clear();
    }

    fn stats(&self) -> SyncStats {
        self.stats
    }
}
