//! One peer's netcode session.
//!
//! The session owns everything the two strategies share: the world, the
//! transport, the connection roster, projectile spawning, hit accounting,
//! hitscan firing, host-pushed state sync, and defeat. Per-tick it
//! reconciles membership, routes inbound traffic (strategy first, shared
//! handling second), runs the strategy's tick, and flushes whatever got
//! queued for broadcast.

use std::collections::{BTreeSet, HashSet, VecDeque};

use fray_core::constants::{HITSCAN_DAMAGE, PROJECTILE_DAMAGE};
use fray_core::{Frame, Input, PeerId, Player, Projectile, ProjectileId, World};
use fray_netproto::messages::combat::{Hit, Laser, WeaponKind};
use fray_netproto::messages::session::{InitialSync, PlayerState, ProjectileState, SyncState};
use fray_netproto::messages::state::NewProjectile;
use fray_netproto::{decode_message, encode_message, Inbound, Message};
use tracing::{debug, info, warn};

use crate::config::NetcodeConfig;
use crate::error::NetcodeError;
use crate::sync::delay::DelayNetcode;
use crate::sync::rollback::RollbackNetcode;
use crate::sync::{HitscanShot, NetcodeMode, NetcodeStrategy, Outbox, SyncStats};
use crate::transport::PeerTransport;

/// Hit keys remembered for deduplication before the oldest are forgotten.
const HIT_MEMORY: usize = 256;

/// Key a hit notification deduplicates under: the projectile id when there
/// is one, otherwise attacker plus send timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HitKey {
    Projectile(ProjectileId),
    Timed { by: PeerId, sent_ms: u64 },
}

/// Things that happened during a tick, for whatever embeds the session
/// (renderer, simulator, logs).
#[derive(Debug, Clone, PartialEq)]
pub enum NetcodeEvent {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    /// Adopted a host-pushed full state at `frame`.
    Synced { frame: Frame },
    RollbackPerformed { frames_resimulated: u64 },
    /// A correction pointed below the snapshot ring; recovery goes through
    /// a full-state resync.
    DesyncDetected { target: Frame, oldest: Option<Frame> },
    DamageTaken { by: PeerId, damage: f64 },
    /// The local player shrank to the defeat floor. The session halts.
    Defeated { by: Option<PeerId> },
    LaserFired { by: PeerId, start: (f64, f64), end: (f64, f64) },
}

/// A running netcode session for one local peer.
pub struct NetcodeSession<T: PeerTransport> {
    local: PeerId,
    config: NetcodeConfig,
    world: World,
    strategy: Box<dyn NetcodeStrategy>,
    transport: T,
    /// Peers admitted to the session, the local one included. State
    /// updates from anyone else are dropped until the roster poll admits
    /// them.
    roster: BTreeSet<PeerId>,
    roster_countdown: Frame,
    events: Vec<NetcodeEvent>,
    seen_hits: HashSet<HitKey>,
    hit_order: VecDeque<HitKey>,
    /// Capture timestamp of the newest adopted sync; older pushes lose.
    last_sync_ms: u64,
    next_projectile: u64,
    last_hitscan_ms: Option<u64>,
    last_attacker: Option<PeerId>,
    stopped: bool,
}

impl<T: PeerTransport> NetcodeSession<T> {
    pub fn new(
        local: PeerId,
        color: impl Into<String>,
        mode: NetcodeMode,
        config: NetcodeConfig,
        transport: T,
    ) -> Self {
        let mut world = World::new();
        let (center_x, center_y) = (config.arena.width / 2.0, config.arena.height / 2.0);
        world.add_player(local.clone(), Player::spawn(center_x, center_y, color));

        let strategy: Box<dyn NetcodeStrategy> = match mode {
            NetcodeMode::Delay => Box::new(DelayNetcode::new(local.clone(), config.clone())),
            NetcodeMode::Rollback => {
                Box::new(RollbackNetcode::new(local.clone(), config.clone(), &world))
            }
        };

        let mut roster = BTreeSet::new();
        roster.insert(local.clone());
        info!(peer = %local, %mode, "session opened");
        Self {
            local,
            config,
            world,
            strategy,
            transport,
            roster,
            roster_countdown: 0,
            events: Vec::new(),
            seen_hits: HashSet::new(),
            hit_order: VecDeque::new(),
            last_sync_ms: 0,
            next_projectile: 0,
            last_hitscan_ms: None,
            last_attacker: None,
            stopped: false,
        }
    }

    pub fn local(&self) -> &PeerId {
        &self.local
    }

    pub fn mode(&self) -> NetcodeMode {
        self.strategy.mode()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn current_frame(&self) -> Frame {
        self.strategy.current_frame()
    }

    pub fn stats(&self) -> SyncStats {
        self.strategy.stats()
    }

    pub fn roster(&self) -> &BTreeSet<PeerId> {
        &self.roster
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The lowest connected peer id carries host duty (pushing full-state
    /// syncs). Deterministic on every peer without any election traffic.
    pub fn is_host(&self) -> bool {
        self.roster.first() == Some(&self.local)
    }

    /// Events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<NetcodeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances the session by one tick: reconcile membership, apply
    /// inbound traffic, simulate one frame, flush broadcasts, check for
    /// defeat.
    pub fn tick(&mut self, local_input: Input, now_ms: u64) -> Result<(), NetcodeError> {
        if self.stopped {
            return Ok(());
        }
        self.poll_roster(now_ms)?;
        self.pump_inbound(now_ms)?;

        let mut outbox = Outbox::default();
        let attacker_before = self.strategy.last_attacker();
        self.strategy
            .tick(&mut self.world, local_input, now_ms, &mut outbox)?;
        self.adopt_attacker(attacker_before);
        self.flush(&mut outbox, now_ms)?;
        self.check_defeat(now_ms);
        Ok(())
    }

    /// Launches a projectile from the local player's true position along
    /// `angle` and announces it. `None` when the session is stopped or the
    /// local player is gone.
    pub fn spawn_projectile(
        &mut self,
        angle: f64,
        now_ms: u64,
    ) -> Result<Option<ProjectileId>, NetcodeError> {
        if self.stopped {
            return Ok(None);
        }
        let Some(me) = self.world.players.get(&self.local) else {
            return Ok(None);
        };
        let projectile = Projectile::launch(me.x, me.y, angle);
        let id = ProjectileId::new(self.local.clone(), self.next_projectile);
        self.next_projectile += 1;
        let spawn = NewProjectile {
            id: id.clone(),
            x: projectile.x,
            y: projectile.y,
            vx: projectile.vx,
            vy: projectile.vy,
            radius: projectile.radius,
        };
        self.world.add_projectile(id.clone(), projectile);
        self.send_now(&Message::NewProj(spawn), now_ms)?;
        Ok(Some(id))
    }

    /// Fires the hitscan weapon along `angle`, subject to its cooldown.
    ///
    /// The beam resolves instantly through the strategy's view of the
    /// arena (true positions under rollback, delayed under delay). On a
    /// hit the victim is notified and applies its own damage; the
    /// shooter's copy converges through position corrections instead of
    /// applying damage a second time.
    pub fn fire_hitscan(
        &mut self,
        angle: f64,
        now_ms: u64,
    ) -> Result<Option<HitscanShot>, NetcodeError> {
        if self.stopped {
            return Ok(None);
        }
        if self
            .last_hitscan_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.hitscan_cooldown_ms)
        {
            return Ok(None);
        }
        let Some(shot) = self
            .strategy
            .hitscan(&self.world, angle, self.config.hitscan_range)
        else {
            return Ok(None);
        };
        self.last_hitscan_ms = Some(now_ms);

        let reach = shot
            .hit
            .as_ref()
            .map_or(self.config.hitscan_range, |hit| hit.range);
        let (origin_x, origin_y) = shot.origin;
        let end = (origin_x + angle.cos() * reach, origin_y + angle.sin() * reach);

        if let Some(hit) = &shot.hit {
            info!(victim = %hit.victim, range = hit.range, "hitscan connected");
            self.send_now(
                &Message::Hit(Hit {
                    victim: hit.victim.clone(),
                    by: self.local.clone(),
                    weapon: WeaponKind::Hitscan,
                    proj_id: None,
                    damage: HITSCAN_DAMAGE,
                }),
                now_ms,
            )?;
        }
        self.send_now(
            &Message::Laser(Laser {
                start_x: origin_x,
                start_y: origin_y,
                end_x: end.0,
                end_y: end.1,
            }),
            now_ms,
        )?;
        self.events.push(NetcodeEvent::LaserFired {
            by: self.local.clone(),
            start: (origin_x, origin_y),
            end,
        });
        Ok(Some(shot))
    }

    /// Halts simulation and announces departure. Idempotent; a transport
    /// already gone only costs the goodbye.
    pub fn stop(&mut self, now_ms: u64) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.strategy.halt();
        if let Err(error) = self.send_now(&Message::Left, now_ms) {
            warn!(%error, "departure notice lost");
        }
    }

    /// Polls transport membership on a frame cadence and reconciles the
    /// session with it: joiners get spawned (and, from the host, the full
    /// state), leavers get scrubbed.
    fn poll_roster(&mut self, now_ms: u64) -> Result<(), NetcodeError> {
        if self.roster_countdown > 0 {
            self.roster_countdown -= 1;
            return Ok(());
        }
        self.roster_countdown = self.config.roster_poll_frames;

        let connected: BTreeSet<PeerId> = self.transport.roster().into_iter().collect();
        let joined: Vec<PeerId> = connected.difference(&self.roster).cloned().collect();
        let left: Vec<PeerId> = self
            .roster
            .difference(&connected)
            .filter(|peer| **peer != self.local)
            .cloned()
            .collect();

        let any_joined = !joined.is_empty();
        for peer in joined {
            info!(%peer, "peer joined");
            self.roster.insert(peer.clone());
            let (center_x, center_y) =
                (self.config.arena.width / 2.0, self.config.arena.height / 2.0);
            self.world
                .add_player(peer.clone(), Player::spawn(center_x, center_y, "red"));
            self.strategy.observe_peer(&peer, &self.world);
            self.events.push(NetcodeEvent::PeerJoined(peer));
        }
        if any_joined && self.is_host() {
            self.send_initial_sync(now_ms)?;
        }
        for peer in left {
            self.forget(peer);
        }
        Ok(())
    }

    /// Drains the transport and routes every decodable line. Undecodable
    /// ones are logged and skipped; one bad peer must not stall the tick.
    fn pump_inbound(&mut self, now_ms: u64) -> Result<(), NetcodeError> {
        while let Some(line) = self.transport.try_recv() {
            match decode_message(&line) {
                Ok(inbound) => self.route(inbound, now_ms)?,
                Err(error) => {
                    warn!(%error, "dropping undecodable packet");
                }
            }
        }
        Ok(())
    }

    /// Strategy first, shared handling second. A rollback that cannot be
    /// served turns into a resync request instead of an error.
    fn route(&mut self, inbound: Inbound, now_ms: u64) -> Result<(), NetcodeError> {
        // State updates from peers the roster has not admitted yet are
        // dropped; membership, combat and sync traffic always lands.
        let gated = matches!(
            inbound.message,
            Message::Pos(_) | Message::NewProj(_) | Message::ProjPos(_) | Message::Laser(_)
        );
        if gated && !self.roster.contains(&inbound.sender) {
            debug!(sender = %inbound.sender, kind = %inbound.message.kind(), "dropped packet from unknown peer");
            return Ok(());
        }

        let mut outbox = Outbox::default();
        let attacker_before = self.strategy.last_attacker();
        let stats_before = self.strategy.stats();
        let consumed = match self
            .strategy
            .on_message(&mut self.world, &inbound, now_ms, &mut outbox)
        {
            Ok(consumed) => consumed,
            Err(NetcodeError::RollbackImpossible { target, oldest }) => {
                warn!(
                    target_frame = target,
                    ?oldest,
                    "correction beyond the snapshot ring, requesting resync"
                );
                self.events
                    .push(NetcodeEvent::DesyncDetected { target, oldest });
                if self.is_host() {
                    self.send_initial_sync(now_ms)?;
                } else {
                    self.send_now(&Message::ForceUpdate, now_ms)?;
                }
                true
            }
            Err(other) => return Err(other),
        };
        self.adopt_attacker(attacker_before);
        let stats_after = self.strategy.stats();
        if stats_after.rollbacks > stats_before.rollbacks {
            self.events.push(NetcodeEvent::RollbackPerformed {
                frames_resimulated: stats_after.frames_resimulated
                    - stats_before.frames_resimulated,
            });
        }
        self.flush(&mut outbox, now_ms)?;
        if consumed {
            return Ok(());
        }
        self.handle_shared(inbound, now_ms)
    }

    /// Traffic both strategies share.
    fn handle_shared(&mut self, inbound: Inbound, now_ms: u64) -> Result<(), NetcodeError> {
        match inbound.message {
            Message::NewProj(spawn) => {
                let projectile = Projectile {
                    x: spawn.x,
                    y: spawn.y,
                    vx: spawn.vx,
                    vy: spawn.vy,
                    radius: spawn.radius,
                };
                self.world.add_projectile(spawn.id, projectile);
            }
            Message::ProjDel(gone) => {
                self.world.remove_projectile(&gone.id);
            }
            Message::Hit(hit) => self.apply_hit(&hit, inbound.sent_ms),
            Message::Laser(laser) => {
                self.events.push(NetcodeEvent::LaserFired {
                    by: inbound.sender,
                    start: (laser.start_x, laser.start_y),
                    end: (laser.end_x, laser.end_y),
                });
            }
            Message::Left => {
                self.forget(inbound.sender);
            }
            Message::InitialSync(sync) => self.apply_initial_sync(&inbound.sender, sync),
            Message::ForceUpdate => {
                if self.is_host() {
                    debug!(requester = %inbound.sender, "resync requested");
                    self.send_initial_sync(now_ms)?;
                }
            }
            other => {
                debug!(kind = %other.kind(), sender = %inbound.sender, "unhandled message");
            }
        }
        Ok(())
    }

    /// Applies a hit notification: dedup, derive damage from the weapon
    /// (the wire damage field is advisory), drop the projectile, shrink
    /// the victim.
    fn apply_hit(&mut self, hit: &Hit, sent_ms: u64) {
        let key = match &hit.proj_id {
            Some(id) => HitKey::Projectile(id.clone()),
            None => HitKey::Timed {
                by: hit.by.clone(),
                sent_ms,
            },
        };
        if !self.remember_hit(key) {
            debug!(victim = %hit.victim, by = %hit.by, "duplicate hit dropped");
            return;
        }
        let damage = match hit.weapon {
            WeaponKind::Hitscan => HITSCAN_DAMAGE,
            WeaponKind::Projectile => PROJECTILE_DAMAGE,
        };
        if let Some(id) = &hit.proj_id {
            self.world.remove_projectile(id);
        }
        if let Some(player) = self.world.players.get_mut(&hit.victim) {
            player.take_damage(damage);
        }
        if hit.victim == self.local {
            self.last_attacker = Some(hit.by.clone());
            self.events.push(NetcodeEvent::DamageTaken {
                by: hit.by.clone(),
                damage,
            });
        }
    }

    /// True when the key is new. Memory is bounded; the oldest keys are
    /// forgotten first.
    fn remember_hit(&mut self, key: HitKey) -> bool {
        if self.seen_hits.contains(&key) {
            return false;
        }
        self.seen_hits.insert(key.clone());
        self.hit_order.push_back(key);
        while self.hit_order.len() > HIT_MEMORY {
            if let Some(oldest) = self.hit_order.pop_front() {
                self.seen_hits.remove(&oldest);
            }
        }
        true
    }

    /// Adopts a pushed full state. Only the elected host's push counts,
    /// and only when its capture is newer than the last one adopted.
    fn apply_initial_sync(&mut self, sender: &PeerId, sync: InitialSync) {
        if self.roster.first() != Some(sender) {
            debug!(%sender, "sync from non-host ignored");
            return;
        }
        if sync.state.timestamp <= self.last_sync_ms {
            debug!(
                timestamp = sync.state.timestamp,
                newest = self.last_sync_ms,
                "stale sync ignored"
            );
            return;
        }
        self.last_sync_ms = sync.state.timestamp;

        let mut world = World::new();
        for player in &sync.state.players {
            world.add_player(
                player.id.clone(),
                Player {
                    x: player.x,
                    y: player.y,
                    radius: player.radius,
                    color: player.color.clone(),
                },
            );
        }
        for projectile in &sync.state.projectiles {
            world.add_projectile(
                projectile.id.clone(),
                Projectile {
                    x: projectile.x,
                    y: projectile.y,
                    vx: projectile.vx,
                    vy: projectile.vy,
                    radius: projectile.radius,
                },
            );
        }
        // A capture from before the host noticed us must not erase the
        // local player.
        if !world.players.contains_key(&self.local) {
            if let Some(me) = self.world.players.get(&self.local) {
                world.add_player(self.local.clone(), me.clone());
            }
        }
        self.world = world;
        self.roster = self.world.players.keys().cloned().collect();
        self.roster.insert(self.local.clone());
        self.strategy.adopt_sync(sync.frame, &self.world);
        self.events.push(NetcodeEvent::Synced { frame: sync.frame });
        info!(%sender, frame = sync.frame, "world replaced by sync");
    }

    fn send_initial_sync(&mut self, now_ms: u64) -> Result<(), NetcodeError> {
        let state = SyncState {
            timestamp: now_ms,
            players: self
                .world
                .players
                .iter()
                .map(|(id, player)| PlayerState {
                    id: id.clone(),
                    x: player.x,
                    y: player.y,
                    radius: player.radius,
                    color: player.color.clone(),
                })
                .collect(),
            projectiles: self
                .world
                .projectiles
                .iter()
                .map(|(id, projectile)| ProjectileState {
                    id: id.clone(),
                    x: projectile.x,
                    y: projectile.y,
                    vx: projectile.vx,
                    vy: projectile.vy,
                    radius: projectile.radius,
                })
                .collect(),
        };
        let sync = InitialSync {
            frame: self.strategy.current_frame(),
            state,
        };
        info!(frame = sync.frame, "pushing full state");
        self.send_now(&Message::InitialSync(sync), now_ms)
    }

    fn forget(&mut self, peer: PeerId) {
        info!(%peer, "peer left");
        self.roster.remove(&peer);
        self.world.remove_player(&peer);
        self.world.remove_projectiles_of(&peer);
        self.strategy.forget_peer(&peer);
        self.events.push(NetcodeEvent::PeerLeft(peer));
    }

    /// Picks up an attacker the strategy recorded during its last call.
    fn adopt_attacker(&mut self, before: Option<PeerId>) {
        let after = self.strategy.last_attacker();
        if after != before && after.is_some() {
            self.last_attacker = after;
        }
    }

    fn check_defeat(&mut self, now_ms: u64) {
        let defeated = self
            .world
            .players
            .get(&self.local)
            .is_some_and(Player::is_defeated);
        if !defeated || self.stopped {
            return;
        }
        let by = self.last_attacker.clone();
        info!(?by, "defeated");
        self.events.push(NetcodeEvent::Defeated { by });
        self.stop(now_ms);
    }

    fn flush(&mut self, outbox: &mut Outbox, now_ms: u64) -> Result<(), NetcodeError> {
        let queued: Vec<Message> = outbox.drain().collect();
        for message in &queued {
            self.send_now(message, now_ms)?;
        }
        Ok(())
    }

    fn send_now(&self, message: &Message, now_ms: u64) -> Result<(), NetcodeError> {
        let line = encode_message(message, &self.local, now_ms)?;
        self.transport.send(&line)
    }
}
