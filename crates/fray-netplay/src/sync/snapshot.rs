//! Snapshot ring for rollback.
//!
//! Keeps the most recent N world snapshots so a rollback can restore the
//! newest state at or before its target frame and resimulate from there.

use std::collections::VecDeque;

use fray_core::{Frame, PeerId, Player, WorldSnapshot};

/// Ring buffer of world snapshots, oldest first.
#[derive(Debug)]
pub struct SnapshotBuffer {
    snapshots: VecDeque<WorldSnapshot>,
    /// Maximum number of snapshots to keep.
    capacity: usize,
    /// Save every Nth frame.
    save_interval: Frame,
}

impl SnapshotBuffer {
    pub fn new(capacity: usize, save_interval: Frame) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            save_interval: save_interval.max(1),
        }
    }

    /// Whether this frame sits on the capture cadence.
    pub fn should_save(&self, frame: Frame) -> bool {
        frame % self.save_interval == 0
    }

    /// Pushes a snapshot, evicting the oldest past capacity.
    pub fn push(&mut self, snapshot: WorldSnapshot) {
        while self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// The newest snapshot at or before `frame`, scanning newest to oldest.
    pub fn find_at_or_before(&self, frame: Frame) -> Option<&WorldSnapshot> {
        self.snapshots.iter().rev().find(|s| s.frame <= frame)
    }

    /// Drops snapshots newer than `frame`. A rollback truncates here before
    /// resimulating, then re-captures on the way forward, so the ring never
    /// holds states that the corrected timeline contradicts.
    pub fn truncate_after(&mut self, frame: Frame) {
        while self
            .snapshots
            .back()
            .is_some_and(|newest| newest.frame > frame)
        {
            self.snapshots.pop_back();
        }
    }

    /// Removes a departed peer (and their projectiles) from every retained
    /// snapshot, so a later restore cannot resurrect them.
    pub fn forget_peer(&mut self, peer: &PeerId) {
        for snapshot in &mut self.snapshots {
            snapshot.players.remove(peer);
            snapshot.projectiles.retain(|id, _| id.owner != *peer);
        }
    }

    /// Backfills every retained snapshot with a peer admitted mid-session,
    /// so that restoring pre-join history does not erase them. The spawn
    /// state stands in for the frames before the peer existed, which is
    /// also where the live world had them.
    pub fn admit_peer(&mut self, peer: &PeerId, player: &Player) {
        for snapshot in &mut self.snapshots {
            snapshot
                .players
                .entry(peer.clone())
                .or_insert_with(|| player.clone());
        }
    }

    pub fn latest(&self) -> Option<&WorldSnapshot> {
        self.snapshots.back()
    }

    pub fn oldest_frame(&self) -> Option<Frame> {
        self.snapshots.front().map(|s| s.frame)
    }

    pub fn newest_frame(&self) -> Option<Frame> {
        self.snapshots.back().map(|s| s.frame)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fray_core::World;

    fn snap(frame: Frame) -> WorldSnapshot {
        WorldSnapshot::capture(frame, &World::new())
    }

    #[test]
    fn ring_evicts_oldest_first() {
        let mut buf = SnapshotBuffer::new(5, 1);
        assert!(buf.is_empty());
        for frame in 0..6 {
            buf.push(snap(frame));
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.oldest_frame(), Some(1));
        assert_eq!(buf.newest_frame(), Some(5));
    }

    #[test]
    fn lookup_picks_newest_at_or_before_target() {
        let mut buf = SnapshotBuffer::new(10, 1);
        for frame in [0, 2, 4, 6, 8] {
            buf.push(snap(frame));
        }
        assert_eq!(buf.find_at_or_before(5).map(|s| s.frame), Some(4));
        assert_eq!(buf.find_at_or_before(4).map(|s| s.frame), Some(4));
        assert_eq!(buf.find_at_or_before(1).map(|s| s.frame), Some(0));
    }

    #[test]
    fn lookup_fails_below_oldest() {
        let mut buf = SnapshotBuffer::new(10, 1);
        for frame in [900, 950, 1000] {
            buf.push(snap(frame));
        }
        assert!(buf.find_at_or_before(500).is_none());
        assert_eq!(buf.oldest_frame(), Some(900));
    }

    #[test]
    fn save_cadence() {
        let buf = SnapshotBuffer::new(10, 5);
        assert!(buf.should_save(0));
        assert!(!buf.should_save(4));
        assert!(buf.should_save(5));
        assert!(buf.should_save(25));
    }

    #[test]
    fn forget_peer_scrubs_history() {
        use fray_core::{Player, Projectile, ProjectileId};

        let mut world = World::new();
        let bob = PeerId::from("bob");
        world.add_player(bob.clone(), Player::spawn(10.0, 10.0, "red"));
        world.add_projectile(
            ProjectileId::new(bob.clone(), 0),
            Projectile::with_velocity(10.0, 10.0, 2.0, 0.0),
        );

        let mut buf = SnapshotBuffer::new(4, 1);
        buf.push(WorldSnapshot::capture(0, &world));
        buf.forget_peer(&bob);

        let snapshot = buf.latest().unwrap();
        assert!(snapshot.players.is_empty());
        assert!(snapshot.projectiles.is_empty());
    }

    #[test]
    fn admit_peer_backfills_only_where_missing() {
        use fray_core::Player;

        let bob = PeerId::from("bob");
        let mut with_bob = World::new();
        with_bob.add_player(bob.clone(), Player::spawn(250.0, 250.0, "red"));

        let mut buf = SnapshotBuffer::new(4, 1);
        buf.push(snap(0));
        buf.push(WorldSnapshot::capture(1, &with_bob));

        buf.admit_peer(&bob, &Player::spawn(400.0, 300.0, "red"));

        // The pre-join snapshot gains the spawn state; the one that already
        // knew bob keeps its own record.
        assert_eq!(buf.find_at_or_before(0).unwrap().players[&bob].x, 400.0);
        assert_eq!(buf.find_at_or_before(1).unwrap().players[&bob].x, 250.0);
    }

    #[test]
    fn truncate_drops_newer_snapshots_only() {
        let mut buf = SnapshotBuffer::new(10, 1);
        for frame in [0, 5, 10, 15, 20] {
            buf.push(snap(frame));
        }
        buf.truncate_after(10);
        assert_eq!(buf.newest_frame(), Some(10));
        assert_eq!(buf.oldest_frame(), Some(0));
        assert_eq!(buf.len(), 3);
    }
}
