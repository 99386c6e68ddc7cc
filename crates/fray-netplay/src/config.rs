//! Session tuning knobs.

use clap::ValueEnum;
use fray_core::constants::HITSCAN_COOLDOWN_MS;
use fray_core::{ArenaBounds, Frame};

/// How per-peer delay measurements combine into the one scalar the delay
/// strategy schedules against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DelayPolicy {
    /// Mean of the per-peer means. Smooth, tolerates one slow peer.
    #[default]
    Average,
    /// Largest per-peer mean. Everyone waits for the slowest link, which
    /// never acts on state that has not arrived yet.
    Maximum,
}

/// Tuning for one netcode session.
///
/// `Default` matches the values the game shipped with; tests override
/// individual fields to force edge cases (tiny snapshot rings, zero
/// thresholds, instant polls).
#[derive(Debug, Clone)]
pub struct NetcodeConfig {
    /// Frames of input history retained per peer.
    pub input_window: usize,
    /// Snapshots retained for rollback.
    pub snapshot_capacity: usize,
    /// Capture a snapshot every this many frames.
    pub snapshot_interval: Frame,
    /// Remote inputs older than `current_frame - ignore_threshold` are
    /// recorded for prediction continuity but never trigger a rollback.
    pub ignore_threshold: Frame,
    /// Delay samples retained per peer for the running mean.
    pub delay_samples: usize,
    /// Effective-delay policy for the delay strategy.
    pub delay_policy: DelayPolicy,
    /// Milliseconds between pong broadcasts.
    pub pong_interval_ms: u64,
    /// Frames between roster polls.
    pub roster_poll_frames: Frame,
    /// Arena rectangle. Projectiles expire a margin beyond it.
    pub arena: ArenaBounds,
    /// Maximum hitscan distance.
    pub hitscan_range: f64,
    /// Minimum milliseconds between hitscan shots.
    pub hitscan_cooldown_ms: u64,
}

impl Default for NetcodeConfig {
    fn default() -> Self {
        Self {
            input_window: 60,
            snapshot_capacity: 120,
            snapshot_interval: 5,
            ignore_threshold: 600,
            delay_samples: 10,
            delay_policy: DelayPolicy::Average,
            pong_interval_ms: 100,
            roster_poll_frames: 60,
            arena: ArenaBounds::new(800.0, 600.0),
            hitscan_range: 1000.0,
            hitscan_cooldown_ms: HITSCAN_COOLDOWN_MS,
        }
    }
}
