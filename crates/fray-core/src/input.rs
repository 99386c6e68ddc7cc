//! Per-frame directional input.

use serde::{Deserialize, Serialize};

/// One player's input for one frame: four independent held directions.
///
/// This is the unit the input buffer stores, predicts, and ships over the
/// wire. It stays deliberately tiny; anything derived from it (movement
/// deltas, idle detection) happens at use sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Input {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
}

impl Input {
    /// The no-op input: nothing held. Also the default prediction for a peer
    /// we have never heard from.
    pub const NONE: Input = Input {
        up: false,
        left: false,
        down: false,
        right: false,
    };

    pub fn new(up: bool, left: bool, down: bool, right: bool) -> Self {
        Self {
            up,
            left,
            down,
            right,
        }
    }

    /// True if no direction is held.
    pub fn is_idle(&self) -> bool {
        *self == Self::NONE
    }
}
