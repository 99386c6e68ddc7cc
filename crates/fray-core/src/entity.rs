//! Players and projectiles.
//!
//! Both are circles on an unbounded plane. Players shrink when damaged and
//! are defeated once their radius hits the floor; projectiles fly in a
//! straight line until they hit someone or leave the arena.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFEAT_RADIUS, MOVE_SPEED, PLAYER_SPAWN_RADIUS, PROJECTILE_RADIUS, PROJECTILE_SPEED,
};
use crate::input::Input;

/// A player avatar. The radius doubles as the health bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: String,
}

impl Player {
    pub fn spawn(x: f64, y: f64, color: impl Into<String>) -> Self {
        Self {
            x,
            y,
            radius: PLAYER_SPAWN_RADIUS,
            color: color.into(),
        }
    }

    /// Moves one tick's worth in each held direction. Axes are independent,
    /// so diagonals cover `MOVE_SPEED` per axis rather than being normalized.
    pub fn apply_movement(&mut self, input: Input) {
        if input.up {
            self.y -= MOVE_SPEED;
        }
        if input.down {
            self.y += MOVE_SPEED;
        }
        if input.left {
            self.x -= MOVE_SPEED;
        }
        if input.right {
            self.x += MOVE_SPEED;
        }
    }

    /// Shrinks the player, never below the defeat floor.
    pub fn take_damage(&mut self, amount: f64) {
        self.radius = (self.radius - amount).max(DEFEAT_RADIUS);
    }

    pub fn is_defeated(&self) -> bool {
        self.radius <= DEFEAT_RADIUS
    }
}

/// A projectile in flight. Ownership lives in its [`ProjectileId`] key, not
/// here, so snapshots stay plain position-plus-velocity records.
///
/// [`ProjectileId`]: crate::id::ProjectileId
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
}

impl Projectile {
    /// Spawns a projectile heading along `angle` (radians, screen
    /// coordinates: positive y is down).
    pub fn launch(x: f64, y: f64, angle: f64) -> Self {
        Self {
            x,
            y,
            vx: angle.cos() * PROJECTILE_SPEED,
            vy: angle.sin() * PROJECTILE_SPEED,
            radius: PROJECTILE_RADIUS,
        }
    }

    pub fn with_velocity(x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            radius: PROJECTILE_RADIUS,
        }
    }

    /// One tick of straight-line flight.
    pub fn advance(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
    }
}

/// Strict circle overlap: touching circles do not collide.
///
/// Compares squared distances so the check is pure arithmetic.
pub fn circles_overlap(x1: f64, y1: f64, r1: f64, x2: f64, y2: f64, r2: f64) -> bool {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let reach = r1 + r2;
    dx * dx + dy * dy < reach * reach
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_applies_each_axis_independently() {
        let mut p = Player::spawn(100.0, 100.0, "#ff0000");
        p.apply_movement(Input {
            up: true,
            left: true,
            down: false,
            right: false,
        });
        assert_eq!((p.x, p.y), (97.0, 97.0));
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut p = Player::spawn(50.0, 50.0, "#00ff00");
        p.apply_movement(Input {
            up: true,
            down: true,
            left: true,
            right: true,
        });
        assert_eq!((p.x, p.y), (50.0, 50.0));
    }

    #[test]
    fn damage_floors_at_defeat_radius() {
        let mut p = Player::spawn(0.0, 0.0, "#123456");
        p.take_damage(100.0);
        assert_eq!(p.radius, DEFEAT_RADIUS);
        assert!(p.is_defeated());
    }

    #[test]
    fn fresh_player_survives_three_projectile_hits() {
        let mut p = Player::spawn(0.0, 0.0, "#123456");
        for _ in 0..3 {
            p.take_damage(crate::constants::PROJECTILE_DAMAGE);
            assert!(!p.is_defeated());
        }
        p.take_damage(crate::constants::PROJECTILE_DAMAGE);
        assert!(p.is_defeated());
    }

    #[test]
    fn overlap_is_strict() {
        // Distance 3, radii 5 + 3: overlapping.
        assert!(circles_overlap(100.0, 100.0, 5.0, 103.0, 100.0, 3.0));
        // Exactly touching circles do not count.
        assert!(!circles_overlap(0.0, 0.0, 4.0, 8.0, 0.0, 4.0));
        assert!(!circles_overlap(0.0, 0.0, 4.0, 9.0, 0.0, 4.0));
    }

    #[test]
    fn projectile_advances_by_velocity() {
        let mut p = Projectile::with_velocity(10.0, 20.0, 2.0, -1.5);
        p.advance();
        p.advance();
        assert_eq!((p.x, p.y), (14.0, 17.0));
    }

    #[test]
    fn launch_angle_zero_heads_right() {
        let p = Projectile::launch(0.0, 0.0, 0.0);
        assert_eq!(p.vx, PROJECTILE_SPEED);
        assert_eq!(p.vy, 0.0);
    }
}
