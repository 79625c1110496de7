//! Bullet entity
//!
//! Velocity is fixed at creation from direction and speed and never
//! recalculated. Bounds checks are the collision engine's job; a bullet
//! only knows how to fly and how to expire.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::tank::{Direction, Faction};
use crate::consts::*;

/// Everything needed to create a bullet, produced by [`super::tank::Tank::fire`]
#[derive(Debug, Clone, Copy)]
pub struct BulletSpawn {
    pub pos: Vec2,
    pub dir: Direction,
    pub speed: f32,
    pub power: i32,
    pub owner: u32,
    pub owner_faction: Faction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub owner: u32,
    pub owner_faction: Faction,
    pub dir: Direction,
    pub pos: Vec2,
    pub vel: Vec2,
    pub power: i32,
    pub active: bool,
    pub age: f32,
    pub lifetime: f32,
}

impl Bullet {
    pub fn new(id: u32, spawn: &BulletSpawn) -> Self {
        Self {
            id,
            owner: spawn.owner,
            owner_faction: spawn.owner_faction,
            dir: spawn.dir,
            pos: spawn.pos,
            vel: spawn.dir.vector() * spawn.speed,
            power: spawn.power,
            active: true,
            age: 0.0,
            lifetime: BULLET_LIFETIME,
        }
    }

    /// Integrate position; returns true if the bullet just expired
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }
        self.pos += self.vel * dt;
        self.age += dt;
        if self.age >= self.lifetime {
            self.active = false;
            return true;
        }
        false
    }

    pub fn bbox(&self) -> Aabb {
        Aabb::from_center_size(self.pos, BULLET_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn() -> BulletSpawn {
        BulletSpawn {
            pos: Vec2::new(100.0, 100.0),
            dir: Direction::Right,
            speed: BULLET_SPEED,
            power: 1,
            owner: 1,
            owner_faction: Faction::Player1,
        }
    }

    #[test]
    fn test_velocity_fixed_at_creation() {
        let bullet = Bullet::new(1, &spawn());
        assert_eq!(bullet.vel, Vec2::new(BULLET_SPEED, 0.0));
    }

    #[test]
    fn test_expires_after_lifetime() {
        let mut bullet = Bullet::new(1, &spawn());
        let dt = 1.0 / 60.0;
        let mut expired = false;
        for _ in 0..(60.0 * BULLET_LIFETIME) as usize + 2 {
            if bullet.update(dt) {
                expired = true;
                break;
            }
        }
        assert!(expired);
        assert!(!bullet.active);
        // A dead bullet reports expiry only once
        assert!(!bullet.update(dt));
    }
}
