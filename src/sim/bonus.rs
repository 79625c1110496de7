//! Bonus pickups dropped by flagged enemies
//!
//! A bonus sits on the field blinking until a player drives over it or its
//! visibility timer runs out. Effects are applied by the collision engine.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use crate::consts::*;

/// The eight bonus effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusKind {
    /// Destroy every enemy on the field
    Grenade,
    /// Temporary shield for the collector
    Helmet,
    /// Freeze every enemy
    Clock,
    /// Fortify the eagle with temporary stone walls
    Shovel,
    /// One extra life
    ExtraLife,
    /// Raise the collector's weapon tier by one
    Star,
    /// Raise the collector's weapon tier to its cap
    Gun,
    /// Temporary water crossing
    Boat,
}

impl BonusKind {
    pub const ALL: [BonusKind; 8] = [
        BonusKind::Grenade,
        BonusKind::Helmet,
        BonusKind::Clock,
        BonusKind::Shovel,
        BonusKind::ExtraLife,
        BonusKind::Star,
        BonusKind::Gun,
        BonusKind::Boat,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bonus {
    pub id: u32,
    pub kind: BonusKind,
    pub pos: Vec2,
    pub active: bool,
    /// Seconds of visibility left
    pub life: f32,
    /// Wraps at the blink period; render-facing only
    pub blink: f32,
}

impl Bonus {
    pub fn new(id: u32, kind: BonusKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            active: true,
            life: BONUS_LIFETIME,
            blink: 0.0,
        }
    }

    /// Random kind at a random on-field position, away from the edges
    pub fn roll(id: u32, rng: &mut Pcg32) -> Self {
        let kind = BonusKind::ALL[rng.random_range(0..BonusKind::ALL.len())];
        let margin = TILE_SIZE * 2.0;
        let pos = Vec2::new(
            rng.random_range(margin..MAP_WIDTH - margin),
            rng.random_range(margin..MAP_HEIGHT - margin),
        );
        Self::new(id, kind, pos)
    }

    /// Advance timers; returns true if the bonus just timed out
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }
        self.blink = (self.blink + dt) % BONUS_BLINK_PERIOD;
        self.life -= dt;
        if self.life <= 0.0 {
            self.active = false;
            return true;
        }
        false
    }

    pub fn bbox(&self) -> Aabb {
        Aabb::from_center_size(self.pos, BONUS_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_bonus_times_out() {
        let mut bonus = Bonus::new(1, BonusKind::Helmet, Vec2::new(100.0, 100.0));
        assert!(!bonus.update(BONUS_LIFETIME - 0.1));
        assert!(bonus.update(0.2));
        assert!(!bonus.active);
    }

    #[test]
    fn test_roll_stays_on_field() {
        let mut rng = Pcg32::seed_from_u64(99);
        for id in 0..50 {
            let bonus = Bonus::roll(id, &mut rng);
            assert!(bonus.pos.x > 0.0 && bonus.pos.x < MAP_WIDTH);
            assert!(bonus.pos.y > 0.0 && bonus.pos.y < MAP_HEIGHT);
        }
    }
}
