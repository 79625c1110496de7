//! Tanks: the player-controlled and AI-controlled vehicles
//!
//! A tank is a state machine over a handful of timers. While the spawn
//! timer runs the tank is intangible (zero-area bounding box). Movement is
//! intent-based: `drive` records direction and speed, `stop` marks the tank
//! blocked for the tick, and `update` integrates whatever intent is left.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet::BulletSpawn;
use super::collision::Aabb;
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit vector in screen space (y grows downward)
    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code % 4 {
            0 => Direction::Up,
            1 => Direction::Right,
            2 => Direction::Down,
            _ => Direction::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Players,
    Enemies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Player1,
    Player2,
    Basic,
    Fast,
    Power,
    Heavy,
}

/// Static per-faction tuning
#[derive(Debug, Clone, Copy)]
pub struct FactionParams {
    pub speed: f32,
    /// Base seconds between AI shots; players use the weapon-tier cooldown
    pub fire_interval: f32,
    pub power_cap: i32,
    /// Extra hits absorbed before destruction
    pub armor: i32,
    /// Probability of steering toward the nearest target on a re-think
    pub aim_bias: f64,
    /// Hold fire unless a target is roughly in the line of fire
    pub los_fire: bool,
    /// Points awarded to the shooter
    pub score: u32,
}

const PLAYER_PARAMS: FactionParams = FactionParams {
    speed: 150.0,
    fire_interval: FIRE_COOLDOWN,
    power_cap: 4,
    armor: 0,
    aim_bias: 0.0,
    los_fire: false,
    score: 0,
};

const BASIC_PARAMS: FactionParams = FactionParams {
    speed: 100.0,
    fire_interval: 1.2,
    power_cap: 1,
    armor: 0,
    aim_bias: 0.40,
    los_fire: false,
    score: 100,
};

const FAST_PARAMS: FactionParams = FactionParams {
    speed: 180.0,
    fire_interval: 1.0,
    power_cap: 1,
    armor: 1,
    aim_bias: 0.40,
    los_fire: false,
    score: 200,
};

const POWER_PARAMS: FactionParams = FactionParams {
    speed: 120.0,
    fire_interval: 0.6,
    power_cap: 2,
    armor: 2,
    aim_bias: 0.50,
    los_fire: true,
    score: 300,
};

const HEAVY_PARAMS: FactionParams = FactionParams {
    speed: 80.0,
    fire_interval: 1.0,
    power_cap: 2,
    armor: 3,
    aim_bias: 0.50,
    los_fire: false,
    score: 400,
};

impl Faction {
    pub fn team(self) -> Team {
        match self {
            Faction::Player1 | Faction::Player2 => Team::Players,
            _ => Team::Enemies,
        }
    }

    /// Player slot index, None for enemies
    pub fn player_slot(self) -> Option<usize> {
        match self {
            Faction::Player1 => Some(0),
            Faction::Player2 => Some(1),
            _ => None,
        }
    }

    pub fn params(self) -> &'static FactionParams {
        match self {
            Faction::Player1 | Faction::Player2 => &PLAYER_PARAMS,
            Faction::Basic => &BASIC_PARAMS,
            Faction::Fast => &FAST_PARAMS,
            Faction::Power => &POWER_PARAMS,
            Faction::Heavy => &HEAVY_PARAMS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TankTimers {
    pub cooldown: f32,
    pub shield: f32,
    pub frozen: f32,
    pub boat: f32,
    /// Intangible while positive
    pub spawn: f32,
    /// Momentum carry-over on ice
    pub slide: f32,
    /// Corpse linger before the sweep removes the tank
    pub removal: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiState {
    pub dir_timer: f32,
    pub fire_timer: f32,
    pub last_pos: Vec2,
    pub stuck_for: f32,
}

impl Default for AiState {
    fn default() -> Self {
        Self {
            dir_timer: 0.0,
            fire_timer: 0.5,
            last_pos: Vec2::ZERO,
            stuck_for: 0.0,
        }
    }
}

/// Result of a bullet hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    Absorbed,
    Wounded,
    Destroyed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    pub id: u32,
    pub faction: Faction,
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub dir: Direction,
    pub speed: f32,
    pub bbox: Aabb,
    /// Movement suppressed this tick (input stop or collision)
    pub blocked: bool,
    pub alive: bool,
    pub armor: i32,
    /// Weapon tier, 1 through the faction cap
    pub power: i32,
    pub lives: u32,
    pub carries_bonus: bool,
    pub pending_respawn: bool,
    pub timers: TankTimers,
    pub ai: AiState,
}

impl Tank {
    pub fn new(id: u32, faction: Faction, pos: Vec2) -> Self {
        let params = faction.params();
        let is_player = faction.team() == Team::Players;
        Self {
            id,
            faction,
            pos,
            prev_pos: pos,
            dir: if is_player { Direction::Up } else { Direction::Down },
            speed: 0.0,
            bbox: Aabb::point(pos),
            blocked: false,
            alive: true,
            armor: params.armor,
            power: 1,
            lives: if is_player { PLAYER_LIVES } else { 0 },
            carries_bonus: false,
            pending_respawn: false,
            timers: TankTimers {
                spawn: SPAWN_TIME,
                shield: if is_player { SPAWN_SHIELD_TIME } else { 0.0 },
                ..TankTimers::default()
            },
            ai: AiState {
                last_pos: pos,
                ..AiState::default()
            },
        }
    }

    pub fn is_spawning(&self) -> bool {
        self.timers.spawn > 0.0
    }

    /// Intangible tanks carry a zero-area box so nothing collides with them
    pub fn refresh_bbox(&mut self) {
        self.bbox = if self.alive && !self.is_spawning() {
            Aabb::from_center_size(self.pos, TANK_SIZE)
        } else {
            Aabb::point(self.pos)
        };
    }

    /// Record movement intent for this tick
    pub fn drive(&mut self, dir: Direction) {
        if !self.alive {
            return;
        }
        self.dir = dir;
        self.speed = self.current_speed();
        self.blocked = false;
        self.timers.slide = ICE_SLIDE_TIME;
    }

    /// Suppress movement this tick without forgetting direction or speed
    pub fn stop(&mut self) {
        self.blocked = true;
    }

    pub fn current_speed(&self) -> f32 {
        let base = self.faction.params().speed;
        if self.power >= 4 { base * SPEED_TIER_MULT } else { base }
    }

    fn bullet_speed(&self) -> f32 {
        if self.power >= 2 {
            BULLET_SPEED + BULLET_SPEED_BONUS
        } else {
            BULLET_SPEED
        }
    }

    fn cooldown_duration(&self) -> f32 {
        if self.power >= 3 {
            FIRE_COOLDOWN_FAST
        } else {
            self.faction.params().fire_interval
        }
    }

    /// Try to fire; Some only when alive, tangible, thawed, and off cooldown
    pub fn fire(&mut self) -> Option<BulletSpawn> {
        if !self.alive
            || self.is_spawning()
            || self.timers.frozen > 0.0
            || self.timers.cooldown > 0.0
        {
            return None;
        }
        self.timers.cooldown = self.cooldown_duration();
        let muzzle = self.pos + self.dir.vector() * (TANK_SIZE / 2.0 + BULLET_SIZE / 2.0 + 1.0);
        Some(BulletSpawn {
            pos: muzzle,
            dir: self.dir,
            speed: self.bullet_speed(),
            power: self.power,
            owner: self.id,
            owner_faction: self.faction,
        })
    }

    /// Apply one bullet hit
    pub fn take_damage(&mut self) -> HitResult {
        if self.timers.shield > 0.0 {
            return HitResult::Absorbed;
        }
        if self.timers.boat > 0.0 {
            // The boat soaks one hit and is lost
            self.timers.boat = 0.0;
            return HitResult::Absorbed;
        }
        if self.armor > 0 {
            // Armor sheds one layer per hit, whatever the bullet's tier
            self.armor -= 1;
            return HitResult::Wounded;
        }
        self.destroy();
        HitResult::Destroyed
    }

    fn destroy(&mut self) {
        self.alive = false;
        self.speed = 0.0;
        self.refresh_bbox();
        match self.faction.team() {
            Team::Players => {
                self.lives = self.lives.saturating_sub(1);
                self.pending_respawn = true;
                self.timers.removal = PLAYER_RESPAWN_DELAY;
            }
            Team::Enemies => {
                self.timers.removal = ENEMY_REMOVAL_DELAY;
            }
        }
    }

    /// Unconditional destruction, bypassing shields and armor
    pub fn obliterate(&mut self) {
        self.armor = 0;
        self.timers.shield = 0.0;
        self.timers.boat = 0.0;
        self.destroy();
    }

    /// Bring a player tank back at the given spawn; false if out of lives
    pub fn respawn(&mut self, pos: Vec2) -> bool {
        if self.lives == 0 {
            return false;
        }
        self.alive = true;
        self.pending_respawn = false;
        self.pos = pos;
        self.prev_pos = pos;
        self.dir = Direction::Up;
        self.speed = 0.0;
        self.blocked = false;
        self.power = 1;
        self.armor = self.faction.params().armor;
        self.timers = TankTimers {
            spawn: SPAWN_TIME,
            shield: SPAWN_SHIELD_TIME,
            ..TankTimers::default()
        };
        self.refresh_bbox();
        true
    }

    /// Raise the weapon tier by one, up to the faction cap
    pub fn upgrade(&mut self) {
        self.power = (self.power + 1).min(self.faction.params().power_cap);
    }

    /// Advance timers and integrate movement intent
    pub fn update(&mut self, dt: f32) {
        self.timers.cooldown = (self.timers.cooldown - dt).max(0.0);
        self.timers.shield = (self.timers.shield - dt).max(0.0);
        self.timers.frozen = (self.timers.frozen - dt).max(0.0);
        self.timers.boat = (self.timers.boat - dt).max(0.0);
        self.timers.slide = (self.timers.slide - dt).max(0.0);

        if !self.alive {
            self.timers.removal -= dt;
            return;
        }
        if self.is_spawning() {
            self.timers.spawn -= dt;
            self.refresh_bbox();
            return;
        }

        self.prev_pos = self.pos;
        if self.timers.frozen > 0.0 {
            self.refresh_bbox();
            return;
        }
        if self.blocked {
            self.blocked = false;
        } else if self.speed > 0.0 {
            self.pos += self.dir.vector() * self.speed * dt;
        }
        self.refresh_bbox();
    }

    /// One AI think step; returns true when the tank wants to fire.
    ///
    /// Targets are player centers plus the eagle. Direction changes happen
    /// on a timer, sooner when the tank has not moved for a while.
    pub fn update_ai(&mut self, dt: f32, targets: &[Vec2], rng: &mut Pcg32) -> bool {
        if !self.alive || self.is_spawning() || self.timers.frozen > 0.0 {
            return false;
        }
        let params = self.faction.params();

        self.ai.dir_timer -= dt;
        self.ai.fire_timer -= dt;

        if self.pos.distance(self.ai.last_pos) < STUCK_EPSILON {
            self.ai.stuck_for += dt;
        } else {
            self.ai.stuck_for = 0.0;
            self.ai.last_pos = self.pos;
        }
        if self.ai.stuck_for >= STUCK_WINDOW {
            self.ai.stuck_for = 0.0;
            self.ai.dir_timer = 0.0;
        }

        if self.ai.dir_timer <= 0.0 {
            self.ai.dir_timer = rng.random_range(0.8..2.5);
            let target = targets
                .iter()
                .copied()
                .min_by(|a, b| {
                    a.distance_squared(self.pos)
                        .partial_cmp(&b.distance_squared(self.pos))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            let roll: f64 = rng.random();
            let dir = match target {
                Some(target) if roll < params.aim_bias => {
                    // Chase along the dominant axis
                    let delta = target - self.pos;
                    if delta.x.abs() > delta.y.abs() {
                        if delta.x > 0.0 { Direction::Right } else { Direction::Left }
                    } else if delta.y > 0.0 {
                        Direction::Down
                    } else {
                        Direction::Up
                    }
                }
                Some(target) if roll < params.aim_bias + 0.25 => {
                    // Flank along the other axis
                    let delta = target - self.pos;
                    if delta.x.abs() > delta.y.abs() {
                        if delta.y > 0.0 { Direction::Down } else { Direction::Up }
                    } else if delta.x > 0.0 {
                        Direction::Right
                    } else {
                        Direction::Left
                    }
                }
                _ => Direction::ALL[rng.random_range(0..4)],
            };
            self.drive(dir);
        } else {
            self.drive(self.dir);
        }

        if self.ai.fire_timer <= 0.0 {
            self.ai.fire_timer = params.fire_interval * rng.random_range(0.8..1.6);
            if params.los_fire {
                return targets.iter().any(|t| self.roughly_in_sights(*t));
            }
            return true;
        }
        false
    }

    /// Target is ahead along the facing axis and nearly aligned on the other
    fn roughly_in_sights(&self, target: Vec2) -> bool {
        let delta = target - self.pos;
        if self.dir.is_horizontal() {
            delta.y.abs() <= LOS_TOLERANCE && delta.x * self.dir.vector().x > 0.0
        } else {
            delta.x.abs() <= LOS_TOLERANCE && delta.y * self.dir.vector().y > 0.0
        }
    }
}
