//! Tank Arena - deterministic simulation core for a grid-based tank battle
//!
//! This crate is the headless game model: per-tick updates of tanks, bullets
//! and bonuses over a destructible tile map. Rendering, audio and input
//! binding are external collaborators that read [`sim::GameState`] and drain
//! its event queue each tick.
//!
//! Core module:
//! - `sim`: Deterministic simulation (entities, map, collisions, game state)

pub mod sim;

pub use sim::{GameEvent, GamePhase, GameState, TickInput, tick};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz logical tick)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Map dimensions
    pub const TILE_SIZE: f32 = 32.0;
    pub const MAP_COLS: usize = 26;
    pub const MAP_ROWS: usize = 26;
    pub const MAP_WIDTH: f32 = TILE_SIZE * MAP_COLS as f32;
    pub const MAP_HEIGHT: f32 = TILE_SIZE * MAP_ROWS as f32;

    /// Entity sizes (axis-aligned squares, centered on position)
    pub const TANK_SIZE: f32 = 56.0;
    pub const BULLET_SIZE: f32 = 8.0;
    pub const BONUS_SIZE: f32 = 32.0;

    /// Bullet defaults
    pub const BULLET_SPEED: f32 = 320.0;
    /// Extra bullet speed unlocked at power tier 2
    pub const BULLET_SPEED_BONUS: f32 = 100.0;
    pub const BULLET_LIFETIME: f32 = 3.0;

    /// Fire cooldown at tier 1; tier 3 unlocks the fast cooldown
    pub const FIRE_COOLDOWN: f32 = 0.8;
    pub const FIRE_COOLDOWN_FAST: f32 = 0.45;
    /// Movement speed multiplier unlocked at power tier 4
    pub const SPEED_TIER_MULT: f32 = 1.25;

    /// Status timer durations (seconds)
    pub const SPAWN_TIME: f32 = 1.0;
    pub const SPAWN_SHIELD_TIME: f32 = 3.0;
    pub const SHIELD_TIME: f32 = 10.0;
    pub const FREEZE_TIME: f32 = 8.0;
    pub const BOAT_TIME: f32 = 30.0;
    pub const FORTIFY_TIME: f32 = 15.0;
    /// How long a tank keeps coasting on ice after input stops
    pub const ICE_SLIDE_TIME: f32 = 0.25;
    /// Delay between an enemy's final death and its removal from the field
    pub const ENEMY_REMOVAL_DELAY: f32 = 0.5;
    /// Delay before a destroyed player re-enters the field
    pub const PLAYER_RESPAWN_DELAY: f32 = 1.0;

    /// Players
    pub const PLAYER_LIVES: u32 = 3;
    pub const MAX_PLAYERS: usize = 2;

    /// Enemy spawning
    pub const ENEMY_SPAWN_INTERVAL: f32 = 3.0;
    pub const ENEMY_FIELD_CAP: usize = 4;
    pub const ENEMY_QUOTA: u32 = 20;
    /// A spawn point is skipped while any non-spawning tank is this close
    pub const SPAWN_CLEARANCE: f32 = 64.0;
    /// Chance a freshly spawned enemy carries a bonus drop
    pub const BONUS_CARRY_CHANCE: f64 = 0.2;

    /// Bonus defaults
    pub const BONUS_LIFETIME: f32 = 15.0;
    pub const BONUS_BLINK_PERIOD: f32 = 0.25;
    pub const BONUS_SCORE: u32 = 500;

    /// Collision broad phase cell size
    pub const GRID_CELL_SIZE: f32 = 64.0;

    /// Enemy AI
    pub const STUCK_WINDOW: f32 = 0.5;
    pub const STUCK_EPSILON: f32 = 1.0;
    /// Lateral tolerance for the line-of-sight fire gate
    pub const LOS_TOLERANCE: f32 = 24.0;

    /// Win condition must hold this long before the level completes
    pub const WIN_CONFIRM_DELAY: f32 = 1.0;
    /// Built-in level rotation; finishing the last one wins the game
    pub const LEVEL_COUNT: usize = 3;
}
