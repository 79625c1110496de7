//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (insertion order, ids strictly increasing)
//! - No rendering or platform dependencies

pub mod bonus;
pub mod bullet;
pub mod collision;
pub mod events;
pub mod map;
pub mod state;
pub mod tank;
pub mod tick;

pub use bonus::{Bonus, BonusKind};
pub use bullet::{Bullet, BulletSpawn};
pub use collision::{Aabb, SpatialGrid};
pub use events::{BulletFate, GameEvent};
pub use map::{BrickHit, BrickRemains, BrickState, LevelError, Tile, TileMap};
pub use state::{GamePhase, GameState, PlayerInput, TickInput};
pub use tank::{Direction, Faction, HitResult, Tank, Team};
pub use tick::tick;
