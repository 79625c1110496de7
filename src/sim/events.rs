//! Tick-scoped event log
//!
//! Events are the sim's outbound channel: renderers and harnesses drain
//! them once per tick with [`super::state::GameState::take_events`]. They
//! never feed back into the simulation.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bonus::BonusKind;
use super::map::{BrickRemains, Tile};
use super::state::GamePhase;
use super::tank::{Direction, Faction};

/// How a bullet left the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletFate {
    Expired,
    OutOfBounds,
    HitTank,
    HitTerrain,
    HitBullet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    TankSpawned {
        id: u32,
        faction: Faction,
        pos: Vec2,
    },
    TankDamaged {
        id: u32,
        /// Armor layers left after the hit
        armor: i32,
    },
    TankDestroyed {
        id: u32,
        faction: Faction,
        pos: Vec2,
        /// Shooter tank id; None for grenade kills
        by: Option<u32>,
    },
    BulletFired {
        id: u32,
        owner: u32,
        faction: Faction,
        pos: Vec2,
        dir: Direction,
    },
    BulletGone {
        id: u32,
        fate: BulletFate,
    },
    BonusSpawned {
        id: u32,
        kind: BonusKind,
        pos: Vec2,
    },
    BonusCollected {
        id: u32,
        kind: BonusKind,
        by: u32,
    },
    BonusExpired {
        id: u32,
    },
    TileChanged {
        col: usize,
        row: usize,
        from: Tile,
        to: Tile,
        remains: BrickRemains,
    },
    EagleDestroyed,
    ScoreChanged {
        slot: usize,
        delta: u32,
        total: u32,
    },
    LevelComplete {
        level: usize,
    },
    GameOver,
}
