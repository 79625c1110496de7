//! The tick function: one fixed step of the whole simulation
//!
//! Order within a tick is part of the contract and must not be shuffled:
//! input, AI, spawning, firing, integration, collision, respawn, sweeps,
//! then the end-of-round checks. Collision always sees fully integrated
//! positions, and sweeps always run after collision so nothing is removed
//! mid-resolution.

use glam::Vec2;

use super::bullet::{Bullet, BulletSpawn};
use super::collision;
use super::events::{BulletFate, GameEvent};
use super::map::{BrickRemains, Tile};
use super::state::{GamePhase, GameState, PLAYER_SPAWNS, TickInput};
use super::tank::{Direction, Team};
use crate::consts::*;

/// Advance the simulation by one fixed step
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    match state.phase {
        GamePhase::Menu => {
            if input.start {
                state.start_game();
            }
            return;
        }
        GamePhase::Paused => {
            if input.pause {
                state.set_phase(GamePhase::Playing);
            }
            return;
        }
        GamePhase::LevelComplete => {
            if input.start {
                state.advance_level();
            }
            return;
        }
        GamePhase::GameOver | GamePhase::Victory => {
            if input.start {
                state.set_phase(GamePhase::Menu);
            }
            return;
        }
        GamePhase::Playing => {
            if input.pause {
                state.set_phase(GamePhase::Paused);
                return;
            }
        }
    }

    state.time_ticks += 1;
    let mut fire_requests: Vec<BulletSpawn> = Vec::new();

    // Shovel fortification wearing off
    if state.fortify_timer > 0.0 {
        state.fortify_timer -= dt;
        if state.fortify_timer <= 0.0 {
            state.fortify_timer = 0.0;
            for (col, row) in state.map.unfortify_eagle() {
                state.events.push(GameEvent::TileChanged {
                    col,
                    row,
                    from: Tile::Stone,
                    to: Tile::Brick,
                    remains: BrickRemains::Full,
                });
            }
        }
    }

    player_input(state, input, &mut fire_requests);
    enemy_ai(state, dt, &mut fire_requests);

    // Spawn cadence; retry sooner when the attempt was blocked
    state.enemy_spawn_timer -= dt;
    if state.enemy_spawn_timer <= 0.0 {
        state.enemy_spawn_timer = if state.try_spawn_enemy() {
            ENEMY_SPAWN_INTERVAL
        } else {
            ENEMY_SPAWN_INTERVAL / 4.0
        };
    }

    for spawn in &fire_requests {
        let id = state.next_entity_id();
        let bullet = Bullet::new(id, spawn);
        state.events.push(GameEvent::BulletFired {
            id,
            owner: spawn.owner,
            faction: spawn.owner_faction,
            pos: bullet.pos,
            dir: bullet.dir,
        });
        state.bullets.push(bullet);
    }

    // Integration
    for tank in state.tanks.iter_mut() {
        tank.update(dt);
    }
    for bullet in state.bullets.iter_mut() {
        if bullet.update(dt) {
            state.events.push(GameEvent::BulletGone {
                id: bullet.id,
                fate: BulletFate::Expired,
            });
        }
    }
    for bonus in state.bonuses.iter_mut() {
        if bonus.update(dt) {
            state.events.push(GameEvent::BonusExpired { id: bonus.id });
        }
    }

    collision::resolve(state);
    respawn_players(state);

    // Sweeps: corpses linger for their removal delay, nothing else survives
    state
        .tanks
        .retain(|t| t.alive || t.pending_respawn || t.timers.removal > 0.0);
    state.bullets.retain(|b| b.active);
    state.bonuses.retain(|b| b.active);

    if state.map.eagle_destroyed || state.players_remaining() == 0 {
        state.events.push(GameEvent::GameOver);
        state.set_phase(GamePhase::GameOver);
        return;
    }

    // A cleared field must stay clear for a moment before it counts
    if state.enemy_quota == 0 && state.enemies_remaining() == 0 {
        state.win_confirm += dt;
        if state.win_confirm >= WIN_CONFIRM_DELAY {
            if state.level_index + 1 >= LEVEL_COUNT {
                state.set_phase(GamePhase::Victory);
            } else {
                state.events.push(GameEvent::LevelComplete {
                    level: state.level_index,
                });
                state.set_phase(GamePhase::LevelComplete);
            }
        }
    } else {
        state.win_confirm = 0.0;
    }
}

/// Translate held buttons into movement intent and edge-triggered shots
fn player_input(state: &mut GameState, input: &TickInput, fire_requests: &mut Vec<BulletSpawn>) {
    for slot in 0..state.player_count {
        let keys = input.players[slot];
        let pressed_fire = keys.fire && !state.fire_held[slot];
        state.fire_held[slot] = keys.fire;

        let Some(idx) = state
            .tanks
            .iter()
            .position(|t| t.faction.player_slot() == Some(slot))
        else {
            continue;
        };
        let on_ice = state.map.tile_at(state.tanks[idx].pos) == Some(Tile::Ice);
        let tank = &mut state.tanks[idx];
        if !tank.alive {
            continue;
        }

        let dir = if keys.up {
            Some(Direction::Up)
        } else if keys.down {
            Some(Direction::Down)
        } else if keys.left {
            Some(Direction::Left)
        } else if keys.right {
            Some(Direction::Right)
        } else {
            None
        };
        match dir {
            Some(dir) => tank.drive(dir),
            // On ice the tank keeps sliding until its momentum runs out
            None if on_ice && tank.timers.slide > 0.0 => {}
            None => tank.stop(),
        }

        if pressed_fire {
            if let Some(spawn) = tank.fire() {
                fire_requests.push(spawn);
            }
        }
    }
}

fn enemy_ai(state: &mut GameState, dt: f32, fire_requests: &mut Vec<BulletSpawn>) {
    let mut targets: Vec<Vec2> = state
        .tanks
        .iter()
        .filter(|t| t.alive && t.faction.team() == Team::Players)
        .map(|t| t.pos)
        .collect();
    if !state.map.eagle_destroyed {
        if let Some(eagle) = state.map.eagle_pos() {
            targets.push(eagle);
        }
    }

    let GameState { tanks, rng, .. } = state;
    for tank in tanks.iter_mut() {
        if tank.faction.team() != Team::Enemies {
            continue;
        }
        if tank.update_ai(dt, &targets, rng) {
            if let Some(spawn) = tank.fire() {
                fire_requests.push(spawn);
            }
        }
    }
}

fn respawn_players(state: &mut GameState) {
    let mut spawned = Vec::new();
    for tank in state.tanks.iter_mut() {
        if !tank.pending_respawn || tank.alive || tank.timers.removal > 0.0 {
            continue;
        }
        let Some(slot) = tank.faction.player_slot() else {
            continue;
        };
        if tank.respawn(PLAYER_SPAWNS[slot]) {
            spawned.push((tank.id, tank.faction, tank.pos));
        } else {
            tank.pending_respawn = false;
        }
    }
    for (id, faction, pos) in spawned {
        state.events.push(GameEvent::TankSpawned { id, faction, pos });
    }
}
