//! Broad and narrow phase collision detection plus per-tick resolution
//!
//! Resolution order matters and is fixed: tank-tank pushes first, tank-map
//! runs after it so the map always wins a contradiction, then the bullet
//! rules, then bonus pickup.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bonus::BonusKind;
use super::bullet::Bullet;
use super::events::{BulletFate, GameEvent};
use super::map::{BrickHit, Tile, TileMap};
use super::state::GameState;
use super::tank::{Direction, HitResult, Tank, Team};
use crate::consts::*;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec2, size: f32) -> Self {
        let half = Vec2::splat(size / 2.0);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Degenerate box with no extent; overlaps nothing
    pub fn point(pos: Vec2) -> Self {
        Self { min: pos, max: pos }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// No extent on some axis, as spawn-intangible boxes have
    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Strict overlap test; touching edges and empty boxes never collide
    pub fn overlaps(&self, other: &Aabb) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Penetration depth on each axis; only meaningful when overlapping
    pub fn overlap_extents(&self, other: &Aabb) -> Vec2 {
        Vec2::new(
            self.max.x.min(other.max.x) - self.min.x.max(other.min.x),
            self.max.y.min(other.max.y) - self.min.y.max(other.min.y),
        )
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            Vec2::new(self.min.x, self.max.y),
            self.max,
        ]
    }
}

/// Uniform grid broad phase
///
/// Entities are inserted into every cell their bounding box overlaps; a
/// query returns the ids of entities sharing any overlapped cell, sorted
/// and deduplicated for stable iteration.
#[derive(Debug, Default)]
pub struct SpatialGrid {
    cell: f32,
    buckets: HashMap<(i32, i32), Vec<u32>>,
}

impl SpatialGrid {
    pub fn new(cell: f32) -> Self {
        Self {
            cell,
            buckets: HashMap::new(),
        }
    }

    fn cell_range(&self, bbox: &Aabb) -> (i32, i32, i32, i32) {
        (
            (bbox.min.x / self.cell).floor() as i32,
            (bbox.max.x / self.cell).floor() as i32,
            (bbox.min.y / self.cell).floor() as i32,
            (bbox.max.y / self.cell).floor() as i32,
        )
    }

    pub fn insert(&mut self, id: u32, bbox: &Aabb) {
        let (x0, x1, y0, y1) = self.cell_range(bbox);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                self.buckets.entry((cx, cy)).or_default().push(id);
            }
        }
    }

    /// Ids of all entities whose cells overlap the query box
    pub fn query(&self, bbox: &Aabb) -> Vec<u32> {
        let (x0, x1, y0, y1) = self.cell_range(bbox);
        let mut ids = Vec::new();
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                if let Some(bucket) = self.buckets.get(&(cx, cy)) {
                    ids.extend_from_slice(bucket);
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Run the full collision pass for one tick
pub fn resolve(state: &mut GameState) {
    tank_tank(&mut state.tanks);
    tank_map(&mut state.tanks, &state.map);
    bullet_pass(state);
    bonus_pickup(state);
}

fn tank_index_of(grid_ids: &[u32], tanks: &[Tank]) -> Vec<usize> {
    grid_ids
        .iter()
        .filter_map(|id| tanks.iter().position(|t| t.id == *id))
        .collect()
}

/// Rule 1: overlapping tanks are pushed apart along the axis of smaller
/// overlap, half the penetration each. A tank is only marked blocked when
/// its facing was actively driving it deeper into the other.
fn tank_tank(tanks: &mut [Tank]) {
    let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
    for tank in tanks.iter() {
        if tank.alive && !tank.is_spawning() {
            grid.insert(tank.id, &tank.bbox);
        }
    }

    for i in 0..tanks.len() {
        if !tanks[i].alive || tanks[i].is_spawning() {
            continue;
        }
        let candidates = tank_index_of(&grid.query(&tanks[i].bbox), tanks);
        for j in candidates {
            if j <= i || !tanks[j].alive || tanks[j].is_spawning() {
                continue;
            }
            let (head, tail) = tanks.split_at_mut(j);
            let a = &mut head[i];
            let b = &mut tail[0];
            if !a.bbox.overlaps(&b.bbox) {
                continue;
            }
            let ext = a.bbox.overlap_extents(&b.bbox);
            if ext.x < ext.y {
                let half = ext.x / 2.0;
                if a.pos.x < b.pos.x {
                    a.pos.x -= half;
                    b.pos.x += half;
                    a.blocked |= a.dir == Direction::Right;
                    b.blocked |= b.dir == Direction::Left;
                } else {
                    a.pos.x += half;
                    b.pos.x -= half;
                    a.blocked |= a.dir == Direction::Left;
                    b.blocked |= b.dir == Direction::Right;
                }
            } else {
                let half = ext.y / 2.0;
                if a.pos.y < b.pos.y {
                    a.pos.y -= half;
                    b.pos.y += half;
                    a.blocked |= a.dir == Direction::Down;
                    b.blocked |= b.dir == Direction::Up;
                } else {
                    a.pos.y += half;
                    b.pos.y -= half;
                    a.blocked |= a.dir == Direction::Up;
                    b.blocked |= b.dir == Direction::Down;
                }
            }
            a.refresh_bbox();
            b.refresh_bbox();
        }
    }
}

/// Rule 2: a tank whose box touches a solid tile or leaves the map reverts
/// to its previous-tick position. Runs after the peer push so the map wins.
fn tank_map(tanks: &mut [Tank], map: &TileMap) {
    for tank in tanks.iter_mut() {
        if !tank.alive || tank.is_spawning() {
            continue;
        }
        if tank_hits_map(tank, map) {
            tank.pos = tank.prev_pos;
            tank.blocked = true;
            tank.refresh_bbox();
        }
    }
}

fn tank_hits_map(tank: &Tank, map: &TileMap) -> bool {
    let bbox = &tank.bbox;
    if bbox.min.x < 0.0 || bbox.min.y < 0.0 || bbox.max.x > MAP_WIDTH || bbox.max.y > MAP_HEIGHT {
        return true;
    }
    // Inset the corners a hair so a box flush against a tile edge passes
    let inset = Aabb::new(bbox.min + Vec2::splat(0.1), bbox.max - Vec2::splat(0.1));
    let can_cross = tank.timers.boat > 0.0;
    inset.corners().iter().any(|corner| {
        let col = (corner.x / TILE_SIZE).floor() as i32;
        let row = (corner.y / TILE_SIZE).floor() as i32;
        map.blocks_tank(col, row, can_cross)
    })
}

/// Rules 3-6: bullet vs tank, map, bullet, and bounds, in that order.
fn bullet_pass(state: &mut GameState) {
    let GameState {
        tanks,
        bullets,
        bonuses,
        map,
        rng,
        events,
        score,
        next_id,
        ..
    } = state;

    let mut tank_grid = SpatialGrid::new(GRID_CELL_SIZE);
    for tank in tanks.iter() {
        if tank.alive && !tank.is_spawning() {
            tank_grid.insert(tank.id, &tank.bbox);
        }
    }

    for bullet in bullets.iter_mut() {
        if !bullet.active {
            continue;
        }

        // Rule 3: bullet-tank
        let bbox = bullet.bbox();
        let candidates = tank_index_of(&tank_grid.query(&bbox), tanks);
        for idx in candidates {
            let tank = &mut tanks[idx];
            if tank.id == bullet.owner || !tank.alive || tank.is_spawning() {
                continue;
            }
            let same_team = bullet.owner_faction.team() == tank.faction.team();
            if same_team
                && (bullet.owner_faction.team() == Team::Players
                    || bullet.owner_faction == tank.faction)
            {
                // Players never hit their own team; enemies only hit a
                // different enemy variant
                continue;
            }
            if !bbox.overlaps(&tank.bbox) {
                continue;
            }

            bullet.active = false;
            events.push(GameEvent::BulletGone {
                id: bullet.id,
                fate: BulletFate::HitTank,
            });
            match tank.take_damage() {
                HitResult::Absorbed => {}
                HitResult::Wounded => events.push(GameEvent::TankDamaged {
                    id: tank.id,
                    armor: tank.armor,
                }),
                HitResult::Destroyed => {
                    events.push(GameEvent::TankDestroyed {
                        id: tank.id,
                        faction: tank.faction,
                        pos: tank.pos,
                        by: Some(bullet.owner),
                    });
                    if tank.faction.team() == Team::Enemies {
                        if let Some(slot) = bullet.owner_faction.player_slot() {
                            let points = tank.faction.params().score;
                            score[slot] += points;
                            events.push(GameEvent::ScoreChanged {
                                slot,
                                delta: points,
                                total: score[slot],
                            });
                        }
                        if tank.carries_bonus {
                            let id = *next_id;
                            *next_id += 1;
                            let bonus = super::bonus::Bonus::roll(id, rng);
                            events.push(GameEvent::BonusSpawned {
                                id,
                                kind: bonus.kind,
                                pos: bonus.pos,
                            });
                            bonuses.push(bonus);
                        }
                    }
                }
            }
            break;
        }
        if !bullet.active {
            continue;
        }

        // Rule 4: bullet-map
        bullet_map(bullet, map, events);
        if !bullet.active {
            continue;
        }

        // Rule 6: out of bounds
        if bbox.max.x < 0.0 || bbox.min.x > MAP_WIDTH || bbox.max.y < 0.0 || bbox.min.y > MAP_HEIGHT
        {
            bullet.active = false;
            events.push(GameEvent::BulletGone {
                id: bullet.id,
                fate: BulletFate::OutOfBounds,
            });
        }
    }

    // Rule 5: bullet-bullet mutual destruction
    let mut bullet_grid = SpatialGrid::new(GRID_CELL_SIZE);
    for bullet in bullets.iter() {
        if bullet.active {
            bullet_grid.insert(bullet.id, &bullet.bbox());
        }
    }
    for i in 0..bullets.len() {
        if !bullets[i].active {
            continue;
        }
        let bbox = bullets[i].bbox();
        for id in bullet_grid.query(&bbox) {
            let Some(j) = bullets.iter().position(|b| b.id == id) else {
                continue;
            };
            if j <= i || !bullets[j].active || !bullets[i].active {
                continue;
            }
            if bbox.overlaps(&bullets[j].bbox()) {
                bullets[i].active = false;
                bullets[j].active = false;
                events.push(GameEvent::BulletGone {
                    id: bullets[i].id,
                    fate: BulletFate::HitBullet,
                });
                events.push(GameEvent::BulletGone {
                    id: bullets[j].id,
                    fate: BulletFate::HitBullet,
                });
            }
        }
    }
}

fn bullet_map(bullet: &mut Bullet, map: &mut TileMap, events: &mut Vec<GameEvent>) {
    let bbox = bullet.bbox();
    let col0 = (bbox.min.x / TILE_SIZE).floor() as i32;
    let col1 = (bbox.max.x / TILE_SIZE).floor() as i32;
    let row0 = (bbox.min.y / TILE_SIZE).floor() as i32;
    let row1 = (bbox.max.y / TILE_SIZE).floor() as i32;

    let mut hit_tiles: Vec<(i32, i32, Tile)> = Vec::new();
    for row in row0..=row1 {
        for col in col0..=col1 {
            let Some(tile) = map.tile(col, row) else {
                continue; // outside the map is the bounds rule's business
            };
            if !map.blocks_bullet(col, row) {
                continue;
            }
            if tile == Tile::Brick {
                // Partially destroyed bricks only collide on what remains
                let rect = map.brick_rect(col as usize, row as usize);
                if !bbox.overlaps(&rect) {
                    continue;
                }
            }
            hit_tiles.push((col, row, tile));
        }
    }

    if hit_tiles.is_empty() {
        return;
    }
    bullet.active = false;
    events.push(GameEvent::BulletGone {
        id: bullet.id,
        fate: BulletFate::HitTerrain,
    });

    for (col, row, tile) in hit_tiles {
        match tile {
            Tile::Brick => {
                match map.hit_brick(col as usize, row as usize, bullet.dir.code()) {
                    Some(BrickHit::Damaged(remains)) => events.push(GameEvent::TileChanged {
                        col: col as usize,
                        row: row as usize,
                        from: Tile::Brick,
                        to: Tile::Brick,
                        remains,
                    }),
                    Some(BrickHit::Destroyed) => events.push(GameEvent::TileChanged {
                        col: col as usize,
                        row: row as usize,
                        from: Tile::Brick,
                        to: Tile::Empty,
                        remains: super::map::BrickRemains::Gone,
                    }),
                    None => {}
                }
            }
            Tile::Eagle => {
                if !map.eagle_destroyed {
                    map.destroy_eagle();
                    events.push(GameEvent::EagleDestroyed);
                }
            }
            _ => {} // stone absorbs the bullet without damage
        }
    }
}

/// Rule 7: player-bonus pickup
fn bonus_pickup(state: &mut GameState) {
    let mut collected: Vec<(u32, BonusKind, usize, u32)> = Vec::new();
    for bonus in state.bonuses.iter_mut() {
        if !bonus.active {
            continue;
        }
        let bbox = bonus.bbox();
        for tank in state.tanks.iter() {
            if !tank.alive || tank.is_spawning() {
                continue;
            }
            let Some(slot) = tank.faction.player_slot() else {
                continue;
            };
            if bbox.overlaps(&tank.bbox) {
                bonus.active = false;
                collected.push((bonus.id, bonus.kind, slot, tank.id));
                break;
            }
        }
    }

    for (bonus_id, kind, slot, tank_id) in collected {
        state.score[slot] += BONUS_SCORE;
        state.events.push(GameEvent::BonusCollected {
            id: bonus_id,
            kind,
            by: tank_id,
        });
        state.events.push(GameEvent::ScoreChanged {
            slot,
            delta: BONUS_SCORE,
            total: state.score[slot],
        });
        apply_bonus(state, kind, tank_id);
    }
}

fn apply_bonus(state: &mut GameState, kind: BonusKind, tank_id: u32) {
    match kind {
        BonusKind::Grenade => {
            for tank in state.tanks.iter_mut() {
                if tank.faction.team() == Team::Enemies && tank.alive {
                    tank.obliterate();
                    state.events.push(GameEvent::TankDestroyed {
                        id: tank.id,
                        faction: tank.faction,
                        pos: tank.pos,
                        by: None,
                    });
                }
            }
        }
        BonusKind::Clock => {
            for tank in state.tanks.iter_mut() {
                if tank.faction.team() == Team::Enemies {
                    tank.timers.frozen = FREEZE_TIME;
                }
            }
        }
        BonusKind::Shovel => {
            for (col, row, from) in state.map.fortify_eagle() {
                state.events.push(GameEvent::TileChanged {
                    col,
                    row,
                    from,
                    to: Tile::Stone,
                    remains: super::map::BrickRemains::Full,
                });
            }
            state.fortify_timer = FORTIFY_TIME;
        }
        BonusKind::Helmet | BonusKind::ExtraLife | BonusKind::Star | BonusKind::Gun
        | BonusKind::Boat => {
            if let Some(tank) = state.tanks.iter_mut().find(|t| t.id == tank_id) {
                match kind {
                    BonusKind::Helmet => tank.timers.shield = SHIELD_TIME,
                    BonusKind::ExtraLife => tank.lives += 1,
                    BonusKind::Star => tank.upgrade(),
                    BonusKind::Gun => tank.power = tank.faction.params().power_cap,
                    BonusKind::Boat => tank.timers.boat = BOAT_TIME,
                    _ => unreachable!(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tank::Faction;
    use proptest::prelude::*;

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::from_center_size(Vec2::new(0.0, 0.0), 10.0);
        let b = Aabb::from_center_size(Vec2::new(8.0, 0.0), 10.0);
        let c = Aabb::from_center_size(Vec2::new(20.0, 0.0), 10.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        // Touching edges do not overlap
        let d = Aabb::from_center_size(Vec2::new(10.0, 0.0), 10.0);
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_zero_area_box_never_overlaps() {
        let spawn = Aabb::point(Vec2::new(5.0, 5.0));
        let other = Aabb::from_center_size(Vec2::new(5.0, 5.0), 50.0);
        // Even when the point lies inside the other box, on either side
        assert!(!spawn.overlaps(&other));
        assert!(!other.overlaps(&spawn));
        assert!(!spawn.overlaps(&Aabb::point(Vec2::new(5.0, 5.0))));
        assert!(spawn.is_empty());
        assert!(!other.is_empty());
    }

    #[test]
    fn test_grid_query_finds_neighbors() {
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let a = Aabb::from_center_size(Vec2::new(32.0, 32.0), 56.0);
        let b = Aabb::from_center_size(Vec2::new(60.0, 32.0), 56.0);
        let far = Aabb::from_center_size(Vec2::new(700.0, 700.0), 56.0);
        grid.insert(1, &a);
        grid.insert(2, &b);
        grid.insert(3, &far);
        let ids = grid.query(&a);
        assert!(ids.contains(&1));
        assert!(ids.contains(&2));
        assert!(!ids.contains(&3));
    }

    fn active_tank(id: u32, faction: Faction, pos: Vec2) -> Tank {
        let mut tank = Tank::new(id, faction, pos);
        tank.timers.spawn = 0.0;
        tank.timers.shield = 0.0;
        tank.refresh_bbox();
        tank.prev_pos = pos;
        tank
    }

    #[test]
    fn test_tank_tank_push_is_symmetric() {
        let pos_a = Vec2::new(300.0, 300.0);
        let pos_b = Vec2::new(340.0, 300.0);

        let mut forward = vec![
            active_tank(1, Faction::Basic, pos_a),
            active_tank(2, Faction::Fast, pos_b),
        ];
        tank_tank(&mut forward);

        let mut reverse = vec![
            active_tank(2, Faction::Fast, pos_b),
            active_tank(1, Faction::Basic, pos_a),
        ];
        tank_tank(&mut reverse);

        let fa = forward.iter().find(|t| t.id == 1).unwrap().pos;
        let fb = forward.iter().find(|t| t.id == 2).unwrap().pos;
        let ra = reverse.iter().find(|t| t.id == 1).unwrap().pos;
        let rb = reverse.iter().find(|t| t.id == 2).unwrap().pos;
        assert!(fa.distance(ra) < 0.001);
        assert!(fb.distance(rb) < 0.001);
        // Pushed apart so the overlap is gone
        assert!((fb.x - fa.x).abs() >= TANK_SIZE - 0.001);
    }

    #[test]
    fn test_tank_tank_blocked_only_when_driving_deeper() {
        let mut tanks = vec![
            active_tank(1, Faction::Basic, Vec2::new(300.0, 300.0)),
            active_tank(2, Faction::Fast, Vec2::new(340.0, 300.0)),
        ];
        // Left tank drives right (deeper), right tank drives away
        tanks[0].drive(Direction::Right);
        tanks[1].drive(Direction::Right);
        tank_tank(&mut tanks);
        assert!(tanks[0].blocked);
        assert!(!tanks[1].blocked);
    }

    proptest! {
        /// Resolving (A,B) and (B,A) lands both tanks in the same places.
        #[test]
        fn prop_tank_tank_resolution_is_symmetric(
            ax in 100.0f32..700.0,
            ay in 100.0f32..700.0,
            dx in 1.0f32..40.0,
            dy in -40.0f32..40.0,
        ) {
            let pos_a = Vec2::new(ax, ay);
            let pos_b = Vec2::new(ax + dx, ay + dy);
            let mut forward = vec![
                active_tank(1, Faction::Basic, pos_a),
                active_tank(2, Faction::Fast, pos_b),
            ];
            tank_tank(&mut forward);
            let mut reverse = vec![
                active_tank(2, Faction::Fast, pos_b),
                active_tank(1, Faction::Basic, pos_a),
            ];
            tank_tank(&mut reverse);
            for id in [1u32, 2] {
                let f = forward.iter().find(|t| t.id == id).unwrap().pos;
                let r = reverse.iter().find(|t| t.id == id).unwrap().pos;
                prop_assert!(f.distance(r) < 0.001);
            }
        }
    }

    #[test]
    fn test_tank_map_reverts_into_bounds() {
        let map = TileMap::generated(7);
        let mut tank = active_tank(1, Faction::Basic, Vec2::new(100.0, 100.0));
        tank.prev_pos = tank.pos;
        // Walk the tank off the left edge
        tank.pos.x = 10.0;
        tank.refresh_bbox();
        let mut tanks = vec![tank];
        tank_map(&mut tanks, &map);
        assert_eq!(tanks[0].pos, Vec2::new(100.0, 100.0));
        assert!(tanks[0].blocked);
        assert!(!tank_hits_map(&tanks[0], &map));
    }
}
