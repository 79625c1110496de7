//! Tile map and brick destruction model
//!
//! The map owns the static terrain grid and the per-brick destruction
//! records. Destruction state is an integer code in [0,9]: 0 is pristine,
//! 1-4 mean one half is gone (up/right/down/left respectively), 5-8 mean a
//! single quarter remains, 9 is fully destroyed. Code 9 never exists as a
//! record: the tile flips to Empty and the record is dropped in the same
//! call, so the two can never disagree.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collision::Aabb;
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Empty,
    Brick,
    Stone,
    Water,
    Ice,
    Bush,
    Eagle,
}

/// What is left of a partially destroyed brick, derived from its state code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrickRemains {
    Full,
    BottomHalf,
    LeftHalf,
    TopHalf,
    RightHalf,
    BottomLeft,
    TopLeft,
    BottomRight,
    TopRight,
    Gone,
}

impl BrickRemains {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BrickRemains::Full,
            1 => BrickRemains::BottomHalf,
            2 => BrickRemains::LeftHalf,
            3 => BrickRemains::TopHalf,
            4 => BrickRemains::RightHalf,
            5 => BrickRemains::BottomLeft,
            6 => BrickRemains::TopLeft,
            7 => BrickRemains::BottomRight,
            8 => BrickRemains::TopRight,
            _ => BrickRemains::Gone,
        }
    }
}

/// Destruction record for a single brick tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickState {
    pub hits: u8,
    pub code: u8,
}

/// Outcome of one bullet hit on a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrickHit {
    Damaged(BrickRemains),
    Destroyed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("expected {MAP_ROWS} rows, found {0}")]
    WrongRowCount(usize),
    #[error("row {row} has {found} columns, expected {MAP_COLS}")]
    WrongRowLength { row: usize, found: usize },
    #[error("unknown tile character {ch:?} at column {col}, row {row}")]
    UnknownTile { ch: char, col: usize, row: usize },
    #[error("level has no eagle tile")]
    MissingEagle,
    #[error("level has more than one eagle tile")]
    DuplicateEagle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMap {
    tiles: Vec<Tile>,
    /// Keyed by row * MAP_COLS + col; BTreeMap for stable iteration
    bricks: BTreeMap<u32, BrickState>,
    eagle: Option<(usize, usize)>,
    pub eagle_destroyed: bool,
    /// Tiles currently replaced by shovel fortification
    fortified: Vec<(usize, usize)>,
}

impl TileMap {
    fn empty() -> Self {
        Self {
            tiles: vec![Tile::Empty; MAP_COLS * MAP_ROWS],
            bricks: BTreeMap::new(),
            eagle: None,
            eagle_destroyed: false,
            fortified: Vec::new(),
        }
    }

    /// Parse a level from its text grid
    pub fn from_text(text: &str) -> Result<Self, LevelError> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.len() != MAP_ROWS {
            return Err(LevelError::WrongRowCount(lines.len()));
        }
        let mut map = Self::empty();
        for (row, line) in lines.iter().enumerate() {
            let line = line.trim_end();
            if line.chars().count() != MAP_COLS {
                return Err(LevelError::WrongRowLength {
                    row,
                    found: line.chars().count(),
                });
            }
            for (col, ch) in line.chars().enumerate() {
                let tile = match ch {
                    '.' => Tile::Empty,
                    '#' => Tile::Brick,
                    '@' => Tile::Stone,
                    '~' => Tile::Water,
                    '-' => Tile::Ice,
                    '%' => Tile::Bush,
                    'E' => {
                        if map.eagle.is_some() {
                            return Err(LevelError::DuplicateEagle);
                        }
                        map.eagle = Some((col, row));
                        Tile::Eagle
                    }
                    _ => return Err(LevelError::UnknownTile { ch, col, row }),
                };
                map.tiles[row * MAP_COLS + col] = tile;
            }
        }
        if map.eagle.is_none() {
            return Err(LevelError::MissingEagle);
        }
        Ok(map)
    }

    /// Seeded fallback map: a mirrored scatter of terrain blocks with clear
    /// spawn rows and a brick-ringed eagle at the bottom center.
    pub fn generated(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut map = Self::empty();

        // 2x2 terrain blocks over the interior, mirrored left-to-right
        for block_row in (4..=20).step_by(2) {
            for block_col in (0..MAP_COLS / 2).step_by(2) {
                let roll: f32 = rng.random();
                let tile = if roll < 0.40 {
                    Tile::Brick
                } else if roll < 0.48 {
                    Tile::Stone
                } else if roll < 0.56 {
                    Tile::Water
                } else if roll < 0.62 {
                    Tile::Ice
                } else if roll < 0.70 {
                    Tile::Bush
                } else {
                    Tile::Empty
                };
                if tile == Tile::Empty {
                    continue;
                }
                for dr in 0..2 {
                    for dc in 0..2 {
                        let row = block_row + dr;
                        let col = block_col + dc;
                        map.tiles[row * MAP_COLS + col] = tile;
                        map.tiles[row * MAP_COLS + (MAP_COLS - 1 - col)] = tile;
                    }
                }
            }
        }

        // Keep a corridor open down the middle so enemies can reach the base
        for row in 4..=21 {
            map.tiles[row * MAP_COLS + 12] = Tile::Empty;
            map.tiles[row * MAP_COLS + 13] = Tile::Empty;
        }

        map.place_eagle_structure();
        map
    }

    /// Load a level, degrading to the generated default on parse failure
    pub fn load(text: Option<&str>, seed: u64) -> Self {
        match text {
            Some(text) => match Self::from_text(text) {
                Ok(map) => map,
                Err(err) => {
                    log::warn!("level parse failed ({err}); using generated map");
                    Self::generated(seed)
                }
            },
            None => Self::generated(seed),
        }
    }

    fn place_eagle_structure(&mut self) {
        let (ec, er) = (12, MAP_ROWS - 1);
        self.eagle = Some((ec, er));
        self.tiles[er * MAP_COLS + ec] = Tile::Eagle;
        for (col, row) in Self::eagle_ring(ec, er) {
            self.tiles[row * MAP_COLS + col] = Tile::Brick;
        }
    }

    fn eagle_ring(ec: usize, er: usize) -> Vec<(usize, usize)> {
        let mut ring = Vec::new();
        for dr in -1i32..=1 {
            for dc in -1i32..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let col = ec as i32 + dc;
                let row = er as i32 + dr;
                if col >= 0 && row >= 0 && (col as usize) < MAP_COLS && (row as usize) < MAP_ROWS {
                    ring.push((col as usize, row as usize));
                }
            }
        }
        ring
    }

    pub fn tile(&self, col: i32, row: i32) -> Option<Tile> {
        if col < 0 || row < 0 || col as usize >= MAP_COLS || row as usize >= MAP_ROWS {
            return None;
        }
        Some(self.tiles[row as usize * MAP_COLS + col as usize])
    }

    pub fn tile_at(&self, pos: Vec2) -> Option<Tile> {
        self.tile(
            (pos.x / TILE_SIZE).floor() as i32,
            (pos.y / TILE_SIZE).floor() as i32,
        )
    }

    /// Center of the eagle tile, if the level has one
    pub fn eagle_pos(&self) -> Option<Vec2> {
        self.eagle.map(|(col, row)| {
            Vec2::new(
                col as f32 * TILE_SIZE + TILE_SIZE / 2.0,
                row as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            )
        })
    }

    /// Solid for tank movement; out-of-range is solid (fail-safe)
    pub fn blocks_tank(&self, col: i32, row: i32, can_cross_water: bool) -> bool {
        match self.tile(col, row) {
            None => true,
            Some(Tile::Empty) | Some(Tile::Ice) | Some(Tile::Bush) => false,
            Some(Tile::Water) => !can_cross_water,
            Some(Tile::Brick) | Some(Tile::Stone) | Some(Tile::Eagle) => true,
        }
    }

    /// Solid for bullets; water and ice never block, out-of-range is solid
    pub fn blocks_bullet(&self, col: i32, row: i32) -> bool {
        match self.tile(col, row) {
            None => true,
            Some(Tile::Brick) | Some(Tile::Stone) | Some(Tile::Eagle) => true,
            _ => false,
        }
    }

    pub fn is_destructible(tile: Tile) -> bool {
        matches!(tile, Tile::Brick | Tile::Eagle)
    }

    pub fn brick_state(&self, col: usize, row: usize) -> Option<BrickState> {
        self.bricks.get(&Self::key(col, row)).copied()
    }

    fn key(col: usize, row: usize) -> u32 {
        (row * MAP_COLS + col) as u32
    }

    /// Collision rectangle of a brick tile, narrowed to what remains
    pub fn brick_rect(&self, col: usize, row: usize) -> Aabb {
        let x = col as f32 * TILE_SIZE;
        let y = row as f32 * TILE_SIZE;
        let t = TILE_SIZE;
        let h = TILE_SIZE / 2.0;
        let code = self.brick_state(col, row).map(|s| s.code).unwrap_or(0);
        let (rx, ry, rw, rh) = match BrickRemains::from_code(code) {
            BrickRemains::Full => (0.0, 0.0, t, t),
            BrickRemains::BottomHalf => (0.0, h, t, h),
            BrickRemains::LeftHalf => (0.0, 0.0, h, t),
            BrickRemains::TopHalf => (0.0, 0.0, t, h),
            BrickRemains::RightHalf => (h, 0.0, h, t),
            BrickRemains::BottomLeft => (0.0, h, h, h),
            BrickRemains::TopLeft => (0.0, 0.0, h, h),
            BrickRemains::BottomRight => (h, h, h, h),
            BrickRemains::TopRight => (h, 0.0, h, h),
            BrickRemains::Gone => return Aabb::point(Vec2::new(x, y)),
        };
        Aabb::new(Vec2::new(x + rx, y + ry), Vec2::new(x + rx + rw, y + ry + rh))
    }

    /// Apply one directional bullet hit to a brick tile
    ///
    /// Direction codes: 0=up, 1=right, 2=down, 3=left. Returns None if the
    /// tile is not (or no longer) a brick.
    pub fn hit_brick(&mut self, col: usize, row: usize, dir_code: u8) -> Option<BrickHit> {
        if self.tile(col as i32, row as i32) != Some(Tile::Brick) {
            return None;
        }
        let key = Self::key(col, row);
        let rec = self.bricks.entry(key).or_default();
        rec.hits += 1;
        let code = match rec.hits {
            1 => dir_code + 1,
            2 => {
                let s = (rec.code - 1) * (rec.code - 1) + dir_code * dir_code;
                if s % 2 == 1 { (s + 19) / 4 } else { 9 }
            }
            _ => 9,
        };
        if code == 9 {
            self.bricks.remove(&key);
            self.tiles[row * MAP_COLS + col] = Tile::Empty;
            Some(BrickHit::Destroyed)
        } else {
            rec.code = code;
            Some(BrickHit::Damaged(BrickRemains::from_code(code)))
        }
    }

    pub fn destroy_eagle(&mut self) {
        self.eagle_destroyed = true;
    }

    /// Replace the eagle's ring with stone walls; returns the changed tiles
    /// with their previous values.
    pub fn fortify_eagle(&mut self) -> Vec<(usize, usize, Tile)> {
        let Some((ec, er)) = self.eagle else {
            return Vec::new();
        };
        let mut changed = Vec::new();
        for (col, row) in Self::eagle_ring(ec, er) {
            let idx = row * MAP_COLS + col;
            let from = self.tiles[idx];
            if from == Tile::Stone {
                continue;
            }
            self.tiles[idx] = Tile::Stone;
            self.bricks.remove(&Self::key(col, row));
            if !self.fortified.contains(&(col, row)) {
                self.fortified.push((col, row));
            }
            changed.push((col, row, from));
        }
        changed
    }

    /// Revert fortification back to fresh brick; returns the restored tiles
    pub fn unfortify_eagle(&mut self) -> Vec<(usize, usize)> {
        let restored: Vec<(usize, usize)> = self.fortified.drain(..).collect();
        for &(col, row) in &restored {
            self.tiles[row * MAP_COLS + col] = Tile::Brick;
        }
        restored
    }
}

/// The built-in first level
pub const LEVEL_ONE: &str = "\
..........................
..........................
..........................
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..........~~~~~~..........
@@...@@....~~~~....@@...@@
......####........####....
--....####........####..--
--......................--
..##..##..%%..%%..##..##..
..##..##..%%..%%..##..##..
..##..##..%%..%%..##..##..
..##..##..%%..%%..##..##..
..##..##..........##..##..
..........................
....@@..............@@....
..........................
..........................
...........###............
...........#E#............
";

/// Level text for a given level index; levels past the authored set fall
/// back to seeded generation in the loader.
pub fn level_text(index: usize) -> Option<&'static str> {
    match index {
        0 => Some(LEVEL_ONE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brick_map() -> TileMap {
        let mut map = TileMap::generated(1);
        map.tiles[5 * MAP_COLS + 5] = Tile::Brick;
        map
    }

    #[test]
    fn test_level_one_parses() {
        let map = TileMap::from_text(LEVEL_ONE).unwrap();
        assert_eq!(map.eagle, Some((12, 25)));
        assert_eq!(map.tile(2, 3), Some(Tile::Brick));
        assert_eq!(map.tile(10, 10), Some(Tile::Water));
        assert_eq!(map.tile(0, 13), Some(Tile::Ice));
        assert_eq!(map.tile(10, 15), Some(Tile::Bush));
        assert_eq!(map.tile(4, 21), Some(Tile::Stone));
    }

    #[test]
    fn test_load_falls_back_on_garbage() {
        let map = TileMap::load(Some("not a level"), 3);
        assert!(map.eagle.is_some());
    }

    #[test]
    fn test_parse_rejects_unknown_char() {
        let bad = LEVEL_ONE.replacen('#', "?", 1);
        assert!(matches!(
            TileMap::from_text(&bad),
            Err(LevelError::UnknownTile { ch: '?', .. })
        ));
    }

    #[test]
    fn test_out_of_range_is_solid() {
        let map = TileMap::generated(1);
        assert!(map.blocks_tank(-1, 0, false));
        assert!(map.blocks_tank(0, MAP_ROWS as i32, false));
        assert!(map.blocks_bullet(MAP_COLS as i32, 0));
        assert_eq!(map.tile(-1, -1), None);
    }

    #[test]
    fn test_water_rules() {
        let mut map = TileMap::generated(1);
        map.tiles[6 * MAP_COLS + 6] = Tile::Water;
        assert!(map.blocks_tank(6, 6, false));
        assert!(!map.blocks_tank(6, 6, true));
        assert!(!map.blocks_bullet(6, 6));
    }

    #[test]
    fn test_first_hit_codes() {
        for dir in 0u8..4 {
            let mut map = brick_map();
            let hit = map.hit_brick(5, 5, dir).unwrap();
            let state = map.brick_state(5, 5).unwrap();
            assert_eq!(state.code, dir + 1);
            assert!(matches!(hit, BrickHit::Damaged(_)));
        }
    }

    #[test]
    fn test_second_hit_all_sixteen_pairs() {
        // (prior code, direction) -> expected state code
        let expected = [
            // prior 1: bottom half remains
            (1u8, 0u8, 9u8),
            (1, 1, 5),
            (1, 2, 9),
            (1, 3, 7),
            // prior 2: left half remains
            (2, 0, 5),
            (2, 1, 9),
            (2, 2, 6),
            (2, 3, 9),
            // prior 3: top half remains
            (3, 0, 9),
            (3, 1, 6),
            (3, 2, 9),
            (3, 3, 8),
            // prior 4: right half remains
            (4, 0, 7),
            (4, 1, 9),
            (4, 2, 8),
            (4, 3, 9),
        ];
        for (prior, dir, want) in expected {
            let mut map = brick_map();
            map.hit_brick(5, 5, prior - 1).unwrap();
            assert_eq!(map.brick_state(5, 5).unwrap().code, prior);
            let hit = map.hit_brick(5, 5, dir).unwrap();
            if want == 9 {
                assert_eq!(hit, BrickHit::Destroyed, "prior {prior} dir {dir}");
                assert_eq!(map.tile(5, 5), Some(Tile::Empty));
                assert_eq!(map.brick_state(5, 5), None);
            } else {
                assert_eq!(
                    map.brick_state(5, 5).unwrap().code,
                    want,
                    "prior {prior} dir {dir}"
                );
            }
        }
    }

    #[test]
    fn test_third_hit_always_destroys() {
        // Pick a surviving two-hit path, then hit from every direction
        for dir in 0u8..4 {
            let mut map = brick_map();
            map.hit_brick(5, 5, 0).unwrap(); // code 1
            map.hit_brick(5, 5, 1).unwrap(); // s=1 odd, code 5
            assert_eq!(map.brick_state(5, 5).unwrap().code, 5);
            assert_eq!(map.hit_brick(5, 5, dir), Some(BrickHit::Destroyed));
            assert_eq!(map.tile(5, 5), Some(Tile::Empty));
            assert_eq!(map.brick_state(5, 5), None);
        }
    }

    #[test]
    fn test_up_then_down_destroys() {
        // Hit from up: bottom half remains. Hit from down: s=(1-1)²+2²=4,
        // even, so the brick is gone and the tile reverts to Empty.
        let mut map = brick_map();
        assert_eq!(
            map.hit_brick(5, 5, 0),
            Some(BrickHit::Damaged(BrickRemains::BottomHalf))
        );
        assert_eq!(map.hit_brick(5, 5, 2), Some(BrickHit::Destroyed));
        assert_eq!(map.tile(5, 5), Some(Tile::Empty));
        assert_eq!(map.brick_state(5, 5), None);
    }

    #[test]
    fn test_brick_rect_narrows_after_hit() {
        let mut map = brick_map();
        let full = map.brick_rect(5, 5);
        assert_eq!(full.max.y - full.min.y, TILE_SIZE);
        map.hit_brick(5, 5, 0).unwrap();
        let half = map.brick_rect(5, 5);
        assert_eq!(half.max.y - half.min.y, TILE_SIZE / 2.0);
        // Bottom half remains after a hit from above
        assert_eq!(half.min.y, 5.0 * TILE_SIZE + TILE_SIZE / 2.0);
    }

    #[test]
    fn test_fortify_and_revert() {
        let mut map = TileMap::generated(1);
        let changed = map.fortify_eagle();
        assert!(!changed.is_empty());
        for &(col, row, _) in &changed {
            assert_eq!(map.tile(col as i32, row as i32), Some(Tile::Stone));
        }
        let restored = map.unfortify_eagle();
        assert_eq!(restored.len(), changed.len());
        for &(col, row) in &restored {
            assert_eq!(map.tile(col as i32, row as i32), Some(Tile::Brick));
            assert_eq!(map.brick_state(col, row), None);
        }
    }

    proptest! {
        /// Any sequence of three or more hits leaves the tile empty with no
        /// dangling destruction record.
        #[test]
        fn prop_three_hits_always_destroy(dirs in prop::collection::vec(0u8..4, 3..8)) {
            let mut map = brick_map();
            let mut destroyed = false;
            for &dir in &dirs {
                match map.hit_brick(5, 5, dir) {
                    Some(BrickHit::Destroyed) => {
                        destroyed = true;
                        break;
                    }
                    Some(BrickHit::Damaged(_)) => {}
                    None => break,
                }
            }
            prop_assert!(destroyed || map.tile(5, 5) == Some(Tile::Empty));
            prop_assert_eq!(map.tile(5, 5), Some(Tile::Empty));
            prop_assert_eq!(map.brick_state(5, 5), None);
        }

        /// After at most two hits the state code is always in a valid range.
        #[test]
        fn prop_codes_stay_in_range(d1 in 0u8..4, d2 in 0u8..4) {
            let mut map = brick_map();
            map.hit_brick(5, 5, d1).unwrap();
            let code = map.brick_state(5, 5).unwrap().code;
            prop_assert!((1..=4).contains(&code));
            match map.hit_brick(5, 5, d2).unwrap() {
                BrickHit::Damaged(_) => {
                    let code = map.brick_state(5, 5).unwrap().code;
                    prop_assert!((5..=8).contains(&code));
                }
                BrickHit::Destroyed => {
                    prop_assert_eq!(map.tile(5, 5), Some(Tile::Empty));
                }
            }
        }
    }
}
