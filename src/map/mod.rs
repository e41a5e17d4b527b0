//! Map entity data and dungeon generation.

pub mod generator;
pub mod tileset;

use serde::{Deserialize, Serialize};

use crate::math::Point;
use tileset::TileIndex;

/// `{Shape(height,width), Tiles, VisibleTiles, MemoryTiles, Floor}`.
/// Invariant: all three grids share `width * height` length;
/// `memory[p] = tiles[p]` wherever `visible[p]`, else the prior value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapData {
    pub width: u32,
    pub height: u32,
    pub floor: u32,
    pub tiles: Vec<TileIndex>,
    pub visible: Vec<bool>,
    pub memory: Vec<TileIndex>,
}

impl MapData {
    pub fn blank(width: u32, height: u32, floor: u32) -> MapData {
        let len = (width * height) as usize;
        MapData {
            width,
            height,
            floor,
            tiles: vec![tileset::WALL; len],
            visible: vec![false; len],
            memory: vec![tileset::WALL; len],
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn idx(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.in_bounds(x, y));
        (y as u32 * self.width + x as u32) as usize
    }

    /// Out-of-bounds access is an error, not a silent clamp.
    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileIndex> {
        if self.in_bounds(x, y) {
            Some(self.tiles[self.idx(x, y)])
        } else {
            None
        }
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: TileIndex) {
        let idx = self.idx(x, y);
        self.tiles[idx] = tile;
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y)
            .map(|t| tileset::tile_def(t).walk_cost != 0)
            .unwrap_or(false)
    }

    pub fn is_transparent(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y)
            .map(|t| tileset::tile_def(t).transparent)
            .unwrap_or(false)
    }

    pub fn is_visible(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.visible[self.idx(x, y)]
    }

    pub fn set_visible(&mut self, x: i32, y: i32, value: bool) {
        let idx = self.idx(x, y);
        self.visible[idx] = value;
    }

    /// Sets every tile invisible.
    pub fn clear_visibility(&mut self) {
        self.visible.iter_mut().for_each(|v| *v = false);
    }

    /// `MemoryTiles[p] = Tiles[p]` at every currently visible tile.
    pub fn sync_memory(&mut self) {
        for i in 0..self.tiles.len() {
            if self.visible[i] {
                self.memory[i] = self.tiles[i];
            }
        }
    }

    pub fn memory_at(&self, x: i32, y: i32) -> Option<TileIndex> {
        if self.in_bounds(x, y) {
            Some(self.memory[self.idx(x, y)])
        } else {
            None
        }
    }

    pub fn find_tile(&self, tile: TileIndex) -> Option<Point> {
        self.tiles.iter().position(|&t| t == tile).map(|i| {
            let x = (i as u32 % self.width) as i32;
            let y = (i as u32 / self.width) as i32;
            Point::new(x, y)
        })
    }
}
