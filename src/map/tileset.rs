//! Fixed tileset table: a data table keyed by integer index rather than a
//! closed Rust enum, so maps can hold integer grids referencing it
//! directly.

use serde::{Deserialize, Serialize};

pub type TileIndex = u8;

pub const WALL: TileIndex = 0;
pub const FLOOR: TileIndex = 1;
pub const UP_STAIRS: TileIndex = 2;
pub const DOWN_STAIRS: TileIndex = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileDef {
    pub glyph: char,
    pub fg: (u8, u8, u8),
    pub bg: (u8, u8, u8),
    /// `0` means impassable.
    pub walk_cost: u32,
    pub transparent: bool,
    pub name: &'static str,
}

/// The closed, fixed tile table. Out-of-bounds indices are a bug, not a
/// silent clamp — `tile_def` panics rather than returning a default.
pub fn tile_def(index: TileIndex) -> TileDef {
    match index {
        WALL => TileDef {
            glyph: '#',
            fg: (150, 150, 150),
            bg: (0, 0, 0),
            walk_cost: 0,
            transparent: false,
            name: "wall",
        },
        FLOOR => TileDef {
            glyph: '.',
            fg: (100, 100, 100),
            bg: (0, 0, 0),
            walk_cost: 1,
            transparent: true,
            name: "floor",
        },
        UP_STAIRS => TileDef {
            glyph: '<',
            fg: (255, 255, 255),
            bg: (0, 0, 0),
            walk_cost: 1,
            transparent: true,
            name: "upward staircase",
        },
        DOWN_STAIRS => TileDef {
            glyph: '>',
            fg: (255, 255, 255),
            bg: (0, 0, 0),
            walk_cost: 1,
            transparent: true,
            name: "downward staircase",
        },
        other => panic!("tileset has no entry for tile index {other}"),
    }
}
