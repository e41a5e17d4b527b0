//! Room-and-corridor dungeon generation: reject-on-overlap room placement
//! and random corridor elbow order, driven by the shared seeded [`Rng`],
//! with an up-stair and a down-stair placed in two different rooms.

use crate::map::tileset;
use crate::map::MapData;
use crate::math::{Point, Rect};
use crate::rng::Rng;

pub struct GeneratedFloor {
    pub map: MapData,
    pub rooms: Vec<Rect>,
    pub up_stairs: Point,
    pub down_stairs: Point,
}

pub struct GeneratorParams {
    pub width: u32,
    pub height: u32,
    pub max_rooms: u32,
    pub min_room_size: u32,
    pub max_room_size: u32,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        GeneratorParams {
            width: 80,
            height: 43,
            max_rooms: 30,
            min_room_size: 6,
            max_room_size: 10,
        }
    }
}

/// Generates a floor at `depth`.
pub fn rooms_and_corridors(depth: u32, rng: &mut Rng, params: &GeneratorParams) -> GeneratedFloor {
    let mut map = MapData::blank(params.width, params.height, depth);
    let mut rooms: Vec<Rect> = Vec::with_capacity(params.max_rooms as usize);

    for _ in 0..params.max_rooms {
        let w = rng.gen_range(params.min_room_size as i32, params.max_room_size as i32);
        let h = rng.gen_range(params.min_room_size as i32, params.max_room_size as i32);
        let x = rng.gen_range(1, (params.width as i32 - w - 1).max(2));
        let y = rng.gen_range(1, (params.height as i32 - h - 1).max(2));

        let room = Rect::new(x, y, w, h);
        if rooms.iter().any(|other| room.intersects(other)) {
            continue;
        }

        carve_room(&mut map, &room);

        if let Some(previous) = rooms.last() {
            let (x1, y1) = (previous.center().x(), previous.center().y());
            let (x2, y2) = (room.center().x(), room.center().y());
            if rng.gen_bool(0.5) {
                carve_horizontal_corridor(&mut map, x1, x2, y1);
                carve_vertical_corridor(&mut map, y1, y2, x2);
            } else {
                carve_vertical_corridor(&mut map, y1, y2, x1);
                carve_horizontal_corridor(&mut map, x1, x2, y2);
            }
        }

        rooms.push(room);
    }

    // Stairs anchor the first and last generated rooms so they are always
    // placed in different rooms whenever more than one room exists.
    let up_stairs = rooms.first().map(|r| r.center()).unwrap_or_else(|| Point::new(1, 1));
    let down_stairs = rooms
        .last()
        .map(|r| r.center())
        .unwrap_or_else(|| Point::new(params.width as i32 - 2, params.height as i32 - 2));

    map.set_tile(up_stairs.x(), up_stairs.y(), tileset::UP_STAIRS);
    map.set_tile(down_stairs.x(), down_stairs.y(), tileset::DOWN_STAIRS);

    GeneratedFloor {
        map,
        rooms,
        up_stairs,
        down_stairs,
    }
}

fn carve_room(map: &mut MapData, room: &Rect) {
    for p in room.interior() {
        map.set_tile(p.x(), p.y(), tileset::FLOOR);
    }
}

fn carve_horizontal_corridor(map: &mut MapData, x1: i32, x2: i32, y: i32) {
    for x in x1.min(x2)..=x1.max(x2) {
        if map.in_bounds(x, y) {
            map.set_tile(x, y, tileset::FLOOR);
        }
    }
}

fn carve_vertical_corridor(map: &mut MapData, y1: i32, y2: i32, x: i32) {
    for y in y1.min(y2)..=y1.max(y2) {
        if map.in_bounds(x, y) {
            map.set_tile(x, y, tileset::FLOOR);
        }
    }
}
