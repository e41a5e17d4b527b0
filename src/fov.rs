//! Symmetric recursive-shadowcast field of view and tile memory.
//!
//! The visibility kernel follows the RogueBasin C++ shadowcasting
//! reference, adapted to read transparency from [`crate::map::MapData`]
//! and to work in signed coordinates. Ghost-entity bookkeeping and
//! memory-tile sync are assembled into a single [`update_fov`] entry
//! point.

use std::collections::HashSet;

use crate::map::MapData;
use crate::math::Point;
use crate::world::{Entity, Graphic, Name, Position, Tags, World};

const DIAGONAL_MULTIPLIERS: [[i32; 8]; 4] = [
    [1, 0, 0, -1, -1, 0, 0, 1],
    [0, 1, -1, 0, 0, -1, 1, 0],
    [0, 1, 1, 0, 0, -1, -1, 0],
    [1, 0, 0, 1, -1, 0, 0, -1],
];

struct Shadowcast<'a> {
    x: i32,
    y: i32,
    radius: i32,
    map: &'a MapData,
    visible: HashSet<Point>,
}

/// Computes the set of tiles visible from `(x, y)` within `radius` on `map`,
/// ignoring any entity occupying those tiles (occupancy is irrelevant to
/// line-of-sight; only tile transparency matters).
pub fn compute_visible(map: &MapData, origin: Point, radius: i32) -> HashSet<Point> {
    let mut fov = Shadowcast {
        x: origin.x(),
        y: origin.y(),
        radius,
        map,
        visible: HashSet::with_capacity((radius * radius * 4).max(1) as usize),
    };
    fov.visible.insert(origin);
    for octant in 0..8 {
        fov.cast_light(
            1,
            1.0,
            0.0,
            (
                DIAGONAL_MULTIPLIERS[0][octant],
                DIAGONAL_MULTIPLIERS[1][octant],
                DIAGONAL_MULTIPLIERS[2][octant],
                DIAGONAL_MULTIPLIERS[3][octant],
            ),
        );
    }
    fov.visible
}

impl<'a> Shadowcast<'a> {
    fn cast_light(&mut self, row: i32, mut start: f32, end: f32, mul: (i32, i32, i32, i32)) {
        let mut blocked = false;
        let mut next_start_slope = start;

        if start < end {
            return;
        }

        for i in row..=self.radius {
            if blocked {
                break;
            }
            for dx in -i..=0 {
                let dy = -i;
                let l_slope = (dx as f32 - 0.5) / (dy as f32 + 0.5);
                let r_slope = (dx as f32 + 0.5) / (dy as f32 - 0.5);

                if start < r_slope {
                    continue;
                } else if end > l_slope {
                    break;
                }

                let sax = dx * mul.0 + dy * mul.1;
                let say = dx * mul.2 + dy * mul.3;
                let ax = self.x + sax;
                let ay = self.y + say;

                if !self.map.in_bounds(ax, ay) {
                    continue;
                }

                let radius2 = self.radius * self.radius;
                if dx * dx + dy * dy < radius2 {
                    self.visible.insert(Point::new(ax, ay));
                }

                if blocked {
                    if !self.map.is_transparent(ax, ay) {
                        next_start_slope = r_slope;
                        continue;
                    }
                    blocked = false;
                    start = next_start_slope;
                } else if !self.map.is_transparent(ax, ay) {
                    blocked = true;
                    self.cast_light(i + 1, start, l_slope, mul);
                    next_start_slope = r_slope;
                }
            }
        }
    }
}

/// `update_fov(actor, clear)`: recomputes the actor's map's
/// visibility from the actor's position, syncs memory tiles, and maintains
/// ghost entities for actors that just left view. If `clear`, visibility is
/// zeroed instead (used before a level transition).
pub fn update_fov(world: &mut World, actor: Entity, clear: bool) {
    let Some(pos) = world.position(actor) else {
        return;
    };
    let map_entity = pos.map;

    let previously_visible_actors: Vec<Entity> = world
        .actors_on(map_entity)
        .into_iter()
        .filter(|&e| {
            world
                .position(e)
                .map(|p| {
                    world
                        .maps
                        .get(&map_entity)
                        .map(|m| m.is_visible(p.x, p.y))
                        .unwrap_or(false)
                })
                .unwrap_or(false)
        })
        .collect();

    let new_visible: HashSet<Point> = if clear {
        HashSet::new()
    } else {
        let map = world
            .maps
            .get(&map_entity)
            .expect("position references a live map entity");
        compute_visible(map, pos.point(), world.config.fov_radius)
    };

    if let Some(map) = world.maps.get_mut(&map_entity) {
        map.clear_visibility();
        for p in &new_visible {
            map.set_visible(p.x(), p.y(), true);
        }
        map.sync_memory();
    }

    // Spawn ghosts for actors that just left view; destroy ghosts whose tile
    // is now visible.
    for other in previously_visible_actors {
        if other == actor {
            continue;
        }
        let still_visible = world
            .position(other)
            .map(|p| new_visible.contains(&p.point()))
            .unwrap_or(false);
        if !still_visible {
            spawn_ghost(world, other);
        }
    }

    let ghosts = world.query_tags(Tags::GHOST, Tags::empty());
    for ghost in ghosts {
        if let Some(p) = world.position(ghost) {
            if new_visible.contains(&p.point()) {
                world.destroy(ghost);
            }
        }
    }
}

fn spawn_ghost(world: &mut World, original: Entity) {
    let (Some(pos), Some(graphic)) = (world.position(original), world.graphics.get(&original).copied())
    else {
        return;
    };
    let name = world.names.get(&original).cloned();

    let ghost = world.create();
    world.add_tags(ghost, Tags::GHOST);
    world.set_position(ghost, Position::new(pos.x, pos.y, pos.map));
    world.graphics.insert(ghost, graphic);
    if let Some(name) = name {
        world.names.insert(ghost, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tileset;

    fn open_room(size: i32) -> MapData {
        let mut map = MapData::blank(size as u32, size as u32, 1);
        for y in 0..size {
            for x in 0..size {
                map.set_tile(x, y, tileset::FLOOR);
            }
        }
        map
    }

    #[test]
    fn open_room_sees_everything_in_radius() {
        let map = open_room(5);
        let visible = compute_visible(&map, Point::new(2, 2), 10);
        assert!(visible.contains(&Point::new(0, 0)));
        assert!(visible.contains(&Point::new(4, 4)));
    }

    #[test]
    fn wall_blocks_sight_beyond_it() {
        let mut map = open_room(9);
        for y in 0..9 {
            map.set_tile(4, y, tileset::WALL);
        }
        let visible = compute_visible(&map, Point::new(0, 4), 10);
        assert!(!visible.contains(&Point::new(8, 4)));
    }

    #[test]
    fn fov_is_symmetric_on_identical_transparency() {
        let map = open_room(11);
        let a = Point::new(1, 1);
        let b = Point::new(7, 5);
        let from_a = compute_visible(&map, a, 10);
        let from_b = compute_visible(&map, b, 10);
        assert_eq!(from_a.contains(&b), from_b.contains(&a));
    }
}
