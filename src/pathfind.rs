//! A* pathfinding on the walkable grid.
//!
//! Calls `pathfinding::prelude::astar` over the map's adjacency, with a
//! "step onto a blocked destination tile" carve-out so melee targets remain
//! reachable. Uses Chebyshev distance throughout for the eight-way movement
//! heuristic, and folds blocking entities into the cost grid as a
//! high-but-finite penalty instead of a hard obstacle, so a path can still
//! route through a crowded corridor rather than dead-ending at it.

use crate::map::MapData;
use crate::math::Point;
use crate::world::{Entity, Tags, World};

/// Cost added for stepping onto a tile occupied by a blocking entity other
/// than the pathing actor. High enough that the search strongly prefers
/// routing around crowds, but finite so a path through a crowded room is
/// still found when there is no alternative.
const BLOCKER_PENALTY: u32 = 10;

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, -1),
    (-1, 1),
];

fn step_cost(map: &MapData, world: &World, map_entity: Entity, actor: Entity, x: i32, y: i32) -> Option<u32> {
    if !map.is_walkable(x, y) {
        return None;
    }
    let blocked = world.blocker_at(map_entity, x, y, actor).is_some();
    Some(1 + if blocked { BLOCKER_PENALTY } else { 0 })
}

/// Produces a path (excluding the start point, including the destination)
/// from `actor`'s current position to `dest` on the same map. Empty (`None`)
/// if unreachable; callers treat that as a cue to `Wait`.
pub fn find_path(world: &World, actor: Entity, dest: Point) -> Option<Vec<Point>> {
    let pos = world.position(actor)?;
    let map_entity = pos.map;
    let map = world.maps.get(&map_entity)?;
    let start = pos.point();

    if start == dest {
        return Some(Vec::new());
    }

    let result = pathfinding::prelude::astar(
        &start,
        |&p| {
            // Allow stepping onto the destination even if it is occupied by
            // the melee target itself, matching its carve-out.
            if p.chebyshev_distance(dest) == 1 {
                return vec![(dest, 1)];
            }
            NEIGHBOR_OFFSETS
                .iter()
                .filter_map(|&(dx, dy)| {
                    let next = Point::new(p.x() + dx, p.y() + dy);
                    step_cost(map, world, map_entity, actor, next.x(), next.y())
                        .map(|cost| (next, cost))
                })
                .collect::<Vec<_>>()
        },
        |&p| p.chebyshev_distance(dest) as u32,
        |&p| p == dest,
    );

    result.map(|(path, _)| path.into_iter().skip(1).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tileset;
    use crate::world::Position;

    fn open_world() -> (World, Entity) {
        let mut world = World::new(1);
        let map_entity = world.create();
        let mut map = MapData::blank(10, 10, 1);
        for y in 0..10 {
            for x in 0..10 {
                map.set_tile(x, y, tileset::FLOOR);
            }
        }
        world.maps.insert(map_entity, map);
        (world, map_entity)
    }

    #[test]
    fn finds_straight_path_on_open_floor() {
        let (mut world, map) = open_world();
        let actor = world.create();
        world.add_tags(actor, Tags::ACTOR);
        world.set_position(actor, Position::new(0, 0, map));

        let path = find_path(&world, actor, Point::new(3, 0)).unwrap();
        assert_eq!(path.last(), Some(&Point::new(3, 0)));
        assert!(path.len() <= 3);
    }

    #[test]
    fn routes_around_a_blocking_crowd() {
        let (mut world, map) = open_world();
        let actor = world.create();
        world.add_tags(actor, Tags::ACTOR);
        world.set_position(actor, Position::new(0, 5, map));

        for y in 0..10 {
            if y == 9 {
                continue;
            }
            let blocker = world.create();
            world.add_tags(blocker, Tags::ACTOR | Tags::BLOCKING);
            world.set_position(blocker, Position::new(5, y, map));
        }

        let path = find_path(&world, actor, Point::new(9, 5)).unwrap();
        assert_eq!(path.last(), Some(&Point::new(9, 5)));
    }

    #[test]
    fn unreachable_destination_returns_none() {
        let (mut world, map) = open_world();
        let actor = world.create();
        world.add_tags(actor, Tags::ACTOR);
        world.set_position(actor, Position::new(0, 0, map));
        let path = find_path(&world, actor, Point::new(500, 500));
        assert!(path.is_none());
    }
}
