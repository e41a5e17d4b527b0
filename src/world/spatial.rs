//! Spatial index: "entities at position P" in O(1) amortized.
//!
//! Rather than rebuilding a blocked/occupancy grid every tick by walking
//! every `Position`, the index is maintained incrementally by the
//! `Position`-change hook in `World::set_position`/`World::clear_position`,
//! backed by a `HashMap<Position, SmallVec<EntityId>>`.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::world::Entity;

pub type Occupants = SmallVec<[Entity; 4]>;

#[derive(Default)]
pub struct SpatialIndex {
    by_position: HashMap<(Entity, i32, i32), Occupants>,
}

impl SpatialIndex {
    pub fn insert(&mut self, map: Entity, x: i32, y: i32, entity: Entity) {
        let slot = self.by_position.entry((map, x, y)).or_default();
        if !slot.contains(&entity) {
            slot.push(entity);
        }
    }

    pub fn remove(&mut self, map: Entity, x: i32, y: i32, entity: Entity) {
        if let Some(slot) = self.by_position.get_mut(&(map, x, y)) {
            slot.retain(|&e| e != entity);
            if slot.is_empty() {
                self.by_position.remove(&(map, x, y));
            }
        }
    }

    pub fn at(&self, map: Entity, x: i32, y: i32) -> &[Entity] {
        self.by_position
            .get(&(map, x, y))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn insert_then_remove_empties_slot() {
        let mut world = World::new(1);
        let map = world.create();
        let e = world.create();
        let mut index = SpatialIndex::default();
        index.insert(map, 3, 4, e);
        assert_eq!(index.at(map, 3, 4), &[e]);
        index.remove(map, 3, 4, e);
        assert_eq!(index.at(map, 3, 4), &[] as &[Entity]);
    }
}
