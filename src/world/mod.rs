//! The entity-component world.
//!
//! Tags are a `bitflags!` bitmask rather than free-form string atoms — the
//! vocabulary is closed and small, so a bitmask gives `all_of`/`none_of`
//! queries for free. Components are typed sparse stores (`HashMap<Entity,
//! T>` per type) behind this `World` facade, the same shape a
//! `specs`-backed `amethyst::ecs::WriteStorage<T>` has.
//!
//! A fully generic `all_of(tags, components, relations).none_of(tags)`
//! query DSL is deliberately not reproduced as one reflective object: tags
//! alone are exposed through [`World::query_tags`] (a bitmask
//! intersection, which is genuinely generic), while component/relation
//! filtering is call-site-specific (`World::actors_on`, `World::items_at`,
//! `World::affecting`, ...), one explicit query per call site instead of a
//! single reflective query builder.

pub mod components;
pub mod spatial;

pub use components::*;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ai::Ai;
use crate::config::Config;
use crate::map::MapData;
use crate::message::MessageLog;
use crate::rng::Rng;

use spatial::SpatialIndex;

/// Opaque generational entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}:{})", self.index, self.generation)
    }
}

#[derive(Default, Serialize, Deserialize)]
struct Allocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
}

impl Allocator {
    fn create(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            self.alive[index as usize] = true;
            Entity {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity { index, generation: 0 }
        }
    }

    fn destroy(&mut self, e: Entity) -> bool {
        if !self.is_alive(e) {
            return false;
        }
        let index = e.index as usize;
        self.alive[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(e.index);
        true
    }

    fn is_alive(&self, e: Entity) -> bool {
        let index = e.index as usize;
        index < self.generations.len()
            && self.alive[index]
            && self.generations[index] == e.generation
    }

    fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.generations
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.alive[*i])
            .map(|(i, &g)| Entity {
                index: i as u32,
                generation: g,
            })
    }
}

bitflags::bitflags! {
    /// Closed tag vocabulary: queries intersect bitmaps rather than
    /// matching string atoms.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Tags: u32 {
        const ACTOR          = 1 << 0;
        const ALIVE          = 1 << 1;
        const BLOCKING       = 1 << 2;
        const PLAYER         = 1 << 3;
        const ITEM           = 1 << 4;
        const EFFECT         = 1 << 5;
        const EFFECT_SPAWNER = 1 << 6;
        const GHOST          = 1 << 7;
        const PICKABLE       = 1 << 8;
        const UP_STAIRS      = 1 << 9;
        const DOWN_STAIRS    = 1 << 10;
        const TEMPLATE       = 1 << 11;
    }
}

/// The three relation kinds tracked per entity, held as a fixed-field
/// struct rather than a generic relation map since only these three are
/// ever needed.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Relations {
    pub is_in: Option<Entity>,
    pub affecting: Option<Entity>,
    pub equipped_by: Option<Entity>,
}

#[derive(Serialize, Deserialize)]
pub struct World {
    alloc: Allocator,
    tags: HashMap<Entity, Tags>,
    relations: HashMap<Entity, Relations>,

    pub rng: Rng,
    pub messages: MessageLog,
    /// Game-balance knobs (map size, FOV radius, spawn caps); not persisted
    /// across saves, the same way `templates` is rebuilt fresh on load.
    #[serde(skip)]
    pub config: Config,

    pub positions: HashMap<Entity, Position>,
    pub stats: HashMap<Entity, Stats>,
    pub energy: HashMap<Entity, EnergyStats>,
    pub progression: HashMap<Entity, Progression>,
    pub names: HashMap<Entity, Name>,
    pub graphics: HashMap<Entity, Graphic>,
    pub racial_traits: HashMap<Entity, Vec<RacialTraitDef>>,
    pub resistances: HashMap<Entity, Vec<(DamageType, ResistanceLevel)>>,
    pub loot_drop_chance: HashMap<Entity, f32>,
    pub equip_slot: HashMap<Entity, EquipSlot>,
    pub power_bonus: HashMap<Entity, DiceOrFlat>,
    pub defense_bonus: HashMap<Entity, i32>,
    pub hp_bonus: HashMap<Entity, i32>,
    pub spawn_weight: HashMap<Entity, Vec<(u32, u32)>>,
    pub stack_info: HashMap<Entity, StackInfo>,
    pub apply_action: HashMap<Entity, ApplyActionKind>,
    pub effect_state: HashMap<Entity, EffectState>,
    pub spawner_traits: HashMap<Entity, SpawnerTraits>,
    pub delayed_action: HashMap<Entity, DelayedAction>,
    pub assigned_key: HashMap<Entity, char>,
    pub ai: HashMap<Entity, Ai>,
    pub map_key: HashMap<Entity, MapKey>,
    pub maps: HashMap<Entity, MapData>,

    /// Name -> template entity registry, populated
    /// once by [`crate::content::init_content`]. Not persisted across
    /// saves; rebuilt fresh on load, same as `config` (see [`crate::save`]).
    #[serde(skip)]
    pub templates: HashMap<String, Entity>,

    #[serde(skip)]
    pub spatial: SpatialIndex,
}

impl World {
    pub fn new(seed: u64) -> World {
        World {
            alloc: Allocator::default(),
            tags: HashMap::new(),
            relations: HashMap::new(),
            rng: Rng::seeded(seed),
            messages: MessageLog::default(),
            config: Config::default(),
            positions: HashMap::new(),
            stats: HashMap::new(),
            energy: HashMap::new(),
            progression: HashMap::new(),
            names: HashMap::new(),
            graphics: HashMap::new(),
            racial_traits: HashMap::new(),
            resistances: HashMap::new(),
            loot_drop_chance: HashMap::new(),
            equip_slot: HashMap::new(),
            power_bonus: HashMap::new(),
            defense_bonus: HashMap::new(),
            hp_bonus: HashMap::new(),
            spawn_weight: HashMap::new(),
            stack_info: HashMap::new(),
            apply_action: HashMap::new(),
            effect_state: HashMap::new(),
            spawner_traits: HashMap::new(),
            delayed_action: HashMap::new(),
            assigned_key: HashMap::new(),
            ai: HashMap::new(),
            map_key: HashMap::new(),
            maps: HashMap::new(),
            templates: HashMap::new(),
            spatial: SpatialIndex::default(),
        }
    }

    /// Rebuilds the spatial index from `positions` after deserializing a
    /// save: the index itself is not persisted (see the `#[serde(skip)]`
    /// above), only the authoritative `positions` map is.
    pub fn rebuild_spatial_index(&mut self) {
        self.spatial = SpatialIndex::default();
        for (&entity, pos) in self.positions.iter() {
            self.spatial.insert(pos.map, pos.x, pos.y, entity);
        }
    }

    // -- entity lifecycle -------------------------------------------------

    pub fn create(&mut self) -> Entity {
        let e = self.alloc.create();
        self.tags.insert(e, Tags::empty());
        self.relations.insert(e, Relations::default());
        e
    }

    pub fn is_alive(&self, e: Entity) -> bool {
        self.alloc.is_alive(e)
    }

    /// Destroys an entity and cascades: deleting an actor removes all
    /// effects with `Affecting → actor`.
    pub fn destroy(&mut self, e: Entity) {
        if !self.alloc.is_alive(e) {
            return;
        }

        let dependents: Vec<Entity> = self
            .relations
            .iter()
            .filter(|(_, rel)| rel.affecting == Some(e))
            .map(|(&dep, _)| dep)
            .collect();
        for dep in dependents {
            self.destroy(dep);
        }

        if let Some(pos) = self.positions.remove(&e) {
            self.spatial.remove(pos.map, pos.x, pos.y, e);
        }
        self.tags.remove(&e);
        self.relations.remove(&e);
        self.stats.remove(&e);
        self.energy.remove(&e);
        self.progression.remove(&e);
        self.names.remove(&e);
        self.graphics.remove(&e);
        self.racial_traits.remove(&e);
        self.resistances.remove(&e);
        self.loot_drop_chance.remove(&e);
        self.equip_slot.remove(&e);
        self.power_bonus.remove(&e);
        self.defense_bonus.remove(&e);
        self.hp_bonus.remove(&e);
        self.spawn_weight.remove(&e);
        self.stack_info.remove(&e);
        self.apply_action.remove(&e);
        self.effect_state.remove(&e);
        self.spawner_traits.remove(&e);
        self.delayed_action.remove(&e);
        self.assigned_key.remove(&e);
        self.ai.remove(&e);
        self.map_key.remove(&e);
        self.maps.remove(&e);

        self.alloc.destroy(e);
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alloc.iter_alive()
    }

    // -- tags ---------------------------------------------------------------

    pub fn tags(&self, e: Entity) -> Tags {
        self.tags.get(&e).copied().unwrap_or_else(Tags::empty)
    }

    pub fn add_tags(&mut self, e: Entity, tags: Tags) {
        self.tags.entry(e).or_insert_with(Tags::empty).insert(tags);
    }

    pub fn remove_tags(&mut self, e: Entity, tags: Tags) {
        if let Some(t) = self.tags.get_mut(&e) {
            t.remove(tags);
        }
    }

    pub fn has_all(&self, e: Entity, tags: Tags) -> bool {
        self.tags(e).contains(tags)
    }

    pub fn has_any(&self, e: Entity, tags: Tags) -> bool {
        self.tags(e).intersects(tags)
    }

    /// Tag-only portion of the `all_of(...).none_of(...)` query DSL.
    /// Sorted by entity id for deterministic iteration over the
    /// unordered backing map.
    pub fn query_tags(&self, all_of: Tags, none_of: Tags) -> Vec<Entity> {
        let mut matches: Vec<Entity> = self
            .tags
            .iter()
            .filter(|(_, &t)| t.contains(all_of) && !t.intersects(none_of))
            .map(|(&e, _)| e)
            .collect();
        matches.sort_unstable();
        matches
    }

    // -- relations ------------------------------------------------------

    pub fn relations(&self, e: Entity) -> Relations {
        self.relations.get(&e).copied().unwrap_or_default()
    }

    pub fn is_in(&self, e: Entity) -> Option<Entity> {
        self.relations(e).is_in
    }

    pub fn affecting(&self, e: Entity) -> Option<Entity> {
        self.relations(e).affecting
    }

    pub fn equipped_by(&self, e: Entity) -> Option<Entity> {
        self.relations(e).equipped_by
    }

    pub fn set_is_in(&mut self, e: Entity, target: Option<Entity>) {
        self.relations.entry(e).or_default().is_in = target;
    }

    pub fn set_affecting(&mut self, e: Entity, target: Option<Entity>) {
        self.relations.entry(e).or_default().affecting = target;
    }

    pub fn set_equipped_by(&mut self, e: Entity, target: Option<Entity>) {
        self.relations.entry(e).or_default().equipped_by = target;
    }

    /// Every entity whose `Affecting` relation targets `owner` (effect
    /// instances and effect spawners alike).
    pub fn affecting_targets(&self, owner: Entity) -> Vec<Entity> {
        let mut v: Vec<Entity> = self
            .relations
            .iter()
            .filter(|(_, rel)| rel.affecting == Some(owner))
            .map(|(&e, _)| e)
            .collect();
        v.sort_unstable();
        v
    }

    // -- position / spatial index hook --------------------------------------

    pub fn position(&self, e: Entity) -> Option<Position> {
        self.positions.get(&e).copied()
    }

    /// Component-change hook: atomically updates the spatial index and
    /// the `IsIn` relation.
    pub fn set_position(&mut self, e: Entity, pos: Position) {
        if let Some(old) = self.positions.get(&e).copied() {
            if old == pos {
                return;
            }
            self.spatial.remove(old.map, old.x, old.y, e);
        }
        self.positions.insert(e, pos);
        self.spatial.insert(pos.map, pos.x, pos.y, e);
        self.set_is_in(e, Some(pos.map));
    }

    pub fn clear_position(&mut self, e: Entity) {
        if let Some(old) = self.positions.remove(&e) {
            self.spatial.remove(old.map, old.x, old.y, e);
        }
    }

    /// Entities located at `(x, y)` on `map`.
    pub fn entities_at(&self, map: Entity, x: i32, y: i32) -> &[Entity] {
        self.spatial.at(map, x, y)
    }

    /// Every actor (`Tags::ACTOR`) whose `IsIn` relation is `map`, sorted by
    /// entity id so AI turn order stays stable within a tick.
    pub fn actors_on(&self, map: Entity) -> Vec<Entity> {
        let mut v: Vec<Entity> = self
            .relations
            .iter()
            .filter(|(&e, rel)| rel.is_in == Some(map) && self.has_all(e, Tags::ACTOR))
            .map(|(&e, _)| e)
            .collect();
        v.sort_unstable();
        v
    }

    /// Living, blocking actor at `(x, y)` other than `exclude`, if any —
    /// used by `Move`/`Bump` collision checks.
    pub fn blocker_at(&self, map: Entity, x: i32, y: i32, exclude: Entity) -> Option<Entity> {
        self.entities_at(map, x, y)
            .iter()
            .copied()
            .find(|&e| e != exclude && self.has_all(e, Tags::BLOCKING))
    }

    /// Items lying on the ground at `(x, y)`.
    pub fn items_at(&self, map: Entity, x: i32, y: i32) -> Vec<Entity> {
        self.entities_at(map, x, y)
            .iter()
            .copied()
            .filter(|&e| self.has_all(e, Tags::ITEM))
            .collect()
    }

    // -- templates --------------------------------------------------------

    /// Deep-copies every component store entry and the tag set of `template`
    /// into a fresh entity. Relations are *not* copied, nor
    /// is `Position` — a freshly instantiated entity is not yet placed.
    pub fn instantiate(&mut self, template: Entity) -> Entity {
        let fresh = self.create();

        let mut tags = self.tags(template);
        tags.remove(Tags::TEMPLATE);
        self.add_tags(fresh, tags);

        macro_rules! copy_store {
            ($store:ident) => {
                if let Some(v) = self.$store.get(&template).cloned() {
                    self.$store.insert(fresh, v);
                }
            };
        }
        copy_store!(stats);
        copy_store!(energy);
        copy_store!(progression);
        copy_store!(names);
        copy_store!(graphics);
        copy_store!(racial_traits);
        copy_store!(resistances);
        copy_store!(loot_drop_chance);
        copy_store!(equip_slot);
        copy_store!(power_bonus);
        copy_store!(defense_bonus);
        copy_store!(hp_bonus);
        copy_store!(spawn_weight);
        copy_store!(stack_info);
        copy_store!(apply_action);
        copy_store!(effect_state);
        copy_store!(spawner_traits);
        copy_store!(assigned_key);
        copy_store!(ai);
        copy_store!(map_key);

        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_entity_id_is_not_reused_while_alive() {
        let mut world = World::new(1);
        let a = world.create();
        world.destroy(a);
        let b = world.create();
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(!world.is_alive(a));
        assert!(world.is_alive(b));
    }

    #[test]
    fn query_tags_is_sorted_and_respects_none_of() {
        let mut world = World::new(1);
        let a = world.create();
        let b = world.create();
        world.add_tags(a, Tags::ACTOR | Tags::ALIVE);
        world.add_tags(b, Tags::ACTOR);
        let alive_actors = world.query_tags(Tags::ACTOR, Tags::empty());
        assert_eq!(alive_actors, vec![a, b]);
        let only_alive = world.query_tags(Tags::ACTOR | Tags::ALIVE, Tags::empty());
        assert_eq!(only_alive, vec![a]);
        let non_alive = world.query_tags(Tags::ACTOR, Tags::ALIVE);
        assert_eq!(non_alive, vec![b]);
    }

    #[test]
    fn destroy_cascades_to_affecting_effects() {
        let mut world = World::new(1);
        let owner = world.create();
        let effect = world.create();
        world.set_affecting(effect, Some(owner));
        world.destroy(owner);
        assert!(!world.is_alive(effect));
    }

    #[test]
    fn set_position_updates_spatial_index_and_is_in() {
        let mut world = World::new(1);
        let map = world.create();
        let actor = world.create();
        world.set_position(actor, Position::new(2, 3, map));
        assert_eq!(world.entities_at(map, 2, 3), &[actor]);
        assert_eq!(world.is_in(actor), Some(map));
        world.set_position(actor, Position::new(4, 3, map));
        assert_eq!(world.entities_at(map, 2, 3), &[] as &[Entity]);
        assert_eq!(world.entities_at(map, 4, 3), &[actor]);
    }

    #[test]
    fn instantiate_deep_copies_components_but_not_relations_or_position() {
        let mut world = World::new(1);
        let map = world.create();
        let template = world.create();
        world.add_tags(template, Tags::ACTOR | Tags::TEMPLATE);
        world.names.insert(template, Name("orc".into()));
        world.set_position(template, Position::new(0, 0, map));
        world.set_affecting(template, Some(map));

        let fresh = world.instantiate(template);
        assert!(world.has_all(fresh, Tags::ACTOR));
        assert!(!world.has_all(fresh, Tags::TEMPLATE));
        assert_eq!(world.names.get(&fresh).map(|n| n.0.as_str()), Some("orc"));
        assert_eq!(world.position(fresh), None);
        assert_eq!(world.affecting(fresh), None);
    }
}
