//! The action library: `Action ∈ {Move, Melee, Bump, Wait,
//! PickupItem, DropItem, ApplyItem, TakeStairs, MoveLevel, SpawnEntity,
//! FollowPath}` and a dispatcher matching on the variant.
//!
//! Each callable-action class becomes one variant of this tagged enum, and
//! each class's call operator becomes one arm of [`perform`]: a tagged
//! variant plus a dispatcher that matches on it, rather than a set of
//! polymorphic callables.

use serde::{Deserialize, Serialize};

use crate::combat;
use crate::map::tileset;
use crate::math::Point;
use crate::message::Color;
use crate::pathfind;
use crate::world::{ApplyActionKind, EquipSlot, Entity, MapKey, Position, Tags, World};

/// `(dx, dy)`, each in `-1..=1`; `(0, 0)` is a no-op direction.
pub type Direction = (i32, i32);

/// Up/down stair direction tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StairDirection {
    Up,
    Down,
}

impl StairDirection {
    fn reverse(self) -> StairDirection {
        match self {
            StairDirection::Up => StairDirection::Down,
            StairDirection::Down => StairDirection::Up,
        }
    }

    fn tile_tag(self) -> Tags {
        match self {
            StairDirection::Up => Tags::UP_STAIRS,
            StairDirection::Down => Tags::DOWN_STAIRS,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            StairDirection::Up => "ascend",
            StairDirection::Down => "descend",
        }
    }
}

/// A pending state-machine transition an action result may carry.
/// Rendering/selection of the target is an external collaborator's job;
/// the core only describes what is being waited on.
#[derive(Debug, Clone)]
pub enum Transition {
    /// A scroll or spell awaiting a player-chosen map position.
    AwaitPosition { item: Option<Entity>, spell: String },
}

/// Outcome of [`perform`]ing an action.
pub enum ActionResult {
    /// `Success(message?)`: the world mutated; an optional message to log.
    Success(Option<(String, Color)>),
    /// `Impossible(reason)`: no mutation occurred; the turn is refunded.
    Impossible(String),
    /// `Poll(state)`: transitions the state machine without ending the turn.
    Poll(Transition),
}

impl ActionResult {
    pub fn success() -> ActionResult {
        ActionResult::Success(None)
    }

    pub fn message(text: impl Into<String>, color: Color) -> ActionResult {
        ActionResult::Success(Some((text.into(), color)))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }
}

/// Tagged action variant. `DelayedAction`
/// is simply an `Action` remembered on the actor across turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    Melee(Direction),
    Bump(Direction),
    Wait,
    PickupItem,
    DropItem(Entity),
    ApplyItem(Entity),
    /// Confirms a target-scroll's chosen position after a
    /// `Poll(Transition::AwaitPosition)` round-trip through the state
    /// machine; bills energy like any other action, unlike the `ApplyItem`
    /// that originally polled for the target.
    CastAtPosition {
        item: Option<Entity>,
        spell: String,
        target: Position,
    },
    TakeStairs(StairDirection),
    MoveLevel {
        dest_map: MapKey,
        reverse: StairDirection,
        message: String,
    },
    /// Ticks the named spawner's timer and spawns its templated actor when
    /// ready; `spawner` is the AI-owning actor entity itself, matching the
    /// `SpawnerAI` variant's own state.
    SpawnEntity(Entity),
    FollowPath(Vec<Point>),
}

/// Default action cost before scheduler speed adjustment.
pub const DEFAULT_ACTION_COST: i32 = 100;

impl Action {
    /// Base (unadjusted) energy cost; the scheduler applies `MoveSpeed`/
    /// `AttackSpeed` on top of this for `Move`/`Melee`.
    pub fn base_cost(&self) -> i32 {
        DEFAULT_ACTION_COST
    }
}

/// Dispatches `action` against `entity`.
pub fn perform(world: &mut World, entity: Entity, action: &Action) -> ActionResult {
    match action {
        Action::Move(dir) => perform_move(world, entity, *dir),
        Action::Melee(dir) => perform_melee(world, entity, *dir),
        Action::Bump(dir) => perform_bump(world, entity, *dir),
        Action::Wait => ActionResult::success(),
        Action::PickupItem => perform_pickup(world, entity),
        Action::DropItem(item) => perform_drop(world, entity, *item),
        Action::ApplyItem(item) => perform_apply(world, entity, *item),
        Action::CastAtPosition { item, spell, target } => {
            crate::inventory::cast_at_position(world, entity, *item, spell, *target)
        }
        Action::TakeStairs(dir) => perform_take_stairs(world, entity, *dir),
        Action::MoveLevel {
            dest_map,
            reverse,
            message,
        } => perform_move_level(world, entity, *dest_map, *reverse, message),
        Action::SpawnEntity(spawner) => perform_spawn_entity(world, *spawner),
        Action::FollowPath(_) => ActionResult::Impossible("path is resolved by the AI layer".into()),
    }
}

fn perform_move(world: &mut World, entity: Entity, dir: Direction) -> ActionResult {
    if dir == (0, 0) {
        return ActionResult::success();
    }
    let Some(pos) = world.position(entity) else {
        return ActionResult::Impossible("entity has no position".into());
    };
    let (nx, ny) = (pos.x + dir.0, pos.y + dir.1);
    let Some(map) = world.maps.get(&pos.map) else {
        return ActionResult::Impossible("entity's map no longer exists".into());
    };
    if !map.in_bounds(nx, ny) {
        return ActionResult::Impossible("Out of bounds.".into());
    }
    let tile = map.tile_at(nx, ny).expect("just checked in_bounds");
    let def = tileset::tile_def(tile);
    if def.walk_cost == 0 {
        return ActionResult::Impossible(format!("Blocked by {}.", def.name));
    }
    if world.blocker_at(pos.map, nx, ny, entity).is_some() {
        return ActionResult::Impossible("Something is in the way.".into());
    }

    world.set_position(entity, Position::new(nx, ny, pos.map));
    ActionResult::success()
}

fn perform_melee(world: &mut World, entity: Entity, dir: Direction) -> ActionResult {
    let Some(pos) = world.position(entity) else {
        return ActionResult::Impossible("entity has no position".into());
    };
    let (nx, ny) = (pos.x + dir.0, pos.y + dir.1);
    let target = world
        .entities_at(pos.map, nx, ny)
        .iter()
        .copied()
        .find(|&e| world.has_all(e, Tags::ALIVE));
    let Some(target) = target else {
        return ActionResult::Impossible("Nothing there to attack.".into());
    };

    combat::melee_damage(world, entity, target);
    ActionResult::success()
}

fn perform_bump(world: &mut World, entity: Entity, dir: Direction) -> ActionResult {
    if dir == (0, 0) {
        return ActionResult::success();
    }
    let Some(pos) = world.position(entity) else {
        return ActionResult::Impossible("entity has no position".into());
    };
    let (nx, ny) = (pos.x + dir.0, pos.y + dir.1);
    let has_living = world
        .entities_at(pos.map, nx, ny)
        .iter()
        .any(|&e| world.has_all(e, Tags::ALIVE));
    if has_living {
        perform_melee(world, entity, dir)
    } else {
        perform_move(world, entity, dir)
    }
}

fn perform_pickup(world: &mut World, entity: Entity) -> ActionResult {
    let Some(pos) = world.position(entity) else {
        return ActionResult::Impossible("entity has no position".into());
    };
    let items = world.items_at(pos.map, pos.x, pos.y);
    let Some(&item) = items.first() else {
        return ActionResult::Impossible("There is nothing here to pick up.".into());
    };
    crate::inventory::add_to_inventory(world, entity, item)
}

fn perform_drop(world: &mut World, entity: Entity, item: Entity) -> ActionResult {
    if world.is_in(item) != Some(entity) {
        panic!("invariant violated: dropping an item not owned by the actor");
    }
    let Some(pos) = world.position(entity) else {
        return ActionResult::Impossible("entity has no position".into());
    };
    let name = world
        .names
        .get(&item)
        .map(|n| n.0.clone())
        .unwrap_or_else(|| "?".into());

    crate::inventory::unequip(world, item);
    world.set_is_in(item, None);
    world.set_position(item, pos);
    ActionResult::message(format!("You drop the {name}!"), Color::Impossible)
}

fn perform_apply(world: &mut World, entity: Entity, item: Entity) -> ActionResult {
    crate::inventory::apply_item(world, entity, item)
}

fn perform_take_stairs(world: &mut World, entity: Entity, dir: StairDirection) -> ActionResult {
    let Some(pos) = world.position(entity) else {
        return ActionResult::Impossible("entity has no position".into());
    };
    let stairs = world
        .entities_at(pos.map, pos.x, pos.y)
        .iter()
        .copied()
        .find(|&e| world.has_all(e, dir.tile_tag()));
    let Some(stairs) = stairs else {
        let noun = match dir {
            StairDirection::Up => "upward",
            StairDirection::Down => "downward",
        };
        return ActionResult::Impossible(format!("There are no {noun} stairs here!"));
    };
    let Some(&dest_map) = world.map_key.get(&stairs) else {
        return ActionResult::Impossible("You can not leave yet.".into());
    };

    let message = format!("You {} the stairs.", dir.verb());
    perform_move_level(world, entity, dest_map, dir.reverse(), &message)
}

/// Moves `entity` to the reverse-direction stair of `dest_map`. Loads the
/// destination floor from `world.maps` if already generated for this game,
/// or generates and caches it.
fn perform_move_level(
    world: &mut World,
    entity: Entity,
    dest_map: MapKey,
    reverse: StairDirection,
    message: &str,
) -> ActionResult {
    crate::fov::update_fov(world, entity, true);

    let map_entity = crate::content::ensure_floor(world, dest_map);

    let stairs_tag = reverse.tile_tag();
    let dest_pos = world
        .query_tags(stairs_tag, Tags::empty())
        .into_iter()
        .find_map(|e| world.position(e).filter(|p| p.map == map_entity));

    let Some(dest_pos) = dest_pos else {
        panic!("invariant violated: destination floor has no reverse stair");
    };

    world.set_position(entity, dest_pos);
    ActionResult::message(message.to_string(), Color::WelcomeText)
}

/// Spawner racial-trait / monster-spawner tick.
fn perform_spawn_entity(world: &mut World, spawner: Entity) -> ActionResult {
    crate::ai::tick_spawner(world, spawner)
}

/// `FollowPath`: pops the next step and issues a [`Action::Move`]; on
/// non-`Success` the caller is expected to clear the remembered path.
/// Kept separate from [`perform`]'s `FollowPath` arm because the AI layer
/// owns the path state, not the action itself.
pub fn follow_path(world: &mut World, entity: Entity, path: &mut Vec<Point>) -> ActionResult {
    let Some(next) = path.first().copied() else {
        return ActionResult::Impossible("No path.".into());
    };
    let Some(pos) = world.position(entity) else {
        return ActionResult::Impossible("entity has no position".into());
    };
    let dir = (next.x() - pos.x, next.y() - pos.y);
    let result = perform_move(world, entity, dir);
    if result.is_success() {
        path.remove(0);
    } else {
        path.clear();
    }
    result
}

/// `Bump(d)` vs `Move(d)`/`Melee(d)` equivalence is exercised directly in
/// tests below via [`perform`].
#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{tileset, MapData};
    use crate::world::Stats;

    fn wall_world() -> (World, Entity, Entity) {
        let mut world = World::new(1);
        let map_entity = world.create();
        let mut map = MapData::blank(5, 5, 1);
        for y in 0..5 {
            for x in 0..5 {
                map.set_tile(x, y, tileset::FLOOR);
            }
        }
        map.set_tile(3, 2, tileset::WALL);
        world.maps.insert(map_entity, map);

        let player = world.create();
        world.add_tags(player, Tags::ACTOR | Tags::ALIVE | Tags::BLOCKING | Tags::PLAYER);
        world.set_position(player, Position::new(2, 2, map_entity));
        (world, map_entity, player)
    }

    #[test]
    fn bump_into_wall_is_impossible_and_does_not_move() {
        let (mut world, _map, player) = wall_world();
        let before = world.position(player).unwrap();
        let result = perform(&mut world, player, &Action::Bump((1, 0)));
        assert!(matches!(result, ActionResult::Impossible(_)));
        assert_eq!(world.position(player), Some(before));
    }

    #[test]
    fn bump_dispatches_to_melee_against_living_target() {
        let (mut world, map, player) = wall_world();
        let rat = world.create();
        world.add_tags(rat, Tags::ACTOR | Tags::ALIVE | Tags::BLOCKING);
        world.stats.insert(
            rat,
            Stats {
                hp: 4,
                max_hp: 4,
                str_: 1,
                dex: 1,
                con: 1,
                defense: 0,
                attack: crate::world::DiceOrFlat::Flat(1),
            },
        );
        world.set_position(rat, Position::new(3, 2, map));
        world.stats.insert(
            player,
            Stats {
                hp: 20,
                max_hp: 20,
                str_: 5,
                dex: 5,
                con: 5,
                defense: 0,
                attack: crate::world::DiceOrFlat::Flat(5),
            },
        );

        perform(&mut world, player, &Action::Bump((1, 0)));
        // Either hit (HP dropped or rat died) or a natural-1 miss; position never changes.
        assert_eq!(world.position(player), Some(Position::new(2, 2, map)));
    }

    #[test]
    fn bump_dispatches_to_move_onto_open_floor() {
        let (mut world, map, player) = wall_world();
        perform(&mut world, player, &Action::Bump((0, 1)));
        assert_eq!(world.position(player), Some(Position::new(2, 3, map)));
    }

    #[test]
    fn move_direction_zero_zero_is_wait() {
        let (mut world, _map, player) = wall_world();
        let before = world.position(player).unwrap();
        let result = perform(&mut world, player, &Action::Move((0, 0)));
        assert!(result.is_success());
        assert_eq!(world.position(player), Some(before));
    }
}
