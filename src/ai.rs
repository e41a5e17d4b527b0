//! AI behaviors: `Ai ∈ {Hostile, Confused, Spawner}`, each
//! producing or performing actions on its owner's turn.
//!
//! Per-actor behavior state lives in a component rather than a class
//! hierarchy: `Ai` is stored in `World::ai` and `act` takes it out, mutates
//! it, and puts it back, the same way [`crate::effects::tick_effects`]
//! round-trips `EffectState`.

use crate::action::{self, Action, ActionResult};
use crate::math::Point;
use crate::message::Color;
use crate::pathfind;
use crate::world::{Entity, Tags, World};

const CONFUSED_DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Behavior state carried by a non-player actor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Ai {
    /// Chases and melees the player once seen; remembers the last path so it
    /// keeps closing even after losing line of sight.
    Hostile { path: Vec<Point> },
    /// A temporary takeover: bumps a random
    /// direction each turn, then reverts to `previous` when it expires.
    Confused { turns_remaining: i32, previous: Box<Ai> },
    /// Periodically spawns a templated actor near itself once first seen.
    /// Driven by [`Action::SpawnEntity`], not [`act`] — a spawner entity
    /// has no turn of its own in the scheduler, it is ticked as a side
    /// effect of the owning actor's action.
    Spawner {
        template_name: String,
        spawn_rate: i32,
        initiated: bool,
        visible: bool,
        spawn_timer: i32,
    },
}

/// Which of `MoveSpeed`/`AttackSpeed` (if either) the scheduler should apply
/// to the action an `act()` call just performed. `act` itself
/// decides and performs an AI's action in one step, so it reports back which
/// multiplier applied rather than the scheduler re-deriving it from world
/// deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Move,
    Melee,
    Other,
}

/// Predicts the [`ActionKind`] `act` would report for `actor` without
/// performing anything, so the scheduler can check its energy budget
/// *before* committing to the action. Mirrors [`hostile_act`]'s branching
/// read-only; `Confused`/`Spawner` are always `Other`, matching their
/// `act` arms.
pub fn peek_kind(world: &World, actor: Entity) -> ActionKind {
    match world.ai.get(&actor) {
        Some(Ai::Hostile { path }) => peek_hostile_kind(world, actor, path),
        Some(Ai::Confused { .. }) => ActionKind::Other,
        Some(Ai::Spawner { .. }) => ActionKind::Other,
        None => ActionKind::Other,
    }
}

fn peek_hostile_kind(world: &World, actor: Entity, path: &[Point]) -> ActionKind {
    let Some(target) = world.query_tags(Tags::PLAYER, Tags::empty()).into_iter().next() else {
        return ActionKind::Other;
    };
    let (Some(actor_pos), Some(target_pos)) = (world.position(actor), world.position(target)) else {
        return ActionKind::Other;
    };

    let dx = target_pos.x - actor_pos.x;
    let dy = target_pos.y - actor_pos.y;
    let distance = dx.abs().max(dy.abs());
    let visible = world
        .maps
        .get(&actor_pos.map)
        .map(|m| m.is_visible(actor_pos.x, actor_pos.y))
        .unwrap_or(false);

    if visible {
        if distance <= 1 {
            return ActionKind::Melee;
        }
        let recomputed = pathfind::find_path(world, actor, target_pos.point()).unwrap_or_default();
        return if recomputed.is_empty() { ActionKind::Other } else { ActionKind::Move };
    }

    if !path.is_empty() {
        ActionKind::Move
    } else {
        ActionKind::Other
    }
}

/// Produces and performs `actor`'s action for this turn. No-op if `actor`
/// has no `Ai` (e.g. a player).
pub fn act(world: &mut World, actor: Entity) -> (ActionKind, ActionResult) {
    if matches!(world.ai.get(&actor), Some(Ai::Spawner { .. })) {
        return (ActionKind::Other, tick_spawner(world, actor));
    }

    let Some(ai) = world.ai.remove(&actor) else {
        return (ActionKind::Other, ActionResult::success());
    };

    let (kind, result, next) = match ai {
        Ai::Hostile { path } => hostile_act(world, actor, path),
        Ai::Confused { turns_remaining, previous } => confused_act(world, actor, turns_remaining, previous),
        Ai::Spawner { .. } => unreachable!("handled above before removal"),
    };

    world.ai.insert(actor, next);
    (kind, result)
}

fn hostile_act(world: &mut World, actor: Entity, mut path: Vec<Point>) -> (ActionKind, ActionResult, Ai) {
    let Some(target) = world.query_tags(Tags::PLAYER, Tags::empty()).into_iter().next() else {
        return (ActionKind::Other, ActionResult::success(), Ai::Hostile { path });
    };
    let (Some(actor_pos), Some(target_pos)) = (world.position(actor), world.position(target)) else {
        return (ActionKind::Other, ActionResult::success(), Ai::Hostile { path });
    };

    let dx = target_pos.x - actor_pos.x;
    let dy = target_pos.y - actor_pos.y;
    let distance = dx.abs().max(dy.abs());
    let visible = world
        .maps
        .get(&actor_pos.map)
        .map(|m| m.is_visible(actor_pos.x, actor_pos.y))
        .unwrap_or(false);

    let mut melee_result = None;
    if visible {
        if distance <= 1 {
            melee_result = Some(action::perform(world, actor, &Action::Melee((dx, dy))));
        } else {
            path = pathfind::find_path(world, actor, target_pos.point()).unwrap_or_default();
        }
    }

    let (kind, result) = match melee_result {
        Some(r) => (ActionKind::Melee, r),
        None if !path.is_empty() => (ActionKind::Move, action::follow_path(world, actor, &mut path)),
        None => (ActionKind::Other, action::perform(world, actor, &Action::Wait)),
    };
    (kind, result, Ai::Hostile { path })
}

fn confused_act(world: &mut World, actor: Entity, turns_remaining: i32, previous: Box<Ai>) -> (ActionKind, ActionResult, Ai) {
    if turns_remaining <= 0 {
        let name = world.names.get(&actor).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
        world
            .messages
            .add(format!("The {name} is no longer confused."), Color::Impossible);
        return (ActionKind::Other, ActionResult::success(), *previous);
    }

    let dir = *world
        .rng
        .choose(&CONFUSED_DIRECTIONS)
        .expect("CONFUSED_DIRECTIONS is non-empty");
    let result = action::perform(world, actor, &Action::Bump(dir));
    // Bump resolves to Melee or Move depending on the target tile, but
    // Bump itself is treated as an unadjusted "other" action, so the
    // confused actor's cost is never speed-adjusted even when it happens to
    // attack.
    (ActionKind::Other, result, Ai::Confused { turns_remaining: turns_remaining - 1, previous })
}

/// Puts `confusion` over an actor's current `Ai`, remembering it to revert
/// to later.
pub fn confuse(world: &mut World, actor: Entity, turns: i32) {
    let previous = world.ai.remove(&actor).unwrap_or(Ai::Hostile { path: Vec::new() });
    world.ai.insert(
        actor,
        Ai::Confused {
            turns_remaining: turns,
            previous: Box::new(previous),
        },
    );
}

/// `SpawnerAI.perform_action`: once the spawner has
/// been seen at least once, spawns a templated actor in a random nearby
/// walkable, unblocked tile every `spawn_rate` turns.
pub fn tick_spawner(world: &mut World, spawner: Entity) -> ActionResult {
    let Some(Ai::Spawner { template_name, spawn_rate, mut initiated, mut visible, mut spawn_timer }) =
        world.ai.remove(&spawner)
    else {
        return ActionResult::success();
    };

    let Some(pos) = world.position(spawner) else {
        world.ai.insert(
            spawner,
            Ai::Spawner { template_name, spawn_rate, initiated, visible, spawn_timer },
        );
        return ActionResult::success();
    };

    visible = world
        .maps
        .get(&pos.map)
        .map(|m| m.is_visible(pos.x, pos.y))
        .unwrap_or(false);
    if visible {
        initiated = true;
    }

    if initiated {
        if spawn_timer >= spawn_rate {
            spawn_timer = 0;
            try_spawn_near(world, spawner, &template_name, pos, visible);
        }
        spawn_timer += 1;
    }

    world.ai.insert(
        spawner,
        Ai::Spawner { template_name, spawn_rate, initiated, visible, spawn_timer },
    );
    ActionResult::success()
}

const SPAWN_SEARCH_RADIUS: i32 = 3;
const SPAWN_MAX_TRIES: u32 = 10;

fn try_spawn_near(
    world: &mut World,
    spawner: Entity,
    template_name: &str,
    origin: crate::world::Position,
    visible: bool,
) {
    for _ in 0..SPAWN_MAX_TRIES {
        let x = origin.x + world.rng.gen_range(-SPAWN_SEARCH_RADIUS, SPAWN_SEARCH_RADIUS + 1);
        let y = origin.y + world.rng.gen_range(-SPAWN_SEARCH_RADIUS, SPAWN_SEARCH_RADIUS + 1);

        let walkable = world.maps.get(&origin.map).map(|m| m.is_walkable(x, y)).unwrap_or(false);
        if !walkable || world.blocker_at(origin.map, x, y, spawner).is_some() {
            continue;
        }

        let new_pos = crate::world::Position::new(x, y, origin.map);
        let spawned = crate::content::spawn_template_actor(world, template_name, new_pos);

        if visible {
            let spawner_name = world.names.get(&spawner).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
            let spawned_name = world.names.get(&spawned).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
            world.messages.add(
                format!("The {spawner_name} spawned a new {spawned_name}!"),
                Color::EnemyAtk,
            );
        }
        return;
    }
}
