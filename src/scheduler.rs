//! The energy/speed turn scheduler: the player is single-stepped per
//! re-entry (so the caller can re-prompt for input between every action),
//! while each AI actor loops until its banked energy runs out within one
//! tick — a deliberate asymmetry: a 2x move-speed enemy visibly covers two
//! tiles per player step.
//!
//! The adjustment formula rounds rather than truncates: `round(cost /
//! MoveSpeed)`, not `int(cost / speed)` (see DESIGN.md).

use tracing::{debug, trace};

use crate::action::{self, Action, ActionResult, Transition, DEFAULT_ACTION_COST};
use crate::ai;
use crate::effects;
use crate::fov;
use crate::message::Color;
use crate::world::{EnergyStats, Entity, Tags, World};

/// What the caller should do after one [`advance`] call: the scheduler
/// hands control back to the state machine, which decides what happens
/// next.
pub enum TurnOutcome {
    /// No action was supplied and the player had no `DelayedAction`; nothing
    /// advanced. The caller should keep waiting for input.
    AwaitingInput,
    /// The action was impossible; its reason is already in the message log.
    /// The player's turn is refunded — call `advance` again with a new action.
    Impossible,
    /// The action polled the state machine; the world
    /// did not advance past it.
    Poll(Transition),
    /// The player still has energy left after acting; call `advance` again
    /// (with a fresh action) before enemies move.
    ContinuePlayerTurn,
    /// A full round ran to completion: the player's segment ended, every AI
    /// on the player's map acted until exhausted, and FOV was refreshed.
    RoundComplete { can_level_up: bool },
}

fn energy_stats(world: &World, entity: Entity) -> EnergyStats {
    world.energy.get(&entity).copied().unwrap_or_default()
}

fn add_energy(world: &mut World, entity: Entity, delta: i32) {
    world.energy.entry(entity).or_default().energy += delta;
}

/// `round(cost / multiplier)`, the scheduler's adjustment formula.
fn speed_adjust(cost: i32, multiplier: f32) -> i32 {
    if multiplier <= 0.0 {
        return cost;
    }
    (cost as f32 / multiplier).round() as i32
}

/// Only `Move`/`Melee` are adjusted, by `MoveSpeed`/`AttackSpeed`
/// respectively; everything else (including `Bump`, which only resolves to
/// one of those at perform-time) uses the flat base cost.
fn adjusted_cost_for_action(world: &World, entity: Entity, action: &Action) -> i32 {
    let stats = energy_stats(world, entity);
    let base = action.base_cost();
    match action {
        Action::Move(_) => speed_adjust(base, stats.move_speed),
        Action::Melee(_) => speed_adjust(base, stats.attack_speed),
        _ => base,
    }
}

/// The AI-loop counterpart: [`ai::act`] decides and performs in one step, so
/// it reports back which multiplier (if either) applied instead of exposing
/// the `Action` it chose.
fn adjusted_cost_for_ai_kind(world: &World, entity: Entity, kind: ai::ActionKind) -> i32 {
    let stats = energy_stats(world, entity);
    match kind {
        ai::ActionKind::Move => speed_adjust(DEFAULT_ACTION_COST, stats.move_speed),
        ai::ActionKind::Melee => speed_adjust(DEFAULT_ACTION_COST, stats.attack_speed),
        ai::ActionKind::Other => DEFAULT_ACTION_COST,
    }
}

/// Drives one player turn segment. `action` is `None` when the caller has
/// no new input yet; a `DelayedAction` left over from a previous
/// under-energy call always takes priority over it.
pub fn advance(world: &mut World, player: Entity, action: Option<Action>) -> TurnOutcome {
    let action = match world.delayed_action.remove(&player) {
        Some(delayed) => delayed,
        None => match action {
            Some(a) => a,
            None => return TurnOutcome::AwaitingInput,
        },
    };

    if !world.has_all(player, Tags::ALIVE) {
        return TurnOutcome::AwaitingInput;
    }

    do_player_action(world, player, action)
}

fn do_player_action(world: &mut World, player: Entity, action: Action) -> TurnOutcome {
    let available_energy = energy_stats(world, player).energy;
    let adjusted_cost = adjusted_cost_for_action(world, player, &action);
    let mut performed_action = false;

    if available_energy >= adjusted_cost {
        let result = action::perform(world, player, &action);
        fov::update_fov(world, player, false);

        match result {
            ActionResult::Success(message) => {
                if let Some((text, color)) = message {
                    world.messages.add(text, color);
                }
                performed_action = true;
            }
            ActionResult::Poll(transition) => return TurnOutcome::Poll(transition),
            ActionResult::Impossible(reason) => {
                world.messages.add(reason, Color::Impossible);
                world.delayed_action.remove(&player);
                return TurnOutcome::Impossible;
            }
        }

        add_energy(world, player, -adjusted_cost);
    }

    if performed_action {
        world.delayed_action.remove(&player);
        if energy_stats(world, player).energy > 0 {
            trace!(entity = ?player, "player has energy left, continuing turn");
            return TurnOutcome::ContinuePlayerTurn;
        }
    } else {
        world.delayed_action.insert(player, action);
    }

    let speed = energy_stats(world, player).speed;
    add_energy(world, player, speed);

    if performed_action {
        effects::tick_effects(world, player);
    }

    handle_enemy_turns(world, player);
    fov::update_fov(world, player, false);

    TurnOutcome::RoundComplete {
        can_level_up: crate::state::can_level_up(world, player),
    }
}

/// Advances every AI-driven actor sharing the player's map, in stable
/// query iteration order. Actors on a different map than the player are
/// frozen.
fn handle_enemy_turns(world: &mut World, player: Entity) {
    let Some(map) = world.position(player).map(|p| p.map) else {
        return;
    };

    let actors: Vec<Entity> = world
        .actors_on(map)
        .into_iter()
        .filter(|&e| e != player && world.ai.contains_key(&e) && world.has_all(e, Tags::ALIVE))
        .collect();

    for actor in actors {
        process_enemy_turn(world, actor);
    }
}

fn process_enemy_turn(world: &mut World, actor: Entity) {
    let mut performed_action = false;

    loop {
        let available_energy = energy_stats(world, actor).energy;
        // Peek at the kind without performing, by asking `act` to decide and
        // perform in the same step; the cost check happens against the
        // energy available *before* that call, matching
        // `process_enemy_turn`'s `while available_energy >= adjusted_cost`
        // loop, which re-derives `adjusted_cost` from the same `action`
        // that is about to run.
        let kind_guess = ai::peek_kind(world, actor);
        let adjusted_cost = adjusted_cost_for_ai_kind(world, actor, kind_guess);
        if available_energy < adjusted_cost {
            break;
        }

        let (kind, _result) = ai::act(world, actor);
        debug_assert_eq!(
            kind, kind_guess,
            "ai::act's reported kind must match peek_kind's prediction for cost accounting to be correct"
        );
        let adjusted_cost = adjusted_cost_for_ai_kind(world, actor, kind);
        add_energy(world, actor, -adjusted_cost);
        performed_action = true;
    }

    let speed = energy_stats(world, actor).speed;
    add_energy(world, actor, speed);

    if performed_action {
        effects::tick_effects(world, actor);
    }
    debug!(entity = ?actor, "enemy turn processed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{tileset, MapData};
    use crate::world::{DiceOrFlat, Position, Progression, Stats};

    fn small_world() -> (World, Entity) {
        let mut world = World::new(1);
        let map_entity = world.create();
        let mut map = MapData::blank(9, 9, 1);
        for y in 0..9 {
            for x in 0..9 {
                map.set_tile(x, y, tileset::FLOOR);
            }
        }
        world.maps.insert(map_entity, map);
        (world, map_entity)
    }

    fn make_player(world: &mut World, map: Entity, x: i32, y: i32) -> Entity {
        let e = world.create();
        world.add_tags(e, Tags::ACTOR | Tags::ALIVE | Tags::BLOCKING | Tags::PLAYER);
        world.set_position(e, Position::new(x, y, map));
        world.stats.insert(
            e,
            Stats { hp: 20, max_hp: 20, str_: 5, dex: 5, con: 5, defense: 0, attack: DiceOrFlat::Flat(5) },
        );
        world.progression.insert(e, Progression { level: 1, xp: 0, reward_xp: 0 });
        world.energy.insert(e, EnergyStats { energy: 100, speed: 10, move_speed: 1.0, attack_speed: 1.0 });
        world.names.insert(e, crate::world::Name("player".into()));
        e
    }

    #[test]
    fn bump_into_wall_refunds_and_never_drains_energy_below_zero() {
        let (mut world, map) = small_world();
        if let Some(m) = world.maps.get_mut(&map) {
            m.set_tile(3, 2, tileset::WALL);
        }
        let player = make_player(&mut world, map, 2, 2);

        for _ in 0..10 {
            let outcome = advance(&mut world, player, Some(Action::Bump((1, 0))));
            assert!(matches!(outcome, TurnOutcome::Impossible));
            assert!(energy_stats(&world, player).energy >= 0);
        }
        assert_eq!(world.position(player), Some(Position::new(2, 2, map)));
        assert_eq!(world.stats[&player].hp, 20);
    }

    #[test]
    fn successful_move_debits_energy_and_completes_the_round_when_exhausted() {
        let (mut world, map) = small_world();
        let player = make_player(&mut world, map, 2, 2);
        world.energy.get_mut(&player).unwrap().energy = 100;

        let outcome = advance(&mut world, player, Some(Action::Move((1, 0))));
        assert!(matches!(outcome, TurnOutcome::RoundComplete { .. }));
        assert_eq!(world.position(player), Some(Position::new(3, 2, map)));
        // 100 - 100 = 0, then +10 speed: the move executed and energy is
        // exhausted, so the round completes instead of continuing the
        // player's turn.
        assert_eq!(energy_stats(&world, player).energy, 10);
    }

    #[test]
    fn insufficient_energy_delays_the_action_instead_of_performing_it() {
        let (mut world, map) = small_world();
        let player = make_player(&mut world, map, 2, 2);
        world.energy.get_mut(&player).unwrap().energy = 50;

        let outcome = advance(&mut world, player, Some(Action::Move((1, 0))));
        assert!(matches!(outcome, TurnOutcome::RoundComplete { .. }));
        assert_eq!(world.position(player), Some(Position::new(2, 2, map)), "move must not have executed yet");
        assert!(world.delayed_action.contains_key(&player));
        assert_eq!(energy_stats(&world, player).energy, 60);
    }

    #[test]
    fn delayed_action_resumes_once_enough_energy_accumulates() {
        let (mut world, map) = small_world();
        let player = make_player(&mut world, map, 2, 2);
        world.energy.get_mut(&player).unwrap().energy = 50;

        advance(&mut world, player, Some(Action::Move((1, 0))));
        assert!(world.delayed_action.contains_key(&player));

        advance(&mut world, player, None);
        assert_eq!(world.position(player), Some(Position::new(3, 2, map)));
        assert!(!world.delayed_action.contains_key(&player));
    }

    #[test]
    fn no_action_and_no_delayed_action_awaits_input() {
        let (mut world, map) = small_world();
        let player = make_player(&mut world, map, 2, 2);
        let outcome = advance(&mut world, player, None);
        assert!(matches!(outcome, TurnOutcome::AwaitingInput));
    }

    #[test]
    fn double_move_speed_covers_two_tiles_per_tick() {
        let (mut world, map) = small_world();
        let fast = world.create();
        world.add_tags(fast, Tags::ACTOR | Tags::ALIVE | Tags::BLOCKING);
        world.set_position(fast, Position::new(0, 0, map));
        world.energy.insert(fast, EnergyStats { energy: 200, speed: 0, move_speed: 2.0, attack_speed: 1.0 });

        let cost = adjusted_cost_for_action(&world, fast, &Action::Move((1, 0)));
        assert_eq!(cost, 50);
        // Two moves fit in the same energy budget that one move at 1.0
        // MoveSpeed would consume.
        assert!(200 / cost >= 2 * (200 / DEFAULT_ACTION_COST));
    }
}
