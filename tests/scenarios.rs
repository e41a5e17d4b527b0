//! End-to-end scenarios against the public library API, plus
//! the two "laws" proptest is suited for (energy conservation, FOV
//! symmetry). Grounded on the same construction style the unit tests inside
//! each module already use (`World::create` + manual component inserts)
//! rather than going through the renderer/input layer, which this crate
//! never depends on.

use deepdelve::action::{Action, ActionResult, StairDirection};
use deepdelve::ai::Ai;
use deepdelve::content;
use deepdelve::effects;
use deepdelve::inventory;
use deepdelve::map::{tileset, MapData};
use deepdelve::math::Point;
use deepdelve::scheduler::{self, TurnOutcome};
use deepdelve::world::{
    ApplyActionKind, DiceOrFlat, EffectState, EnergyStats, Entity, MapKey, Name,
    Position, Progression, RacialTraitDef, Stats, Tags, TraitActivation,
    TraitTarget, World,
};
use proptest::prelude::*;

fn open_floor(width: u32, height: u32) -> (World, Entity) {
    let mut world = World::new(1);
    let map_entity = world.create();
    let mut map = MapData::blank(width, height, 1);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
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
    world.names.insert(e, Name("player".into()));
    e
}

fn make_rat(world: &mut World, map: Entity, x: i32, y: i32) -> Entity {
    let e = world.create();
    world.add_tags(e, Tags::ACTOR | Tags::ALIVE | Tags::BLOCKING);
    world.set_position(e, Position::new(x, y, map));
    world.stats.insert(
        e,
        Stats { hp: 4, max_hp: 4, str_: 1, dex: 1, con: 1, defense: 0, attack: DiceOrFlat::Flat(1) },
    );
    world.progression.insert(e, Progression { level: 1, xp: 0, reward_xp: 5 });
    world.energy.insert(e, EnergyStats::default());
    world.names.insert(e, Name("rat".into()));
    e
}

/// Scenario 1: ten ticks of `Bump` into a wall leave HP and
/// position untouched, and energy never goes negative even though it
/// oscillates as each impossible bump gets refunded.
#[test]
fn scenario_1_bumping_a_wall_never_drains_or_harms() {
    let (mut world, map) = open_floor(5, 5);
    if let Some(m) = world.maps.get_mut(&map) {
        m.set_tile(3, 2, tileset::WALL);
    }
    let player = make_player(&mut world, map, 2, 2);

    for _ in 0..10 {
        let outcome = scheduler::advance(&mut world, player, Some(Action::Bump((1, 0))));
        assert!(matches!(outcome, TurnOutcome::Impossible));
        assert!(world.energy[&player].energy >= 0);
    }

    assert_eq!(world.position(player), Some(Position::new(2, 2, map)));
    assert_eq!(world.stats[&player].hp, 20);
}

/// Scenario 2: bumping into a living rat dispatches to melee.
/// The to-hit roll is seed-dependent, so this drives a small range of seeds
/// until a non-miss lands, then checks the hit/death/XP contract.
#[test]
fn scenario_2_melee_bump_awards_xp_on_a_kill() {
    for seed in 0u64..64 {
        let (mut world, map) = open_floor(5, 5);
        world.rng = deepdelve::rng::Rng::seeded(seed);
        let player = make_player(&mut world, map, 2, 2);
        let rat = make_rat(&mut world, map, 3, 2);

        let before_log_len = world.messages.lines().len();
        scheduler::advance(&mut world, player, Some(Action::Bump((1, 0))));

        let logged = world.messages.lines()[before_log_len..]
            .iter()
            .any(|m| m.text.contains("player attacks rat"));
        if !logged {
            continue;
        }
        if world.messages.lines().iter().any(|m| m.text.contains("but missed")) {
            continue;
        }

        // A landed hit: rat's HP dropped, or it died and the player got XP.
        if world.is_alive(rat) {
            assert!(world.stats[&rat].hp < 4);
        } else {
            assert!(!world.has_all(rat, Tags::ALIVE));
            assert_eq!(world.progression[&player].xp, 5);
            assert_eq!(world.names[&rat].0, "remains of rat");
        }
        return;
    }
    panic!("no seed in the probed range produced a non-miss hit; widen the range");
}

/// Scenario 3: drinking a health potion at 5/20 HP heals to 9
/// (lesser_healing = +4) and consumes the potion.
#[test]
fn scenario_3_health_potion_heals_and_is_consumed() {
    let (mut world, map) = open_floor(3, 3);
    let player = make_player(&mut world, map, 1, 1);
    world.stats.get_mut(&player).unwrap().hp = 5;

    let potion = world.create();
    world.add_tags(potion, Tags::ITEM | Tags::PICKABLE);
    world.names.insert(potion, Name("Health Potion".into()));
    world
        .apply_action
        .insert(potion, ApplyActionKind::Potion { effect_template: "lesser_healing".into() });
    world.set_is_in(potion, Some(player));
    world.assigned_key.insert(potion, 'a');

    let result = inventory::apply_item(&mut world, player, potion);
    assert!(result.is_success());
    assert_eq!(world.stats[&player].hp, 9);
    assert!(!world.is_alive(potion));
}

/// Scenario 4: a troll's `lesser_regeneration` racial trait
/// heals it 1 HP per tick with no attacker involved.
#[test]
fn scenario_4_troll_regenerates_without_taking_damage() {
    let mut world = World::new(1);
    let troll = world.create();
    world.add_tags(troll, Tags::ACTOR | Tags::ALIVE);
    world.stats.insert(
        troll,
        Stats { hp: 8, max_hp: 16, str_: 1, dex: 1, con: 1, defense: 1, attack: DiceOrFlat::Flat(5) },
    );
    world.progression.insert(troll, Progression { level: 1, xp: 0, reward_xp: 100 });
    world.names.insert(troll, Name("troll".into()));
    effects::spawn_racial_traits(
        &mut world,
        troll,
        &[RacialTraitDef {
            effect_template: "lesser_regeneration".into(),
            activation: TraitActivation::OnCreate,
            target: TraitTarget::SelfTarget,
        }],
    );

    for _ in 0..4 {
        effects::tick_effects(&mut world, troll);
    }
    assert_eq!(world.stats[&troll].hp, 12);
}

/// Scenario 5: the shipped `acid_slime` template's standing `ON_ATTACK`
/// poison spawner applies `Poisoned(amount=1, duration=4)` to whatever it
/// hits, which then drains 1 HP per end-of-turn tick for four ticks and is
/// removed on the fifth.
#[test]
fn scenario_5_poison_bite_applies_then_expires() {
    let (mut world, map) = open_floor(3, 3);
    content::init_content(&mut world);
    let slime = content::spawn_template_actor(&mut world, "acid_slime", Position::new(1, 1, map));
    let victim = make_player(&mut world, map, 1, 2);

    deepdelve::combat::melee_damage(&mut world, slime, victim);
    // The trait spawner only fires on a landed hit; skip the rare natural-1 miss.
    if !world.effect_state.values().any(|s| matches!(s, EffectState::Poisoned { .. })) {
        return;
    }

    let starting_hp = world.stats[&victim].hp;
    for _ in 0..4 {
        effects::tick_effects(&mut world, victim);
    }
    assert_eq!(world.stats[&victim].hp, starting_hp - 4);
    assert!(!world.effect_state.values().any(|s| matches!(s, EffectState::Poisoned { .. })));
}

/// Scenario 6: taking the down-stairs clears FOV, generates (or
/// loads) floor 2, and relocates the player to its up-stair.
#[test]
fn scenario_6_take_stairs_moves_the_player_to_the_next_floor() {
    let mut world = World::new(7);
    content::init_content(&mut world);
    let floor1 = content::ensure_floor(&mut world, MapKey(1));

    let down_pos = world
        .query_tags(Tags::DOWN_STAIRS, Tags::empty())
        .into_iter()
        .find_map(|e| world.position(e).filter(|p| p.map == floor1))
        .expect("a freshly generated floor has a down-stairs tile");

    let player = content::spawn_template_actor(&mut world, "player", down_pos);
    world.add_tags(player, Tags::PLAYER);

    let result = deepdelve::action::perform(&mut world, player, &Action::TakeStairs(StairDirection::Down));
    match result {
        ActionResult::Success(Some((text, _))) => assert!(text.contains("descend")),
        other => panic!("expected a descend message, got a different ActionResult ({other:?})"),
    }

    let new_pos = world.position(player).expect("player still has a position after descending");
    assert_ne!(new_pos.map, floor1);
    assert!(world.has_all(
        world
            .entities_at(new_pos.map, new_pos.x, new_pos.y)
            .iter()
            .copied()
            .find(|&e| world.has_all(e, Tags::UP_STAIRS))
            .expect("player lands on floor 2's up-stair"),
        Tags::UP_STAIRS
    ));
}

/// Scenario 7: a fireball centered on a tile with three
/// hostiles inside its radius damages all three and kills the one it drops
/// to 0 HP, awarding XP to the caster.
#[test]
fn scenario_7_fireball_hits_every_hostile_in_radius() {
    let (mut world, map) = open_floor(9, 9);
    let caster = make_player(&mut world, map, 0, 0);
    let center = Position::new(4, 4, map);

    let victims: Vec<Entity> = [(4, 4), (5, 4), (3, 5)]
        .iter()
        .map(|&(x, y)| make_rat(&mut world, map, x, y))
        .collect();
    // One victim is fragile enough to die from the blast and award XP.
    world.stats.get_mut(&victims[0]).unwrap().hp = 4;

    let result = inventory::cast_at_position(&mut world, caster, None, "fireball", center);
    assert!(result.is_success());

    for &victim in &victims {
        if world.is_alive(victim) {
            assert!(world.stats[&victim].hp < 4, "every hostile in radius must take damage");
        }
    }
    assert!(!world.is_alive(victims[0]));
    assert_eq!(world.progression[&caster].xp, 5);
}

/// Scenario 8: a confusion scroll makes an orc bump random
/// directions for exactly ten of its own turns, then reverts and logs it.
#[test]
fn scenario_8_confusion_expires_after_ten_turns() {
    let (mut world, map) = open_floor(9, 9);
    let player = make_player(&mut world, map, 0, 0);
    world.add_tags(player, Tags::PLAYER);
    let orc = world.create();
    world.add_tags(orc, Tags::ACTOR | Tags::ALIVE | Tags::BLOCKING);
    world.set_position(orc, Position::new(5, 5, map));
    world.stats.insert(
        orc,
        Stats { hp: 10, max_hp: 10, str_: 1, dex: 1, con: 1, defense: 0, attack: DiceOrFlat::Flat(3) },
    );
    world.progression.insert(orc, Progression { level: 1, xp: 0, reward_xp: 35 });
    world.energy.insert(orc, EnergyStats::default());
    world.names.insert(orc, Name("orc".into()));
    world.ai.insert(orc, Ai::Hostile { path: Vec::new() });

    let result = inventory::cast_at_position(&mut world, player, None, "confusion", Position::new(5, 5, map));
    assert!(result.is_success());
    assert!(matches!(world.ai.get(&orc), Some(Ai::Confused { turns_remaining: 10, .. })));

    for expected_remaining in (0..10).rev() {
        deepdelve::ai::act(&mut world, orc);
        assert!(matches!(
            world.ai.get(&orc),
            Some(Ai::Confused { turns_remaining, .. }) if *turns_remaining == expected_remaining
        ));
    }

    let before_revert = world.messages.lines().len();
    deepdelve::ai::act(&mut world, orc);
    assert!(matches!(world.ai.get(&orc), Some(Ai::Hostile { .. })));
    assert!(world.messages.lines()[before_revert..]
        .iter()
        .any(|m| m.text.contains("no longer confused")));
}

/// Energy conservation law: over any window of ticks,
/// `ΔEnergy = n·Speed − Σ adjusted_cost(actions_performed)`. `Wait` always
/// succeeds, so its adjusted cost (the flat base cost, unadjusted since it
/// is neither `Move` nor `Melee`) is paid on exactly the ticks where enough
/// energy was banked; this checks that recurrence holds tick by tick, which
/// is the law integrated over a window of one.
#[test]
fn law_energy_conservation_across_many_ticks() {
    const DEFAULT_ACTION_COST: i32 = 100;

    for &(start_energy, speed) in &[(0, 10), (50, 37), (250, 5), (99, 1), (500, 123)] {
        let (mut world, map) = open_floor(3, 3);
        let player = make_player(&mut world, map, 1, 1);
        world.energy.get_mut(&player).unwrap().energy = start_energy;
        world.energy.get_mut(&player).unwrap().speed = speed;

        for _ in 0..25 {
            let before = world.energy[&player].energy;
            scheduler::advance(&mut world, player, Some(Action::Wait));
            let after = world.energy[&player].energy;

            let cost_paid = if before >= DEFAULT_ACTION_COST { DEFAULT_ACTION_COST } else { 0 };
            assert_eq!(after, before + speed - cost_paid, "1 tick of Wait must conserve energy exactly");
            assert!(after >= 0, "speed is always positive here so energy should never go negative");
        }
    }
}

/// FOV symmetry law: if A sees B's tile, B sees A's tile, on
/// a grid with a handful of interior walls (not just the fully open room
/// `fov.rs`'s own unit test already covers).
#[test]
fn law_fov_symmetry_with_interior_walls() {
    let mut map = MapData::blank(15, 15, 1);
    for y in 0..15 {
        for x in 0..15 {
            map.set_tile(x, y, tileset::FLOOR);
        }
    }
    // A few scattered interior walls, not enclosing either probe point.
    for &(x, y) in &[(6, 3), (6, 4), (6, 5), (9, 9), (3, 10), (10, 2)] {
        map.set_tile(x, y, tileset::WALL);
    }

    let probes = [
        (Point::new(1, 1), Point::new(13, 13)),
        (Point::new(2, 8), Point::new(11, 4)),
        (Point::new(7, 1), Point::new(7, 13)),
        (Point::new(0, 0), Point::new(14, 0)),
    ];
    for (a, b) in probes {
        let from_a = deepdelve::fov::compute_visible(&map, a, 10);
        let from_b = deepdelve::fov::compute_visible(&map, b, 10);
        assert_eq!(
            from_a.contains(&b),
            from_b.contains(&a),
            "FOV must be symmetric between {a:?} and {b:?}"
        );
    }
}

/// Determinism law: seeding the RNG and replaying the same
/// input sequence yields byte-identical world state. `World` doesn't derive
/// `PartialEq` (most of its stores are plain `HashMap`s), so this compares
/// the same `bincode` encoding [`deepdelve::save`] persists.
#[test]
fn law_determinism_replaying_the_same_seed_and_inputs() {
    fn build_and_play(seed: u64) -> (World, Entity) {
        let mut world = World::new(seed);
        content::init_content(&mut world);
        let map = content::ensure_floor(&mut world, MapKey(1));
        let start = world
            .query_tags(Tags::UP_STAIRS, Tags::empty())
            .into_iter()
            .find_map(|e| world.position(e).filter(|p| p.map == map))
            .unwrap();
        let player = content::spawn_template_actor(&mut world, "player", start);
        world.add_tags(player, Tags::PLAYER);

        let actions = [
            Action::Bump((1, 0)),
            Action::Bump((0, 1)),
            Action::Wait,
            Action::Bump((-1, 0)),
            Action::Bump((0, -1)),
        ];
        for action in actions {
            scheduler::advance(&mut world, player, Some(action));
        }
        (world, player)
    }

    let (world_a, player_a) = build_and_play(2024);
    let (world_b, player_b) = build_and_play(2024);

    assert_eq!(player_a, player_b);
    let bytes_a = bincode::serialize(&(world_a, player_a)).unwrap();
    let bytes_b = bincode::serialize(&(world_b, player_b)).unwrap();
    assert_eq!(bytes_a, bytes_b);
}

proptest! {
    /// Energy conservation law, generalized over the fixed
    /// cases in [`law_energy_conservation_across_many_ticks`]: for any
    /// starting energy and speed, a single tick of `Wait` either pays the
    /// flat cost (when enough energy was banked) or pays nothing, and never
    /// drives energy negative.
    #[test]
    fn prop_energy_conservation_holds_for_any_speed(
        start_energy in 0i32..2000,
        speed in 1i32..300,
    ) {
        const DEFAULT_ACTION_COST: i32 = 100;

        let (mut world, map) = open_floor(3, 3);
        let player = make_player(&mut world, map, 1, 1);
        world.energy.get_mut(&player).unwrap().energy = start_energy;
        world.energy.get_mut(&player).unwrap().speed = speed;

        let before = world.energy[&player].energy;
        scheduler::advance(&mut world, player, Some(Action::Wait));
        let after = world.energy[&player].energy;

        let cost_paid = if before >= DEFAULT_ACTION_COST { DEFAULT_ACTION_COST } else { 0 };
        prop_assert_eq!(after, before + speed - cost_paid);
        prop_assert!(after >= 0);
    }

    /// FOV symmetry law, generalized over the fixed probe
    /// points in [`law_fov_symmetry_with_interior_walls`]: on a fixed
    /// scattered-wall grid, any two in-bounds points see each other
    /// symmetrically regardless of which one is chosen as the origin.
    #[test]
    fn prop_fov_is_symmetric_for_any_probe_pair(
        ax in 0i32..15, ay in 0i32..15,
        bx in 0i32..15, by in 0i32..15,
    ) {
        let mut map = MapData::blank(15, 15, 1);
        for y in 0..15 {
            for x in 0..15 {
                map.set_tile(x, y, tileset::FLOOR);
            }
        }
        for &(x, y) in &[(6, 3), (6, 4), (6, 5), (9, 9), (3, 10), (10, 2)] {
            map.set_tile(x, y, tileset::WALL);
        }

        let a = Point::new(ax, ay);
        let b = Point::new(bx, by);
        let from_a = deepdelve::fov::compute_visible(&map, a, 10);
        let from_b = deepdelve::fov::compute_visible(&map, b, 10);
        prop_assert_eq!(from_a.contains(&b), from_b.contains(&a));
    }
}
