//! The combat engine: to-hit, crit, damage-type vs
//! resistance, defense mitigation, HP/XP/death.
//!
//! `perform_attack`/`apply_damage`/`die`/`heal`/`poison` keep the
//! natural-1-miss, natural-20-crit, resistance `match`, and `max(1,
//! damage*.25, damage-defense)` mitigation formula rather than introducing a
//! separate accuracy/evasion roll. Racial trait spawner dispatch
//! (`ON_ATTACK`/`ON_DEFEND`) is resolved here at the call sites by querying
//! `Affecting=owner` with a matching `TraitActivation`, rather than inside
//! the spawner entity itself.

use crate::dice;
use crate::effects;
use crate::message::Color;
use crate::world::{
    DamageType, Entity, ResistanceLevel, SpawnerTraits, Tags, TraitActivation, TraitTarget, World,
};

/// `get_attack(attacker)`: attacker's `Attack` dice
/// roll plus the summed `PowerBonus` rolls of every equipped item.
pub fn get_attack(world: &mut World, attacker: Entity) -> i32 {
    let base_dice = world.stats.get(&attacker).map(|s| s.attack.clone());
    let mut total = base_dice
        .map(|d| dice::roll_dice_or_flat(&mut world.rng, &d))
        .unwrap_or(0);

    let equipped: Vec<Entity> = world
        .power_bonus
        .keys()
        .copied()
        .filter(|&item| world.equipped_by(item) == Some(attacker))
        .collect();
    for item in equipped {
        if let Some(bonus) = world.power_bonus.get(&item).cloned() {
            total += dice::roll_dice_or_flat(&mut world.rng, &bonus);
        }
    }
    total
}

/// `get_defense(defender)`: base `Defense` plus the
/// summed `DefenseBonus` of every equipped item.
pub fn get_defense(world: &World, defender: Entity) -> i32 {
    let base = world.stats.get(&defender).map(|s| s.defense).unwrap_or(0);
    world
        .defense_bonus
        .iter()
        .filter(|(&item, _)| world.equipped_by(item) == Some(defender))
        .map(|(_, &bonus)| bonus)
        .sum::<i32>()
        + base
}

fn resistance_level(world: &World, defender: Entity, damage_type: DamageType) -> ResistanceLevel {
    world
        .resistances
        .get(&defender)
        .and_then(|list| list.iter().find(|(t, _)| *t == damage_type))
        .map(|(_, level)| *level)
        .unwrap_or(ResistanceLevel::None)
}

/// `melee_damage(attacker, defender)`: rolls to-hit and
/// physical damage, then dispatches racial-trait spawners.
pub fn melee_damage(world: &mut World, attacker: Entity, defender: Entity) {
    let attack = get_attack(world, attacker);
    perform_attack(world, attacker, defender, DamageType::Physical, attack);

    fire_trait_spawners(world, attacker, defender, TraitActivation::OnAttack);
    fire_trait_spawners(world, defender, attacker, TraitActivation::OnDefend);
}

/// `perform_attack`: the shared to-hit/resistance/
/// mitigation pipeline used by melee and (via a flat `attack` amount) by
/// spell damage.
pub fn perform_attack(world: &mut World, attacker: Entity, defender: Entity, damage_type: DamageType, attack: i32) {
    let attacker_name = world.names.get(&attacker).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
    let defender_name = world.names.get(&defender).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
    let atk_color = if world.has_all(attacker, Tags::PLAYER) {
        Color::PlayerAtk
    } else {
        Color::EnemyAtk
    };
    let desc = format!("{attacker_name} attacks {defender_name}");

    let to_hit = dice::roll(&mut world.rng, 1, 20);
    if to_hit == 1 {
        world.messages.add(format!("{desc} but missed."), atk_color);
        return;
    }
    let is_crit = to_hit == 20;

    let mut damage = if is_crit { attack * 2 } else { attack };

    match resistance_level(world, defender, damage_type) {
        ResistanceLevel::Weak => damage = (damage as f32 * 1.5) as i32,
        ResistanceLevel::None => {}
        ResistanceLevel::Moderate => damage = (damage as f32 * 0.66) as i32,
        ResistanceLevel::High => damage = (damage as f32 * 0.33) as i32,
        ResistanceLevel::Immune => {
            world.messages.add(format!("{desc} but it is immune to this damage!"), atk_color);
            return;
        }
        ResistanceLevel::Healed => {
            let healed = heal(world, defender, (damage as f32 * 0.33) as i32);
            world
                .messages
                .add(format!("{desc} but it healed for {healed} hp!"), atk_color);
            return;
        }
    }

    let defense = get_defense(world, defender);
    let damage = i32::max(1, i32::max((damage as f32 * 0.25) as i32, damage - defense));

    if is_crit {
        world
            .messages
            .add(format!("{desc} and crits for {damage} hit points!"), atk_color);
    } else {
        world.messages.add(format!("{desc} for {damage} hit points."), atk_color);
    }

    apply_damage(world, defender, damage, Some(attacker));
}

/// `apply_damage(entity, damage, blame)`.
pub fn apply_damage(world: &mut World, entity: Entity, damage: i32, blame: Option<Entity>) {
    if let Some(stats) = world.stats.get_mut(&entity) {
        stats.hp -= damage;
        if stats.hp <= 0 {
            die(world, entity, blame);
        }
    }
}

/// `die(entity, blame)`: remains glyph, XP award, and
/// the loot-roll hook on HP reaching zero.
fn die(world: &mut World, entity: Entity, blame: Option<Entity>) {
    let is_player = world.has_all(entity, Tags::PLAYER);
    let name = world.names.get(&entity).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());

    if is_player {
        world.messages.add("You died!", Color::PlayerDie);
    } else {
        world.messages.add(format!("{name} is dead!"), Color::EnemyDie);
    }

    if let Some(blame) = blame {
        let reward = world.progression.get(&entity).map(|p| p.reward_xp).unwrap_or(0);
        if let Some(progression) = world.progression.get_mut(&blame) {
            progression.xp += reward;
        }
        let blame_name = world.names.get(&blame).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
        world
            .messages
            .add(format!("{blame_name} gains {reward} experience points."), Color::PlayerAtk);
    }

    if let Some(graphic) = world.graphics.get_mut(&entity) {
        graphic.glyph = '%';
        graphic.fg = (191, 0, 0);
    }
    world.names.insert(entity, crate::world::Name(format!("remains of {name}")));
    world.ai.remove(&entity);
    world.remove_tags(entity, Tags::BLOCKING | Tags::ALIVE);

    roll_loot_drop(world, entity);
}

/// Component-change hook on HP reaching zero: with
/// probability `LootDropChance`, spawn a weighted item template on the death
/// tile. Wired directly from [`die`] rather than a registered closure, since
/// it is the only consumer.
fn roll_loot_drop(world: &mut World, entity: Entity) {
    let Some(chance) = world.loot_drop_chance.get(&entity).copied() else {
        return;
    };
    if !world.rng.gen_bool(chance as f64) {
        return;
    }
    let Some(pos) = world.position(entity) else {
        return;
    };
    let floor = world.maps.get(&pos.map).map(|m| m.floor).unwrap_or(0);
    crate::content::spawn_weighted_item(world, floor, pos);
}

/// `heal(entity, amount)`: clamps to `MaxHP`, returns
/// the actual amount restored.
pub fn heal(world: &mut World, entity: Entity, amount: i32) -> i32 {
    let Some(stats) = world.stats.get_mut(&entity) else {
        return 0;
    };
    let new_hp = i32::min(stats.hp + amount, stats.max_hp);
    let delta = new_hp - stats.hp;
    stats.hp = new_hp;
    delta
}

/// `poison(entity, amount)`: clamps to 0, returns
/// the actual amount applied.
pub fn poison(world: &mut World, entity: Entity, amount: i32) -> i32 {
    let Some(stats) = world.stats.get_mut(&entity) else {
        return 0;
    };
    let new_hp = i32::max(stats.hp - amount, 0);
    let delta = stats.hp - new_hp;
    stats.hp = new_hp;
    delta
}

/// Dispatches every standing effect-spawner `Affecting=owner` whose
/// `TraitActivation` matches, spawning effects on the spawner's
/// `TraitTarget`.
fn fire_trait_spawners(world: &mut World, owner: Entity, enemy: Entity, activation: TraitActivation) {
    let spawners: Vec<(Entity, SpawnerTraits)> = world
        .affecting_targets(owner)
        .into_iter()
        .filter(|&e| world.has_all(e, Tags::EFFECT_SPAWNER))
        .filter_map(|e| world.spawner_traits.get(&e).cloned().map(|t| (e, t)))
        .filter(|(_, t)| t.activation == activation)
        .collect();

    for (_, traits) in spawners {
        let target = match traits.target {
            TraitTarget::SelfTarget => owner,
            TraitTarget::Enemy => enemy,
        };
        for template_name in &traits.effects_applied {
            effects::add_effect_to_entity(world, target, template_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{DiceOrFlat, Progression, Stats};

    fn make_combatant(world: &mut World, hp: i32, attack: i32, defense: i32, reward_xp: u32) -> Entity {
        let e = world.create();
        world.add_tags(e, Tags::ACTOR | Tags::ALIVE | Tags::BLOCKING);
        world.stats.insert(
            e,
            Stats {
                hp,
                max_hp: hp,
                str_: 1,
                dex: 1,
                con: 1,
                defense,
                attack: DiceOrFlat::Flat(attack),
            },
        );
        world.progression.insert(
            e,
            Progression {
                level: 1,
                xp: 0,
                reward_xp,
            },
        );
        world.names.insert(e, crate::world::Name("combatant".into()));
        e
    }

    #[test]
    fn heal_clamps_to_max_hp() {
        let mut world = World::new(1);
        let e = make_combatant(&mut world, 5, 0, 0, 0);
        world.stats.get_mut(&e).unwrap().max_hp = 20;
        let healed = heal(&mut world, e, 100);
        assert_eq!(healed, 15);
        assert_eq!(world.stats[&e].hp, 20);
    }

    #[test]
    fn poison_clamps_to_zero() {
        let mut world = World::new(1);
        let e = make_combatant(&mut world, 5, 0, 0, 0);
        let applied = poison(&mut world, e, 100);
        assert_eq!(applied, 5);
        assert_eq!(world.stats[&e].hp, 0);
    }

    #[test]
    fn lethal_damage_kills_and_awards_xp() {
        let mut world = World::new(7);
        let attacker = make_combatant(&mut world, 20, 10, 0, 0);
        let victim = make_combatant(&mut world, 1, 0, 0, 5);
        apply_damage(&mut world, victim, 5, Some(attacker));
        assert!(!world.has_all(victim, Tags::ALIVE));
        assert!(!world.has_all(victim, Tags::BLOCKING));
        assert_eq!(world.progression[&attacker].xp, 5);
    }

    #[test]
    fn defense_mitigation_has_a_25_percent_floor() {
        let mut world = World::new(3);
        let attacker = make_combatant(&mut world, 20, 100, 0, 0);
        let victim = make_combatant(&mut world, 100, 0, 1000, 0);
        // Huge defense would fully negate damage without the 25% floor.
        let before = world.stats[&victim].hp;
        perform_attack(&mut world, attacker, victim, DamageType::Physical, 100);
        let after = world.stats[&victim].hp;
        assert!(after <= before);
    }
}
