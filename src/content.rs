//! Template registry and floor population: creature/effect/equipment
//! definitions, and per-room spawning (monster/item caps, skip the first
//! room, reject duplicate spawn points).

use crate::ai::Ai;
use crate::effects;
use crate::map::generator::{self, GeneratorParams};
use crate::math::Rect;
use crate::world::{
    DamageType, DiceOrFlat, EffectState, EnergyStats, EquipSlot, Entity, Graphic, MapKey, Name,
    Position, Progression, RacialTraitDef, ResistanceLevel, Stats, Tags, TraitActivation,
    TraitTarget, World,
};

/// Named effect templates. These are data, not entities: every consumer
/// (potions, scrolls, racial traits) wants a fresh [`EffectState`] value,
/// not a shared instance.
pub fn effect_template(name: &str) -> Option<EffectState> {
    Some(match name {
        "lesser_healing" => EffectState::Healing { amount: 4 },
        "healing" => EffectState::Healing { amount: 10 },
        "greater_healing" => EffectState::Healing { amount: 20 },
        "lesser_regeneration" => EffectState::Regeneration { amount: 1 },
        "lesser_poison" => EffectState::Poisoned { amount: 1, duration: 4 },
        "poison" => EffectState::Poisoned { amount: 2, duration: 5 },
        "greater_poison" => EffectState::Poisoned { amount: 3, duration: 6 },
        _ => return None,
    })
}

struct CreatureDef {
    name: &'static str,
    glyph: char,
    fg: (u8, u8, u8),
    hp: i32,
    attack: i32,
    defense: i32,
    xp: u32,
    hostile: bool,
    spawn_weight: &'static [(u32, u32)],
    racial_traits: &'static [(&'static str, TraitActivation, TraitTarget)],
}

/// Creature definitions. The player carries no `AI` (it is driven by
/// input, not [`crate::ai::act`]) and no `SpawnWeight` (it is never
/// procedurally placed).
const CREATURES: &[CreatureDef] = &[
    CreatureDef {
        name: "player",
        glyph: '@',
        fg: (255, 255, 255),
        hp: 30,
        attack: 5,
        defense: 1,
        xp: 0,
        hostile: false,
        spawn_weight: &[],
        racial_traits: &[],
    },
    CreatureDef {
        name: "orc",
        glyph: 'o',
        fg: (63, 127, 63),
        hp: 10,
        attack: 3,
        defense: 0,
        xp: 35,
        hostile: true,
        spawn_weight: &[(1, 80)],
        racial_traits: &[],
    },
    CreatureDef {
        name: "troll",
        glyph: 'T',
        fg: (0, 127, 0),
        hp: 16,
        attack: 5,
        defense: 1,
        xp: 100,
        hostile: true,
        spawn_weight: &[(3, 15), (5, 30), (7, 60)],
        // The troll's Healing(1) passive is
        // modeled as an always-on `lesser_regeneration` applied at spawn
        // time rather than every-turn self-healing.
        racial_traits: &[("lesser_regeneration", TraitActivation::OnCreate, TraitTarget::SelfTarget)],
    },
    CreatureDef {
        name: "acid_slime",
        glyph: 'j',
        fg: (0, 191, 0),
        hp: 6,
        attack: 2,
        defense: 0,
        xp: 20,
        hostile: true,
        spawn_weight: &[(2, 40), (5, 20)],
        // Its bite carries a standing `OnAttack` spawner: every landed hit
        // poisons the target, the same shape the troll's regeneration uses
        // but fired on the enemy at the moment of attack rather than once
        // at spawn time on self.
        racial_traits: &[("lesser_poison", TraitActivation::OnAttack, TraitTarget::Enemy)],
    },
];

enum ItemKind {
    Potion { effect_template: &'static str },
    TargetScroll { spell: &'static str },
    RandomTargetScroll { spell: &'static str, max_range: i32 },
    Equippable {
        slot: EquipSlot,
        power_bonus: Option<&'static str>,
        defense_bonus: Option<i32>,
        hp_bonus: Option<i32>,
    },
}

struct ItemDef {
    name: &'static str,
    display: &'static str,
    glyph: char,
    fg: (u8, u8, u8),
    kind: ItemKind,
    spawn_weight: &'static [(u32, u32)],
}

/// Consumables, ported from `world_init.py`'s `init_items`.
const CONSUMABLES: &[ItemDef] = &[
    ItemDef {
        name: "health_potion",
        display: "Health Potion",
        glyph: '!',
        fg: (127, 0, 255),
        kind: ItemKind::Potion { effect_template: "lesser_healing" },
        spawn_weight: &[(1, 35)],
    },
    ItemDef {
        name: "confusion_scroll",
        display: "Confusion Scroll",
        glyph: '~',
        fg: (207, 63, 255),
        kind: ItemKind::TargetScroll { spell: "confusion" },
        spawn_weight: &[(2, 25)],
    },
    ItemDef {
        name: "lightning_scroll",
        display: "Lightning Scroll",
        glyph: '~',
        fg: (255, 255, 0),
        kind: ItemKind::RandomTargetScroll { spell: "lightning_bolt", max_range: 5 },
        spawn_weight: &[(3, 25)],
    },
    ItemDef {
        name: "fireball_scroll",
        display: "Fireball Scroll",
        glyph: '~',
        fg: (255, 0, 0),
        kind: ItemKind::TargetScroll { spell: "fireball" },
        spawn_weight: &[(6, 25)],
    },
];

/// Equippables: weapons and armor, each contributing either a power bonus
/// or a defense bonus when worn.
const EQUIPMENT: &[ItemDef] = &[
    ItemDef {
        name: "dagger",
        display: "Dagger",
        glyph: '/',
        fg: (0, 191, 255),
        kind: ItemKind::Equippable { slot: EquipSlot::Weapon, power_bonus: Some("1d4"), defense_bonus: None, hp_bonus: None },
        spawn_weight: &[(1, 5)],
    },
    ItemDef {
        name: "sword",
        display: "Sword",
        glyph: '/',
        fg: (0, 191, 255),
        kind: ItemKind::Equippable { slot: EquipSlot::Weapon, power_bonus: Some("1d6"), defense_bonus: None, hp_bonus: Some(20) },
        spawn_weight: &[(4, 5)],
    },
    ItemDef {
        name: "long_sword",
        display: "Long Sword",
        glyph: '/',
        fg: (0, 191, 255),
        kind: ItemKind::Equippable { slot: EquipSlot::Weapon, power_bonus: Some("1d8"), defense_bonus: None, hp_bonus: None },
        spawn_weight: &[(6, 5)],
    },
    ItemDef {
        name: "great_sword",
        display: "Great Sword",
        glyph: '/',
        fg: (0, 191, 255),
        kind: ItemKind::Equippable { slot: EquipSlot::Weapon, power_bonus: Some("2d6"), defense_bonus: None, hp_bonus: None },
        spawn_weight: &[(8, 5)],
    },
    ItemDef {
        name: "leather_armor",
        display: "Leather Armor",
        glyph: '[',
        fg: (139, 69, 19),
        kind: ItemKind::Equippable { slot: EquipSlot::Armor, power_bonus: None, defense_bonus: Some(1), hp_bonus: None },
        spawn_weight: &[(1, 5)],
    },
    ItemDef {
        name: "padded_armor",
        display: "Padded Armor",
        glyph: '[',
        fg: (139, 69, 19),
        kind: ItemKind::Equippable { slot: EquipSlot::Armor, power_bonus: None, defense_bonus: Some(2), hp_bonus: None },
        spawn_weight: &[(3, 5)],
    },
    ItemDef {
        name: "chain_mail",
        display: "Chain Mail",
        glyph: '[',
        fg: (139, 69, 19),
        kind: ItemKind::Equippable { slot: EquipSlot::Armor, power_bonus: None, defense_bonus: Some(3), hp_bonus: None },
        spawn_weight: &[(5, 5)],
    },
    ItemDef {
        name: "plate_armor",
        display: "Plate Armor",
        glyph: '[',
        fg: (139, 69, 19),
        kind: ItemKind::Equippable { slot: EquipSlot::Armor, power_bonus: None, defense_bonus: Some(5), hp_bonus: None },
        spawn_weight: &[(7, 5)],
    },
];

/// Builds every template entity and registers it by name in
/// [`World::templates`]. Idempotent only in the
/// sense that it is meant to run once per fresh world (see
/// [`crate::save`]/[`crate::app`]).
pub fn init_content(world: &mut World) {
    for def in CREATURES {
        let template = build_creature_template(world, def);
        world.templates.insert(def.name.to_string(), template);
    }
    for def in CONSUMABLES.iter().chain(EQUIPMENT.iter()) {
        let template = build_item_template(world, def);
        world.templates.insert(def.name.to_string(), template);
    }

    // Trolls shrug off poison rather than merely resisting it, so a late
    // graze doesn't also cost them the regeneration tick.
    if let Some(&troll) = world.templates.get("troll") {
        world
            .resistances
            .insert(troll, vec![(DamageType::Poison, ResistanceLevel::High)]);
    }
}

fn build_creature_template(world: &mut World, def: &CreatureDef) -> Entity {
    let e = world.create();
    world.add_tags(e, Tags::TEMPLATE | Tags::ACTOR);
    world.names.insert(e, Name(def.name.replace('_', " ")));
    world.graphics.insert(e, Graphic { glyph: def.glyph, fg: def.fg });
    world.stats.insert(
        e,
        Stats {
            hp: def.hp,
            max_hp: def.hp,
            str_: 1,
            dex: 1,
            con: 1,
            defense: def.defense,
            attack: DiceOrFlat::Flat(def.attack),
        },
    );
    world.energy.insert(e, EnergyStats::default());
    world.progression.insert(e, Progression { level: 1, xp: 0, reward_xp: def.xp });

    if def.hostile {
        world.ai.insert(e, Ai::Hostile { path: Vec::new() });
    }
    if !def.spawn_weight.is_empty() {
        world.spawn_weight.insert(e, def.spawn_weight.to_vec());
    }
    if !def.racial_traits.is_empty() {
        world.racial_traits.insert(
            e,
            def.racial_traits
                .iter()
                .map(|&(effect_template, activation, target)| RacialTraitDef {
                    effect_template: effect_template.to_string(),
                    activation,
                    target,
                })
                .collect(),
        );
    }
    e
}

fn build_item_template(world: &mut World, def: &ItemDef) -> Entity {
    let e = world.create();
    world.add_tags(e, Tags::TEMPLATE | Tags::ITEM);
    world.names.insert(e, Name(def.display.to_string()));
    world.graphics.insert(e, Graphic { glyph: def.glyph, fg: def.fg });
    if !def.spawn_weight.is_empty() {
        world.spawn_weight.insert(e, def.spawn_weight.to_vec());
    }

    match def.kind {
        ItemKind::Potion { effect_template } => {
            world.apply_action.insert(
                e,
                crate::world::ApplyActionKind::Potion { effect_template: effect_template.to_string() },
            );
        }
        ItemKind::TargetScroll { spell } => {
            world
                .apply_action
                .insert(e, crate::world::ApplyActionKind::TargetScroll { spell: spell.to_string() });
        }
        ItemKind::RandomTargetScroll { spell, max_range } => {
            world.apply_action.insert(
                e,
                crate::world::ApplyActionKind::RandomTargetScroll { spell: spell.to_string(), max_range },
            );
        }
        ItemKind::Equippable { slot, power_bonus, defense_bonus, hp_bonus } => {
            world.equip_slot.insert(e, slot);
            if let Some(dice) = power_bonus {
                world.power_bonus.insert(e, DiceOrFlat::Dice(dice.to_string()));
            }
            if let Some(bonus) = defense_bonus {
                world.defense_bonus.insert(e, bonus);
            }
            if let Some(bonus) = hp_bonus {
                world.hp_bonus.insert(e, bonus);
            }
        }
    }
    e
}

fn resolve_spawn_weight(table: &[(u32, u32)], floor: u32) -> u32 {
    let mut weight = 0;
    for &(at_floor, w) in table {
        if at_floor > floor {
            break;
        }
        weight = w;
        if w == 0 {
            break;
        }
    }
    weight
}

fn weighted_template(world: &mut World, floor: u32, tag: Tags) -> Option<Entity> {
    let candidates: Vec<(u32, Entity)> = world
        .templates
        .values()
        .copied()
        .filter(|&e| world.has_all(e, tag))
        .filter_map(|e| world.spawn_weight.get(&e).map(|table| (resolve_spawn_weight(table, floor), e)))
        .filter(|&(w, _)| w > 0)
        .collect();
    world.rng.choose_weighted(&candidates).copied()
}

/// `spawn_actor`: instantiates `template`, marks
/// it alive and blocking, places it, and resolves its `RacialTraits` into
/// standing effect spawners.
fn instantiate_actor(world: &mut World, template: Entity, pos: Position) -> Entity {
    let actor = world.instantiate(template);
    world.add_tags(actor, Tags::ALIVE | Tags::BLOCKING);
    world.set_position(actor, pos);

    let traits = world.racial_traits.get(&actor).cloned().unwrap_or_default();
    if !traits.is_empty() {
        effects::spawn_racial_traits(world, actor, &traits);
    }
    actor
}

/// Looks up a creature template by name and instantiates it at `pos`.
/// Panics if `template_name` is unknown: a spawner referencing a
/// nonexistent template is a content bug, not a recoverable runtime
/// condition.
pub fn spawn_template_actor(world: &mut World, template_name: &str, pos: Position) -> Entity {
    let Some(&template) = world.templates.get(template_name) else {
        panic!("invariant violated: no actor template named {template_name:?}");
    };
    instantiate_actor(world, template, pos)
}

/// Picks and instantiates a random item template weighted by `floor`,
/// placing it on the ground at `pos`. A no-op if nothing is eligible to
/// spawn at this depth.
pub fn spawn_weighted_item(world: &mut World, floor: u32, pos: Position) {
    let Some(template) = weighted_template(world, floor, Tags::ITEM) else {
        return;
    };
    let item = world.instantiate(template);
    world.add_tags(item, Tags::PICKABLE);
    world.set_position(item, pos);
}

/// The player's two starting equippables: a dagger
/// and leather armor, both instantiated and equipped, not found on the
/// ground.
pub fn starting_equipment(world: &mut World) -> Vec<Entity> {
    ["dagger", "leather_armor"]
        .iter()
        .filter_map(|&name| world.templates.get(name).copied())
        .map(|template| world.instantiate(template))
        .collect()
}

/// Generates (or returns the already-generated) floor at `key`. Freshly
/// generated floors are populated with stairs to their neighbors and
/// weighted monster/item tables.
pub fn ensure_floor(world: &mut World, key: MapKey) -> Entity {
    if let Some(map_entity) = world.maps.iter().find(|(_, m)| m.floor == key.0).map(|(&e, _)| e) {
        return map_entity;
    }

    let params = GeneratorParams {
        width: world.config.map_width,
        height: world.config.map_height,
        max_rooms: world.config.max_rooms,
        min_room_size: world.config.min_room_size,
        max_room_size: world.config.max_room_size,
    };
    let floor = generator::rooms_and_corridors(key.0, &mut world.rng, &params);

    let map_entity = world.create();
    world.map_key.insert(map_entity, key);
    let rooms = floor.rooms.clone();
    let up_point = floor.up_stairs;
    let down_point = floor.down_stairs;
    world.maps.insert(map_entity, floor.map);

    let up_stairs = world.create();
    world.add_tags(up_stairs, Tags::UP_STAIRS);
    world.set_position(up_stairs, Position::new(up_point.x(), up_point.y(), map_entity));
    if key.0 > 1 {
        world.map_key.insert(up_stairs, MapKey(key.0 - 1));
    }

    let down_stairs = world.create();
    world.add_tags(down_stairs, Tags::DOWN_STAIRS);
    world.set_position(down_stairs, Position::new(down_point.x(), down_point.y(), map_entity));
    world.map_key.insert(down_stairs, MapKey(key.0 + 1));

    populate_floor(world, map_entity, key.0, &rooms);
    map_entity
}

/// Spawns random monsters and items in every room but the first — the
/// first room is reserved for the arriving actor, the same convention
/// used for the player's start.
fn populate_floor(world: &mut World, map_entity: Entity, floor: u32, rooms: &[Rect]) {
    for room in rooms.iter().skip(1) {
        populate_room(world, map_entity, floor, room);
    }
}

fn populate_room(world: &mut World, map_entity: Entity, floor: u32, room: &Rect) {
    let n_monsters = world.rng.gen_range(0, world.config.max_monsters_per_room + 1);
    let n_items = world.rng.gen_range(0, world.config.max_items_per_room + 1);

    let mut points: Vec<(i32, i32)> = Vec::with_capacity((n_monsters + n_items) as usize);
    for _ in 0..(n_monsters + n_items) {
        for _ in 0..10 {
            let x = world.rng.gen_range(room.left() + 1, room.right());
            let y = world.rng.gen_range(room.bottom() + 1, room.top());
            if !points.contains(&(x, y)) {
                points.push((x, y));
                break;
            }
        }
    }

    let (monster_points, item_points) = points.split_at(points.len().min(n_monsters as usize));
    for &(x, y) in monster_points {
        if let Some(template) = weighted_template(world, floor, Tags::ACTOR) {
            instantiate_actor(world, template, Position::new(x, y, map_entity));
        }
    }
    for &(x, y) in item_points {
        spawn_weighted_item(world, floor, Position::new(x, y, map_entity));
    }
}
