//! Inventory, equipping, and item/spell application: picking items up,
//! stacking and merging, equip/unequip toggling, and applying potions and
//! targeted/random-target scrolls.

use crate::action::ActionResult;
use crate::combat;
use crate::message::Color;
use crate::world::{ApplyActionKind, Entity, EquipSlot, Position, StackInfo, Tags, World};

/// Lowest free letter `a..=z` not already assigned within `owner`'s
/// backpack. `None` if the backpack is full.
fn lowest_free_key(world: &World, owner: Entity) -> Option<char> {
    let used: Vec<char> = backpack_items(world, owner)
        .into_iter()
        .filter_map(|item| world.assigned_key.get(&item).copied())
        .collect();
    ('a'..='z').find(|k| !used.contains(k))
}

/// Every item `IsIn -> owner`.
pub fn backpack_items(world: &World, owner: Entity) -> Vec<Entity> {
    let mut items: Vec<Entity> = world
        .query_tags(Tags::ITEM, Tags::empty())
        .into_iter()
        .filter(|&e| world.is_in(e) == Some(owner))
        .collect();
    items.sort_by_key(|&e| world.assigned_key.get(&e).copied().unwrap_or('~'));
    items
}

/// `(key, item)` pairs for an `ItemSelect` menu. Equipped items stay in the
/// list — the renderer is expected to mark them, not hide them.
pub fn get_inventory_keys(world: &World, owner: Entity) -> Vec<(char, Entity)> {
    backpack_items(world, owner)
        .into_iter()
        .filter_map(|item| world.assigned_key.get(&item).copied().map(|k| (k, item)))
        .collect()
}

/// Picks `item` off the ground and into `actor`'s backpack. Stackable items
/// with a template match already in the backpack merge up to
/// `StackInfo::max_count`; overflow stays behind on the ground rather than
/// being destroyed.
pub fn add_to_inventory(world: &mut World, actor: Entity, item: Entity) -> ActionResult {
    let name = item_name(world, item);

    if let Some(incoming) = world.stack_info.get(&item).copied() {
        if let Some(existing) = find_mergeable_stack(world, actor, item) {
            let existing_info = world.stack_info[&existing];
            let room = existing_info.max_count.saturating_sub(existing_info.count);
            let merged = room.min(incoming.count);
            if merged > 0 {
                world.stack_info.get_mut(&existing).unwrap().count += merged;
                let remaining = incoming.count - merged;
                if remaining == 0 {
                    world.clear_position(item);
                    world.destroy(item);
                } else {
                    world.stack_info.get_mut(&item).unwrap().count = remaining;
                    return ActionResult::message(
                        format!("You pick up some of the {name}; the rest won't fit."),
                        Color::Impossible,
                    );
                }
                return ActionResult::message(format!("You pick up the {name}."), Color::Impossible);
            }
        }
    }

    world.clear_position(item);
    world.set_is_in(item, Some(actor));
    if let Some(key) = lowest_free_key(world, actor) {
        world.assigned_key.insert(item, key);
    }
    ActionResult::message(format!("You pick up the {name}."), Color::Impossible)
}

/// An existing backpack item sharing `item`'s name (template identity has no
/// stable id post-instantiation, so name equality stands in for it, the way
/// `StackInfo` only ever compares within one item table).
fn find_mergeable_stack(world: &World, owner: Entity, item: Entity) -> Option<Entity> {
    let name = world.names.get(&item).map(|n| n.0.clone())?;
    backpack_items(world, owner)
        .into_iter()
        .find(|&e| e != item && world.stack_info.contains_key(&e) && world.names.get(&e).map(|n| &n.0) == Some(&name))
}

/// Clears `item`'s `EquippedBy` relation, if any, reversing any `HPBonus`
/// it was granting its wearer. Dropping an equipped item unequips it first.
pub fn unequip(world: &mut World, item: Entity) {
    if let Some(wearer) = world.equipped_by(item) {
        if let Some(&bonus) = world.hp_bonus.get(&item) {
            apply_hp_bonus(world, wearer, -bonus);
        }
    }
    world.set_equipped_by(item, None);
}

/// Adjusts `actor`'s effective `MaxHP` by `delta`, the same `MaxHP`+`HP`
/// pairing a `CON` level-up choice uses: equipping grants `delta` to both,
/// unequipping revokes it from `MaxHP` and clamps current `HP` down to the
/// new ceiling.
fn apply_hp_bonus(world: &mut World, actor: Entity, delta: i32) {
    let Some(stats) = world.stats.get_mut(&actor) else {
        return;
    };
    stats.max_hp += delta;
    if delta > 0 {
        stats.hp += delta;
    }
    stats.hp = stats.hp.clamp(0, stats.max_hp);
}

/// `ApplyItem.__call__`: equippables toggle equip state;
/// everything else dispatches through `ApplyActionKind`.
pub fn apply_item(world: &mut World, actor: Entity, item: Entity) -> ActionResult {
    if world.equip_slot.contains_key(&item) {
        return toggle_equip(world, actor, item);
    }

    let Some(kind) = world.apply_action.get(&item).cloned() else {
        let name = item_name(world, item);
        return ActionResult::Impossible(format!("Can not use the {name}."));
    };

    match kind {
        ApplyActionKind::Potion { effect_template } => apply_potion(world, actor, item, &effect_template),
        ApplyActionKind::TargetScroll { spell } => ActionResult::Poll(crate::action::Transition::AwaitPosition {
            item: Some(item),
            spell,
        }),
        ApplyActionKind::RandomTargetScroll { spell, max_range } => {
            apply_random_target_scroll(world, actor, item, &spell, max_range)
        }
    }
}

/// Equipping displaces whatever already occupies the slot: equipping an
/// item already held in another actor's slot unequips the previous holder.
/// Equipping an already-equipped item toggles it off.
fn toggle_equip(world: &mut World, actor: Entity, item: Entity) -> ActionResult {
    let name = item_name(world, item);
    if world.equipped_by(item) == Some(actor) {
        unequip(world, item);
        return ActionResult::message(format!("You unequip the {name}."), Color::Impossible);
    }

    let slot = world.equip_slot[&item];
    let previous = backpack_items(world, actor)
        .into_iter()
        .find(|&e| e != item && world.equipped_by(e) == Some(actor) && world.equip_slot.get(&e) == Some(&slot));
    if let Some(previous) = previous {
        unequip(world, previous);
    }

    world.set_equipped_by(item, Some(actor));
    if let Some(&bonus) = world.hp_bonus.get(&item) {
        apply_hp_bonus(world, actor, bonus);
    }
    ActionResult::message(format!("You equip the {name}."), Color::Impossible)
}

/// Applies the potion's `Effect` template to the drinker and consumes one
/// from the stack.
fn apply_potion(world: &mut World, actor: Entity, item: Entity, effect_template: &str) -> ActionResult {
    let name = item_name(world, item);
    crate::effects::add_effect_to_entity(world, actor, effect_template);
    consume_one(world, item);
    ActionResult::message(format!("You drink the {name}."), Color::HealthRecovered)
}

/// Decrements a stacked item's count, or destroys an unstacked one, once
/// consumed. Reaching a count of 0 destroys the entity.
fn consume_one(world: &mut World, item: Entity) {
    if let Some(info) = world.stack_info.get_mut(&item) {
        if info.count > 1 {
            info.count -= 1;
            return;
        }
    }
    world.clear_position(item);
    world.destroy(item);
}

/// `RandomTargetScroll`: auto-targets the nearest living actor within
/// `max_range` tiles of the caster, excluding the caster.
fn apply_random_target_scroll(world: &mut World, actor: Entity, item: Entity, spell: &str, max_range: i32) -> ActionResult {
    let Some(pos) = world.position(actor) else {
        return ActionResult::Impossible("entity has no position".into());
    };

    let target = world
        .actors_on(pos.map)
        .into_iter()
        .filter(|&e| e != actor && world.has_all(e, Tags::ALIVE))
        .filter_map(|e| world.position(e).map(|p| (e, p)))
        .map(|(e, p)| (e, (p.x - pos.x).abs().max((p.y - pos.y).abs())))
        .filter(|&(_, dist)| dist <= max_range)
        .min_by_key(|&(_, dist)| dist)
        .map(|(e, _)| e);

    let Some(target) = target else {
        return ActionResult::Impossible("No enemy is close enough to target.".into());
    };

    let result = cast_at_entity(world, actor, spell, target);
    if result.is_success() {
        consume_one(world, item);
    }
    result
}

/// Resolves a spell cast that requires a player-chosen map position, the
/// continuation of `ApplyActionKind::TargetScroll` once `PositionSelect`
/// has produced a target tile.
pub fn cast_at_position(world: &mut World, caster: Entity, item: Option<Entity>, spell: &str, target: Position) -> ActionResult {
    let result = match spell {
        "fireball" => cast_fireball(world, caster, target, 12, 3),
        "confusion" => cast_confusion(world, caster, target, 10),
        "lightning_bolt" => cast_lightning_at_position(world, caster, target, 20),
        _ => ActionResult::Impossible(format!("Unknown spell {spell:?}.")),
    };
    if let (ActionResult::Success(_), Some(item)) = (&result, item) {
        consume_one(world, item);
    }
    result
}

/// Entity-targeted spell dispatch, shared by `RandomTargetScroll` and any
/// future direct-target caster.
fn cast_at_entity(world: &mut World, caster: Entity, spell: &str, target: Entity) -> ActionResult {
    match spell {
        "lightning_bolt" => cast_lightning_at_entity(world, caster, target, 20),
        "confusion" => cast_confusion_at_entity(world, caster, target, 10),
        _ => ActionResult::Impossible(format!("{spell:?} has no entity target form.")),
    }
}

fn cast_lightning_at_entity(world: &mut World, caster: Entity, target: Entity, damage: i32) -> ActionResult {
    let name = world.names.get(&target).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
    world.messages.add(
        format!("A lightning bolt strikes the {name} with a loud thunder, for {damage} damage!"),
        Color::PlayerAtk,
    );
    combat::apply_damage(world, target, damage, Some(caster));
    ActionResult::success()
}

/// `LightningBolt.cast_at_position` has no entity at the chosen tile other
/// than whatever is standing there; this resolves the map position to the
/// nearest living actor on it before falling back to the entity form.
fn cast_lightning_at_position(world: &mut World, caster: Entity, target: Position, damage: i32) -> ActionResult {
    let victim = world
        .entities_at(target.map, target.x, target.y)
        .iter()
        .copied()
        .find(|&e| world.has_all(e, Tags::ALIVE));
    match victim {
        Some(victim) => cast_lightning_at_entity(world, caster, victim, damage),
        None => ActionResult::Impossible("You must select an enemy to target.".into()),
    }
}

/// `Fireball.cast_at_position`:
/// damages every living actor on the same map within `radius` tiles of
/// `target`, regardless of visibility — the sphere is resolved against all
/// actors on the map, not just those in the caster's own FOV, matching
/// `SphereAOE.get_affected_area`'s map-wide query.
fn cast_fireball(world: &mut World, caster: Entity, target: Position, damage: i32, radius: i32) -> ActionResult {
    let hits: Vec<Entity> = world
        .actors_on(target.map)
        .into_iter()
        .filter(|&e| world.has_all(e, Tags::ALIVE))
        .filter(|&e| {
            world
                .position(e)
                .map(|p| {
                    let dx = p.x - target.x;
                    let dy = p.y - target.y;
                    dx * dx + dy * dy <= radius * radius
                })
                .unwrap_or(false)
        })
        .collect();

    if hits.is_empty() {
        world.messages.add("The fireball misses!", Color::Impossible);
        return ActionResult::success();
    }

    for victim in hits {
        let name = world.names.get(&victim).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
        world.messages.add(
            format!("The {name} is engulfed in a fiery explosion, taking {damage} damage!"),
            Color::PlayerAtk,
        );
        combat::apply_damage(world, victim, damage, Some(caster));
    }
    ActionResult::success()
}

/// `Confusion.cast_at_position`: finds the
/// nearest living actor with an `Ai` at `target`'s tile, excluding the
/// caster, and swaps its behavior via [`crate::ai::confuse`].
fn cast_confusion(world: &mut World, caster: Entity, target: Position, duration: i32) -> ActionResult {
    let victim = world
        .entities_at(target.map, target.x, target.y)
        .iter()
        .copied()
        .find(|&e| e != caster && world.ai.contains_key(&e));
    match victim {
        Some(victim) => cast_confusion_at_entity(world, caster, victim, duration),
        None => ActionResult::Impossible("You must select an enemy to target.".into()),
    }
}

fn cast_confusion_at_entity(world: &mut World, caster: Entity, target: Entity, duration: i32) -> ActionResult {
    if target == caster {
        return ActionResult::Impossible("You cannot confuse yourself!".into());
    }
    let name = world.names.get(&target).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
    world.messages.add(
        format!("The eyes of the {name} look vacant, as it starts to stumble around!"),
        Color::StatusEffectApplied,
    );
    crate::ai::confuse(world, target, duration);
    ActionResult::success()
}

fn item_name(world: &World, item: Entity) -> String {
    world.names.get(&item).map(|n| n.0.clone()).unwrap_or_else(|| "item".into())
}
