//! The effect engine: timed/permanent effects attached via
//! the `Affecting` relation, ticked once per actor turn.
//!
//! `Regeneration` is `Healing` that always returns "not consumed" —
//! reproduced here as its own variant sharing `Healing`'s body rather than
//! a subclass, since Rust enums don't inherit. `add_effect_to_entity`/
//! `spawn_racial_traits` mirror a spawn-then-apply racial-trait loop: an
//! `ON_CREATE` trait gets resolved once, at instantiation.

use crate::combat;
use crate::message::Color;
use crate::world::{
    Entity, EffectState, RacialTraitDef, SpawnerTraits, Tags, TraitActivation, World,
};

/// `affect(entity) -> consumed`: applies one tick of the
/// effect to `entity`, returning whether the effect instance is spent.
pub fn affect(world: &mut World, entity: Entity, state: &mut EffectState) -> bool {
    match state {
        EffectState::Healing { amount } => {
            apply_heal_message(world, entity, *amount);
            true
        }
        EffectState::Regeneration { amount } => {
            apply_heal_message(world, entity, *amount);
            false
        }
        EffectState::Poisoned { amount, duration } => {
            if *duration > 0 {
                let applied = combat::poison(world, entity, *amount);
                if applied > 0 {
                    let name = world.names.get(&entity).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
                    world
                        .messages
                        .add(format!("{name} took {applied} poison damage."), Color::StatusEffectApplied);
                }
                *duration -= 1;
            }
            *duration <= 0
        }
    }
}

fn apply_heal_message(world: &mut World, entity: Entity, amount: i32) {
    let healed = combat::heal(world, entity, amount);
    if healed > 0 {
        let name = world.names.get(&entity).map(|n| n.0.clone()).unwrap_or_else(|| "?".into());
        world
            .messages
            .add(format!("{name} recovers {healed} HP."), Color::HealthRecovered);
    }
}

/// `add_effect_to_entity(target, template)`: deep-copies the
/// named template's `Effect` state onto a fresh entity, `Affecting ->
/// target`.
pub fn add_effect_to_entity(world: &mut World, target: Entity, template_name: &str) {
    let Some(state) = crate::content::effect_template(template_name) else {
        panic!("invariant violated: no effect template named {template_name:?}");
    };
    let effect = world.create();
    world.add_tags(effect, Tags::EFFECT);
    world.effect_state.insert(effect, state);
    world.set_affecting(effect, Some(target));
}

/// At end of an actor's turn, enumerates every `{IsEffect, Affecting=entity}`
/// instance and calls `affect`; consumed effects are detached and destroyed.
pub fn tick_effects(world: &mut World, entity: Entity) {
    let effect_entities: Vec<Entity> = world
        .affecting_targets(entity)
        .into_iter()
        .filter(|&e| world.has_all(e, Tags::EFFECT))
        .collect();

    for effect_entity in effect_entities {
        let Some(mut state) = world.effect_state.remove(&effect_entity) else {
            continue;
        };
        let consumed = affect(world, entity, &mut state);
        if consumed {
            world.destroy(effect_entity);
        } else {
            world.effect_state.insert(effect_entity, state);
        }
    }
}

/// Resolves an actor's `RacialTraits` at spawn time: `ON_CREATE` traits add
/// the effect to the actor directly; other activations leave a dormant
/// spawner entity for the combat engine to fire later.
pub fn spawn_racial_traits(world: &mut World, actor: Entity, traits: &[RacialTraitDef]) {
    for trait_def in traits {
        if trait_def.activation == TraitActivation::OnCreate {
            add_effect_to_entity(world, actor, &trait_def.effect_template);
            continue;
        }

        let spawner = world.create();
        world.add_tags(spawner, Tags::EFFECT_SPAWNER);
        world.spawner_traits.insert(
            spawner,
            SpawnerTraits {
                effects_applied: vec![trait_def.effect_template.clone()],
                activation: trait_def.activation,
                target: trait_def.target,
            },
        );
        world.set_affecting(spawner, Some(actor));
    }
}
