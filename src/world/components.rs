//! Component value types.
//!
//! Several fields that are always read and written together are bundled
//! into one store instead of one `HashMap` per field, the same grouping
//! `CombatStats { hp, max_hp, defense, power }` uses. `Position`,
//! `DelayedAction` and `Ai` stay as their own stores since the world and
//! scheduler address them individually.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::world::Entity;

/// `(x, y, map)`. `map` is the map entity this
/// position is relative to; positions on different maps are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub map: Entity,
}

impl Position {
    pub fn new(x: i32, y: i32, map: Entity) -> Self {
        Position { x, y, map }
    }

    /// `(row, col)` grid-index accessor.
    pub fn ij(&self) -> (i32, i32) {
        (self.y, self.x)
    }

    pub fn point(&self) -> crate::math::Point {
        crate::math::Point::new(self.x, self.y)
    }
}

/// Either a flat bonus or a dice-notation roll, resolved through
/// [`crate::dice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiceOrFlat {
    Dice(String),
    Flat(i32),
}

/// Core combat/ability stats, bundled the way `CombatStats` is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub hp: i32,
    pub max_hp: i32,
    pub str_: i32,
    pub dex: i32,
    pub con: i32,
    pub defense: i32,
    pub attack: DiceOrFlat,
}

/// The scheduler's energy/speed bookkeeping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnergyStats {
    pub energy: i32,
    pub speed: i32,
    pub move_speed: f32,
    pub attack_speed: f32,
}

impl Default for EnergyStats {
    fn default() -> Self {
        EnergyStats {
            energy: 0,
            speed: 10,
            move_speed: 1.0,
            attack_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Progression {
    pub level: u32,
    pub xp: u32,
    pub reward_xp: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Name(pub String);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Graphic {
    pub glyph: char,
    pub fg: (u8, u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageType {
    Physical,
    Poison,
    Fire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResistanceLevel {
    Weak,
    None,
    Moderate,
    High,
    Immune,
    Healed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraitActivation {
    OnCreate,
    OnAttack,
    OnDefend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraitTarget {
    SelfTarget,
    Enemy,
}

/// A racial trait as declared on an Actor template; resolved into a
/// standing effect-spawner entity at spawn time (see
/// `World::spawn_racial_traits`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacialTraitDef {
    pub effect_template: String,
    pub activation: TraitActivation,
    pub target: TraitTarget,
}

/// Component carried by a standing effect-spawner entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnerTraits {
    pub effects_applied: Vec<String>,
    pub activation: TraitActivation,
    pub target: TraitTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Armor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StackInfo {
    pub max_count: u32,
    pub count: u32,
}

/// Consumable behavior on `ApplyItem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApplyActionKind {
    /// Applies the item's own `Effect` template to the user, then consumes one.
    Potion { effect_template: String },
    /// Transitions to `PositionSelect`; the spell fires at the chosen point.
    TargetScroll { spell: String },
    /// Auto-targets the nearest hostile within `max_range`.
    RandomTargetScroll { spell: String, max_range: i32 },
}

/// Per-instance state of an attached effect. `affect` lives on
/// [`crate::effects`], not here, since it needs `&mut World` access the
/// component itself shouldn't own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EffectState {
    Healing { amount: i32 },
    Regeneration { amount: i32 },
    Poisoned { amount: i32, duration: i32 },
}

/// `MapKey` identifies a floor by depth; one generated map per depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapKey(pub u32);

/// Component attached when an action's adjusted cost exceeds current energy.
pub type DelayedAction = Action;
