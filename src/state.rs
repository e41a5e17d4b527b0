//! The state machine: `InGame / MainMenu / ItemSelect /
//! PositionSelect / LevelUp / CharacterScreen / MessageHistory`, built as a
//! tagged-variant `GameState` plus a dispatching `update` free function —
//! the same pattern already used for [`crate::action::Action`] and
//! [`crate::ai::Ai`] rather than trait objects.
//!
//! [`PlayerCommand`] stands in for raw key predicates: input translation is
//! an external collaborator's job, and this crate only consumes its
//! already-decoded intent.

use serde::{Deserialize, Serialize};

use crate::action::{Action, StairDirection, Transition};
use crate::content;
use crate::message::Color;
use crate::scheduler::{self, TurnOutcome};
use crate::world::{Entity, Position, Progression, Tags, World};

/// Decoded player intent, one level up from raw keys. Produced by an
/// external input-translation layer; the state machine never reads a
/// keycode directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    /// A directional key; `InGame` turns this into `Action::Bump`, while
    /// `PositionSelect` turns it into a cursor nudge.
    Direction(i32, i32),
    Pickup,
    UseMenu,
    DropMenu,
    TakeStairsDown,
    TakeStairsUp,
    OpenCharacterScreen,
    OpenMessageHistory,
    Look,
    Escape,
    Confirm,
    Cancel,
    /// A letter key, used to pick an `ItemSelect` row or a `LevelUp` choice.
    Select(char),
    CursorUp,
    CursorDown,
    NewGame,
    ResumeGame,
    Quit,
}

/// Which verb an `ItemSelect` menu was opened for (`states.py`'s
/// `ItemSelect.player_verb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemVerb {
    Use,
    Drop,
}

/// What a confirmed `PositionSelect` cursor does (`states.py`'s
/// `PositionSelect.init_look` vs. the `Poll(Transition::AwaitPosition)`
/// continuation wired in by `ApplyItem`/`ApplyActionKind::TargetScroll`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PositionPurpose {
    Look,
    Cast { item: Option<Entity>, spell: String },
}

/// The state machine's current state. Carries exactly the
/// data each `states.py` class stores on itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameState {
    MainMenu,
    InGame,
    CharacterScreen { entity: Entity },
    MessageHistory { log_length: usize, cursor: usize },
    ItemSelect { verb: ItemVerb, items: Vec<(char, Entity)>, title: String },
    PositionSelect { cursor: Position, purpose: PositionPurpose },
    LevelUp { cursor: u8 },
}

impl Default for GameState {
    fn default() -> GameState {
        GameState::MainMenu
    }
}

/// `required_xp_for_level`: `100 + (Level-1)*150`.
pub fn required_xp_for_level(level: u32) -> u32 {
    100 + (level.saturating_sub(1)) * 150
}

/// `can_level_up`: `XP >= required_xp_for_level(Level)`.
/// Called directly by [`crate::scheduler::advance`] at the end of every
/// completed round.
pub fn can_level_up(world: &World, player: Entity) -> bool {
    world
        .progression
        .get(&player)
        .map(|p| p.xp >= required_xp_for_level(p.level))
        .unwrap_or(false)
}

/// Debits the required XP and increments Level.
fn apply_level_up(world: &mut World, player: Entity) {
    let Some(progression) = world.progression.get_mut(&player) else {
        return;
    };
    let cost = required_xp_for_level(progression.level);
    debug_assert!(progression.xp >= cost, "invariant violated: level_up called without enough XP");
    progression.xp -= cost;
    progression.level += 1;
    let level = progression.level;
    world.messages.add(format!("You advance to level {level}!"), Color::WelcomeText);
}

/// Creates a fresh game world: content tables, floor 1, the player instanced
/// on its up-stairs tile and equipped with starting gear.
pub fn new_game(seed: u64, config: crate::config::Config) -> (World, Entity) {
    let mut world = World::new(seed);
    world.config = config;
    content::init_content(&mut world);

    let map_entity = content::ensure_floor(&mut world, crate::world::MapKey(1));
    let start_pos = world
        .query_tags(Tags::UP_STAIRS, Tags::empty())
        .into_iter()
        .find_map(|e| world.position(e).filter(|p| p.map == map_entity))
        .expect("invariant violated: a freshly generated floor has an up-stairs tile");

    let player = content::spawn_template_actor(&mut world, "player", start_pos);
    world.add_tags(player, Tags::PLAYER);

    for (i, item) in content::starting_equipment(&mut world).into_iter().enumerate() {
        world.set_is_in(item, Some(player));
        world.assigned_key.insert(item, (b'a' + i as u8) as char);
        world.set_equipped_by(item, Some(player));
    }

    crate::fov::update_fov(&mut world, player, false);
    world.messages.add(
        "Hello and welcome, adventurer, to yet another dungeon!",
        Color::WelcomeText,
    );

    (world, player)
}

/// Runs one `action` through the scheduler and resolves its [`TurnOutcome`]
/// into the next [`GameState`]. Shared by
/// `InGame`'s direct key handling, `ItemSelect`'s pick callback, and
/// `PositionSelect`'s confirm callback (`states.py`'s
/// `do_player_action(player, action(item))` call sites).
fn apply_player_action(world: &mut World, player: Entity, action: Action) -> GameState {
    match scheduler::advance(world, player, Some(action)) {
        TurnOutcome::Poll(Transition::AwaitPosition { item, spell }) => {
            let cursor = world.position(player).unwrap_or(Position::new(0, 0, player_map_or_dummy(world, player)));
            GameState::PositionSelect { cursor, purpose: PositionPurpose::Cast { item, spell } }
        }
        TurnOutcome::RoundComplete { can_level_up } if can_level_up => GameState::LevelUp { cursor: 0 },
        _ => GameState::InGame,
    }
}

fn player_map_or_dummy(world: &World, player: Entity) -> Entity {
    world.position(player).map(|p| p.map).unwrap_or(player)
}

/// `Direction` predicate -> `Action::Bump`, the rest of
/// `process_player_turn`'s key scan.
fn command_to_player_action(cmd: PlayerCommand) -> Option<Action> {
    match cmd {
        PlayerCommand::Direction(dx, dy) => Some(Action::Bump((dx, dy))),
        PlayerCommand::Pickup => Some(Action::PickupItem),
        PlayerCommand::TakeStairsDown => Some(Action::TakeStairs(StairDirection::Down)),
        PlayerCommand::TakeStairsUp => Some(Action::TakeStairs(StairDirection::Up)),
        _ => None,
    }
}

/// Advances the state machine by one `cmd`. `seed` is only
/// consulted by `MainMenu`'s "new game" transition.
pub fn update(state: GameState, world: &mut World, player: &mut Entity, seed: u64, cmd: Option<PlayerCommand>) -> GameState {
    match state {
        GameState::MainMenu => update_main_menu(world, player, seed, cmd),
        GameState::InGame => update_in_game(world, *player, cmd),
        GameState::CharacterScreen { entity } => update_character_screen(entity, cmd),
        GameState::MessageHistory { log_length, cursor } => update_message_history(world, log_length, cursor, cmd),
        GameState::ItemSelect { verb, items, title } => update_item_select(world, *player, verb, items, title, cmd),
        GameState::PositionSelect { cursor, purpose } => update_position_select(world, *player, cursor, purpose, cmd),
        GameState::LevelUp { cursor } => update_level_up(world, *player, cursor, cmd),
    }
}

fn update_main_menu(world: &mut World, player: &mut Entity, seed: u64, cmd: Option<PlayerCommand>) -> GameState {
    match cmd {
        Some(PlayerCommand::NewGame) => {
            let (new_world, new_player) = new_game(seed, world.config.clone());
            *world = new_world;
            *player = new_player;
            GameState::InGame
        }
        Some(PlayerCommand::ResumeGame) => GameState::InGame,
        _ => GameState::MainMenu,
    }
}

/// Death (`HP <= 0`) keeps `InGame` but swallows all action input; any
/// other invalid state transition is likewise swallowed rather than
/// panicking.
fn update_in_game(world: &mut World, player: Entity, cmd: Option<PlayerCommand>) -> GameState {
    match cmd {
        Some(PlayerCommand::Escape) => return GameState::MainMenu,
        Some(PlayerCommand::OpenCharacterScreen) => return GameState::CharacterScreen { entity: player },
        Some(PlayerCommand::OpenMessageHistory) => {
            let log_length = world.messages.lines().len();
            return GameState::MessageHistory {
                log_length,
                cursor: log_length.saturating_sub(1),
            };
        }
        Some(PlayerCommand::UseMenu) => {
            let items = crate::inventory::get_inventory_keys(world, player);
            return GameState::ItemSelect { verb: ItemVerb::Use, items, title: "Select an item to use".into() };
        }
        Some(PlayerCommand::DropMenu) => {
            let items = crate::inventory::get_inventory_keys(world, player);
            return GameState::ItemSelect { verb: ItemVerb::Drop, items, title: "Select an item to drop".into() };
        }
        Some(PlayerCommand::Look) => {
            let cursor = world.position(player).unwrap_or(Position::new(0, 0, player_map_or_dummy(world, player)));
            return GameState::PositionSelect { cursor, purpose: PositionPurpose::Look };
        }
        _ => {}
    }

    if world.stats.get(&player).map(|s| s.hp <= 0).unwrap_or(true) {
        return GameState::InGame;
    }

    let Some(action) = cmd.and_then(command_to_player_action) else {
        // No actionable key this tick: still advance in case a `DelayedAction`
        // has accumulated enough energy to resume (`states.py`'s
        // `process_player_turn` path with no new key pressed).
        return match scheduler::advance(world, player, None) {
            TurnOutcome::RoundComplete { can_level_up } if can_level_up => GameState::LevelUp { cursor: 0 },
            _ => GameState::InGame,
        };
    };

    apply_player_action(world, player, action)
}

fn update_item_select(
    world: &mut World,
    player: Entity,
    verb: ItemVerb,
    items: Vec<(char, Entity)>,
    title: String,
    cmd: Option<PlayerCommand>,
) -> GameState {
    match cmd {
        Some(PlayerCommand::Select(key)) => {
            if let Some(&(_, item)) = items.iter().find(|&&(k, _)| k == key) {
                let action = match verb {
                    ItemVerb::Use => Action::ApplyItem(item),
                    ItemVerb::Drop => Action::DropItem(item),
                };
                return apply_player_action(world, player, action);
            }
            GameState::ItemSelect { verb, items, title }
        }
        Some(PlayerCommand::Escape) | Some(PlayerCommand::Cancel) => GameState::InGame,
        _ => GameState::ItemSelect { verb, items, title },
    }
}

/// `PositionSelect.update`. Cursor moves
/// are clamped to the player's current map bounds; confirming dispatches to
/// either a look (`CharacterScreen` on a hit) or the pending spell cast.
fn update_position_select(
    world: &mut World,
    player: Entity,
    cursor: Position,
    purpose: PositionPurpose,
    cmd: Option<PlayerCommand>,
) -> GameState {
    match cmd {
        Some(PlayerCommand::Direction(dx, dy)) => {
            let (nx, ny) = (cursor.x + dx, cursor.y + dy);
            let in_bounds = world.maps.get(&cursor.map).map(|m| m.in_bounds(nx, ny)).unwrap_or(false);
            let next = if in_bounds { Position::new(nx, ny, cursor.map) } else { cursor };
            GameState::PositionSelect { cursor: next, purpose }
        }
        Some(PlayerCommand::Confirm) => match purpose {
            PositionPurpose::Look => {
                let actor = world
                    .entities_at(cursor.map, cursor.x, cursor.y)
                    .iter()
                    .copied()
                    .find(|&e| world.has_all(e, Tags::ACTOR));
                match actor {
                    Some(entity) => GameState::CharacterScreen { entity },
                    None => GameState::InGame,
                }
            }
            PositionPurpose::Cast { item, spell } => {
                apply_player_action(world, player, Action::CastAtPosition { item, spell, target: cursor })
            }
        },
        Some(PlayerCommand::Escape) | Some(PlayerCommand::Cancel) => GameState::InGame,
        _ => GameState::PositionSelect { cursor, purpose },
    }
}

/// `LevelUp.update`. `cursor` cycles `0..=2` over
/// `{CON, STR, DEX}`; `Select('a'|'b'|'c')` picks directly, matching
/// `states.py`'s `a`/`b`/`c` shortcuts alongside the arrow-key cursor.
fn update_level_up(world: &mut World, player: Entity, cursor: u8, cmd: Option<PlayerCommand>) -> GameState {
    match cmd {
        Some(PlayerCommand::CursorUp) => GameState::LevelUp { cursor: cursor.saturating_sub(1) },
        Some(PlayerCommand::CursorDown) => GameState::LevelUp { cursor: (cursor + 1).min(2) },
        Some(PlayerCommand::Confirm) => do_level_up_choice(world, player, cursor),
        Some(PlayerCommand::Select('a')) => do_level_up_choice(world, player, 0),
        Some(PlayerCommand::Select('b')) => do_level_up_choice(world, player, 1),
        Some(PlayerCommand::Select('c')) => do_level_up_choice(world, player, 2),
        _ => GameState::LevelUp { cursor },
    }
}

fn do_level_up_choice(world: &mut World, player: Entity, choice: u8) -> GameState {
    if let Some(stats) = world.stats.get_mut(&player) {
        match choice {
            0 => {
                stats.con += 1;
                stats.max_hp += 5;
                stats.hp += 5;
            }
            1 => stats.str_ += 1,
            _ => stats.dex += 1,
        }
    }
    apply_level_up(world, player);
    let message = match choice {
        0 => "Your health improves!",
        1 => "You feel stronger!",
        _ => "Your movements are getting swifter!",
    };
    world.messages.add(message, Color::WelcomeText);
    GameState::InGame
}

fn update_character_screen(entity: Entity, cmd: Option<PlayerCommand>) -> GameState {
    match cmd {
        Some(_) => GameState::InGame,
        None => GameState::CharacterScreen { entity },
    }
}

/// `MessageHistoryScreen.update`: any key but Up/Down
/// returns to `InGame`; Up/Down walk the log with wraparound at the ends.
fn update_message_history(world: &World, log_length: usize, cursor: usize, cmd: Option<PlayerCommand>) -> GameState {
    let log_length = world.messages.lines().len().max(log_length);
    match cmd {
        Some(PlayerCommand::CursorUp) => {
            let cursor = if cursor == 0 { log_length.saturating_sub(1) } else { cursor - 1 };
            GameState::MessageHistory { log_length, cursor }
        }
        Some(PlayerCommand::CursorDown) => {
            let cursor = if cursor + 1 >= log_length { 0 } else { cursor + 1 };
            GameState::MessageHistory { log_length, cursor }
        }
        Some(_) => GameState::InGame,
        None => GameState::MessageHistory { log_length, cursor },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{DiceOrFlat, EnergyStats, Stats};

    fn leveled_player(world: &mut World, xp: u32, level: u32) -> Entity {
        let e = world.create();
        world.add_tags(e, Tags::ACTOR | Tags::ALIVE | Tags::PLAYER);
        world.stats.insert(
            e,
            Stats { hp: 20, max_hp: 20, str_: 5, dex: 5, con: 5, defense: 0, attack: DiceOrFlat::Flat(5) },
        );
        world.progression.insert(e, Progression { level, xp, reward_xp: 0 });
        world.energy.insert(e, EnergyStats::default());
        e
    }

    #[test]
    fn required_xp_follows_the_step_formula() {
        assert_eq!(required_xp_for_level(1), 100);
        assert_eq!(required_xp_for_level(2), 250);
        assert_eq!(required_xp_for_level(3), 400);
    }

    #[test]
    fn can_level_up_is_false_just_under_the_threshold() {
        let mut world = World::new(1);
        let player = leveled_player(&mut world, 99, 1);
        assert!(!can_level_up(&world, player));
        world.progression.get_mut(&player).unwrap().xp = 100;
        assert!(can_level_up(&world, player));
    }

    #[test]
    fn con_choice_grants_five_hp_and_max_hp() {
        let mut world = World::new(1);
        let player = leveled_player(&mut world, 100, 1);
        let next = do_level_up_choice(&mut world, player, 0);
        assert!(matches!(next, GameState::InGame));
        let stats = &world.stats[&player];
        assert_eq!(stats.con, 6);
        assert_eq!(stats.max_hp, 25);
        assert_eq!(stats.hp, 25);
        assert_eq!(world.progression[&player].level, 2);
        assert_eq!(world.progression[&player].xp, 0);
    }

    #[test]
    fn str_choice_only_touches_strength() {
        let mut world = World::new(1);
        let player = leveled_player(&mut world, 100, 1);
        do_level_up_choice(&mut world, player, 1);
        assert_eq!(world.stats[&player].str_, 6);
        assert_eq!(world.stats[&player].max_hp, 20);
    }

    #[test]
    fn escape_from_in_game_opens_main_menu() {
        let mut world = World::new(1);
        let mut player = leveled_player(&mut world, 0, 1);
        let next = update(GameState::InGame, &mut world, &mut player, 1, Some(PlayerCommand::Escape));
        assert!(matches!(next, GameState::MainMenu));
    }

    #[test]
    fn new_game_from_main_menu_replaces_the_world() {
        let mut world = World::new(1);
        let mut player = leveled_player(&mut world, 0, 1);
        let next = update(GameState::MainMenu, &mut world, &mut player, 42, Some(PlayerCommand::NewGame));
        assert!(matches!(next, GameState::InGame));
        assert!(world.has_all(player, Tags::PLAYER));
        assert!(world.position(player).is_some());
    }
}
