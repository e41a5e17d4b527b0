//! The application context: owns the live `World`, the player entity, and
//! the current [`GameState`], plus the config and save path, since those
//! are genuinely per-run state rather than per-call arguments. `main.rs` is
//! the only caller; everything here is a thin, renderer-free driver over
//! [`state::update`] and [`save`]/[`config`].

use tracing::info;

use crate::config::Config;
use crate::save;
use crate::state::{self, GameState, PlayerCommand};
use crate::world::{Entity, World};

pub struct App {
    pub world: World,
    pub player: Entity,
    pub state: GameState,
    pub config: Config,
}

impl App {
    /// Loads the save file if present and valid; otherwise starts a new
    /// game straight into `InGame`. `MainMenu`'s "continue last game"
    /// option exists for the case where the player explicitly backs out to
    /// it later.
    pub fn load_or_new() -> App {
        let config = Config::load(Config::default_path());

        if let Some((mut world, player)) = save::load_game() {
            world.config = config.clone();
            crate::content::init_content(&mut world);
            info!(?player, "resumed saved game");
            return App { world, player, state: GameState::InGame, config };
        }

        let seed = config.rng_seed.unwrap_or(default_seed());
        let (world, player) = state::new_game(seed, config.clone());
        info!(?player, seed, "started a new game");
        App { world, player, state: GameState::InGame, config }
    }

    /// Advances the state machine by one decoded command.
    pub fn tick(&mut self, cmd: Option<PlayerCommand>) {
        let seed = self.config.rng_seed.unwrap_or(default_seed());
        self.state = state::update(self.state.clone(), &mut self.world, &mut self.player, seed, cmd);
    }

    /// Persists the current world.
    pub fn save(&self) -> Result<(), crate::error::GameError> {
        save::save_game(&self.world, self.player)
    }

    /// Whether the engine is still willing to accept input. Death disables
    /// *actions*, not the whole state machine, so this is solely a
    /// main-loop exit signal.
    pub fn should_quit(&self, cmd: Option<PlayerCommand>) -> bool {
        matches!((&self.state, cmd), (GameState::MainMenu, Some(PlayerCommand::Quit)))
    }
}

/// A process-stable fallback seed used when no `rng_seed` override is
/// configured. Not a source of entropy — the RNG only needs *a* seed, not
/// an unpredictable one, since determinism from a seed is what matters;
/// real unpredictability would pull in a `getrandom`-style dependency that
/// isn't otherwise needed here.
fn default_seed() -> u64 {
    std::process::id() as u64
}
