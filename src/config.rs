//! Game-balance configuration: map dimensions, FOV radius, per-room spawn
//! caps, and an optional RNG seed override, loaded from and saved to a RON
//! file so a deployment can retune without recompiling.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Tunable game-balance knobs, lifted out of code so a deployment can
/// retune without recompiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub map_width: u32,
    pub map_height: u32,
    pub max_rooms: u32,
    pub min_room_size: u32,
    pub max_room_size: u32,
    pub fov_radius: i32,
    pub max_monsters_per_room: i32,
    pub max_items_per_room: i32,
    /// `None` seeds the RNG from an OS-provided value at `new_game` time;
    /// `Some(seed)` pins it, the way integration tests and `tests/
    /// scenarios.rs` need a reproducible run.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            map_width: 80,
            map_height: 43,
            max_rooms: 30,
            min_room_size: 6,
            max_room_size: 10,
            fov_radius: 10,
            max_monsters_per_room: 4,
            max_items_per_room: 2,
            rng_seed: None,
        }
    }
}

impl Config {
    /// Loads `path` (an optional `config.ron` next to the save file),
    /// falling back to [`Config::default`] on any read or parse failure,
    /// logging a warning rather than aborting.
    pub fn load(path: impl AsRef<Path>) -> Config {
        let path = path.as_ref();
        if !path.exists() {
            info!(?path, "no config file found, using defaults");
            return Config::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(config) => {
                    info!(?path, "loaded config");
                    config
                }
                Err(error) => {
                    warn!(?path, %error, "failed to parse config file, using defaults");
                    Config::default()
                }
            },
            Err(error) => {
                warn!(?path, %error, "failed to read config file, using defaults");
                Config::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), crate::error::GameError> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|error| crate::error::GameError::Save(anyhow::Error::new(error)))?;
        std::fs::write(path, contents).map_err(|error| crate::error::GameError::Save(anyhow::Error::new(error)))?;
        Ok(())
    }

    /// The default config path, next to the save file in the platform data
    /// directory, so the crate does not write into whatever directory the
    /// binary happens to be launched from.
    pub fn default_path() -> PathBuf {
        crate::save::data_dir().join("config.ron")
    }
}
