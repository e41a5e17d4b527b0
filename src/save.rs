//! Persistence: the entire entity world, serialized as one binary file via
//! `bincode`, with the save path resolved through
//! `directories::ProjectDirs` for a proper per-platform data directory.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{info, warn};

use crate::error::GameError;
use crate::world::{Entity, World};

const QUALIFIER: &str = "";
const ORGANIZATION: &str = "deepdelve";
const APPLICATION: &str = "deepdelve";
const SAVE_FILE_NAME: &str = "save.bin";

/// The player's own identity is the only thing `World` cannot recover on
/// its own, since `Tags::PLAYER` could in principle mark zero or several
/// entities between saves if a bug destroyed the wrong one — so the saved
/// payload is `(World, player)`, not `World` alone.
#[derive(Debug, serde::Deserialize)]
struct SaveData {
    world: World,
    player: Entity,
}

/// The platform data directory this crate reads/writes into, resolved
/// per-platform rather than relative to the launch directory so installed
/// binaries don't scatter files next to wherever they happen to be invoked
/// from.
pub fn data_dir() -> PathBuf {
    match ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION) {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("."),
    }
}

fn save_path() -> PathBuf {
    data_dir().join(SAVE_FILE_NAME)
}

/// Serializes `(world, player)` to the fixed save path, creating the data
/// directory if needed.
pub fn save_game(world: &World, player: Entity) -> Result<(), GameError> {
    save_game_to(&save_path(), world, player)
}

fn save_game_to(path: &Path, world: &World, player: Entity) -> Result<(), GameError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GameError::Save(anyhow::Error::new(e)))?;
    }
    let bytes = bincode::serialize(&(world, player)).map_err(|e| GameError::Save(anyhow::Error::new(e)))?;
    std::fs::write(path, bytes).map_err(|e| GameError::Save(anyhow::Error::new(e)))?;
    info!(?path, "saved game");
    Ok(())
}

/// Loads `(World, player)` from the fixed save path. Returns `None` both
/// when no save exists and when the save is corrupt/incompatible: the
/// latter is tolerated by logging and starting a new game, so the caller
/// cannot tell the two apart and does not need to.
pub fn load_game() -> Option<(World, Entity)> {
    load_game_from(&save_path())
}

fn load_game_from(path: &Path) -> Option<(World, Entity)> {
    if !path.exists() {
        info!(?path, "no save file found");
        return None;
    }

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(?path, %error, "failed to read save file, starting a new game");
            return None;
        }
    };

    match bincode::deserialize::<SaveData>(&bytes) {
        Ok(data) => {
            info!(?path, "loaded save file");
            let mut world = data.world;
            // The spatial index is `#[serde(skip)]`; rebuild it from the
            // authoritative `positions` map before anything queries it.
            world.rebuild_spatial_index();
            Some((world, data.player))
        }
        Err(error) => {
            warn!(?path, %error, "save file is corrupt or incompatible, starting a new game");
            None
        }
    }
}
