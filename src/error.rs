//! Error taxonomy for the engine.
//!
//! Recoverable conditions never surface as `Err` here: an out-of-bounds move
//! or "nothing to attack" is an [`crate::action::ActionResult::Impossible`],
//! not a [`GameError`]. `GameError` is reserved for things that *do* unwind:
//! invariant violations (bugs) and persistence failures.

use thiserror::Error;

use crate::world::Entity;

/// Fatal conditions: the caller either propagates these to the top of the
/// main loop and logs them, or (for [`GameError::InvariantViolation`]) they
/// indicate a bug and are expected to be caught with `assert!`/`panic!`
/// closer to the source instead of being constructed at all.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("entity {0} does not exist or has been destroyed")]
    DeadEntity(Entity),

    #[error("position out of bounds: ({x}, {y}) on a {width}x{height} map")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("failed to load save file: {0}")]
    Load(#[source] anyhow::Error),

    #[error("failed to write save file: {0}")]
    Save(#[source] anyhow::Error),
}

pub type GameResult<T> = Result<T, GameError>;
