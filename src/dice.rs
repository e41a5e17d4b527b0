//! Dice notation rolls (`NdM[+K]`).
//!
//! Plain `NdM` notation (e.g. `"1d20"`, `"4d4"`) is the common case; the
//! optional `+K`/`-K` modifier is a direct generalization needed for
//! `DiceOrFlat::Dice` on equipment power bonuses, which can be flat or
//! dice-rolled.

use crate::rng::Rng;
use crate::world::DiceOrFlat;

#[derive(Debug, thiserror::Error)]
pub enum DiceError {
    #[error("malformed dice notation: {0:?}")]
    Malformed(String),
}

/// Parses `"NdM"` or `"NdM+K"` / `"NdM-K"` into `(count, sides, modifier)`.
pub fn parse(notation: &str) -> Result<(i32, i32, i32), DiceError> {
    let cleaned: String = notation.chars().filter(|c| !c.is_whitespace()).collect();

    let (dice_part, modifier) = match cleaned.find(['+', '-']) {
        Some(idx) => {
            let (dice, sign_and_rest) = cleaned.split_at(idx);
            let modifier: i32 = sign_and_rest
                .parse()
                .map_err(|_| DiceError::Malformed(notation.to_string()))?;
            (dice, modifier)
        }
        None => (cleaned.as_str(), 0),
    };

    let mut parts = dice_part.splitn(2, 'd');
    let num: i32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DiceError::Malformed(notation.to_string()))?;
    let sides: i32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DiceError::Malformed(notation.to_string()))?;

    Ok((num, sides, modifier))
}

/// Rolls `num` dice of `sides` faces each, summed.
pub fn roll(rng: &mut Rng, num: i32, sides: i32) -> i32 {
    let mut total = 0;
    for _ in 0..num {
        total += rng.gen_range_inclusive(1, sides);
    }
    total
}

/// Rolls notation such as `"2d6+3"`; malformed notation is a bug (the
/// template tables are authored, not user input), so it panics rather than
/// threading a `Result` through every combat call site.
pub fn roll_notation(rng: &mut Rng, notation: &str) -> i32 {
    let (num, sides, modifier) =
        parse(notation).unwrap_or_else(|e| panic!("invalid dice notation in content table: {e}"));
    roll(rng, num, sides) + modifier
}

/// Resolves a `DiceOrFlat` to a concrete roll.
pub fn roll_dice_or_flat(rng: &mut Rng, value: &DiceOrFlat) -> i32 {
    match value {
        DiceOrFlat::Flat(n) => *n,
        DiceOrFlat::Dice(notation) => roll_notation(rng, notation),
    }
}
