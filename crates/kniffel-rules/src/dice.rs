//! Five dice and the keep-mask that controls rerolls.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::RulesError;

/// Number of dice in play.
pub const DICE_COUNT: usize = 5;

/// Per-die flag: `true` keeps the die on the next roll.
pub type KeepMask = [bool; DICE_COUNT];

/// Five die faces, each guaranteed to be in `1..=6`.
///
/// Serializes as a plain array (`[3,3,5,1,6]`). Deserializing rejects
/// out-of-range faces, so a `Dice` value is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; DICE_COUNT]", into = "[u8; DICE_COUNT]")]
pub struct Dice([u8; DICE_COUNT]);

impl Dice {
    /// Builds dice from explicit faces.
    pub fn new(values: [u8; DICE_COUNT]) -> Result<Self, RulesError> {
        if let Some(&bad) = values.iter().find(|v| !(1..=6).contains(*v)) {
            return Err(RulesError::InvalidDieValue(bad));
        }
        Ok(Self(values))
    }

    /// Rolls all five dice.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut values = [0u8; DICE_COUNT];
        for v in &mut values {
            *v = rng.random_range(1..=6);
        }
        Self(values)
    }

    /// Rerolls every die whose keep flag is `false`. Kept dice are untouched.
    pub fn reroll<R: Rng + ?Sized>(&mut self, keep: &KeepMask, rng: &mut R) {
        for (value, kept) in self.0.iter_mut().zip(keep) {
            if !kept {
                *value = rng.random_range(1..=6);
            }
        }
    }

    pub fn values(&self) -> [u8; DICE_COUNT] {
        self.0
    }

    pub fn sum(&self) -> u32 {
        self.0.iter().map(|&v| u32::from(v)).sum()
    }

    /// Occurrences of each face. Index 0 is unused; `counts()[f]` is the
    /// number of dice showing `f`.
    pub fn counts(&self) -> [u8; 7] {
        let mut counts = [0u8; 7];
        for &v in &self.0 {
            counts[usize::from(v)] += 1;
        }
        counts
    }

    /// Returns `true` if at least one die shows `face`.
    pub fn contains(&self, face: u8) -> bool {
        self.0.contains(&face)
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self([1; DICE_COUNT])
    }
}

impl TryFrom<[u8; DICE_COUNT]> for Dice {
    type Error = RulesError;

    fn try_from(values: [u8; DICE_COUNT]) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Dice> for [u8; DICE_COUNT] {
    fn from(dice: Dice) -> Self {
        dice.0
    }
}
