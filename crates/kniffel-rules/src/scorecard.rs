//! A player's write-once scorecard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Category, Dice, RulesError, score};

/// Upper-section sum needed for the bonus.
pub const UPPER_BONUS_THRESHOLD: u32 = 63;

/// Points added once the upper section reaches the threshold.
pub const UPPER_BONUS: u32 = 35;

/// Scores recorded so far, keyed by category.
///
/// Each category is written at most once; [`Scorecard::record`] refuses
/// to overwrite. Serializes as a JSON object of the filled entries only,
/// e.g. `{"ones":3,"chance":22}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scorecard(BTreeMap<Category, u32>);

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> Option<u32> {
        self.0.get(&category).copied()
    }

    pub fn is_filled(&self, category: Category) -> bool {
        self.0.contains_key(&category)
    }

    /// Writes `points` into an empty category.
    ///
    /// # Errors
    /// [`RulesError::CategoryAlreadyUsed`] if the category holds a value;
    /// the stored value is left unchanged.
    pub fn record(&mut self, category: Category, points: u32) -> Result<(), RulesError> {
        if self.is_filled(category) {
            return Err(RulesError::CategoryAlreadyUsed(category));
        }
        self.0.insert(category, points);
        Ok(())
    }

    /// Scores `dice` against `category` and records the result.
    pub fn record_dice(&mut self, category: Category, dice: &Dice) -> Result<u32, RulesError> {
        let points = score(dice, category);
        self.record(category, points)?;
        Ok(points)
    }

    /// Categories still open, in enumeration order.
    pub fn open_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| !self.is_filled(*c))
            .collect()
    }

    pub fn filled_count(&self) -> usize {
        self.0.len()
    }

    /// All 13 categories hold a value.
    pub fn is_complete(&self) -> bool {
        self.0.len() == Category::COUNT
    }

    /// Sum of whatever upper categories are filled.
    pub fn upper_sum(&self) -> u32 {
        Category::UPPER.iter().filter_map(|c| self.get(*c)).sum()
    }

    /// 35 once the upper sum reaches 63, else 0.
    ///
    /// Computed from the currently filled upper categories; a partial sum
    /// below the threshold contributes nothing either way.
    pub fn upper_bonus(&self) -> u32 {
        if self.upper_sum() >= UPPER_BONUS_THRESHOLD {
            UPPER_BONUS
        } else {
            0
        }
    }

    /// Sum of every filled category plus the upper bonus.
    pub fn total(&self) -> u32 {
        self.0.values().sum::<u32>() + self.upper_bonus()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
