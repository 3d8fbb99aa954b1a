//! Error types for the rules layer.

use crate::Category;

/// Errors raised when dice or scorecards are fed invalid input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// A die face outside `1..=6`.
    #[error("die value {0} is outside 1..=6")]
    InvalidDieValue(u8),

    /// A category name that doesn't match any of the 13 categories.
    #[error("unknown category \"{0}\"")]
    UnknownCategory(String),

    /// The category already holds a value on this scorecard.
    #[error("category {0} is already filled")]
    CategoryAlreadyUsed(Category),
}
