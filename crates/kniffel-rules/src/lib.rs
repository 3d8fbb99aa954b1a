//! Scoring rules for Kniffel.
//!
//! Everything in this crate is pure: no I/O, no clocks, no shared state.
//! Randomness is always injected by the caller as `&mut impl Rng`, so the
//! room layer can seed it per room and tests can make it deterministic.
//!
//! # Key types
//!
//! - [`Dice`] — five die faces, each in `1..=6`
//! - [`Category`] — the 13 scoring slots on a card
//! - [`score`] — `(dice, category) → points`
//! - [`Scorecard`] — one player's write-once card, with bonus and total

mod category;
mod dice;
mod error;
mod scorecard;
mod scoring;

pub use category::Category;
pub use dice::{Dice, KeepMask, DICE_COUNT};
pub use error::RulesError;
pub use scorecard::{Scorecard, UPPER_BONUS, UPPER_BONUS_THRESHOLD};
pub use scoring::score;
