//! Decision policy for automated players.
//!
//! The policy is deliberately simple: it only looks at the current dice
//! and the bot's own scorecard. Pacing and scheduling live in the room
//! actor; this module is pure and takes its randomness from the caller.

use kniffel_protocol::Difficulty;
use kniffel_rules::{Category, DICE_COUNT, Dice, KeepMask, Scorecard, score};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Chance that an easy bot keeps any given die.
const EASY_KEEP_PROBABILITY: f64 = 0.3;

/// What a bot does with its next action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotAction {
    /// Reroll every die not flagged in the mask.
    Roll(KeepMask),
    /// Write the current dice into this category.
    Score(Category),
}

/// Picks the next action for a bot holding the turn.
///
/// Rolls while rolls remain, then scores.
pub fn decide<R: Rng + ?Sized>(
    difficulty: Difficulty,
    rolls_left: u8,
    dice: &Dice,
    card: &Scorecard,
    rng: &mut R,
) -> BotAction {
    if rolls_left > 0 {
        BotAction::Roll(choose_keep(difficulty, dice, rng))
    } else {
        BotAction::Score(choose_category(difficulty, dice, card, rng))
    }
}

/// Decides which dice to keep for the next roll.
///
/// Easy bots keep each die on a coin flip weighted toward rerolling.
/// Medium and hard bots keep the largest group of matching faces (pairs
/// or better), preferring the higher face when two groups tie, and
/// reroll everything else.
pub fn choose_keep<R: Rng + ?Sized>(difficulty: Difficulty, dice: &Dice, rng: &mut R) -> KeepMask {
    let mut keep = [false; DICE_COUNT];
    match difficulty {
        Difficulty::Easy => {
            for k in &mut keep {
                *k = rng.random_bool(EASY_KEEP_PROBABILITY);
            }
        }
        Difficulty::Medium | Difficulty::Hard => {
            if let Some(face) = largest_group(dice) {
                for (k, value) in keep.iter_mut().zip(dice.values()) {
                    *k = value == face;
                }
            }
        }
    }
    keep
}

/// Picks an open category to score.
///
/// Easy bots pick uniformly at random. Medium and hard bots take the
/// highest-scoring open category, first in enumeration order on ties.
/// Falls back to [`Category::Chance`] if the card has no open category.
pub fn choose_category<R: Rng + ?Sized>(
    difficulty: Difficulty,
    dice: &Dice,
    card: &Scorecard,
    rng: &mut R,
) -> Category {
    let open = card.open_categories();
    let picked = match difficulty {
        Difficulty::Easy => open.choose(rng).copied(),
        Difficulty::Medium | Difficulty::Hard => {
            let mut best: Option<(Category, u32)> = None;
            for category in open {
                let points = score(dice, category);
                // Strictly greater keeps the earliest category on ties.
                if best.is_none_or(|(_, top)| points > top) {
                    best = Some((category, points));
                }
            }
            best.map(|(category, _)| category)
        }
    };
    picked.unwrap_or(Category::Chance)
}

/// The face of the largest matching group of size two or more.
fn largest_group(dice: &Dice) -> Option<u8> {
    let counts = dice.counts();
    // `max_by_key` returns the last maximum, so ascending faces favour
    // the higher face on ties.
    (1..=6u8)
        .filter(|&face| counts[face as usize] >= 2)
        .max_by_key(|&face| counts[face as usize])
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn dice(values: [u8; 5]) -> Dice {
        Dice::new(values).unwrap()
    }

    fn card_with_only_open(open: Category) -> Scorecard {
        let mut card = Scorecard::new();
        for c in Category::ALL {
            if c != open {
                card.record(c, 0).unwrap();
            }
        }
        card
    }

    #[test]
    fn test_rolls_while_rolls_remain() {
        let mut rng = StdRng::seed_from_u64(1);
        let action = decide(
            Difficulty::Medium,
            2,
            &dice([1, 2, 3, 4, 6]),
            &Scorecard::new(),
            &mut rng,
        );
        assert!(matches!(action, BotAction::Roll(_)));
    }

    #[test]
    fn test_scores_when_out_of_rolls() {
        let mut rng = StdRng::seed_from_u64(1);
        let action = decide(
            Difficulty::Hard,
            0,
            &dice([6, 6, 6, 6, 6]),
            &Scorecard::new(),
            &mut rng,
        );
        assert_eq!(action, BotAction::Score(Category::Kniffel));
    }

    #[test]
    fn test_greedy_keeps_largest_group() {
        let mut rng = StdRng::seed_from_u64(1);
        let keep = choose_keep(Difficulty::Medium, &dice([2, 5, 2, 5, 2]), &mut rng);
        assert_eq!(keep, [true, false, true, false, true]);
    }

    #[test]
    fn test_greedy_tie_prefers_higher_face() {
        let mut rng = StdRng::seed_from_u64(1);
        let keep = choose_keep(Difficulty::Hard, &dice([3, 1, 3, 1, 6]), &mut rng);
        assert_eq!(keep, [true, false, true, false, false]);
    }

    #[test]
    fn test_greedy_rerolls_all_without_pair() {
        let mut rng = StdRng::seed_from_u64(1);
        let keep = choose_keep(Difficulty::Medium, &dice([1, 2, 3, 4, 6]), &mut rng);
        assert_eq!(keep, [false; 5]);
    }

    #[test]
    fn test_easy_keeps_roughly_a_third() {
        let mut rng = StdRng::seed_from_u64(7);
        let d = dice([1, 2, 3, 4, 5]);
        let kept: usize = (0..1000)
            .map(|_| {
                choose_keep(Difficulty::Easy, &d, &mut rng)
                    .iter()
                    .filter(|k| **k)
                    .count()
            })
            .sum();
        // 5000 dice at 30%: expect ~1500.
        assert!((1200..1800).contains(&kept), "kept {kept}");
    }

    #[test]
    fn test_greedy_category_picks_highest() {
        let mut rng = StdRng::seed_from_u64(1);
        let category = choose_category(
            Difficulty::Medium,
            &dice([2, 2, 3, 3, 3]),
            &Scorecard::new(),
            &mut rng,
        );
        assert_eq!(category, Category::FullHouse);
    }

    #[test]
    fn test_greedy_category_prefers_best_then_first() {
        let mut rng = StdRng::seed_from_u64(1);
        // Large straight (40) beats small straight (30) and chance (15).
        let mut card = Scorecard::new();
        for c in &Category::UPPER[1..] {
            card.record(*c, 0).unwrap();
        }
        let category = choose_category(Difficulty::Hard, &dice([1, 2, 3, 4, 5]), &card, &mut rng);
        assert_eq!(category, Category::LargeStraight);

        // All-zero candidates: first open in enumeration order wins.
        let mut card = Scorecard::new();
        for c in Category::ALL {
            if !matches!(c, Category::Kniffel | Category::FullHouse) {
                card.record(c, 0).unwrap();
            }
        }
        let category = choose_category(Difficulty::Hard, &dice([1, 2, 3, 4, 6]), &card, &mut rng);
        assert_eq!(category, Category::FullHouse);
    }

    #[test]
    fn test_single_open_category_is_always_chosen() {
        let mut rng = StdRng::seed_from_u64(3);
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            for open in Category::ALL {
                let card = card_with_only_open(open);
                let picked = choose_category(difficulty, &dice([6, 6, 6, 6, 6]), &card, &mut rng);
                assert_eq!(picked, open, "{difficulty} with only {open} open");
            }
        }
    }

    #[test]
    fn test_full_card_defaults_to_chance() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut card = Scorecard::new();
        for c in Category::ALL {
            card.record(c, 0).unwrap();
        }
        assert_eq!(
            choose_category(Difficulty::Easy, &dice([1, 1, 1, 1, 1]), &card, &mut rng),
            Category::Chance
        );
        assert_eq!(
            choose_category(Difficulty::Hard, &dice([1, 1, 1, 1, 1]), &card, &mut rng),
            Category::Chance
        );
    }

    #[test]
    fn test_easy_category_is_open() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut card = Scorecard::new();
        card.record(Category::Chance, 10).unwrap();
        for _ in 0..50 {
            let picked = choose_category(Difficulty::Easy, &dice([1, 2, 3, 4, 5]), &card, &mut rng);
            assert_ne!(picked, Category::Chance);
        }
    }
}
