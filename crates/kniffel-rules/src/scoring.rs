//! The scoring function: `(dice, category) → points`.

use crate::{Category, Dice};

const FULL_HOUSE_POINTS: u32 = 25;
const SMALL_STRAIGHT_POINTS: u32 = 30;
const LARGE_STRAIGHT_POINTS: u32 = 40;
const KNIFFEL_POINTS: u32 = 50;

const SMALL_STRAIGHTS: [[u8; 4]; 3] = [[1, 2, 3, 4], [2, 3, 4, 5], [3, 4, 5, 6]];
const LARGE_STRAIGHTS: [[u8; 5]; 2] = [[1, 2, 3, 4, 5], [2, 3, 4, 5, 6]];

/// Points `dice` would earn if written into `category`.
///
/// Total and deterministic: every category yields a value for every roll,
/// with 0 when the pattern isn't met.
pub fn score(dice: &Dice, category: Category) -> u32 {
    let counts = dice.counts();
    let max_group = counts.iter().copied().max().unwrap_or(0);

    match category {
        Category::Ones
        | Category::Twos
        | Category::Threes
        | Category::Fours
        | Category::Fives
        | Category::Sixes => {
            let face = category.face().unwrap_or(0);
            u32::from(counts[usize::from(face)]) * u32::from(face)
        }
        Category::ThreeOfAKind if max_group >= 3 => dice.sum(),
        Category::FourOfAKind if max_group >= 4 => dice.sum(),
        Category::FullHouse if is_full_house(&counts) => FULL_HOUSE_POINTS,
        Category::SmallStraight
            if SMALL_STRAIGHTS
                .iter()
                .any(|run| run.iter().all(|&f| dice.contains(f))) =>
        {
            SMALL_STRAIGHT_POINTS
        }
        Category::LargeStraight if is_large_straight(dice) => LARGE_STRAIGHT_POINTS,
        Category::Kniffel if max_group == 5 => KNIFFEL_POINTS,
        Category::Chance => dice.sum(),
        _ => 0,
    }
}

/// Face-count multiset is exactly {3, 2}.
fn is_full_house(counts: &[u8; 7]) -> bool {
    let mut groups: Vec<u8> = counts.iter().copied().filter(|&c| c > 0).collect();
    groups.sort_unstable();
    groups == [2, 3]
}

fn is_large_straight(dice: &Dice) -> bool {
    let mut sorted = dice.values();
    sorted.sort_unstable();
    LARGE_STRAIGHTS.contains(&sorted)
}
