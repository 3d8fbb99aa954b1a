//! The 13 scoring categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RulesError;

/// One scoring slot on a player's card.
///
/// Declaration order is the canonical enumeration order: the AI breaks
/// ties by it and scorecards serialize in it (`Ord` follows declaration).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    #[serde(alias = "three-of-kind")]
    ThreeOfAKind,
    #[serde(alias = "four-of-kind")]
    FourOfAKind,
    FullHouse,
    SmallStraight,
    LargeStraight,
    Kniffel,
    Chance,
}

impl Category {
    /// Number of categories on a full card.
    pub const COUNT: usize = 13;

    /// All categories in enumeration order.
    pub const ALL: [Category; Self::COUNT] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
        Category::ThreeOfAKind,
        Category::FourOfAKind,
        Category::FullHouse,
        Category::SmallStraight,
        Category::LargeStraight,
        Category::Kniffel,
        Category::Chance,
    ];

    /// The six face-value categories, `ones` through `sixes`.
    pub const UPPER: [Category; 6] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
    ];

    /// Returns the face value counted by an upper-section category.
    pub fn face(self) -> Option<u8> {
        match self {
            Self::Ones => Some(1),
            Self::Twos => Some(2),
            Self::Threes => Some(3),
            Self::Fours => Some(4),
            Self::Fives => Some(5),
            Self::Sixes => Some(6),
            _ => None,
        }
    }

    /// Returns `true` for `ones` through `sixes`.
    pub fn is_upper(self) -> bool {
        self.face().is_some()
    }

    /// The wire identifier, e.g. `"full-house"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ones => "ones",
            Self::Twos => "twos",
            Self::Threes => "threes",
            Self::Fours => "fours",
            Self::Fives => "fives",
            Self::Sixes => "sixes",
            Self::ThreeOfAKind => "three-of-a-kind",
            Self::FourOfAKind => "four-of-a-kind",
            Self::FullHouse => "full-house",
            Self::SmallStraight => "small-straight",
            Self::LargeStraight => "large-straight",
            Self::Kniffel => "kniffel",
            Self::Chance => "chance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "three-of-kind" => return Ok(Self::ThreeOfAKind),
            "four-of-kind" => return Ok(Self::FourOfAKind),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| RulesError::UnknownCategory(s.to_string()))
    }
}
