//! Move search for the artificial opponent.
//!
//! The engine runs a depth-bounded minimax with alpha-beta pruning directly
//! against a [`chess::Game`], exploring branches by mutating the game and
//! undoing every probe before returning. Strength is selected through a
//! fixed ladder of [`Tier`]s, each mapping to a nominal search depth.

pub mod eval;
pub mod search;

pub use eval::{material_balance, piece_value, MATE_SCORE};
pub use search::compute_best_move;

use std::str::FromStr;

/// Difficulty tier for the artificial opponent, ordered weakest to
/// strongest. Each tier maps to a fixed nominal search depth; `Harmless`
/// plays uniformly random legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Harmless,
    Easy,
    Medium,
    Hard,
    Expert,
    Godlike,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Harmless,
        Tier::Easy,
        Tier::Medium,
        Tier::Hard,
        Tier::Expert,
        Tier::Godlike,
    ];

    /// Nominal search depth in plies.
    pub fn depth(self) -> u8 {
        match self {
            Self::Harmless => 0,
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
            Self::Expert => 4,
            Self::Godlike => 5,
        }
    }

    /// Wire/CLI form of the tier name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Harmless => "harmless",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
            Self::Godlike => "godlike",
        }
    }
}

impl FromStr for Tier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "harmless" => Ok(Self::Harmless),
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "expert" => Ok(Self::Expert),
            "godlike" => Ok(Self::Godlike),
            _ => Err(ParseTierError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown difficulty tier: {0}")]
pub struct ParseTierError(String);
