//! Movement directions on the play area.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four orthogonal steps a player may propose.
///
/// The set is closed: `ALL` lists every variant and sampling code indexes
/// into it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Left,
    Top,
    Right,
    Bottom,
}

impl Direction {
    /// Every direction, in sampling order.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
    ];

    /// Row and column delta for a single step.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Left => (0, -1),
            Direction::Top => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Bottom => (1, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Left => "LEFT",
            Direction::Top => "TOP",
            Direction::Right => "RIGHT",
            Direction::Bottom => "BOTTOM",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
