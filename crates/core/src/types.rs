//! Identifiers and grid primitives shared by the grammar and layout stages.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Arena key of a room in a [`PhraseGraph`](crate::grammar::PhraseGraph).
    /// Blueprint rooms keep the key of the phrase room they were built from.
    pub struct RoomId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub y: i32,
    pub x: i32,
}

impl Pos {
    pub const ORIGIN: Pos = Pos { y: 0, x: 0 };

    pub fn step(self, direction: Direction) -> Self {
        let (dy, dx) = direction.delta();
        Pos { y: self.y + dy, x: self.x + dx }
    }

    pub fn manhattan(self, other: Pos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn neighbors(self) -> [Pos; 4] {
        Direction::ALL.map(|direction| self.step(direction))
    }
}

/// Cardinal directions in grid space. North is toward negative `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    /// `(dy, dx)` of a single step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_steps_cancel_out() {
        let origin = Pos { y: 3, x: -2 };
        for direction in Direction::ALL {
            assert_eq!(origin.step(direction).step(direction.opposite()), origin);
            assert_eq!(origin.manhattan(origin.step(direction)), 1);
        }
    }

    #[test]
    fn north_points_toward_negative_y() {
        assert_eq!(Pos::ORIGIN.step(Direction::North), Pos { y: -1, x: 0 });
        assert!(Direction::North.is_vertical());
        assert!(!Direction::West.is_vertical());
    }
}
