//! Integer grid coordinates, cardinal directions and attack-pattern rotation.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// An integer position (or offset) on the grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Coord {
    /// Column.
    pub x: i32,
    /// Row. Positive `y` is "up".
    pub y: i32,
}

impl Coord {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance, ignoring tile weights.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chebyshev distance (`max(dx, dy)`).
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// The four orthogonal neighbours, in the order east, south, west, north.
    ///
    /// Bounds are not checked.
    #[must_use]
    pub fn cardinal_neighbors(self) -> [Coord; 4] {
        [
            self + Coord::new(1, 0),
            self + Coord::new(0, -1),
            self + Coord::new(-1, 0),
            self + Coord::new(0, 1),
        ]
    }

    /// Snap this vector onto the nearest of the four cardinal directions.
    ///
    /// The axis with the larger magnitude wins; ties go to the horizontal
    /// axis. The zero vector has no direction and yields `None`.
    #[must_use]
    pub fn normalize_to_4_direction(self) -> Option<Direction> {
        if self == Self::ZERO {
            return None;
        }
        let dir = if self.x.abs() >= self.y.abs() {
            if self.x > 0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if self.y > 0 {
            Direction::Up
        } else {
            Direction::Down
        };
        Some(dir)
    }
}

impl Add for Coord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `(0, 1)`, the canonical orientation of attack patterns.
    Up,
    /// `(1, 0)`.
    Right,
    /// `(0, -1)`.
    Down,
    /// `(-1, 0)`.
    Left,
}

impl Direction {
    /// Unit vector for this direction.
    #[must_use]
    pub const fn offset(self) -> Coord {
        match self {
            Self::Up => Coord::new(0, 1),
            Self::Right => Coord::new(1, 0),
            Self::Down => Coord::new(0, -1),
            Self::Left => Coord::new(-1, 0),
        }
    }

    /// Rotation taking the canonical "up" orientation onto this direction.
    #[must_use]
    pub const fn rotation(self) -> Rotation {
        match self {
            Self::Up => Rotation::IDENTITY,
            Self::Right => Rotation([[0, 1], [-1, 0]]),
            Self::Down => Rotation([[-1, 0], [0, -1]]),
            Self::Left => Rotation([[0, -1], [1, 0]]),
        }
    }
}

/// A 2x2 integer rotation matrix, applied as `(a*x + b*y, c*x + d*y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rotation(pub [[i32; 2]; 2]);

impl Rotation {
    /// No rotation.
    pub const IDENTITY: Self = Self([[1, 0], [0, 1]]);

    /// Derive the rotation for an arbitrary direction vector.
    ///
    /// The vector is snapped to a cardinal direction first; the zero vector
    /// maps to the identity.
    #[must_use]
    pub fn facing(vector: Coord) -> Self {
        vector
            .normalize_to_4_direction()
            .map_or(Self::IDENTITY, Direction::rotation)
    }

    /// Rotate a relative offset.
    #[must_use]
    pub const fn apply(self, offset: Coord) -> Coord {
        let [[a, b], [c, d]] = self.0;
        Coord::new(a * offset.x + b * offset.y, c * offset.x + d * offset.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        let a = Coord::new(0, 0);
        let b = Coord::new(3, -4);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(a.chebyshev_distance(b), 4);
        assert_eq!(b.manhattan_distance(b), 0);
    }

    #[test]
    fn test_normalize_to_4_direction() {
        assert_eq!(Coord::new(5, 2).normalize_to_4_direction(), Some(Direction::Right));
        assert_eq!(Coord::new(-1, 0).normalize_to_4_direction(), Some(Direction::Left));
        assert_eq!(Coord::new(1, 3).normalize_to_4_direction(), Some(Direction::Up));
        assert_eq!(Coord::new(0, -7).normalize_to_4_direction(), Some(Direction::Down));
        assert_eq!(Coord::ZERO.normalize_to_4_direction(), None);
    }

    #[test]
    fn test_diagonal_tie_prefers_horizontal() {
        assert_eq!(Coord::new(2, 2).normalize_to_4_direction(), Some(Direction::Right));
        assert_eq!(Coord::new(-3, 3).normalize_to_4_direction(), Some(Direction::Left));
    }

    #[test]
    fn test_rotation_maps_up_onto_direction() {
        let up = Direction::Up.offset();
        for dir in [Direction::Up, Direction::Right, Direction::Down, Direction::Left] {
            assert_eq!(dir.rotation().apply(up), dir.offset(), "rotating up onto {dir:?}");
        }
    }

    #[test]
    fn test_rotation_of_t_pattern() {
        // A "T" in front of the target: the target itself plus one tile to each side.
        let pattern = [Coord::new(0, 0), Coord::new(-1, 0), Coord::new(1, 0)];
        let rotated: Vec<Coord> = pattern
            .iter()
            .map(|&p| Direction::Right.rotation().apply(p))
            .collect();
        assert_eq!(
            rotated,
            vec![Coord::new(0, 0), Coord::new(0, 1), Coord::new(0, -1)]
        );
    }

    #[test]
    fn test_facing_zero_is_identity() {
        assert_eq!(Rotation::facing(Coord::ZERO), Rotation::IDENTITY);
        assert_eq!(
            Rotation::facing(Coord::new(0, -9)),
            Direction::Down.rotation()
        );
    }
}
