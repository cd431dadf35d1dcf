//! Board coordinates: files, ranks, squares and directional offsets.
//!
//! x runs 0..7 from file a to file h. y runs 0..7 from rank 8 down to
//! rank 1, so "up" on a white-at-bottom board is a negative y step.

use std::fmt;
use std::ops::Mul;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl File {
    pub const ALL: [File; 8] = [
        File::A,
        File::B,
        File::C,
        File::D,
        File::E,
        File::F,
        File::G,
        File::H,
    ];

    pub fn x(self) -> i8 {
        self as i8
    }

    pub fn from_x(x: i8) -> Option<Self> {
        if (0..8).contains(&x) {
            Some(Self::ALL[x as usize])
        } else {
            None
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='h' => Self::from_x((c as u8 - b'a') as i8),
            _ => None,
        }
    }

    pub fn char(self) -> char {
        (b'a' + self as u8) as char
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

impl Rank {
    pub const ALL: [Rank; 8] = [
        Rank::One,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
    ];

    /// Display row, rank 8 at the top (y 0) and rank 1 at the bottom (y 7).
    pub fn y(self) -> i8 {
        7 - self as i8
    }

    pub fn from_y(y: i8) -> Option<Self> {
        if (0..8).contains(&y) {
            Some(Self::ALL[(7 - y) as usize])
        } else {
            None
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '1'..='8' => Some(Self::ALL[(c as u8 - b'1') as usize]),
            _ => None,
        }
    }

    pub fn char(self) -> char {
        (b'1' + self as u8) as char
    }
}

/// A board square. Ordered file-major, then by rank.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Square {
    pub file: File,
    pub rank: Rank,
}

impl Square {
    pub const fn new(file: File, rank: Rank) -> Self {
        Self { file, rank }
    }

    pub fn from_xy(x: i8, y: i8) -> Option<Self> {
        Some(Self::new(File::from_x(x)?, Rank::from_y(y)?))
    }

    /// Slot in a 64-entry board array, a1 = 0, h8 = 63.
    pub fn index(self) -> usize {
        self.rank as usize * 8 + self.file as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index < 64 {
            Some(Self::new(File::ALL[index % 8], Rank::ALL[index / 8]))
        } else {
            None
        }
    }

    /// The square `offset` away, or `None` when that leaves the board.
    pub fn shift(self, offset: Offset) -> Option<Self> {
        Self::from_xy(self.file.x() + offset.dx, self.rank.y() + offset.dy)
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).filter_map(Square::from_index)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file.char(), self.rank.char())
    }
}

/// A step in board coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Offset {
    pub dx: i8,
    pub dy: i8,
}

impl Offset {
    pub const UP: Offset = Offset::new(0, -1);
    pub const DOWN: Offset = Offset::new(0, 1);
    pub const LEFT: Offset = Offset::new(-1, 0);
    pub const RIGHT: Offset = Offset::new(1, 0);

    pub const UP_LEFT: Offset = Offset::new(-1, -1);
    pub const UP_RIGHT: Offset = Offset::new(1, -1);
    pub const DOWN_LEFT: Offset = Offset::new(-1, 1);
    pub const DOWN_RIGHT: Offset = Offset::new(1, 1);

    pub const fn new(dx: i8, dy: i8) -> Self {
        Self { dx, dy }
    }
}

impl Mul<Offset> for i8 {
    type Output = Offset;

    fn mul(self, rhs: Offset) -> Offset {
        Offset::new(self * rhs.dx, self * rhs.dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_one_is_bottom_row() {
        assert_eq!(Rank::One.y(), 7);
        assert_eq!(Rank::Eight.y(), 0);
        assert_eq!(Rank::from_y(6), Some(Rank::Two));
    }

    #[test]
    fn test_shift_up_moves_towards_rank_eight() {
        let e2 = Square::new(File::E, Rank::Two);
        assert_eq!(e2.shift(Offset::UP), Some(Square::new(File::E, Rank::Three)));
        assert_eq!(e2.shift(2 * Offset::UP), Some(Square::new(File::E, Rank::Four)));
    }

    #[test]
    fn test_shift_off_board() {
        let a1 = Square::new(File::A, Rank::One);
        assert_eq!(a1.shift(Offset::LEFT), None);
        assert_eq!(a1.shift(Offset::DOWN), None);
        assert_eq!(a1.shift(7 * Offset::UP_RIGHT), Some(Square::new(File::H, Rank::Eight)));
        assert_eq!(a1.shift(8 * Offset::UP_RIGHT), None);
    }

    #[test]
    fn test_file_major_ordering() {
        let a8 = Square::new(File::A, Rank::Eight);
        let b1 = Square::new(File::B, Rank::One);
        assert!(a8 < b1);
        assert!(Square::new(File::H, Rank::Seven) < Square::new(File::H, Rank::Eight));
    }

    #[test]
    fn test_index_round_trip() {
        for square in Square::all() {
            assert_eq!(Square::from_index(square.index()), Some(square));
        }
        assert_eq!(Square::all().count(), 64);
        assert_eq!(Square::new(File::E, Rank::Four).to_string(), "e4");
    }
}
