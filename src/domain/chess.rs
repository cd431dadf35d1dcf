//! Pure chess domain types: colours, roles and pieces, plus the glyph
//! tokens pieces are written as.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Not;
use std::str::FromStr;

use shakmaty::{Color as SColor, Role as SRole};

use super::error::NotationError;
use super::square::{File, Offset, Rank, Square};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Colour {
    White,
    Black,
}

impl Colour {
    /// Rank the side's king and rooks start on.
    pub fn back_rank(self) -> Rank {
        match self {
            Colour::White => Rank::One,
            Colour::Black => Rank::Eight,
        }
    }

    /// Rank the side's pawns start on.
    pub fn pawn_rank(self) -> Rank {
        match self {
            Colour::White => Rank::Two,
            Colour::Black => Rank::Seven,
        }
    }

    /// Direction the side's pawns push.
    pub fn forward(self) -> Offset {
        match self {
            Colour::White => Offset::UP,
            Colour::Black => Offset::DOWN,
        }
    }
}

impl Not for Colour {
    type Output = Colour;

    fn not(self) -> Colour {
        match self {
            Colour::White => Colour::Black,
            Colour::Black => Colour::White,
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Colour::White => "white",
            Colour::Black => "black",
        })
    }
}

impl From<SColor> for Colour {
    fn from(color: SColor) -> Self {
        match color {
            SColor::White => Colour::White,
            SColor::Black => Colour::Black,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// How a role's moves are generated.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Movement {
    /// Pushes, double pushes, diagonal captures and en passant.
    Pawn,
    /// One step along each offset.
    Jump,
    /// Rays along each offset until blocked.
    Slide,
}

const WHITE_PAWN_ATTACKS: [Offset; 2] = [Offset::UP_LEFT, Offset::UP_RIGHT];
const BLACK_PAWN_ATTACKS: [Offset; 2] = [Offset::DOWN_LEFT, Offset::DOWN_RIGHT];
const KNIGHT_JUMPS: [Offset; 8] = [
    Offset::new(-2, -1),
    Offset::new(-2, 1),
    Offset::new(-1, -2),
    Offset::new(-1, 2),
    Offset::new(1, -2),
    Offset::new(1, 2),
    Offset::new(2, -1),
    Offset::new(2, 1),
];
const DIAGONALS: [Offset; 4] = [
    Offset::UP_LEFT,
    Offset::DOWN_LEFT,
    Offset::UP_RIGHT,
    Offset::DOWN_RIGHT,
];
const ORTHOGONALS: [Offset; 4] = [Offset::LEFT, Offset::RIGHT, Offset::UP, Offset::DOWN];
const ALL_DIRECTIONS: [Offset; 8] = [
    Offset::LEFT,
    Offset::RIGHT,
    Offset::UP,
    Offset::DOWN,
    Offset::UP_LEFT,
    Offset::DOWN_LEFT,
    Offset::UP_RIGHT,
    Offset::DOWN_RIGHT,
];

impl Role {
    /// Roles a pawn may promote to.
    pub const PROMOTIONS: [Role; 4] = [Role::Knight, Role::Bishop, Role::Rook, Role::Queen];

    pub fn movement(self) -> Movement {
        match self {
            Role::Pawn => Movement::Pawn,
            Role::Knight | Role::King => Movement::Jump,
            Role::Bishop | Role::Rook | Role::Queen => Movement::Slide,
        }
    }

    /// Step or ray directions. Only pawn offsets (its captures) depend on colour.
    pub fn offsets(self, colour: Colour) -> &'static [Offset] {
        match self {
            Role::Pawn => match colour {
                Colour::White => &WHITE_PAWN_ATTACKS,
                Colour::Black => &BLACK_PAWN_ATTACKS,
            },
            Role::Knight => &KNIGHT_JUMPS,
            Role::Bishop => &DIAGONALS,
            Role::Rook => &ORTHOGONALS,
            Role::Queen | Role::King => &ALL_DIRECTIONS,
        }
    }
}

impl From<SRole> for Role {
    fn from(role: SRole) -> Self {
        match role {
            SRole::Pawn => Role::Pawn,
            SRole::Knight => Role::Knight,
            SRole::Bishop => Role::Bishop,
            SRole::Rook => Role::Rook,
            SRole::Queen => Role::Queen,
            SRole::King => Role::King,
        }
    }
}

const GLYPHS: [(Colour, Role, char); 12] = [
    (Colour::White, Role::Pawn, '♙'),
    (Colour::White, Role::Knight, '♘'),
    (Colour::White, Role::Bishop, '♗'),
    (Colour::White, Role::Rook, '♖'),
    (Colour::White, Role::Queen, '♕'),
    (Colour::White, Role::King, '♔'),
    (Colour::Black, Role::Pawn, '♟'),
    (Colour::Black, Role::Knight, '♞'),
    (Colour::Black, Role::Bishop, '♝'),
    (Colour::Black, Role::Rook, '♜'),
    (Colour::Black, Role::Queen, '♛'),
    (Colour::Black, Role::King, '♚'),
];

pub fn glyph(colour: Colour, role: Role) -> char {
    let offset = match colour {
        Colour::White => 0,
        Colour::Black => 6,
    };
    GLYPHS[offset + role as usize].2
}

pub fn from_glyph(c: char) -> Option<(Colour, Role)> {
    GLYPHS
        .iter()
        .find(|(_, _, g)| *g == c)
        .map(|&(colour, role, _)| (colour, role))
}

/// Tracks one physical piece across moves. Not part of piece equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct PieceId(pub u32);

impl PieceId {
    /// Carried by pieces decoded from text until `Move::match_ids` runs.
    pub const UNSET: PieceId = PieceId(0);
}

/// A piece standing on a square.
///
/// Equality, hashing and ordering look at colour, role and square only:
/// a piece is a value describing what occupies a square.
#[derive(Clone, Copy, Debug)]
pub struct Piece {
    pub colour: Colour,
    pub role: Role,
    pub square: Square,
    pub id: PieceId,
}

impl Piece {
    pub fn new(colour: Colour, role: Role, square: Square) -> Self {
        Self {
            colour,
            role,
            square,
            id: PieceId::UNSET,
        }
    }

    pub fn with_id(mut self, id: PieceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn on(mut self, square: Square) -> Self {
        self.square = square;
        self
    }

    pub fn glyph(&self) -> char {
        glyph(self.colour, self.role)
    }

    /// The same piece moved by `offset`, or `None` off the board.
    pub fn shift(&self, offset: Offset) -> Option<Piece> {
        self.square.shift(offset).map(|square| self.on(square))
    }
}

impl PartialEq for Piece {
    fn eq(&self, other: &Self) -> bool {
        self.colour == other.colour && self.role == other.role && self.square == other.square
    }
}

impl Eq for Piece {}

impl Hash for Piece {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.colour.hash(state);
        self.role.hash(state);
        self.square.hash(state);
    }
}

impl Ord for Piece {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.colour, self.square, self.role).cmp(&(other.colour, other.square, other.role))
    }
}

impl PartialOrd for Piece {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.glyph(), self.square)
    }
}

impl FromStr for Piece {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pieces = parse_tokens(s)?;
        match pieces.len() {
            1 => Ok(pieces.remove(0)),
            n => Err(NotationError::TokenCount(n)),
        }
    }
}

/// Decode a run of `<glyph><file><rank>` tokens. Fails on the first bad
/// character; nothing is returned for a partially valid string.
pub fn parse_tokens(text: &str) -> Result<Vec<Piece>, NotationError> {
    let mut pieces = Vec::with_capacity(text.chars().count() / 3);
    let mut chars = text.chars();
    while let Some(g) = chars.next() {
        let (colour, role) = from_glyph(g).ok_or(NotationError::UnknownGlyph(g))?;
        let f = chars
            .next()
            .ok_or_else(|| NotationError::Truncated(g.to_string()))?;
        let file = File::from_char(f).ok_or(NotationError::BadFile(f))?;
        let r = chars
            .next()
            .ok_or_else(|| NotationError::Truncated(format!("{g}{f}")))?;
        let rank = Rank::from_char(r).ok_or(NotationError::BadRank(r))?;
        pieces.push(Piece::new(colour, role, Square::new(file, rank)));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_table_is_a_bijection() {
        for &(colour, role, g) in &GLYPHS {
            assert_eq!(glyph(colour, role), g);
            assert_eq!(from_glyph(g), Some((colour, role)));
        }
        assert_eq!(from_glyph('K'), None);
    }

    #[test]
    fn test_equality_ignores_id() {
        let e1 = Square::new(File::E, Rank::One);
        let a = Piece::new(Colour::White, Role::King, e1).with_id(PieceId(4));
        let b = Piece::new(Colour::White, Role::King, e1).with_id(PieceId(9));
        assert_eq!(a, b);
        assert_ne!(a, b.with_role(Role::Queen));
    }

    #[test]
    fn test_parse_piece() {
        let piece: Piece = "♞f6".parse().unwrap();
        assert_eq!(piece.colour, Colour::Black);
        assert_eq!(piece.role, Role::Knight);
        assert_eq!(piece.square, Square::new(File::F, Rank::Six));
        assert_eq!(piece.to_string(), "♞f6");
    }

    #[test]
    fn test_parse_tokens_rejects_garbage() {
        assert_eq!(parse_tokens("Ke1"), Err(NotationError::UnknownGlyph('K')));
        assert_eq!(parse_tokens("♔i1"), Err(NotationError::BadFile('i')));
        assert_eq!(parse_tokens("♔e9"), Err(NotationError::BadRank('9')));
        assert_eq!(
            parse_tokens("♔e1♚e"),
            Err(NotationError::Truncated("♚e".to_string()))
        );
        assert_eq!(parse_tokens(""), Ok(vec![]));
    }

    #[test]
    fn test_pawn_attacks_follow_colour() {
        assert_eq!(
            Role::Pawn.offsets(Colour::White),
            &[Offset::UP_LEFT, Offset::UP_RIGHT]
        );
        assert_eq!(
            Role::Pawn.offsets(Colour::Black),
            &[Offset::DOWN_LEFT, Offset::DOWN_RIGHT]
        );
        assert_eq!(Role::Knight.movement(), Movement::Jump);
        assert_eq!(Role::Queen.movement(), Movement::Slide);
    }
}
