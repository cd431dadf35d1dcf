//! A position as a set of pieces, with check detection.

use std::fmt;

use shakmaty::fen::Fen;

use super::chess::{Colour, Piece, PieceId, Role, parse_tokens};
use super::error::NotationError;
use super::moves::Move;
use super::square::{File, Rank, Square};

/// Whether a check scan stops at the first attacker.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CheckScan {
    /// Return 1 as soon as any attacker is found.
    First,
    /// Count every attacker; two or more is a double check.
    All,
}

/// The parts of a FEN record a game tree root can carry.
#[derive(Clone, Debug)]
pub struct FenSetup {
    pub position: Position,
    pub turn: Colour,
    /// Square a pawn passed over on the previous move
    pub en_passant: Option<Square>,
}

impl FenSetup {
    /// The double push that opened [`FenSetup::en_passant`], checked against
    /// the placement. `None` when the record has no en passant square.
    pub fn en_passant_push(&self) -> Result<Option<Move>, NotationError> {
        let Some(target) = self.en_passant else {
            return Ok(None);
        };
        let pusher = !self.turn;
        let impossible = || NotationError::Fen(format!("no {pusher} pawn can have passed {target}"));
        let forward = pusher.forward();
        let (Some(to), Some(from)) = (target.shift(forward), target.shift(-1 * forward)) else {
            return Err(impossible());
        };
        if from.rank != pusher.pawn_rank()
            || self.position.get(target).is_some()
            || self.position.get(from).is_some()
        {
            return Err(impossible());
        }
        let pawn = self
            .position
            .find(&Piece::new(pusher, Role::Pawn, to))
            .copied()
            .ok_or_else(impossible)?;
        Ok(Some(Move::quiet(pawn.on(from), pawn)))
    }
}

/// A set of pieces, at most one per square.
///
/// Backed by a square-indexed array, but the operations behave like set
/// operations on [`Piece`] values (colour, role and square).
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    squares: [Option<Piece>; 64],
    len: usize,
}

impl Position {
    pub fn empty() -> Self {
        Self {
            squares: [None; 64],
            len: 0,
        }
    }

    /// Build from pieces on distinct squares; a later piece on an occupied
    /// square replaces the earlier one.
    pub fn from_pieces(pieces: impl IntoIterator<Item = Piece>) -> Self {
        let mut position = Self::empty();
        for piece in pieces {
            position.insert(piece);
        }
        position
    }

    /// Decode a token string such as a tree root's notation. Pieces get
    /// fresh ids in token order, starting at 1.
    pub fn from_notation(text: &str) -> Result<Self, NotationError> {
        let pieces = parse_tokens(text)?;
        Ok(Self::from_pieces(
            pieces
                .into_iter()
                .zip(1..)
                .map(|(piece, id)| piece.with_id(PieceId(id))),
        ))
    }

    /// Parse a FEN string. A tree root derives castling rights from kings
    /// and rooks on their home squares, so a record whose castling field
    /// says otherwise is rejected.
    pub fn from_fen(fen: &str) -> Result<FenSetup, NotationError> {
        let setup = Fen::from_ascii(fen.as_bytes())
            .map_err(|e| NotationError::Fen(e.to_string()))?
            .into_setup();
        let mut pieces = Vec::new();
        for sq in setup.board.occupied() {
            let Some(piece) = setup.board.piece_at(sq) else {
                continue;
            };
            let index = u32::from(sq) as usize;
            let Some(square) = Square::from_index(index) else {
                continue;
            };
            pieces.push(Piece::new(piece.color.into(), piece.role.into(), square));
        }
        pieces.sort();
        let position = Self::from_pieces(
            pieces
                .into_iter()
                .zip(1..)
                .map(|(piece, id)| piece.with_id(PieceId(id))),
        );

        let mut granted: Vec<Square> = setup
            .castling_rights
            .into_iter()
            .filter_map(|sq| Square::from_index(u32::from(sq) as usize))
            .collect();
        granted.sort();
        let implied = position.home_rooks();
        if granted != implied {
            let list = |squares: &[Square]| {
                squares.iter().map(Square::to_string).collect::<Vec<_>>().join(" ")
            };
            return Err(NotationError::Fen(format!(
                "castling rights [{}] differ from the rooks at home [{}]",
                list(&granted),
                list(&implied)
            )));
        }

        let en_passant = setup
            .ep_square
            .and_then(|sq| Square::from_index(u32::from(sq) as usize));
        Ok(FenSetup {
            position,
            turn: setup.turn.into(),
            en_passant,
        })
    }

    /// Corner squares of rooks that share the back rank with their king on
    /// its home square, in square order.
    fn home_rooks(&self) -> Vec<Square> {
        let mut rooks = Vec::new();
        for colour in [Colour::White, Colour::Black] {
            let rank = colour.back_rank();
            if !self.contains(&Piece::new(colour, Role::King, Square::new(File::E, rank))) {
                continue;
            }
            for file in [File::A, File::H] {
                let rook = Piece::new(colour, Role::Rook, Square::new(file, rank));
                if self.contains(&rook) {
                    rooks.push(rook.square);
                }
            }
        }
        rooks.sort();
        rooks
    }

    /// Token string with the side *not* to move first, so a tree root's
    /// leading glyph tells whose turn it is.
    pub fn notation(&self, turn: Colour) -> String {
        let mut pieces: Vec<Piece> = self.iter().copied().collect();
        match turn {
            Colour::White => pieces.sort_by(|a, b| b.cmp(a)),
            Colour::Black => pieces.sort(),
        }
        pieces.iter().map(Piece::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, square: Square) -> Option<&Piece> {
        self.squares[square.index()].as_ref()
    }

    pub fn at(&self, file: File, rank: Rank) -> Option<&Piece> {
        self.get(Square::new(file, rank))
    }

    /// The stored piece equal to `piece`, carrying its id.
    pub fn find(&self, piece: &Piece) -> Option<&Piece> {
        self.get(piece.square).filter(|p| *p == piece)
    }

    pub fn contains(&self, piece: &Piece) -> bool {
        self.find(piece).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.squares.iter().flatten()
    }

    pub fn pieces_of(&self, colour: Colour) -> impl Iterator<Item = &Piece> + '_ {
        self.iter().filter(move |p| p.colour == colour)
    }

    pub fn king(&self, colour: Colour) -> Option<Piece> {
        self.pieces_of(colour).find(|p| p.role == Role::King).copied()
    }

    fn insert(&mut self, piece: Piece) {
        let slot = &mut self.squares[piece.square.index()];
        if slot.is_none() {
            self.len += 1;
        }
        *slot = Some(piece);
    }

    fn remove(&mut self, square: Square) {
        if self.squares[square.index()].take().is_some() {
            self.len -= 1;
        }
    }

    /// Symmetric difference with `set`, in place.
    ///
    /// Membership of every member is decided before anything changes, so a
    /// capture (arriving piece and captured piece on one square) comes out
    /// the same as set XOR would. Applying the same set twice is the identity.
    pub fn toggle_all<'a>(&mut self, set: impl IntoIterator<Item = &'a Piece>) {
        let mut present = [None; 4];
        let mut absent = [None; 4];
        let (mut np, mut na) = (0, 0);
        for piece in set {
            if self.contains(piece) {
                present[np] = Some(piece);
                np += 1;
            } else {
                absent[na] = Some(piece);
                na += 1;
            }
        }
        for piece in present.into_iter().flatten() {
            self.remove(piece.square);
        }
        for piece in absent.into_iter().flatten() {
            debug_assert!(
                self.get(piece.square).is_none(),
                "{piece} lands on an occupied square"
            );
            self.insert(*piece);
        }
    }

    pub fn symmetric_difference<'a>(&self, set: impl IntoIterator<Item = &'a Piece>) -> Position {
        let mut next = self.clone();
        next.toggle_all(set);
        next
    }

    /// Count the enemy pieces attacking `king`'s square.
    ///
    /// Pawn and knight attackers are probed at their single source square.
    /// Sliders are found by marching rays out from the king: the first
    /// occupied square ends a ray, and it is an attacker only if it is an
    /// enemy bishop/rook matching the ray, a queen, or a king one step away.
    pub fn checks(&self, king: &Piece, scan: CheckScan) -> u32 {
        let mut count = 0;

        for jumper in [Role::Pawn, Role::Knight] {
            for &offset in jumper.offsets(king.colour) {
                let Some(square) = king.square.shift(offset) else {
                    continue;
                };
                if let Some(attacker) = self.get(square) {
                    if attacker.role == jumper && attacker.colour != king.colour {
                        if scan == CheckScan::First {
                            return 1;
                        }
                        count += 1;
                    }
                }
            }
        }

        for slider in [Role::Bishop, Role::Rook] {
            for &direction in slider.offsets(king.colour) {
                for distance in 1..=7 {
                    let Some(square) = king.square.shift(distance * direction) else {
                        break;
                    };
                    let Some(occupant) = self.get(square) else {
                        continue;
                    };
                    let attacks = occupant.role == slider
                        || occupant.role == Role::Queen
                        || (occupant.role == Role::King && distance == 1);
                    if attacks && occupant.colour != king.colour {
                        if scan == CheckScan::First {
                            return 1;
                        }
                        count += 1;
                    }
                    break;
                }
            }
        }

        count
    }

    pub fn is_attacked(&self, piece: &Piece) -> bool {
        self.checks(piece, CheckScan::First) != 0
    }

    /// Sanity check for an imported position with `turn` to move.
    pub fn is_valid(&self, turn: Colour) -> bool {
        if self.len() <= 2 {
            return false;
        }
        let unpromoted = self.iter().any(|p| {
            p.role == Role::Pawn && (p.square.rank == Rank::One || p.square.rank == Rank::Eight)
        });
        if unpromoted {
            return false;
        }
        let kings = |colour| {
            self.pieces_of(colour)
                .filter(|p| p.role == Role::King)
                .count()
        };
        if kings(Colour::White) != 1 || kings(Colour::Black) != 1 {
            return false;
        }
        // the side that just moved cannot have left its king capturable
        match self.king(!turn) {
            Some(king) => !self.is_attacked(&king),
            None => false,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Piece::to_string)).finish()
    }
}

/// Eight lines, rank 8 first, glyphs for pieces and '·' for empty squares.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::ALL.iter().rev() {
            for file in File::ALL {
                let c = self.at(file, *rank).map_or('·', Piece::glyph);
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
