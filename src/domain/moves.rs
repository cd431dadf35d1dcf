//! Moves as sets of piece transitions, and their token-string encoding.
//!
//! A move is written as 2, 3 or 4 tokens:
//! - `from to` for a quiet move,
//! - `from to captured` for a capture (the captured piece keeps its own
//!   square, which differs from `to` for en passant),
//! - `king_from king_to rook_from rook_to` for castling.
//!
//! Playing a move is a symmetric difference of its pieces with the position.

use std::fmt;
use std::str::FromStr;

use super::chess::{Piece, Role, parse_tokens};
use super::error::NotationError;
use super::position::Position;
use super::square::Rank;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MoveKind {
    Quiet,
    Capture(Piece),
    Castle { rook_from: Piece, rook_to: Piece },
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Move {
    pub from: Piece,
    pub to: Piece,
    pub kind: MoveKind,
}

impl Move {
    pub fn quiet(from: Piece, to: Piece) -> Self {
        Self {
            from,
            to,
            kind: MoveKind::Quiet,
        }
    }

    pub fn capture(from: Piece, to: Piece, captured: Piece) -> Self {
        Self {
            from,
            to,
            kind: MoveKind::Capture(captured),
        }
    }

    pub fn castle(king_from: Piece, king_to: Piece, rook_from: Piece, rook_to: Piece) -> Self {
        Self {
            from: king_from,
            to: king_to,
            kind: MoveKind::Castle { rook_from, rook_to },
        }
    }

    /// The 2 to 4 pieces whose symmetric difference with the position plays
    /// (or unplays) the move.
    pub fn set(&self) -> impl Iterator<Item = &Piece> + '_ {
        let (third, fourth) = match &self.kind {
            MoveKind::Quiet => (None, None),
            MoveKind::Capture(captured) => (Some(captured), None),
            MoveKind::Castle { rook_from, rook_to } => (Some(rook_from), Some(rook_to)),
        };
        [Some(&self.from), Some(&self.to), third, fourth]
            .into_iter()
            .flatten()
    }

    pub fn captured(&self) -> Option<&Piece> {
        match &self.kind {
            MoveKind::Capture(captured) => Some(captured),
            _ => None,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.captured().is_some()
    }

    pub fn is_en_passant(&self) -> bool {
        self.captured()
            .is_some_and(|captured| captured.square != self.to.square)
    }

    pub fn is_castle(&self) -> bool {
        matches!(self.kind, MoveKind::Castle { .. })
    }

    /// A pawn reaching the last rank, whatever role it has been given.
    pub fn promoting(&self) -> bool {
        self.from.role == Role::Pawn
            && (self.to.square.rank == Rank::One || self.to.square.rank == Rank::Eight)
    }

    pub fn with_promotion(mut self, role: Role) -> Self {
        self.to.role = role;
        self
    }

    /// One move per promotion role, or just this move when not promoting.
    pub fn promotions(self) -> impl Iterator<Item = Move> {
        let roles: &'static [Role] = if self.promoting() {
            &Role::PROMOTIONS
        } else {
            &[]
        };
        let plain = (!self.promoting()).then_some(self);
        plain
            .into_iter()
            .chain(roles.iter().map(move |&role| self.with_promotion(role)))
    }

    /// Copy the ids of the moving pieces from `position`, which may hold the
    /// pieces either before or after the move.
    pub fn match_ids(&mut self, position: &Position) -> Result<(), NotationError> {
        let id = position
            .find(&self.from)
            .or_else(|| position.find(&self.to))
            .ok_or_else(|| NotationError::PieceNotFound(self.from.to_string()))?
            .id;
        self.from.id = id;
        self.to.id = id;

        match &mut self.kind {
            MoveKind::Quiet => {}
            MoveKind::Capture(captured) => {
                // only still on the board when matching before the move
                if let Some(found) = position.find(captured) {
                    captured.id = found.id;
                }
            }
            MoveKind::Castle { rook_from, rook_to } => {
                let id = position
                    .find(rook_from)
                    .or_else(|| position.find(rook_to))
                    .ok_or_else(|| NotationError::PieceNotFound(rook_from.to_string()))?
                    .id;
                rook_from.id = id;
                rook_to.id = id;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for piece in self.set() {
            write!(f, "{piece}")?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_tokens(s)?.as_slice() {
            &[from, to] => Ok(Move::quiet(from, to)),
            &[from, to, captured] => Ok(Move::capture(from, to, captured)),
            &[king_from, king_to, rook_from, rook_to] => {
                Ok(Move::castle(king_from, king_to, rook_from, rook_to))
            }
            pieces => Err(NotationError::TokenCount(pieces.len())),
        }
    }
}
