//! Legal move generation.
//!
//! Candidates are generated broadly per piece and then filtered by playing
//! each one and looking at the mover's king. No pin or block analysis is
//! done up front.

use super::chess::{Movement, Piece, Role};
use super::moves::Move;
use super::position::{CheckScan, Position};
use super::square::{File, Square};

/// Which pieces have moved earlier in the game.
pub trait History {
    /// True if `piece`'s token (glyph and square) occurs in a move played
    /// so far. For a king or rook on its home square that means it has moved
    /// away at some point, or been captured there.
    fn has_moved(&self, piece: &Piece) -> bool;
}

/// A concatenation of move tokens.
impl History for str {
    fn has_moved(&self, piece: &Piece) -> bool {
        self.contains(piece.to_string().as_str())
    }
}

/// Legal moves plus the number of pieces checking the side to move.
#[derive(Clone, Debug, Default)]
pub struct Generated {
    pub moves: Vec<Move>,
    pub checks: u32,
}

/// Every legal move for `king`'s side.
///
/// `last_move` is the opponent's previous move (for en passant). Moves onto
/// the last rank are returned once with the pawn role; callers pick the
/// promotion role.
pub fn generate<H: History + ?Sized>(
    position: &Position,
    king: &Piece,
    last_move: Option<&Move>,
    history: &H,
) -> Generated {
    let (mut moves, checks) = candidates(position, king, last_move, history);
    moves.retain(|m| is_legal(position, king, m));
    Generated { moves, checks }
}

/// Candidate moves before the king-safety filter.
pub fn pseudo_legal_moves<H: History + ?Sized>(
    position: &Position,
    king: &Piece,
    last_move: Option<&Move>,
    history: &H,
) -> Vec<Move> {
    candidates(position, king, last_move, history).0
}

fn candidates<H: History + ?Sized>(
    position: &Position,
    king: &Piece,
    last_move: Option<&Move>,
    history: &H,
) -> (Vec<Move>, u32) {
    let checks = position.checks(king, CheckScan::All);
    let mut generator = Generator {
        position,
        king,
        last_move,
        moves: Vec::with_capacity(48),
    };

    match checks {
        0 => {
            generator.castling(history);
            generator.all_pieces();
        }
        1 => generator.all_pieces(),
        // only the king can answer a double check
        _ => generator.jumping(king),
    }
    (generator.moves, checks)
}

pub fn legal_moves<H: History + ?Sized>(
    position: &Position,
    king: &Piece,
    last_move: Option<&Move>,
    history: &H,
) -> Vec<Move> {
    generate(position, king, last_move, history).moves
}

/// Whether playing `candidate` leaves the mover's king safe.
fn is_legal(position: &Position, king: &Piece, candidate: &Move) -> bool {
    let next = position.symmetric_difference(candidate.set());
    if candidate.to.role == Role::King {
        !next.is_attacked(&candidate.to)
    } else {
        !next.is_attacked(king)
    }
}

struct Generator<'a> {
    position: &'a Position,
    king: &'a Piece,
    last_move: Option<&'a Move>,
    moves: Vec<Move>,
}

impl Generator<'_> {
    fn all_pieces(&mut self) {
        let position = self.position;
        for piece in position.pieces_of(self.king.colour) {
            match piece.role.movement() {
                Movement::Pawn => self.pawn(piece),
                Movement::Jump => self.jumping(piece),
                Movement::Slide => self.sliding(piece),
            }
        }
    }

    /// Step onto an empty square, or capture on an enemy one.
    fn step(&mut self, from: &Piece, to: Piece) -> bool {
        match self.position.get(to.square) {
            None => {
                self.moves.push(Move::quiet(*from, to));
                true
            }
            Some(occupant) => {
                if occupant.colour != from.colour {
                    self.moves.push(Move::capture(*from, to, *occupant));
                }
                false
            }
        }
    }

    fn jumping(&mut self, from: &Piece) {
        for &offset in from.role.offsets(from.colour) {
            if let Some(to) = from.shift(offset) {
                self.step(from, to);
            }
        }
    }

    fn sliding(&mut self, from: &Piece) {
        for &direction in from.role.offsets(from.colour) {
            for distance in 1..=7 {
                let Some(to) = from.shift(distance * direction) else {
                    break;
                };
                if !self.step(from, to) {
                    break;
                }
            }
        }
    }

    fn pawn(&mut self, from: &Piece) {
        let push = from.colour.forward();

        if let Some(one) = from.shift(push) {
            if self.position.get(one.square).is_none() {
                self.moves.push(Move::quiet(*from, one));
                if from.square.rank == from.colour.pawn_rank() {
                    if let Some(two) = one.shift(push) {
                        if self.position.get(two.square).is_none() {
                            self.moves.push(Move::quiet(*from, two));
                        }
                    }
                }
            }
        }

        for &attack in Role::Pawn.offsets(from.colour) {
            let Some(to) = from.shift(attack) else {
                continue;
            };
            match self.position.get(to.square) {
                Some(occupant) => {
                    if occupant.colour != from.colour {
                        self.moves.push(Move::capture(*from, to, *occupant));
                    }
                }
                None => {
                    if let Some(double) = self.en_passant_target(from, &to) {
                        self.moves.push(Move::capture(*from, to, double));
                    }
                }
            }
        }
    }

    /// The enemy pawn that just advanced two squares past `to`, beside `from`.
    fn en_passant_target(&self, from: &Piece, to: &Piece) -> Option<Piece> {
        let last = self.last_move?;
        let advanced = last.to.role == Role::Pawn
            && (last.from.square.rank.y() - last.to.square.rank.y()).abs() == 2
            && last.to.square.rank == from.square.rank
            && last.to.square.file == to.square.file;
        advanced.then_some(last.to)
    }

    /// Castling with the king and a rook on their home squares, neither
    /// having moved, nothing in between, and the square the rook lands on
    /// (which the king crosses) not attacked. Only called when not in check.
    fn castling<H: History + ?Sized>(&mut self, history: &H) {
        let king = *self.king;
        let rank = king.colour.back_rank();
        if king.square != Square::new(File::E, rank) || history.has_moved(&king) {
            return;
        }

        let sides = [
            (File::H, File::G, File::F, &[File::F, File::G][..]),
            (File::A, File::C, File::D, &[File::B, File::C, File::D][..]),
        ];
        for (corner, king_file, rook_file, between) in sides {
            if between
                .iter()
                .any(|&file| self.position.at(file, rank).is_some())
            {
                continue;
            }
            let Some(&rook) = self.position.at(corner, rank) else {
                continue;
            };
            if rook.role != Role::Rook || rook.colour != king.colour {
                continue;
            }
            let rook_to = rook.on(Square::new(rook_file, rank));
            if history.has_moved(&rook) || self.position.is_attacked(&rook_to) {
                continue;
            }
            let king_to = king.on(Square::new(king_file, rank));
            self.moves.push(Move::castle(king, king_to, rook, rook_to));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chess::Colour;

    fn moves_for(notation: &str, turn: Colour, last: Option<&str>, history: &str) -> Vec<String> {
        let position = Position::from_notation(notation).unwrap();
        let king = position.king(turn).unwrap();
        let last: Option<Move> = last.map(|m| m.parse().unwrap());
        let mut moves: Vec<String> = legal_moves(&position, &king, last.as_ref(), history)
            .iter()
            .map(Move::to_string)
            .collect();
        moves.sort();
        moves
    }

    #[test]
    fn test_start_position_has_twenty_moves() {
        let moves = moves_for(crate::START_POSITION, Colour::White, None, "");
        assert_eq!(moves.len(), 20);
        assert!(moves.contains(&"♙e2♙e4".to_string()));
        assert!(moves.contains(&"♘g1♘f3".to_string()));
    }

    #[test]
    fn test_double_push_needs_both_squares_empty() {
        let moves = moves_for("♚h8♞e3♔a1♙e2", Colour::White, None, "");
        assert!(!moves.iter().any(|m| m.starts_with("♙e2")));
        let moves = moves_for("♚h8♞e4♔a1♙e2", Colour::White, None, "");
        assert!(moves.contains(&"♙e2♙e3".to_string()));
        assert!(!moves.contains(&"♙e2♙e4".to_string()));
    }

    #[test]
    fn test_en_passant_only_right_after_double_push() {
        let notation = "♚h8♟d5♔a1♙e5";
        let moves = moves_for(notation, Colour::White, Some("♟d7♟d5"), "");
        assert!(moves.contains(&"♙e5♙d6♟d5".to_string()));

        let moves = moves_for(notation, Colour::White, Some("♟d6♟d5"), "");
        assert!(!moves.iter().any(|m| m.starts_with("♙e5♙d6")));
    }

    #[test]
    fn test_en_passant_exposing_king_is_filtered() {
        // capturing removes both pawns from the fifth rank and opens the rook
        let moves = moves_for("♜h5♚h8♟d5♔a5♙e5", Colour::White, Some("♟d7♟d5"), "");
        assert!(!moves.contains(&"♙e5♙d6♟d5".to_string()));
    }

    #[test]
    fn test_pinned_piece_cannot_leave_the_line() {
        let moves = moves_for("♜e8♚h8♔e1♘e4", Colour::White, None, "");
        assert!(!moves.iter().any(|m| m.starts_with("♘e4")));

        let position = Position::from_notation("♜e8♚h8♔e1♘e4").unwrap();
        let king = position.king(Colour::White).unwrap();
        let candidates = pseudo_legal_moves(&position, &king, None, "");
        assert!(candidates.iter().any(|m| m.from.role == Role::Knight));
    }

    #[test]
    fn test_double_check_allows_only_king_moves() {
        // rook on e8 and knight on d3 both check the king on e1
        let position = Position::from_notation("♜e8♚h8♞d3♔e1♕d1♖a2").unwrap();
        let king = position.king(Colour::White).unwrap();
        let generated = generate(&position, &king, None, "");
        assert_eq!(generated.checks, 2);
        assert!(!generated.moves.is_empty());
        assert!(generated.moves.iter().all(|m| m.from.role == Role::King));
        // the queen could take the knight, but that leaves the rook's check
        assert!(!generated.moves.iter().any(|m| m.from.role == Role::Queen));
        for m in &generated.moves {
            let next = position.symmetric_difference(m.set());
            assert_eq!(next.checks(&m.to, CheckScan::All), 0, "{m}");
        }
    }

    #[test]
    fn test_castling_both_sides() {
        let notation = "♚e8♔e1♖h1♖a1";
        let moves = moves_for(notation, Colour::White, None, "");
        assert!(moves.contains(&"♔e1♔g1♖h1♖f1".to_string()));
        assert!(moves.contains(&"♔e1♔c1♖a1♖d1".to_string()));
    }

    #[test]
    fn test_castling_blocked_by_attacked_transit_square() {
        // the bishop on c4 covers f1
        let moves = moves_for("♚e8♝c4♔e1♖h1♖a1", Colour::White, None, "");
        assert!(!moves.contains(&"♔e1♔g1♖h1♖f1".to_string()));
        assert!(moves.contains(&"♔e1♔c1♖a1♖d1".to_string()));
    }

    #[test]
    fn test_castling_needs_unmoved_pieces() {
        let notation = "♚e8♔e1♖h1♖a1";
        let moves = moves_for(notation, Colour::White, None, "♖h1♖h2♚e8♚d8♖h2♖h1♚d8♚e8");
        assert!(!moves.contains(&"♔e1♔g1♖h1♖f1".to_string()));
        assert!(moves.contains(&"♔e1♔c1♖a1♖d1".to_string()));

        let moves = moves_for(notation, Colour::White, None, "♔e1♔e2♚e8♚d8♔e2♔e1♚d8♚e8");
        assert!(!moves.iter().any(|m| m.chars().count() == 12));
    }

    #[test]
    fn test_no_castling_out_of_check() {
        let moves = moves_for("♜e8♚h8♔e1♖h1", Colour::White, None, "");
        assert!(!moves.contains(&"♔e1♔g1♖h1♖f1".to_string()));
    }
}
