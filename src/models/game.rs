//! Game state model - a cursor into the game tree with the position at that
//! node kept up to date incrementally.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::START_POSITION;
use crate::config::ReplayConfig;
use crate::domain::move_tree::{Badge, GameTree, NodeId, TreeError};
use crate::domain::movegen;
use crate::domain::{Colour, Move, NotationError, Piece, Position, Role};

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Notation(#[from] NotationError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("already at the root")]
    NoParent,
    #[error("no move recorded after this position")]
    NoChildren,
    #[error("no {0} king on the board")]
    MissingKing(Colour),
    #[error("{0} is not a legal move here")]
    IllegalMove(String),
    #[error("depth {depth} exceeds the limit of {limit}")]
    DepthLimit { depth: u32, limit: u32 },
    #[error("not a playable position with {0} to move")]
    InvalidPosition(Colour),
}

/// The main game model: a node of the tree plus everything derived from it
pub struct Game {
    tree: GameTree,
    /// Node whose position is on the board
    board: NodeId,
    position: Position,
    /// King of the side to move
    king: Piece,
    last_move: Option<Move>,
    moves: Vec<Move>,
    in_check: bool,
    /// Side replayed from recorded lines, if any
    computer: Option<Colour>,
    strike_limit: u16,
}

impl Game {
    /// Open `node` of `tree`, rebuilding its position from the root.
    pub fn new(tree: GameTree, node: NodeId) -> Result<Self, GameError> {
        let (position, king, last_move) = derive(&tree, node)?;
        let mut game = Self {
            tree,
            board: node,
            position,
            king,
            last_move,
            moves: Vec::new(),
            in_check: false,
            computer: None,
            strike_limit: ReplayConfig::default().strike_limit,
        };
        game.generate_moves();
        Ok(game)
    }

    /// A fresh tree rooted at `pieces`. The first token's colour is the side
    /// that moved last.
    pub fn from_notation(pieces: &str) -> Result<Self, GameError> {
        let position = Position::from_notation(pieces)?;
        let mut tree = GameTree::new();
        let root = tree.create_node(None, pieces, Badge::Correct, Utc::now())?;
        let turn = tree.turn(root)?;
        if !position.is_valid(turn) {
            return Err(GameError::InvalidPosition(turn));
        }
        Self::new(tree, root)
    }

    /// A fresh tree for a FEN record. With an en passant square the root
    /// is the position before the double push, and the push is its child.
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let setup = Position::from_fen(fen)?;
        let Some(push) = setup.en_passant_push()? else {
            return Self::from_notation(&setup.position.notation(setup.turn));
        };
        let before = setup.position.symmetric_difference(push.set());
        let mut game = Self::from_notation(&before.notation(!setup.turn))?;
        game.play(&push)?;
        Ok(game)
    }

    /// The standard starting position in a new tree.
    pub fn start() -> Result<Self, GameError> {
        Self::opening(GameTree::new())
    }

    /// The opening tree of `tree`, created from the start position if missing.
    pub fn opening(mut tree: GameTree) -> Result<Self, GameError> {
        let root = tree.opening(START_POSITION, Utc::now())?;
        Self::new(tree, root)
    }

    /// Use the strike limit from `config`
    pub fn with_replay_config(mut self, config: &ReplayConfig) -> Self {
        self.strike_limit = config.strike_limit;
        self
    }

    /// Get a reference to the game tree
    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    /// Get a mutable reference to the game tree
    pub fn tree_mut(&mut self) -> &mut GameTree {
        &mut self.tree
    }

    pub fn into_tree(self) -> GameTree {
        self.tree
    }

    /// Node currently on the board
    pub fn board(&self) -> NodeId {
        self.board
    }

    /// Position at the current node
    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn king(&self) -> &Piece {
        &self.king
    }

    /// Side to move
    pub fn turn(&self) -> Colour {
        self.king.colour
    }

    /// The move that reached the current node, `None` at a root
    pub fn last_move(&self) -> Option<&Move> {
        self.last_move.as_ref()
    }

    /// Legal moves for the side to move. Promotions appear once, as a pawn.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Check if the side to move is in check
    pub fn in_check(&self) -> bool {
        self.in_check
    }

    pub fn is_checkmate(&self) -> bool {
        self.moves.is_empty() && self.in_check
    }

    pub fn is_stalemate(&self) -> bool {
        self.moves.is_empty() && !self.in_check
    }

    /// Side the computer replays, if any
    pub fn computer(&self) -> Option<Colour> {
        self.computer
    }

    pub fn set_computer(&mut self, computer: Option<Colour>) {
        self.computer = computer;
    }

    /// Moves played from the root to the current node.
    pub fn history(&self) -> Result<String, GameError> {
        Ok(self.tree.history(self.board)?)
    }

    /// Set the badge of the current node
    pub fn set_badge(&mut self, badge: Badge) -> Result<(), GameError> {
        Ok(self.tree.set_badge(self.board, badge)?)
    }

    /// Replace the comment of the current node
    pub fn set_comment(&mut self, comment: impl Into<String>) -> Result<(), GameError> {
        Ok(self.tree.set_comment(self.board, comment)?)
    }

    /// Play `mv`, which must be one of [`Game::moves`] or a promotion of one.
    ///
    /// An existing child with the same notation is reused. A new child is
    /// badged `Correct` while no computer side is set and `Wrong` otherwise.
    /// When the computer is to move afterwards it replies from the recorded
    /// lines.
    pub fn play(&mut self, mv: &Move) -> Result<(), GameError> {
        let mv = self.legal(mv)?;
        let now = Utc::now();
        let badge = if self.computer.is_none() {
            Badge::Correct
        } else {
            Badge::Wrong
        };
        let (node, _) = self.tree.add_move(self.board, &mv.to_string(), badge, now)?;
        self.board = node;
        self.apply(mv, now)?;

        if self.computer != Some(self.king.colour) {
            return Ok(());
        }
        match self.tree.node(self.board)?.badge {
            Badge::Correct => {
                if !self.computer_move()? {
                    info!(node = self.board, "end of recorded line");
                    self.finish_puzzle(now);
                }
            }
            Badge::Wrong => {
                let limit = self.strike_limit;
                if let Some(puzzle) = self.tree.puzzle_of_mut(self.board) {
                    puzzle.strikes += 1;
                    info!(puzzle = puzzle.id, strikes = puzzle.strikes, "wrong move");
                    if puzzle.strikes >= limit {
                        self.finish_puzzle(now);
                    }
                }
            }
        }
        Ok(())
    }

    /// Play the recorded reply for the side to move, which becomes the
    /// computer's side. Returns false when nothing is recorded.
    pub fn computer_move(&mut self) -> Result<bool, GameError> {
        let Some(reply) = self.tree.recorded_reply(self.board) else {
            return Ok(false);
        };
        let mv = self.move_to(reply)?;
        self.computer = Some(self.king.colour);
        info!(node = reply, %mv, "computer reply");
        self.board = reply;
        self.apply(mv, Utc::now())?;
        Ok(true)
    }

    /// Follow the most recently visited child.
    pub fn forward(&mut self) -> Result<(), GameError> {
        let child = self
            .tree
            .most_recent_child(self.board)
            .ok_or(GameError::NoChildren)?;
        let mv = self.move_to(child)?;
        self.board = child;
        self.apply(mv, Utc::now())
    }

    /// Undo the last move.
    pub fn backward(&mut self) -> Result<(), GameError> {
        let parent = self
            .tree
            .node(self.board)?
            .parent()
            .ok_or(GameError::NoParent)?;
        let mv = self.last_move.ok_or(GameError::NoParent)?;
        self.board = parent;
        self.apply(mv, Utc::now())
    }

    /// Jump to any node, rebuilding the position from its root.
    pub fn go_to(&mut self, node: NodeId) -> Result<(), GameError> {
        let (position, king, last_move) = derive(&self.tree, node)?;
        debug!(node, "go to");
        self.board = node;
        self.position = position;
        self.king = king;
        self.last_move = last_move;
        self.generate_moves();
        Ok(())
    }

    /// The generated move matching `mv`, with its piece ids. A promotion
    /// must name one of the promotion roles; a pawn may not stay a pawn.
    fn legal(&self, mv: &Move) -> Result<Move, GameError> {
        self.moves
            .iter()
            .find_map(|m| {
                if !m.promoting() {
                    (m == mv).then_some(*m)
                } else if Role::PROMOTIONS.contains(&mv.to.role) {
                    let promoted = m.with_promotion(mv.to.role);
                    (promoted == *mv).then_some(promoted)
                } else {
                    None
                }
            })
            .ok_or_else(|| GameError::IllegalMove(mv.to_string()))
    }

    /// The move from the current node to its child `node`.
    fn move_to(&self, node: NodeId) -> Result<Move, GameError> {
        self.tree.last_move(node, &self.position)?.ok_or_else(|| {
            TreeError::Corrupt(format!("node {node} has no move")).into()
        })
    }

    /// XOR `mv` into the position after `board` has been moved to the
    /// node on the other side of it. Works in both directions.
    fn apply(&mut self, mv: Move, now: DateTime<Utc>) -> Result<(), GameError> {
        self.tree.touch(self.board, now)?;
        self.position.toggle_all(mv.set());
        let turn = !self.king.colour;
        self.king = self
            .position
            .king(turn)
            .ok_or(GameError::MissingKing(turn))?;
        // going backward the last move is the parent's, not `mv`
        self.last_move = match self.tree.last_move(self.board, &self.position)? {
            Some(last) if last == mv => Some(mv),
            other => other,
        };
        debug!(node = self.board, %mv, "applied");
        self.generate_moves();
        Ok(())
    }

    fn finish_puzzle(&mut self, now: DateTime<Utc>) {
        self.computer = None;
        if let Some(puzzle) = self.tree.puzzle_of_mut(self.board) {
            puzzle.reschedule(now);
            info!(puzzle = puzzle.id, due = %puzzle.due, "puzzle rescheduled");
        }
    }

    fn generate_moves(&mut self) {
        let history = self.tree.history_view(self.board);
        let generated = movegen::generate(
            &self.position,
            &self.king,
            self.last_move.as_ref(),
            &history,
        );
        self.moves = generated.moves;
        self.in_check = generated.checks > 0;
    }
}

/// Position, king to move and last move at `node`.
fn derive(tree: &GameTree, node: NodeId) -> Result<(Position, Piece, Option<Move>), GameError> {
    let position = tree.position(node)?;
    let turn = tree.turn(node)?;
    let king = position.king(turn).ok_or(GameError::MissingKing(turn))?;
    let last_move = tree.last_move(node, &position)?;
    Ok((position, king, last_move))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[test]
    fn test_start() {
        let game = Game::start().unwrap();
        assert_eq!(game.turn(), Colour::White);
        assert_eq!(game.moves().len(), 20);
        assert!(!game.in_check());
        assert!(game.last_move().is_none());
        assert_eq!(game.history().unwrap(), "");
    }

    #[test]
    fn test_play_and_backward_restore_position() {
        let mut game = Game::start().unwrap();
        let start = game.position().clone();
        game.play(&mv("♙e2♙e4")).unwrap();
        assert_eq!(game.turn(), Colour::Black);
        assert_eq!(game.history().unwrap(), "♙e2♙e4");
        assert_eq!(game.last_move().unwrap().to_string(), "♙e2♙e4");

        game.backward().unwrap();
        assert_eq!(game.position(), &start);
        assert_eq!(game.turn(), Colour::White);
        assert!(matches!(game.backward(), Err(GameError::NoParent)));

        game.forward().unwrap();
        assert_eq!(game.history().unwrap(), "♙e2♙e4");
        assert!(matches!(game.forward(), Err(GameError::NoChildren)));
    }

    #[test]
    fn test_replaying_a_move_reuses_the_node() {
        let mut game = Game::start().unwrap();
        game.play(&mv("♘g1♘f3")).unwrap();
        let first = game.board();
        game.backward().unwrap();
        game.play(&mv("♘g1♘f3")).unwrap();
        assert_eq!(game.board(), first);
        assert_eq!(game.tree().len(), 2);
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let mut game = Game::start().unwrap();
        assert!(matches!(
            game.play(&mv("♙e2♙e5")),
            Err(GameError::IllegalMove(_))
        ));
        assert!(matches!(
            game.play(&mv("♙e2♕e3")),
            Err(GameError::IllegalMove(_))
        ));
        assert_eq!(game.tree().len(), 1);
    }

    #[test]
    fn test_unpromoted_pawn_is_rejected() {
        let mut game = Game::from_notation("♚h8♔a1♙b7").unwrap();
        assert!(matches!(
            game.play(&mv("♙b7♙b8")),
            Err(GameError::IllegalMove(_))
        ));
        assert!(matches!(
            game.play(&mv("♙b7♔b8")),
            Err(GameError::IllegalMove(_))
        ));
        assert_eq!(game.tree().len(), 1);
        assert!(game.position().contains(&"♙b7".parse().unwrap()));

        game.play(&mv("♙b7♕b8")).unwrap();
        assert_eq!(game.history().unwrap(), "♙b7♕b8");
    }

    #[test]
    fn test_promotion_keeps_piece_id() {
        let mut game = Game::from_notation("♚h8♔a1♙b7").unwrap();
        let pawn_id = game.position().find(&"♙b7".parse().unwrap()).unwrap().id;
        game.play(&mv("♙b7♘b8")).unwrap();
        let knight = game.position().find(&"♘b8".parse().unwrap()).unwrap();
        assert_eq!(knight.id, pawn_id);
        game.backward().unwrap();
        assert!(game.position().contains(&"♙b7".parse().unwrap()));
    }

    #[test]
    fn test_checkmate_and_stalemate() {
        // back rank mate with the rook on a8
        let game = Game::from_notation("♖a8♚h8♟g7♟h7♔a1").unwrap();
        assert!(game.in_check());
        assert!(game.is_checkmate());

        let game = Game::from_notation("♕g6♚h8♔a1").unwrap();
        assert!(game.is_stalemate());
        assert!(!game.is_checkmate());
    }

    #[test]
    fn test_invalid_position() {
        // the side that just moved may not be left in check
        assert!(matches!(
            Game::from_notation("♚e8♔e1♖e7"),
            Err(GameError::InvalidPosition(Colour::White))
        ));
        assert!(matches!(
            Game::from_notation("♚e8♔e1♙a8"),
            Err(GameError::InvalidPosition(Colour::White))
        ));
    }

    #[test]
    fn test_from_fen() {
        let game = Game::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(game.turn(), Colour::White);
        assert_eq!(game.moves().len(), 14);
    }

    #[test]
    fn test_from_fen_castling_rights() {
        let game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(game.moves().iter().filter(|m| m.is_castle()).count(), 2);
        assert!(matches!(
            Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1"),
            Err(GameError::Notation(NotationError::Fen(_)))
        ));
    }

    #[test]
    fn test_from_fen_en_passant() {
        let fen = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        let game = Game::from_fen(fen).unwrap();
        assert_eq!(game.turn(), Colour::White);
        assert_eq!(game.history().unwrap(), "♟d7♟d5");
        assert_eq!(game.last_move().unwrap().to_string(), "♟d7♟d5");
        assert!(game.moves().contains(&mv("♙e5♙d6♟d5")));
        assert_eq!(game.tree().len(), 2);

        let setup = Position::from_fen(fen).unwrap();
        assert_eq!(game.position(), &setup.position);

        let without = Game::from_fen(&fen.replace(" d6 ", " - ")).unwrap();
        assert!(!without.moves().contains(&mv("♙e5♙d6♟d5")));
    }
}
