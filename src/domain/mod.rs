pub mod chess;
pub mod error;
pub mod move_tree;
pub mod movegen;
pub mod moves;
pub mod position;
pub mod puzzle;
pub mod square;

pub use chess::{Colour, Piece, PieceId, Role};
pub use error::NotationError;
pub use move_tree::{Badge, BoardNode, GameTree, NodeId, TreeError};
pub use movegen::History;
pub use moves::{Move, MoveKind};
pub use position::{CheckScan, FenSetup, Position};
pub use puzzle::{Phase, Puzzle, PuzzleId};
pub use square::{File, Offset, Rank, Square};
