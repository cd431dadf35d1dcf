//! Legal chess move generation over a persistent, branching game tree.

pub mod config;
pub mod domain;
pub mod models;

pub use config::Config;
pub use models::game::{Game, GameError};
pub use models::perft::PerftStats;

/// The standard starting position, black pieces first.
pub const START_POSITION: &str = "♜h8♟h7♞g8♟g7♝f8♟f7♚e8♟e7♛d8♟d7♝c8♟c7♞b8♟b7♜a8♟a7♙h2♖h1♙g2♘g1♙f2♗f1♙e2♔e1♙d2♕d1♙c2♗c1♙b2♘b1♙a2♖a1";
