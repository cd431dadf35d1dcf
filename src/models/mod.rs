pub mod game;
pub mod perft;

pub use game::{Game, GameError};
pub use perft::PerftStats;
