//! Errors raised while decoding move and position text.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("unknown piece glyph {0:?}")]
    UnknownGlyph(char),
    #[error("bad file {0:?}, expected a-h")]
    BadFile(char),
    #[error("bad rank {0:?}, expected 1-8")]
    BadRank(char),
    #[error("token truncated after {0:?}")]
    Truncated(String),
    #[error("a move has 2, 3 or 4 tokens, found {0}")]
    TokenCount(usize),
    #[error("invalid FEN: {0}")]
    Fen(String),
    #[error("no piece matching {0} in the position")]
    PieceNotFound(String),
}
