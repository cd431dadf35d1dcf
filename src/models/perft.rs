//! Move-path enumeration for checking the generator against known counts.
//!
//! Every move is played through [`Game::play`] and taken back with
//! [`Game::backward`], so the tree bookkeeping is exercised too. Nodes the
//! walk creates are removed again on the way back.

use std::fmt;
use std::ops::AddAssign;

use tracing::{debug, trace};

use super::game::{Game, GameError};
use crate::config::PerftConfig;
use crate::domain::Move;

/// Counts over the leaf moves of a perft walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerftStats {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
    /// Moves after which the mover's own king was attacked, at any depth.
    pub self_checks: u64,
}

impl PerftStats {
    fn record_leaf(&mut self, mv: &Move, game: &Game) {
        self.nodes += 1;
        if mv.is_capture() {
            self.captures += 1;
        }
        if mv.is_en_passant() {
            self.en_passant += 1;
        }
        if mv.is_castle() {
            self.castles += 1;
        }
        if mv.promoting() {
            self.promotions += 1;
        }
        if game.in_check() {
            self.checks += 1;
        }
        if game.is_checkmate() {
            self.checkmates += 1;
        }
    }
}

impl AddAssign for PerftStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
        self.checks += rhs.checks;
        self.checkmates += rhs.checkmates;
        self.self_checks += rhs.self_checks;
    }
}

impl fmt::Display for PerftStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes {} captures {} e.p. {} castles {} promotions {} checks {} checkmates {}",
            self.nodes,
            self.captures,
            self.en_passant,
            self.castles,
            self.promotions,
            self.checks,
            self.checkmates
        )?;
        if self.self_checks > 0 {
            write!(f, " self-checks {}", self.self_checks)?;
        }
        Ok(())
    }
}

/// Count the move paths of length `depth` from the current node.
pub fn perft(game: &mut Game, depth: u32, config: &PerftConfig) -> Result<PerftStats, GameError> {
    if depth == 0 {
        return Ok(PerftStats {
            nodes: 1,
            ..PerftStats::default()
        });
    }
    Ok(divide(game, depth, config)?
        .into_iter()
        .fold(PerftStats::default(), |mut total, (_, stats)| {
            total += stats;
            total
        }))
}

/// Like [`perft`], split by first move. At depth 0 the list is empty.
pub fn divide(
    game: &mut Game,
    depth: u32,
    config: &PerftConfig,
) -> Result<Vec<(Move, PerftStats)>, GameError> {
    if depth > config.max_depth {
        return Err(GameError::DepthLimit {
            depth,
            limit: config.max_depth,
        });
    }
    if depth == 0 {
        return Ok(Vec::new());
    }

    let computer = game.computer();
    game.set_computer(None);
    let result = root_moves(game, depth);
    game.set_computer(computer);
    let divided = result?;

    debug!(depth, moves = divided.len(), "perft finished");
    Ok(divided)
}

fn root_moves(game: &mut Game, depth: u32) -> Result<Vec<(Move, PerftStats)>, GameError> {
    let mut divided = Vec::new();
    for mv in expanded_moves(game) {
        let mut stats = PerftStats::default();
        step(game, &mv, depth, &mut stats)?;
        trace!("{mv}: {}", stats.nodes);
        divided.push((mv, stats));
    }
    Ok(divided)
}

fn walk(game: &mut Game, depth: u32, stats: &mut PerftStats) -> Result<(), GameError> {
    for mv in expanded_moves(game) {
        step(game, &mv, depth, stats)?;
    }
    Ok(())
}

/// Play `mv`, count or recurse, then take it back.
fn step(game: &mut Game, mv: &Move, depth: u32, stats: &mut PerftStats) -> Result<(), GameError> {
    let parent = game.board();
    let mover = game.turn();
    let existed = game.tree().child_with(parent, &mv.to_string()).is_some();

    game.play(mv)?;
    let child = game.board();
    if let Some(king) = game.position().king(mover) {
        if game.position().is_attacked(&king) {
            stats.self_checks += 1;
        }
    }
    if depth == 1 {
        stats.record_leaf(mv, game);
    } else {
        walk(game, depth - 1, stats)?;
    }
    game.backward()?;

    if !existed {
        game.tree_mut().remove(child)?;
    }
    Ok(())
}

/// Legal moves with each promotion expanded into its four roles.
fn expanded_moves(game: &Game) -> Vec<Move> {
    game.moves()
        .iter()
        .flat_map(|&mv| mv.promotions())
        .collect()
}
