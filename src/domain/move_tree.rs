//! The persistent game tree.
//!
//! Every node records the move that reached it as a token string; a root
//! records a whole position instead. The position at a node is the XOR of
//! all notations on its path from the root. Nodes live in an arena and are
//! addressed by index; a removed node leaves an empty slot so indices stay
//! stable. Empty slots at the end of the arena are released, so their
//! indices can be handed out again.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::chess::{Colour, Piece, from_glyph};
use super::error::NotationError;
use super::movegen::History;
use super::moves::Move;
use super::position::Position;
use super::puzzle::{Puzzle, PuzzleId};

/// Unique identifier for a node in the game tree
pub type NodeId = usize;

/// Whether a recorded continuation belongs to the solution line.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub enum Badge {
    #[default]
    Correct,
    Wrong,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("puzzle {0} does not exist")]
    UnknownPuzzle(PuzzleId),
    #[error("node {node}: {source}")]
    Notation {
        node: NodeId,
        #[source]
        source: NotationError,
    },
    #[error("cannot graft node {from} onto its own descendant {onto}")]
    GraftIntoSelf { from: NodeId, onto: NodeId },
    #[error("inconsistent tree: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A position reached by one move from its parent, or a tree root.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct BoardNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Move notation, or the full position for a root
    pieces: String,
    puzzle: Option<PuzzleId>,
    /// Last time the node was played or replayed
    pub visited: DateTime<Utc>,
    pub badge: Badge,
    pub comment: String,
}

impl BoardNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Check if this is the root node
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn pieces(&self) -> &str {
        &self.pieces
    }

    pub fn puzzle(&self) -> Option<PuzzleId> {
        self.puzzle
    }

    /// The side to move at this node: the opposite of the first token's
    /// colour (the mover, or for a root the side listed first).
    pub fn turn(&self) -> Result<Colour, NotationError> {
        let glyph = self
            .pieces
            .chars()
            .next()
            .ok_or_else(|| NotationError::Truncated(String::new()))?;
        let (colour, _) = from_glyph(glyph).ok_or(NotationError::UnknownGlyph(glyph))?;
        Ok(!colour)
    }

    /// Recency order, ties broken by creation order.
    fn recency(&self) -> (DateTime<Utc>, NodeId) {
        (self.visited, self.id)
    }
}

/// An arena of game-tree nodes plus the puzzles grouping them.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GameTree {
    nodes: Vec<Option<BoardNode>>,
    puzzles: Vec<Option<Puzzle>>,
}

impl GameTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&BoardNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    /// Mutable access to a node's metadata (visited, badge, comment).
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut BoardNode> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Get a node by ID, or an error naming it
    pub fn node(&self, id: NodeId) -> Result<&BoardNode, TreeError> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut BoardNode, TreeError> {
        self.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }

    /// Iterate over live nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &BoardNode> + '_ {
        self.nodes.iter().flatten()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Number of arena slots, live or empty. The next created node takes
    /// this id.
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    /// Get all root nodes
    pub fn roots(&self) -> impl Iterator<Item = &BoardNode> + '_ {
        self.iter().filter(|n| n.is_root())
    }

    /// Create a node under `parent` (or a new root). The node joins the
    /// parent's puzzle. Does not check for an existing child with the same
    /// notation; see [`GameTree::add_move`].
    pub fn create_node(
        &mut self,
        parent: Option<NodeId>,
        pieces: impl Into<String>,
        badge: Badge,
        visited: DateTime<Utc>,
    ) -> Result<NodeId, TreeError> {
        let puzzle = match parent {
            Some(parent) => self.node(parent)?.puzzle,
            None => None,
        };
        let id = self.nodes.len();
        let node = BoardNode {
            id,
            parent,
            children: Vec::new(),
            pieces: pieces.into(),
            puzzle,
            visited,
            badge,
            comment: String::new(),
        };
        self.nodes.push(Some(node));
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(id);
        }
        Ok(id)
    }

    /// The child of `parent` recorded with `pieces`, if any.
    pub fn child_with(&self, parent: NodeId, pieces: &str) -> Option<NodeId> {
        let parent = self.get(parent)?;
        parent
            .children
            .iter()
            .copied()
            .find(|&child| self.get(child).is_some_and(|c| c.pieces == pieces))
    }

    /// Add a move from `parent`, reusing an existing child with the same
    /// notation. Returns the node and whether it was created.
    pub fn add_move(
        &mut self,
        parent: NodeId,
        pieces: &str,
        badge: Badge,
        visited: DateTime<Utc>,
    ) -> Result<(NodeId, bool), TreeError> {
        if let Some(existing) = self.child_with(parent, pieces) {
            return Ok((existing, false));
        }
        let id = self.create_node(Some(parent), pieces, badge, visited)?;
        debug!(node = id, parent, pieces, ?badge, "created node");
        Ok((id, true))
    }

    /// Stamp a node as visited at `now`
    pub fn touch(&mut self, id: NodeId, now: DateTime<Utc>) -> Result<(), TreeError> {
        self.node_mut(id)?.visited = now;
        Ok(())
    }

    /// Set the badge of a node
    pub fn set_badge(&mut self, id: NodeId, badge: Badge) -> Result<(), TreeError> {
        self.node_mut(id)?.badge = badge;
        Ok(())
    }

    /// Replace the comment of a node
    pub fn set_comment(&mut self, id: NodeId, comment: impl Into<String>) -> Result<(), TreeError> {
        self.node_mut(id)?.comment = comment.into();
        Ok(())
    }

    /// Node IDs from the root down to `id`
    pub fn path(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = vec![id];
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            path.push(parent);
            current = self.node(parent)?;
        }
        path.reverse();
        Ok(path)
    }

    /// Half-moves from the root; a root is ply 0.
    pub fn ply(&self, id: NodeId) -> Result<usize, TreeError> {
        Ok(self.path(id)?.len() - 1)
    }

    /// Side to move at a node
    pub fn turn(&self, id: NodeId) -> Result<Colour, TreeError> {
        self.node(id)?
            .turn()
            .map_err(|source| TreeError::Notation { node: id, source })
    }

    /// Rebuild the position at `id` from the root's pieces and every move on
    /// the way down. Root pieces get ids in token order; later pieces inherit
    /// the id of the piece that moved.
    pub fn position(&self, id: NodeId) -> Result<Position, TreeError> {
        let path = self.path(id)?;
        let mut position = Position::empty();
        for &node in &path {
            let pieces = &self.node(node)?.pieces;
            let notation = |source| TreeError::Notation { node, source };
            if node == path[0] {
                position = Position::from_notation(pieces).map_err(notation)?;
            } else {
                let mut mv: Move = pieces.parse().map_err(notation)?;
                mv.match_ids(&position).map_err(notation)?;
                position.toggle_all(mv.set());
            }
        }
        Ok(position)
    }

    /// The move that reached `id`, with ids taken from `position` (either
    /// side of the move). `None` at a root.
    pub fn last_move(&self, id: NodeId, position: &Position) -> Result<Option<Move>, TreeError> {
        let node = self.node(id)?;
        if node.is_root() {
            return Ok(None);
        }
        let notation = |source| TreeError::Notation { node: id, source };
        let mut mv: Move = node.pieces.parse().map_err(notation)?;
        mv.match_ids(position).map_err(notation)?;
        Ok(Some(mv))
    }

    /// Every move notation from the root to `id`, concatenated. The root's
    /// own pieces are the starting position, not a move, and are left out.
    pub fn history(&self, id: NodeId) -> Result<String, TreeError> {
        let mut history = String::new();
        for node in self.path(id)? {
            let node = self.node(node)?;
            if !node.is_root() {
                history.push_str(&node.pieces);
            }
        }
        Ok(history)
    }

    /// A [`History`] over the moves leading to `id`, without building the
    /// string.
    pub fn history_view(&self, id: NodeId) -> PathHistory<'_> {
        PathHistory { tree: self, id }
    }

    /// The child visited most recently, which "forward" follows.
    pub fn most_recent_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?
            .children
            .iter()
            .filter_map(|&c| self.get(c))
            .max_by_key(|c| c.recency())
            .map(BoardNode::id)
    }

    /// The recorded reply to play from `id`: among children that have at
    /// least one `Correct` continuation, the one visited longest ago.
    pub fn recorded_reply(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?
            .children
            .iter()
            .filter_map(|&c| self.get(c))
            .filter(|c| {
                c.children
                    .iter()
                    .filter_map(|&g| self.get(g))
                    .any(|g| g.badge == Badge::Correct)
            })
            .min_by_key(|c| c.recency())
            .map(BoardNode::id)
    }

    /// Whether `ancestor` lies on the path from the root to `id` (a node is
    /// its own ancestor). Nodes of different puzzles are never related.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let (Some(a), Some(mut current)) = (self.get(ancestor), self.get(id)) else {
            return false;
        };
        if a.puzzle != current.puzzle {
            return false;
        }
        loop {
            if current.id == ancestor {
                return true;
            }
            match current.parent.and_then(|p| self.get(p)) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Move the children of `from` under `onto`. A child whose notation
    /// already exists under `onto` is merged into it recursively (its
    /// comment appended), any other child is re-parented with its subtree.
    /// Merged nodes stay under `from`. Empty comments are not appended.
    ///
    /// `onto` must not lie in the subtree of `from`.
    pub fn graft(&mut self, from: NodeId, onto: NodeId) -> Result<(), TreeError> {
        self.node(onto)?;
        if self.descends_from(onto, from) {
            return Err(TreeError::GraftIntoSelf { from, onto });
        }
        let children = self.node(from)?.children.clone();
        for child in children {
            let (pieces, comment) = {
                let node = self.node(child)?;
                (node.pieces.clone(), node.comment.clone())
            };
            match self.child_with(onto, &pieces) {
                Some(clone) => {
                    if !comment.is_empty() {
                        let target = &mut self.node_mut(clone)?.comment;
                        if !target.is_empty() {
                            target.push('\n');
                        }
                        target.push_str(&comment);
                    }
                    self.graft(child, clone)?;
                }
                None => self.reparent(child, onto)?,
            }
        }
        Ok(())
    }

    /// Whether `ancestor` is on the parent chain of `id`, puzzles aside.
    fn descends_from(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get(node).and_then(|n| n.parent);
        }
        false
    }

    fn reparent(&mut self, child: NodeId, parent: NodeId) -> Result<(), TreeError> {
        if let Some(old) = self.node(child)?.parent {
            self.node_mut(old)?.children.retain(|&c| c != child);
        }
        let puzzle = self.node(parent)?.puzzle;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.set_puzzle(child, puzzle)
    }

    fn set_puzzle(&mut self, id: NodeId, puzzle: Option<PuzzleId>) -> Result<(), TreeError> {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id)?;
            node.puzzle = puzzle;
            stack.extend_from_slice(&node.children);
        }
        Ok(())
    }

    /// Delete `id` and everything below it. A puzzle rooted at a deleted node
    /// is deleted too. Empty slots left at the end of the arena are dropped.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|&c| c != id);
        }
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
                continue;
            };
            stack.extend(node.children);
            for slot in &mut self.puzzles {
                if slot.as_ref().is_some_and(|p| p.board == id) {
                    *slot = None;
                }
            }
        }
        while matches!(self.nodes.last(), Some(None)) {
            self.nodes.pop();
        }
        Ok(())
    }

    /// The single opening tree: the earliest visited root that belongs to no
    /// puzzle. Created from `pieces` when there is none; when there are
    /// several, the later ones are grafted onto it and deleted.
    pub fn opening(&mut self, pieces: &str, now: DateTime<Utc>) -> Result<NodeId, TreeError> {
        let mut openings: Vec<&BoardNode> =
            self.roots().filter(|n| n.puzzle.is_none()).collect();
        openings.sort_by_key(|n| n.recency());
        let ids: Vec<NodeId> = openings.iter().map(|n| n.id).collect();

        let Some((&original, duplicates)) = ids.split_first() else {
            let id = self.create_node(None, pieces, Badge::Correct, now)?;
            debug!(node = id, "created opening tree");
            return Ok(id);
        };
        for &duplicate in duplicates {
            info!(duplicate, original, "merging duplicate opening tree");
            self.graft(duplicate, original)?;
            self.remove(duplicate)?;
        }
        Ok(original)
    }

    /// Start a puzzle at `board`; the board's subtree joins it.
    pub fn create_puzzle(&mut self, board: NodeId, now: DateTime<Utc>) -> Result<PuzzleId, TreeError> {
        self.node(board)?;
        let id = self.puzzles.len();
        self.puzzles.push(Some(Puzzle::new(id, board, now)));
        self.set_puzzle(board, Some(id))?;
        Ok(id)
    }

    /// Get a puzzle by ID
    pub fn puzzle(&self, id: PuzzleId) -> Option<&Puzzle> {
        self.puzzles.get(id).and_then(Option::as_ref)
    }

    pub fn puzzle_mut(&mut self, id: PuzzleId) -> Option<&mut Puzzle> {
        self.puzzles.get_mut(id).and_then(Option::as_mut)
    }

    /// The puzzle `node` belongs to.
    pub fn puzzle_of_mut(&mut self, node: NodeId) -> Option<&mut Puzzle> {
        let puzzle = self.get(node)?.puzzle?;
        self.puzzle_mut(puzzle)
    }

    /// Iterate over live puzzles
    pub fn puzzles(&self) -> impl Iterator<Item = &Puzzle> + '_ {
        self.puzzles.iter().flatten()
    }

    /// Puzzles to show today, earliest due first.
    pub fn puzzles_for_today(&self, now: DateTime<Utc>) -> Vec<&Puzzle> {
        let mut today: Vec<&Puzzle> = self.puzzles().filter(|p| p.on_today(now)).collect();
        today.sort_by_key(|p| p.due);
        today
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a tree and check that ids, parent links and child lists agree.
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let tree: GameTree = serde_json::from_str(json)?;
        tree.validate()?;
        Ok(tree)
    }

    fn validate(&self) -> Result<(), TreeError> {
        let corrupt = |msg: String| Err(TreeError::Corrupt(msg));
        for (index, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else { continue };
            if node.id != index {
                return corrupt(format!("node in slot {index} has id {}", node.id));
            }
            if let Some(parent) = node.parent {
                let Some(p) = self.get(parent) else {
                    return corrupt(format!("node {index} has missing parent {parent}"));
                };
                if !p.children.contains(&index) {
                    return corrupt(format!("node {parent} does not list child {index}"));
                }
            }
            for &child in &node.children {
                if self.get(child).and_then(|c| c.parent) != Some(index) {
                    return corrupt(format!("child {child} of {index} points elsewhere"));
                }
            }
            if let Some(puzzle) = node.puzzle {
                if self.puzzle(puzzle).is_none() {
                    return Err(TreeError::UnknownPuzzle(puzzle));
                }
            }
        }
        // a parent chain longer than the arena means a cycle
        for node in self.iter() {
            let mut steps = 0;
            let mut current = node;
            while let Some(parent) = current.parent.and_then(|p| self.get(p)) {
                steps += 1;
                if steps > self.nodes.len() {
                    return corrupt(format!("node {} is on a cycle", node.id));
                }
                current = parent;
            }
        }
        Ok(())
    }
}

/// Castling history read straight off the tree path.
pub struct PathHistory<'a> {
    tree: &'a GameTree,
    id: NodeId,
}

impl History for PathHistory<'_> {
    fn has_moved(&self, piece: &Piece) -> bool {
        let token = piece.to_string();
        let mut current = self.tree.get(self.id);
        while let Some(node) = current {
            let Some(parent) = node.parent else {
                break;
            };
            if node.pieces.contains(token.as_str()) {
                return true;
            }
            current = self.tree.get(parent);
        }
        false
    }
}
