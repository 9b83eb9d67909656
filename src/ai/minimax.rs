use tracing::debug;

use crate::board::BoardState;
use crate::game::MoveSelector;
use crate::types::Color;

const MIN_SCORE: f64 = f64::NEG_INFINITY;
const MAX_SCORE: f64 = f64::INFINITY;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub score: f64,
    /// The position reached by the chosen move; the input position itself at a leaf.
    pub state: BoardState,
}

/// Minimax with alpha-beta pruning over full capture chains.
pub struct AdversarialSearch {
    depth: u8,
    side: Color,
    nodes_searched: u64,
}

impl AdversarialSearch {
    /// `side` is the maximizing color used by `search`.
    pub fn new(depth: u8, side: Color) -> Self {
        Self {
            depth,
            side,
            nodes_searched: 0,
        }
    }

    pub fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    pub fn search(
        &mut self,
        state: &BoardState,
        depth: u8,
        alpha: f64,
        beta: f64,
        maximizing: bool,
    ) -> SearchResult {
        self.nodes_searched += 1;

        let to_move = if maximizing {
            self.side
        } else {
            self.side.opponent()
        };
        let children = if depth == 0 {
            Vec::new()
        } else {
            successors(state, to_move)
        };
        if children.is_empty() {
            return SearchResult {
                score: state.evaluate(self.side),
                state: state.clone(),
            };
        }

        let mut alpha = alpha;
        let mut beta = beta;
        let mut best: Option<SearchResult> = None;

        for child in children {
            let score = self.search(&child, depth - 1, alpha, beta, !maximizing).score;
            let improves = match &best {
                None => true,
                Some(current) if maximizing => score > current.score,
                Some(current) => score < current.score,
            };
            if improves {
                best = Some(SearchResult {
                    score,
                    state: child,
                });
            }

            if maximizing {
                alpha = alpha.max(score);
            } else {
                beta = beta.min(score);
            }
            if alpha >= beta {
                break;
            }
        }

        match best {
            Some(result) => result,
            None => SearchResult {
                score: state.evaluate(self.side),
                state: state.clone(),
            },
        }
    }
}

impl MoveSelector for AdversarialSearch {
    fn select_move(&mut self, board: &BoardState, side: Color) -> Option<BoardState> {
        self.side = side;
        self.nodes_searched = 0;

        if !board.has_legal_moves(side) {
            return None;
        }

        let result = self.search(board, self.depth.max(1), MIN_SCORE, MAX_SCORE, true);
        debug!(
            side = ?side,
            depth = self.depth,
            score = result.score,
            nodes = self.nodes_searched,
            "adversarial search finished"
        );
        Some(result.state)
    }
}

/// Every position reachable in one move by `color`: pieces in row-major order, each
/// piece's destinations in generator order.
pub fn successors(state: &BoardState, color: Color) -> Vec<BoardState> {
    let mut out = Vec::new();
    for from in state.pieces(color) {
        for mv in state.valid_moves(from) {
            let mut next = state.clone();
            if next.apply(&mv) {
                out.push(next);
            }
        }
    }
    out
}
