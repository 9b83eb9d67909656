use std::time::Duration;

use tracing::{debug, info, warn};
use web_time::Instant;

use crate::ai::{AdversarialSearch, EvolutionarySearch};
use crate::board::{BoardState, in_bounds};
use crate::config::{GameConfig, Strategy};
use crate::types::{Color, DrawReason, GameState, Move, Outcome, Position};

pub const REPETITION_LIMIT: usize = 3;
pub const NO_CAPTURE_LIMIT: u32 = 30;

/// Picks the automated side's move and returns the resulting position.
/// `None` means `side` has no move at all.
pub trait MoveSelector: Send {
    fn select_move(&mut self, board: &BoardState, side: Color) -> Option<BoardState>;
}

/// Owns one game: the live board, whose turn it is, the current selection and the
/// counters used for draw detection.
pub struct GameController {
    config: GameConfig,
    board: BoardState,
    turn: Color,
    selected: Option<Position>,
    valid_moves: Vec<Move>,
    /// Position strings after every ply, for repetition checks.
    history: Vec<String>,
    moves: [u32; 2],
    last_search: Option<Duration>,
    selector: Box<dyn MoveSelector>,
}

impl GameController {
    pub fn new(config: GameConfig) -> Result<Self, String> {
        config.validate()?;
        let selector = selector_for(&config);
        Ok(Self::with_selector(config, selector))
    }

    pub fn with_selector(config: GameConfig, selector: Box<dyn MoveSelector>) -> Self {
        Self {
            config,
            board: BoardState::new(),
            turn: Color::A,
            selected: None,
            valid_moves: Vec::new(),
            history: Vec::new(),
            moves: [0; 2],
            last_search: None,
            selector,
        }
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn selected(&self) -> Option<Position> {
        self.selected
    }

    /// Destinations to highlight for the selected piece.
    pub fn legal_destinations(&self) -> Vec<Position> {
        self.valid_moves.iter().map(|mv| mv.to).collect()
    }

    /// Plies played by `color` since the game started.
    pub fn move_count(&self, color: Color) -> u32 {
        self.moves[color.index()]
    }

    pub fn is_ai_turn(&self) -> bool {
        self.config.ai_color == Some(self.turn)
    }

    /// Handles a click on `(row, col)`.
    ///
    /// With a piece selected the click is first tried as a destination; when that fails
    /// the selection is dropped and the click is treated as a fresh selection. Returns
    /// `true` when a move was made or a piece of the side to move was selected.
    pub fn select(&mut self, row: u8, col: u8) -> bool {
        if !in_bounds(row, col) || self.is_ai_turn() || self.winner().is_some() {
            return false;
        }

        let pos = Position::new(row, col);
        if self.selected.is_some() {
            if self.apply_move(pos) {
                return true;
            }
            self.clear_selection();
        }

        match self.board.cell(pos).piece() {
            Some(piece) if piece.color == self.turn => {
                self.selected = Some(pos);
                self.valid_moves = self.board.valid_moves(pos);
                true
            }
            _ => false,
        }
    }

    /// Moves the selected piece to `to` if it is one of its legal destinations.
    pub fn apply_move(&mut self, to: Position) -> bool {
        if self.selected.is_none() {
            return false;
        }
        let Some(mv) = self.valid_moves.iter().find(|mv| mv.to == to).cloned() else {
            return false;
        };
        if !self.board.apply(&mv) {
            return false;
        }

        debug!(
            side = ?self.turn,
            from = ?mv.from,
            to = ?mv.to,
            captured = mv.captured.len(),
            "move applied"
        );
        self.finish_ply(mv.is_capture());
        true
    }

    /// Lets the configured engine play for the automated side and installs its result.
    /// Returns `Ok(false)` when the engine finds no move; `Err` when the game is over
    /// or it is not the engine's turn.
    pub fn do_ai_move(&mut self) -> Result<bool, String> {
        if self.winner().is_some() {
            return Err("game is already over".to_string());
        }
        let Some(ai_color) = self.config.ai_color else {
            return Err("no automated side is configured".to_string());
        };
        if self.turn != ai_color {
            return Err("it is not AI's turn".to_string());
        }

        let started = Instant::now();
        let next = self.selector.select_move(&self.board, ai_color);
        let elapsed = started.elapsed();
        self.last_search = Some(elapsed);

        let Some(mut next) = next else {
            warn!(side = ?ai_color, "automated side has no move");
            return Ok(false);
        };

        let opponent = ai_color.opponent();
        let captured = next.remaining(opponent) < self.board.remaining(opponent);
        debug!(side = ?ai_color, ?elapsed, captured, "AI move installed");
        next.set_no_capture_count(self.board.no_capture_count());
        self.board = next;
        self.finish_ply(captured);
        Ok(true)
    }

    /// The single authority on game results. A side with no pieces or no legal moves
    /// loses first; then threefold repetition; then the no-capture limit.
    pub fn winner(&self) -> Option<Outcome> {
        if let Some(color) = self.board.decisive_winner() {
            return Some(Outcome::Win(color));
        }

        let current = self.board.to_position_string();
        let seen = self.history.iter().filter(|pos| **pos == current).count();
        if seen >= REPETITION_LIMIT {
            return Some(Outcome::Draw(DrawReason::ThreefoldRepetition));
        }

        if self.board.no_capture_count() >= NO_CAPTURE_LIMIT {
            return Some(Outcome::Draw(DrawReason::MoveLimit));
        }

        None
    }

    /// Starts over from the opening with the same configuration.
    pub fn reset(&mut self) {
        self.board = BoardState::new();
        self.turn = Color::A;
        self.history.clear();
        self.moves = [0; 2];
        self.last_search = None;
        self.clear_selection();
        info!("game reset");
    }

    pub fn to_game_state(&self) -> GameState {
        let winner = self.winner();
        GameState {
            board: self.board.to_matrix().iter().flatten().copied().collect(),
            turn: self.turn,
            remaining_a: self.board.remaining(Color::A),
            remaining_b: self.board.remaining(Color::B),
            kings_a: self.board.kings(Color::A),
            kings_b: self.board.kings(Color::B),
            moves_a: self.move_count(Color::A),
            moves_b: self.move_count(Color::B),
            no_capture_count: self.board.no_capture_count(),
            selected: self.selected,
            highlighted: self.legal_destinations(),
            winner,
            winner_text: winner.map(|outcome| outcome.to_string()),
            last_search_ms: self.last_search.map(|d| d.as_secs_f64() * 1000.0),
        }
    }

    fn finish_ply(&mut self, captured: bool) {
        let count = if captured {
            0
        } else {
            self.board.no_capture_count() + 1
        };
        self.board.set_no_capture_count(count);
        self.history.push(self.board.to_position_string());
        self.moves[self.turn.index()] += 1;
        self.turn = self.turn.opponent();
        self.clear_selection();

        if let Some(outcome) = self.winner() {
            info!(%outcome, "game over");
        }
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.valid_moves.clear();
    }

    #[cfg(test)]
    fn set_board_for_test(&mut self, board: BoardState, turn: Color) {
        self.board = board;
        self.turn = turn;
        self.history.clear();
        self.clear_selection();
    }
}

fn selector_for(config: &GameConfig) -> Box<dyn MoveSelector> {
    let side = config.ai_color.unwrap_or(Color::B);
    match config.strategy {
        Strategy::Adversarial => Box::new(AdversarialSearch::new(config.search_depth(), side)),
        Strategy::Evolutionary => Box::new(EvolutionarySearch::new(config.seed)),
    }
}
