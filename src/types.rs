use std::fmt;

use serde::{Deserialize, Serialize};

/// Side of the board. `A` starts on rows 5..=7 and moves toward row 0,
/// `B` starts on rows 0..=2 and moves toward row 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    A,
    B,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Row direction a man of this color moves in.
    pub fn forward(self) -> i32 {
        match self {
            Self::A => -1,
            Self::B => 1,
        }
    }

    /// The row where a man of this color is crowned.
    pub fn promotion_row(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 7,
        }
    }

    /// Sign used by the integer matrix encoding.
    pub fn sign(self) -> i8 {
        match self {
            Self::A => -1,
            Self::B => 1,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub color: Color,
    pub is_king: bool,
}

impl Piece {
    pub fn man(color: Color) -> Self {
        Self {
            color,
            is_king: false,
        }
    }

    pub fn king(color: Color) -> Self {
        Self {
            color,
            is_king: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Piece(Piece),
}

impl Cell {
    pub fn piece(self) -> Option<Piece> {
        match self {
            Self::Empty => None,
            Self::Piece(piece) => Some(piece),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Steps `(dr, dc)` away, or `None` past the board edge.
    pub fn offset(self, dr: i32, dc: i32) -> Option<Self> {
        let row = self.row as i32 + dr;
        let col = self.col as i32 + dc;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Self::new(row as u8, col as u8))
        } else {
            None
        }
    }
}

/// A destination together with the pieces swept on the way there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub captured: Vec<Position>,
}

impl Move {
    pub fn is_capture(&self) -> bool {
        !self.captured.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrawReason {
    ThreefoldRepetition,
    MoveLimit,
}

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Win(Color),
    Draw(DrawReason),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win(Color::A) => write!(f, "A"),
            Self::Win(Color::B) => write!(f, "B"),
            Self::Draw(DrawReason::ThreefoldRepetition) => {
                write!(f, "Draw due to threefold repetition")
            }
            Self::Draw(DrawReason::MoveLimit) => write!(f, "Draw due to 30-move rule"),
        }
    }
}

/// Public game state returned from WASM APIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameState {
    /// Row-major cells in matrix encoding: 0 empty, ±1 man, ±2 king (B positive).
    pub board: Vec<i8>,
    pub turn: Color,
    pub remaining_a: u8,
    pub remaining_b: u8,
    pub kings_a: u8,
    pub kings_b: u8,
    pub moves_a: u32,
    pub moves_b: u32,
    pub no_capture_count: u32,
    pub selected: Option<Position>,
    pub highlighted: Vec<Position>,
    pub winner: Option<Outcome>,
    /// Contract:
    /// - `None` while no game is over.
    /// - Otherwise the display text of `winner`.
    pub winner_text: Option<String>,
    pub last_search_ms: Option<f64>,
}
