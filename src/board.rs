use crate::types::{Cell, Color, Move, Piece, Position};

pub const BOARD_SIZE: usize = 8;
pub const PIECES_PER_SIDE: u8 = 12;
const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Signed integer encoding of a board: 0 empty, ±1 man, ±2 king, B positive.
pub type Matrix = [[i8; BOARD_SIZE]; BOARD_SIZE];

/// Checkers board state: the grid plus piece bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
    remaining: [u8; 2],
    kings: [u8; 2],
    no_capture_count: u32,
}

impl BoardState {
    /// Creates the opening layout: B on rows 0..=2, A on rows 5..=7, dark squares only.
    pub fn new() -> Self {
        let mut board = Self::empty();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if col % 2 != (row + 1) % 2 {
                    continue;
                }
                let color = match row {
                    0..=2 => Color::B,
                    5..=7 => Color::A,
                    _ => continue,
                };
                board.cells[row][col] = Cell::Piece(Piece::man(color));
            }
        }
        board.remaining = [PIECES_PER_SIDE; 2];
        board
    }

    fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
            remaining: [0; 2],
            kings: [0; 2],
            no_capture_count: 0,
        }
    }

    /// Builds a board from the matrix encoding. Counters are derived from the cells;
    /// `no_capture_count` starts at 0.
    pub fn from_matrix(matrix: &Matrix) -> Result<Self, String> {
        let mut board = Self::empty();
        for (row, values) in matrix.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                let cell = match value {
                    0 => Cell::Empty,
                    1 => Cell::Piece(Piece::man(Color::B)),
                    2 => Cell::Piece(Piece::king(Color::B)),
                    -1 => Cell::Piece(Piece::man(Color::A)),
                    -2 => Cell::Piece(Piece::king(Color::A)),
                    other => {
                        return Err(format!(
                            "invalid cell value {other} at row {row}, col {col}"
                        ));
                    }
                };
                if let Cell::Piece(piece) = cell {
                    board.remaining[piece.color.index()] += 1;
                    if piece.is_king {
                        board.kings[piece.color.index()] += 1;
                    }
                }
                board.cells[row][col] = cell;
            }
        }

        for color in [Color::A, Color::B] {
            let count = board.remaining(color);
            if count > PIECES_PER_SIDE {
                return Err(format!(
                    "too many pieces for {color:?}: expected at most {PIECES_PER_SIDE}, got {count}"
                ));
            }
        }

        Ok(board)
    }

    /// Converts the board to the signed matrix encoding.
    pub fn to_matrix(&self) -> Matrix {
        let mut matrix = [[0i8; BOARD_SIZE]; BOARD_SIZE];
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                matrix[row][col] = match cell {
                    Cell::Empty => 0,
                    Cell::Piece(piece) => piece.color.sign() * if piece.is_king { 2 } else { 1 },
                };
            }
        }
        matrix
    }

    /// Row-major string over `{'0','a','A','b','B'}` used for repetition checks.
    pub fn to_position_string(&self) -> String {
        self.cells
            .iter()
            .flatten()
            .map(|cell| match cell.piece() {
                None => '0',
                Some(Piece { color: Color::A, is_king: false }) => 'a',
                Some(Piece { color: Color::A, is_king: true }) => 'A',
                Some(Piece { color: Color::B, is_king: false }) => 'b',
                Some(Piece { color: Color::B, is_king: true }) => 'B',
            })
            .collect()
    }

    /// Panics when `pos` is off the board; [`Self::piece_at`] checks the range.
    pub fn cell(&self, pos: Position) -> Cell {
        self.cells[pos.row as usize][pos.col as usize]
    }

    /// Returns the piece at `(row, col)`; out-of-range coordinates yield `None`.
    pub fn piece_at(&self, row: u8, col: u8) -> Option<Piece> {
        if !in_bounds(row, col) {
            return None;
        }
        self.cell(Position::new(row, col)).piece()
    }

    pub fn remaining(&self, color: Color) -> u8 {
        self.remaining[color.index()]
    }

    pub fn kings(&self, color: Color) -> u8 {
        self.kings[color.index()]
    }

    pub fn no_capture_count(&self) -> u32 {
        self.no_capture_count
    }

    pub(crate) fn set_no_capture_count(&mut self, count: u32) {
        self.no_capture_count = count;
    }

    /// Positions of every piece of `color`, row-major.
    pub fn pieces(&self, color: Color) -> Vec<Position> {
        let mut out = Vec::new();
        for row in 0..BOARD_SIZE as u8 {
            for col in 0..BOARD_SIZE as u8 {
                let pos = Position::new(row, col);
                if matches!(self.cell(pos).piece(), Some(piece) if piece.color == color) {
                    out.push(pos);
                }
            }
        }
        out
    }

    /// Returns the legal moves of the piece on `from`, in discovery order.
    ///
    /// Men step forward only; kings slide over any number of empty cells. A jump over
    /// an enemy with an empty cell right behind it lands there, and every landing square
    /// is probed again in all four directions for further jumps. When several chains
    /// reach the same destination the one with the most captures wins; on a tie the
    /// first discovered chain is kept.
    /// Out-of-range origins yield no moves.
    pub fn valid_moves(&self, from: Position) -> Vec<Move> {
        if !contains(from) {
            return Vec::new();
        }
        let Some(piece) = self.cell(from).piece() else {
            return Vec::new();
        };

        let mut moves = Vec::new();
        for (dr, dc) in DIAGONALS {
            if !piece.is_king && dr != piece.color.forward() {
                continue;
            }

            let mut current = from;
            while let Some(next) = current.offset(dr, dc) {
                match self.cell(next) {
                    Cell::Empty => {
                        merge_move(&mut moves, from, next, Vec::new());
                        if !piece.is_king {
                            break;
                        }
                        current = next;
                    }
                    Cell::Piece(other) if other.color != piece.color => {
                        if let Some(landing) = next.offset(dr, dc)
                            && self.is_vacant(landing, from)
                        {
                            let captured = vec![next];
                            merge_move(&mut moves, from, landing, captured.clone());
                            self.extend_chain(piece, from, landing, captured, &mut moves);
                        }
                        break;
                    }
                    Cell::Piece(_) => break,
                }
            }
        }

        moves
    }

    fn extend_chain(
        &self,
        piece: Piece,
        origin: Position,
        at: Position,
        captured: Vec<Position>,
        moves: &mut Vec<Move>,
    ) {
        for (dr, dc) in DIAGONALS {
            let mut current = at;
            while let Some(next) = current.offset(dr, dc) {
                if self.is_vacant(next, origin) {
                    if !piece.is_king {
                        break;
                    }
                    current = next;
                    continue;
                }

                if captured.contains(&next) {
                    break;
                }
                if let Cell::Piece(other) = self.cell(next)
                    && other.color != piece.color
                    && let Some(landing) = next.offset(dr, dc)
                    && self.is_vacant(landing, origin)
                {
                    let mut chain = captured.clone();
                    chain.push(next);
                    merge_move(moves, origin, landing, chain.clone());
                    self.extend_chain(piece, origin, landing, chain, moves);
                }
                break;
            }
        }
    }

    // The moving piece leaves its origin, so the origin counts as empty during a chain.
    fn is_vacant(&self, pos: Position, origin: Position) -> bool {
        pos == origin || self.cell(pos).is_empty()
    }

    /// Relocates the piece on `from` to `to`, crowning it on its promotion row.
    /// Returns `false` when either position is off the board, `from` is empty or `to`
    /// is occupied.
    pub fn move_piece(&mut self, from: Position, to: Position) -> bool {
        if !contains(from) || !contains(to) {
            return false;
        }
        let Some(mut piece) = self.cell(from).piece() else {
            return false;
        };
        if from != to && !self.cell(to).is_empty() {
            return false;
        }

        self.set(from, Cell::Empty);
        if !piece.is_king && to.row == piece.color.promotion_row() {
            piece.is_king = true;
            self.kings[piece.color.index()] += 1;
        }
        self.set(to, Cell::Piece(piece));
        true
    }

    /// Clears each listed cell and decrements the owner's counters. Off-board entries
    /// are skipped.
    pub fn remove(&mut self, pieces: &[Position]) {
        for &pos in pieces {
            if !contains(pos) {
                continue;
            }
            let Some(piece) = self.cell(pos).piece() else {
                continue;
            };
            self.set(pos, Cell::Empty);
            let idx = piece.color.index();
            self.remaining[idx] = self.remaining[idx].saturating_sub(1);
            if piece.is_king {
                self.kings[idx] = self.kings[idx].saturating_sub(1);
            }
        }
    }

    /// Moves the piece and removes everything it swept. Counters other than piece
    /// and king counts are left to the caller.
    pub fn apply(&mut self, mv: &Move) -> bool {
        if !self.move_piece(mv.from, mv.to) {
            return false;
        }
        self.remove(&mv.captured);
        true
    }

    pub fn has_legal_moves(&self, color: Color) -> bool {
        self.pieces(color)
            .into_iter()
            .any(|pos| !self.valid_moves(pos).is_empty())
    }

    /// Winner by material or mobility: a side with no pieces or no legal moves loses.
    pub fn decisive_winner(&self) -> Option<Color> {
        if self.remaining(Color::A) == 0 {
            return Some(Color::B);
        }
        if self.remaining(Color::B) == 0 {
            return Some(Color::A);
        }
        if !self.has_legal_moves(Color::A) {
            return Some(Color::B);
        }
        if !self.has_legal_moves(Color::B) {
            return Some(Color::A);
        }
        None
    }

    /// Material score from `perspective`: pieces plus half a point per king.
    pub fn evaluate(&self, perspective: Color) -> f64 {
        let other = perspective.opponent();
        let pieces = self.remaining(perspective) as f64 - self.remaining(other) as f64;
        let kings = self.kings(perspective) as f64 - self.kings(other) as f64;
        pieces + 0.5 * kings
    }

    fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.row as usize][pos.col as usize] = cell;
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn in_bounds(row: u8, col: u8) -> bool {
    (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE
}

fn contains(pos: Position) -> bool {
    in_bounds(pos.row, pos.col)
}

fn merge_move(moves: &mut Vec<Move>, from: Position, to: Position, captured: Vec<Position>) {
    if let Some(existing) = moves.iter_mut().find(|mv| mv.to == to) {
        if captured.len() > existing.captured.len() {
            existing.captured = captured;
        }
        return;
    }
    moves.push(Move { from, to, captured });
}
