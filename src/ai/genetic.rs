//! Evolutionary move selection over the signed matrix encoding.
//!
//! Unlike [`crate::ai::minimax`], candidates are single diagonal steps and single
//! jumps only: capture chains are not followed here.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::board::{BOARD_SIZE, BoardState, Matrix};
use crate::game::MoveSelector;
use crate::types::{Color, Position};

pub const MAX_GENERATIONS: usize = 20;
pub const MUTATION_RATE: f64 = 0.01;

const CAPTURE_REWARD: i32 = 10;
const CENTER_REWARD: i32 = 2;
const EXPOSURE_PENALTY: i32 = 5;
const MOBILITY_REWARD: i32 = 1;
const MAX_RESAMPLES: usize = 1_000;
const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// A single step or single jump together with the matrix it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub from: Position,
    pub to: Position,
    pub result: Matrix,
}

pub struct EvolutionarySearch {
    rng: StdRng,
    generations: usize,
    mutation_rate: f64,
}

impl EvolutionarySearch {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            generations: MAX_GENERATIONS,
            mutation_rate: MUTATION_RATE,
        }
    }

    /// Runs up to [`MAX_GENERATIONS`] rounds of selection, crossover and mutation and
    /// returns the fittest offspring seen in any round, with its fitness.
    /// Returns `None` when `side` has no candidate move.
    pub fn search(&mut self, matrix: &Matrix, side: Color) -> Option<(Candidate, i32)> {
        let mut best: Option<(Candidate, i32)> = None;

        for generation in 0..self.generations {
            let candidates = generate_possible_moves(matrix, side);
            match candidates.len() {
                0 => {
                    debug!(side = ?side, "no candidate moves");
                    break;
                }
                1 => {
                    let fitness = calculate_fitness(&candidates[0].result, matrix, side);
                    best = candidates.into_iter().next().map(|only| (only, fitness));
                    break;
                }
                _ => {}
            }

            let fitness: Vec<i32> = candidates
                .iter()
                .map(|candidate| calculate_fitness(&candidate.result, matrix, side))
                .collect();
            let parents = rank_selection(&fitness, 2, &mut self.rng);
            let max_index = candidates.len() - 1;
            let (first, second) = self.breed(parents[0], parents[1], max_index);

            for index in [first, second] {
                if best.as_ref().is_none_or(|(_, score)| fitness[index] > *score) {
                    best = Some((candidates[index].clone(), fitness[index]));
                }
            }
            debug!(generation, first, second, "offspring evaluated");
        }

        best
    }

    fn breed(&mut self, first: usize, second: usize, max_index: usize) -> (usize, usize) {
        let width = bit_width(max_index);
        let first_bits = encode_index(first, width);
        let second_bits = encode_index(second, width);

        for _ in 0..MAX_RESAMPLES {
            let (left, right) = crossover_binary(&first_bits, &second_bits, &mut self.rng);
            let left = decode_index(&mutate_binary(&left, self.mutation_rate, &mut self.rng));
            let right = decode_index(&mutate_binary(&right, self.mutation_rate, &mut self.rng));
            if left <= max_index && right <= max_index {
                return (left, right);
            }
        }

        (first, second)
    }
}

impl MoveSelector for EvolutionarySearch {
    /// `None` when `side` has no candidate, or when the chosen matrix cannot be turned
    /// back into a board. Generated candidates always decode, so the second case is
    /// logged and asserted in debug builds.
    fn select_move(&mut self, board: &BoardState, side: Color) -> Option<BoardState> {
        let (candidate, fitness) = self.search(&board.to_matrix(), side)?;
        debug!(
            side = ?side,
            from = ?candidate.from,
            to = ?candidate.to,
            fitness,
            "evolutionary search finished"
        );
        match BoardState::from_matrix(&candidate.result) {
            Ok(next) => Some(next),
            Err(err) => {
                warn!(%err, "evolutionary search produced an invalid board");
                debug_assert!(false, "candidate matrix must decode: {err}");
                None
            }
        }
    }
}

/// Every single step and single jump for the pieces of `side`, row-major.
/// A man that lands on its promotion row is crowned in the resulting matrix.
pub fn generate_possible_moves(matrix: &Matrix, side: Color) -> Vec<Candidate> {
    let mut out = Vec::new();

    for row in 0..BOARD_SIZE as u8 {
        for col in 0..BOARD_SIZE as u8 {
            let from = Position::new(row, col);
            let value = at(matrix, from);
            if value.signum() != side.sign() {
                continue;
            }

            for (dr, dc) in DIAGONALS {
                if let Some(to) = from.offset(dr, dc)
                    && at(matrix, to) == 0
                {
                    out.push(candidate(matrix, side, from, to, None));
                }
            }
            for (dr, dc) in DIAGONALS {
                if let Some(mid) = from.offset(dr, dc)
                    && let Some(to) = from.offset(2 * dr, 2 * dc)
                    && at(matrix, mid).signum() == -side.sign()
                    && at(matrix, to) == 0
                {
                    out.push(candidate(matrix, side, from, to, Some(mid)));
                }
            }
        }
    }

    out
}

fn candidate(
    matrix: &Matrix,
    side: Color,
    from: Position,
    to: Position,
    jumped: Option<Position>,
) -> Candidate {
    let mut result = *matrix;
    let mut value = at(matrix, from);
    if value.abs() == 1 && to.row == side.promotion_row() {
        value = 2 * side.sign();
    }
    result[from.row as usize][from.col as usize] = 0;
    if let Some(mid) = jumped {
        result[mid.row as usize][mid.col as usize] = 0;
    }
    result[to.row as usize][to.col as usize] = value;
    Candidate { from, to, result }
}

/// Heuristic score of `result` for `side`, relative to `original`.
///
/// Captures are worth the most, then advancement toward the promotion row, central
/// squares and free neighbouring cells. Each adjacent enemy with an empty cell behind
/// the own piece counts as a recapture threat.
pub fn calculate_fitness(result: &Matrix, original: &Matrix, side: Color) -> i32 {
    let enemy = -side.sign();
    let enemies = |matrix: &Matrix| {
        matrix
            .iter()
            .flatten()
            .filter(|value| value.signum() == enemy)
            .count() as i32
    };

    let mut fitness = (enemies(original) - enemies(result)) * CAPTURE_REWARD;
    let rows = BOARD_SIZE as i32;

    for row in 0..BOARD_SIZE as u8 {
        for col in 0..BOARD_SIZE as u8 {
            let pos = Position::new(row, col);
            if at(result, pos).signum() != side.sign() {
                continue;
            }

            let distance = (side.promotion_row() as i32 - row as i32).abs();
            fitness += rows - distance;
            if (2..=5).contains(&row) && (2..=5).contains(&col) {
                fitness += CENTER_REWARD;
            }

            for (dr, dc) in DIAGONALS {
                let Some(neighbour) = pos.offset(dr, dc) else {
                    continue;
                };
                match at(result, neighbour) {
                    0 => fitness += MOBILITY_REWARD,
                    value if value.signum() == enemy => {
                        if let Some(behind) = pos.offset(-dr, -dc)
                            && at(result, behind) == 0
                        {
                            fitness -= EXPOSURE_PENALTY;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fitness
}

/// Draws `count` candidate indices with replacement. Candidates are ranked by fitness;
/// the best of `n` gets weight `n`, the worst weight 1, each divided by `n(n+1)/2`.
pub fn rank_selection<R: Rng + ?Sized>(fitness: &[i32], count: usize, rng: &mut R) -> Vec<usize> {
    if fitness.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<usize> = (0..fitness.len()).collect();
    ranked.sort_by(|&left, &right| fitness[right].cmp(&fitness[left]));

    let n = ranked.len();
    let total = (n * (n + 1) / 2) as f64;
    let mut cumulative = Vec::with_capacity(n);
    let mut running = 0.0;
    for rank in 0..n {
        running += (n - rank) as f64 / total;
        cumulative.push(running);
    }

    (0..count)
        .map(|_| {
            let draw: f64 = rng.r#gen();
            let slot = cumulative
                .iter()
                .position(|&threshold| draw <= threshold)
                .unwrap_or(n - 1);
            ranked[slot]
        })
        .collect()
}

/// Number of bits needed to write `max_index` in binary (at least 1).
pub fn bit_width(max_index: usize) -> usize {
    (usize::BITS - max_index.leading_zeros()).max(1) as usize
}

pub fn encode_index(index: usize, width: usize) -> String {
    format!("{index:0width$b}")
}

pub fn decode_index(bits: &str) -> usize {
    bits.bytes()
        .fold(0, |acc, bit| (acc << 1) | usize::from(bit == b'1'))
}

/// Single-point crossover at an interior cut. Strings shorter than two bits have no
/// interior cut and are returned unchanged.
pub fn crossover_binary<R: Rng + ?Sized>(first: &str, second: &str, rng: &mut R) -> (String, String) {
    let len = first.len().min(second.len());
    if len < 2 {
        return (first.to_string(), second.to_string());
    }

    let cut = rng.gen_range(1..len);
    (
        format!("{}{}", &first[..cut], &second[cut..]),
        format!("{}{}", &second[..cut], &first[cut..]),
    )
}

/// Flips each bit independently with probability `rate`.
pub fn mutate_binary<R: Rng + ?Sized>(bits: &str, rate: f64, rng: &mut R) -> String {
    bits.chars()
        .map(|bit| {
            let draw: f64 = rng.r#gen();
            match (draw < rate, bit) {
                (true, '1') => '0',
                (true, _) => '1',
                (false, bit) => bit,
            }
        })
        .collect()
}

fn at(matrix: &Matrix, pos: Position) -> i8 {
    matrix[pos.row as usize][pos.col as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_from(pieces: &[(usize, usize, i8)]) -> Matrix {
        let mut matrix = [[0i8; BOARD_SIZE]; BOARD_SIZE];
        for &(row, col, value) in pieces {
            matrix[row][col] = value;
        }
        matrix
    }

    #[test]
    fn opening_candidates_for_b_are_the_seven_front_row_steps() {
        let matrix = BoardState::new().to_matrix();

        let candidates = generate_possible_moves(&matrix, Color::B);

        assert_eq!(candidates.len(), 7);
        assert!(candidates.iter().all(|c| c.from.row == 2 && c.to.row == 3));
    }

    #[test]
    fn single_jump_is_generated_but_chains_are_not() {
        let matrix = matrix_from(&[(2, 1, 1), (3, 2, -1), (5, 4, -1)]);

        let candidates = generate_possible_moves(&matrix, Color::B);
        let jump = candidates
            .iter()
            .find(|c| c.to == Position::new(4, 3))
            .expect("single jump");

        assert_eq!(jump.result[3][2], 0);
        assert_eq!(jump.result[4][3], 1);
        assert_eq!(jump.result[5][4], -1);
        assert!(candidates.iter().all(|c| c.to != Position::new(6, 5)));
    }

    #[test]
    fn man_reaching_far_row_is_crowned() {
        let matrix = matrix_from(&[(6, 1, 1), (0, 1, -1)]);

        let candidates = generate_possible_moves(&matrix, Color::B);

        let crowned = candidates
            .iter()
            .find(|c| c.to == Position::new(7, 0))
            .expect("step to the far row");
        assert_eq!(crowned.result[7][0], 2);
    }

    #[test]
    fn fitness_rewards_advance_center_and_mobility() {
        let original = matrix_from(&[(6, 1, -1), (0, 7, 1)]);
        let result = matrix_from(&[(5, 2, -1), (0, 7, 1)]);

        // advance 8 - 5, center 2, four free neighbours.
        assert_eq!(calculate_fitness(&result, &original, Color::A), 3 + 2 + 4);
    }

    #[test]
    fn fitness_rewards_captures() {
        let original = matrix_from(&[(5, 2, -1), (4, 3, 1)]);
        let result = matrix_from(&[(3, 4, -1)]);

        assert_eq!(calculate_fitness(&result, &original, Color::A), 10 + 5 + 2 + 4);
    }

    #[test]
    fn fitness_penalises_exposure_to_recapture() {
        let board = matrix_from(&[(5, 2, -1), (4, 3, 1)]);

        // advance 3, center 2, exposure -5, three free neighbours.
        assert_eq!(calculate_fitness(&board, &board, Color::A), 3 + 2 - 5 + 3);
    }

    #[test]
    fn fitness_advance_is_measured_toward_each_side_promotion_row() {
        let board = matrix_from(&[(6, 7, 1)]);

        // row 6 is one step from B's promotion row; two free neighbours.
        assert_eq!(calculate_fitness(&board, &board, Color::B), 7 + 2);
    }

    #[test]
    fn rank_selection_prefers_the_best_over_the_worst() {
        let fitness = [5, 1, 9, 3];
        let mut rng = StdRng::seed_from_u64(7);

        let picks = rank_selection(&fitness, 2_000, &mut rng);
        let best = picks.iter().filter(|&&i| i == 2).count();
        let worst = picks.iter().filter(|&&i| i == 1).count();

        assert_eq!(picks.len(), 2_000);
        assert!(best > worst, "best {best}, worst {worst}");
    }

    #[test]
    fn binary_index_encoding_uses_fixed_width() {
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(6), 3);
        assert_eq!(bit_width(8), 4);
        assert_eq!(encode_index(5, 4), "0101");
        assert_eq!(decode_index("0101"), 5);
    }

    #[test]
    fn crossover_splices_at_an_interior_cut() {
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let (left, right) = crossover_binary("0000", "1111", &mut rng);
            let cut = left.find('1').expect("cut is interior");

            assert!((1..4).contains(&cut));
            assert_eq!(left, format!("{}{}", "0".repeat(cut), "1".repeat(4 - cut)));
            assert_eq!(right, format!("{}{}", "1".repeat(cut), "0".repeat(4 - cut)));
        }
    }

    #[test]
    fn mutation_rate_bounds_bit_flips() {
        let mut rng = StdRng::seed_from_u64(11);

        assert_eq!(mutate_binary("0110", 0.0, &mut rng), "0110");
        assert_eq!(mutate_binary("0110", 1.0, &mut rng), "1001");
    }

    #[test]
    fn search_without_candidates_returns_none() {
        let matrix = matrix_from(&[(7, 0, 1), (6, 1, -1), (5, 2, -1)]);
        let mut search = EvolutionarySearch::new(1);

        assert_eq!(search.search(&matrix, Color::B), None);
    }

    #[test]
    fn search_takes_the_only_candidate() {
        let matrix = matrix_from(&[(0, 7, 1), (5, 0, -1)]);
        let mut search = EvolutionarySearch::new(1);

        let (candidate, _) = search.search(&matrix, Color::B).expect("one move");

        assert_eq!(candidate.to, Position::new(1, 6));
    }

    #[test]
    fn search_is_deterministic_for_a_seed() {
        let matrix = BoardState::new().to_matrix();
        let candidates = generate_possible_moves(&matrix, Color::B);

        let first = EvolutionarySearch::new(42).search(&matrix, Color::B);
        let second = EvolutionarySearch::new(42).search(&matrix, Color::B);

        assert_eq!(first, second);
        let (chosen, _) = first.expect("opening has moves");
        assert!(candidates.contains(&chosen));
    }

    #[test]
    fn search_finds_a_dominant_capture() {
        // B can jump (1, 6) from the corner or step the back man; the jump scores 28
        // against 12.
        let matrix = matrix_from(&[(0, 7, 1), (1, 6, -1), (7, 0, 1)]);
        let candidates = generate_possible_moves(&matrix, Color::B);
        let fitness: Vec<i32> = candidates
            .iter()
            .map(|c| calculate_fitness(&c.result, &matrix, Color::B))
            .collect();
        assert_eq!(candidates.len(), 2);
        let best = fitness.iter().copied().max().expect("two candidates");

        let (chosen, score) = EvolutionarySearch::new(17)
            .search(&matrix, Color::B)
            .expect("B has moves");

        assert_eq!(score, best);
        assert_eq!(chosen.to, Position::new(2, 5));
        assert_eq!(chosen.result[1][6], 0);
    }

    #[test]
    fn later_generations_never_lose_the_best_offspring() {
        let matrix = BoardState::new().to_matrix();
        let mut previous = i32::MIN;

        for generations in 1..=MAX_GENERATIONS {
            let mut search = EvolutionarySearch::new(23);
            search.generations = generations;
            let (chosen, score) = search.search(&matrix, Color::B).expect("opening has moves");

            assert_eq!(score, calculate_fitness(&chosen.result, &matrix, Color::B));
            assert!(score >= previous, "generation {generations}: {score} < {previous}");
            previous = score;
        }
    }

    #[test]
    fn breeding_stays_within_the_candidate_range() {
        let mut search = EvolutionarySearch::new(31);
        search.mutation_rate = 0.3;

        for max_index in [2, 4, 5, 6, 9] {
            for first in 0..=max_index {
                for second in 0..=max_index {
                    let (left, right) = search.breed(first, second, max_index);
                    assert!(left <= max_index && right <= max_index, "max {max_index}");
                }
            }
        }
    }

    #[test]
    fn breeding_falls_back_to_the_parents_when_no_child_fits() {
        let mut search = EvolutionarySearch::new(31);
        search.mutation_rate = 1.0;

        // Every bit flips, so "000" always becomes 7.
        assert_eq!(search.breed(0, 0, 4), (0, 0));
    }

    #[test]
    fn select_move_installs_a_board_with_one_moved_piece() {
        let board = BoardState::new();
        let mut search = EvolutionarySearch::new(5);

        let next = search.select_move(&board, Color::B).expect("opening has moves");

        assert_eq!(next.remaining(Color::B), 12);
        assert_eq!(next.remaining(Color::A), 12);
        assert_ne!(next, board);
    }
}
