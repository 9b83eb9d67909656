pub mod genetic;
pub mod minimax;

pub use genetic::EvolutionarySearch;
pub use minimax::AdversarialSearch;
