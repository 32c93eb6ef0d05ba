//! The three search engines and their genetic building blocks.

pub mod annealing;
pub mod crossover;
pub mod genetic;
pub mod hill_climbing;
pub mod selection;

pub use self::annealing::{simulated_annealing, AnnealingParams};
pub use self::crossover::CrossoverMethod;
pub use self::genetic::{genetic, GeneticParams, Population};
pub use self::hill_climbing::{hill_climbing, HillClimbingParams};
pub use self::selection::SelectionMethod;
