//! sbgen is a tool for generating 8-bit bijective S-boxes with prescribed
//! cryptographic properties.
//!
//! Three parallel metaheuristics — hill climbing, simulated annealing and a
//! genetic algorithm — search the space of byte permutations, guided by a
//! cost function over the Walsh–Hadamard spectra of the candidate's
//! component functions. A search succeeds once a candidate reaches the
//! requested nonlinearity floor and, when configured, a differential
//! uniformity ceiling and an algebraic immunity floor.

pub mod cost;
pub mod generator;
pub mod properties;
pub mod search;
pub mod transform;

/// An 8-bit S-box: a permutation of the 256 byte values.
pub type Sbox = [u8; 256];

pub use crate::cost::{CostFunction, CostFunctionKind, CostInfo, CostValue};
pub use crate::generator::{Comparator, PropertyTargets, ValidationError};
pub use crate::properties::{
    algebraic_immunity, delta_uniformity, erase_fixed_points, has_fixed_points, is_bijective,
    nonlinearity,
};
pub use crate::search::{
    genetic, hill_climbing, simulated_annealing, AnnealingParams, CrossoverMethod, GeneticParams,
    HillClimbingParams, SelectionMethod,
};
