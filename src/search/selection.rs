//! Selection strategies for the genetic population. All of them drain runs
//! of equal cost after each draw so that no two successors tie.

use rand::rngs::StdRng;
use rand::Rng;

use crate::cost::CostValue;
use crate::generator::Candidate;
use crate::search::genetic::Population;

/// Selection strategy for building the successor set of a generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMethod {
    /// Take the best `count` distinct-cost candidates.
    Basic,
    /// Walk ranked candidates and accept with a rank-decaying probability.
    RankSequential,
    /// Walk ranked candidates and accept with a cost-share probability.
    RouletteWheelSequential,
}

impl SelectionMethod {
    /// Draws up to `count` successors out of the population, consuming it.
    /// Populations with at most `count` distinct costs are taken whole.
    pub fn select<T: CostValue>(
        &self,
        population: &mut Population<T>,
        count: usize,
        rng: &mut StdRng,
    ) -> Vec<Candidate<T>> {
        if let SelectionMethod::Basic = self {
            let mut successors = Vec::with_capacity(count);
            while successors.len() < count {
                match pop_distinct(population) {
                    Some(candidate) => successors.push(candidate),
                    None => break,
                }
            }
            return successors;
        }

        let mut ranked = Vec::new();
        while let Some(candidate) = pop_distinct(population) {
            ranked.push(candidate);
        }
        if ranked.len() <= count {
            return ranked;
        }

        let cost_sum: f64 = ranked.iter().map(|c| c.cost.cost.to_f64()).sum();
        let threshold = |position: usize| match self {
            SelectionMethod::RankSequential => {
                1.0 - (2.0 * position as f64) / (count as f64 * (count as f64 + 1.0))
            }
            SelectionMethod::RouletteWheelSequential => {
                if cost_sum > 0.0 {
                    1.0 - ranked[position].cost.cost.to_f64() / cost_sum
                } else {
                    1.0
                }
            }
            SelectionMethod::Basic => unreachable!(),
        };

        let mut taken = vec![false; ranked.len()];
        let mut successors = Vec::with_capacity(count);
        let mut cursor = 0;

        while successors.len() < count {
            let position = cursor % ranked.len();
            cursor += 1;
            if taken[position] {
                continue;
            }

            if rng.gen::<f64>() < threshold(position) {
                taken[position] = true;
                successors.push(ranked[position]);
            }
        }

        successors
    }
}

/// Pops one candidate and discards every immediately following candidate of
/// equal cost.
fn pop_distinct<T: CostValue>(population: &mut Population<T>) -> Option<Candidate<T>> {
    let candidate = population.pop()?;
    while population
        .peek()
        .map_or(false, |next| next.cost.cost == candidate.cost.cost)
    {
        population.pop();
    }
    Some(candidate)
}
