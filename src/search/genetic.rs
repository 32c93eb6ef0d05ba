//! Genetic search: a priority-ordered population evolved through selection,
//! optional crossover and transposition mutants.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use crossbeam_utils::thread;
use rand::Rng;

use crate::cost::{CostFunction, CostValue};
use crate::generator::{
    master_rng, random_sbox, worker_rng, Candidate, Comparator, PropertyTargets, SharedState,
    ValidationError,
};
use crate::search::crossover::{mutate, CrossoverMethod};
use crate::search::selection::SelectionMethod;
use crate::Sbox;

/// A candidate keyed by the population's comparator; the heap surfaces the
/// best candidate first.
struct Entry<T> {
    candidate: Candidate<T>,
    comparator: Comparator,
}

impl<T: CostValue> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: CostValue> Eq for Entry<T> {}

impl<T: CostValue> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: CostValue> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator.order(&self.candidate.cost, &other.candidate.cost)
    }
}

/// Max-heap of candidates under a comparator chosen at construction.
pub struct Population<T> {
    heap: BinaryHeap<Entry<T>>,
    comparator: Comparator,
}

impl<T: CostValue> Population<T> {
    pub fn new(comparator: Comparator) -> Population<T> {
        Population {
            heap: BinaryHeap::new(),
            comparator,
        }
    }

    pub fn push(&mut self, candidate: Candidate<T>) {
        self.heap.push(Entry {
            candidate,
            comparator: self.comparator,
        });
    }

    /// Removes and returns the best candidate.
    pub fn pop(&mut self) -> Option<Candidate<T>> {
        self.heap.pop().map(|entry| entry.candidate)
    }

    pub fn peek(&self) -> Option<&Candidate<T>> {
        self.heap.peek().map(|entry| &entry.candidate)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Genetic algorithm parameters.
#[derive(Clone, Debug)]
pub struct GeneticParams {
    pub targets: PropertyTargets,
    pub thread_count: u32,
    pub initial_population_count: u32,
    pub selection_count: u32,
    pub iterations_count: u32,
    pub mutants_per_parent: u32,
    pub crossover_count: u32,
    pub child_per_parent: u32,
    /// When set, parents are not carried into the next generation.
    pub delete_parents: bool,
    pub selection: SelectionMethod,
    /// Crossover operator; `None` disables crossover entirely.
    pub crossover: Option<CrossoverMethod>,
    pub comparator: Comparator,
    pub cost: CostFunction,
    pub verbose: bool,
}

impl GeneticParams {
    pub fn new(targets: PropertyTargets, cost: CostFunction) -> GeneticParams {
        GeneticParams {
            targets,
            thread_count: 1,
            initial_population_count: 100,
            selection_count: 10,
            iterations_count: 15_000,
            mutants_per_parent: 10,
            crossover_count: 0,
            child_per_parent: 0,
            delete_parents: false,
            selection: SelectionMethod::Basic,
            crossover: None,
            comparator: Comparator::CostWithNonlinearity,
            cost,
            verbose: false,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.thread_count == 0 {
            return Err(ValidationError::new("thread_count", "must be at least 1"));
        }
        if self.initial_population_count < self.selection_count {
            return Err(ValidationError::new(
                "selection_count",
                "must not exceed initial_population_count",
            ));
        }
        Ok(())
    }
}

fn meets_targets<T: CostValue>(candidate: &Candidate<T>, params: &GeneticParams) -> bool {
    candidate.cost.nonlinearity >= params.targets.nonlinearity
        && params.targets.meets_additional(&candidate.sbox)
}

/// Pops parents off the shared successor queue, reinserts them into the
/// next generation and breeds scored mutants, short-circuiting the whole
/// run when a mutant meets every target.
fn breed<T: CostValue>(
    state: &SharedState<T>,
    params: &GeneticParams,
    queue: &Mutex<Vec<Candidate<T>>>,
    next: &Mutex<Population<T>>,
    rng_id: u64,
) {
    let mut rng = worker_rng(params.targets.seed, rng_id);

    loop {
        let parent = match queue.lock().expect("successor queue poisoned").pop() {
            Some(parent) => parent,
            None => return,
        };
        if state.is_found() {
            return;
        }

        if !params.delete_parents {
            next.lock().expect("population poisoned").push(parent);
        }

        for _ in 0..params.mutants_per_parent {
            state.bump_iteration();

            let mut mutant = parent;
            mutate(&mut mutant.sbox, &mut rng);
            mutant.cost = params.cost.evaluate(&mutant.sbox);

            if meets_targets(&mutant, params) {
                state.publish_target_met(&mutant);
                if params.verbose {
                    println!(
                        "cost={}\tNL={}\titeration={}\ttarget met",
                        mutant.cost.cost,
                        mutant.cost.nonlinearity,
                        state.iterations()
                    );
                }
                return;
            }

            next.lock().expect("population poisoned").push(mutant);
        }
    }
}

/// Runs the genetic search and returns an S-box meeting the whole target
/// bundle, or `None` when the generation budget runs out.
pub fn genetic<T: CostValue>(params: &GeneticParams) -> Result<Option<Sbox>, ValidationError> {
    params.validate()?;

    // Seed the population in parallel, one worker per initial candidate.
    let population = Mutex::new(Population::<T>::new(params.comparator));
    thread::scope(|scope| {
        for id in 0..params.initial_population_count {
            let population = &population;
            scope.spawn(move |_| {
                let mut rng = worker_rng(params.targets.seed, u64::from(id));
                let sbox = random_sbox(&mut rng);
                let candidate = Candidate {
                    sbox,
                    cost: params.cost.evaluate::<T>(&sbox),
                };
                population.lock().expect("population poisoned").push(candidate);
            });
        }
    })
    .expect("population seeding worker panicked");
    let mut population = population.into_inner().expect("population poisoned");

    let mut rng = master_rng(params.targets.seed);
    let initial = match population.peek() {
        Some(best) => *best,
        None => {
            let sbox = random_sbox(&mut rng);
            Candidate {
                sbox,
                cost: params.cost.evaluate::<T>(&sbox),
            }
        }
    };
    let state = SharedState::new(initial);
    let mut best_seen = initial.cost.nonlinearity;

    for generation in 0..params.iterations_count {
        if state.is_found() {
            break;
        }

        let mut successors =
            params
                .selection
                .select(&mut population, params.selection_count as usize, &mut rng);

        if let Some(crossover) = params.crossover {
            let mut children = Vec::new();
            if !successors.is_empty() {
                for _ in 0..params.crossover_count {
                    let a = &successors[rng.gen_range(0..successors.len())];
                    let b = &successors[rng.gen_range(0..successors.len())];
                    for _ in 0..params.child_per_parent {
                        let sbox = crossover.combine(&a.sbox, &b.sbox, &mut rng);
                        children.push(Candidate {
                            sbox,
                            cost: params.cost.evaluate::<T>(&sbox),
                        });
                    }
                }
            }
            successors.append(&mut children);
        }

        let queue = Mutex::new(successors);
        let next = Mutex::new(Population::<T>::new(params.comparator));

        thread::scope(|scope| {
            for id in 0..params.thread_count {
                let state = &state;
                let queue = &queue;
                let next = &next;
                // Workers are respawned every generation, so their seeds mix
                // in the generation index to avoid replaying one stream.
                let rng_id = (u64::from(generation) + 1) << 32 | u64::from(id);
                scope.spawn(move |_| breed(state, params, queue, next, rng_id));
            }
        })
        .expect("breeding worker panicked");

        population = next.into_inner().expect("population poisoned");

        if params.verbose {
            if let Some(best) = population.peek() {
                if best.cost.nonlinearity > best_seen {
                    best_seen = best.cost.nonlinearity;
                    println!(
                        "generation={}\tcost={}\tNL={}\tpopulation={}",
                        generation,
                        best.cost.cost,
                        best.cost.nonlinearity,
                        population.len()
                    );
                }
            }
        }
    }

    Ok(state.into_found())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostInfo;

    fn candidate(cost: f64, nonlinearity: i32) -> Candidate<f64> {
        Candidate {
            sbox: [0u8; 256],
            cost: CostInfo { cost, nonlinearity },
        }
    }

    #[test]
    fn population_surfaces_low_cost_first() {
        let mut population = Population::new(Comparator::Cost);
        for cost in [7.0, 2.0, 9.0, 4.0] {
            population.push(candidate(cost, 100));
        }

        let order: Vec<f64> = std::iter::from_fn(|| population.pop())
            .map(|c| c.cost.cost)
            .collect();
        assert_eq!(order, vec![2.0, 4.0, 7.0, 9.0]);
    }

    #[test]
    fn population_prefers_nonlinearity_over_cost() {
        let mut population = Population::new(Comparator::CostWithNonlinearity);
        population.push(candidate(1.0, 98));
        population.push(candidate(50.0, 104));
        population.push(candidate(20.0, 104));

        assert_eq!(population.pop().unwrap().cost.nonlinearity, 104);
        assert_eq!(population.pop().unwrap().cost.cost, 50.0);
        assert_eq!(population.pop().unwrap().cost.nonlinearity, 98);
        assert!(population.pop().is_none());
    }
}
