//! Simulated annealing with a Metropolis acceptance rule and a geometric
//! cooling schedule applied once per outer loop.

use crossbeam_utils::thread;
use rand::Rng;

use crate::cost::{CostFunction, CostValue};
use crate::generator::{
    master_rng, random_sbox, random_transposition, worker_rng, Candidate, Comparator,
    PropertyTargets, SharedState, StopReason, ValidationError,
};
use crate::Sbox;

/// Simulated annealing parameters.
#[derive(Clone, Debug)]
pub struct AnnealingParams {
    pub targets: PropertyTargets,
    pub thread_count: u32,
    pub max_outer_loops: u64,
    pub max_inner_loops: u64,
    /// Frozen budget in outer-loop units; a worker stops once the shared
    /// counter reaches `max_frozen_outer_loops * thread_count` rejections.
    pub max_frozen_outer_loops: u64,
    pub initial_temperature: f64,
    pub alpha: f64,
    pub cost: CostFunction,
    pub comparator: Comparator,
    pub verbose: bool,
}

impl AnnealingParams {
    pub fn new(targets: PropertyTargets, cost: CostFunction) -> AnnealingParams {
        AnnealingParams {
            targets,
            thread_count: 1,
            max_outer_loops: 10,
            max_inner_loops: 10_000,
            max_frozen_outer_loops: 100_000,
            initial_temperature: 1000.0,
            alpha: 0.99,
            cost,
            comparator: Comparator::CostWithNonlinearity,
            verbose: false,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.thread_count == 0 {
            return Err(ValidationError::new("thread_count", "must be at least 1"));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ValidationError::new(
                "alpha",
                "cooling factor must lie in (0, 1]",
            ));
        }
        if !(self.initial_temperature > 0.0) {
            return Err(ValidationError::new(
                "initial_temperature",
                "must be positive",
            ));
        }
        Ok(())
    }

    fn frozen_limit(&self) -> u64 {
        self.max_frozen_outer_loops
            .saturating_mul(u64::from(self.thread_count))
    }
}

fn anneal<T: CostValue>(
    state: &SharedState<T>,
    params: &AnnealingParams,
    id: u64,
) -> StopReason {
    let mut rng = worker_rng(params.targets.seed, id);
    let mut temperature = params.initial_temperature;
    let frozen_limit = params.frozen_limit();

    for _ in 0..params.max_outer_loops {
        for _ in 0..params.max_inner_loops {
            state.bump_iteration();
            if state.is_found() {
                return StopReason::TargetMet;
            }

            let current = state.snapshot();
            let mut candidate = current;
            let (a, b) = random_transposition(&mut rng);
            candidate.sbox.swap(a, b);
            candidate.cost = params.cost.evaluate(&candidate.sbox);

            if candidate.cost.nonlinearity >= params.targets.nonlinearity
                && params.targets.meets_additional(&candidate.sbox)
            {
                state.publish_target_met(&candidate);
                if params.verbose {
                    println!(
                        "cost={}\tNL={}\ttemperature={}\ttarget met",
                        candidate.cost.cost, candidate.cost.nonlinearity, temperature
                    );
                }
                return StopReason::TargetMet;
            }

            // Metropolis rule against the snapshot: improvements always
            // pass, degradations pass with probability exp(-delta/T).
            let accept = if params.comparator.better(&candidate.cost, &current.cost) {
                true
            } else {
                let delta = (candidate.cost.cost - current.cost.cost).to_f64();
                rng.gen::<f64>() < (-delta / temperature).exp()
            };

            if accept {
                state.publish_accepted(&candidate);
                if params.verbose {
                    println!(
                        "cost={}\tNL={}\ttemperature={}",
                        candidate.cost.cost, candidate.cost.nonlinearity, temperature
                    );
                }
            } else if state.note_rejected(frozen_limit) {
                return StopReason::Frozen;
            }
        }

        temperature *= params.alpha;
    }

    StopReason::BudgetExhausted
}

/// Runs simulated annealing over `thread_count` workers and returns an
/// S-box meeting the whole target bundle, or `None` when the loop budgets
/// run out.
pub fn simulated_annealing<T: CostValue>(
    params: &AnnealingParams,
) -> Result<Option<Sbox>, ValidationError> {
    params.validate()?;

    let mut rng = master_rng(params.targets.seed);
    let sbox = random_sbox(&mut rng);
    let state = SharedState::new(Candidate {
        sbox,
        cost: params.cost.evaluate::<T>(&sbox),
    });

    thread::scope(|scope| {
        for id in 0..params.thread_count {
            let state = &state;
            scope.spawn(move |_| anneal(state, params, u64::from(id)));
        }
    })
    .expect("annealing worker panicked");

    Ok(state.into_found())
}
