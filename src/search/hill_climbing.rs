//! Hill climbing: greedy single-transposition search over permutations.

use crossbeam_utils::thread;

use crate::cost::{CostFunction, CostValue};
use crate::generator::{
    master_rng, random_sbox, random_transposition, worker_rng, Candidate, Comparator,
    PropertyTargets, SharedState, StopReason, ValidationError,
};
use crate::Sbox;

/// Hill climbing parameters.
#[derive(Clone, Debug)]
pub struct HillClimbingParams {
    pub targets: PropertyTargets,
    pub thread_count: u32,
    pub try_per_thread: u64,
    pub max_frozen_count: u64,
    pub cost: CostFunction,
    pub comparator: Comparator,
    pub verbose: bool,
}

impl HillClimbingParams {
    pub fn new(targets: PropertyTargets, cost: CostFunction) -> HillClimbingParams {
        HillClimbingParams {
            targets,
            thread_count: 1,
            try_per_thread: 1_000_000,
            max_frozen_count: 100_000,
            cost,
            comparator: Comparator::CostWithNonlinearity,
            verbose: false,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.thread_count == 0 {
            return Err(ValidationError::new("thread_count", "must be at least 1"));
        }
        Ok(())
    }
}

fn climb<T: CostValue>(
    state: &SharedState<T>,
    params: &HillClimbingParams,
    id: u64,
) -> StopReason {
    let mut rng = worker_rng(params.targets.seed, id);

    for _ in 0..params.try_per_thread {
        let iteration = state.bump_iteration();
        if state.is_found() {
            return StopReason::TargetMet;
        }

        let mut candidate = state.snapshot();
        let (a, b) = random_transposition(&mut rng);
        candidate.sbox.swap(a, b);
        candidate.cost = params.cost.evaluate(&candidate.sbox);

        if candidate.cost.nonlinearity >= params.targets.nonlinearity
            && params.targets.meets_additional(&candidate.sbox)
        {
            state.publish_target_met(&candidate);
            if params.verbose {
                println!(
                    "cost={}\tNL={}\titeration={}\ttarget met",
                    candidate.cost.cost, candidate.cost.nonlinearity, iteration
                );
            }
            return StopReason::TargetMet;
        }

        let outcome = state.publish_better(&candidate, params.comparator, params.max_frozen_count);
        if params.verbose && outcome.replaced {
            println!(
                "cost={}\tNL={}\titeration={}",
                candidate.cost.cost, candidate.cost.nonlinearity, iteration
            );
        }
        if outcome.frozen_exceeded {
            return StopReason::Frozen;
        }
    }

    StopReason::BudgetExhausted
}

/// Runs hill climbing over `thread_count` workers and returns an S-box
/// meeting the whole target bundle, or `None` once every worker has
/// exhausted its budget or frozen.
pub fn hill_climbing<T: CostValue>(
    params: &HillClimbingParams,
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
            scope.spawn(move |_| {
                let reason = climb(state, params, u64::from(id));
                if params.verbose && reason == StopReason::Frozen {
                    println!(
                        "iteration={}\tsearch stopped: frozen threshold reached",
                        state.iterations()
                    );
                }
            });
        }
    })
    .expect("hill climbing worker panicked");

    Ok(state.into_found())
}
