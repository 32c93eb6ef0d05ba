//! Machinery shared by the search engines: target bundles, comparators, the
//! concurrent best-so-far record and parameter validation.

use std::cmp::Ordering;
use std::error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as MemoryOrdering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::cost::{CostInfo, CostValue};
use crate::properties::{algebraic_immunity, delta_uniformity};
use crate::Sbox;

/// Target property bundle. The nonlinearity floor is always enforced; the
/// differential-uniformity ceiling and algebraic-immunity floor only when
/// present. A fixed seed makes single-threaded runs reproducible.
#[derive(Clone, Copy, Debug)]
pub struct PropertyTargets {
    pub nonlinearity: i32,
    pub delta_uniformity: Option<i32>,
    pub algebraic_immunity: Option<i32>,
    pub seed: Option<u64>,
}

impl PropertyTargets {
    pub fn nonlinearity(nonlinearity: i32) -> PropertyTargets {
        PropertyTargets {
            nonlinearity,
            delta_uniformity: None,
            algebraic_immunity: None,
            seed: None,
        }
    }

    /// Checks the optional targets on a candidate that already meets the
    /// nonlinearity floor. Inactive targets accept everything; the
    /// measurements are skipped entirely when no target is set.
    pub fn meets_additional(&self, sbox: &Sbox) -> bool {
        if let Some(limit) = self.delta_uniformity {
            if delta_uniformity(sbox) > limit {
                return false;
            }
        }

        if let Some(floor) = self.algebraic_immunity {
            if algebraic_immunity(sbox) < floor {
                return false;
            }
        }

        true
    }
}

/// Candidate orderings, fixed once at engine start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    /// Lower cost wins.
    Cost,
    /// Higher nonlinearity wins; equal nonlinearities fall back to cost.
    CostWithNonlinearity,
}

impl Comparator {
    /// Returns true iff `a` is strictly better than `b`. Exact ties are not
    /// better in either direction.
    pub fn better<T: CostValue>(&self, a: &CostInfo<T>, b: &CostInfo<T>) -> bool {
        match self {
            Comparator::Cost => a.cost < b.cost,
            Comparator::CostWithNonlinearity => {
                if a.nonlinearity != b.nonlinearity {
                    a.nonlinearity > b.nonlinearity
                } else {
                    a.cost < b.cost
                }
            }
        }
    }

    /// The same relation as a total order, with `Greater` meaning better.
    pub fn order<T: CostValue>(&self, a: &CostInfo<T>, b: &CostInfo<T>) -> Ordering {
        if self.better(a, b) {
            Ordering::Greater
        } else if self.better(b, a) {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

/// A permutation paired with its most recent score.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<T> {
    pub sbox: Sbox,
    pub cost: CostInfo<T>,
}

/// Terminal worker states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    TargetMet,
    Frozen,
    BudgetExhausted,
}

/// Outcome of publishing a candidate against the shared best.
#[derive(Clone, Copy, Debug)]
pub struct PublishOutcome {
    pub replaced: bool,
    pub frozen_exceeded: bool,
}

struct BestRecord<T> {
    best: Candidate<T>,
    found: bool,
    frozen: u64,
}

/// The record shared by all workers of one search: the best candidate so
/// far, the found flag and the frozen counter behind one mutex, plus an
/// atomic counter of proposals across all threads.
pub struct SharedState<T> {
    record: Mutex<BestRecord<T>>,
    iteration: AtomicU64,
}

impl<T: CostValue> SharedState<T> {
    pub fn new(initial: Candidate<T>) -> SharedState<T> {
        SharedState {
            record: Mutex::new(BestRecord {
                best: initial,
                found: false,
                frozen: 0,
            }),
            iteration: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BestRecord<T>> {
        self.record.lock().expect("search state poisoned by a worker panic")
    }

    /// Copies the current best candidate.
    pub fn snapshot(&self) -> Candidate<T> {
        self.lock().best
    }

    pub fn is_found(&self) -> bool {
        self.lock().found
    }

    /// Publishes a candidate if the comparator places it above the current
    /// best; otherwise counts another frozen step. Reports what happened
    /// and whether the frozen counter has passed `max_frozen`.
    pub fn publish_better(
        &self,
        candidate: &Candidate<T>,
        comparator: Comparator,
        max_frozen: u64,
    ) -> PublishOutcome {
        let mut record = self.lock();

        // A target-met candidate is never displaced.
        if record.found {
            return PublishOutcome {
                replaced: false,
                frozen_exceeded: false,
            };
        }

        if comparator.better(&candidate.cost, &record.best.cost) {
            record.best = *candidate;
            record.frozen = 0;
            PublishOutcome {
                replaced: true,
                frozen_exceeded: false,
            }
        } else {
            record.frozen += 1;
            PublishOutcome {
                replaced: false,
                frozen_exceeded: record.frozen > max_frozen,
            }
        }
    }

    /// Installs a candidate that meets every target and raises the found
    /// flag. The first publication wins; later calls keep the flag set and
    /// leave the stored candidate alone.
    pub fn publish_target_met(&self, candidate: &Candidate<T>) {
        debug_assert!(crate::properties::is_bijective(&candidate.sbox));
        let mut record = self.lock();
        if !record.found {
            record.best = *candidate;
            record.found = true;
        }
    }

    /// Unconditionally replaces the current state and resets the frozen
    /// counter; the annealing acceptance rule moves downhill too.
    pub fn publish_accepted(&self, candidate: &Candidate<T>) {
        let mut record = self.lock();
        if !record.found {
            record.best = *candidate;
            record.frozen = 0;
        }
    }

    /// Counts a rejected proposal; returns true once the frozen counter
    /// reaches `limit`.
    pub fn note_rejected(&self, limit: u64) -> bool {
        let mut record = self.lock();
        record.frozen += 1;
        record.frozen >= limit
    }

    pub fn bump_iteration(&self) -> u64 {
        self.iteration.fetch_add(1, MemoryOrdering::Relaxed) + 1
    }

    pub fn iterations(&self) -> u64 {
        self.iteration.load(MemoryOrdering::Relaxed)
    }

    /// Consumes the record after all workers joined, returning the best
    /// permutation iff the search hit its targets.
    pub fn into_found(self) -> Option<Sbox> {
        let record = self
            .record
            .into_inner()
            .expect("search state poisoned by a worker panic");
        if record.found {
            Some(record.best.sbox)
        } else {
            None
        }
    }
}

/// Inconsistent engine parameters. Raised at engine entry; nothing is
/// silently clamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub parameter: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(parameter: &'static str, reason: impl Into<String>) -> ValidationError {
        ValidationError {
            parameter,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid `{}`: {}", self.parameter, self.reason)
    }
}

impl error::Error for ValidationError {}

/// RNG for the engine entry point itself.
pub fn master_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// RNG for one worker. A fixed master seed is spread over workers by id so
/// that single-threaded runs replay exactly.
pub fn worker_rng(seed: Option<u64>, id: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ id),
        None => StdRng::from_entropy(),
    }
}

/// A uniformly random permutation of the byte values (Fisher–Yates).
pub fn random_sbox(rng: &mut StdRng) -> Sbox {
    let mut sbox = [0u8; 256];
    for (i, v) in sbox.iter_mut().enumerate() {
        *v = i as u8;
    }
    sbox.shuffle(rng);
    sbox
}

/// Two distinct uniformly random positions.
pub fn random_transposition(rng: &mut StdRng) -> (usize, usize) {
    let first = rng.gen_range(0..256);
    let mut second = first;
    while second == first {
        second = rng.gen_range(0..256);
    }
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(cost: f64, nonlinearity: i32) -> CostInfo<f64> {
        CostInfo { cost, nonlinearity }
    }

    #[test]
    fn comparator_prefers_nonlinearity_then_cost() {
        let cmp = Comparator::CostWithNonlinearity;

        assert!(cmp.better(&info(500.0, 104), &info(10.0, 102)));
        assert!(cmp.better(&info(10.0, 104), &info(500.0, 104)));
        assert!(!cmp.better(&info(500.0, 104), &info(10.0, 104)));
        // Exact ties are not better in either direction.
        assert!(!cmp.better(&info(10.0, 104), &info(10.0, 104)));
        assert_eq!(cmp.order(&info(10.0, 104), &info(10.0, 104)), Ordering::Equal);
    }

    #[test]
    fn cost_comparator_ignores_nonlinearity() {
        let cmp = Comparator::Cost;
        assert!(cmp.better(&info(10.0, 90), &info(20.0, 112)));
        assert!(!cmp.better(&info(20.0, 112), &info(10.0, 90)));
    }

    #[test]
    fn publishing_better_resets_the_frozen_counter() {
        let state = SharedState::new(Candidate {
            sbox: [0u8; 256],
            cost: info(100.0, 100),
        });
        let cmp = Comparator::CostWithNonlinearity;

        let worse = Candidate { sbox: [0u8; 256], cost: info(200.0, 98) };
        for _ in 0..3 {
            let outcome = state.publish_better(&worse, cmp, 5);
            assert!(!outcome.replaced);
            assert!(!outcome.frozen_exceeded);
        }

        let better = Candidate { sbox: [0u8; 256], cost: info(50.0, 100) };
        assert!(state.publish_better(&better, cmp, 5).replaced);

        for _ in 0..5 {
            assert!(!state.publish_better(&worse, cmp, 5).frozen_exceeded);
        }
        assert!(state.publish_better(&worse, cmp, 5).frozen_exceeded);
    }

    #[test]
    fn target_publication_is_idempotent() {
        let first = Candidate { sbox: [1u8; 256], cost: info(1.0, 104) };
        let second = Candidate { sbox: [2u8; 256], cost: info(0.5, 106) };

        let state = SharedState::new(Candidate { sbox: [0u8; 256], cost: info(9.0, 90) });
        assert!(!state.is_found());
        state.publish_target_met(&first);
        assert!(state.is_found());
        state.publish_target_met(&second);

        assert_eq!(state.into_found().unwrap(), [1u8; 256]);
    }

    #[test]
    fn unfound_state_yields_nothing() {
        let state: SharedState<f64> =
            SharedState::new(Candidate { sbox: [0u8; 256], cost: info(9.0, 90) });
        state.bump_iteration();
        assert_eq!(state.iterations(), 1);
        assert!(state.into_found().is_none());
    }

    #[test]
    fn random_machinery_is_sound() {
        let mut rng = master_rng(Some(0xdead_beef));
        let sbox = random_sbox(&mut rng);
        assert!(crate::properties::is_bijective(&sbox));

        for _ in 0..100 {
            let (a, b) = random_transposition(&mut rng);
            assert_ne!(a, b);
            assert!(a < 256 && b < 256);
        }

        // The same fixed seed replays the same permutation.
        let again = random_sbox(&mut master_rng(Some(0xdead_beef)));
        assert_eq!(sbox, again);
    }
}
