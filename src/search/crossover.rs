//! Permutation-preserving genetic operators: cycle crossover, partially
//! mapped crossover and transposition mutation.

use rand::rngs::StdRng;
use rand::Rng;

use crate::generator::random_transposition;
use crate::Sbox;

/// Crossover operator selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossoverMethod {
    Cycle,
    Pmx,
}

impl CrossoverMethod {
    /// Combines two parent permutations into one child permutation.
    pub fn combine(&self, a: &Sbox, b: &Sbox, rng: &mut StdRng) -> Sbox {
        match self {
            CrossoverMethod::Cycle => cycle(a, b, rng),
            CrossoverMethod::Pmx => pmx(a, b, rng),
        }
    }
}

/// Index of each value in a permutation, for O(1) cycle walks.
fn inverse(sbox: &Sbox) -> [usize; 256] {
    let mut positions = [0usize; 256];
    for (i, &v) in sbox.iter().enumerate() {
        positions[v as usize] = i;
    }
    positions
}

/// Cycle crossover: one alternating cycle is copied from the first parent,
/// every other position from the second. Both parents are bijections, so
/// the child inherits each value exactly once.
fn cycle(a: &Sbox, b: &Sbox, rng: &mut StdRng) -> Sbox {
    let position_in_a = inverse(a);
    let mut written = [false; 256];
    let mut child = [0u8; 256];

    let start = rng.gen_range(0..256);
    let mut pos = start;
    loop {
        child[pos] = a[pos];
        written[pos] = true;
        pos = position_in_a[b[pos] as usize];
        if pos == start {
            break;
        }
    }

    for i in 0..256 {
        if !written[i] {
            child[i] = b[i];
        }
    }

    child
}

/// Partially mapped crossover: a random segment is copied from the first
/// parent; the rest comes from the second, chasing the segment mapping
/// whenever a value is already taken.
fn pmx(a: &Sbox, b: &Sbox, rng: &mut StdRng) -> Sbox {
    let position_in_a = inverse(a);
    let mut used = [false; 256];
    let mut child = [0u8; 256];

    let (start, end) = {
        let (p, q) = random_transposition(rng);
        (p.min(q), p.max(q))
    };

    for i in start..=end {
        child[i] = a[i];
        used[a[i] as usize] = true;
    }

    for i in (0..256).filter(|i| *i < start || *i > end) {
        let mut value = b[i];
        while used[value as usize] {
            value = b[position_in_a[value as usize]];
        }
        child[i] = value;
        used[value as usize] = true;
    }

    child
}

/// Mutation: one random transposition.
pub fn mutate(sbox: &mut Sbox, rng: &mut StdRng) {
    let (a, b) = random_transposition(rng);
    sbox.swap(a, b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{master_rng, random_sbox};
    use crate::properties::is_bijective;
    use proptest::prelude::*;

    fn sbox_from_seed(seed: u64) -> Sbox {
        random_sbox(&mut master_rng(Some(seed)))
    }

    proptest! {
        #[test]
        fn cycle_crossover_preserves_bijectivity(pa: u64, pb: u64, draw: u64) {
            let a = sbox_from_seed(pa);
            let b = sbox_from_seed(pb);
            let child = CrossoverMethod::Cycle.combine(&a, &b, &mut master_rng(Some(draw)));
            prop_assert!(is_bijective(&child));
        }

        #[test]
        fn pmx_crossover_preserves_bijectivity(pa: u64, pb: u64, draw: u64) {
            let a = sbox_from_seed(pa);
            let b = sbox_from_seed(pb);
            let child = CrossoverMethod::Pmx.combine(&a, &b, &mut master_rng(Some(draw)));
            prop_assert!(is_bijective(&child));
        }

        #[test]
        fn mutation_preserves_bijectivity(seed: u64, draw: u64) {
            let mut sbox = sbox_from_seed(seed);
            mutate(&mut sbox, &mut master_rng(Some(draw)));
            prop_assert!(is_bijective(&sbox));
        }
    }

    #[test]
    fn crossover_of_identical_parents_is_the_parent() {
        let a = sbox_from_seed(42);
        let mut rng = master_rng(Some(7));
        assert_eq!(CrossoverMethod::Cycle.combine(&a, &a, &mut rng), a);
        assert_eq!(CrossoverMethod::Pmx.combine(&a, &a, &mut rng), a);
    }
}
