//! Cryptographic properties of 8-bit bijective S-boxes: nonlinearity,
//! differential uniformity, algebraic immunity and fixed points.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::transform::{component_spectrum, gf2_rank};
use crate::Sbox;

/// Number of monomials of degree at most two in 16 binary variables.
const QUADRATIC_MONOMIALS: usize = 137;
/// Number of monomials of degree at most one in 16 binary variables.
const LINEAR_MONOMIALS: usize = 17;

/// Returns true iff the table is a permutation of the 256 byte values.
pub fn is_bijective(sbox: &Sbox) -> bool {
    let mut seen = [false; 256];
    for &v in sbox.iter() {
        if seen[v as usize] {
            return false;
        }
        seen[v as usize] = true;
    }
    true
}

/// Computes the nonlinearity of an S-box, `128 - max|W|/2` over the Walsh
/// spectra of all 255 nonzero component functions. Bijective 8-bit S-boxes
/// score at most 112 in practice; affine ones score 0.
pub fn nonlinearity(sbox: &Sbox) -> i32 {
    let mut spectrum = [0i32; 256];
    let mut max_spectrum = 0;

    for mask in 1..=255u8 {
        component_spectrum(sbox, mask, &mut spectrum);

        for &v in spectrum.iter() {
            max_spectrum = max_spectrum.max(v.abs());
        }
    }

    128 - max_spectrum / 2
}

/// Computes the differential (delta) uniformity: the maximum number of
/// solutions `x` of `sbox(x) ^ sbox(x ^ a) = b` over nonzero `a` and all `b`.
pub fn delta_uniformity(sbox: &Sbox) -> i32 {
    let mut max_count = 0;

    for a in 1..256usize {
        let mut row = [0i32; 256];
        for x in 0..256usize {
            row[(sbox[x] ^ sbox[x ^ a]) as usize] += 1;
        }
        for &count in row.iter() {
            max_count = max_count.max(count);
        }
    }

    max_count
}

/// The sixteen graph variables of an S-box point: the input bits followed by
/// the output bits, most significant first.
#[inline]
fn graph_variables(x: usize, y: u8) -> [bool; 16] {
    let mut vars = [false; 16];
    for k in 0..8 {
        vars[k] = (x >> (7 - k)) & 1 != 0;
        vars[8 + k] = (y >> (7 - k)) & 1 != 0;
    }
    vars
}

/// Builds the monomial evaluation matrix of the S-box graph. Row 0 is the
/// constant monomial, rows 1..=16 the linear terms, and (for degree two)
/// rows 17..136 the pairwise products in lexicographic order. Column `i`
/// holds the monomial values at input `i`.
fn monomial_matrix(sbox: &Sbox, max_degree: u32) -> Vec<[u64; 4]> {
    let row_count = if max_degree >= 2 {
        QUADRATIC_MONOMIALS
    } else {
        LINEAR_MONOMIALS
    };
    let mut rows = vec![[0u64; 4]; row_count];

    for (i, &y) in sbox.iter().enumerate() {
        let vars = graph_variables(i, y);
        let word = i / 64;
        let bit = 1u64 << (i % 64);

        rows[0][word] |= bit;
        for (k, &v) in vars.iter().enumerate() {
            if v {
                rows[1 + k][word] |= bit;
            }
        }

        if max_degree >= 2 {
            let mut pos = 17;
            for a in 0..15 {
                for b in a + 1..16 {
                    if vars[a] && vars[b] {
                        rows[pos][word] |= bit;
                    }
                    pos += 1;
                }
            }
        }
    }

    rows
}

/// Computes the algebraic immunity of the S-box graph. A full-rank
/// degree-two monomial matrix means no quadratic annihilator exists (AI 3);
/// otherwise the linear matrix decides between AI 2 and AI 1.
pub fn algebraic_immunity(sbox: &Sbox) -> i32 {
    let mut quadratic = monomial_matrix(sbox, 2);
    if gf2_rank(&mut quadratic) == QUADRATIC_MONOMIALS as u32 {
        return 3;
    }

    let mut linear = monomial_matrix(sbox, 1);
    if gf2_rank(&mut linear) == LINEAR_MONOMIALS as u32 {
        return 2;
    }

    1
}

/// Returns true iff the S-box has a fixed point `sbox(i) = i` or an
/// inverse-fixed point `sbox(i) = i ^ 0xFF`.
pub fn has_fixed_points(sbox: &Sbox) -> bool {
    sbox.iter()
        .enumerate()
        .any(|(i, &v)| v == i as u8 || v == i as u8 ^ 0xff)
}

/// Removes fixed and inverse-fixed points by searching for an affine
/// transform `sbox'[i] = rol(sbox[rol(i, s1)], s2) ^ mask` without them.
/// The transform is a composition of bijections, so the result stays a
/// permutation, and its spectral properties are unchanged.
pub fn erase_fixed_points(sbox: &Sbox, seed: u64) -> Sbox {
    let mut rng = StdRng::seed_from_u64(seed);

    loop {
        let shift_in = rng.gen_range(0..8u32);
        let shift_out = rng.gen_range(0..8u32);
        let mask = rng.gen::<u8>();

        let mut result = [0u8; 256];
        for (i, slot) in result.iter_mut().enumerate() {
            let source = (i as u8).rotate_left(shift_in) as usize;
            *slot = sbox[source].rotate_left(shift_out) ^ mask;
        }

        if !has_fixed_points(&result) {
            return result;
        }
    }
}

/// Reference S-boxes with published property values, shared across the
/// crate's test modules.
#[cfg(test)]
pub(crate) mod test_vectors {
    use crate::Sbox;

    // AES S-box: NL 112, DU 4, AI 2.
    pub const AES_SBOX: Sbox = [
        0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab,
        0x76, 0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4,
        0x72, 0xc0, 0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71,
        0xd8, 0x31, 0x15, 0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2,
        0xeb, 0x27, 0xb2, 0x75, 0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6,
        0xb3, 0x29, 0xe3, 0x2f, 0x84, 0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb,
        0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf, 0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45,
        0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8, 0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5,
        0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2, 0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44,
        0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73, 0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a,
        0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb, 0xe0, 0x32, 0x3a, 0x0a, 0x49,
        0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79, 0xe7, 0xc8, 0x37, 0x6d,
        0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08, 0xba, 0x78, 0x25,
        0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a, 0x70, 0x3e,
        0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e, 0xe1,
        0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
        0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb,
        0x16,
    ];

    // Kalyna pi_0: NL 104, DU 8, AI 3.
    pub const KALYNA_PI0: Sbox = [
        0xa8, 0x43, 0x5f, 0x06, 0x6b, 0x75, 0x6c, 0x59, 0x71, 0xdf, 0x87, 0x95, 0x17, 0xf0, 0xd8,
        0x09, 0x6d, 0xf3, 0x1d, 0xcb, 0xc9, 0x4d, 0x2c, 0xaf, 0x79, 0xe0, 0x97, 0xfd, 0x6f, 0x4b,
        0x45, 0x39, 0x3e, 0xdd, 0xa3, 0x4f, 0xb4, 0xb6, 0x9a, 0x0e, 0x1f, 0xbf, 0x15, 0xe1, 0x49,
        0xd2, 0x93, 0xc6, 0x92, 0x72, 0x9e, 0x61, 0xd1, 0x63, 0xfa, 0xee, 0xf4, 0x19, 0xd5, 0xad,
        0x58, 0xa4, 0xbb, 0xa1, 0xdc, 0xf2, 0x83, 0x37, 0x42, 0xe4, 0x7a, 0x32, 0x9c, 0xcc, 0xab,
        0x4a, 0x8f, 0x6e, 0x04, 0x27, 0x2e, 0xe7, 0xe2, 0x5a, 0x96, 0x16, 0x23, 0x2b, 0xc2, 0x65,
        0x66, 0x0f, 0xbc, 0xa9, 0x47, 0x41, 0x34, 0x48, 0xfc, 0xb7, 0x6a, 0x88, 0xa5, 0x53, 0x86,
        0xf9, 0x5b, 0xdb, 0x38, 0x7b, 0xc3, 0x1e, 0x22, 0x33, 0x24, 0x28, 0x36, 0xc7, 0xb2, 0x3b,
        0x8e, 0x77, 0xba, 0xf5, 0x14, 0x9f, 0x08, 0x55, 0x9b, 0x4c, 0xfe, 0x60, 0x5c, 0xda, 0x18,
        0x46, 0xcd, 0x7d, 0x21, 0xb0, 0x3f, 0x1b, 0x89, 0xff, 0xeb, 0x84, 0x69, 0x3a, 0x9d, 0xd7,
        0xd3, 0x70, 0x67, 0x40, 0xb5, 0xde, 0x5d, 0x30, 0x91, 0xb1, 0x78, 0x11, 0x01, 0xe5, 0x00,
        0x68, 0x98, 0xa0, 0xc5, 0x02, 0xa6, 0x74, 0x2d, 0x0b, 0xa2, 0x76, 0xb3, 0xbe, 0xce, 0xbd,
        0xae, 0xe9, 0x8a, 0x31, 0x1c, 0xec, 0xf1, 0x99, 0x94, 0xaa, 0xf6, 0x26, 0x2f, 0xef, 0xe8,
        0x8c, 0x35, 0x03, 0xd4, 0x7f, 0xfb, 0x05, 0xc1, 0x5e, 0x90, 0x20, 0x3d, 0x82, 0xf7, 0xea,
        0x0a, 0x0d, 0x7e, 0xf8, 0x50, 0x1a, 0xc4, 0x07, 0x57, 0xb8, 0x3c, 0x62, 0xe3, 0xc8, 0xac,
        0x52, 0x64, 0x10, 0xd0, 0xd9, 0x13, 0x0c, 0x12, 0x29, 0x51, 0xb9, 0xcf, 0xd6, 0x73, 0x8d,
        0x81, 0x54, 0xc0, 0xed, 0x4e, 0x44, 0xa7, 0x2a, 0x85, 0x25, 0xe6, 0xca, 0x7c, 0x8b, 0x56,
        0x80,
    ];

    pub fn identity_sbox() -> Sbox {
        let mut sbox = [0u8; 256];
        for (i, v) in sbox.iter_mut().enumerate() {
            *v = i as u8;
        }
        sbox
    }
}

#[cfg(test)]
mod tests {
    use super::test_vectors::{identity_sbox, AES_SBOX, KALYNA_PI0};
    use super::*;

    #[test]
    fn nonlinearity_of_reference_sboxes() {
        assert_eq!(nonlinearity(&AES_SBOX), 112);
        assert_eq!(nonlinearity(&KALYNA_PI0), 104);
        assert_eq!(nonlinearity(&identity_sbox()), 0);
    }

    #[test]
    fn delta_uniformity_of_reference_sboxes() {
        assert_eq!(delta_uniformity(&AES_SBOX), 4);
        assert_eq!(delta_uniformity(&KALYNA_PI0), 8);
        assert_eq!(delta_uniformity(&identity_sbox()), 256);
    }

    #[test]
    fn algebraic_immunity_of_reference_sboxes() {
        assert_eq!(algebraic_immunity(&AES_SBOX), 2);
        assert_eq!(algebraic_immunity(&KALYNA_PI0), 3);
        assert_eq!(algebraic_immunity(&identity_sbox()), 1);
    }

    #[test]
    fn fixed_point_detection() {
        assert!(has_fixed_points(&identity_sbox()));
        // AES maps 0x00 -> 0x63 and has no fixed or inverse-fixed points.
        assert!(!has_fixed_points(&AES_SBOX));

        let mut inverse_fixed = AES_SBOX;
        let v = inverse_fixed[0x12];
        let p = inverse_fixed.iter().position(|&x| x == 0x12 ^ 0xff).unwrap();
        inverse_fixed[0x12] = 0x12 ^ 0xff;
        inverse_fixed[p] = v;
        assert!(has_fixed_points(&inverse_fixed));
    }

    #[test]
    fn erasing_fixed_points_yields_a_clean_bijection() {
        for seed in 0..4u64 {
            let erased = erase_fixed_points(&identity_sbox(), seed);
            assert!(is_bijective(&erased));
            assert!(!has_fixed_points(&erased));
        }
    }

    #[test]
    fn bijectivity_check() {
        assert!(is_bijective(&AES_SBOX));
        let mut broken = AES_SBOX;
        broken[7] = broken[3];
        assert!(!is_bijective(&broken));
    }
}
