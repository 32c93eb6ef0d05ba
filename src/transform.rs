//! The transform kernel: Walsh–Hadamard spectra of S-box components and
//! rank computation over GF(2).

use crate::Sbox;

/// Calculates the modulo 2 sum of the bits in the input.
#[inline(always)]
pub fn parity(input: u8) -> u8 {
    let mut y = input;

    y ^= y >> 4;
    y ^= y >> 2;
    y ^= y >> 1;
    y & 1
}

/// Computes the Walsh–Hadamard spectrum of a 256-entry Boolean truth table.
///
/// The signs are loaded in reversed index order, `s[i] = 1 - 2*t[255 - i]`,
/// which permutes the output entries but leaves their value multiset
/// intact. The butterfly then runs in place with strides 1, 2, ..., 128.
pub fn fwht(truth_table: &[u8; 256], spectrum: &mut [i32; 256]) {
    for i in 0..256 {
        spectrum[i] = 1 - 2 * i32::from(truth_table[255 - i]);
    }

    let mut step = 1;
    while step < 256 {
        let mut left = 0;
        while left < 256 {
            for j in left..left + step {
                let a = spectrum[j + step];
                let b = spectrum[j];
                spectrum[j] = a + b;
                spectrum[j + step] = a - b;
            }
            left += 2 * step;
        }
        step *= 2;
    }
}

/// Extracts the truth table of the component function `x -> <mask, sbox(x)>`.
#[inline]
pub fn component_truth_table(sbox: &Sbox, mask: u8, table: &mut [u8; 256]) {
    for i in 0..256 {
        table[i] = parity(sbox[i] & mask);
    }
}

/// Computes the Walsh–Hadamard spectrum of one component function of an S-box.
pub fn component_spectrum(sbox: &Sbox, mask: u8, spectrum: &mut [i32; 256]) {
    let mut table = [0u8; 256];
    component_truth_table(sbox, mask, &mut table);
    fwht(&table, spectrum);
}

/// Computes the rank of a boolean matrix over GF(2). Each row packs 256
/// columns into four 64-bit words. The matrix is consumed in place.
pub fn gf2_rank(rows: &mut [[u64; 4]]) -> u32 {
    let mut rank = 0;

    for col in 0..256 {
        let word = col / 64;
        let bit = 1u64 << (col % 64);

        // Find a row with a leading one in this column
        let pivot = match (rank..rows.len()).find(|&r| rows[r][word] & bit != 0) {
            Some(r) => r,
            None => continue,
        };
        rows.swap(rank, pivot);

        let pivot_row = rows[rank];
        for (r, row) in rows.iter_mut().enumerate() {
            if r != rank && row[word] & bit != 0 {
                for w in 0..4 {
                    row[w] ^= pivot_row[w];
                }
            }
        }

        rank += 1;
        if rank == rows.len() {
            break;
        }
    }

    rank as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_of_bytes() {
        assert_eq!(parity(0x00), 0);
        assert_eq!(parity(0x01), 1);
        assert_eq!(parity(0x03), 0);
        assert_eq!(parity(0xff), 0);
        assert_eq!(parity(0xfe), 1);
    }

    #[test]
    fn fwht_of_constant_zero_function() {
        let table = [0u8; 256];
        let mut spectrum = [0i32; 256];
        fwht(&table, &mut spectrum);

        assert_eq!(spectrum[0], 256);
        assert!(spectrum[1..].iter().all(|&v| v == 0));
    }

    #[test]
    fn fwht_of_linear_function_is_a_single_peak() {
        // t(x) = <1, x> is affine, so its spectrum concentrates in one entry.
        let mut table = [0u8; 256];
        for (i, t) in table.iter_mut().enumerate() {
            *t = (i & 1) as u8;
        }
        let mut spectrum = [0i32; 256];
        fwht(&table, &mut spectrum);

        assert_eq!(spectrum.iter().filter(|&&v| v != 0).count(), 1);
        assert_eq!(spectrum.iter().map(|&v| v.abs()).max(), Some(256));
    }

    #[test]
    fn fwht_satisfies_parseval() {
        let mut table = [0u8; 256];
        for (i, t) in table.iter_mut().enumerate() {
            *t = ((i * i + 3 * i) % 7 & 1) as u8;
        }
        let mut spectrum = [0i32; 256];
        fwht(&table, &mut spectrum);

        let energy: i64 = spectrum.iter().map(|&v| i64::from(v) * i64::from(v)).sum();
        assert_eq!(energy, 256 * 256);
    }

    #[test]
    fn rank_of_unit_rows() {
        let mut rows: Vec<[u64; 4]> = (0..17)
            .map(|i| {
                let mut row = [0u64; 4];
                row[i / 64] = 1 << (i % 64);
                row
            })
            .collect();
        assert_eq!(gf2_rank(&mut rows), 17);
    }

    #[test]
    fn rank_of_dependent_rows() {
        let a = [0b011u64, 0, 0, 0];
        let b = [0b101u64, 0, 0, 0];
        let c = [0b110u64, 0, 0, 0]; // a ^ b
        let mut rows = vec![a, b, c];
        assert_eq!(gf2_rank(&mut rows), 2);

        let mut zero = vec![[0u64; 4]; 5];
        assert_eq!(gf2_rank(&mut zero), 0);
    }
}
