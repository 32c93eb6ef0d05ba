//! Cost functions scoring the Walsh–Hadamard spectrum of a candidate
//! permutation. Every function walks the 255 nonzero component masks,
//! transforms the component truth table and folds the absolute spectrum
//! values into a scalar; all of them also report the nonlinearity extracted
//! from the same sweep.

use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use crate::transform::component_spectrum;
use crate::Sbox;

/// Numeric domain a search runs in. Costs are accumulated either as 64-bit
/// floats or as 64-bit signed integers; the integer domain uses checked
/// arithmetic so that a value leaving the domain aborts instead of wrapping.
pub trait CostValue:
    Copy + PartialOrd + Sub<Output = Self> + fmt::Display + Send + Sync + 'static
{
    const ZERO: Self;
    const ONE: Self;

    fn from_int(value: i64) -> Self;
    fn add(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    /// Raises to a non-negative integer power.
    fn powu(self, exp: u32) -> Self;
    /// Evaluates `2^((delta / 4) * r)`; the integer domain floor-divides
    /// `delta` by four and shifts, the float domain uses a real power.
    fn exp2_scaled(delta: i64, r: i32) -> Self;
    fn to_f64(self) -> f64;
}

impl CostValue for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    fn from_int(value: i64) -> Self {
        value as f64
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }

    fn div(self, rhs: Self) -> Self {
        self / rhs
    }

    fn powu(self, exp: u32) -> Self {
        self.powi(exp as i32)
    }

    fn exp2_scaled(delta: i64, r: i32) -> Self {
        (delta as f64 / 4.0 * f64::from(r)).exp2()
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl CostValue for i64 {
    const ZERO: Self = 0;
    const ONE: Self = 1;

    fn from_int(value: i64) -> Self {
        value
    }

    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).expect("cost sum leaves the int64 domain")
    }

    fn mul(self, rhs: Self) -> Self {
        self.checked_mul(rhs).expect("cost product leaves the int64 domain")
    }

    fn div(self, rhs: Self) -> Self {
        self / rhs
    }

    fn powu(self, exp: u32) -> Self {
        self.checked_pow(exp).expect("cost power leaves the int64 domain")
    }

    fn exp2_scaled(delta: i64, r: i32) -> Self {
        let shift = (delta / 4) * i64::from(r);
        if shift < 0 {
            return 0;
        }
        assert!(shift < 64, "cost shift width must stay below 64");
        1 << shift
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Scalar cost of a candidate together with the nonlinearity observed while
/// computing it.
#[derive(Clone, Copy, Debug)]
pub struct CostInfo<T> {
    pub cost: T,
    pub nonlinearity: i32,
}

/// A cost function kind with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CostFunction {
    Whs { r: i32, x: i32 },
    MaxWhs { r: i32, x: i32 },
    Wcf,
    Pcf { n: i32 },
    Cf1 { r: i32, x: i32, y: i32 },
    Cf2 { r: i32, x: i32, y: i32 },
}

impl CostFunction {
    /// Scores an S-box in the chosen numeric domain.
    pub fn evaluate<T: CostValue>(&self, sbox: &Sbox) -> CostInfo<T> {
        match *self {
            // maxWHS shares the WHS accumulation term for term.
            CostFunction::Whs { r, x } | CostFunction::MaxWhs { r, x } => whs(sbox, r, x),
            CostFunction::Wcf => wcf(sbox),
            CostFunction::Pcf { n } => pcf(sbox, n),
            CostFunction::Cf1 { r, x, y } => cf1(sbox, r, x, y),
            CostFunction::Cf2 { r, x, y } => cf2(sbox, r, x, y),
        }
    }

    /// Builds a cost function from a kind name and its comma-separated
    /// parameter list, with exact arity checking.
    pub fn parse(kind: CostFunctionKind, params: &str) -> Result<CostFunction, String> {
        let values = parse_int_list(params)?;
        let arity_error = |expected: usize| {
            format!(
                "cost function {} takes {} parameter(s), got {}",
                kind,
                expected,
                values.len()
            )
        };

        match kind {
            CostFunctionKind::Whs | CostFunctionKind::MaxWhs => {
                if values.len() != 2 {
                    return Err(arity_error(2));
                }
                let (r, x) = (values[0], values[1]);
                Ok(match kind {
                    CostFunctionKind::Whs => CostFunction::Whs { r, x },
                    _ => CostFunction::MaxWhs { r, x },
                })
            }
            CostFunctionKind::Wcf => {
                if !values.is_empty() {
                    return Err(arity_error(0));
                }
                Ok(CostFunction::Wcf)
            }
            CostFunctionKind::Pcf => {
                if values.len() != 1 {
                    return Err(arity_error(1));
                }
                Ok(CostFunction::Pcf { n: values[0] })
            }
            CostFunctionKind::Cf1 | CostFunctionKind::Cf2 => {
                if values.len() != 3 {
                    return Err(arity_error(3));
                }
                let (r, x, y) = (values[0], values[1], values[2]);
                Ok(match kind {
                    CostFunctionKind::Cf1 => CostFunction::Cf1 { r, x, y },
                    _ => CostFunction::Cf2 { r, x, y },
                })
            }
        }
    }
}

/// Cost function selector as it appears on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostFunctionKind {
    Whs,
    MaxWhs,
    Wcf,
    Pcf,
    Cf1,
    Cf2,
}

impl FromStr for CostFunctionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whs" => Ok(CostFunctionKind::Whs),
            "max_whs" => Ok(CostFunctionKind::MaxWhs),
            "wcf" => Ok(CostFunctionKind::Wcf),
            "pcf" => Ok(CostFunctionKind::Pcf),
            "cf1" => Ok(CostFunctionKind::Cf1),
            "cf2" => Ok(CostFunctionKind::Cf2),
            _ => Err(String::from("Unknown cost function.")),
        }
    }
}

impl fmt::Display for CostFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CostFunctionKind::Whs => "whs",
            CostFunctionKind::MaxWhs => "max_whs",
            CostFunctionKind::Wcf => "wcf",
            CostFunctionKind::Pcf => "pcf",
            CostFunctionKind::Cf1 => "cf1",
            CostFunctionKind::Cf2 => "cf2",
        };
        write!(f, "{}", name)
    }
}

/// Parses a comma-separated integer list; surrounding braces and whitespace
/// are tolerated.
fn parse_int_list(params: &str) -> Result<Vec<i32>, String> {
    let trimmed = params.trim().trim_start_matches('{').trim_end_matches('}');
    if trimmed.trim().is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| format!("could not parse cost function parameter `{}`", part.trim()))
        })
        .collect()
}

/// Runs the mask sweep, handing every spectrum to `fold` and returning the
/// nonlinearity observed across all components.
fn sweep_spectra<F: FnMut(&[i32; 256])>(sbox: &Sbox, mut fold: F) -> i32 {
    let mut spectrum = [0i32; 256];
    let mut max_abs = 0;

    for mask in 1..=255u8 {
        component_spectrum(sbox, mask, &mut spectrum);
        debug_assert!(spectrum.iter().all(|&v| v.abs() <= 256));

        for &v in spectrum.iter() {
            max_abs = max_abs.max(v.abs());
        }
        fold(&spectrum);
    }

    128 - max_abs / 2
}

/// The WHS kernel: `|v - x|^r` per spectrum value, or the reciprocal power
/// for negative `r` (zero bases contribute nothing there). The sign of `r`
/// is a read-only switch.
fn whs<T: CostValue>(sbox: &Sbox, r: i32, x: i32) -> CostInfo<T> {
    let mut cost = T::ZERO;

    let nonlinearity = sweep_spectra(sbox, |spectrum| {
        for &v in spectrum.iter() {
            let base = i64::from((v.abs() - x).abs());
            if r >= 0 {
                cost = cost.add(T::from_int(base).powu(r as u32));
            } else if base != 0 {
                cost = cost.add(T::ONE.div(T::from_int(base).powu(r.unsigned_abs())));
            }
        }
    });

    CostInfo { cost, nonlinearity }
}

/// The WCF kernel: spectrum values at or below 32 are free; larger ones
/// contribute the product of `(v - k)` for `k = 32, 28, ..., 0`.
fn wcf<T: CostValue>(sbox: &Sbox) -> CostInfo<T> {
    let mut cost = T::ZERO;

    let nonlinearity = sweep_spectra(sbox, |spectrum| {
        for &v in spectrum.iter() {
            let v = v.abs();
            if v <= 32 {
                continue;
            }

            let mut part = T::ONE;
            let mut k = 32;
            while k >= 0 {
                part = part.mul(T::from_int(i64::from(v - k)));
                k -= 4;
            }
            cost = cost.add(part);
        }
    });

    CostInfo { cost, nonlinearity }
}

/// The PCF kernel: a histogram of absolute spectrum values over the whole
/// sweep; the cost weights the `n` bins below the highest populated index
/// (scanned downwards in steps of four) with powers of one half.
fn pcf<T: CostValue>(sbox: &Sbox, n: i32) -> CostInfo<T> {
    let mut histogram = [0i64; 257];

    let nonlinearity = sweep_spectra(sbox, |spectrum| {
        for &v in spectrum.iter() {
            histogram[v.unsigned_abs() as usize] += 1;
        }
    });

    let mut max_index: usize = 256;
    while max_index > 0 && histogram[max_index] == 0 {
        max_index -= 4;
    }

    let mut cost = T::ZERO;
    for i in 0..n.max(0) as usize {
        if i > max_index {
            break;
        }
        cost = cost.add(T::from_int(histogram[max_index - i]).div(T::from_int(1 << i)));
    }

    CostInfo { cost, nonlinearity }
}

/// The CF1 kernel: values at or below `x` are free; larger ones contribute
/// a quarter of `|v - y|^r` (negative `r` flips to four times the
/// reciprocal power, skipping exact-zero bases).
fn cf1<T: CostValue>(sbox: &Sbox, r: i32, x: i32, y: i32) -> CostInfo<T> {
    let mut cost = T::ZERO;
    let four = T::from_int(4);

    let nonlinearity = sweep_spectra(sbox, |spectrum| {
        for &v in spectrum.iter() {
            let v = v.abs();
            if v <= x {
                continue;
            }

            let base = i64::from((v - y).abs());
            if r >= 0 {
                cost = cost.add(T::from_int(base).powu(r as u32).div(four));
            } else if base != 0 {
                cost = cost.add(T::ONE.div(T::from_int(base).powu(r.unsigned_abs())).mul(four));
            }
        }
    });

    CostInfo { cost, nonlinearity }
}

/// The CF2 kernel: values at or below `x` are free; larger ones contribute
/// `2^(((v - y) / 4) * r)`.
fn cf2<T: CostValue>(sbox: &Sbox, r: i32, x: i32, y: i32) -> CostInfo<T> {
    let mut cost = T::ZERO;

    let nonlinearity = sweep_spectra(sbox, |spectrum| {
        for &v in spectrum.iter() {
            let v = v.abs();
            if v <= x {
                continue;
            }
            cost = cost.add(T::exp2_scaled(i64::from(v - y), r));
        }
    });

    CostInfo { cost, nonlinearity }
}
