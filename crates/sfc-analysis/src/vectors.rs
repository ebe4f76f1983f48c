//! Time and frequency axes, and nearest-value lookup.

use crate::{Error, Result};
use ndarray::{Array1, ArrayBase, Data, Ix1};
use std::fmt;
use std::str::FromStr;

/// Which half of the FFT bin grid a frequency vector covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Sided {
    /// DC up to Nyquist, `n / 2 + 1` bins.
    #[default]
    Single,
    /// The full FFT grid, `n` bins, not centered.
    Double,
}

impl FromStr for Sided {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(Sided::Single),
            "double" => Ok(Sided::Double),
            other => Err(Error::invalid(
                "sided",
                format!("expected 'single' or 'double', got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Sided {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sided::Single => f.write_str("single"),
            Sided::Double => f.write_str("double"),
        }
    }
}

/// Sample times of `n` taps at `sample_rate`, in seconds.
pub fn time_vector(n: usize, sample_rate: f64) -> Array1<f64> {
    Array1::from_shape_fn(n, |i| i as f64 / sample_rate)
}

/// Bin frequencies of an `n`-point FFT at `sample_rate`, in Hz.
pub fn frequency_vector(n: usize, sample_rate: f64, sided: Sided) -> Array1<f64> {
    let len = match sided {
        Sided::Single => n / 2 + 1,
        Sided::Double => n,
    };
    let df = sample_rate / n as f64;
    Array1::from_shape_fn(len, |k| k as f64 * df)
}

/// Find the element of `array` closest to `value`, with its index.
///
/// Ties resolve to the lowest index. NaN elements are skipped. Returns `None`
/// for an empty array or one without a comparable element.
pub fn nearest_index<S>(array: &ArrayBase<S, Ix1>, value: f64) -> Option<(f64, usize)>
where
    S: Data<Elem = f64>,
{
    let mut best: Option<(f64, usize, f64)> = None;
    for (i, &v) in array.iter().enumerate() {
        let distance = (v - value).abs();
        if distance.is_nan() {
            continue;
        }
        match best {
            Some((_, _, d)) if distance >= d => {}
            _ => best = Some((v, i, distance)),
        }
    }
    best.map(|(v, i, _)| (v, i))
}
