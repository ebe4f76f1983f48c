//! Regularization of frequency-domain deconvolution.
//!
//! A regularization parameter is added to the reference power `|X|²` before
//! dividing by it. It can be a single value for all bins or an array that
//! broadcasts against the spectrum with the frequency axis last.

use crate::array::move_axis;
use crate::fft::rfft_axis;
use crate::{Error, Result};
use ndarray::{Array, Array1, ArrayBase, ArrayD, Axis, Data, Dimension, RemoveAxis};

/// Regularization parameter for [`transfer_function`](crate::transfer_function)
/// and [`pressure_matching`](crate::pressure_matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Regularization {
    /// Same value for every frequency bin.
    Scalar(f64),
    /// Per-bin values, frequency axis last.
    Bins(ArrayD<f64>),
}

impl Default for Regularization {
    fn default() -> Self {
        Regularization::Scalar(f64::EPSILON)
    }
}

impl Regularization {
    /// The parameter as an array; a scalar becomes a 0-dimensional array.
    pub fn to_array(&self) -> ArrayD<f64> {
        match self {
            Regularization::Scalar(value) => ArrayD::from_elem(ndarray::IxDyn(&[]), *value),
            Regularization::Bins(bins) => bins.clone(),
        }
    }

    /// Shape of the parameter, empty for a scalar.
    pub fn shape(&self) -> &[usize] {
        match self {
            Regularization::Scalar(_) => &[],
            Regularization::Bins(bins) => bins.shape(),
        }
    }
}

impl From<f64> for Regularization {
    fn from(value: f64) -> Self {
        Regularization::Scalar(value)
    }
}

impl From<Array1<f64>> for Regularization {
    fn from(bins: Array1<f64>) -> Self {
        Regularization::Bins(bins.into_dyn())
    }
}

impl From<ArrayD<f64>> for Regularization {
    fn from(bins: ArrayD<f64>) -> Self {
        Regularization::Bins(bins)
    }
}

/// How to pick the regularization for a measurement.
///
/// Resolved against the reference and the recorded signals once they are
/// available, see [`RegularizationPolicy::resolve`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)
)]
pub enum RegularizationPolicy {
    /// A fixed value for all bins.
    Constant {
        /// Regularization value.
        value: f64,
    },
    /// Fill up the reference power to `dynamic_range_db` below its peak.
    DynamicRange {
        /// Dynamic range in dB.
        dynamic_range_db: f64,
    },
    /// Estimated noise-to-signal ratio from repeated recordings.
    NoiseToSignal,
}

impl Default for RegularizationPolicy {
    fn default() -> Self {
        RegularizationPolicy::Constant {
            value: f64::EPSILON,
        }
    }
}

impl RegularizationPolicy {
    /// Compute the regularization for reference `x` and recordings `y`.
    ///
    /// Both signals have time along axis 0. [`DynamicRange`] yields bins of
    /// shape `(x.shape[1..], nf)`, [`NoiseToSignal`] yields `(nf,)`; both
    /// broadcast against the spectrum used by
    /// [`transfer_function`](crate::transfer_function).
    ///
    /// [`DynamicRange`]: RegularizationPolicy::DynamicRange
    /// [`NoiseToSignal`]: RegularizationPolicy::NoiseToSignal
    pub fn resolve<S1, S2, D1, D2>(
        &self,
        x: &ArrayBase<S1, D1>,
        y: &ArrayBase<S2, D2>,
    ) -> Result<Regularization>
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>,
        D1: Dimension,
        D2: Dimension,
    {
        match self {
            RegularizationPolicy::Constant { value } => Ok(Regularization::Scalar(*value)),
            RegularizationPolicy::DynamicRange { dynamic_range_db } => {
                if x.ndim() == 0 {
                    return Err(Error::invalid("x", "expected at least one dimension"));
                }
                let last = x.ndim() - 1;
                let time_last = move_axis(x.view().into_dyn(), 0, last);
                regularization_fill_up_below_dynamic_range(*dynamic_range_db, &time_last)
                    .map(Regularization::Bins)
            }
            RegularizationPolicy::NoiseToSignal => {
                estimate_noise_to_signal_ratio(&x.view().into_dyn(), &y.view().into_dyn())
                    .map(Regularization::from)
            }
        }
    }
}

/// Regularization that lifts weak bins of the reference to a power floor.
///
/// `x` is a time signal, transformed along its last axis. With
/// `maxdB = max(20·log10|X|)` taken over all bins and lanes, the floor is
/// `maxdB - dynamic_range_db` and the result is
/// `max(0, 10^(floor/10) - |X|²)` per bin, so `|X|² + reg` never drops below
/// the floor while well-excited bins stay unregularized.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a 0-dimensional `x`.
pub fn regularization_fill_up_below_dynamic_range<S, D>(
    dynamic_range_db: f64,
    x: &ArrayBase<S, D>,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if x.ndim() == 0 {
        return Err(Error::invalid("x", "expected at least one dimension"));
    }
    let axis = Axis(x.ndim() - 1);
    let spectrum = rfft_axis(x, axis, x.len_of(axis));
    let power = spectrum.mapv(|c| c.norm_sqr());

    let max_db = spectrum
        .iter()
        .map(|c| 20.0 * c.norm().log10())
        .fold(f64::NEG_INFINITY, f64::max);
    let floor = 10f64.powf((max_db - dynamic_range_db) / 10.0);

    Ok(power.mapv(|p| (floor - p).max(0.0)))
}

/// Per-bin noise-to-signal ratio from repeated measurements.
///
/// Models `y = h * x + n` with zero-mean Gaussian noise `n`. Time is axis 0
/// for both signals and the last axis of `y` holds repetitions. The noise
/// power of a bin is the variance of `Y` across repetitions, averaged over
/// the remaining axes; the signal power is the mean of `|X|²` over all
/// non-frequency axes.
///
/// The variance needs at least two repetitions to be meaningful.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `y` has fewer than two dimensions or
/// if the time lengths of `x` and `y` differ.
pub fn estimate_noise_to_signal_ratio<S1, S2, D1, D2>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
) -> Result<Array1<f64>>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D1: RemoveAxis,
    D2: RemoveAxis,
{
    if y.ndim() < 2 {
        return Err(Error::invalid(
            "y",
            format!("expected a trailing repetition axis, got shape {:?}", y.shape()),
        ));
    }
    if x.ndim() == 0 || x.len_of(Axis(0)) != y.len_of(Axis(0)) {
        return Err(Error::invalid(
            "x",
            format!(
                "time length must match y: x has shape {:?}, y has shape {:?}",
                x.shape(),
                y.shape()
            ),
        ));
    }

    let n = y.len_of(Axis(0));
    let big_x = rfft_axis(x, Axis(0), n);
    let big_y = rfft_axis(y, Axis(0), n);
    let rep_axis = Axis(y.ndim() - 2);

    let ratio = big_y
        .axis_iter(Axis(0))
        .zip(big_x.axis_iter(Axis(0)))
        .map(|(y_bin, x_bin)| {
            let variances: Vec<f64> = y_bin
                .lanes(rep_axis)
                .into_iter()
                .map(|reps| {
                    let mean = reps.sum() / reps.len() as f64;
                    reps.iter().map(|v| (v - mean).norm_sqr()).sum::<f64>() / reps.len() as f64
                })
                .collect();
            let noise = variances.iter().sum::<f64>() / variances.len() as f64;
            let signal = x_bin.iter().map(|v| v.norm_sqr()).sum::<f64>() / x_bin.len() as f64;
            noise / signal
        })
        .collect();

    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, array};
    use std::f64::consts::PI;

    #[test]
    fn default_is_machine_epsilon() {
        assert_eq!(Regularization::default(), Regularization::Scalar(f64::EPSILON));
        assert!(Regularization::default().shape().is_empty());
    }

    #[test]
    fn conversions() {
        assert_eq!(Regularization::from(0.5), Regularization::Scalar(0.5));
        let bins = Regularization::from(array![1.0, 2.0]);
        assert_eq!(bins.shape(), &[2]);
        assert_eq!(Regularization::Scalar(3.0).to_array().ndim(), 0);
    }

    #[test]
    fn fill_up_leaves_strong_bins_alone() {
        // Impulse: flat unit spectrum, nothing to fill
        let mut x = Array1::zeros(16);
        x[0] = 1.0;
        let reg = regularization_fill_up_below_dynamic_range(60.0, &x).unwrap();
        assert_eq!(reg.len(), 9);
        assert!(reg.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn fill_up_reaches_floor() {
        let n = 32;
        let x = Array1::from_shape_fn(n, |i| (2.0 * PI * 4.0 * i as f64 / n as f64).cos());
        let reg = regularization_fill_up_below_dynamic_range(20.0, &x).unwrap();
        let power = rfft_axis(&x, Axis(0), n).mapv(|c| c.norm_sqr());

        // Peak |X| = n / 2, floor 20 dB below in power
        let floor = (n as f64 / 2.0).powi(2) / 100.0;
        assert_eq!(reg[4], 0.0);
        for k in 0..reg.len() {
            assert!(reg[k] >= 0.0);
            if k != 4 {
                assert!((power[k] + reg[k] - floor).abs() < 1e-9 * floor);
            }
        }
    }

    #[test]
    fn fill_up_rejects_scalar() {
        let x = ndarray::arr0(1.0);
        assert!(regularization_fill_up_below_dynamic_range(20.0, &x).is_err());
    }

    #[test]
    fn noise_to_signal_zero_for_identical_repetitions() {
        let n = 8;
        let x = Array1::from_shape_fn(n, |i| (i as f64 * 0.7).sin());
        let y = Array2::from_shape_fn((n, 3), |(i, _)| 2.0 * x[i]);
        let ratio = estimate_noise_to_signal_ratio(&x, &y).unwrap();
        assert_eq!(ratio.len(), 5);
        assert!(ratio.iter().all(|&r| r.abs() < 1e-20));
    }

    #[test]
    fn noise_to_signal_matches_direct_variance() {
        // Impulse reference: |X|² = 1 in every bin
        let n = 4;
        let mut x = Array1::zeros(n);
        x[0] = 1.0;
        // Two repetitions differing by a DC offset of 2 -> DC bins 0 and 8
        let y = Array3::from_shape_fn((n, 1, 2), |(_, _, rep)| rep as f64 * 2.0);
        let ratio = estimate_noise_to_signal_ratio(&x, &y).unwrap();

        // Variance of {0, 8} is 16
        assert!((ratio[0] - 16.0).abs() < 1e-12);
        assert!(ratio[1].abs() < 1e-20);
        assert!(ratio[2].abs() < 1e-20);
    }

    #[test]
    fn noise_to_signal_rejects_bad_shapes() {
        let x = Array1::<f64>::zeros(8);
        let y1 = Array1::<f64>::zeros(8);
        assert!(estimate_noise_to_signal_ratio(&x, &y1).is_err());

        let y2 = Array2::<f64>::zeros((6, 2));
        let err = estimate_noise_to_signal_ratio(&x, &y2).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "x", .. }));
    }

    #[test]
    fn policy_resolves() {
        let mut x = Array1::zeros(8);
        x[0] = 1.0;
        let y = Array2::from_shape_fn((8, 2), |(i, _)| x[i]);

        let reg = RegularizationPolicy::default().resolve(&x, &y).unwrap();
        assert_eq!(reg, Regularization::Scalar(f64::EPSILON));

        let reg = RegularizationPolicy::DynamicRange {
            dynamic_range_db: 40.0,
        }
        .resolve(&x, &y)
        .unwrap();
        assert_eq!(reg.shape(), &[5]);

        let reg = RegularizationPolicy::NoiseToSignal.resolve(&x, &y).unwrap();
        assert_eq!(reg.shape(), &[5]);
    }
}
