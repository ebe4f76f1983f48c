//! Transfer function estimation by regularized deconvolution

use crate::array::{broadcast_shape, checked_axis, move_axis};
use crate::fft::{irfft_axis, rfft_axis};
use crate::regularization::Regularization;
use crate::{Error, Result};
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn, Zip};
use rustfft::num_complex::Complex64;

/// Result of [`transfer_function`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransferFunction {
    /// Real impulse response, same length as the input along the time axis.
    Impulse(ArrayD<f64>),
    /// Complex one-sided frequency response, `n / 2 + 1` bins along the time axis.
    Frequency(ArrayD<Complex64>),
}

impl TransferFunction {
    /// The impulse response, if that is what was computed.
    pub fn impulse(&self) -> Option<&ArrayD<f64>> {
        match self {
            TransferFunction::Impulse(h) => Some(h),
            TransferFunction::Frequency(_) => None,
        }
    }

    /// The frequency response, if that is what was computed.
    pub fn frequency(&self) -> Option<&ArrayD<Complex64>> {
        match self {
            TransferFunction::Frequency(h) => Some(h),
            TransferFunction::Impulse(_) => None,
        }
    }
}

/// Estimate the system between reference `x` and response `y`.
///
/// Computes `H = Y·conj(X) / (|X|² + reg)` per frequency bin, with `X` and `Y`
/// the real FFTs along `axis`. For the division the frequency axis of both
/// spectra is moved last, so `X`, `Y` and `reg` broadcast against each other
/// with frequency as the trailing axis; it is moved back to `axis` in the
/// result.
///
/// With `return_time` the impulse response is returned, inverse transformed
/// to the length `n` of `x` along `axis`. Otherwise the complex frequency
/// response is returned.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `axis` is out of bounds or `x` and
/// `y` differ in length along it, and [`Error::Broadcast`] if the spectra and
/// `reg` do not broadcast.
pub fn transfer_function<S1, S2, D1, D2>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
    reg: &Regularization,
    axis: usize,
    return_time: bool,
) -> Result<TransferFunction>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D1: Dimension,
    D2: Dimension,
{
    if return_time {
        impulse_response(x, y, reg, axis).map(TransferFunction::Impulse)
    } else {
        frequency_response(x, y, reg, axis).map(TransferFunction::Frequency)
    }
}

/// Regularized frequency response between `x` and `y`, see [`transfer_function`].
pub fn frequency_response<S1, S2, D1, D2>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
    reg: &Regularization,
    axis: usize,
) -> Result<ArrayD<Complex64>>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D1: Dimension,
    D2: Dimension,
{
    let x_axis = checked_axis(x.ndim(), axis, "x")?;
    let y_axis = checked_axis(y.ndim(), axis, "y")?;
    let n = x.len_of(x_axis);
    if y.len_of(y_axis) != n {
        return Err(Error::invalid(
            "y",
            format!(
                "length {} along axis {axis} does not match x ({n})",
                y.len_of(y_axis)
            ),
        ));
    }

    let big_x = rfft_axis(&x.view().into_dyn(), x_axis, n);
    let big_y = rfft_axis(&y.view().into_dyn(), y_axis, n);
    let reg = reg.to_array();

    // Frequency last for broadcasting
    let big_x = move_axis(big_x.view(), axis, x.ndim() - 1);
    let big_y = move_axis(big_y.view(), axis, y.ndim() - 1);

    let shape = broadcast_shape(big_x.shape(), big_y.shape())?;
    let shape = broadcast_shape(&shape, reg.shape())?;
    let dim = IxDyn(&shape);

    let big_x = big_x.broadcast(dim.clone()).ok_or_else(|| Error::Broadcast {
        lhs: big_x.shape().to_vec(),
        rhs: shape.clone(),
    })?;
    let big_y = big_y.broadcast(dim.clone()).ok_or_else(|| Error::Broadcast {
        lhs: big_y.shape().to_vec(),
        rhs: shape.clone(),
    })?;
    let reg = reg.broadcast(dim).ok_or_else(|| Error::Broadcast {
        lhs: reg.shape().to_vec(),
        rhs: shape.clone(),
    })?;

    let h = Zip::from(&big_y)
        .and(&big_x)
        .and(&reg)
        .map_collect(|y, x, r| y * x.conj() / (x.norm_sqr() + r));

    let h = move_axis(h.view(), shape.len() - 1, axis);
    Ok(h.as_standard_layout().into_owned())
}

/// Regularized impulse response between `x` and `y`, see [`transfer_function`].
pub fn impulse_response<S1, S2, D1, D2>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
    reg: &Regularization,
    axis: usize,
) -> Result<ArrayD<f64>>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D1: Dimension,
    D2: Dimension,
{
    let h = frequency_response(x, y, reg, axis)?;
    let n = x.len_of(ndarray::Axis(axis));
    Ok(irfft_axis(&h, ndarray::Axis(axis), n))
}
