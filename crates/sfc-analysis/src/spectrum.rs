//! Single-sided amplitude spectrum.

use crate::array::checked_axis;
use crate::fft::rfft_axis;
use crate::Result;
use ndarray::{Array, ArrayBase, Data, RemoveAxis};
use rustfft::num_complex::Complex64;

/// Amplitude-normalized one-sided spectrum of `x` along `axis`.
///
/// The real FFT is divided by the length `n` and every bin that also has a
/// negative-frequency twin is doubled: all bins but DC, and for even `n` all
/// but DC and Nyquist. A sinusoid of amplitude `A` on an exact bin therefore
/// shows up with magnitude `A`.
///
/// The result has `n / 2 + 1` bins along `axis`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument) if `axis`
/// is out of bounds.
pub fn amplitude_spectrum<S, D>(x: &ArrayBase<S, D>, axis: usize) -> Result<Array<Complex64, D>>
where
    S: Data<Elem = f64>,
    D: RemoveAxis,
{
    let axis = checked_axis(x.ndim(), axis, "axis")?;
    let n = x.len_of(axis);
    let mut spectrum = rfft_axis(x, axis, n);

    let scale = 1.0 / n as f64;
    let bins = spectrum.len_of(axis);
    // DC appears once; so does Nyquist when n is even
    let doubled_end = if n % 2 == 0 { bins.saturating_sub(1) } else { bins };

    for (k, mut lane) in spectrum.axis_iter_mut(axis).enumerate() {
        let factor = if k >= 1 && k < doubled_end {
            2.0 * scale
        } else {
            scale
        };
        lane.mapv_inplace(|c| c * factor);
    }

    Ok(spectrum)
}
