//! Overlap-add FIR filtering
//!
//! Filters a signal with an FIR kernel by splitting it into segments,
//! multiplying each segment spectrum with the kernel spectrum and adding the
//! inverse transforms back together at their offsets.
//!
//! The FFT size is the smallest power of two of at least twice the kernel
//! length `m`; segments are `L_F - m + 1` samples long. Real signals use the
//! one-sided real transform, complex signals the full complex transform.
//!
//! Block-wise processing threads the filter state through
//! [`olafilt_with_state`]: the state returned by one call is passed as `zi`
//! to the next.

use crate::contraction::{Elementwise, SpectralProduct, Subscripts};
use crate::fft::Fft;
use crate::{Error, Result};
use ndarray::{ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension, IxDyn, Slice, Zip};
use rustfft::num_complex::Complex64;
use std::fmt::Debug;
use std::ops::AddAssign;

/// Sample types the overlap-add engine can filter.
pub trait FilterSample: Copy + Default + AddAssign + Debug + Send + Sync + 'static {
    /// Number of spectrum bins for an FFT of `size` points.
    fn spectrum_len(size: usize) -> usize;

    /// Spectrum of `samples`, zero padded to the FFT size.
    fn forward(fft: &Fft, samples: &[Self]) -> Vec<Complex64>;

    /// `fft.size()` samples back from a spectrum.
    fn inverse(fft: &Fft, spectrum: &[Complex64]) -> Vec<Self>;
}

impl FilterSample for f64 {
    fn spectrum_len(size: usize) -> usize {
        size / 2 + 1
    }

    fn forward(fft: &Fft, samples: &[f64]) -> Vec<Complex64> {
        fft.forward(samples)
    }

    fn inverse(fft: &Fft, spectrum: &[Complex64]) -> Vec<f64> {
        fft.inverse(spectrum)
    }
}

impl FilterSample for Complex64 {
    fn spectrum_len(size: usize) -> usize {
        size
    }

    fn forward(fft: &Fft, samples: &[Complex64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = samples.iter().take(fft.size()).copied().collect();
        buffer.resize(fft.size(), Complex64::default());
        fft.forward_complex(&mut buffer);
        buffer
    }

    fn inverse(fft: &Fft, spectrum: &[Complex64]) -> Vec<Complex64> {
        let mut buffer = spectrum.to_vec();
        buffer.resize(fft.size(), Complex64::default());
        fft.inverse_complex(&mut buffer);
        buffer
    }
}

/// FFT size used for a kernel of `taps` samples.
pub fn fft_size(taps: usize) -> usize {
    (2 * taps).next_power_of_two()
}

/// Filter `x` with the FIR kernel `b` along axis 0.
///
/// Without `subscripts` both `b` and `x` must be one-dimensional. With
/// `subscripts` the kernel and segment spectra are combined by the given
/// contraction pattern (see [`contraction`](crate::contraction)), e.g.
/// `"nlmk,nk->nl"` for an `(m, L, M, K)` filter matrix applied to a
/// `(n, K)` signal.
///
/// The output has the length of `x` along axis 0; its other axes follow the
/// pattern. Filtering starts from a zero state and the tail is discarded.
///
/// `b` and `x` share one sample type. A real operand is promoted before
/// mixing it with a complex one, e.g. `b.mapv(Complex64::from)`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for an empty kernel or multichannel
/// input without `subscripts`, and [`Error::Subscripts`] for a pattern that
/// does not fit the operands.
pub fn olafilt<T, S1, S2, D1, D2>(
    b: &ArrayBase<S1, D1>,
    x: &ArrayBase<S2, D2>,
    subscripts: Option<&str>,
) -> Result<ArrayD<T>>
where
    T: FilterSample,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
    D1: Dimension,
    D2: Dimension,
{
    let (y, _) = filter(b, x, subscripts, None)?;
    Ok(y)
}

/// Filter `x` with `b`, continuing from the state `zi`.
///
/// `zi` broadcasts onto the first `m - 1` output samples and usually is the
/// final state of the previous block, or a 0-dimensional zero for the
/// first. Returns the output and the final state `zf`, the `m - 1` samples
/// that spill over into the next block.
///
/// # Errors
///
/// As [`olafilt`], plus [`Error::Broadcast`] if `zi` does not broadcast onto
/// the state shape.
pub fn olafilt_with_state<T, S1, S2, S3, D1, D2, D3>(
    b: &ArrayBase<S1, D1>,
    x: &ArrayBase<S2, D2>,
    subscripts: Option<&str>,
    zi: &ArrayBase<S3, D3>,
) -> Result<(ArrayD<T>, ArrayD<T>)>
where
    T: FilterSample,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
    S3: Data<Elem = T>,
    D1: Dimension,
    D2: Dimension,
    D3: Dimension,
{
    let (y, zf) = filter(b, x, subscripts, Some(zi.view().into_dyn()))?;
    let zf = zf.ok_or_else(|| Error::invalid("zi", "no final state was produced"))?;
    Ok((y, zf))
}

fn filter<T, S1, S2, D1, D2>(
    b: &ArrayBase<S1, D1>,
    x: &ArrayBase<S2, D2>,
    subscripts: Option<&str>,
    zi: Option<ArrayViewD<'_, T>>,
) -> Result<(ArrayD<T>, Option<ArrayD<T>>)>
where
    T: FilterSample,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
    D1: Dimension,
    D2: Dimension,
{
    let b = b.view().into_dyn();
    let x = x.view().into_dyn();
    match subscripts {
        None => overlap_add(b, x, &Elementwise, zi),
        Some(pattern) => overlap_add(b, x, &Subscripts::parse(pattern)?, zi),
    }
}

/// Overlap-add with an arbitrary spectral product.
///
/// Returns the filtered signal and, if `zi` was given, the final state.
pub fn overlap_add<T, P>(
    b: ArrayViewD<'_, T>,
    x: ArrayViewD<'_, T>,
    product: &P,
    zi: Option<ArrayViewD<'_, T>>,
) -> Result<(ArrayD<T>, Option<ArrayD<T>>)>
where
    T: FilterSample,
    P: SpectralProduct + ?Sized,
{
    if b.ndim() == 0 || b.len_of(Axis(0)) == 0 {
        return Err(Error::invalid("b", "filter needs at least one tap"));
    }
    if x.ndim() == 0 {
        return Err(Error::invalid("x", "signal needs a time axis"));
    }

    let taps = b.len_of(Axis(0));
    let len = x.len_of(Axis(0));
    let size = fft_size(taps);
    let segment = size - taps + 1;
    let bins = T::spectrum_len(size);

    let mut b_shape = b.shape().to_vec();
    let mut x_shape = x.shape().to_vec();
    b_shape[0] = bins;
    x_shape[0] = bins;
    let mut shape = product.output_shape(&b_shape, &x_shape)?;
    if shape.first() != Some(&bins) {
        return Err(Error::invalid(
            "subscripts",
            "output must keep the frequency axis first",
        ));
    }
    shape[0] = len + size;

    tracing::debug!(
        fft_size = size,
        segment_len = segment,
        segments = len.div_ceil(segment),
        "overlap-add"
    );

    let fft = Fft::new(size);
    let kernel = spectrum(&fft, &b);
    let mut res = ArrayD::from_elem(IxDyn(&shape), T::default());

    for offset in (0..len).step_by(segment) {
        let end = (offset + segment).min(len);
        let chunk = x.slice_axis(Axis(0), Slice::from(offset..end));
        let mixed = product.apply(&kernel.view(), &spectrum(&fft, &chunk).view())?;
        let block = inverse(&fft, &mixed);

        let mut target = res.slice_axis_mut(Axis(0), Slice::from(offset..offset + size));
        if target.shape() != block.shape() {
            return Err(Error::Broadcast {
                lhs: block.shape().to_vec(),
                rhs: target.shape().to_vec(),
            });
        }
        Zip::from(&mut target)
            .and(&block)
            .for_each(|acc, &value| *acc += value);
    }

    let state = match zi {
        None => None,
        Some(zi) => {
            let mut head = res.slice_axis_mut(Axis(0), Slice::from(..taps - 1));
            let zi = zi.broadcast(head.raw_dim()).ok_or_else(|| Error::Broadcast {
                lhs: zi.shape().to_vec(),
                rhs: head.shape().to_vec(),
            })?;
            Zip::from(&mut head)
                .and(&zi)
                .for_each(|acc, &value| *acc += value);
            Some(
                res.slice_axis(Axis(0), Slice::from(len..len + taps - 1))
                    .to_owned(),
            )
        }
    };

    res.slice_axis_inplace(Axis(0), Slice::from(..len));
    Ok((res, state))
}

/// Transform every lane along axis 0 to `T::spectrum_len(fft.size())` bins.
fn spectrum<T: FilterSample>(fft: &Fft, signal: &ArrayViewD<'_, T>) -> ArrayD<Complex64> {
    let mut shape = signal.raw_dim();
    shape[0] = T::spectrum_len(fft.size());
    let mut out = ArrayD::from_elem(shape, Complex64::default());

    Zip::from(signal.lanes(Axis(0)))
        .and(out.lanes_mut(Axis(0)))
        .for_each(|lane, mut bins| {
            let samples: Vec<T> = lane.iter().copied().collect();
            for (dst, src) in bins.iter_mut().zip(T::forward(fft, &samples)) {
                *dst = src;
            }
        });

    out
}

/// Inverse of [`spectrum`]: `fft.size()` samples per lane along axis 0.
fn inverse<T: FilterSample>(fft: &Fft, spectrum: &ArrayD<Complex64>) -> ArrayD<T> {
    let mut shape = spectrum.raw_dim();
    shape[0] = fft.size();
    let mut out = ArrayD::from_elem(shape, T::default());

    Zip::from(spectrum.lanes(Axis(0)))
        .and(out.lanes_mut(Axis(0)))
        .for_each(|lane, mut samples| {
            let bins: Vec<Complex64> = lane.iter().copied().collect();
            for (dst, src) in samples.iter_mut().zip(T::inverse(fft, &bins)) {
                *dst = src;
            }
        });

    out
}
