//! FFT wrapper and axis-wise transforms

use ndarray::{Array, ArrayBase, Axis, Data, Dimension, Zip};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;
use std::sync::Arc;

/// FFT processor for a fixed transform length.
///
/// Holds a forward and an inverse plan. Plans are `Send + Sync`, so one
/// processor can be shared between threads.
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f64>>,
    ifft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of bins of a one-sided spectrum (`size / 2 + 1`).
    pub fn spectrum_len(&self) -> usize {
        self.size / 2 + 1
    }

    /// Perform forward FFT on real input
    ///
    /// The input is zero padded or truncated to the FFT size. Returns the
    /// one-sided spectrum (DC to Nyquist, `size/2 + 1` bins).
    pub fn forward(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex64::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::default());

        self.fft.process(&mut buffer);

        buffer.truncate(self.spectrum_len());
        buffer
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex64]) {
        self.fft.process(buffer);
    }

    /// Perform inverse FFT of a one-sided spectrum
    ///
    /// Returns `size` real samples. Missing bins count as zero, bins past
    /// `size / 2` are ignored, and the imaginary parts of the DC and Nyquist
    /// bins do not contribute.
    pub fn inverse(&self, spectrum: &[Complex64]) -> Vec<f64> {
        let half = self.size / 2;
        let bin = |k: usize| spectrum.get(k).copied().unwrap_or_default();

        // Rebuild the Hermitian spectrum
        let mut buffer: Vec<Complex64> = (0..self.size)
            .map(|k| if k <= half { bin(k) } else { bin(self.size - k).conj() })
            .collect();

        self.ifft.process(&mut buffer);

        let scale = 1.0 / self.size as f64;
        buffer.iter().map(|c| c.re * scale).collect()
    }

    /// Perform inverse FFT on complex buffer (in-place, normalized)
    pub fn inverse_complex(&self, buffer: &mut [Complex64]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

/// One-sided FFT of every lane of `x` along `axis`, with transform length `n`.
///
/// The result has `n / 2 + 1` bins along `axis`; all other axes are untouched.
pub fn rfft_axis<S, D>(x: &ArrayBase<S, D>, axis: Axis, n: usize) -> Array<Complex64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let fft = Fft::new(n);
    let mut shape = x.raw_dim();
    shape[axis.index()] = fft.spectrum_len();
    let mut out = Array::zeros(shape);

    Zip::from(x.lanes(axis))
        .and(out.lanes_mut(axis))
        .for_each(|lane, mut out_lane| {
            let input: Vec<f64> = lane.iter().copied().collect();
            for (o, v) in out_lane.iter_mut().zip(fft.forward(&input)) {
                *o = v;
            }
        });

    out
}

/// Inverse of [`rfft_axis`]: `n` real samples per lane along `axis`.
pub fn irfft_axis<S, D>(spectrum: &ArrayBase<S, D>, axis: Axis, n: usize) -> Array<f64, D>
where
    S: Data<Elem = Complex64>,
    D: Dimension,
{
    let fft = Fft::new(n);
    let mut shape = spectrum.raw_dim();
    shape[axis.index()] = n;
    let mut out = Array::zeros(shape);

    Zip::from(spectrum.lanes(axis))
        .and(out.lanes_mut(axis))
        .for_each(|lane, mut out_lane| {
            let bins: Vec<Complex64> = lane.iter().copied().collect();
            for (o, v) in out_lane.iter_mut().zip(fft.inverse(&bins)) {
                *o = v;
            }
        });

    out
}
