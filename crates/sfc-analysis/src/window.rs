//! Window functions and the time/frequency windowing engine.
//!
//! A composite window over `n` samples is built from two independent half
//! windows: an opening ramp at the start and a closing ramp at the end.
//!
//! ```text
//!            opening           open            closing
//!  closed  /‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾\  closed
//! ________/                                          \________
//!       start0  start1                       stop0  stop1
//! ```
//!
//! Either ramp may be absent, in which case the window stays open up to the
//! corresponding edge of the array.

use crate::vectors::{Sided, frequency_vector, nearest_index, time_vector};
use crate::{Error, Result};
use ndarray::{Array, Array1, ArrayBase, Axis, Data, Dimension, Zip};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
    /// Blackman-Harris window (better sidelobe suppression)
    BlackmanHarris,
    /// Flat top window, for amplitude-accurate single-tone measurements
    Flattop,
    /// Tukey (tapered cosine) window
    Tukey {
        /// Fraction of the window inside the cosine tapers, in `[0, 1]`.
        alpha: f64,
    },
}

/// Whether a window is sampled for filter design or spectral analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    /// Symmetric window, first and last sample mirror each other.
    Symmetric,
    /// Periodic window (DFT-even), one sample of a window of length `n + 1`.
    Periodic,
}

impl Window {
    /// Get window coefficients
    pub fn coefficients(&self, size: usize, symmetry: Symmetry) -> Vec<f64> {
        match *self {
            Window::Rectangular => vec![1.0; size],
            Window::Hann => general_cosine(size, &[0.5, 0.5], symmetry),
            Window::Hamming => general_cosine(size, &[0.54, 0.46], symmetry),
            Window::Blackman => general_cosine(size, &[0.42, 0.5, 0.08], symmetry),
            Window::BlackmanHarris => {
                general_cosine(size, &[0.35875, 0.48829, 0.14128, 0.01168], symmetry)
            }
            Window::Flattop => general_cosine(
                size,
                &[
                    0.21557895,
                    0.41663158,
                    0.277263158,
                    0.083578947,
                    0.006947368,
                ],
                symmetry,
            ),
            Window::Tukey { alpha } => tukey(size, alpha, symmetry),
        }
    }

    /// Apply window to a buffer
    pub fn apply(&self, buffer: &mut [f64], symmetry: Symmetry) {
        let coeffs = self.coefficients(buffer.len(), symmetry);
        for (sample, w) in buffer.iter_mut().zip(coeffs) {
            *sample *= w;
        }
    }
}

impl FromStr for Window {
    type Err = Error;

    /// Parse a window name; `tukey` takes its default `alpha = 0.5`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rectangular" | "boxcar" => Ok(Window::Rectangular),
            "hann" | "hanning" => Ok(Window::Hann),
            "hamming" => Ok(Window::Hamming),
            "blackman" => Ok(Window::Blackman),
            "blackmanharris" => Ok(Window::BlackmanHarris),
            "flattop" => Ok(Window::Flattop),
            "tukey" => Ok(Window::Tukey { alpha: 0.5 }),
            other => Err(Error::invalid("window", format!("unknown window '{other}'"))),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Rectangular => f.write_str("rectangular"),
            Window::Hann => f.write_str("hann"),
            Window::Hamming => f.write_str("hamming"),
            Window::Blackman => f.write_str("blackman"),
            Window::BlackmanHarris => f.write_str("blackmanharris"),
            Window::Flattop => f.write_str("flattop"),
            Window::Tukey { alpha } => write!(f, "tukey({alpha})"),
        }
    }
}

/// Length of the underlying symmetric window for the requested symmetry.
fn extended_len(size: usize, symmetry: Symmetry) -> usize {
    match symmetry {
        Symmetry::Symmetric => size,
        Symmetry::Periodic => size + 1,
    }
}

fn general_cosine(size: usize, weights: &[f64], symmetry: Symmetry) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let m = extended_len(size, symmetry);
    let step = 2.0 * PI / (m - 1) as f64;

    (0..size)
        .map(|i| {
            let fac = -PI + i as f64 * step;
            weights
                .iter()
                .enumerate()
                .map(|(k, a)| a * (k as f64 * fac).cos())
                .sum()
        })
        .collect()
}

fn tukey(size: usize, alpha: f64, symmetry: Symmetry) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    if alpha <= 0.0 {
        return vec![1.0; size];
    }
    if alpha >= 1.0 {
        return general_cosine(size, &[0.5, 0.5], symmetry);
    }

    let m = extended_len(size, symmetry);
    let span = (m - 1) as f64;
    let width = (alpha * span / 2.0).floor() as usize;

    (0..size)
        .map(|i| {
            let n = i as f64;
            if i <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * n / alpha / span)).cos())
            } else if i < m - width - 1 {
                1.0
            } else {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * n / alpha / span)).cos())
            }
        })
        .collect()
}

/// A ramp between two sample indices.
///
/// Opening ramps cover `[begin, end)`, closing ramps `(begin, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    /// Lower boundary index.
    pub begin: usize,
    /// Upper boundary index.
    pub end: usize,
}

impl Ramp {
    /// Create a ramp from its boundary indices.
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Number of samples in the ramp.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    /// Whether the ramp is a hard edge.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Region of a composite window a sample falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Before the opening ramp or after the closing ramp (value 0).
    Closed,
    /// Inside the opening ramp (rising from 0 towards 1).
    Opening,
    /// Between the ramps (value 1).
    Open,
    /// Inside the closing ramp (falling towards 0).
    Closing,
}

/// Composite window over `n` samples made of an opening and a closing ramp.
///
/// The closing ramp covers samples `stop.begin + 1 ..= stop.end`; everything
/// after `stop.end` is closed. Where the ramps overlap, the closing ramp wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindow {
    n: usize,
    start: Option<Ramp>,
    stop: Option<Ramp>,
}

impl SampleWindow {
    /// Validate ramp boundaries against the window length.
    pub fn new(n: usize, start: Option<Ramp>, stop: Option<Ramp>) -> Result<Self> {
        if let Some(ramp) = start
            && (ramp.begin > ramp.end || ramp.end > n)
        {
            return Err(Error::invalid(
                "startwindow",
                format!(
                    "ramp [{}, {}) does not fit a window of {n} samples",
                    ramp.begin, ramp.end
                ),
            ));
        }
        if let Some(ramp) = stop
            && (ramp.begin > ramp.end || ramp.end >= n)
        {
            return Err(Error::invalid(
                "stopwindow",
                format!(
                    "ramp ({}, {}] does not fit a window of {n} samples",
                    ramp.begin, ramp.end
                ),
            ));
        }
        Ok(Self { n, start, stop })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the window has no samples.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Region sample `index` belongs to.
    pub fn state_at(&self, index: usize) -> WindowState {
        if let Some(stop) = self.stop {
            if index > stop.end {
                return WindowState::Closed;
            }
            if index > stop.begin {
                return WindowState::Closing;
            }
        }
        if let Some(start) = self.start {
            if index < start.begin {
                return WindowState::Closed;
            }
            if index < start.end {
                return WindowState::Opening;
            }
        }
        WindowState::Open
    }

    /// Sample the window using `window` for both ramps.
    pub fn build(&self, window: Window) -> Array1<f64> {
        let mut samples = Array1::ones(self.n);

        if let Some(ramp) = self.start {
            let len = ramp.len();
            let w = window.coefficients(2 * len, Symmetry::Symmetric);
            samples
                .slice_mut(ndarray::s![..ramp.begin])
                .fill(0.0);
            for (i, &v) in w[..len].iter().enumerate() {
                samples[ramp.begin + i] = v;
            }
        }

        if let Some(ramp) = self.stop {
            let len = ramp.len();
            let w = window.coefficients(2 * len, Symmetry::Symmetric);
            for (i, &v) in w[len..].iter().enumerate() {
                samples[ramp.begin + 1 + i] = v;
            }
            samples
                .slice_mut(ndarray::s![ramp.end + 1..])
                .fill(0.0);
        }

        samples
    }
}

/// Create a sample domain window.
///
/// `start` and `stop` are the sample ranges over which the window opens and
/// closes; `None` keeps that side open to the edge of the array.
pub fn sample_window(
    n: usize,
    start: Option<Ramp>,
    stop: Option<Ramp>,
    window: Window,
) -> Result<Array1<f64>> {
    Ok(SampleWindow::new(n, start, stop)?.build(window))
}

/// Create a time domain window over `n` samples at `sample_rate`.
///
/// `start` is the `(begin, end)` time span of the opening ramp and `stop` the
/// span of the closing ramp, in seconds. Negative times count back from the
/// end of the signal; a `None` bound in `stop` means the end of the signal.
/// Times are snapped to the nearest sample.
pub fn time_window(
    n: usize,
    sample_rate: f64,
    start: Option<(f64, f64)>,
    stop: Option<(Option<f64>, Option<f64>)>,
    window: Window,
) -> Result<Array1<f64>> {
    if n < 2 {
        return Err(Error::invalid(
            "n",
            format!("a time window needs at least 2 samples, got {n}"),
        ));
    }
    let times = time_vector(n, sample_rate);
    let last = times[n - 1];
    let duration = last + times[1];

    let to_index = |t: f64| {
        let t = if t < 0.0 { t + duration } else { t };
        nearest_index(&times, t).map_or(0, |(_, i)| i)
    };

    let start = start.map(|(t0, t1)| Ramp::new(to_index(t0), to_index(t1)));
    let stop = stop.map(|(t0, t1)| {
        Ramp::new(to_index(t0.unwrap_or(last)), to_index(t1.unwrap_or(last)))
    });

    sample_window(n, start, stop, window)
}

/// Create a frequency domain window over the one-sided spectrum of `n` samples.
///
/// Works like [`time_window`] with boundaries in Hz snapped to the nearest
/// bin, except that negative frequencies and open (`None`) bounds are not
/// interpreted: every boundary is an absolute frequency.
pub fn frequency_window(
    n: usize,
    sample_rate: f64,
    start: Option<(f64, f64)>,
    stop: Option<(f64, f64)>,
    window: Window,
) -> Result<Array1<f64>> {
    if n == 0 {
        return Err(Error::invalid("n", "a frequency window needs at least 1 sample"));
    }
    let freqs = frequency_vector(n, sample_rate, Sided::Single);
    let to_index = |f: f64| nearest_index(&freqs, f).map_or(0, |(_, i)| i);

    let start = start.map(|(f0, f1)| Ramp::new(to_index(f0), to_index(f1)));
    let stop = stop.map(|(f0, f1)| Ramp::new(to_index(f0), to_index(f1)));

    sample_window(freqs.len(), start, stop, window)
}

/// Create time windows around the maximum of a response.
///
/// `ir` has its time axis first; every lane along that axis gets its own
/// window spanning `[peak - tleft·sr, peak + tright·sr)`, clipped to the
/// signal and zero elsewhere. The windows are periodic, e.g.
/// `Window::Tukey { alpha: 0.5 }`. Returns windows with the shape of `ir`.
pub fn time_window_around_peak<S, D>(
    ir: &ArrayBase<S, D>,
    sample_rate: f64,
    tleft: f64,
    tright: f64,
    window: Window,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if ir.ndim() == 0 {
        return Err(Error::invalid("ir", "response needs a time axis"));
    }
    let samples_left = (sample_rate * tleft) as i64;
    let samples_right = (sample_rate * tright) as i64;
    let len = ir.len_of(Axis(0)) as i64;

    let mut windows = Array::ones(ir.raw_dim());
    Zip::from(ir.lanes(Axis(0)))
        .and(windows.lanes_mut(Axis(0)))
        .for_each(|lane, mut out| {
            let peak = lane
                .iter()
                .enumerate()
                .fold((0usize, f64::NEG_INFINITY), |best, (i, v)| {
                    if v.abs() > best.1 { (i, v.abs()) } else { best }
                })
                .0 as i64;
            let begin = (peak - samples_left).clamp(0, len) as usize;
            let end = (peak + samples_right).clamp(0, len) as usize;

            out.fill(0.0);
            if end > begin {
                let w = window.coefficients(end - begin, Symmetry::Periodic);
                for (o, v) in out.slice_mut(ndarray::s![begin..end]).iter_mut().zip(w) {
                    *o = v;
                }
            }
        });

    Ok(windows)
}
