//! SFC Analysis - Numerical core for acoustic transfer-function measurement
//!
//! This crate covers the signal side of a sound-field measurement:
//!
//! - [`sweep`] - Exponential sine sweep excitation
//! - [`excitation`] - Serial multichannel playback layout
//! - [`spectrum`] - Single-sided amplitude spectrum
//! - [`regularization`] - Regularization choices for deconvolution
//! - [`transfer_fn`] - Regularized transfer function and impulse response estimation
//! - [`window`] - Sample, time, frequency and peak-centered windows
//! - [`pressure_matching`] - Least-squares loudspeaker weights
//! - [`olafilt`] - Overlap-add FIR filtering with state continuation
//! - [`contraction`] - Spectral products for multichannel filtering
//! - [`vectors`] - Time and frequency axes
//! - [`geometry`] - Microphone array coordinates
//! - [`fft`] - FFT wrapper and axis-wise transforms
//!
//! All routines are pure functions over `ndarray` arrays in `f64` or
//! `Complex<f64>`. Time is axis 0 unless an axis argument says otherwise.
//!
//! ## Example Workflow
//!
//! ```rust
//! use sfc_analysis::{impulse_response, olafilt, time_window_around_peak};
//! use sfc_analysis::{ExponentialSweep, Regularization, Window};
//! use ndarray::Array1;
//!
//! let sr = 8000.0;
//! // 1. Excitation, with room for the response to decay
//! let x = ExponentialSweep::new(0.5, sr)
//!     .with_start_freq(50.0)
//!     .with_post_silence(0.1)
//!     .generate();
//!
//! // 2. Response of a system that delays by 10 samples and halves
//! let mut system = Array1::zeros(16);
//! system[10] = 0.5;
//! let y = olafilt(&system, &x, None).unwrap();
//!
//! // 3. Deconvolve and window around the peak
//! let h = impulse_response(&x, &y, &Regularization::default(), 0).unwrap();
//! let w = time_window_around_peak(&h, sr, 0.001, 0.002, Window::Tukey { alpha: 0.5 }).unwrap();
//! let peak = (&h * &w).iter().cloned().fold(0.0_f64, f64::max);
//! assert!((peak - 0.5).abs() < 1e-6);
//! ```

pub mod contraction;
pub mod error;
pub mod excitation;
pub mod fft;
pub mod geometry;
pub mod olafilt;
pub mod pressure_matching;
pub mod regularization;
pub mod spectrum;
pub mod sweep;
pub mod transfer_fn;
pub mod vectors;
pub mod window;

mod array;

// Re-export main types
pub use contraction::{Elementwise, SpectralProduct, Subscripts};
pub use error::{Error, Result};
pub use excitation::multichannel_signal;
pub use fft::Fft;
pub use geometry::bk_planar_array_mic_positions;
pub use olafilt::{FilterSample, olafilt, olafilt_with_state};
pub use pressure_matching::pressure_matching;
pub use regularization::{
    Regularization, RegularizationPolicy, estimate_noise_to_signal_ratio,
    regularization_fill_up_below_dynamic_range,
};
pub use spectrum::amplitude_spectrum;
pub use sweep::{ExponentialSweep, exponential_sweep};
pub use transfer_fn::{TransferFunction, frequency_response, impulse_response, transfer_function};
pub use vectors::{Sided, frequency_vector, nearest_index, time_vector};
pub use window::{
    Ramp, SampleWindow, Symmetry, Window, WindowState, frequency_window, sample_window,
    time_window, time_window_around_peak,
};

pub use rustfft::num_complex::Complex64;
