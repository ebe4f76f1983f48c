//! Exponential sine sweep generation
//!
//! The sweep is constructed in the time domain as described by Farina,
//! "Simultaneous measurement of impulse response and distortion with a
//! swept-sine technique", AES 108th convention, 2000.

use crate::window::{Symmetry, Window};
use ndarray::{Array1, s};
use std::f64::consts::PI;

/// Exponential sine sweep generator.
///
/// Unset start and end frequencies default to `sr / n_tap` (the lowest
/// representable frequency) and `sr / 2`.
///
/// # Example
///
/// ```rust
/// use sfc_analysis::ExponentialSweep;
///
/// let sweep = ExponentialSweep::new(1.0, 48000.0)
///     .with_start_freq(20.0)
///     .with_fade(0.05)
///     .with_post_silence(0.5)
///     .generate();
/// assert_eq!(sweep.len(), 72000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialSweep {
    duration_secs: f64,
    sample_rate: f64,
    fade_secs: f64,
    start_freq: Option<f64>,
    end_freq: Option<f64>,
    pre_silence_secs: f64,
    post_silence_secs: f64,
}

impl ExponentialSweep {
    /// Create a sweep of `duration_secs` at `sample_rate` spanning the full band.
    pub fn new(duration_secs: f64, sample_rate: f64) -> Self {
        Self {
            duration_secs,
            sample_rate,
            fade_secs: 0.0,
            start_freq: None,
            end_freq: None,
            pre_silence_secs: 0.0,
            post_silence_secs: 0.0,
        }
    }

    /// Fade in and out time in seconds (half Hann window at each end).
    pub fn with_fade(mut self, secs: f64) -> Self {
        self.fade_secs = secs;
        self
    }

    /// Start frequency in Hz.
    pub fn with_start_freq(mut self, hz: f64) -> Self {
        self.start_freq = Some(hz);
        self
    }

    /// End frequency in Hz.
    pub fn with_end_freq(mut self, hz: f64) -> Self {
        self.end_freq = Some(hz);
        self
    }

    /// Zeros prepended to the sweep, in seconds.
    pub fn with_pre_silence(mut self, secs: f64) -> Self {
        self.pre_silence_secs = secs;
        self
    }

    /// Zeros appended to the sweep, in seconds.
    pub fn with_post_silence(mut self, secs: f64) -> Self {
        self.post_silence_secs = secs;
        self
    }

    /// Sweep duration in seconds, without silence.
    pub fn duration(&self) -> f64 {
        self.duration_secs
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of sweep samples, `round(T * sr)`.
    pub fn num_taps(&self) -> usize {
        (self.duration_secs * self.sample_rate).round() as usize
    }

    /// Effective start frequency in Hz.
    pub fn start_freq(&self) -> f64 {
        self.start_freq
            .unwrap_or_else(|| self.sample_rate / self.num_taps() as f64)
    }

    /// Effective end frequency in Hz.
    pub fn end_freq(&self) -> f64 {
        self.end_freq.unwrap_or(self.sample_rate / 2.0)
    }

    /// Total output length including silence padding.
    pub fn num_samples(&self) -> usize {
        silence_len(self.pre_silence_secs, self.sample_rate)
            + self.num_taps()
            + silence_len(self.post_silence_secs, self.sample_rate)
    }

    /// Instantaneous frequency in Hz at time `t` seconds into the sweep.
    pub fn instantaneous_frequency(&self, t: f64) -> f64 {
        let (f_start, f_end) = (self.start_freq(), self.end_freq());
        f_start * (t / self.duration_secs * (f_end / f_start).ln()).exp()
    }

    /// Generate the exponential sine sweep
    ///
    /// # Panics
    ///
    /// Panics unless `0 < f_start < f_end <= sr / 2`, or if the fade is
    /// longer than the sweep.
    pub fn generate(&self) -> Array1<f64> {
        let n_tap = self.num_taps();
        let f_start = self.start_freq();
        let f_end = self.end_freq();

        assert!(
            0.0 < f_start && f_start < f_end,
            "sweep needs 0 < f_start < f_end, got f_start = {f_start}, f_end = {f_end}"
        );
        assert!(
            f_end <= self.sample_rate / 2.0,
            "sweep end frequency {f_end} Hz is above Nyquist ({} Hz)",
            self.sample_rate / 2.0
        );

        let omega_start = 2.0 * PI * f_start;
        let omega_end = 2.0 * PI * f_end;
        let k = (omega_end / omega_start).ln();
        let t_total = self.duration_secs;

        let mut sweep = Array1::from_shape_fn(n_tap, |i| {
            let t = i as f64 * t_total / n_tap as f64;
            (omega_start * t_total / k * ((t / t_total * k).exp() - 1.0)).sin()
        });

        if self.fade_secs > 0.0 {
            let n_fade = (self.fade_secs * self.sample_rate).round() as usize;
            assert!(
                n_fade <= n_tap,
                "fade of {n_fade} samples exceeds sweep length {n_tap}"
            );
            let fading = Window::Hann.coefficients(2 * n_fade, Symmetry::Symmetric);
            for i in 0..n_fade {
                sweep[i] *= fading[i];
                sweep[n_tap - n_fade + i] *= fading[n_fade + i];
            }
        }

        let pre = silence_len(self.pre_silence_secs, self.sample_rate);
        let post = silence_len(self.post_silence_secs, self.sample_rate);
        if pre == 0 && post == 0 {
            return sweep;
        }

        let mut padded = Array1::zeros(pre + n_tap + post);
        padded.slice_mut(s![pre..pre + n_tap]).assign(&sweep);
        padded
    }
}

fn silence_len(secs: f64, sample_rate: f64) -> usize {
    if secs > 0.0 {
        (secs * sample_rate).round() as usize
    } else {
        0
    }
}

/// Generate an exponential sweep of `duration_secs` covering `sr / n_tap` to `sr / 2`.
pub fn exponential_sweep(duration_secs: f64, sample_rate: f64) -> Array1<f64> {
    ExponentialSweep::new(duration_secs, sample_rate).generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Instantaneous frequency estimated from the zero crossings around sample `center`.
    fn local_frequency(signal: &Array1<f64>, sample_rate: f64, center: usize, span: usize) -> f64 {
        let begin = center.saturating_sub(span / 2);
        let end = (begin + span).min(signal.len());
        let crossings: Vec<f64> = (begin + 1..end)
            .filter(|&i| signal[i - 1] < 0.0 && signal[i] >= 0.0)
            .map(|i| {
                // Linear interpolation of the crossing instant
                let a = signal[i - 1];
                let b = signal[i];
                (i - 1) as f64 + a / (a - b)
            })
            .collect();
        let periods = (crossings.len() - 1) as f64;
        periods * sample_rate / (crossings[crossings.len() - 1] - crossings[0])
    }

    #[test]
    fn test_sweep_length() {
        let sweep = exponential_sweep(1.0, 48000.0);
        assert_eq!(sweep.len(), 48000);
        assert!(sweep.iter().all(|&x| x.abs() <= 1.0));

        // Rounds rather than truncates
        let sweep = exponential_sweep(0.99999, 1000.0);
        assert_eq!(sweep.len(), 1000);
    }

    #[test]
    fn test_sweep_defaults() {
        let sweep = ExponentialSweep::new(2.0, 48000.0);
        assert_eq!(sweep.num_taps(), 96000);
        assert!((sweep.start_freq() - 0.5).abs() < 1e-12);
        assert_eq!(sweep.end_freq(), 24000.0);
    }

    #[test]
    fn test_sweep_silence_padding() {
        let sweep = ExponentialSweep::new(0.5, 8000.0)
            .with_start_freq(50.0)
            .with_pre_silence(0.25)
            .with_post_silence(0.125);
        let signal = sweep.generate();

        assert_eq!(signal.len(), 2000 + 4000 + 1000);
        assert_eq!(sweep.num_samples(), signal.len());
        assert!(signal.iter().take(2000).all(|&x| x == 0.0));
        assert!(signal.iter().skip(6000).all(|&x| x == 0.0));
        assert!(signal.iter().skip(2000).take(4000).any(|&x| x != 0.0));
    }

    #[test]
    fn test_sweep_fade() {
        let plain = ExponentialSweep::new(0.5, 8000.0).with_start_freq(100.0);
        let faded = plain.clone().with_fade(0.01).generate();
        let plain = plain.generate();

        // Ends are tapered to zero, the middle is untouched
        assert_eq!(faded[0], 0.0);
        assert!(faded[faded.len() - 1].abs() < 1e-12);
        for i in 80..3920 {
            assert_eq!(faded[i], plain[i]);
        }
    }

    #[test]
    fn test_sweep_instantaneous_frequency() {
        let sr = 48000.0;
        let sweep = ExponentialSweep::new(2.0, sr)
            .with_start_freq(100.0)
            .with_end_freq(10000.0);
        let signal = sweep.generate();

        assert!((sweep.instantaneous_frequency(0.0) - 100.0).abs() < 1e-9);
        assert!((sweep.instantaneous_frequency(2.0) - 10000.0).abs() < 1e-6);

        // The first 50 ms rise from f_start to f(0.05)
        let measured = local_frequency(&signal, sr, 1200, 2400);
        let upper = sweep.instantaneous_frequency(0.05);
        assert!(
            measured > 100.0 * 0.99 && measured < upper * 1.01,
            "measured {measured} Hz near the start, expected 100 Hz to {upper} Hz"
        );

        // Measured frequency in the middle follows the exponential law
        let center = signal.len() / 2;
        let measured = local_frequency(&signal, sr, center, 480);
        let expected = sweep.instantaneous_frequency(center as f64 / sr);
        assert!(
            (measured - expected).abs() / expected < 0.02,
            "measured {measured} Hz, expected {expected} Hz"
        );

        // Near the end it approaches f_end
        let measured = local_frequency(&signal, sr, signal.len() - 60, 120);
        assert!(
            (measured - 10000.0).abs() / 10000.0 < 0.03,
            "measured {measured} Hz near the end"
        );
    }

    #[test]
    #[should_panic(expected = "f_start < f_end")]
    fn test_sweep_rejects_reversed_band() {
        ExponentialSweep::new(1.0, 48000.0)
            .with_start_freq(1000.0)
            .with_end_freq(100.0)
            .generate();
    }

    #[test]
    #[should_panic(expected = "above Nyquist")]
    fn test_sweep_rejects_end_above_nyquist() {
        ExponentialSweep::new(1.0, 48000.0)
            .with_start_freq(20.0)
            .with_end_freq(30000.0)
            .generate();
    }
}
