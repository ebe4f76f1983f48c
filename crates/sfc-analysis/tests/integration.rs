//! Integration tests for sfc-analysis crate.
//!
//! Runs the measurement chain end to end on synthetic systems: sweep
//! excitation, serial multichannel playback, deconvolution, windowing,
//! pressure matching and overlap-add filtering.

use ndarray::{Array1, Array2, Array3, Array4, ArrayD, Axis, IxDyn, s};
use sfc_analysis::{
    Complex64, Error, ExponentialSweep, Ramp, Regularization, RegularizationPolicy, Sided,
    TransferFunction, Window, amplitude_spectrum, bk_planar_array_mic_positions,
    estimate_noise_to_signal_ratio, exponential_sweep, frequency_vector, frequency_window,
    impulse_response, multichannel_signal, nearest_index, olafilt, olafilt_with_state,
    pressure_matching, sample_window, time_vector, time_window, time_window_around_peak,
    transfer_function,
};
use std::f64::consts::PI;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Deterministic pseudo-random sequence in [-1, 1).
fn noise(n: usize, seed: u32) -> Array1<f64> {
    let mut state = seed.max(1);
    Array1::from_shape_fn(n, |_| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        f64::from(state as i32) / f64::from(i32::MAX)
    })
}

/// A short decaying FIR system.
fn room(taps: usize, delay: usize, gain: f64) -> Array1<f64> {
    let mut h = Array1::zeros(taps);
    h[delay] = gain;
    for i in delay + 1..taps {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        h[i] = sign * gain * 0.3 * (-((i - delay) as f64) / 3.0).exp();
    }
    h
}

fn max_abs_diff<'a>(
    a: impl IntoIterator<Item = &'a f64>,
    b: impl IntoIterator<Item = &'a f64>,
) -> f64 {
    a.into_iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

// ===========================================================================
// 1. Sweep deconvolution
// ===========================================================================

#[test]
fn sweep_deconvolution_recovers_fir_system() {
    let sr = 16000.0;
    let x = ExponentialSweep::new(0.25, sr)
        .with_start_freq(20.0)
        .with_post_silence(0.05)
        .generate();
    let h_true = room(32, 5, 0.8);
    let y = olafilt(&h_true, &x, None).unwrap();

    let h = impulse_response(&x, &y, &Regularization::default(), 0).unwrap();
    assert_eq!(h.len(), x.len());
    assert!(max_abs_diff(h.iter().take(32), h_true.iter()) < 1e-8);
    assert!(h.iter().skip(32).all(|v| v.abs() < 1e-8));
}

#[test]
fn transfer_function_of_signal_with_itself_is_identity() {
    let x = noise(257, 7);
    match transfer_function(&x, &x, &Regularization::Scalar(0.0), 0, true).unwrap() {
        TransferFunction::Impulse(h) => {
            assert!((h[[0]] - 1.0).abs() < 1e-12);
            assert!(h.iter().skip(1).all(|v| v.abs() < 1e-12));
        }
        TransferFunction::Frequency(_) => panic!("asked for an impulse response"),
    }
}

// ===========================================================================
// 2. Serial multichannel measurement
// ===========================================================================

#[test]
fn serial_measurement_separates_channels() {
    let sr = 8000.0;
    let n_ch = 3;
    let n_reps = 2;
    let x = exponential_sweep(0.1, sr);
    let n = x.len();
    let played = multichannel_signal(&x, n_ch, n_reps, true).unwrap();
    assert_eq!(played.dim(), (n_ch * n_reps * n, n_ch + 1));

    // Reference column equals the sum of the channels
    let sum = played.slice(s![.., ..n_ch]).sum_axis(Axis(1));
    assert_eq!(sum, played.column(n_ch));

    // Cut the playback back into (samples, channel, repetition)
    let blocks = Array3::from_shape_fn((n, n_ch, n_reps), |(i, ch, rep)| {
        played[[ch * n_reps * n + rep * n + i, ch]]
    });
    for ch in 0..n_ch {
        for rep in 0..n_reps {
            assert_eq!(blocks.slice(s![.., ch, rep]), x);
        }
    }
}

// ===========================================================================
// 3. Regularization
// ===========================================================================

#[test]
fn noise_to_signal_ratio_tracks_noise_level() {
    let n = 512;
    let n_reps = 8;
    let x = noise(n, 11);
    let quiet = Array2::from_shape_fn((n, n_reps), |(i, rep)| {
        x[i] + 1e-3 * noise(n, 100 + rep as u32)[i]
    });
    let loud = Array2::from_shape_fn((n, n_reps), |(i, rep)| {
        x[i] + 1e-1 * noise(n, 100 + rep as u32)[i]
    });

    let nsr_quiet = estimate_noise_to_signal_ratio(&x, &quiet).unwrap();
    let nsr_loud = estimate_noise_to_signal_ratio(&x, &loud).unwrap();
    assert_eq!(nsr_quiet.len(), n / 2 + 1);

    // Power scales with the square of the noise amplitude: 40 dB apart
    let mean = |a: &Array1<f64>| a.sum() / a.len() as f64;
    let ratio_db = 10.0 * (mean(&nsr_loud) / mean(&nsr_quiet)).log10();
    assert!((ratio_db - 40.0).abs() < 0.5, "ratio {ratio_db} dB");
}

#[test]
fn policy_feeds_transfer_function() {
    let n = 256;
    // Trailing silence so the filtered tail is not cut off
    let mut x = noise(n, 3);
    x.slice_mut(s![n - 16..]).fill(0.0);
    let h_true = room(8, 0, 1.0);
    let y1 = olafilt(&h_true, &x, None).unwrap();
    let y = Array2::from_shape_fn((n, 4), |(i, _)| y1[[i]]);

    for policy in [
        RegularizationPolicy::Constant { value: 1e-12 },
        RegularizationPolicy::DynamicRange {
            dynamic_range_db: 200.0,
        },
        RegularizationPolicy::NoiseToSignal,
    ] {
        let reg = policy.resolve(&x, &y).unwrap();
        let h = impulse_response(&x, &y, &reg, 0).unwrap();
        assert_eq!(h.shape(), &[n, 4]);
        assert!((h[[0, 2]] - 1.0).abs() < 1e-6, "{policy:?}");
    }
}

// ===========================================================================
// 4. Windowing
// ===========================================================================

#[test]
fn sample_window_boundaries_are_exact() {
    let w = sample_window(32, Some(Ramp::new(4, 10)), Some(Ramp::new(20, 26)), Window::Hann)
        .unwrap();
    assert!(w.slice(s![..4]).iter().all(|&v| v == 0.0));
    assert!(w.slice(s![10..=20]).iter().all(|&v| v == 1.0));
    assert!(w.slice(s![27..]).iter().all(|&v| v == 0.0));
    for i in 4..10 {
        assert!(w[i] <= w[i + 1]);
    }

    let all_open = sample_window(16, None, None, Window::Blackman).unwrap();
    assert!(all_open.iter().all(|&v| v == 1.0));
}

#[test]
fn time_window_negative_times() {
    let sr = 100.0;
    let w = time_window(100, sr, Some((0.0, 0.1)), Some((Some(-0.3), None)), Window::Hann)
        .unwrap();
    assert_eq!(w[0], 0.0);
    assert_eq!(w[50], 1.0);
    assert_eq!(w[70], 1.0);
    assert!(w[85] < 1.0 && w[85] > 0.0);
}

#[test]
fn frequency_window_in_hz() {
    let n = 64;
    let sr = 64.0;
    let w = frequency_window(n, sr, Some((2.0, 6.0)), Some((20.0, 30.0)), Window::Hann).unwrap();
    assert_eq!(w.len(), 33);
    assert_eq!(w[1], 0.0);
    assert_eq!(w[10], 1.0);
    assert_eq!(w[32], 0.0);
}

#[test]
fn peak_window_isolates_direct_sound() {
    let sr = 1000.0;
    let mut ir = Array2::zeros((200, 2));
    ir[[50, 0]] = 1.0;
    ir[[120, 1]] = -2.0;
    ir[[180, 0]] = 0.5;

    let w = time_window_around_peak(&ir, sr, 0.01, 0.02, Window::Tukey { alpha: 0.5 }).unwrap();
    assert_eq!(w.dim(), ir.dim());
    assert_eq!(w[[50, 0]], 1.0);
    assert_eq!(w[[180, 0]], 0.0);
    assert_eq!(w[[120, 1]], 1.0);
    assert_eq!(w[[50, 1]], 0.0);
    assert_eq!(w.column(0).iter().filter(|&&v| v > 0.0).count(), 29);
}

// ===========================================================================
// 5. Pressure matching
// ===========================================================================

#[test]
fn pressure_matching_reproduces_reachable_target() {
    let nf = 5;
    let nm = 4;
    let ns = 2;
    let h = Array3::from_shape_fn((nf, nm, ns), |(f, m, s)| {
        Complex64::from_polar(1.0 + 0.1 * m as f64, 0.3 * (f + m * s) as f64)
    });
    let w_true =
        Array2::from_shape_fn((nf, ns), |(f, s)| Complex64::new(1.0 + f as f64, -(s as f64)));
    let target = Array2::from_shape_fn((nf, nm), |(f, m)| {
        (0..ns).map(|s| h[[f, m, s]] * w_true[[f, s]]).sum::<Complex64>()
    });

    let w = pressure_matching(&h, &target, &Regularization::Scalar(0.0)).unwrap();
    for (a, b) in w.iter().zip(w_true.iter()) {
        assert!((a - b).norm() < 1e-9);
    }
}

// ===========================================================================
// 6. Overlap-add filtering
// ===========================================================================

#[test]
fn streaming_mimo_filtering_matches_single_call() {
    let taps = 24;
    let (n_out, n_in) = (2, 3);
    let b = Array3::from_shape_fn((taps, n_out, n_in), |(k, o, i)| {
        noise(taps, (o * 3 + i + 1) as u32)[k] * 0.5
    });
    let x = Array2::from_shape_fn((300, n_in), |(n, i)| noise(300, 50 + i as u32)[n]);
    let full = olafilt(&b, &x, Some("nij,nj->ni")).unwrap();
    assert_eq!(full.shape(), &[300, n_out]);

    let mut state: ArrayD<f64> = ArrayD::zeros(IxDyn(&[]));
    let mut blocks = Vec::new();
    for start in (0..300).step_by(64) {
        let end = (start + 64).min(300);
        let (y, zf) =
            olafilt_with_state(&b, &x.slice(s![start..end, ..]), Some("nij,nj->ni"), &state)
                .unwrap();
        assert_eq!(zf.shape(), &[taps - 1, n_out]);
        blocks.push(y);
        state = zf;
    }

    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    let streamed = ndarray::concatenate(Axis(0), &views).unwrap();
    assert!(max_abs_diff(streamed.iter(), full.iter()) < 1e-12);
}

#[test]
fn multichannel_without_subscripts_is_rejected() {
    let b = Array2::<f64>::zeros((4, 2));
    let x = Array2::<f64>::zeros((16, 2));
    let err = olafilt(&b, &x, None).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    let err = olafilt(&b, &x, Some("nk,nk...->nk")).unwrap_err();
    assert!(matches!(err, Error::Subscripts { .. }));
}

// ===========================================================================
// 7. Vectors, spectra and geometry
// ===========================================================================

#[test]
fn amplitude_spectrum_of_multichannel_tones() {
    let sr = 1000.0;
    let n = 1000;
    let t = time_vector(n, sr);
    let f = frequency_vector(n, sr, Sided::Single);
    let x = Array4::from_shape_fn((n, 2, 1, 1), |(i, ch, _, _)| {
        (ch as f64 + 1.0) * (2.0 * PI * 50.0 * (ch as f64 + 1.0) * t[i]).sin()
    });
    let spectrum = amplitude_spectrum(&x, 0).unwrap();
    assert_eq!(spectrum.dim(), (501, 2, 1, 1));

    for ch in 0..2 {
        let target = 50.0 * (ch as f64 + 1.0);
        let (_, bin) = nearest_index(&f, target).unwrap();
        assert!((spectrum[[bin, ch, 0, 0]].norm() - (ch as f64 + 1.0)).abs() < 1e-9);
    }
}

#[test]
fn planar_array_spans_its_aperture() {
    let r = bk_planar_array_mic_positions();
    let xs = r.column(0);
    let ys = r.column(1);
    assert_eq!(xs.iter().cloned().fold(f64::MIN, f64::max), 0.675);
    assert_eq!(ys.iter().cloned().fold(f64::MAX, f64::min), 0.0);
    assert_eq!(r.nrows(), 60);
}
