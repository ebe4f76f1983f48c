//! Property-based tests for sfc-analysis.
//!
//! Checks overlap-add block continuation, spectrum reconstruction and
//! deconvolution on randomized inputs using proptest.

use ndarray::{Array1, ArrayD, IxDyn, s};
use proptest::prelude::*;
use sfc_analysis::{
    Fft, Regularization, Window, amplitude_spectrum, impulse_response, olafilt,
    olafilt_with_state, sample_window, Ramp,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Filtering a signal in two blocks with the state threaded between them
    /// gives the same output as filtering it in one call.
    #[test]
    fn olafilt_block_continuation(
        taps in prop::collection::vec(-1.0f64..1.0, 1..40),
        signal in prop::collection::vec(-1.0f64..1.0, 1..300),
        split_fraction in 0.0f64..1.0,
    ) {
        let b = Array1::from_vec(taps);
        let x = Array1::from_vec(signal);
        let split = ((x.len() as f64) * split_fraction) as usize;

        let full = olafilt(&b, &x, None).unwrap();
        let zero: ArrayD<f64> = ArrayD::zeros(IxDyn(&[]));
        let (y1, zf) = olafilt_with_state(&b, &x.slice(s![..split]), None, &zero).unwrap();
        let (y2, _) = olafilt_with_state(&b, &x.slice(s![split..]), None, &zf).unwrap();

        prop_assert_eq!(y1.len() + y2.len(), full.len());
        for (i, (a, e)) in y1.iter().chain(y2.iter()).zip(full.iter()).enumerate() {
            prop_assert!((a - e).abs() < 1e-9, "sample {}: {} vs {}", i, a, e);
        }
    }

    /// A unit kernel passes any signal through unchanged.
    #[test]
    fn olafilt_unit_kernel_identity(
        signal in prop::collection::vec(-10.0f64..10.0, 0..500),
    ) {
        let x = Array1::from_vec(signal);
        let y = olafilt(&Array1::from_vec(vec![1.0]), &x, None).unwrap();
        prop_assert_eq!(y.len(), x.len());
        for (a, e) in y.iter().zip(x.iter()) {
            prop_assert!((a - e).abs() < 1e-9);
        }
    }

    /// For even lengths, undoing the single-sided amplitude convention and
    /// inverting the spectrum reconstructs the signal.
    #[test]
    fn amplitude_spectrum_reconstructs_even_signals(
        half in 1usize..128,
        seed in prop::collection::vec(-1.0f64..1.0, 256),
    ) {
        let n = 2 * half;
        let x = Array1::from_vec(seed[..n].to_vec());
        let spectrum = amplitude_spectrum(&x, 0).unwrap();

        let bins: Vec<_> = spectrum
            .iter()
            .enumerate()
            .map(|(k, &c)| if k == 0 || k == n / 2 { c * n as f64 } else { c * n as f64 / 2.0 })
            .collect();
        let back = Fft::new(n).inverse(&bins);
        for (a, e) in back.iter().zip(x.iter()) {
            prop_assert!((a - e).abs() < 1e-9);
        }
    }

    /// Deconvolving a filtered signal by its input recovers the kernel when
    /// the tail fits into the signal.
    #[test]
    fn deconvolution_recovers_kernel(
        taps in prop::collection::vec(-1.0f64..1.0, 1..16),
        gain in 0.5f64..2.0,
    ) {
        let n = 128;
        // Impulse-like excitation with a flat spectrum
        let mut x = Array1::zeros(n);
        x[0] = gain;
        let b = Array1::from_vec(taps);
        let y = olafilt(&b, &x, None).unwrap();
        let h = impulse_response(&x, &y, &Regularization::Scalar(0.0), 0).unwrap();

        for (i, v) in h.iter().enumerate() {
            let expected = b.get(i).copied().unwrap_or(0.0);
            prop_assert!((v - expected).abs() < 1e-9);
        }
    }

    /// Sample windows stay within [0, 1] and are exactly 0 before the
    /// opening ramp and exactly 1 between the ramps.
    #[test]
    fn sample_window_bounds(
        n in 4usize..200,
        a in 0.0f64..1.0,
        b in 0.0f64..1.0,
        c in 0.0f64..1.0,
    ) {
        let start0 = ((n / 2) as f64 * a) as usize;
        let start1 = start0 + (((n / 2) - start0) as f64 * b) as usize;
        let stop0 = start1 + (((n - 1) - start1) as f64 * c) as usize;
        let stop1 = n - 1;

        for window in [Window::Hann, Window::Hamming, Window::Tukey { alpha: 0.5 }] {
            let w = sample_window(
                n,
                Some(Ramp::new(start0, start1)),
                Some(Ramp::new(stop0, stop1)),
                window,
            )
            .unwrap();
            prop_assert!(w.iter().all(|&v| (0.0..=1.0).contains(&v)));
            prop_assert!(w.iter().take(start0).all(|&v| v == 0.0));
            prop_assert!(w.iter().take(stop0 + 1).skip(start1).all(|&v| v == 1.0));
        }
    }
}
