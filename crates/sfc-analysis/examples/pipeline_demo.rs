//! Measurement pipeline demo: sweep, simulated room, deconvolution, windowing.
//!
//! Run with: RUST_LOG=debug cargo run -p sfc-analysis --example pipeline_demo

use ndarray::{Array1, Array2, Axis};
use sfc_analysis::{
    ExponentialSweep, RegularizationPolicy, Sided, Window, amplitude_spectrum, frequency_vector,
    multichannel_signal, nearest_index, olafilt, time_window_around_peak, transfer_function,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let sample_rate = 16000.0;

    // --- Excitation ---
    println!("=== Exponential Sweep ===\n");
    let sweep = ExponentialSweep::new(1.0, sample_rate)
        .with_start_freq(40.0)
        .with_fade(0.01)
        .with_post_silence(0.25);
    let x = sweep.generate();
    println!(
        "{:.0} Hz to {:.0} Hz, {} samples",
        sweep.start_freq(),
        sweep.end_freq(),
        x.len()
    );

    // --- Serial playback for two loudspeakers ---
    let playback = multichannel_signal(&x, 2, 1, true)?;
    println!(
        "Playback buffer: {} samples x {} channels (last is the reference)\n",
        playback.nrows(),
        playback.ncols()
    );

    // --- Simulated room: two paths with different delays and gains ---
    println!("=== Simulated Measurement ===\n");
    let rooms = [(24usize, 0.8), (57usize, 0.35)];
    let mut responses = Array2::zeros((x.len(), rooms.len()));
    for (ch, &(delay, gain)) in rooms.iter().enumerate() {
        let mut h = Array1::zeros(delay + 200);
        h[delay] = gain;
        for (i, tap) in h.iter_mut().enumerate().skip(delay + 1) {
            *tap = 0.2 * gain * (-((i - delay) as f64) / 20.0).exp() * ((i as f64) * 1.7).sin();
        }
        let y = olafilt(&h, &x, None)?;
        responses.column_mut(ch).assign(&y);
    }

    // --- Deconvolution with a dynamic range limited regularization ---
    let policy = RegularizationPolicy::DynamicRange {
        dynamic_range_db: 60.0,
    };
    let x2 = x.view().insert_axis(Axis(1));
    let reg = policy.resolve(&x2, &responses)?;
    let tf = transfer_function(&x2, &responses, &reg, 0, true)?;
    let ir = tf.impulse().ok_or("expected an impulse response")?;

    // --- Window around the direct sound ---
    let windows = time_window_around_peak(ir, sample_rate, 0.001, 0.01, Window::Tukey { alpha: 0.5 })?;
    let windowed = ir * &windows;

    for (ch, &(delay, gain)) in rooms.iter().enumerate() {
        let lane = windowed.index_axis(Axis(1), ch);
        let (peak_idx, peak) = lane
            .iter()
            .enumerate()
            .fold((0, 0.0_f64), |best, (i, &v)| if v.abs() > best.1.abs() { (i, v) } else { best });
        println!(
            "Channel {}: peak {:.3} at sample {} (expected {:.3} at {})",
            ch + 1,
            peak,
            peak_idx,
            gain,
            delay
        );
    }

    // --- Magnitude of the first channel at a few frequencies ---
    println!("\n=== Frequency Response (channel 1) ===\n");
    let first = windowed.index_axis(Axis(1), 0);
    let spectrum = amplitude_spectrum(&first, 0)?;
    let freqs = frequency_vector(first.len(), sample_rate, Sided::Single);
    println!("{:>10} {:>10}", "Freq (Hz)", "Level (dB)");
    for target in [100.0, 500.0, 1000.0, 4000.0] {
        if let Some((f, bin)) = nearest_index(&freqs, target) {
            // Undo the 1/n amplitude scaling to get the filter gain
            let gain = spectrum[[bin]].norm() * first.len() as f64 / 2.0;
            println!("{f:>10.1} {:>10.2}", 20.0 * gain.max(1e-12).log10());
        }
    }

    Ok(())
}
