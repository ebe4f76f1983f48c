//! Microphone calibration from a calibrator tone.
//!
//! A sound calibrator produces a sinusoid at a known level, usually 94 dB SPL
//! (1 Pa RMS). The gain maps the recorded amplitude onto the pressure
//! amplitude of that level, so `samples * gain` is in pascals.

use crate::backend::AudioInterface;
use crate::wav::{SampleFormat, read_audio, write_audio};
use crate::{Error, Result};
use ndarray::{Array1, ArrayBase, Data, Ix1};
use sfc_analysis::{Symmetry, Window, amplitude_spectrum};
use std::path::{Path, PathBuf};

/// Level of a standard sound calibrator in dB SPL.
pub const DEFAULT_TARGET_LEVEL_DB: f64 = 94.0;

/// Reference sound pressure in pascals.
pub const REFERENCE_PRESSURE: f64 = 20e-6;

/// Gain that scales a calibrator recording to pascals.
///
/// The recording is flat-top windowed (normalized to unit mean) so the
/// amplitude spectrum peak reads the tone amplitude independent of its
/// position between bins.
pub fn calibration_gain<S>(samples: &ArrayBase<S, Ix1>, target_level_db: f64) -> Result<f64>
where
    S: Data<Elem = f64>,
{
    if samples.is_empty() {
        return Err(Error::InvalidArgument("empty calibration recording".into()));
    }

    let window = Array1::from(Window::Flattop.coefficients(samples.len(), Symmetry::Symmetric));
    let mean = window.mean().unwrap_or(1.0);
    let windowed = samples * &(window / mean);

    let measured = amplitude_spectrum(&windowed, 0)?
        .iter()
        .map(|c| c.norm())
        .fold(0.0, f64::max);
    if measured == 0.0 {
        return Err(Error::InvalidArgument("silent calibration recording".into()));
    }

    let target = 10f64.powf(target_level_db / 20.0) * REFERENCE_PRESSURE * 2f64.sqrt();
    let gain = target / measured;
    tracing::debug!(measured, target, gain, "calibration gain");
    Ok(gain)
}

/// [`calibration_gain`] of a mono WAV recording.
pub fn calibration_gain_from_recording<P: AsRef<Path>>(path: P, target_level_db: f64) -> Result<f64> {
    let (data, _) = read_audio(path)?;
    if data.ncols() != 1 {
        return Err(Error::InvalidArgument(format!(
            "calibration recordings must be mono, got {} channels",
            data.ncols()
        )));
    }
    calibration_gain(&data.column(0), target_level_db)
}

/// Path of the calibration file written for `channel` into `dir`.
pub fn calibration_file(dir: &Path, channel: u16) -> PathBuf {
    dir.join(format!("channel {channel}.wav"))
}

/// Record `duration_secs` of a calibrator on input `channel` and store it as
/// `"channel {channel}.wav"` (32-bit float) in `dir`.
pub fn record_calibration_signal<I>(
    interface: &mut I,
    dir: &Path,
    channel: u16,
    duration_secs: f64,
    sample_rate: u32,
) -> Result<Array1<f64>>
where
    I: AudioInterface + ?Sized,
{
    if duration_secs.is_nan() || duration_secs <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "calibration duration must be positive, got {duration_secs}"
        )));
    }
    let frames = (duration_secs * f64::from(sample_rate)).round() as usize;
    let recording = interface.record(frames, sample_rate, &[channel])?;
    recording.status.report();

    let path = calibration_file(dir, channel);
    write_audio(&path, &recording.samples, sample_rate, SampleFormat::Float32)?;
    tracing::info!(channel, path = %path.display(), "calibration signal stored");

    Ok(recording.samples.column(0).to_owned())
}
