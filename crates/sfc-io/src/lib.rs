//! Audio interface and file layer for sound-field measurements.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`read_audio`] and [`write_audio`] for multichannel
//!   recordings, [`load_bk_wav_recording`] for serial front-end recordings
//! - **Audio interfaces**: the [`AudioInterface`] trait and its cpal
//!   implementation [`CpalInterface`]
//! - **Measurement**: [`measure`] plays excitations over output sets and
//!   records the responses
//! - **Calibration**: [`calibration_gain`] from a calibrator tone recording
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sfc_io::{CpalInterface, measure, squeeze};
//! use sfc_analysis::ExponentialSweep;
//! use ndarray::Axis;
//!
//! let sweep = ExponentialSweep::new(2.0, 48000.0).with_post_silence(0.5).generate();
//! let signal = sweep.view().insert_axis(Axis(1));
//!
//! let mut interface = CpalInterface::new();
//! // One sweep over outputs 1 and 2 in turn, recorded by inputs 1..=4
//! let y = measure(&mut interface, &[signal], &[vec![1], vec![2]], &[1, 2, 3, 4], 3, 48000)?;
//! assert_eq!(y.shape(), &[sweep.len(), 4, 2, 3]);
//! ```

pub mod backend;
pub mod calibration;
pub mod cpal_backend;
pub mod measurement;
mod wav;

pub use backend::{AudioInterface, Recording, StreamStatus};
pub use calibration::{
    DEFAULT_TARGET_LEVEL_DB, REFERENCE_PRESSURE, calibration_file, calibration_gain,
    calibration_gain_from_recording, record_calibration_signal,
};
pub use cpal_backend::CpalInterface;
pub use measurement::{measure, squeeze};
pub use wav::{
    BkRecording, SampleFormat, WavInfo, load_bk_wav_recording, read_audio, read_audio_info,
    split_recording, write_audio,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A blocking recording did not complete in time.
    #[error("Recording timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// An argument has the wrong shape or an unsupported value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error from the numerical routines.
    #[error(transparent)]
    Analysis(#[from] sfc_analysis::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
