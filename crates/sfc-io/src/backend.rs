//! Audio interface abstraction.
//!
//! [`AudioInterface`] is the seam between the measurement routines and the
//! sound card. Both operations block until all frames are captured. Channel
//! numbers are 1-based device channels, as printed on the interface.
//!
//! The cpal implementation lives in [`cpal_backend`](crate::cpal_backend);
//! tests drive the measurement code with in-memory loopbacks.

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2};

/// Device status flags raised while a stream was running.
///
/// Flags are diagnostics: a recording with flags set is still returned, and
/// [`StreamStatus::report`] turns them into log warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStatus {
    /// Input data was requested before the device delivered it.
    pub input_underflow: bool,
    /// Input data was lost because it was not collected in time.
    pub input_overflow: bool,
    /// The output callback could not provide data in time.
    pub output_underflow: bool,
    /// Output data was dropped by the device.
    pub output_overflow: bool,
    /// The output buffer was primed before input arrived.
    pub priming_output: bool,
}

impl StreamStatus {
    /// Whether no flag is set.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    /// Combine the flags of two streams.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            input_underflow: self.input_underflow || other.input_underflow,
            input_overflow: self.input_overflow || other.input_overflow,
            output_underflow: self.output_underflow || other.output_underflow,
            output_overflow: self.output_overflow || other.output_overflow,
            priming_output: self.priming_output || other.priming_output,
        }
    }

    /// Emit one warning per raised flag.
    pub fn report(&self) {
        if self.input_underflow {
            tracing::warn!("input underflow");
        }
        if self.input_overflow {
            tracing::warn!("input overflow");
        }
        if self.output_overflow {
            tracing::warn!("output overflow");
        }
        if self.output_underflow {
            tracing::warn!("output underflow");
        }
        if self.priming_output {
            tracing::warn!("primed output");
        }
    }
}

/// Captured input of one blocking stream run.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Samples with shape `(frames, n_in)`, one column per requested input.
    pub samples: Array2<f64>,
    /// Flags raised while recording.
    pub status: StreamStatus,
}

/// A sound card that can play and record synchronously.
pub trait AudioInterface {
    /// Play `signal` (shape `(frames, n_out)`) on `output_channels` and record
    /// the same number of frames from `input_channels`.
    ///
    /// Column `k` of `signal` goes to device channel `output_channels[k]`.
    fn play_and_record(
        &mut self,
        signal: ArrayView2<'_, f64>,
        output_channels: &[u16],
        input_channels: &[u16],
        sample_rate: u32,
    ) -> Result<Recording>;

    /// Record `frames` frames from `input_channels`.
    fn record(&mut self, frames: usize, sample_rate: u32, input_channels: &[u16])
    -> Result<Recording>;
}

/// Check that `channels` is a non-empty list of 1-based channel numbers no
/// larger than `available`.
pub fn check_channels(what: &str, channels: &[u16], available: u16) -> Result<()> {
    if channels.is_empty() {
        return Err(Error::InvalidArgument(format!("no {what} channels given")));
    }
    if let Some(&bad) = channels.iter().find(|&&c| c == 0 || c > available) {
        return Err(Error::InvalidArgument(format!(
            "{what} channel {bad} out of range 1..={available}"
        )));
    }
    Ok(())
}

/// Check that a signal has one column per output channel.
pub fn check_signal(signal: &ArrayView2<'_, f64>, output_channels: &[u16]) -> Result<()> {
    if signal.ncols() != output_channels.len() {
        return Err(Error::InvalidArgument(format!(
            "signal has {} columns but {} output channels were given",
            signal.ncols(),
            output_channels.len()
        )));
    }
    Ok(())
}
