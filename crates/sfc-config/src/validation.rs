//! Measurement plan validation.
//!
//! Checks that a plan describes a sweep the generator accepts and a
//! measurement that has something to play and record. All problems are
//! collected before reporting, so a broken file is fixed in one pass.

use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A duration, frequency or rate that must be positive is not.
    #[error("'{field}' must be positive, got {value}")]
    NotPositive {
        /// Dotted path of the field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A duration that may be zero is negative.
    #[error("'{field}' must not be negative, got {value}")]
    Negative {
        /// Dotted path of the field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A count is zero.
    #[error("'{field}' must be at least 1")]
    ZeroCount {
        /// Dotted path of the field.
        field: &'static str,
    },

    /// The sweep does not rise or leaves the band below Nyquist.
    #[error("sweep band {start} Hz to {end} Hz is invalid for sample rate {sample_rate} Hz")]
    SweepBand {
        /// Effective start frequency in Hz.
        start: f64,
        /// Effective end frequency in Hz.
        end: f64,
        /// Sample rate in Hz.
        sample_rate: u32,
    },

    /// The fade is longer than the sweep.
    #[error("fade of {fade} s is longer than the {duration} s sweep")]
    FadeTooLong {
        /// Fade length in seconds.
        fade: f64,
        /// Sweep duration in seconds.
        duration: f64,
    },

    /// A device channel number is zero.
    #[error("'{field}' contains channel 0; channels are numbered from 1")]
    ChannelZero {
        /// Dotted path of the field.
        field: &'static str,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects errors while walking a plan.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    errors: Vec<ValidationError>,
}

impl Collector {
    pub(crate) fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub(crate) fn positive(&mut self, field: &'static str, value: f64) {
        if value.is_nan() || value <= 0.0 {
            self.push(ValidationError::NotPositive { field, value });
        }
    }

    pub(crate) fn non_negative(&mut self, field: &'static str, value: f64) {
        if value.is_nan() || value < 0.0 {
            self.push(ValidationError::Negative { field, value });
        }
    }

    pub(crate) fn count(&mut self, field: &'static str, value: usize) {
        if value == 0 {
            self.push(ValidationError::ZeroCount { field });
        }
    }

    pub(crate) fn channels(&mut self, field: &'static str, channels: &[u16]) {
        if channels.is_empty() {
            self.push(ValidationError::ZeroCount { field });
        } else if channels.contains(&0) {
            self.push(ValidationError::ChannelZero { field });
        }
    }

    pub(crate) fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collector_is_ok() {
        assert!(Collector::default().finish().is_ok());
    }

    #[test]
    fn single_error_is_not_wrapped() {
        let mut c = Collector::default();
        c.count("excitation.repetitions", 0);
        assert_eq!(
            c.finish(),
            Err(ValidationError::ZeroCount {
                field: "excitation.repetitions"
            })
        );
    }

    #[test]
    fn several_errors_are_joined() {
        let mut c = Collector::default();
        c.positive("sweep.duration_secs", 0.0);
        c.non_negative("sweep.fade_secs", -1.0);
        c.non_negative("sweep.pre_silence_secs", 0.0);
        let err = c.finish().unwrap_err();
        let ValidationError::Multiple(errors) = &err else {
            panic!("expected multiple errors, got {err:?}");
        };
        assert_eq!(errors.len(), 2);
        assert!(err.to_string().contains("; "));
    }

    #[test]
    fn nan_is_rejected() {
        let mut c = Collector::default();
        c.positive("sample_rate", f64::NAN);
        assert!(c.finish().is_err());
    }

    #[test]
    fn channel_lists() {
        let mut c = Collector::default();
        c.channels("device.input_channels", &[1, 2]);
        assert!(c.finish().is_ok());

        let mut c = Collector::default();
        c.channels("device.input_channels", &[1, 0]);
        assert!(matches!(c.finish(), Err(ValidationError::ChannelZero { .. })));
    }
}
