//! Measurement plan file format and operations.

use serde::{Deserialize, Serialize};
use sfc_analysis::{ExponentialSweep, RegularizationPolicy, Window};
use std::path::Path;

use crate::error::ConfigError;
use crate::validation::{Collector, ValidationError, ValidationResult};

/// Everything needed to run and evaluate one measurement.
///
/// Plans are stored as TOML files:
///
/// ```toml
/// name = "Listening room"
/// sample_rate = 48000
///
/// [sweep]
/// duration_secs = 2.0
/// fade_secs = 0.05
/// start_freq = 20.0
/// post_silence_secs = 1.0
///
/// [excitation]
/// channels = 8
/// repetitions = 3
/// add_reference = true
///
/// [regularization]
/// kind = "dynamic_range"
/// dynamic_range_db = 60.0
///
/// [peak_window]
/// tleft_secs = 0.001
/// tright_secs = 0.05
///
/// [device]
/// name = "Fireface"
/// output_channels = [1, 2, 3, 4, 5, 6, 7, 8]
/// input_channels = [1, 2]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementPlan {
    /// Name of the measurement.
    pub name: String,

    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sample rate in Hz (defaults to 48000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Excitation sweep.
    pub sweep: SweepConfig,

    /// Serial playback layout.
    #[serde(default)]
    pub excitation: ExcitationConfig,

    /// How deconvolution is regularized.
    #[serde(default)]
    pub regularization: RegularizationPolicy,

    /// Window applied around the impulse response peak.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_window: Option<PeakWindowConfig>,

    /// Audio interface selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceConfig>,
}

fn default_sample_rate() -> u32 {
    48000
}

/// Sweep parameters; unset frequencies cover the full band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Sweep duration in seconds, without silence.
    pub duration_secs: f64,
    /// Fade in and out time in seconds.
    #[serde(default)]
    pub fade_secs: f64,
    /// Start frequency in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_freq: Option<f64>,
    /// End frequency in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_freq: Option<f64>,
    /// Silence before the sweep in seconds.
    #[serde(default)]
    pub pre_silence_secs: f64,
    /// Silence after the sweep in seconds.
    #[serde(default)]
    pub post_silence_secs: f64,
}

impl SweepConfig {
    /// A full-band sweep of `duration_secs` without fades or silence.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            fade_secs: 0.0,
            start_freq: None,
            end_freq: None,
            pre_silence_secs: 0.0,
            post_silence_secs: 0.0,
        }
    }
}

/// Serial playback layout, see `sfc_analysis::multichannel_signal`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExcitationConfig {
    /// Number of loudspeaker channels played in series.
    #[serde(default = "one")]
    pub channels: usize,
    /// Repetitions per channel.
    #[serde(default = "one")]
    pub repetitions: usize,
    /// Append a reference channel carrying the sum of all channels.
    #[serde(default)]
    pub add_reference: bool,
}

fn one() -> usize {
    1
}

impl Default for ExcitationConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            repetitions: 1,
            add_reference: false,
        }
    }
}

/// Window around the impulse response peak.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PeakWindowConfig {
    /// Time kept before the peak in seconds.
    pub tleft_secs: f64,
    /// Time kept after the peak in seconds.
    pub tright_secs: f64,
    /// Window shape.
    #[serde(default = "default_peak_window")]
    pub window: Window,
}

fn default_peak_window() -> Window {
    Window::Tukey { alpha: 0.5 }
}

/// Audio interface selection and channel routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Device name to match; the system default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 1-based output channels, one per excitation channel.
    #[serde(default)]
    pub output_channels: Vec<u16>,
    /// 1-based input channels to record.
    #[serde(default)]
    pub input_channels: Vec<u16>,
}

impl MeasurementPlan {
    /// Create a plan with a sweep of `duration_secs` and defaults elsewhere.
    pub fn new(name: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            name: name.into(),
            description: None,
            sample_rate: default_sample_rate(),
            sweep: SweepConfig::new(duration_secs),
            excitation: ExcitationConfig::default(),
            regularization: RegularizationPolicy::default(),
            peak_window: None,
            device: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the sample rate.
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Replace the sweep parameters.
    #[must_use]
    pub fn with_sweep(mut self, sweep: SweepConfig) -> Self {
        self.sweep = sweep;
        self
    }

    /// Replace the playback layout.
    #[must_use]
    pub fn with_excitation(mut self, excitation: ExcitationConfig) -> Self {
        self.excitation = excitation;
        self
    }

    /// Replace the regularization policy.
    #[must_use]
    pub fn with_regularization(mut self, policy: RegularizationPolicy) -> Self {
        self.regularization = policy;
        self
    }

    /// Window the impulse responses around their peak.
    #[must_use]
    pub fn with_peak_window(mut self, window: PeakWindowConfig) -> Self {
        self.peak_window = Some(window);
        self
    }

    /// Select the audio interface.
    #[must_use]
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = Some(device);
        self
    }

    /// Load a plan from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse a plan from a TOML string and validate it.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let plan: MeasurementPlan = toml::from_str(toml_str)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Save the plan to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the plan to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that the plan describes a measurement that can be run.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut c = Collector::default();
        let sr = f64::from(self.sample_rate);
        let sweep = &self.sweep;

        if self.sample_rate == 0 {
            c.push(ValidationError::ZeroCount {
                field: "sample_rate",
            });
        }
        c.positive("sweep.duration_secs", sweep.duration_secs);
        c.non_negative("sweep.fade_secs", sweep.fade_secs);
        c.non_negative("sweep.pre_silence_secs", sweep.pre_silence_secs);
        c.non_negative("sweep.post_silence_secs", sweep.post_silence_secs);

        if self.sample_rate > 0 && sweep.duration_secs > 0.0 {
            let generator = self.sweep_generator();
            if generator.num_taps() == 0 {
                c.push(ValidationError::NotPositive {
                    field: "sweep.duration_secs",
                    value: sweep.duration_secs,
                });
            } else {
                let (start, end) = (generator.start_freq(), generator.end_freq());
                if !(start > 0.0 && start < end && end <= sr / 2.0) {
                    c.push(ValidationError::SweepBand {
                        start,
                        end,
                        sample_rate: self.sample_rate,
                    });
                }
            }
            if sweep.fade_secs > sweep.duration_secs {
                c.push(ValidationError::FadeTooLong {
                    fade: sweep.fade_secs,
                    duration: sweep.duration_secs,
                });
            }
        }

        c.count("excitation.channels", self.excitation.channels);
        c.count("excitation.repetitions", self.excitation.repetitions);

        if let RegularizationPolicy::DynamicRange { dynamic_range_db } = self.regularization {
            c.positive("regularization.dynamic_range_db", dynamic_range_db);
        }
        if let RegularizationPolicy::Constant { value } = self.regularization {
            c.non_negative("regularization.value", value);
        }

        if let Some(window) = &self.peak_window {
            c.non_negative("peak_window.tleft_secs", window.tleft_secs);
            c.non_negative("peak_window.tright_secs", window.tright_secs);
        }

        if let Some(device) = &self.device {
            c.channels("device.output_channels", &device.output_channels);
            c.channels("device.input_channels", &device.input_channels);
        }

        c.finish()
    }

    /// Sweep generator configured by this plan.
    ///
    /// The generator panics on invalid bands; use [`MeasurementPlan::sweep`]
    /// to validate first.
    pub fn sweep_generator(&self) -> ExponentialSweep {
        let s = &self.sweep;
        let mut sweep = ExponentialSweep::new(s.duration_secs, f64::from(self.sample_rate))
            .with_fade(s.fade_secs)
            .with_pre_silence(s.pre_silence_secs)
            .with_post_silence(s.post_silence_secs);
        if let Some(f) = s.start_freq {
            sweep = sweep.with_start_freq(f);
        }
        if let Some(f) = s.end_freq {
            sweep = sweep.with_end_freq(f);
        }
        sweep
    }

    /// Validate the plan and return its sweep generator.
    pub fn sweep(&self) -> Result<ExponentialSweep, ConfigError> {
        self.validate()?;
        Ok(self.sweep_generator())
    }
}

impl Default for MeasurementPlan {
    fn default() -> Self {
        Self::new("Untitled", 1.0)
    }
}
