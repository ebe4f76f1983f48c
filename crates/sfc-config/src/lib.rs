//! Measurement plans for sound-field measurements.
//!
//! A [`MeasurementPlan`] describes one measurement: the excitation sweep,
//! the serial playback layout, how deconvolution is regularized, the window
//! around the impulse response peak and which interface channels to use.
//! Plans are stored as TOML and validated on load.
//!
//! # Example
//!
//! ```rust,no_run
//! use sfc_config::{MeasurementPlan, SweepConfig, ExcitationConfig};
//!
//! // Load a plan from file
//! let plan = MeasurementPlan::load("room.toml").unwrap();
//! let sweep = plan.sweep().unwrap().generate();
//!
//! // Create a plan programmatically
//! let plan = MeasurementPlan::new("Array", 2.0)
//!     .with_sweep(SweepConfig {
//!         start_freq: Some(20.0),
//!         post_silence_secs: 1.0,
//!         ..SweepConfig::new(2.0)
//!     })
//!     .with_excitation(ExcitationConfig {
//!         channels: 16,
//!         repetitions: 2,
//!         add_reference: true,
//!     });
//! plan.save("plans/array.toml").unwrap();
//! ```

mod error;
mod plan;

/// Measurement plan validation.
pub mod validation;

pub use error::ConfigError;
pub use plan::{DeviceConfig, ExcitationConfig, MeasurementPlan, PeakWindowConfig, SweepConfig};
pub use validation::{ValidationError, ValidationResult};

/// Re-export the analysis types that appear in plans
pub use sfc_analysis::{RegularizationPolicy, Window};
