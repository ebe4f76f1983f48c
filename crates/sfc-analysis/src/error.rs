//! Error types for the analysis routines.

use thiserror::Error;

/// Errors reported by the numerical routines.
///
/// Numerical degeneracies (near-zero reference bins, silent inputs) are never
/// reported here; they are the job of the regularization parameter.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument has the wrong shape or an unsupported value.
    #[error("invalid argument `{arg}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        arg: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A contraction pattern could not be parsed or does not fit its operands.
    #[error("invalid subscripts '{subscripts}': {reason}")]
    Subscripts {
        /// The pattern as given by the caller.
        subscripts: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// Two shapes cannot be broadcast against each other.
    #[error("shapes {lhs:?} and {rhs:?} cannot be broadcast together")]
    Broadcast {
        /// Left operand shape.
        lhs: Vec<usize>,
        /// Right operand shape.
        rhs: Vec<usize>,
    },

    /// The least-squares solver failed for one frequency bin.
    #[error("least-squares solve failed at bin {bin}: {reason}")]
    Solve {
        /// Frequency bin index.
        bin: usize,
        /// Solver message.
        reason: String,
    },
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid(arg: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a subscripts error.
    pub fn subscripts(subscripts: &str, reason: impl Into<String>) -> Self {
        Error::Subscripts {
            subscripts: subscripts.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience result type for analysis routines.
pub type Result<T> = std::result::Result<T, Error>;
