use core::{error, fmt};

use crate::kernel::{ConfigError, ExecInvariantViolation};

#[cfg(feature = "alloc")]
use alloc::string::{String, ToString};

/// Result alias for the free-function API.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised whilst running fracsig.
///
/// Every failure here is synchronous and final: the inputs or configuration
/// cannot produce a well-formed output, and retrying with the same arguments
/// fails the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An input signal, configuration value or selector was rejected.
    #[cfg(feature = "alloc")]
    InvalidInput {
        /// The offending argument.
        arg: String,
        /// Explaining why the argument was rejected.
        reason: String,
    },
    /// An input signal, configuration value or selector was rejected.
    #[cfg(not(feature = "alloc"))]
    InvalidInput,
}

impl Error {
    #[cfg(feature = "alloc")]
    pub(crate) fn invalid_input(arg: &str, reason: impl ToString) -> Self {
        Error::InvalidInput {
            arg: arg.to_string(),
            reason: reason.to_string(),
        }
    }

    #[cfg(not(feature = "alloc"))]
    pub(crate) fn invalid_input<R>(_arg: &str, _reason: R) -> Self {
        Error::InvalidInput
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "alloc")]
            Error::InvalidInput { arg, reason } => {
                write!(f, "Invalid input `{arg}`: {reason}")
            }
            #[cfg(not(feature = "alloc"))]
            Error::InvalidInput => write!(f, "Invalid input."),
        }
    }
}

impl error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        let arg = match value {
            ConfigError::EmptyInput { arg }
            | ConfigError::InvalidArgument { arg, .. }
            | ConfigError::NonContiguous { arg } => arg,
        };
        Error::invalid_input(arg, value)
    }
}

impl From<ExecInvariantViolation> for Error {
    fn from(value: ExecInvariantViolation) -> Self {
        match value {
            ExecInvariantViolation::Config(config) => config.into(),
            ExecInvariantViolation::EmptyInput { arg }
            | ExecInvariantViolation::TooShort { arg, .. }
            | ExecInvariantViolation::LengthMismatch { arg, .. } => {
                Error::invalid_input(arg, value)
            }
            ExecInvariantViolation::InvalidState { .. } => Error::invalid_input("state", value),
        }
    }
}

impl From<fracsig_core::Error> for Error {
    fn from(value: fracsig_core::Error) -> Self {
        match value {
            #[cfg(feature = "alloc")]
            fracsig_core::Error::InvalidArg { arg, reason } => Error::InvalidInput { arg, reason },
            #[cfg(feature = "alloc")]
            fracsig_core::Error::Conv { reason } => Error::InvalidInput {
                arg: "convolution".to_string(),
                reason,
            },
            #[cfg(not(feature = "alloc"))]
            _ => Error::InvalidInput,
        }
    }
}

/// Advisory conditions: legitimate experimental edge cases that produce a
/// well-formed but near-zero or constant output instead of an error.
///
/// A flat-lined gauge channel is the typical source. Kernels return these from
/// their `run_report` entrypoints and log them through `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// At least one frequency bin of the deconvolution divisor was exactly
    /// zero. Those bins contribute zero to the quotient.
    ZeroDenominator {
        /// Number of bins that were exactly zero.
        bins: usize,
    },
    /// An input to the correlator was flat after its trend was removed. This
    /// covers constant signals and, under linear detrending, pure ramps whose
    /// raw variance is non-zero.
    ZeroVariance {
        /// Which input was flat.
        arg: &'static str,
    },
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degeneracy::ZeroDenominator { bins } => {
                write!(f, "{bins} denominator bin(s) were exactly zero")
            }
            Degeneracy::ZeroVariance { arg } => {
                write!(f, "signal `{arg}` is flat after detrending")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_errors_become_invalid_input() {
        let err: Error = ExecInvariantViolation::EmptyInput { arg: "numerator" }.into();
        assert_eq!(
            err,
            Error::InvalidInput {
                arg: "numerator".into(),
                reason: "Signal `numerator` must contain at least one sample.".into(),
            }
        );

        let err: Error = ExecInvariantViolation::Config(ConfigError::InvalidArgument {
            arg: "ratio",
            reason: "must be finite and >= 0",
        })
        .into();
        assert!(matches!(err, Error::InvalidInput { ref arg, .. } if arg == "ratio"));
    }

    #[test]
    fn display_is_readable() {
        let err = Error::invalid_input("policy", "unknown stabilization `median`");
        assert_eq!(
            err.to_string(),
            "Invalid input `policy`: unknown stabilization `median`"
        );
        assert_eq!(
            Degeneracy::ZeroDenominator { bins: 3 }.to_string(),
            "3 denominator bin(s) were exactly zero"
        );
        assert_eq!(
            Degeneracy::ZeroVariance { arg: "b" }.to_string(),
            "signal `b` is flat after detrending"
        );
    }
}
