use core::{error, fmt};

/// Validation errors raised at kernel construction or adapter binding time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input or configuration field is empty.
    EmptyInput {
        /// Name of the argument that is empty.
        arg: &'static str,
    },
    /// A configuration argument value is invalid.
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A contiguous 1D slice view could not be obtained.
    NonContiguous {
        /// Name of the argument that is non-contiguous.
        arg: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyInput { arg } => write!(f, "Input `{arg}` was empty."),
            ConfigError::InvalidArgument { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            ConfigError::NonContiguous { arg } => {
                write!(f, "Argument `{arg}` is not contiguous in memory.")
            }
        }
    }
}

impl error::Error for ConfigError {}

/// Runtime precondition violations for checked kernel entrypoints.
///
/// Every kernel validates its inputs and output buffers before computing
/// anything, so an error of this type means no output was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecInvariantViolation {
    /// A signal passed to the kernel had no samples.
    EmptyInput {
        /// Name of the argument.
        arg: &'static str,
    },
    /// An execution precondition was violated.
    InvalidState {
        /// Human readable reason.
        reason: &'static str,
    },
    /// A signal had fewer samples than the kernel needs.
    TooShort {
        /// Name of the argument.
        arg: &'static str,
        /// Minimum number of samples.
        min: usize,
        /// Received length.
        got: usize,
    },
    /// Output length mismatched the expected runtime shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// Adapter binding/configuration failure.
    Config(ConfigError),
}

impl From<ConfigError> for ExecInvariantViolation {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl fmt::Display for ExecInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecInvariantViolation::EmptyInput { arg } => {
                write!(f, "Signal `{arg}` must contain at least one sample.")
            }
            ExecInvariantViolation::InvalidState { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
            ExecInvariantViolation::TooShort { arg, min, got } => {
                write!(f, "Signal `{arg}` needs at least {min} samples, got {got}.")
            }
            ExecInvariantViolation::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Execution length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ExecInvariantViolation::Config(err) => write!(f, "{err}"),
        }
    }
}

impl error::Error for ExecInvariantViolation {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ExecInvariantViolation::Config(err) => Some(err),
            _ => None,
        }
    }
}

/// Check a caller-provided output buffer length before anything is written.
pub(crate) fn ensure_len(
    arg: &'static str,
    expected: usize,
    got: usize,
) -> Result<(), ExecInvariantViolation> {
    if expected != got {
        return Err(ExecInvariantViolation::LengthMismatch { arg, expected, got });
    }
    Ok(())
}

/// Reject signals without samples.
pub(crate) fn ensure_non_empty<T>(
    arg: &'static str,
    signal: &[T],
) -> Result<(), ExecInvariantViolation> {
    if signal.is_empty() {
        return Err(ExecInvariantViolation::EmptyInput { arg });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn length_mismatch_reports_both_lengths() {
        let err = ensure_len("out", 8, 7).expect_err("short buffer");
        assert_eq!(
            err.to_string(),
            "Execution length mismatch on `out`. Expected 8, got 7."
        );
        assert!(ensure_len("out", 8, 8).is_ok());
    }

    #[test]
    fn empty_signal_is_named() {
        let err = ensure_non_empty::<f64>("denominator", &[]).expect_err("empty");
        assert_eq!(err, ExecInvariantViolation::EmptyInput { arg: "denominator" });
    }

    #[test]
    fn config_error_is_exposed_as_source() {
        use core::error::Error as _;
        let err = ExecInvariantViolation::from(ConfigError::NonContiguous { arg: "array" });
        assert!(err.source().is_some());
    }
}
