use core::{error, fmt};

/// Errors raised by the core numeric primitives.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// An argument passed into a primitive was invalid.
    #[cfg(feature = "alloc")]
    InvalidArg {
        /// The invalid arg
        arg: alloc::string::String,
        /// Explaining why arg is invalid.
        reason: alloc::string::String,
    },
    /// An argument passed into a primitive was invalid.
    #[cfg(not(feature = "alloc"))]
    InvalidArg,
    /// The convolution backend rejected its inputs.
    #[cfg(feature = "alloc")]
    Conv {
        /// Message reported by the backend.
        reason: alloc::string::String,
    },
    /// The convolution backend rejected its inputs.
    #[cfg(not(feature = "alloc"))]
    Conv,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "alloc")]
            Error::InvalidArg { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            #[cfg(not(feature = "alloc"))]
            Error::InvalidArg => write!(f, "Invalid argument."),
            #[cfg(feature = "alloc")]
            Error::Conv { reason } => write!(f, "Convolution failed: {reason}"),
            #[cfg(not(feature = "alloc"))]
            Error::Conv => write!(f, "Convolution failed."),
        }
    }
}

impl error::Error for Error {}
