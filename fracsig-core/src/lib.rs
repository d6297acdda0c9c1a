#![no_std]
#![deny(missing_docs)]
//! Numeric primitives shared across the `fracsig` workspace.
//!
//! Functions in [num_rs] follow the calling conventions of their numpy
//! namesakes so that waveform code ported from notebooks keeps its meaning.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod error;

/// Numpy-flavoured array routines.
#[cfg(feature = "alloc")]
pub mod num_rs;

pub use error::*;

/// Result alias for core primitives.
pub type Result<T> = core::result::Result<T, Error>;
