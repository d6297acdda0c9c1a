#![no_std]
#![deny(missing_docs)]
//! Waveform analysis for strain-gauge records from dynamic fracture experiments.
//!
//! The centerpiece is the spectral pipeline in [signal]: regularized
//! deconvolution ([signal::deconvolve]) and detrended full cross-correlation
//! ([signal::correlate]). Around it sit the preprocessing steps that usually
//! precede it in an experiment notebook: bridge-voltage to strain and strain to
//! stress conversion ([convert]), zero-phase Butterworth filtering
//! ([signal::filter]), and the least-squares objective used when fitting a crack
//! stress-field model to gauge records ([fit]).
//!
//! Every operation is exposed twice: as a validated kernel built through
//! [kernel::KernelLifecycle::try_new] and driven through a capability trait, and
//! as a free function that builds the kernel for a single call.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// Error types for the free-function API.
pub mod error;

/// Kernel lifecycle and 1D buffer adapters.
pub mod kernel;

/// Signal processing: deconvolution, correlation, detrending and filtering.
pub mod signal;

/// Summary statistics used by the signal kernels.
pub mod stats;

/// Bridge-voltage, strain and stress conversions.
pub mod convert;

/// Objective functions for fitting stress-field models to gauge records.
#[cfg(feature = "alloc")]
pub mod fit;

/// Debug plotting through a matplotlib subprocess.
#[cfg(feature = "plot")]
pub mod plot;

pub use error::{Degeneracy, Error, Result};

/// Re-export nalgebra for the `Complex` type used by spectra.
pub use nalgebra as na;
