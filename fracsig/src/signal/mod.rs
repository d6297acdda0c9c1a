//! Signal processing for gauge and waveform records.
//!
//! Functions located here follow the behaviour of their `scipy.signal` and
//! numpy counterparts where one exists, so waveforms analysed in a notebook
//! and in Rust line up sample for sample.

/// Trait interfaces for the signal kernels.
pub mod traits;

/// Linear and constant detrending.
#[cfg(feature = "alloc")]
pub mod detrend;

/// Detrended full cross-correlation.
#[cfg(feature = "alloc")]
pub mod correlate;

/// Regularized spectral deconvolution.
#[cfg(feature = "std")]
pub mod deconvolve;

/// Butterworth design and zero-phase second-order-section filtering.
#[cfg(feature = "std")]
pub mod filter;
