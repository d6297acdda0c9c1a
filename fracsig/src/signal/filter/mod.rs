//! Butterworth design and second-order-section filtering.
//!
//! Functions located here match `scipy.signal.butter(..., output="sos")`,
//! `sosfilt`, `sosfilt_zi` and `sosfiltfilt` for one-dimensional signals.

/// Butterworth low/high-pass design into second-order sections.
pub mod design;

mod sosfilt;
mod sosfiltfilt;

pub use design::{butter_sos, ButterConfig, ButterKernel, FilterBandType, Sos};
pub use sosfilt::*;
pub use sosfiltfilt::*;
