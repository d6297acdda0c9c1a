//! Trait interfaces for signal-processing capabilities.
//!
//! Each capability has a `run_into` entrypoint writing into a caller-provided
//! buffer and, with `alloc`, a `run_alloc` entrypoint that allocates the output.

use crate::kernel::{ExecInvariantViolation, Read1D, Write1D};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// 1D spectral deconvolution capability.
pub trait Deconvolve1D<T> {
    /// Deconvolve `denominator` out of `numerator` into a caller-provided buffer
    /// whose length must equal the transform size.
    fn run_into<I1, I2, O>(
        &self,
        numerator: &I1,
        denominator: &I2,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Deconvolve and allocate output.
    #[cfg(feature = "alloc")]
    fn run_alloc<I1, I2>(
        &self,
        numerator: &I1,
        denominator: &I2,
    ) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized;
}

/// 1D full cross-correlation capability.
pub trait CrossCorrelate1D<T> {
    /// Correlate into a caller-provided buffer of length `len(a) + len(b) - 1`.
    fn run_into<I1, I2, O>(&self, a: &I1, b: &I2, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Correlate and allocate output.
    #[cfg(feature = "alloc")]
    fn run_alloc<I1, I2>(&self, a: &I1, b: &I2) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized;
}

/// 1D detrending capability.
pub trait Detrend1D<T> {
    /// Remove the trend into a caller-provided buffer of the input's length.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Remove the trend and allocate output.
    #[cfg(feature = "alloc")]
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// 1D `sosfiltfilt` capability.
pub trait SosFiltFilt1D<T> {
    /// Run zero-phase SOS filtering into a caller-provided output buffer.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Run zero-phase SOS filtering and allocate output.
    #[cfg(feature = "alloc")]
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// IIR design capability.
#[cfg(feature = "alloc")]
pub trait IirDesign<T> {
    /// Output representation produced by the design kernel.
    type Output;

    /// Run IIR design and allocate output representation.
    fn run_alloc(&self) -> Result<Self::Output, ExecInvariantViolation>;
}

/// Sample-wise unit conversion capability.
pub trait Convert1D<T> {
    /// Convert a single sample.
    fn convert(&self, sample: T) -> T;

    /// Convert every sample into a caller-provided buffer of the input's length.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized,
        T: Copy,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        crate::kernel::ensure_len("out", input.len(), out.len())?;
        for (dst, src) in out.iter_mut().zip(input.iter()) {
            *dst = self.convert(*src);
        }
        Ok(())
    }

    /// Convert every sample and allocate output.
    #[cfg(feature = "alloc")]
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        T: Copy,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        Ok(input.iter().map(|v| self.convert(*v)).collect())
    }
}
