use crate::error::Result;
use crate::kernel::{
    ensure_len, ensure_non_empty, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D,
    Write1D,
};
use crate::signal::traits::Detrend1D;
use crate::stats::mean;

use alloc::vec::Vec;

/// Trend model removed by [detrend].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetrendType {
    /// Subtract the least-squares line fitted over the sample index.
    #[default]
    Linear,
    /// Subtract the mean only.
    Constant,
}

/// Constructor config for [`DetrendKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetrendConfig {
    /// Trend model to remove.
    pub kind: DetrendType,
}

/// Trait-first detrending kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetrendKernel {
    kind: DetrendType,
}

impl KernelLifecycle for DetrendKernel {
    type Config = DetrendConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        Ok(Self { kind: config.kind })
    }
}

impl Detrend1D<f64> for DetrendKernel {
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> core::result::Result<(), ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
        O: Write1D<f64> + ?Sized,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        ensure_non_empty("input", input)?;
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        ensure_len("out", input.len(), out.len())?;
        detrend_into(input, self.kind, out);
        Ok(())
    }

    fn run_alloc<I>(&self, input: &I) -> core::result::Result<Vec<f64>, ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        ensure_non_empty("input", input)?;
        let mut out = alloc::vec![0.0; input.len()];
        detrend_into(input, self.kind, &mut out);
        Ok(out)
    }
}

/// Least-squares `(slope, intercept)` of `x` against its sample index.
///
/// A single sample has no slope; it fits as a constant.
pub(crate) fn linear_fit(x: &[f64]) -> (f64, f64) {
    let n = x.len();
    let (x_mean, _) = mean::<_, f64>(x.iter());
    if n < 2 {
        return (0.0, x_mean);
    }
    let t_mean = (n - 1) as f64 / 2.0;
    let (sxy, sxx) = x
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, xi)| {
            let dt = i as f64 - t_mean;
            (sxy + dt * (xi - x_mean), sxx + dt * dt)
        });
    let slope = sxy / sxx;
    (slope, x_mean - slope * t_mean)
}

fn detrend_into(x: &[f64], kind: DetrendType, out: &mut [f64]) {
    match kind {
        DetrendType::Constant => {
            let (avg, _) = mean::<_, f64>(x.iter());
            for (dst, src) in out.iter_mut().zip(x) {
                *dst = src - avg;
            }
        }
        DetrendType::Linear => {
            let (slope, intercept) = linear_fit(x);
            for (i, (dst, src)) in out.iter_mut().zip(x).enumerate() {
                *dst = src - (slope * i as f64 + intercept);
            }
        }
    }
}

///
/// Remove a linear or constant trend from `x`.
///
/// Equivalent to `scipy.signal.detrend(x, type=...)` over a 1D signal.
///
/// ```
/// use approx::assert_abs_diff_eq;
/// use fracsig::signal::detrend::{detrend, DetrendType};
///
/// let ramp = [1.0, 3.0, 5.0, 7.0];
/// let flat = detrend(&ramp, DetrendType::Linear).unwrap();
/// for v in flat {
///     assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
/// }
/// ```
///
pub fn detrend(x: &[f64], kind: DetrendType) -> Result<Vec<f64>> {
    let kernel = DetrendKernel::try_new(DetrendConfig { kind })?;
    Ok(kernel.run_alloc(x)?)
}
