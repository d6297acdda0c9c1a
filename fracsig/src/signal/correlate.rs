use crate::error::{Degeneracy, Result};
use crate::kernel::{
    ensure_len, ensure_non_empty, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D,
    Write1D,
};
use crate::signal::detrend::{linear_fit, DetrendType};
use crate::signal::traits::CrossCorrelate1D;
use crate::stats::demean;
use fracsig_core::num_rs::{correlate, ConvolveMode};
use ndarray::ArrayView1;

use alloc::vec::Vec;

/// Constructor config for [`CrossCorrelateKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCorrelateConfig {
    /// Trend removed from each signal between the two mean-removal passes.
    /// `None` correlates the signals exactly as given.
    pub detrend: Option<DetrendType>,
}

impl Default for CrossCorrelateConfig {
    fn default() -> Self {
        Self {
            detrend: Some(DetrendType::Linear),
        }
    }
}

/// Trait-first full cross-correlation kernel.
///
/// With the default config each signal is mean-removed, linearly detrended and
/// mean-removed again before correlating. The output is not normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCorrelateKernel {
    detrend: Option<DetrendType>,
}

/// Cross-correlation together with any advisories raised while preparing the
/// inputs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelationReport {
    /// Lag-indexed correlation, zero lag at `len(b) - 1`.
    pub lags: Vec<f64>,
    /// Inputs left flat by the preprocessing: constants, and pure ramps under
    /// linear detrending. Their correlation is all zero up to rounding.
    pub advisories: Vec<Degeneracy>,
}

impl KernelLifecycle for CrossCorrelateKernel {
    type Config = CrossCorrelateConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            detrend: config.detrend,
        })
    }
}

impl CrossCorrelateKernel {
    /// Output length for inputs of the given lengths, zero when both are empty.
    pub fn expected_len(len_a: usize, len_b: usize) -> usize {
        (len_a + len_b).saturating_sub(1)
    }

    fn prepare(&self, arg: &'static str, x: &[f64], advisories: &mut Vec<Degeneracy>) -> Vec<f64> {
        let y = match self.detrend {
            None => x.to_vec(),
            Some(DetrendType::Constant) => demean(x),
            Some(DetrendType::Linear) => {
                let centered = demean(x);
                let (slope, intercept) = linear_fit(&centered);
                let detrended = centered
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v - (slope * i as f64 + intercept))
                    .collect::<Vec<_>>();
                demean(&detrended)
            }
        };

        let scale = x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let tolerance = scale * f64::EPSILON * x.len() as f64;
        if y.iter().all(|v| v.abs() <= tolerance) {
            tracing::debug!(arg, samples = x.len(), "signal is flat after detrending");
            advisories.push(Degeneracy::ZeroVariance { arg });
        }
        y
    }

    /// Correlate and report flat inputs alongside the result.
    pub fn run_report<I1, I2>(
        &self,
        a: &I1,
        b: &I2,
    ) -> core::result::Result<CorrelationReport, ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        let a = a.read_slice().map_err(ExecInvariantViolation::from)?;
        let b = b.read_slice().map_err(ExecInvariantViolation::from)?;
        ensure_non_empty("a", a)?;
        ensure_non_empty("b", b)?;

        let mut advisories = Vec::new();
        let a = self.prepare("a", a, &mut advisories);
        let b = self.prepare("b", b, &mut advisories);
        let lags = correlate(
            ArrayView1::from(a.as_slice()),
            ArrayView1::from(b.as_slice()),
            ConvolveMode::Full,
        )
        .map_err(|_| ExecInvariantViolation::InvalidState {
            reason: "full correlation rejected its inputs",
        })?
        .to_vec();
        Ok(CorrelationReport { lags, advisories })
    }
}

impl CrossCorrelate1D<f64> for CrossCorrelateKernel {
    fn run_into<I1, I2, O>(
        &self,
        a: &I1,
        b: &I2,
        out: &mut O,
    ) -> core::result::Result<(), ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
        O: Write1D<f64> + ?Sized,
    {
        let len_a = a.read_slice().map_err(ExecInvariantViolation::from)?.len();
        let len_b = b.read_slice().map_err(ExecInvariantViolation::from)?.len();
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        if len_a > 0 && len_b > 0 {
            ensure_len("out", Self::expected_len(len_a, len_b), out.len())?;
        }
        let report = self.run_report(a, b)?;
        out.copy_from_slice(&report.lags);
        Ok(())
    }

    fn run_alloc<I1, I2>(&self, a: &I1, b: &I2) -> core::result::Result<Vec<f64>, ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        Ok(self.run_report(a, b)?.lags)
    }
}

/// Lag (in samples) of the correlation peak, given the length of the second
/// signal passed to [cross_correlate_full]. A positive lag means features in
/// `a` occur later than in `b`.
pub fn peak_lag(correlation: &[f64], len_b: usize) -> Option<isize> {
    crate::stats::argmax::<_, f64>(correlation.iter())
        .map(|idx| idx as isize - (len_b as isize - 1))
}

///
/// Full cross-correlation of two detrended, mean-removed signals.
///
/// Each signal has its mean removed, its least-squares linear trend removed,
/// and its mean removed once more. The processed signals are then correlated
/// with zero padding: the output has length `len(a) + len(b) - 1`, index `k`
/// holds lag `k - (len(b) - 1)`, so zero lag sits at index `len(b) - 1`.
/// No normalization is applied.
///
/// Constant inputs are legal and correlate to zeros.
///
/// ```
/// use fracsig::signal::correlate::{cross_correlate_full, peak_lag};
///
/// let pulse = |at: usize| (0..64).map(|i| if i == at { 1.0 } else { 0.0 }).collect::<Vec<_>>();
/// let late = pulse(40);
/// let early = pulse(30);
/// let xc = cross_correlate_full(&late, &early).unwrap();
/// assert_eq!(xc.len(), 127);
/// assert_eq!(peak_lag(&xc, early.len()), Some(10));
/// ```
///
pub fn cross_correlate_full(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig::default())?;
    Ok(kernel.run_alloc(a, b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use approx::assert_abs_diff_eq;
    use dasp_signal::{rate, Signal};

    fn tone(len: usize, hz: f64) -> Vec<f64> {
        let mut signal = rate(1000.0).const_hz(hz).sine();
        (0..len).map(|_| signal.next()).collect()
    }

    #[test]
    fn output_length_is_full() {
        for (na, nb) in [(16, 16), (40, 7), (5, 23), (1, 1)] {
            let a = tone(na, 31.0);
            let b = tone(nb, 17.0);
            let xc = cross_correlate_full(&a, &b).expect("correlate");
            assert_eq!(xc.len(), na + nb - 1);
        }
    }

    #[test]
    fn autocorrelation_is_symmetric_with_peak_at_center() {
        let x: Vec<f64> = tone(200, 23.0)
            .iter()
            .enumerate()
            .map(|(i, v)| v + 0.01 * i as f64 + 0.3)
            .collect();
        let xc = cross_correlate_full(&x, &x).expect("autocorrelate");
        let center = x.len() - 1;
        for k in 1..x.len() {
            assert_abs_diff_eq!(xc[center - k], xc[center + k], epsilon = 1e-9);
        }
        let max = xc.iter().cloned().fold(f64::MIN, f64::max);
        assert_abs_diff_eq!(xc[center], max, epsilon = 1e-12);
        assert_eq!(peak_lag(&xc, x.len()), Some(0));
    }

    #[test]
    fn trend_and_offset_do_not_affect_correlation() {
        let x = tone(128, 40.0);
        let drifting: Vec<f64> = x.iter().enumerate().map(|(i, v)| v + 2.0 - 0.05 * i as f64).collect();
        let clean = cross_correlate_full(&x, &x).expect("clean");
        let shifted = cross_correlate_full(&drifting, &x).expect("drifting");
        for (c, s) in clean.iter().zip(shifted.iter()) {
            assert_abs_diff_eq!(c, s, epsilon = 1e-9);
        }
    }

    #[test]
    fn matches_direct_sum_definition() {
        let a = [0.5, -1.0, 2.0, 0.25, 3.0];
        let b = [1.0, 0.0, -2.0];
        let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig { detrend: None })
            .expect("kernel");
        let xc = kernel.run_alloc(&a, &b).expect("correlate");
        let nb = b.len() as isize;
        for (k, value) in xc.iter().enumerate() {
            let lag = k as isize - (nb - 1);
            let expected: f64 = (0..b.len() as isize)
                .filter_map(|n| {
                    let i = n + lag;
                    (0..a.len() as isize)
                        .contains(&i)
                        .then(|| a[i as usize] * b[n as usize])
                })
                .sum();
            assert_abs_diff_eq!(*value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn flat_channel_is_legal_and_reported() {
        let flat = [0.75; 50];
        let x = tone(50, 11.0);
        let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig::default()).expect("kernel");
        let report = kernel.run_report(&flat, &x).expect("flat input is legal");
        assert_eq!(report.lags.len(), 99);
        assert!(report.lags.iter().all(|v| v.abs() < 1e-12));
        assert_eq!(report.advisories, alloc::vec![Degeneracy::ZeroVariance { arg: "a" }]);
    }

    #[test]
    fn pure_ramp_is_flat_after_linear_detrend() {
        let ramp: Vec<f64> = (0..64).map(|i| 1e6 + 3.0 * i as f64).collect();
        let x = tone(64, 11.0);
        let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig::default()).expect("kernel");
        let report = kernel.run_report(&x, &ramp).expect("ramp is legal");
        assert_eq!(report.advisories, alloc::vec![Degeneracy::ZeroVariance { arg: "b" }]);

        // only the mean is removed, so the ramp keeps its variance
        let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig {
            detrend: Some(DetrendType::Constant),
        })
        .expect("kernel");
        let report = kernel.run_report(&x, &ramp).expect("ramp is legal");
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn expected_len_of_empty_inputs_is_zero() {
        assert_eq!(CrossCorrelateKernel::expected_len(0, 0), 0);
        assert_eq!(CrossCorrelateKernel::expected_len(0, 3), 2);
        assert_eq!(CrossCorrelateKernel::expected_len(5, 3), 7);
    }

    #[test]
    fn empty_input_is_invalid() {
        let err = cross_correlate_full(&[], &[1.0, 2.0]).expect_err("empty a");
        assert!(matches!(err, Error::InvalidInput { ref arg, .. } if arg == "a"));
        let err = cross_correlate_full(&[1.0], &[]).expect_err("empty b");
        assert!(matches!(err, Error::InvalidInput { ref arg, .. } if arg == "b"));
    }

    #[test]
    fn run_into_checks_output_length_before_writing() {
        let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig::default()).expect("kernel");
        let a = tone(10, 50.0);
        let b = tone(4, 50.0);
        let mut out = alloc::vec![7.0; 12];
        let err = kernel.run_into(&a, &b, &mut out).expect_err("short buffer");
        assert_eq!(
            err,
            ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: 13,
                got: 12
            }
        );
        assert!(out.iter().all(|v| *v == 7.0));
    }
}
