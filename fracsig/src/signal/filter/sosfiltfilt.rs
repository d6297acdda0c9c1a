use core::cmp::min;

use crate::error::Result;
use crate::kernel::{
    ensure_len, ensure_non_empty, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D,
    Write1D,
};
use crate::signal::traits::{IirDesign, SosFiltFilt1D};

use alloc::vec::Vec;

use super::design::{ButterConfig, ButterKernel, Sos};
use super::{sosfilt, sosfilt_zi};

/// Constructor config for [`SosFiltFiltKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct SosFiltFiltConfig {
    /// Second-order sections used for forward-backward filtering.
    pub sos: Vec<Sos>,
}

/// Stateless 1D `sosfiltfilt` kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct SosFiltFiltKernel {
    sos: Vec<Sos>,
    zi: Vec<Sos>,
    padlen: usize,
}

impl KernelLifecycle for SosFiltFiltKernel {
    type Config = SosFiltFiltConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        if config.sos.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "sos" });
        }
        if config.sos.iter().any(|s| s.a[0] != 1.0) {
            return Err(ConfigError::InvalidArgument {
                arg: "sos",
                reason: "sections must be normalized so that a[0] == 1",
            });
        }
        let mut zi = config.sos.clone();
        sosfilt_zi(&mut zi).map_err(|_| ConfigError::InvalidArgument {
            arg: "sos",
            reason: "second-order section has a pole at z = 1",
        })?;

        let n = config.sos.len();
        let bzeros = config.sos.iter().filter(|s| s.b[2] == 0.0).count();
        let azeros = config.sos.iter().filter(|s| s.a[2] == 0.0).count();
        let ntaps = 2 * n + 1 - min(bzeros, azeros);
        Ok(Self {
            sos: config.sos,
            zi,
            padlen: 3 * ntaps,
        })
    }
}

impl SosFiltFiltKernel {
    /// Samples of odd extension added at each end. Inputs must be longer than
    /// this.
    pub fn padlen(&self) -> usize {
        self.padlen
    }

    /// The sections being applied.
    pub fn sos(&self) -> &[Sos] {
        &self.sos
    }

    fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        let ext = odd_ext(x, self.padlen);

        let x0 = ext[0];
        let mut forward = self.zi.clone();
        for s in forward.iter_mut() {
            s.zi0 *= x0;
            s.zi1 *= x0;
        }
        let mut y = sosfilt(&ext, &mut forward);

        y.reverse();
        let y0 = y[0];
        let mut backward = self.zi.clone();
        for s in backward.iter_mut() {
            s.zi0 *= y0;
            s.zi1 *= y0;
        }
        let mut z = sosfilt(&y, &mut backward);
        z.reverse();
        z.drain(..self.padlen);
        z.truncate(x.len());
        z
    }

    fn check(&self, x: &[f64]) -> core::result::Result<(), ExecInvariantViolation> {
        ensure_non_empty("input", x)?;
        if x.len() <= self.padlen {
            return Err(ExecInvariantViolation::TooShort {
                arg: "input",
                min: self.padlen + 1,
                got: x.len(),
            });
        }
        Ok(())
    }
}

impl SosFiltFilt1D<f64> for SosFiltFiltKernel {
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> core::result::Result<(), ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
        O: Write1D<f64> + ?Sized,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        self.check(input)?;
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        ensure_len("out", input.len(), out.len())?;
        out.copy_from_slice(&self.filtfilt(input));
        Ok(())
    }

    fn run_alloc<I>(&self, input: &I) -> core::result::Result<Vec<f64>, ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        self.check(input)?;
        Ok(self.filtfilt(input))
    }
}

/// Odd extension by `n` samples at each end: `2 * x[0] - x[n..1]` before and
/// `2 * x[last] - x[last-1..last-n]` after.
fn odd_ext(x: &[f64], n: usize) -> Vec<f64> {
    let first = x[0];
    let last = x[x.len() - 1];
    let mut ext = Vec::with_capacity(x.len() + 2 * n);
    ext.extend(x[1..=n].iter().rev().map(|v| 2.0 * first - v));
    ext.extend_from_slice(x);
    ext.extend(x[x.len() - 1 - n..x.len() - 1].iter().rev().map(|v| 2.0 * last - v));
    ext
}

///
/// A forward-backward digital filter using cascaded second-order sections.
///
/// The signal is odd-extended by `3 * ntaps` samples at both ends, filtered
/// forward from steady state, then filtered backward from steady state, so the
/// result has zero phase and twice the filter's attenuation.
///
/// <https://docs.scipy.org/doc/scipy/reference/generated/scipy.signal.sosfiltfilt.html>
///
/// # Errors
/// [crate::Error::InvalidInput] when the signal is not longer than the padding.
///
pub fn sosfiltfilt(x: &[f64], sos: &[Sos]) -> Result<Vec<f64>> {
    let kernel = SosFiltFiltKernel::try_new(SosFiltFiltConfig { sos: sos.to_vec() })?;
    Ok(kernel.run_alloc(x)?)
}

///
/// Design a Butterworth filter and apply it with [sosfiltfilt].
///
/// ```
/// use fracsig::signal::filter::{butter_filtfilt, ButterConfig, FilterBandType};
///
/// let fs = 1000.0;
/// let x: Vec<f64> = (0..500)
///     .map(|i| {
///         let t = i as f64 / fs;
///         (2.0 * std::f64::consts::PI * 5.0 * t).sin() + 0.2 * (2.0 * std::f64::consts::PI * 200.0 * t).sin()
///     })
///     .collect();
/// let config = ButterConfig { order: 4, cutoff_hz: 30.0, fs, btype: FilterBandType::Lowpass };
/// let y = butter_filtfilt(&x, config).unwrap();
/// assert_eq!(y.len(), x.len());
/// ```
///
pub fn butter_filtfilt(x: &[f64], config: ButterConfig) -> Result<Vec<f64>> {
    let sos = ButterKernel::try_new(config)?.run_alloc()?;
    sosfiltfilt(x, &sos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::filter::FilterBandType;
    use crate::Error;
    use approx::assert_abs_diff_eq;
    use dasp_signal::{rate, Signal};

    fn lowpass(order: usize, cutoff_hz: f64, fs: f64) -> ButterConfig {
        ButterConfig {
            order,
            cutoff_hz,
            fs,
            btype: FilterBandType::Lowpass,
        }
    }

    #[test]
    fn odd_extension_reflects_about_end_points() {
        let ext = odd_ext(&[1.0, 2.0, 4.0, 7.0], 2);
        assert_eq!(ext, alloc::vec![-2.0, 0.0, 1.0, 2.0, 4.0, 7.0, 10.0, 12.0]);
    }

    #[test]
    fn padlen_follows_section_count() {
        let even = SosFiltFiltKernel::try_new(SosFiltFiltConfig {
            sos: ButterKernel::try_new(lowpass(4, 10.0, 100.0))
                .expect("config")
                .run_alloc()
                .expect("design"),
        })
        .expect("kernel");
        assert_eq!(even.padlen(), 3 * 5);

        let odd = SosFiltFiltKernel::try_new(SosFiltFiltConfig {
            sos: crate::signal::filter::butter_sos(3, 10.0, 100.0, FilterBandType::Lowpass)
                .expect("design"),
        })
        .expect("kernel");
        // the first-order section has b[2] == a[2] == 0
        assert_eq!(odd.padlen(), 3 * 4);
    }

    #[test]
    fn zero_phase_lowpass_keeps_slow_tone_and_drops_fast_tone() {
        let fs = 1666.0;
        let mut slow = rate(fs).const_hz(5.0).sine();
        let mut fast = rate(fs).const_hz(300.0).sine();
        let clean: Vec<f64> = (0..3000).map(|_| slow.next()).collect();
        let noisy: Vec<f64> = clean.iter().map(|v| v + 0.5 * fast.next()).collect();

        let y = butter_filtfilt(&noisy, lowpass(4, 25.0, fs)).expect("filter");
        assert_eq!(y.len(), noisy.len());
        // away from the edges the slow tone comes back in phase
        for (a, b) in y[200..2800].iter().zip(clean[200..2800].iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 2e-3);
        }
    }

    #[test]
    fn constant_passes_through_lowpass_without_transient() {
        let x = alloc::vec![-1.25; 200];
        let y = butter_filtfilt(&x, lowpass(3, 50.0, 1000.0)).expect("filter");
        for v in y {
            assert_abs_diff_eq!(v, -1.25, epsilon = 1e-9);
        }
    }

    #[test]
    fn highpass_removes_offset() {
        let x = alloc::vec![4.0; 100];
        let y = butter_filtfilt(
            &x,
            ButterConfig {
                order: 2,
                cutoff_hz: 5.0,
                fs: 1000.0,
                btype: FilterBandType::Highpass,
            },
        )
        .expect("filter");
        for v in y {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn short_input_is_rejected() {
        let config = lowpass(4, 10.0, 100.0);
        let err = butter_filtfilt(&[1.0; 15], config).expect_err("too short");
        assert!(matches!(err, Error::InvalidInput { ref arg, .. } if arg == "input"));
        assert!(butter_filtfilt(&[1.0; 16], config).is_ok());

        let sos = crate::signal::filter::butter_sos(4, 10.0, 100.0, FilterBandType::Lowpass)
            .expect("design");
        let kernel = SosFiltFiltKernel::try_new(SosFiltFiltConfig { sos }).expect("kernel");
        let empty: [f64; 0] = [];
        assert_eq!(
            kernel.run_alloc(&empty).expect_err("empty"),
            ExecInvariantViolation::EmptyInput { arg: "input" }
        );
    }

    #[test]
    fn kernel_rejects_empty_sections() {
        assert_eq!(
            SosFiltFiltKernel::try_new(SosFiltFiltConfig { sos: Vec::new() }).expect_err("empty"),
            ConfigError::EmptyInput { arg: "sos" }
        );
    }
}
