//! Regularized spectral deconvolution.
//!
//! Estimates the impulse response that convolves a reference (`denominator`)
//! into a response (`numerator`) by dividing their spectra. Plain division
//! blows up wherever the reference spectrum is close to zero, so one of two
//! [Stabilization] policies is applied first:
//!
//! * [Stabilization::WaterLevel] raises every bin of the reference spectrum whose
//!   magnitude falls below `level * max|Den|` up to that threshold, keeping its
//!   phase.
//! * [Stabilization::Damped] divides by `|Den|^2 + ratio * mean(|Den|^2)`
//!   after multiplying by `conj(Den)` (Wiener-style regularization).
//!
//! The inverse transform places zero lag at index 0 with negative lags wrapped
//! to the end of the buffer. The result is rotated by half the transform length
//! ([center_shift]) so the response is centred: zero lag lands at index
//! `N - N / 2` (`N / 2` for even `N`).

use core::str::FromStr;

use crate::error::{Degeneracy, Error, Result};
use crate::kernel::{
    ensure_len, ensure_non_empty, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D,
    Write1D,
};
use crate::signal::traits::Deconvolve1D;
use itertools::izip;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use alloc::vec::Vec;

/// Frequency-domain representation of a signal, DC at index 0 and negative
/// frequencies in the upper half.
pub type Spectrum = Vec<Complex<f64>>;

/// Default fractional water level.
pub const DEFAULT_WATER_LEVEL: f64 = 0.05;

/// Default damping ratio.
pub const DEFAULT_DAMP_RATIO: f64 = 0.05;

/// Regularization applied to the reference spectrum before division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stabilization {
    /// Clamp low-magnitude bins up to `level * max|Den|`, preserving phase.
    ///
    /// `level <= 0` leaves the spectrum untouched, which is effectively
    /// unstabilized division.
    WaterLevel {
        /// Threshold as a fraction of the largest reference magnitude.
        level: f64,
    },
    /// Wiener-style division regularized by `ratio * mean(|Den|^2)`.
    Damped {
        /// Damping as a fraction of the mean reference power.
        ratio: f64,
    },
}

impl Default for Stabilization {
    fn default() -> Self {
        Stabilization::WaterLevel {
            level: DEFAULT_WATER_LEVEL,
        }
    }
}

/// Name-only selector for a [Stabilization] policy, for callers that pick the
/// policy from text (configuration files, notebook-style call sites).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizationKind {
    /// Selects [Stabilization::WaterLevel].
    WaterLevel,
    /// Selects [Stabilization::Damped].
    Damped,
}

impl FromStr for StabilizationKind {
    type Err = Error;

    /// Parse a policy selector. Unknown selectors are rejected; there is no
    /// fallback policy.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "water_level" | "waterlevel" | "water-level" | "wl" => Ok(Self::WaterLevel),
            "damp" | "damped" | "damping" => Ok(Self::Damped),
            _ => Err(Error::invalid_input(
                "policy",
                alloc::format!("unknown stabilization policy `{s}`"),
            )),
        }
    }
}

impl Stabilization {
    /// Build the selected policy, taking its parameter from `water_level` or
    /// `damp_ratio`.
    pub fn from_kind(kind: StabilizationKind, water_level: f64, damp_ratio: f64) -> Self {
        match kind {
            StabilizationKind::WaterLevel => Stabilization::WaterLevel { level: water_level },
            StabilizationKind::Damped => Stabilization::Damped { ratio: damp_ratio },
        }
    }

    /// The selector for this policy.
    pub fn kind(&self) -> StabilizationKind {
        match self {
            Stabilization::WaterLevel { .. } => StabilizationKind::WaterLevel,
            Stabilization::Damped { .. } => StabilizationKind::Damped,
        }
    }
}

impl FromStr for Stabilization {
    type Err = Error;

    /// Parse a selector into a policy carrying the default parameter.
    fn from_str(s: &str) -> Result<Self> {
        let kind = s.parse::<StabilizationKind>()?;
        Ok(Stabilization::from_kind(
            kind,
            DEFAULT_WATER_LEVEL,
            DEFAULT_DAMP_RATIO,
        ))
    }
}

/// Constructor config for [`DeconvolveKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeconvolveConfig {
    /// Transform length. `None` uses the longer of the two inputs. Inputs
    /// shorter than the transform are zero padded, longer ones truncated.
    pub nfft: Option<usize>,
    /// Regularization policy.
    pub stabilization: Stabilization,
}

/// Trait-first spectral deconvolution kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeconvolveKernel {
    nfft: Option<usize>,
    stabilization: Stabilization,
}

/// Deconvolution output with the diagnostics that the real-valued result
/// discards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeconvolutionReport {
    /// Real part of the centred inverse transform.
    pub signal: Vec<f64>,
    /// Largest magnitude of the discarded imaginary part. Close to zero for
    /// real inputs.
    pub max_imag: f64,
    /// Set when some divisor bins were exactly zero.
    pub advisory: Option<Degeneracy>,
}

impl KernelLifecycle for DeconvolveKernel {
    type Config = DeconvolveConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        if config.nfft == Some(0) {
            return Err(ConfigError::InvalidArgument {
                arg: "nfft",
                reason: "transform length must be > 0",
            });
        }
        match config.stabilization {
            Stabilization::WaterLevel { level } => {
                if !level.is_finite() {
                    return Err(ConfigError::InvalidArgument {
                        arg: "water_level",
                        reason: "must be finite",
                    });
                }
                if level <= 0.0 {
                    tracing::debug!(level, "water level <= 0, deconvolution is unstabilized");
                }
            }
            Stabilization::Damped { ratio } => {
                if !ratio.is_finite() || ratio < 0.0 {
                    return Err(ConfigError::InvalidArgument {
                        arg: "damp_ratio",
                        reason: "must be finite and >= 0",
                    });
                }
            }
        }
        Ok(Self {
            nfft: config.nfft,
            stabilization: config.stabilization,
        })
    }
}

impl DeconvolveKernel {
    /// Configured policy.
    pub fn stabilization(&self) -> Stabilization {
        self.stabilization
    }

    /// Transform (and output) length for inputs of the given lengths.
    pub fn transform_len(&self, len_numerator: usize, len_denominator: usize) -> usize {
        self.nfft
            .unwrap_or_else(|| len_numerator.max(len_denominator))
    }

    fn checked_inputs<'a, I1, I2>(
        numerator: &'a I1,
        denominator: &'a I2,
    ) -> core::result::Result<(&'a [f64], &'a [f64]), ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        let numerator = numerator
            .read_slice()
            .map_err(ExecInvariantViolation::from)?;
        let denominator = denominator
            .read_slice()
            .map_err(ExecInvariantViolation::from)?;
        ensure_non_empty("numerator", numerator)?;
        ensure_non_empty("denominator", denominator)?;
        Ok((numerator, denominator))
    }

    /// Centred complex time-domain result, before the imaginary part is
    /// dropped.
    pub fn run_complex<I1, I2>(
        &self,
        numerator: &I1,
        denominator: &I2,
    ) -> core::result::Result<Vec<Complex<f64>>, ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        let (numerator, denominator) = Self::checked_inputs(numerator, denominator)?;
        let nfft = self.transform_len(numerator.len(), denominator.len());
        Ok(deconvolve_impl(numerator, denominator, nfft, self.stabilization).0)
    }

    /// Deconvolve and return the real result with its diagnostics.
    pub fn run_report<I1, I2>(
        &self,
        numerator: &I1,
        denominator: &I2,
    ) -> core::result::Result<DeconvolutionReport, ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        let (numerator, denominator) = Self::checked_inputs(numerator, denominator)?;
        let nfft = self.transform_len(numerator.len(), denominator.len());
        let (shifted, advisory) =
            deconvolve_impl(numerator, denominator, nfft, self.stabilization);
        let max_imag = shifted.iter().fold(0.0f64, |m, c| m.max(c.im.abs()));
        Ok(DeconvolutionReport {
            signal: shifted.iter().map(|c| c.re).collect(),
            max_imag,
            advisory,
        })
    }
}

impl Deconvolve1D<f64> for DeconvolveKernel {
    fn run_into<I1, I2, O>(
        &self,
        numerator: &I1,
        denominator: &I2,
        out: &mut O,
    ) -> core::result::Result<(), ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
        O: Write1D<f64> + ?Sized,
    {
        let (numerator, denominator) = Self::checked_inputs(numerator, denominator)?;
        let nfft = self.transform_len(numerator.len(), denominator.len());
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        ensure_len("out", nfft, out.len())?;
        let (shifted, _) = deconvolve_impl(numerator, denominator, nfft, self.stabilization);
        for (dst, src) in out.iter_mut().zip(shifted.iter()) {
            *dst = src.re;
        }
        Ok(())
    }

    fn run_alloc<I1, I2>(
        &self,
        numerator: &I1,
        denominator: &I2,
    ) -> core::result::Result<Vec<f64>, ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        Ok(self.run_report(numerator, denominator)?.signal)
    }
}

fn forward(planner: &mut FftPlanner<f64>, x: &[f64], nfft: usize) -> Spectrum {
    let fft = planner.plan_fft_forward(nfft);
    let mut buf = alloc::vec![Complex::new(0.0, 0.0); nfft];
    for (dst, src) in buf.iter_mut().zip(x.iter().copied()) {
        *dst = Complex::new(src, 0.0);
    }
    fft.process(&mut buf);
    buf
}

fn inverse(planner: &mut FftPlanner<f64>, spectrum: &mut [Complex<f64>]) {
    let nfft = spectrum.len();
    let ifft = planner.plan_fft_inverse(nfft);
    ifft.process(spectrum);
    let scale = 1.0 / nfft as f64;
    for v in spectrum.iter_mut() {
        *v *= scale;
    }
}

fn deconvolve_impl(
    numerator: &[f64],
    denominator: &[f64],
    nfft: usize,
    stabilization: Stabilization,
) -> (Vec<Complex<f64>>, Option<Degeneracy>) {
    let mut planner = FftPlanner::<f64>::new();
    let num = forward(&mut planner, numerator, nfft);
    let den = forward(&mut planner, denominator, nfft);

    let (mut quotient, zero_bins) = match stabilization {
        Stabilization::WaterLevel { level } => divide(&num, &water_level(&den, level)),
        Stabilization::Damped { ratio } => damped_impl(&num, &den, ratio),
    };

    let advisory = if zero_bins > 0 {
        tracing::warn!(
            zero_bins,
            nfft,
            policy = ?stabilization.kind(),
            "deconvolution divisor has exactly-zero bins, zeroing them"
        );
        Some(Degeneracy::ZeroDenominator { bins: zero_bins })
    } else {
        None
    };

    inverse(&mut planner, &mut quotient);
    (center_shift(&quotient), advisory)
}

fn divide(num: &[Complex<f64>], den: &[Complex<f64>]) -> (Spectrum, usize) {
    let mut zero_bins = 0;
    let quotient = izip!(num, den)
        .map(|(n, d)| {
            if d.re == 0.0 && d.im == 0.0 {
                zero_bins += 1;
                Complex::new(0.0, 0.0)
            } else {
                n / d
            }
        })
        .collect();
    (quotient, zero_bins)
}

fn damped_impl(num: &[Complex<f64>], den: &[Complex<f64>], ratio: f64) -> (Spectrum, usize) {
    let power = den.iter().map(|d| d.norm_sqr()).sum::<f64>() / den.len().max(1) as f64;
    let damp = power * ratio;
    let mut zero_bins = 0;
    let quotient = izip!(num, den)
        .map(|(n, d)| {
            let divisor = d.norm_sqr() + damp;
            if divisor == 0.0 {
                zero_bins += 1;
                Complex::new(0.0, 0.0)
            } else {
                n * d.conj() / divisor
            }
        })
        .collect();
    (quotient, zero_bins)
}

///
/// Water-level a reference spectrum.
///
/// Every bin with `|Den[k]| < level * max|Den|` is replaced by
/// `Den[k] / |Den[k]| * threshold`: same phase, magnitude raised to the
/// threshold. A bin that is exactly zero has no phase and becomes
/// `threshold + 0i`. `level <= 0` gives a zero threshold and returns the
/// spectrum unchanged. The input is not modified.
///
/// ```
/// use fracsig::na::Complex;
/// use fracsig::signal::deconvolve::water_level;
///
/// let den = [Complex::new(10.0, 0.0), Complex::new(0.0, 0.1), Complex::new(0.0, 0.0)];
/// let stabilized = water_level(&den, 0.05);
/// assert_eq!(stabilized[0], den[0]);
/// assert!((stabilized[1] - Complex::new(0.0, 0.5)).norm() < 1e-12);
/// assert_eq!(stabilized[2], Complex::new(0.5, 0.0));
/// ```
///
pub fn water_level(den: &[Complex<f64>], level: f64) -> Spectrum {
    let max_mag = den.iter().fold(0.0f64, |m, d| m.max(d.norm()));
    let threshold = (level * max_mag).max(0.0);
    den.iter()
        .map(|&d| {
            let mag = d.norm();
            if mag >= threshold {
                d
            } else if mag == 0.0 {
                Complex::new(threshold, 0.0)
            } else {
                d / mag * threshold
            }
        })
        .collect()
}

///
/// Damped spectral quotient `Num * conj(Den) / (|Den|^2 + ratio * mean(|Den|^2))`.
///
/// Bins whose divisor is exactly zero (only possible for an all-zero
/// reference with `ratio` applied to zero power, or `ratio == 0`) are zero.
///
/// # Errors
/// [Error::InvalidInput] when the spectra differ in length.
///
pub fn damped_quotient(num: &[Complex<f64>], den: &[Complex<f64>], ratio: f64) -> Result<Spectrum> {
    if num.len() != den.len() {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "den",
            expected: num.len(),
            got: den.len(),
        }
        .into());
    }
    Ok(damped_impl(num, den, ratio).0)
}

///
/// Rotate `x` left by `floor(len / 2)`: `out[i] = x[(i + len / 2) % len]`.
///
/// ```
/// use fracsig::signal::deconvolve::center_shift;
///
/// assert_eq!(center_shift(&[0, 1, 2, 3, 4, 5]), vec![3, 4, 5, 0, 1, 2]);
/// assert_eq!(center_shift(&[0, 1, 2, 3, 4]), vec![2, 3, 4, 0, 1]);
/// ```
///
pub fn center_shift<T: Copy>(x: &[T]) -> Vec<T> {
    let mid = x.len() / 2;
    let mut out = Vec::with_capacity(x.len());
    out.extend_from_slice(&x[mid..]);
    out.extend_from_slice(&x[..mid]);
    out
}

///
/// Deconvolve `denominator` out of `numerator`.
///
/// Both inputs are zero padded to the longer length and transformed; the
/// quotient is regularized by `stabilization`, inverse transformed, centred
/// with [center_shift], and its real part returned.
///
/// # Errors
/// [Error::InvalidInput] for empty inputs or an invalid policy parameter.
///
/// ```
/// use fracsig::signal::deconvolve::{deconvolve, Stabilization};
///
/// // response = reference delayed by 3 samples and halved
/// let reference = [1.0, 0.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
/// let response = [0.0, 0.0, 0.0, 0.5, 0.2, 0.0, 0.0, 0.0];
/// let ir = deconvolve(&response, &reference, Stabilization::default()).unwrap();
/// // zero lag sits at index 4, so the delay shows up at 4 + 3
/// assert!((ir[7] - 0.5).abs() < 1e-12);
/// ```
///
pub fn deconvolve(
    numerator: &[f64],
    denominator: &[f64],
    stabilization: Stabilization,
) -> Result<Vec<f64>> {
    let kernel = DeconvolveKernel::try_new(DeconvolveConfig {
        nfft: None,
        stabilization,
    })?;
    Ok(kernel.run_alloc(numerator, denominator)?)
}

///
/// Deconvolve with the policy chosen by name (`"water_level"` or `"damp"`),
/// taking its parameter from `water_level` or `damp_ratio`.
///
/// # Errors
/// [Error::InvalidInput] for an unknown selector, before any computation.
///
pub fn deconvolve_selected(
    numerator: &[f64],
    denominator: &[f64],
    water_level: f64,
    damp_ratio: f64,
    policy: &str,
) -> Result<Vec<f64>> {
    let kind = policy.parse::<StabilizationKind>()?;
    deconvolve(
        numerator,
        denominator,
        Stabilization::from_kind(kind, water_level, damp_ratio),
    )
}
