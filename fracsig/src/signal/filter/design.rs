use crate::error::Result;
use crate::kernel::{ensure_positive, ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::traits::IirDesign;
use core::f64::consts::PI;
use nalgebra::Complex;
use num_traits::Float;

use alloc::vec::Vec;

/// Pass band of a [ButterKernel] design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterBandType {
    /// Pass frequencies below the cutoff.
    #[default]
    Lowpass,
    /// Pass frequencies above the cutoff.
    Highpass,
}

/// One second-order section `b[0..3] / a[0..3]` with its transposed direct
/// form II state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sos {
    /// Numerator coefficients.
    pub b: [f64; 3],
    /// Denominator coefficients, `a[0] == 1`.
    pub a: [f64; 3],
    /// First delay element.
    pub zi0: f64,
    /// Second delay element.
    pub zi1: f64,
}

impl Sos {
    /// Section with zeroed state. Coefficients are normalized so `a[0] == 1`.
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        Sos {
            b: b.map(|v| v / a0),
            a: a.map(|v| v / a0),
            zi0: 0.0,
            zi1: 0.0,
        }
    }

    /// Sections from the `n x 6` row layout scipy uses for `output="sos"`.
    pub fn from_scipy_rows(rows: &[[f64; 6]]) -> Vec<Sos> {
        rows.iter()
            .map(|r| Sos::new([r[0], r[1], r[2]], [r[3], r[4], r[5]]))
            .collect()
    }

    /// Complex response of this section at normalized angular frequency `w`
    /// (radians per sample).
    pub fn response(&self, w: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = self.a[0] + z1 * self.a[1] + z2 * self.a[2];
        num / den
    }
}

/// Constructor config for [`ButterKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButterConfig {
    /// Filter order.
    pub order: usize,
    /// -3 dB frequency in Hz.
    pub cutoff_hz: f64,
    /// Sample rate in Hz.
    pub fs: f64,
    /// Pass band.
    pub btype: FilterBandType,
}

/// Trait-first Butterworth design kernel producing second-order sections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButterKernel {
    order: usize,
    cutoff_hz: f64,
    fs: f64,
    btype: FilterBandType,
}

impl KernelLifecycle for ButterKernel {
    type Config = ButterConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        if config.order == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "order",
                reason: "order must be greater than zero",
            });
        }
        ensure_positive("fs", config.fs)?;
        ensure_positive("cutoff_hz", config.cutoff_hz)?;
        if config.cutoff_hz >= config.fs / 2.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "cutoff_hz",
                reason: "digital cutoff must satisfy 0 < cutoff < fs/2",
            });
        }
        Ok(Self {
            order: config.order,
            cutoff_hz: config.cutoff_hz,
            fs: config.fs,
            btype: config.btype,
        })
    }
}

impl ButterKernel {
    fn design(&self) -> Vec<Sos> {
        let n = self.order;
        let k = 2.0 * self.fs;
        // pre-warped analog cutoff for the bilinear transform
        let warped = k * Float::tan(PI * self.cutoff_hz / self.fs);
        let bilinear = |s: Complex<f64>| (k + s) / (k - s);
        let analog = |p: Complex<f64>| match self.btype {
            FilterBandType::Lowpass => p * warped,
            FilterBandType::Highpass => Complex::new(warped, 0.0) / p,
        };

        let mut sections = Vec::with_capacity(n.div_ceil(2));
        // prototype poles -exp(j*pi*m/(2n)), m = n-1, n-3, ..., one per conjugate pair
        let mut m = n as isize - 1;
        while m > 0 {
            let theta = PI * m as f64 / (2.0 * n as f64);
            let p = -Complex::from_polar(1.0, theta);
            let z = bilinear(analog(p));
            let a = [1.0, -2.0 * z.re, z.norm_sqr()];
            let b = match self.btype {
                FilterBandType::Lowpass => {
                    let g = (a[0] + a[1] + a[2]) / 4.0;
                    [g, 2.0 * g, g]
                }
                FilterBandType::Highpass => {
                    let g = (a[0] - a[1] + a[2]) / 4.0;
                    [g, -2.0 * g, g]
                }
            };
            sections.push(Sos::new(b, a));
            m -= 2;
        }
        if n % 2 == 1 {
            let z = bilinear(analog(Complex::new(-1.0, 0.0))).re;
            let a = [1.0, -z, 0.0];
            let b = match self.btype {
                FilterBandType::Lowpass => {
                    let g = (1.0 + a[1]) / 2.0;
                    [g, g, 0.0]
                }
                FilterBandType::Highpass => {
                    let g = (1.0 - a[1]) / 2.0;
                    [g, -g, 0.0]
                }
            };
            sections.push(Sos::new(b, a));
        }
        // poles closest to the unit circle last
        sections.reverse();
        sections
    }
}

impl IirDesign<f64> for ButterKernel {
    type Output = Vec<Sos>;

    fn run_alloc(&self) -> core::result::Result<Self::Output, ExecInvariantViolation> {
        let sos = self.design();
        tracing::trace!(
            order = self.order,
            cutoff_hz = self.cutoff_hz,
            fs = self.fs,
            sections = sos.len(),
            "designed butterworth sections"
        );
        Ok(sos)
    }
}

///
/// Digital Butterworth filter of `order` with its -3 dB point at `cutoff_hz`,
/// as cascaded second-order sections.
///
/// Each section has unit gain in the pass band (DC for a lowpass, Nyquist for
/// a highpass). An odd order starts with a first-order section whose `b[2]`
/// and `a[2]` are zero.
///
/// ```
/// use approx::assert_relative_eq;
/// use fracsig::signal::filter::{butter_sos, FilterBandType};
///
/// let sos = butter_sos(2, 100.0, 1000.0, FilterBandType::Lowpass).unwrap();
/// assert_eq!(sos.len(), 1);
/// assert_relative_eq!(sos[0].a[1], -1.142_980_502_539_901, epsilon = 1e-9);
/// ```
///
pub fn butter_sos(order: usize, cutoff_hz: f64, fs: f64, btype: FilterBandType) -> Result<Vec<Sos>> {
    let kernel = ButterKernel::try_new(ButterConfig {
        order,
        cutoff_hz,
        fs,
        btype,
    })?;
    Ok(kernel.run_alloc()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cascade_gain(sos: &[Sos], w: f64) -> f64 {
        sos.iter()
            .map(|s| s.response(w))
            .fold(Complex::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }

    #[test]
    fn second_order_lowpass_matches_scipy() {
        // scipy.signal.butter(2, 0.2, output="sos")
        let sos = butter_sos(2, 100.0, 1000.0, FilterBandType::Lowpass).expect("design");
        let expected = Sos::from_scipy_rows(&[[
            0.067_455_273_889_071_88,
            0.134_910_547_778_143_75,
            0.067_455_273_889_071_88,
            1.0,
            -1.142_980_502_539_901,
            0.412_801_598_096_188_8,
        ]]);
        assert_eq!(sos.len(), 1);
        for i in 0..3 {
            assert_abs_diff_eq!(sos[0].b[i], expected[0].b[i], epsilon = 1e-9);
            assert_abs_diff_eq!(sos[0].a[i], expected[0].a[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn second_order_highpass_matches_scipy() {
        // scipy.signal.butter(2, 0.2, btype="high", output="sos")
        let sos = butter_sos(2, 100.0, 1000.0, FilterBandType::Highpass).expect("design");
        assert_abs_diff_eq!(sos[0].b[0], 0.638_945_525_159_022_8, epsilon = 1e-9);
        assert_abs_diff_eq!(sos[0].b[1], -1.277_891_050_318_045_6, epsilon = 1e-9);
        assert_abs_diff_eq!(sos[0].a[1], -1.142_980_502_539_901, epsilon = 1e-9);
        assert_abs_diff_eq!(sos[0].a[2], 0.412_801_598_096_188_8, epsilon = 1e-9);
    }

    #[test]
    fn odd_order_leads_with_first_order_section() {
        let fs = 2000.0;
        let cutoff = 150.0;
        let sos = butter_sos(5, cutoff, fs, FilterBandType::Lowpass).expect("design");
        assert_eq!(sos.len(), 3);
        assert_eq!(sos.iter().filter(|s| s.a[2] == 0.0 && s.b[2] == 0.0).count(), 1);
        assert_eq!(sos[0].a[2], 0.0);

        assert_abs_diff_eq!(cascade_gain(&sos, 0.0), 1.0, epsilon = 1e-12);
        let wc = 2.0 * PI * cutoff / fs;
        assert_abs_diff_eq!(cascade_gain(&sos, wc), core::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        assert!(cascade_gain(&sos, PI) < 1e-9);
    }

    #[test]
    fn highpass_passes_nyquist_and_blocks_dc() {
        let sos = butter_sos(4, 50.0, 1000.0, FilterBandType::Highpass).expect("design");
        assert_eq!(sos.len(), 2);
        assert_abs_diff_eq!(cascade_gain(&sos, PI), 1.0, epsilon = 1e-12);
        assert!(cascade_gain(&sos, 0.0) < 1e-12);
    }

    #[test]
    fn poles_are_inside_unit_circle() {
        for order in 1..=8 {
            for btype in [FilterBandType::Lowpass, FilterBandType::Highpass] {
                let sos = butter_sos(order, 30.0, 500.0, btype).expect("design");
                for s in sos {
                    // |z|^2 of a conjugate pair, or |z| of the real pole
                    assert!(s.a[2].abs() < 1.0);
                    assert!(s.a[1].abs() < 1.0 + s.a[2]);
                }
            }
        }
    }

    #[test]
    fn constructor_rejects_bad_config() {
        let base = ButterConfig {
            order: 4,
            cutoff_hz: 100.0,
            fs: 1000.0,
            btype: FilterBandType::Lowpass,
        };
        assert!(ButterKernel::try_new(base).is_ok());
        assert_eq!(
            ButterKernel::try_new(ButterConfig { order: 0, ..base }).expect_err("order"),
            ConfigError::InvalidArgument {
                arg: "order",
                reason: "order must be greater than zero",
            }
        );
        assert!(ButterKernel::try_new(ButterConfig { fs: 0.0, ..base }).is_err());
        assert!(ButterKernel::try_new(ButterConfig {
            cutoff_hz: 500.0,
            ..base
        })
        .is_err());
        assert!(ButterKernel::try_new(ButterConfig {
            cutoff_hz: f64::NAN,
            ..base
        })
        .is_err());
    }
}
