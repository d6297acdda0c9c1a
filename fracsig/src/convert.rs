//! Bridge-voltage to strain and shear-strain to stress conversion.
//!
//! Both conversions are linear and sample-wise, so they are exposed through
//! [Convert1D]: build the kernel once from its constants and convert single
//! samples or whole buffers.

use crate::kernel::{ensure_positive, ConfigError, KernelLifecycle};
use crate::signal::traits::Convert1D;

#[cfg(feature = "alloc")]
use crate::error::Result;
#[cfg(feature = "alloc")]
use crate::kernel::ensure_non_empty;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Wheatstone bridge and amplifier constants of a strain-gauge channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeConfig {
    /// Bridge excitation voltage in volts.
    pub excitation_voltage: f64,
    /// Gauge factor (dimensionless).
    pub gauge_factor: f64,
    /// Amplifier gain (dimensionless).
    pub gain: f64,
    /// Gauge resistance in ohms. Recorded for provenance, not used by the
    /// conversion.
    pub gauge_resistance: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            excitation_voltage: 4.98,
            gauge_factor: 2.12,
            gain: 1000.0,
            gauge_resistance: 350.0,
        }
    }
}

/// Converts amplified bridge output voltage to strain:
/// `strain = v / Vex / gain * 2 / GF`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageToStrainKernel {
    bridge: BridgeConfig,
    scale: f64,
}

impl KernelLifecycle for VoltageToStrainKernel {
    type Config = BridgeConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        ensure_positive("excitation_voltage", config.excitation_voltage)?;
        ensure_positive("gauge_factor", config.gauge_factor)?;
        ensure_positive("gain", config.gain)?;
        ensure_positive("gauge_resistance", config.gauge_resistance)?;
        let scale = 2.0 / (config.excitation_voltage * config.gain * config.gauge_factor);
        Ok(Self {
            bridge: config,
            scale,
        })
    }
}

impl VoltageToStrainKernel {
    /// Bridge constants in use.
    pub fn bridge(&self) -> &BridgeConfig {
        &self.bridge
    }
}

impl Convert1D<f64> for VoltageToStrainKernel {
    fn convert(&self, sample: f64) -> f64 {
        sample * self.scale
    }
}

/// Isotropic elastic constants of the specimen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialConfig {
    /// Young's modulus, in the stress unit wanted for the output.
    pub youngs_modulus: f64,
    /// Poisson's ratio.
    pub poisson_ratio: f64,
}

impl MaterialConfig {
    /// `G = E / (2 (1 + nu))`.
    pub fn shear_modulus(&self) -> f64 {
        self.youngs_modulus / (2.0 * (1.0 + self.poisson_ratio))
    }
}

/// Converts engineering shear strain to shear stress: `tau = G * gamma`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShearStressKernel {
    shear_modulus: f64,
}

impl KernelLifecycle for ShearStressKernel {
    type Config = MaterialConfig;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        ensure_positive("youngs_modulus", config.youngs_modulus)?;
        let nu = config.poisson_ratio;
        if !(nu > -1.0 && nu < 0.5) {
            return Err(ConfigError::InvalidArgument {
                arg: "poisson_ratio",
                reason: "must satisfy -1 < nu < 0.5",
            });
        }
        Ok(Self {
            shear_modulus: config.shear_modulus(),
        })
    }
}

impl ShearStressKernel {
    /// Shear modulus applied to each sample.
    pub fn shear_modulus(&self) -> f64 {
        self.shear_modulus
    }
}

impl Convert1D<f64> for ShearStressKernel {
    fn convert(&self, sample: f64) -> f64 {
        self.shear_modulus * sample
    }
}

///
/// Convert bridge output voltages to strain.
///
/// ```
/// use approx::assert_relative_eq;
/// use fracsig::convert::{voltage_to_strain, BridgeConfig};
///
/// let strain = voltage_to_strain(&[0.002], &BridgeConfig::default()).unwrap();
/// assert_relative_eq!(strain[0], 0.002 / 4.98 / 1000.0 * 2.0 / 2.12, max_relative = 1e-12);
/// ```
///
#[cfg(feature = "alloc")]
pub fn voltage_to_strain(raw: &[f64], bridge: &BridgeConfig) -> Result<Vec<f64>> {
    let kernel = VoltageToStrainKernel::try_new(*bridge)?;
    Ok(kernel.run_alloc(raw)?)
}

///
/// Convert engineering shear strain to shear stress with `G = E / (2 (1 + nu))`.
///
#[cfg(feature = "alloc")]
pub fn shear_strain_to_stress(strain: &[f64], material: &MaterialConfig) -> Result<Vec<f64>> {
    let kernel = ShearStressKernel::try_new(*material)?;
    Ok(kernel.run_alloc(strain)?)
}

///
/// Reference a record to its first sample, so gauges start at zero strain.
///
/// ```
/// use fracsig::convert::zero_baseline;
///
/// assert_eq!(zero_baseline(&[3.0, 3.5, 2.0]).unwrap(), vec![0.0, 0.5, -1.0]);
/// ```
///
#[cfg(feature = "alloc")]
pub fn zero_baseline(signal: &[f64]) -> Result<Vec<f64>> {
    ensure_non_empty("signal", signal)?;
    let first = signal[0];
    Ok(signal.iter().map(|v| v - first).collect())
}
