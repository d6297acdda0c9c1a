use super::ConfigError;

/// Constructor validation lifecycle shared by kernel structs.
///
/// A kernel that exists has a valid configuration; run-time entrypoints only
/// need to check the signals handed to them.
pub trait KernelLifecycle: Sized {
    /// Kernel config type.
    type Config;

    /// Construct a validated kernel from config.
    fn try_new(config: Self::Config) -> Result<Self, ConfigError>;
}

/// Validate that a configuration value is a finite, strictly positive number.
pub(crate) fn ensure_positive(arg: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "must be finite and > 0",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ensure_positive, ConfigError, KernelLifecycle};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct GainConfig {
        gain: f64,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct GainKernel {
        gain: f64,
    }

    impl KernelLifecycle for GainKernel {
        type Config = GainConfig;

        fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
            ensure_positive("gain", config.gain)?;
            Ok(Self { gain: config.gain })
        }
    }

    #[test]
    fn lifecycle_constructor_accepts_valid_config() {
        let kernel = GainKernel::try_new(GainConfig { gain: 1000.0 }).expect("valid config");
        assert_eq!(kernel.gain, 1000.0);
    }

    #[test]
    fn lifecycle_constructor_rejects_non_finite_and_non_positive() {
        for gain in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = GainKernel::try_new(GainConfig { gain }).expect_err("invalid config");
            assert_eq!(
                err,
                ConfigError::InvalidArgument {
                    arg: "gain",
                    reason: "must be finite and > 0",
                }
            );
        }
    }
}
