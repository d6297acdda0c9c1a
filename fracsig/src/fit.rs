//! Least-squares objective for fitting a crack-tip stress-field model to gauge
//! records.
//!
//! The physics lives behind [StressFieldModel]; this module only scores a
//! parameter vector against observed channels. Minimization is left to the
//! caller's optimizer, which sees either the scalar cost
//! ([SumOfSquaresObjective::evaluate]) or the weighted residual vector
//! ([SumOfSquaresObjective::residuals]).

use core::{error, fmt};

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use num_traits::Float;

use alloc::vec::Vec;

/// Model predicting one or more gauge channels at given sample times.
///
/// A cohesive-crack model typically predicts the shear (`exy`) and normal
/// (`eyy`) strain seen by a gauge rosette as the crack tip passes.
pub trait StressFieldModel {
    /// Failure raised by the model for parameters it cannot evaluate.
    type Error;

    /// Predict every channel at `times` for `params`. The outer vector is
    /// indexed by channel, the inner one by sample.
    fn predict(&self, params: &[f64], times: &[f64]) -> Result<Vec<Vec<f64>>, Self::Error>;
}

/// Observed channels sampled at shared times.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitObservation {
    /// Sample times.
    pub times: Vec<f64>,
    /// One record per channel, each as long as `times`.
    pub channels: Vec<Vec<f64>>,
    /// One non-negative weight per channel.
    pub weights: Vec<f64>,
}

/// Errors from [SumOfSquaresObjective::evaluate].
#[derive(Debug, Clone, PartialEq)]
pub enum FitError<E> {
    /// The model's prediction did not match the observation's shape.
    Shape(ExecInvariantViolation),
    /// The model failed.
    Model(E),
}

impl<E: fmt::Display> fmt::Display for FitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitError::Shape(err) => write!(f, "Prediction shape mismatch: {err}"),
            FitError::Model(err) => write!(f, "Model evaluation failed: {err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> error::Error for FitError<E> {}

/// Constructor config for [`SumOfSquaresObjective`].
#[derive(Debug, Clone, PartialEq)]
pub struct SumOfSquaresConfig<M> {
    /// Model being fitted.
    pub model: M,
    /// Observed records.
    pub observation: FitObservation,
}

/// Weighted sum of squared residuals across all channels.
#[derive(Debug, Clone, PartialEq)]
pub struct SumOfSquaresObjective<M> {
    model: M,
    observation: FitObservation,
}

impl<M: StressFieldModel> KernelLifecycle for SumOfSquaresObjective<M> {
    type Config = SumOfSquaresConfig<M>;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let obs = &config.observation;
        if obs.times.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "times" });
        }
        if obs.channels.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "channels" });
        }
        if obs.channels.iter().any(|c| c.len() != obs.times.len()) {
            return Err(ConfigError::InvalidArgument {
                arg: "channels",
                reason: "every channel must have one sample per time",
            });
        }
        if obs.weights.len() != obs.channels.len() {
            return Err(ConfigError::InvalidArgument {
                arg: "weights",
                reason: "expected one weight per channel",
            });
        }
        if obs.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::InvalidArgument {
                arg: "weights",
                reason: "weights must be finite and >= 0",
            });
        }
        Ok(Self {
            model: config.model,
            observation: config.observation,
        })
    }
}

impl<M: StressFieldModel> SumOfSquaresObjective<M> {
    /// Observation being fitted.
    pub fn observation(&self) -> &FitObservation {
        &self.observation
    }

    fn predict(&self, params: &[f64]) -> Result<Vec<Vec<f64>>, FitError<M::Error>> {
        let predicted = self
            .model
            .predict(params, &self.observation.times)
            .map_err(FitError::Model)?;
        if predicted.len() != self.observation.channels.len() {
            return Err(FitError::Shape(ExecInvariantViolation::LengthMismatch {
                arg: "channels",
                expected: self.observation.channels.len(),
                got: predicted.len(),
            }));
        }
        if let Some(bad) = predicted
            .iter()
            .find(|c| c.len() != self.observation.times.len())
        {
            return Err(FitError::Shape(ExecInvariantViolation::LengthMismatch {
                arg: "prediction",
                expected: self.observation.times.len(),
                got: bad.len(),
            }));
        }
        Ok(predicted)
    }

    /// Weighted residuals `sqrt(w_c) * (predicted - observed)`, channel after
    /// channel. Their squared norm is [Self::evaluate].
    pub fn residuals(&self, params: &[f64]) -> Result<Vec<f64>, FitError<M::Error>> {
        let predicted = self.predict(params)?;
        let obs = &self.observation;
        Ok(predicted
            .iter()
            .zip(obs.channels.iter())
            .zip(obs.weights.iter())
            .flat_map(|((p, o), w)| {
                let scale = Float::sqrt(*w);
                p.iter().zip(o.iter()).map(move |(p, o)| scale * (p - o))
            })
            .collect())
    }

    /// Weighted sum of squared residuals for `params`.
    pub fn evaluate(&self, params: &[f64]) -> Result<f64, FitError<M::Error>> {
        let predicted = self.predict(params)?;
        let obs = &self.observation;
        let cost = predicted
            .iter()
            .zip(obs.channels.iter())
            .zip(obs.weights.iter())
            .map(|((p, o), w)| {
                w * p
                    .iter()
                    .zip(o.iter())
                    .map(|(p, o)| (p - o) * (p - o))
                    .sum::<f64>()
            })
            .sum::<f64>();
        tracing::trace!(cost, n_params = params.len(), "evaluated stress-field objective");
        Ok(cost)
    }
}
