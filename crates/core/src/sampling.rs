//! Probabilistic sampling gate.
//!
//! Each call is an independent Bernoulli trial: draw a uniform value in
//! [0, 1) and sample when it is `<= rate`. A rate of exactly 0.0 never
//! samples and never draws.

use crate::error::{ConfigError, ConfigResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A validated sample rate in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SampleRate(f64);

impl SampleRate {
    /// Sample everything.
    pub const ALWAYS: SampleRate = SampleRate(1.0);
    /// Sample nothing.
    pub const NEVER: SampleRate = SampleRate(0.0);

    /// Validate a raw rate. Out-of-range values are rejected, never clamped.
    pub fn new(rate: f64) -> ConfigResult<Self> {
        if rate.is_nan() || !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidSampleRate(rate));
        }
        Ok(Self(rate))
    }

    /// The raw value.
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::ALWAYS
    }
}

impl TryFrom<f64> for SampleRate {
    type Error = ConfigError;

    fn try_from(rate: f64) -> ConfigResult<Self> {
        SampleRate::new(rate)
    }
}

impl From<SampleRate> for f64 {
    fn from(rate: SampleRate) -> f64 {
        rate.0
    }
}

/// Stateless sampling gate. Safe to use from any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingGate;

impl SamplingGate {
    /// Decide whether to sample this invocation using the thread-local RNG.
    ///
    /// Fails with [`ConfigError::InvalidSampleRate`] when `rate` is outside
    /// [0.0, 1.0].
    pub fn should_sample(rate: f64) -> ConfigResult<bool> {
        Self::should_sample_with(rate, &mut rand::thread_rng())
    }

    /// Same as [`SamplingGate::should_sample`] with an explicit RNG.
    pub fn should_sample_with<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> ConfigResult<bool> {
        let rate = SampleRate::new(rate)?;
        Ok(Self::sample(rate, rng))
    }

    /// Decide with an already validated rate.
    pub fn sample<R: Rng + ?Sized>(rate: SampleRate, rng: &mut R) -> bool {
        if rate.get() == 0.0 {
            return false;
        }
        if rate.get() >= 1.0 {
            return true;
        }
        let drawn: f64 = rng.gen_range(0.0..1.0);
        drawn <= rate.get()
    }
}
