//! Capture decision.
//!
//! Order of checks:
//! 1. globally disabled => no
//! 2. subject override present and false => no
//! 3. sampling gate says no => no
//! 4. no include pattern matches => no
//! 5. an exclude pattern matches => no
//! 6. otherwise yes
//!
//! The sample rate is validated before anything else, so a bad rate is
//! reported even while capture is disabled.

use crate::config::Config;
use crate::error::ConfigResult;
use crate::filter::FilterSet;
use crate::sampling::{SampleRate, SamplingGate};
use crate::types::SubjectKind;
use rand::Rng;
use std::collections::HashMap;

/// Stateless "should this unit of work be captured" check.
#[derive(Debug, Clone, Copy)]
pub struct ProfilingDecision {
    enabled: bool,
}

impl ProfilingDecision {
    /// Create a decision with the global switch set to `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether capture is globally enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Decide for raw pattern lists, compiling them on the spot.
    pub fn should_capture<C, P>(
        &self,
        components: &[C],
        include: &[P],
        exclude: &[P],
        subject_override: Option<bool>,
        sample_rate: f64,
    ) -> ConfigResult<bool>
    where
        C: AsRef<str>,
        P: AsRef<str>,
    {
        let rate = SampleRate::new(sample_rate)?;
        let include = FilterSet::compile(include)?;
        let exclude = FilterSet::compile(exclude)?;
        Ok(self.decide(
            components,
            &include,
            &exclude,
            subject_override,
            rate,
            &mut rand::thread_rng(),
        ))
    }

    /// Decide with compiled filters, a validated rate and an explicit RNG.
    pub fn decide<C, R>(
        &self,
        components: &[C],
        include: &FilterSet,
        exclude: &FilterSet,
        subject_override: Option<bool>,
        rate: SampleRate,
        rng: &mut R,
    ) -> bool
    where
        C: AsRef<str>,
        R: Rng + ?Sized,
    {
        if !self.enabled {
            return false;
        }
        if subject_override == Some(false) {
            return false;
        }
        if !SamplingGate::sample(rate, rng) {
            return false;
        }
        if !include.matches(components) {
            return false;
        }
        !exclude.matches(components)
    }
}

/// Pre-compiled decision inputs for every subject kind.
///
/// Built once from a [`Config`]; each check then costs one random draw and
/// one pattern pass.
#[derive(Debug, Clone)]
pub struct CapturePolicy {
    decision: ProfilingDecision,
    rate: SampleRate,
    filters: HashMap<SubjectKind, (FilterSet, FilterSet)>,
}

impl CapturePolicy {
    /// Compile the include/exclude lists of every subject kind.
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let mut filters = HashMap::with_capacity(SubjectKind::ALL.len());
        for kind in SubjectKind::ALL {
            let include = FilterSet::compile(config.include.get(kind))?;
            let exclude = FilterSet::compile(config.exclude.get(kind))?;
            filters.insert(kind, (include, exclude));
        }
        Ok(Self {
            decision: ProfilingDecision::new(config.enabled),
            rate: config.sample_rate,
            filters,
        })
    }

    /// Whether capture is globally enabled.
    pub fn enabled(&self) -> bool {
        self.decision.enabled()
    }

    /// Decide for one subject.
    pub fn should_capture<C: AsRef<str>>(
        &self,
        kind: SubjectKind,
        components: &[C],
        subject_override: Option<bool>,
    ) -> bool {
        self.should_capture_with(kind, components, subject_override, &mut rand::thread_rng())
    }

    /// Decide for one subject with an explicit RNG.
    pub fn should_capture_with<C, R>(
        &self,
        kind: SubjectKind,
        components: &[C],
        subject_override: Option<bool>,
        rng: &mut R,
    ) -> bool
    where
        C: AsRef<str>,
        R: Rng + ?Sized,
    {
        let Some((include, exclude)) = self.filters.get(&kind) else {
            return false;
        };
        let capture = self
            .decision
            .decide(components, include, exclude, subject_override, self.rate, rng);
        tracing::debug!(kind = %kind, capture, "capture decision");
        capture
    }
}
