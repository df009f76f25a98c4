//! Hyperparameter search space definition

use crate::error::{PipelineError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distribution a single hyperparameter is sampled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamDistribution {
    /// Uniform float in `[low, high)`
    Uniform { low: f64, high: f64 },
    /// Log-uniform float in `[low, high)`; `low` must be positive
    LogUniform { low: f64, high: f64 },
    /// Integer in `[low, high]`
    IntRange { low: i64, high: i64 },
    /// One of a fixed set of string options
    Choice { options: Vec<String> },
    /// Boolean flag
    Flag,
}

impl ParamDistribution {
    /// Draw a value from this distribution.
    pub fn sample(&self, rng: &mut impl Rng) -> Result<ParamValue> {
        match self {
            ParamDistribution::Uniform { low, high } => {
                Ok(ParamValue::F64(rng.gen::<f64>() * (high - low) + low))
            }
            ParamDistribution::LogUniform { low, high } => {
                let log_low = low.ln();
                let log_high = high.ln();
                Ok(ParamValue::F64(
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp(),
                ))
            }
            ParamDistribution::IntRange { low, high } => {
                Ok(ParamValue::I64(rng.gen_range(*low..=*high)))
            }
            ParamDistribution::Choice { options } => {
                if options.is_empty() {
                    return Err(PipelineError::ValidationError(
                        "choice distribution has no options".to_string(),
                    ));
                }
                let idx = rng.gen_range(0..options.len());
                Ok(ParamValue::Str(options[idx].clone()))
            }
            ParamDistribution::Flag => Ok(ParamValue::Bool(rng.gen())),
        }
    }
}

/// A sampled hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    F64(f64),
    I64(i64),
    Str(String),
    Bool(bool),
}

impl ParamValue {
    /// As float; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::F64(v) => Some(*v),
            ParamValue::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// As integer; floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::I64(v) => Some(*v),
            ParamValue::F64(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::F64(v) => write!(f, "{v}"),
            ParamValue::I64(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// A sampled configuration: parameter name to value.
pub type TrialParams = BTreeMap<String, ParamValue>;

/// Named parameter distributions forming the search space for one model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    params: Vec<(String, ParamDistribution)>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform float parameter.
    pub fn uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, ParamDistribution::Uniform { low, high })
    }

    /// Add a log-uniform float parameter.
    pub fn log_uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, ParamDistribution::LogUniform { low, high })
    }

    /// Add an integer parameter (inclusive bounds).
    pub fn int_range(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(name, ParamDistribution::IntRange { low, high })
    }

    /// Add a categorical parameter.
    pub fn choice(self, name: impl Into<String>, options: &[&str]) -> Self {
        self.add(
            name,
            ParamDistribution::Choice {
                options: options.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    /// Add a boolean parameter.
    pub fn flag(self, name: impl Into<String>) -> Self {
        self.add(name, ParamDistribution::Flag)
    }

    fn add(mut self, name: impl Into<String>, dist: ParamDistribution) -> Self {
        self.params.push((name.into(), dist));
        self
    }

    /// Sample one configuration from all distributions.
    pub fn sample(&self, rng: &mut impl Rng) -> Result<TrialParams> {
        self.params
            .iter()
            .map(|(name, dist)| Ok((name.clone(), dist.sample(rng)?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_space_builder() {
        let space = SearchSpace::new()
            .log_uniform("alpha", 1e-4, 10.0)
            .int_range("n_neighbors", 1, 15)
            .choice("weights", &["uniform", "distance"])
            .flag("fit_intercept");
        assert_eq!(space.len(), 4);
    }

    #[test]
    fn test_uniform_sampling_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dist = ParamDistribution::Uniform { low: -1.0, high: 1.0 };
        for _ in 0..100 {
            let v = dist.sample(&mut rng).unwrap().as_f64().unwrap();
            assert!((-1.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_log_uniform_sampling_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dist = ParamDistribution::LogUniform { low: 1e-4, high: 1e-1 };
        for _ in 0..100 {
            let v = dist.sample(&mut rng).unwrap().as_f64().unwrap();
            assert!(v >= 1e-4 && v <= 1e-1);
        }
    }

    #[test]
    fn test_int_and_choice_sampling() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let k = ParamDistribution::IntRange { low: 1, high: 5 };
        let w = ParamDistribution::Choice {
            options: vec!["uniform".to_string(), "distance".to_string()],
        };

        for _ in 0..50 {
            let kv = k.sample(&mut rng).unwrap().as_i64().unwrap();
            assert!((1..=5).contains(&kv));

            let wv = w.sample(&mut rng).unwrap();
            assert!(["uniform", "distance"].contains(&wv.as_str().unwrap()));
        }
    }

    #[test]
    fn test_empty_choice_fails_to_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let space = SearchSpace::new().choice("weights", &[]);
        let err = space.sample(&mut rng).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError(_)));
    }

    #[test]
    fn test_sample_covers_all_params() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let space = SearchSpace::new()
            .uniform("a", 0.0, 1.0)
            .int_range("b", 0, 10);
        let params = space.sample(&mut rng).unwrap();
        assert_eq!(params.len(), 2);
        assert!(params.contains_key("a"));
        assert!(params.contains_key("b"));
    }

    #[test]
    fn test_empty_space_samples_empty_params() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = SearchSpace::new().sample(&mut rng).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let space = SearchSpace::new().uniform("x", 0.0, 1.0).flag("y");
        let a = space.sample(&mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let b = space.sample(&mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }
}
