//! Hyperparameter search

mod random;
mod space;

pub use random::{RandomSearch, SearchConfig, SearchOutcome, TrialOutcome};
pub use space::{ParamDistribution, ParamValue, SearchSpace, TrialParams};
