pub mod groups;
pub mod artifact;
pub mod metrics;

use crate::dataset::SampleSet;
use crate::emotion::ClassValues;
use crate::models::{estimate_bias, fit_temperature, TemperatureFit};

/// Temperature and bias fitted on one sample set (global or one group).
#[derive(Debug, Clone, PartialEq)]
pub struct SetFit {
    pub samples: usize,
    pub temperature: TemperatureFit,
    pub bias: ClassValues,
}

impl SetFit {
    pub fn fit(set: &SampleSet) -> Self {
        let labels = set.labels();
        let temperature = fit_temperature(&set.logits(), &labels);
        let bias = estimate_bias(&set.probabilities(), &labels);
        Self {
            samples: set.len(),
            temperature,
            bias,
        }
    }
}
