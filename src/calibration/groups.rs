use crate::calibration::SetFit;
use crate::dataset::{partition_by_group, SampleSet};
use std::collections::BTreeMap;

/// Per-group fitting results. Both collections are in lexicographic group
/// order, so logs and artifacts come out the same on every run.
#[derive(Debug, Clone, Default)]
pub struct GroupResults {
    pub fitted: BTreeMap<String, SetFit>,
    /// Groups below the sample gate, with their sizes
    pub skipped: Vec<(String, usize)>,
}

impl GroupResults {
    pub fn is_empty(&self) -> bool {
        self.fitted.is_empty() && self.skipped.is_empty()
    }
}

/// Fit temperature and bias independently for every group partition that
/// holds at least `min_size` samples. Smaller partitions are noted and
/// contribute nothing.
pub fn fit_groups(samples: &SampleSet, min_size: usize) -> GroupResults {
    let mut results = GroupResults::default();

    for (group, indices) in partition_by_group(samples) {
        let n = indices.len();
        if n < min_size {
            tracing::info!(group = %group, samples = n, min_size, "too few samples, skipping group");
            results.skipped.push((group, n));
            continue;
        }

        let fit = SetFit::fit(&samples.subset(&indices));
        tracing::info!(
            group = %group,
            samples = n,
            tau = fit.temperature.tau,
            nll = fit.temperature.nll,
            "group calibrated"
        );
        results.fitted.insert(group, fit);
    }

    results
}
