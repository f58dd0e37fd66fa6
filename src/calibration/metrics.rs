//! Before/after calibration quality: top-1 accuracy and expected
//! calibration error (ECE). Observational only, never persisted.
use crate::models::codec::to_logit;
use crate::models::likelihood::softmax;
use crate::models::matrix::ClassMatrix;
use crate::models::temperature::{linspace, scale_logits};
use statrs::statistics::Statistics;

/// A bin in the reliability diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilityBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// Fraction of samples in the bin whose argmax is correct
    pub accuracy: f64,
    /// Mean top-class confidence in the bin
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MetricsReport {
    pub samples: usize,
    pub tau: f64,
    pub raw_accuracy: f64,
    pub calibrated_accuracy: f64,
    pub raw_ece: f64,
    pub calibrated_ece: f64,
}

/// softmax(logit(P) / tau)
pub fn calibrated_probabilities(probs: &ClassMatrix, tau: f64) -> ClassMatrix {
    softmax(&scale_logits(&to_logit(probs), tau))
}

/// Mean of `argmax(row) == label`. 0.0 for an empty set.
pub fn top1_accuracy(probs: &ClassMatrix, labels: &[usize]) -> f64 {
    let n = probs.len().min(labels.len());
    if n == 0 {
        return 0.0;
    }
    let hits = probs
        .row_argmax()
        .into_iter()
        .zip(labels)
        .filter(|&(pred, &y)| pred == y)
        .count();
    hits as f64 / n as f64
}

/// Non-empty confidence bins over `num_bins` equal-width intervals.
///
/// Every bin is half-open, `[lower, upper)`, the last one included, so a
/// sample whose confidence is exactly 1.0 lands in no bin.
pub fn reliability_bins(probs: &ClassMatrix, labels: &[usize], num_bins: usize) -> Vec<ReliabilityBin> {
    if num_bins == 0 {
        return Vec::new();
    }
    let edges = linspace(0.0, 1.0, num_bins + 1);
    let points: Vec<(f64, bool)> = probs
        .row_max()
        .into_iter()
        .zip(probs.row_argmax())
        .zip(labels)
        .map(|((conf, pred), &y)| (conf, pred == y))
        .collect();

    let mut bins = Vec::new();
    for w in edges.windows(2) {
        let (lower, upper) = (w[0], w[1]);
        let members: Vec<&(f64, bool)> = points
            .iter()
            .filter(|(conf, _)| *conf >= lower && *conf < upper)
            .collect();
        if members.is_empty() {
            continue;
        }
        bins.push(ReliabilityBin {
            lower,
            upper,
            count: members.len(),
            accuracy: members.iter().map(|(_, ok)| if *ok { 1.0 } else { 0.0 }).mean(),
            confidence: members.iter().map(|(conf, _)| *conf).mean(),
        });
    }
    bins
}

/// ECE = sum over bins of (bin_size / total) * |accuracy - confidence|.
/// `total` counts every sample, binned or not.
pub fn expected_calibration_error(probs: &ClassMatrix, labels: &[usize], num_bins: usize) -> f64 {
    let n = probs.len().min(labels.len());
    if n == 0 {
        return 0.0;
    }
    reliability_bins(probs, labels, num_bins)
        .iter()
        .map(|b| (b.count as f64 / n as f64) * (b.accuracy - b.confidence).abs())
        .sum()
}

/// Raw vs. temperature-calibrated accuracy and ECE.
pub fn report(probs: &ClassMatrix, labels: &[usize], tau: f64, num_bins: usize) -> MetricsReport {
    let calibrated = calibrated_probabilities(probs, tau);
    MetricsReport {
        samples: probs.len(),
        tau,
        raw_accuracy: top1_accuracy(probs, labels),
        calibrated_accuracy: top1_accuracy(&calibrated, labels),
        raw_ece: expected_calibration_error(probs, labels, num_bins),
        calibrated_ece: expected_calibration_error(&calibrated, labels, num_bins),
    }
}
