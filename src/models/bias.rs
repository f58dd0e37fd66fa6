//! Per-class additive logit bias from prevalence margins.
//!
//! bias_e = logit(freq_e) - logit(meanPred_e)
//!
//! where freq_e is the fraction of samples labelled e and meanPred_e the
//! mean predicted probability of e. Both are clipped to (1e-6, 1 - 1e-6)
//! before the logit. Adding bias_e to class e's logit moves its long-run
//! predicted rate onto its observed rate.
use crate::emotion::{ClassValues, NUM_CLASSES};
use crate::models::codec::frequency_logit;
use crate::models::matrix::ClassMatrix;

/// Persisted biases keep this many decimals.
const BIAS_DECIMALS: i32 = 3;

/// Round half to even, matching the rounding used by the serving side.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Fraction of samples carrying each label. All zero for an empty set.
pub fn label_frequencies(labels: &[usize]) -> [f64; NUM_CLASSES] {
    let mut counts = [0usize; NUM_CLASSES];
    for &y in labels {
        if y < NUM_CLASSES {
            counts[y] += 1;
        }
    }
    let n = labels.len();
    let mut out = [0.0; NUM_CLASSES];
    if n == 0 {
        return out;
    }
    for (f, c) in out.iter_mut().zip(counts) {
        *f = c as f64 / n as f64;
    }
    out
}

/// Estimate the rounded per-class bias for one sample set.
///
/// An empty set carries no prevalence information and yields zero bias.
pub fn estimate_bias(probs: &ClassMatrix, labels: &[usize]) -> ClassValues {
    if probs.is_empty() || labels.is_empty() {
        return ClassValues::uniform(0.0);
    }

    let freq = label_frequencies(labels);
    let mean_pred = probs.column_means();

    let mut bias = [0.0; NUM_CLASSES];
    for c in 0..NUM_CLASSES {
        let raw = frequency_logit(freq[c]) - frequency_logit(mean_pred[c]);
        bias[c] = round_to(raw, BIAS_DECIMALS);
    }
    ClassValues(bias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;
    use crate::models::codec::logit;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_to(1.2344, 3), 1.234);
        assert_eq!(round_to(-0.0006, 3), -0.001);
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(3.5, 0), 4.0);
    }

    #[test]
    fn test_matched_prevalence_gives_zero_bias() {
        // Each class labelled once, each predicted with uniform mass.
        let probs = ClassMatrix::from_rows(vec![[1.0 / 7.0; 7]; 7]);
        let labels: Vec<usize> = (0..7).collect();
        let b = estimate_bias(&probs, &labels);
        for e in Emotion::ALL {
            assert_eq!(b.get(e), 0.0, "{e} should need no correction");
        }
    }

    #[test]
    fn test_underpredicted_class_gets_positive_bias() {
        // Half the samples are happy but happy is predicted at 0.25 on average.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let mut p = [0.125; 7];
            p[Emotion::Happy.index()] = 0.25;
            rows.push(p);
            labels.push(if i % 2 == 0 { Emotion::Happy.index() } else { Emotion::Sad.index() });
        }
        let b = estimate_bias(&ClassMatrix::from_rows(rows), &labels);
        let expected = round_to(logit(0.5) - logit(0.25), 3);
        assert_eq!(b.get(Emotion::Happy), expected);
        assert!(b.get(Emotion::Happy) > 0.0);
        assert!(b.get(Emotion::Neutral) < 0.0, "never-seen class should be pushed down");
    }

    #[test]
    fn test_absent_class_uses_frequency_clip() {
        let probs = ClassMatrix::from_rows(vec![[0.5; 7]; 4]);
        let b = estimate_bias(&probs, &[0, 0, 0, 0]);
        // freq=0 is clipped to 1e-6 rather than producing -inf
        let expected = round_to(frequency_logit(0.0) - frequency_logit(0.5), 3);
        assert_eq!(b.get(Emotion::Surprised), expected);
        assert!(b.get(Emotion::Surprised).is_finite());
    }

    #[test]
    fn test_empty_set_zero_bias() {
        assert_eq!(estimate_bias(&ClassMatrix::default(), &[]), ClassValues::uniform(0.0));
    }
}
