use crate::emotion::ClassVec;
use crate::models::matrix::{max_of, ClassMatrix};

/// Softmax denominators are floored here.
const SUM_FLOOR: f64 = 1e-12;

/// Gathered true-class probabilities are floored here before the log.
const PROB_FLOOR: f64 = 1e-12;

/// Numerically stable softmax of one row: subtract the row max,
/// exponentiate, normalise.
pub fn softmax_row(logits: &ClassVec) -> ClassVec {
    let m = max_of(logits);
    let mut out = *logits;
    let mut sum = 0.0;
    for v in out.iter_mut() {
        *v = (*v - m).exp();
        sum += *v;
    }
    let denom = sum.max(SUM_FLOOR);
    for v in out.iter_mut() {
        *v /= denom;
    }
    out
}

pub fn softmax(logits: &ClassMatrix) -> ClassMatrix {
    logits.map_rows(softmax_row)
}

/// Mean negative log-likelihood of the true classes under softmax(logits).
///
/// `labels[i]` is the class index of row `i`. Returns 0.0 for an empty set.
pub fn neg_log_likelihood(logits: &ClassMatrix, labels: &[usize]) -> f64 {
    debug_assert_eq!(logits.len(), labels.len());
    let n = logits.len().min(labels.len());
    if n == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for (row, &y) in logits.rows().iter().zip(labels) {
        let p = softmax_row(row);
        total += p[y].max(PROB_FLOOR).ln();
    }
    -total / n as f64
}

/// NLL of `logits / tau`. Scaling is done row by row, no copy of the matrix.
pub fn scaled_neg_log_likelihood(logits: &ClassMatrix, labels: &[usize], tau: f64) -> f64 {
    let n = logits.len().min(labels.len());
    if n == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for (row, &y) in logits.rows().iter().zip(labels) {
        let mut scaled = *row;
        for v in scaled.iter_mut() {
            *v /= tau;
        }
        total += softmax_row(&scaled)[y].max(PROB_FLOOR).ln();
    }
    -total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::codec::to_logit_row;

    #[test]
    fn test_softmax_sums_to_one_and_is_stable() {
        let p = softmax_row(&[1000.0, 999.0, 0.0, -5.0, 3.0, 2.0, 1.0]);
        let s: f64 = p.iter().sum();
        assert!((s - 1.0).abs() < 1e-12, "softmax should sum to 1: {s}");
        assert!(p.iter().all(|v| v.is_finite()), "large logits must not overflow");
        assert!(p[0] > p[1]);
    }

    #[test]
    fn test_softmax_of_log_probs_reproduces_distribution() {
        let p: [f64; 7] = [0.4, 0.2, 0.1, 0.1, 0.1, 0.05, 0.05];
        let mut logs = p;
        for v in logs.iter_mut() {
            *v = v.ln();
        }
        let back = softmax_row(&logs);
        for i in 0..7 {
            assert!((back[i] - p[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_softmax_of_logits_preserves_ranking() {
        // Per-class logits are not log-probabilities, so softmax(logit(p))
        // sharpens p, but class ranking is kept.
        let p = [0.05, 0.6, 0.1, 0.05, 0.1, 0.05, 0.05];
        let q = softmax_row(&to_logit_row(&p));
        assert!(q[1] > p[1], "per-class logits sharpen the top class");
        assert_eq!(crate::models::matrix::argmax(&q), 1);
        let uniform = softmax_row(&to_logit_row(&[1.0 / 7.0; 7]));
        for v in uniform {
            assert!((v - 1.0 / 7.0).abs() < 1e-12, "uniform input survives the round trip");
        }
    }

    #[test]
    fn test_nll_known_value() {
        let logits = ClassMatrix::from_rows(vec![[0.0; 7], [0.0; 7]]);
        let nll = neg_log_likelihood(&logits, &[0, 3]);
        assert!((nll - (7.0f64).ln()).abs() < 1e-12, "uniform NLL should be ln 7: {nll}");
        assert_eq!(neg_log_likelihood(&ClassMatrix::default(), &[]), 0.0);
    }

    #[test]
    fn test_scaled_nll_matches_divided_matrix() {
        let logits = ClassMatrix::from_rows(vec![
            [2.0, -1.0, 0.5, 0.0, -2.0, 1.0, 0.3],
            [-0.5, 3.0, 0.0, 0.1, 0.2, -1.0, 0.0],
        ]);
        let labels = [0, 2];
        let a = scaled_neg_log_likelihood(&logits, &labels, 1.3);
        let b = neg_log_likelihood(&logits.div_scalar(1.3), &labels);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_nll_floors_vanishing_probability() {
        let logits = ClassMatrix::from_rows(vec![[0.0, -1e6, 0.0, 0.0, 0.0, 0.0, 0.0]]);
        let nll = neg_log_likelihood(&logits, &[1]);
        assert!((nll + PROB_FLOOR.ln()).abs() < 1e-9, "floored NLL should be -ln(1e-12): {nll}");
    }
}
