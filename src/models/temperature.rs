//! Scalar temperature fit.
//!
//! Minimises NLL(logits / tau, labels) with a bounded two-phase search:
//!   1. coarse scan of 25 evenly spaced tau in [0.7, 1.3]
//!   2. up to 40 rounds of 3-point pattern search around the best tau,
//!      step starting at 0.02 and decaying by 0.7, clamped to [0.5, 2.0],
//!      stopping once step < 5e-4.
//!
//! Purely evaluative and bounded, so it always terminates. The exact
//! constants are part of the output contract: fitted artifacts must be
//! reproducible across runs.
use crate::models::likelihood::scaled_neg_log_likelihood;
use crate::models::matrix::ClassMatrix;

pub const TAU_MIN: f64 = 0.5;
pub const TAU_MAX: f64 = 2.0;

const SCAN_LO: f64 = 0.7;
const SCAN_HI: f64 = 1.3;
const SCAN_POINTS: usize = 25;

const REFINE_MAX_ITERS: usize = 40;
const REFINE_INITIAL_STEP: f64 = 0.02;
const REFINE_DECAY: f64 = 0.7;
const REFINE_MIN_STEP: f64 = 5e-4;

/// Result of a temperature fit. Stack-allocated.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TemperatureFit {
    pub tau: f64,
    /// NLL at the returned `tau`
    pub nll: f64,
    /// NLL with no scaling (tau = 1), for comparison
    pub baseline_nll: f64,
}

/// `n` evenly spaced points from `start` to `stop` inclusive.
/// Computed as `start + i * step` with the last point pinned to `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + i as f64 * step })
                .collect()
        }
    }
}

/// Fit a scalar temperature for one sample set.
///
/// Empty input returns tau = 1 with zero loss.
pub fn fit_temperature(logits: &ClassMatrix, labels: &[usize]) -> TemperatureFit {
    if logits.is_empty() || labels.is_empty() {
        return TemperatureFit { tau: 1.0, nll: 0.0, baseline_nll: 0.0 };
    }

    let loss = |tau: f64| scaled_neg_log_likelihood(logits, labels, tau);

    // Coarse scan: strict `<` keeps the first minimiser.
    let mut best_tau = 1.0;
    let mut best_nll = f64::INFINITY;
    for t in linspace(SCAN_LO, SCAN_HI, SCAN_POINTS) {
        let nll = loss(t);
        if nll < best_nll {
            best_tau = t;
            best_nll = nll;
        }
    }

    // Local refine
    let mut step = REFINE_INITIAL_STEP;
    for _ in 0..REFINE_MAX_ITERS {
        let candidates = [best_tau - step, best_tau, best_tau + step];
        let mut arg = 0;
        let mut arg_nll = loss(candidates[0]);
        for (i, &c) in candidates.iter().enumerate().skip(1) {
            let nll = loss(c);
            if nll < arg_nll {
                arg = i;
                arg_nll = nll;
            }
        }
        best_tau = candidates[arg].clamp(TAU_MIN, TAU_MAX);
        step *= REFINE_DECAY;
        if step < REFINE_MIN_STEP {
            break;
        }
    }

    TemperatureFit {
        tau: best_tau,
        nll: loss(best_tau),
        baseline_nll: loss(1.0),
    }
}

/// Apply a fitted temperature to logits.
#[inline]
pub fn scale_logits(logits: &ClassMatrix, tau: f64) -> ClassMatrix {
    logits.div_scalar(tau)
}
