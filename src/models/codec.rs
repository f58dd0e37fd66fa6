//! Probability <-> logit conversion.
//!
//! logit(p) = ln(p / (1 - p))
//!
//! Every input is clipped into (eps, 1 - eps) first so the transform is
//! total: no infinities, no NaN for inputs in [0, 1].
use crate::emotion::ClassVec;
use crate::models::matrix::ClassMatrix;

/// Clip bound for per-sample probabilities.
pub const PROB_EPS: f64 = 1e-8;

/// Clip bound for label frequencies and mean predictions.
pub const FREQ_EPS: f64 = 1e-6;

#[inline]
pub fn clip_probability(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

#[inline]
pub fn clip_frequency(p: f64) -> f64 {
    p.clamp(FREQ_EPS, 1.0 - FREQ_EPS)
}

/// Raw logit, no clipping. Callers clip.
#[inline]
fn logit_unclipped(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

#[inline]
pub fn logit(p: f64) -> f64 {
    logit_unclipped(clip_probability(p))
}

/// Logit with the wider frequency bound, used by bias estimation.
#[inline]
pub fn frequency_logit(p: f64) -> f64 {
    logit_unclipped(clip_frequency(p))
}

#[inline]
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub fn to_logit_row(p: &ClassVec) -> ClassVec {
    let mut out = *p;
    for v in out.iter_mut() {
        *v = logit(*v);
    }
    out
}

/// Elementwise clipped logit of a probability matrix.
pub fn to_logit(probs: &ClassMatrix) -> ClassMatrix {
    probs
        .clip(PROB_EPS, 1.0 - PROB_EPS)
        .map(logit_unclipped)
}
