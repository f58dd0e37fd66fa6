use crate::emotion::{ClassVec, NUM_CLASSES};
use statrs::statistics::Statistics;

/// Dense row-major matrix with exactly `NUM_CLASSES` columns.
/// One row per sample; column `i` is `Emotion::ALL[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassMatrix {
    rows: Vec<ClassVec>,
}

impl ClassMatrix {
    pub fn from_rows(rows: Vec<ClassVec>) -> Self {
        Self { rows }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn rows(&self) -> &[ClassVec] {
        &self.rows
    }

    #[inline]
    pub fn row(&self, i: usize) -> &ClassVec {
        &self.rows[i]
    }

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut out = *r;
                for v in out.iter_mut() {
                    *v = f(*v);
                }
                out
            })
            .collect();
        Self { rows }
    }

    /// Apply `f` to every row.
    pub fn map_rows(&self, f: impl Fn(&ClassVec) -> ClassVec) -> Self {
        Self {
            rows: self.rows.iter().map(f).collect(),
        }
    }

    /// Elementwise division by a scalar.
    #[inline]
    pub fn div_scalar(&self, divisor: f64) -> Self {
        self.map(|v| v / divisor)
    }

    /// Elementwise clip into `[lo, hi]`.
    #[inline]
    pub fn clip(&self, lo: f64, hi: f64) -> Self {
        self.map(|v| v.clamp(lo, hi))
    }

    pub fn row_max(&self) -> Vec<f64> {
        self.rows.iter().map(max_of).collect()
    }

    /// Index of the first maximum in each row.
    pub fn row_argmax(&self) -> Vec<usize> {
        self.rows.iter().map(argmax).collect()
    }

    /// Mean of one column. NaN for an empty matrix.
    pub fn column_mean(&self, col: usize) -> f64 {
        self.rows.iter().map(|r| r[col]).mean()
    }

    pub fn column_means(&self) -> ClassVec {
        let mut out = [0.0; NUM_CLASSES];
        for (c, v) in out.iter_mut().enumerate() {
            *v = self.column_mean(c);
        }
        out
    }
}

#[inline]
pub fn max_of(row: &ClassVec) -> f64 {
    row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// First index of the maximum value. Ties resolve to the lowest index.
#[inline]
pub fn argmax(row: &ClassVec) -> usize {
    let mut best = 0;
    for i in 1..NUM_CLASSES {
        if row[i] > row[best] {
            best = i;
        }
    }
    best
}
