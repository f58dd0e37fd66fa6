//! Input table: one row per classified image.
//!
//! Columns: `path`, `y_true`, `face_found`, `p_<emotion>` for each class,
//! and optionally a grouping column. Rows are retained only when
//! `face_found == 1` and `y_true` is one of the seven labels; everything else
//! is dropped without a per-row diagnostic.

use crate::emotion::{ClassVec, Emotion, NUM_CLASSES};
use crate::errors::{CalibrationError, CalibrationResult};
use crate::models::codec::to_logit;
use crate::models::matrix::ClassMatrix;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Group value used when the grouping cell is missing or blank.
pub const UNKNOWN_GROUP: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub path: String,
    pub label: Emotion,
    pub group: String,
    pub face_found: bool,
    pub probabilities: ClassVec,
}

/// The retained, immutable sample set.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn probabilities(&self) -> ClassMatrix {
        ClassMatrix::from_rows(self.samples.iter().map(|s| s.probabilities).collect())
    }

    pub fn logits(&self) -> ClassMatrix {
        to_logit(&self.probabilities())
    }

    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label.index()).collect()
    }

    /// Subset holding the samples at `indices`.
    pub fn subset(&self, indices: &[usize]) -> SampleSet {
        SampleSet::new(indices.iter().map(|&i| self.samples[i].clone()).collect())
    }
}

/// Outcome of reading the input table.
#[derive(Debug, Clone)]
pub struct TableLoad {
    pub samples: SampleSet,
    /// Data rows in the file, before filtering
    pub total_rows: usize,
    /// Whether the requested grouping column exists in the header
    pub group_column_found: bool,
}

/// Column positions resolved from the header row.
struct Columns {
    path: usize,
    label: usize,
    face_found: usize,
    probs: [usize; NUM_CLASSES],
    group: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, group_column: Option<&str>) -> CalibrationResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| CalibrationError::Table(format!("missing column: {name}")))
        };

        let mut probs = [0usize; NUM_CLASSES];
        for e in Emotion::ALL {
            probs[e.index()] = require(&e.column_name())?;
        }

        Ok(Self {
            path: require("path")?,
            label: require("y_true")?,
            face_found: require("face_found")?,
            probs,
            group: group_column.and_then(find),
        })
    }
}

pub fn load_table(path: &Path, group_column: Option<&str>) -> CalibrationResult<TableLoad> {
    let file = std::fs::File::open(path).map_err(|e| CalibrationError::io(path, e))?;
    read_table(file, group_column)
}

/// Read and filter a table from any reader.
pub fn read_table<R: Read>(reader: R, group_column: Option<&str>) -> CalibrationResult<TableLoad> {
    // Short rows read as blank cells; rows that are dropped anyway never fail.
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let cols = Columns::resolve(&headers, group_column)?;

    let mut samples = Vec::new();
    let mut total_rows = 0usize;

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        total_rows += 1;
        // Text cells match exactly; numeric cells tolerate padding.
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let number = |idx: usize| field(idx).trim();

        if !is_face_found(number(cols.face_found)) {
            continue;
        }
        let Some(label) = Emotion::from_label(field(cols.label)) else {
            continue;
        };

        let mut probabilities = [0.0; NUM_CLASSES];
        for e in Emotion::ALL {
            let raw = number(cols.probs[e.index()]);
            probabilities[e.index()] = raw.parse::<f64>().map_err(|_| {
                // header is row 1
                CalibrationError::Table(format!(
                    "row {}: invalid {} value {raw:?}",
                    i + 2,
                    e.column_name()
                ))
            })?;
        }

        let group = cols
            .group
            .map(field)
            .filter(|g| !g.is_empty())
            .unwrap_or(UNKNOWN_GROUP)
            .to_string();

        samples.push(Sample {
            path: field(cols.path).to_string(),
            label,
            group,
            face_found: true,
            probabilities,
        });
    }

    tracing::debug!(total_rows, retained = samples.len(), "input table read");

    Ok(TableLoad {
        samples: SampleSet::new(samples),
        total_rows,
        group_column_found: cols.group.is_some(),
    })
}

#[inline]
fn is_face_found(raw: &str) -> bool {
    raw.parse::<f64>().map(|v| v == 1.0).unwrap_or(false)
}

/// Bucket item indices by a string key, keys in lexicographic order.
/// Indices within a bucket keep their input order.
pub fn partition_by<T>(items: &[T], key: impl Fn(&T) -> &str) -> BTreeMap<String, Vec<usize>> {
    let mut parts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, item) in items.iter().enumerate() {
        parts.entry(key(item).to_string()).or_default().push(i);
    }
    parts
}

/// Partition samples by their group value.
pub fn partition_by_group(samples: &SampleSet) -> BTreeMap<String, Vec<usize>> {
    partition_by(samples.samples(), |s| s.group.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "path,y_true,gender,face_found,p_neutral,p_happy,p_sad,p_angry,p_fearful,p_disgusted,p_surprised";

    fn table(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for r in rows {
            s.push('\n');
            s.push_str(r);
        }
        s
    }

    #[test]
    fn test_retention_filter() {
        let csv = table(&[
            "a.jpg,happy,female,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1",
            "b.jpg,happy,male,0,0.1,0.4,0.1,0.1,0.1,0.1,0.1",
            "c.jpg,contempt,male,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1",
            "d.jpg,sad,,1.0,0.1,0.1,0.4,0.1,0.1,0.1,0.1",
            "e.jpg,Sad,male,1,0.1,0.1,0.4,0.1,0.1,0.1,0.1",
        ]);
        let load = read_table(csv.as_bytes(), Some("gender")).unwrap();
        assert_eq!(load.total_rows, 5);
        assert_eq!(load.samples.len(), 2, "only face_found=1 rows with known labels survive");
        let s = &load.samples.samples()[0];
        assert_eq!(s.path, "a.jpg");
        assert_eq!(s.label, Emotion::Happy);
        assert_eq!(s.group, "female");
        assert_eq!(s.probabilities[Emotion::Happy.index()], 0.4);
        assert_eq!(load.samples.samples()[1].group, UNKNOWN_GROUP, "blank group becomes unknown");
        assert!(load.group_column_found);
    }

    #[test]
    fn test_missing_group_column_is_not_fatal() {
        let csv = table(&["a.jpg,happy,female,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1"]);
        let load = read_table(csv.as_bytes(), Some("age")).unwrap();
        assert!(!load.group_column_found);
        assert_eq!(load.samples.samples()[0].group, UNKNOWN_GROUP);
    }

    #[test]
    fn test_missing_probability_column_is_fatal() {
        let csv = "path,y_true,face_found,p_neutral\na.jpg,happy,1,0.2";
        let err = read_table(csv.as_bytes(), None).unwrap_err();
        assert!(err.to_string().contains("p_happy"), "should name the column: {err}");
    }

    #[test]
    fn test_bad_probability_names_row() {
        let csv = table(&[
            "a.jpg,happy,female,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1",
            "b.jpg,happy,female,1,0.1,zzz,0.1,0.1,0.1,0.1,0.1",
        ]);
        let err = read_table(csv.as_bytes(), None).unwrap_err();
        assert!(matches!(err, CalibrationError::Table(_)));
        assert!(err.to_string().contains("row 3"), "{err}");
    }

    #[test]
    fn test_dropped_rows_skip_probability_parsing() {
        let csv = table(&["a.jpg,happy,female,0,,,,,,,"]);
        let load = read_table(csv.as_bytes(), None).unwrap();
        assert!(load.samples.is_empty());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = table(&[
            "a.jpg,happy,female,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1",
            "b.jpg,sad,male,1,0.1,0.1,0.4,0.1,0.1,0.1,0.1",
            "x.jpg,happy,f,0",
        ]);
        let load = read_table(csv.as_bytes(), Some("gender")).unwrap();
        assert_eq!(load.total_rows, 3);
        assert_eq!(load.samples.len(), 2, "short face_found=0 row is dropped, not fatal");

        let kept_short = table(&["c.jpg,happy,,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1", "d.jpg,happy"]);
        let load = read_table(kept_short.as_bytes(), Some("gender")).unwrap();
        assert_eq!(load.samples.len(), 1, "missing face_found cell reads as not found");
    }

    #[test]
    fn test_text_cells_match_exactly() {
        let csv = table(&[
            "a.jpg, happy,male,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1",
            "b.jpg,happy, male, 1 , 0.1,0.4,0.1,0.1,0.1,0.1,0.1",
            "c.jpg,happy,male,1,0.1,0.4,0.1,0.1,0.1,0.1,0.1",
        ]);
        let load = read_table(csv.as_bytes(), Some("gender")).unwrap();
        assert_eq!(load.samples.len(), 2, "padded label is not a known emotion");
        let groups: Vec<&str> = load.samples.samples().iter().map(|s| s.group.as_str()).collect();
        assert_eq!(groups, [" male", "male"]);
    }

    #[test]
    fn test_partition_is_lexicographic_and_stable() {
        let items = ["m", "f", "unknown", "f", "m", "f"];
        let parts = partition_by(&items, |s| *s);
        let keys: Vec<&str> = parts.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["f", "m", "unknown"]);
        assert_eq!(parts["f"], vec![1, 3, 5]);
    }

    #[test]
    fn test_sample_set_views() {
        let csv = table(&[
            "a.jpg,angry,x,1,0.1,0.1,0.1,0.4,0.1,0.1,0.1",
            "b.jpg,neutral,y,1,0.4,0.1,0.1,0.1,0.1,0.1,0.1",
        ]);
        let set = read_table(csv.as_bytes(), Some("gender")).unwrap().samples;
        assert_eq!(set.labels(), vec![Emotion::Angry.index(), Emotion::Neutral.index()]);
        assert_eq!(set.probabilities().len(), 2);
        let sub = set.subset(&[1]);
        assert_eq!(sub.samples()[0].group, "y");
        let parts = partition_by_group(&set);
        assert_eq!(parts.len(), 2);
    }
}
