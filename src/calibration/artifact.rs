//! Calibration artifact document.
//!
//! Shape, as read by the inference server:
//!
//! ```json
//! {
//!   "default":      { "neutral": tau, ..., "surprised": tau },
//!   "none:<group>": { "neutral": tau_g, ... },
//!   "bias_add":     { "global": { "neutral": b, ... }, "<group>": { ... } },
//!   "bias_mult":    <opaque, never touched>
//! }
//! ```
//!
//! Merging is a pure function of (prior document, new results). Keys not
//! written by this run survive unchanged, so group entries accumulate across
//! runs over different datasets.

use crate::calibration::groups::GroupResults;
use crate::calibration::SetFit;
use crate::emotion::{ClassValues, ClassVec, NUM_CLASSES};
use crate::errors::{CalibrationError, CalibrationResult};
use crate::models::codec::logit;
use crate::models::likelihood::softmax_row;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

pub type Document = Map<String, Value>;

pub const DEFAULT_KEY: &str = "default";
pub const GROUP_KEY_PREFIX: &str = "none:";
pub const BIAS_ADD_KEY: &str = "bias_add";
pub const GLOBAL_BIAS_KEY: &str = "global";

#[inline]
pub fn group_key(group: &str) -> String {
    format!("{GROUP_KEY_PREFIX}{group}")
}

/// New values produced by one fitting run.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactUpdate {
    pub global_tau: f64,
    pub global_bias: ClassValues,
    pub group_taus: BTreeMap<String, f64>,
    pub group_biases: BTreeMap<String, ClassValues>,
}

impl ArtifactUpdate {
    pub fn from_fits(global: &SetFit, groups: &GroupResults) -> Self {
        Self {
            global_tau: global.temperature.tau,
            global_bias: global.bias,
            group_taus: groups
                .fitted
                .iter()
                .map(|(g, f)| (g.clone(), f.temperature.tau))
                .collect(),
            group_biases: groups
                .fitted
                .iter()
                .map(|(g, f)| (g.clone(), f.bias))
                .collect(),
        }
    }
}

/// Combine a prior document with new results.
///
/// `default` is always overwritten; `none:<group>` and `bias_add.<group>` are
/// set for every group in `update`; `bias_add.global` is overwritten. All
/// other keys, at the top level and under `bias_add`, are carried over as is.
pub fn merge(prior: &Document, update: &ArtifactUpdate) -> Document {
    let mut doc = prior.clone();

    doc.insert(
        DEFAULT_KEY.to_string(),
        ClassValues::uniform(update.global_tau).to_json(),
    );
    for (group, &tau) in &update.group_taus {
        doc.insert(group_key(group), ClassValues::uniform(tau).to_json());
    }

    // Updated in place within the copy so the key keeps its position.
    let slot = doc
        .entry(BIAS_ADD_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        tracing::warn!(found = %slot, "prior bias_add is not an object, replacing it");
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(bias_add) = slot {
        bias_add.insert(GLOBAL_BIAS_KEY.to_string(), update.global_bias.to_json());
        for (group, bias) in &update.group_biases {
            bias_add.insert(group.clone(), bias.to_json());
        }
    }

    doc
}

/// Load the prior document for a merge.
///
/// Never fails: a missing path, unreadable file, or unparsable content all
/// yield an empty document (the latter two with a warning).
pub fn load_prior(path: Option<&Path>) -> Document {
    let Some(path) = path else {
        return Document::new();
    };
    if !path.exists() {
        tracing::info!(path = %path.display(), "no prior calibration, starting fresh");
        return Document::new();
    }
    match read_document(path) {
        Ok(doc) => {
            tracing::info!(path = %path.display(), keys = doc.len(), "loaded prior calibration");
            doc
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse existing calibration, starting fresh");
            Document::new()
        }
    }
}

/// Strict read of an artifact document.
pub fn read_document(path: &Path) -> CalibrationResult<Document> {
    let content = std::fs::read_to_string(path).map_err(|e| CalibrationError::io(path, e))?;
    parse_document(&content)
}

pub fn parse_document(content: &str) -> CalibrationResult<Document> {
    match serde_json::from_str::<Value>(content)? {
        Value::Object(m) => Ok(m),
        other => Err(CalibrationError::Parse(format!(
            "calibration document must be a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

/// Serialise with 2-space indentation and write once.
pub fn write_document(path: &Path, doc: &Document) -> CalibrationResult<()> {
    let body = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, body).map_err(|e| CalibrationError::io(path, e))?;
    tracing::info!(path = %path.display(), keys = doc.len(), "calibration written");
    Ok(())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read-side view of an artifact for previewing a fit locally. Lookups
/// try the group entry, then the global one, then identity.
#[derive(Debug, Clone, Default)]
pub struct CalibrationArtifact {
    doc: Document,
}

impl CalibrationArtifact {
    pub fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    pub fn load(path: &Path) -> CalibrationResult<Self> {
        read_document(path).map(Self::from_document)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Per-class temperatures: `none:<group>`, else `default`, else 1.
    pub fn temperatures(&self, group: Option<&str>) -> ClassValues {
        group
            .and_then(|g| self.doc.get(&group_key(g)))
            .or_else(|| self.doc.get(DEFAULT_KEY))
            .and_then(|v| ClassValues::from_json(v, 1.0))
            .unwrap_or(ClassValues::uniform(1.0))
    }

    /// Per-class additive bias: `bias_add.<group>`, else `bias_add.global`, else 0.
    pub fn bias(&self, group: Option<&str>) -> ClassValues {
        let Some(table) = self.doc.get(BIAS_ADD_KEY).and_then(Value::as_object) else {
            return ClassValues::uniform(0.0);
        };
        group
            .and_then(|g| table.get(g))
            .or_else(|| table.get(GLOBAL_BIAS_KEY))
            .and_then(|v| ClassValues::from_json(v, 0.0))
            .unwrap_or(ClassValues::uniform(0.0))
    }

    /// Calibrated distribution for one probability vector:
    /// softmax((logit(p) + bias) / tau), per class.
    pub fn calibrate(&self, probs: &ClassVec, group: Option<&str>) -> ClassVec {
        let tau = self.temperatures(group);
        let bias = self.bias(group);
        let mut z = [0.0; NUM_CLASSES];
        for c in 0..NUM_CLASSES {
            // a non-positive temperature would flip or blow up the logits
            let t = if tau.0[c] > 0.0 { tau.0[c] } else { 1.0 };
            z[c] = (logit(probs[c]) + bias.0[c]) / t;
        }
        softmax_row(&z)
    }
}
