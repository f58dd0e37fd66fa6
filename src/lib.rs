//! Offline post-calibration for a 7-class emotion classifier.
//!
//! Fits a scalar temperature and per-class additive logit bias, globally and
//! per group, from predicted probabilities plus ground-truth labels, and
//! merges them into the calibration artifact read by the inference server.

pub mod calibration;
pub mod config;
pub mod dataset;
pub mod emotion;
pub mod errors;
pub mod models;
pub mod pipeline;

pub use calibration::artifact::{merge, ArtifactUpdate, CalibrationArtifact, Document};
pub use calibration::SetFit;
pub use emotion::{ClassValues, ClassVec, Emotion, NUM_CLASSES};
pub use errors::{CalibrationError, CalibrationResult};
pub use pipeline::{run, RunReport};
