use crate::calibration::artifact::{load_prior, merge, write_document, ArtifactUpdate, Document};
use crate::calibration::groups::{fit_groups, GroupResults};
use crate::calibration::metrics::{report, MetricsReport};
use crate::calibration::SetFit;
use crate::config::AppConfig;
use crate::dataset::{load_table, SampleSet};
use crate::errors::CalibrationResult;
use std::path::PathBuf;

/// Below this many valid rows the fit is reported as unreliable.
pub const MIN_RELIABLE_ROWS: usize = 50;

/// Everything one fitting run produced, for printing and inspection.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub group_column: Option<String>,
    pub global: SetFit,
    pub groups: GroupResults,
    pub metrics: MetricsReport,
    pub out_path: PathBuf,
    pub document: Document,
}

/// Fit results for one sample set, before anything is persisted.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub global: SetFit,
    pub groups: GroupResults,
    pub metrics: MetricsReport,
}

/// Global fit, optional per-group fits, and before/after metrics.
/// No I/O.
pub fn fit_all(samples: &SampleSet, fit_by_group: bool, min_group_size: usize, ece_bins: usize) -> FitOutcome {
    let global = SetFit::fit(samples);
    tracing::info!(
        samples = global.samples,
        tau = global.temperature.tau,
        nll = global.temperature.nll,
        baseline_nll = global.temperature.baseline_nll,
        "global temperature fitted"
    );
    tracing::info!(bias = %global.bias, "global bias estimated");

    let groups = if fit_by_group {
        fit_groups(samples, min_group_size)
    } else {
        GroupResults::default()
    };

    // Metrics use the global temperature only.
    let metrics = report(
        &samples.probabilities(),
        &samples.labels(),
        global.temperature.tau,
        ece_bins,
    );

    FitOutcome { global, groups, metrics }
}

/// Read the table, fit, merge into the prior artifact, write the result.
pub fn run(cfg: &AppConfig) -> CalibrationResult<RunReport> {
    let group_column = cfg.group_column.as_deref();
    let load = load_table(&cfg.csv_path, group_column)?;
    let valid_rows = load.samples.len();
    tracing::info!(
        path = %cfg.csv_path.display(),
        total_rows = load.total_rows,
        valid_rows,
        "input table loaded"
    );

    if valid_rows < MIN_RELIABLE_ROWS {
        tracing::warn!(valid_rows, "only {valid_rows} valid rows; results may be noisy");
    }
    if let Some(col) = group_column {
        if !load.group_column_found {
            tracing::warn!(column = col, "group column not found in table, fitting global only");
        }
    }

    let outcome = fit_all(
        &load.samples,
        load.group_column_found,
        cfg.min_group_size,
        cfg.ece_bins,
    );

    let prior = load_prior(cfg.prior_path.as_deref());
    let update = ArtifactUpdate::from_fits(&outcome.global, &outcome.groups);
    let document = merge(&prior, &update);
    write_document(&cfg.out_path, &document)?;

    Ok(RunReport {
        total_rows: load.total_rows,
        valid_rows,
        group_column: cfg.group_column.clone().filter(|_| load.group_column_found),
        global: outcome.global,
        groups: outcome.groups,
        metrics: outcome.metrics,
        out_path: cfg.out_path.clone(),
        document,
    })
}
