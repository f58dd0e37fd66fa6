use crate::errors::{CalibrationError, CalibrationResult};
use std::path::PathBuf;

/// Minimum number of samples a group partition needs for its own fit.
pub const DEFAULT_MIN_GROUP_SIZE: usize = 50;

/// Number of equal-width confidence bins used for ECE.
pub const DEFAULT_ECE_BINS: usize = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub csv_path: PathBuf,
    pub out_path: PathBuf,
    pub group_column: Option<String>,
    pub prior_path: Option<PathBuf>,
    pub min_group_size: usize,
    pub ece_bins: usize,
}

impl AppConfig {
    /// Paths come from the command line; tunables from the environment
    /// (`.env` is loaded by `main` before this runs).
    pub fn from_env(
        csv_path: PathBuf,
        out_path: PathBuf,
        group_column: Option<String>,
        prior_path: Option<PathBuf>,
    ) -> CalibrationResult<Self> {
        let min_group_size = parse_count(
            "CALIB_MIN_GROUP_SIZE",
            &env_var_or("CALIB_MIN_GROUP_SIZE", &DEFAULT_MIN_GROUP_SIZE.to_string()),
        )?;
        let ece_bins = parse_count(
            "CALIB_ECE_BINS",
            &env_var_or("CALIB_ECE_BINS", &DEFAULT_ECE_BINS.to_string()),
        )?;

        Ok(Self {
            csv_path,
            out_path,
            group_column: group_column.filter(|g| !g.trim().is_empty()),
            prior_path,
            min_group_size,
            ece_bins,
        })
    }

    pub fn with_defaults(csv_path: PathBuf, out_path: PathBuf) -> Self {
        Self {
            csv_path,
            out_path,
            group_column: None,
            prior_path: None,
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            ece_bins: DEFAULT_ECE_BINS,
        }
    }
}

fn parse_count(key: &str, raw: &str) -> CalibrationResult<usize> {
    let n = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| CalibrationError::Config(format!("{key}: {e}")))?;
    if n == 0 {
        return Err(CalibrationError::Config(format!("{key}: must be at least 1")));
    }
    Ok(n)
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_accepts_positive() {
        assert_eq!(parse_count("X", " 50 ").unwrap(), 50);
    }

    #[test]
    fn test_parse_count_rejects_zero_and_garbage() {
        assert!(matches!(parse_count("X", "0"), Err(CalibrationError::Config(_))));
        let err = parse_count("CALIB_ECE_BINS", "ten").unwrap_err();
        assert!(err.to_string().contains("CALIB_ECE_BINS"), "should name the variable: {err}");
    }

    #[test]
    fn test_existing_output_is_not_a_prior() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("calibration-temp.json");
        std::fs::write(&out, "{}").unwrap();
        let cfg = AppConfig::from_env(dir.path().join("in.csv"), out, Some("  ".into()), None)
            .unwrap();
        assert!(cfg.prior_path.is_none(), "prior is only what the caller passes");
        assert!(cfg.group_column.is_none(), "blank group column should be ignored");
    }
}
