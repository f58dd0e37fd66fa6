use clap::{Parser, Subcommand, ValueEnum};
use emotion_calibrator::config::AppConfig;
use emotion_calibrator::models::matrix::argmax;
use emotion_calibrator::{
    CalibrationArtifact, CalibrationError, CalibrationResult, ClassValues, ClassVec, Emotion,
    RunReport, NUM_CLASSES,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "emotion-calibrator",
    about = "Fit temperature and logit-bias calibration for emotion probabilities."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit calibration from a classified table and merge it into an artifact
    Fit {
        /// Input table (path,y_true,face_found,p_<emotion>...)
        #[arg(long, env = "CALIB_CSV")]
        csv: PathBuf,

        /// Calibration artifact to write
        #[arg(long, env = "CALIB_OUT")]
        out: PathBuf,

        /// Column to fit groups by, e.g. gender
        #[arg(long, env = "CALIB_GROUP")]
        group: Option<String>,

        /// Existing artifact to merge into; without it the output starts empty
        #[arg(long = "prior", env = "CALIB_PRIOR")]
        prior: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,
    },

    /// Preview an artifact on one probability vector
    Apply {
        /// Calibration artifact to read
        #[arg(long)]
        artifact: PathBuf,

        /// Group value to look up (falls back to the global entries)
        #[arg(long)]
        group: Option<String>,

        /// Seven comma-separated probabilities, neutral..surprised
        #[arg(long)]
        probs: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `[CAL]` lines for humans
    Summary,
    /// The run report as one JSON document
    Json,
}

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fit {
            csv,
            out,
            group,
            prior,
            format,
        } => cmd_fit(csv, out, group, prior, format),
        Commands::Apply { artifact, group, probs } => cmd_apply(artifact, group, &probs),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn cmd_fit(
    csv: PathBuf,
    out: PathBuf,
    group: Option<String>,
    prior: Option<PathBuf>,
    format: OutputFormat,
) -> CalibrationResult<()> {
    let cfg = AppConfig::from_env(csv, out, group, prior)?;
    let report = emotion_calibrator::run(&cfg)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report_json(&report))?),
        OutputFormat::Summary => print_report(&report),
    }
    Ok(())
}

fn report_json(r: &RunReport) -> serde_json::Value {
    let groups: serde_json::Map<String, serde_json::Value> = r
        .groups
        .fitted
        .iter()
        .map(|(g, fit)| {
            (
                g.clone(),
                json!({
                    "samples": fit.samples,
                    "temperature": fit.temperature,
                    "bias": fit.bias.to_json(),
                }),
            )
        })
        .collect();
    let skipped: serde_json::Map<String, serde_json::Value> = r
        .groups
        .skipped
        .iter()
        .map(|(g, n)| (g.clone(), json!(n)))
        .collect();

    json!({
        "total_rows": r.total_rows,
        "valid_rows": r.valid_rows,
        "group_column": r.group_column,
        "global": {
            "samples": r.global.samples,
            "temperature": r.global.temperature,
            "bias": r.global.bias.to_json(),
        },
        "groups": groups,
        "skipped_groups": skipped,
        "metrics": r.metrics,
        "output": r.out_path.display().to_string(),
    })
}

fn print_report(r: &RunReport) {
    let t = &r.global.temperature;
    println!("[CAL] valid rows: {} of {}", r.valid_rows, r.total_rows);
    println!("[CAL] global tau={:.3} | NLL={:.4}", t.tau, t.nll);

    if let Some(col) = &r.group_column {
        for (g, fit) in &r.groups.fitted {
            println!(
                "[CAL] {col}={g}: tau={:.3} | NLL={:.4}",
                fit.temperature.tau, fit.temperature.nll
            );
        }
        for (g, n) in &r.groups.skipped {
            println!("[CAL] {col}={g}: too few samples ({n}), skip");
        }
    }

    println!("[CAL] bias(global): {}", r.global.bias);
    if let Some(col) = &r.group_column {
        for (g, fit) in &r.groups.fitted {
            println!("[CAL] bias({col}={g}): {}", fit.bias);
        }
    }

    println!("[CAL] Wrote {}", r.out_path.display());

    let m = &r.metrics;
    println!(
        "[CAL] Top-1 acc raw={:.3} | cal={:.3}",
        m.raw_accuracy, m.calibrated_accuracy
    );
    println!("[CAL] ECE raw={:.3} | cal={:.3}", m.raw_ece, m.calibrated_ece);
}

fn cmd_apply(artifact: PathBuf, group: Option<String>, probs: &str) -> CalibrationResult<()> {
    let p = parse_probs(probs)?;
    let art = CalibrationArtifact::load(&artifact)?;
    let q = art.calibrate(&p, group.as_deref());

    println!("{}", ClassValues(q));
    let top = Emotion::ALL[argmax(&q)];
    println!("argmax: {top} ({:.3})", q[top.index()]);
    Ok(())
}

fn parse_probs(raw: &str) -> CalibrationResult<ClassVec> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| CalibrationError::Config(format!("--probs: {e}")))?;
    if values.len() != NUM_CLASSES {
        return Err(CalibrationError::Config(format!(
            "--probs: expected {NUM_CLASSES} values, got {}",
            values.len()
        )));
    }
    let mut out = [0.0; NUM_CLASSES];
    out.copy_from_slice(&values);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probs() {
        let p = parse_probs("0.1, 0.4,0.1,0.1,0.1,0.1,0.1").unwrap();
        assert_eq!(p[1], 0.4);
        assert!(parse_probs("0.1,0.2").is_err());
        assert!(parse_probs("a,b,c,d,e,f,g").is_err());
    }

    #[test]
    fn test_cli_parses_fit() {
        let cli = Cli::try_parse_from([
            "emotion-calibrator", "fit", "--csv", "in.csv", "--out", "out.json", "--group", "gender",
        ])
        .unwrap();
        match cli.command {
            Commands::Fit { csv, group, format, .. } => {
                assert_eq!(csv, PathBuf::from("in.csv"));
                assert_eq!(group.as_deref(), Some("gender"));
                assert_eq!(format, OutputFormat::Summary);
            }
            _ => panic!("expected fit"),
        }
    }

    #[test]
    fn test_cli_format_is_checked() {
        let base = ["emotion-calibrator", "fit", "--csv", "in.csv", "--out", "out.json", "--format"];
        let cli = Cli::try_parse_from(base.iter().copied().chain(["json"])).unwrap();
        assert!(matches!(cli.command, Commands::Fit { format: OutputFormat::Json, .. }));
        assert!(
            Cli::try_parse_from(base.iter().copied().chain(["xml"])).is_err(),
            "unknown formats must be rejected"
        );
    }
}
