//! Write CoNLL-format SRL predictions from a pretrained model.
//!
//! Produces `<prefix>_predictions.txt` and `<prefix>_gold.txt` inside the
//! serialization directory, ready for the CoNLL `srl-eval.pl` scorer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use calypso_core::{evaluate, EvaluationConfig};
use clap::Parser;
use tracing::info;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "write-srl-conll")]
#[command(about = "Write CoNLL format SRL predictions to file from a pretrained model")]
#[command(version)]
struct Cli {
    /// The serialization directory
    #[arg(long)]
    path: PathBuf,

    /// The device to load the model onto (-1 for CPU)
    #[arg(long, env = "CALYPSO_DEVICE", default_value_t = -1, allow_negative_numbers = true)]
    device: i64,

    /// A directory containing a dataset to evaluate on
    #[arg(long)]
    data: Option<PathBuf>,

    /// A prefix to distinguish model outputs
    #[arg(long, default_value = "")]
    prefix: String,

    /// An optional domain to filter by for producing results
    #[arg(long)]
    domain: Option<String>,

    /// Instances per batch (defaults to the experiment's iterator setting)
    #[arg(long)]
    batch_size: Option<usize>,
}

impl From<Cli> for EvaluationConfig {
    fn from(cli: Cli) -> Self {
        EvaluationConfig {
            serialization_dir: cli.path,
            device: cli.device,
            data: cli.data,
            prefix: cli.prefix,
            domain: cli.domain,
            batch_size: cli.batch_size,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "write_srl_conll=info,calypso_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let options = EvaluationConfig::from(cli);
    let serialization_dir = options.serialization_dir.clone();

    let report = evaluate::run(&options).with_context(|| {
        format!(
            "failed to write SRL predictions for {}",
            serialization_dir.display()
        )
    })?;

    info!(
        instances = report.instances,
        without_verb = report.frames_without_verb,
        "wrote {} and {}",
        report.prediction_path.display(),
        report.gold_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["write-srl-conll", "--path", "/models/srl"]).unwrap();
        let options = EvaluationConfig::from(cli);
        assert_eq!(options.serialization_dir, PathBuf::from("/models/srl"));
        assert_eq!(options.device, -1);
        assert_eq!(options.prefix, "");
        assert!(options.data.is_none());
        assert!(options.domain.is_none());
        assert!(options.batch_size.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "write-srl-conll",
            "--path",
            "/models/srl",
            "--device",
            "0",
            "--data",
            "/data/conll-2012/test",
            "--prefix",
            "test",
            "--domain",
            "nw",
            "--batch-size",
            "8",
        ])
        .unwrap();
        let options = EvaluationConfig::from(cli);
        assert_eq!(options.device, 0);
        assert_eq!(options.data, Some(PathBuf::from("/data/conll-2012/test")));
        assert_eq!(options.prefix, "test");
        assert_eq!(options.domain.as_deref(), Some("nw"));
        assert_eq!(options.batch_size, Some(8));
    }

    #[test]
    fn test_negative_device() {
        let cli =
            Cli::try_parse_from(["write-srl-conll", "--path", "m", "--device", "-1"]).unwrap();
        assert_eq!(cli.device, -1);
    }

    #[test]
    fn test_path_is_required() {
        assert!(Cli::try_parse_from(["write-srl-conll"]).is_err());
    }
}
