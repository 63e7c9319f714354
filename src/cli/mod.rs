// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2. No
// pipeline logic lives here.
//
//   battery-soc prepare --metadata data/metadata.json --records-dir data/records
//   battery-soc train --rows data/cycles.csv --epochs 20 --runs pinn:residual
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "battery-soc",
    version = "0.1.0",
    about = "Prepare battery discharge cycles and train physics-informed SOC estimators."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Train(args)   => run_train(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    tracing::info!("Preparing cycles from '{}'", args.records_dir);
    let output = args.output.clone();
    let report = PrepareUseCase::new(args.into()).execute()?;

    println!(
        "Prepared {} cycles from {} batteries ({} skipped) → {}",
        report.rows, report.batteries_used, report.batteries_skipped, output,
    );
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on rows in '{}'", args.rows);
    let checkpoint_dir = args.checkpoint_dir.clone();
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Summary written to {checkpoint_dir}/summary.csv");
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{RunSpec, TrainConfig};
    use crate::ml::model::Architecture;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["battery-soc", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_train_overrides() {
        let cli = Cli::try_parse_from([
            "battery-soc", "train",
            "--arch", "lstm",
            "--runs", "mse:absolute,pinn:residual",
            "--time-step", "10",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.arch, Architecture::Lstm);
        assert_eq!(cfg.runs.len(), 2);
        assert_eq!(cfg.runs[1], "pinn:residual".parse::<RunSpec>().unwrap());
        assert_eq!(cfg.time_step, Some(10.0));
    }

    #[test]
    fn test_prepare_rejects_bad_numbers() {
        assert!(Cli::try_parse_from(["battery-soc", "prepare", "--seq-len", "many"]).is_err());
    }
}
