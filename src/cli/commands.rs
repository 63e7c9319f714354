// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands, run in this order:
//   `prepare` — raw battery records → fixed-length row store
//   `train`   — row store → training runs → summary table
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    prepare_use_case::PrepareConfig,
    train_use_case::{RunSpec, TrainConfig},
};
use crate::ml::model::Architecture;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract discharge cycles and write the row store
    Prepare(PrepareArgs),

    /// Train SOC models on a prepared row store
    Train(TrainArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// JSON object mapping battery id → metadata
    #[arg(long, default_value = "data/metadata.json")]
    pub metadata: String,

    /// Root of the raw record store (<root>/<sub_path>/<id>.json)
    #[arg(long, default_value = "data/records")]
    pub records_dir: String,

    /// Where to write the wide-format row store
    #[arg(long, default_value = "data/cycles.csv")]
    pub output: String,

    /// Fixed length L every channel is resampled to
    #[arg(long, default_value_t = 128)]
    pub seq_len: usize,

    /// Stop after this many cycles in total
    #[arg(long, default_value_t = 1000)]
    pub max_cycles: usize,

    /// Take at most this many cycles from any one battery
    #[arg(long)]
    pub max_cycles_per_battery: Option<usize>,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            metadata_path:          a.metadata,
            records_dir:            a.records_dir,
            output_path:            a.output,
            seq_len:                a.seq_len,
            max_cycles:             a.max_cycles,
            max_cycles_per_battery: a.max_cycles_per_battery,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Row store written by `prepare`
    #[arg(long, default_value = "data/cycles.csv")]
    pub rows: String,

    /// Directory for checkpoints, metrics and the summary table
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Weight of the physics-consistency term
    #[arg(long, default_value_t = 0.1)]
    pub alpha: f64,

    /// Weight of the [0, 1] boundary term
    #[arg(long, default_value_t = 0.1)]
    pub beta: f64,

    /// Hidden width of the model
    #[arg(long, default_value_t = 64)]
    pub hidden: usize,

    /// dense or lstm
    #[arg(long, default_value = "dense")]
    pub arch: Architecture,

    /// Runs to train as <loss>:<composition>, comma separated;
    /// all four combinations when omitted
    #[arg(long, value_delimiter = ',')]
    pub runs: Vec<RunSpec>,

    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seed for the split and the batch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fixed sample spacing in seconds for coulomb counting;
    /// defaults to each cycle's mean spacing
    #[arg(long)]
    pub time_step: Option<f64>,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            rows_path:      a.rows,
            checkpoint_dir: a.checkpoint_dir,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            alpha:          a.alpha,
            beta:           a.beta,
            hidden:         a.hidden,
            arch:           a.arch,
            runs:           if a.runs.is_empty() { RunSpec::all() } else { a.runs },
            train_fraction: a.train_fraction,
            seed:           a.seed,
            time_step:      a.time_step,
        }
    }
}
