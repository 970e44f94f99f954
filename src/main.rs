use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use daynight::batch::ExtractionConfig;
use daynight::pipeline::{self, PipelineConfig, DEFAULT_IMAGE_EXTENSION};
use daynight::trainer::{TrainerConfig, DEFAULT_CV_FOLDS};

/// Trains a binary image classifier from two labeled groups of inputs.
///
/// Each group is either a directory of images or a vector file written by a
/// previous run. Group A supplies the positive class, group B the negative
/// class.
#[derive(Parser, Debug)]
#[command(name = "daynight", version, about)]
struct Cli {
    /// Positive group: image directory or image_vector_*.json file
    group_a: PathBuf,
    /// Negative group: image directory or image_vector_*.json file
    group_b: PathBuf,
    /// Output path for the trained model
    model_out: PathBuf,
    /// Image filename extension matched in directory groups
    #[arg(long, default_value = DEFAULT_IMAGE_EXTENSION)]
    extension: String,
    /// Subdivisions per color channel; histogram bins = blocks^3.
    /// Must divide 256 evenly.
    #[arg(long, default_value_t = daynight::DEFAULT_BLOCKS)]
    blocks: u32,
    /// Extraction worker count; defaults to the available parallelism
    #[arg(long)]
    workers: Option<usize>,
    /// Seed for the train/test split, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Cross-validation folds used to score each grid combination
    #[arg(long, default_value_t = DEFAULT_CV_FOLDS)]
    folds: usize,
    /// Abort the hyperparameter search after this many seconds
    #[arg(long, value_name = "SECONDS")]
    search_timeout: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let workers = cli.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let config = PipelineConfig {
        extension: cli.extension.clone(),
        extraction: ExtractionConfig {
            blocks: cli.blocks,
            workers,
        },
        trainer: TrainerConfig {
            split_seed: cli.seed,
            cv_folds: cli.folds,
            search_deadline: cli.search_timeout.map(Duration::from_secs),
        },
    };

    match pipeline::run(&cli.group_a, &cli.group_b, &cli.model_out, &config) {
        Ok(report) => {
            info!(
                "Model written to {:?}: {} (cv accuracy {:.3}, held-out accuracy {:.3}, \
                 {} train / {} held-out samples)",
                cli.model_out,
                report.selected,
                report.cv_accuracy,
                report.holdout_accuracy,
                report.train_samples,
                report.holdout_samples
            );
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
