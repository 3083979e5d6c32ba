use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use bucket_yolo_dataset::config::PipelineConfig;
use bucket_yolo_dataset::core::analysis::summarize_dataset;
use bucket_yolo_dataset::core::extract::{fetch_buckets, ExtractDirs, FetchRequest};
use bucket_yolo_dataset::core::partition::{
    partition_dataset, PartitionRequest, PartitionStatus, SplitRatios,
};
use bucket_yolo_dataset::logging::setup_logging;
use bucket_yolo_dataset::storage::LocalBucketStore;
use bucket_yolo_dataset::training::{write_data_yaml, CommandTrainer, Trainer};
use bucket_yolo_dataset::{run_pipeline, Workspace};

#[derive(Parser, Debug)]
#[command(
    name = "bucket-yolo-dataset",
    about = "Build a YOLO training set from labeled objects in storage buckets"
)]
struct Cli {
    /// JSON config file (defaults: ./dataset-builder.json, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory for run log files.
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download objects and write one label file per image.
    Fetch {
        /// Buckets to scan (defaults to the configured buckets).
        buckets: Vec<String>,
        /// Directory holding one subdirectory per bucket.
        #[arg(long)]
        store_root: PathBuf,
        /// Optional prefix inside each bucket.
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value = "images")]
        images_dir: PathBuf,
        #[arg(long, default_value = "labels")]
        labels_dir: PathBuf,
        /// Extraction worker threads.
        #[arg(long)]
        jobs: Option<usize>,
        /// Write the run report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Split images+labels into train/val/test.
    Split {
        /// Folder containing all image files.
        #[arg(short = 'i', long)]
        images_dir: PathBuf,
        /// Folder containing all .txt label files (same basenames).
        #[arg(short = 'l', long)]
        labels_dir: PathBuf,
        /// Root folder for images/{train,val,test} and labels/{train,val,test}.
        #[arg(short = 'o', long)]
        output_dir: PathBuf,
        /// Fraction for training.
        #[arg(short = 'r', long)]
        train_ratio: Option<f64>,
        /// Fraction for validation.
        #[arg(short = 'v', long)]
        val_ratio: Option<f64>,
        /// Shuffle seed.
        #[arg(short = 's', long)]
        seed: Option<u64>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write the dataset config read by the trainer.
    DataYaml {
        /// Partitioned dataset root.
        #[arg(long, default_value = "dataset")]
        dataset_dir: PathBuf,
        #[arg(long, default_value = "data.yaml")]
        output: PathBuf,
    },
    /// Count images, records and classes per split.
    Summary {
        #[arg(default_value = "dataset")]
        dataset_dir: PathBuf,
    },
    /// Fetch, split and write data.yaml inside a workspace.
    Run {
        workspace: PathBuf,
        #[arg(long)]
        store_root: PathBuf,
        /// Launch the configured trainer afterwards.
        #[arg(long, default_value_t = false)]
        train: bool,
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    if let Some(path) = path {
        let json = serde_json::to_string_pretty(report).context("serializing report")?;
        fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        info!("Report written to {:?}", path);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_dir).context("setting up logging")?;

    let mut config = PipelineConfig::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Command::Fetch {
            buckets,
            store_root,
            prefix,
            images_dir,
            labels_dir,
            jobs,
            report,
        } => {
            if !buckets.is_empty() {
                config.buckets = buckets;
            }
            if let Some(prefix) = prefix {
                config.prefix = prefix;
            }
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            config.validate()?;

            let store = LocalBucketStore::new(store_root);
            let dirs = ExtractDirs::new(images_dir, labels_dir);
            let request = FetchRequest {
                buckets: config.buckets.clone(),
                prefix: config.prefix.clone(),
                suffix: config.object_suffix.clone(),
                jobs: config.jobs,
            };
            let fetch = fetch_buckets(&store, &request, &config.classes, &dirs);
            write_report(report.as_deref(), &fetch)?;
            if fetch.objects_failed > 0 {
                warn!("{} objects could not be processed", fetch.objects_failed);
            }
        }
        Command::Split {
            images_dir,
            labels_dir,
            output_dir,
            train_ratio,
            val_ratio,
            seed,
            report,
        } => {
            let ratios = SplitRatios::new(
                train_ratio.unwrap_or(config.train_ratio),
                val_ratio.unwrap_or(config.val_ratio),
            )?;
            let partition = partition_dataset(&PartitionRequest {
                images_dir,
                labels_dir,
                output_dir,
                ratios,
                seed: seed.unwrap_or(config.seed),
            })
            .context("splitting dataset")?;
            write_report(report.as_deref(), &partition)?;
            if partition.status != PartitionStatus::Completed {
                warn!("Nothing was split: {:?}", partition.status);
            }
        }
        Command::DataYaml {
            dataset_dir,
            output,
        } => {
            write_data_yaml(&output, &dataset_dir, &config.classes)
                .context("writing dataset config")?;
        }
        Command::Summary { dataset_dir } => {
            let summary = summarize_dataset(&dataset_dir, &config.classes);
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("serializing summary")?
            );
        }
        Command::Run {
            workspace,
            store_root,
            train,
            report,
        } => {
            let store = LocalBucketStore::new(store_root);
            let workspace = Workspace::with_layout(workspace, &config.layout);
            let trainer = CommandTrainer::new(config.training.program.clone());
            let trainer: Option<&dyn Trainer> = if train { Some(&trainer) } else { None };

            let outcome = run_pipeline(&config, &store, &workspace, trainer)
                .context("running pipeline")?;
            write_report(report.as_deref(), &outcome)?;
            if let Some(weights) = &outcome.trained_weights {
                info!("Trained weights: {:?}", weights);
            }
        }
    }

    Ok(())
}
