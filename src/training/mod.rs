//! Hand-off to the external training step: the dataset config file and the
//! trainer contract.

mod data_yaml;
mod trainer;

pub use data_yaml::{write_data_yaml, DataYaml};
pub use trainer::{CommandTrainer, Hyperparameters, TrainedModel, Trainer, TrainingConfig};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("failed to write {path:?}: {source}")]
    WriteConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to launch {program:?}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
    #[error("{program:?} exited with {status}")]
    Failed { program: String, status: String },
}
