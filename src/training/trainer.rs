use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

use super::TrainError;

/// Knobs passed through to the training step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub epochs: u32,
    pub imgsz: u32,
    pub batch: u32,
    /// Early stopping patience in epochs
    pub patience: u32,
    /// Directory that receives training runs
    pub project: PathBuf,
    /// Run name inside `project`
    pub name: String,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: 200,
            imgsz: 640,
            batch: 16,
            patience: 15,
            project: PathBuf::from("models"),
            name: "exp_ex_corr".to_string(),
        }
    }
}

/// Trainer settings stored in the pipeline config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Executable of the external trainer
    pub program: String,
    /// Starting weights
    pub model: PathBuf,
    pub hyperparameters: Hyperparameters,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            program: "yolo".to_string(),
            model: PathBuf::from("yolo11n.pt"),
            hyperparameters: Hyperparameters::default(),
        }
    }
}

/// Output of a finished training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedModel {
    pub run_dir: PathBuf,
    pub best_weights: PathBuf,
}

/// The external training step. It only needs a dataset config, starting
/// weights and hyperparameters.
pub trait Trainer {
    fn train(
        &self,
        data_yaml: &Path,
        weights: &Path,
        hyperparameters: &Hyperparameters,
    ) -> Result<TrainedModel, TrainError>;
}

/// Runs a detection trainer CLI (`<program> detect train data=... model=...`)
#[derive(Debug, Clone)]
pub struct CommandTrainer {
    program: String,
}

impl CommandTrainer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(data_yaml: &Path, weights: &Path, hyper: &Hyperparameters) -> Vec<String> {
        vec![
            "detect".to_string(),
            "train".to_string(),
            format!("data={}", data_yaml.display()),
            format!("model={}", weights.display()),
            format!("epochs={}", hyper.epochs),
            format!("imgsz={}", hyper.imgsz),
            format!("batch={}", hyper.batch),
            format!("patience={}", hyper.patience),
            format!("project={}", hyper.project.display()),
            format!("name={}", hyper.name),
        ]
    }
}

impl Trainer for CommandTrainer {
    fn train(
        &self,
        data_yaml: &Path,
        weights: &Path,
        hyperparameters: &Hyperparameters,
    ) -> Result<TrainedModel, TrainError> {
        let args = Self::args(data_yaml, weights, hyperparameters);
        info!("Starting training: {} {}", self.program, args.join(" "));

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| TrainError::Launch {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(TrainError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        let run_dir = hyperparameters.project.join(&hyperparameters.name);
        info!("Training finished, run directory {:?}", run_dir);
        Ok(TrainedModel {
            best_weights: run_dir.join("weights").join("best.pt"),
            run_dir,
        })
    }
}
