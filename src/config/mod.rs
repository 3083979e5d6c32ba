mod app_config;

pub use app_config::{PipelineConfig, WorkspaceLayout, CONFIG_FILE_NAME};

use std::path::PathBuf;

/// Configuration problems. All of them are reported before any I/O happens.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("class registry must contain at least one class")]
    EmptyRegistry,
    #[error("class name at position {0} is blank")]
    BlankClassName(usize),
    #[error("class {0:?} appears more than once in the registry")]
    DuplicateClass(String),
    #[error("{name} ratio must be a finite value in [0, 1), got {value}")]
    InvalidRatio { name: &'static str, value: f64 },
    #[error("train_ratio + val_ratio must be < 1.0 (test gets the remainder), got {train} + {val}")]
    RatioSumTooLarge { train: f64, val: f64 },
    #[error("jobs must be at least 1")]
    ZeroJobs,
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
