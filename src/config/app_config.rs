use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::ConfigError;
use crate::core::partition::SplitRatios;
use crate::core::registry::ClassRegistry;
use crate::training::TrainingConfig;

/// File name looked up in the working directory and the platform config dir
pub const CONFIG_FILE_NAME: &str = "dataset-builder.json";

/// Names of the artifacts inside a workspace directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceLayout {
    pub images: String,
    pub labels: String,
    pub dataset: String,
    pub data_yaml: String,
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self {
            images: "images".to_string(),
            labels: "labels".to_string(),
            dataset: "dataset".to_string(),
            data_yaml: "data.yaml".to_string(),
        }
    }
}

/// Everything a pipeline run needs besides the storage handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ordered class names; must match the registry used at training time
    pub classes: ClassRegistry,
    /// Buckets scanned by `fetch`
    pub buckets: Vec<String>,
    /// Key prefix inside every bucket
    pub prefix: String,
    /// Only keys ending with this suffix (case-insensitive) are fetched
    pub object_suffix: String,
    pub layout: WorkspaceLayout,
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub seed: u64,
    /// Worker threads for object extraction
    pub jobs: usize,
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classes: ClassRegistry::default(),
            buckets: vec!["fiches-udp".to_string(), "fiches-sorbonne".to_string()],
            prefix: String::new(),
            object_suffix: ".png".to_string(),
            layout: WorkspaceLayout::default(),
            train_ratio: 0.7,
            val_ratio: 0.2,
            seed: 42,
            jobs: 1,
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check everything that can be checked without touching storage or disk.
    pub fn validate(&self) -> Result<SplitRatios, ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        SplitRatios::new(self.train_ratio, self.val_ratio)
    }

    /// Candidate config files in lookup order: working directory, then platform config dir
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(dirs) = directories::ProjectDirs::from("", "", "bucket-yolo-dataset") {
            paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Read and parse a config file. Any failure is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from: {:?}", path);
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the run configuration.
    ///
    /// An explicit path must load. Without one the default locations are
    /// tried in order and a missing file falls back to defaults; a file that
    /// exists but does not parse is still an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        for candidate in Self::default_config_paths() {
            if candidate.is_file() {
                return Self::load_from(&candidate);
            }
        }

        info!("No config file found. Using defaults.");
        Ok(Self::default())
    }

    /// Save the config as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!("Failed to create config directory: {}", e);
                    return Err(ConfigError::Write {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            }
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Config saved to: {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.classes.len(), 5);
        assert_eq!(config.train_ratio, 0.7);
        assert_eq!(config.val_ratio, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.object_suffix, ".png");
        assert_eq!(config.layout.dataset, "dataset");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"classes": ["cat", "dog"], "seed": 7}"#).unwrap();
        assert_eq!(config.classes.id_of("dog"), Some(1));
        assert_eq!(config.seed, 7);
        assert_eq!(config.train_ratio, 0.7);
        assert_eq!(config.training.hyperparameters.epochs, 200);
    }

    #[test]
    fn test_validate_rejects_bad_ratios() {
        let config = PipelineConfig {
            train_ratio: 0.8,
            val_ratio: 0.2,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RatioSumTooLarge { .. })
        ));

        let config = PipelineConfig {
            jobs: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroJobs)));
    }

    #[test]
    fn test_save_then_load_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = PipelineConfig {
            buckets: vec!["scans".to_string()],
            prefix: "2024/".to_string(),
            ..PipelineConfig::default()
        };

        config.save(&path).unwrap();
        let loaded = PipelineConfig::load(Some(&path)).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_explicit_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            PipelineConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::load(Some(&broken)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
