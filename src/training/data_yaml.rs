use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::TrainError;
use crate::core::dataset::DatasetSplit;
use crate::core::registry::ClassRegistry;

/// Dataset config consumed by the trainer: split image dirs and class names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataYaml {
    pub train: PathBuf,
    pub val: PathBuf,
    pub test: PathBuf,
    pub names: Vec<String>,
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

fn yaml_path(path: &Path) -> String {
    yaml_single_quoted(&path.display().to_string())
}

impl DataYaml {
    /// Paths come from the same helpers the partitioner copies into.
    pub fn for_dataset(dataset_root: &Path, registry: &ClassRegistry) -> Self {
        Self {
            train: DatasetSplit::Train.images_dir(dataset_root),
            val: DatasetSplit::Val.images_dir(dataset_root),
            test: DatasetSplit::Test.images_dir(dataset_root),
            names: registry.names().to_vec(),
        }
    }

    pub fn render(&self) -> String {
        let names = self
            .names
            .iter()
            .map(|name| yaml_single_quoted(name))
            .collect::<Vec<_>>()
            .join(", ");

        [
            format!("train: {}", yaml_path(&self.train)),
            format!("val: {}", yaml_path(&self.val)),
            format!("test: {}", yaml_path(&self.test)),
            String::new(),
            "# Number of classes".to_string(),
            format!("nc: {}", self.names.len()),
            String::new(),
            "# Class names".to_string(),
            format!("names: [{}]", names),
            String::new(),
        ]
        .join("\n")
    }
}

/// Write the dataset config for `dataset_root` to `path`.
pub fn write_data_yaml(
    path: &Path,
    dataset_root: &Path,
    registry: &ClassRegistry,
) -> Result<DataYaml, TrainError> {
    let data = DataYaml::for_dataset(dataset_root, registry);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TrainError::WriteConfig {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, data.render()).map_err(|source| TrainError::WriteConfig {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Dataset config written to {:?}", path);
    Ok(data)
}
