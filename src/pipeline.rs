//! End-to-end run inside a workspace directory:
//! fetch -> partition -> dataset config -> optional training.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, info_span, warn};

use crate::config::{ConfigError, PipelineConfig, WorkspaceLayout};
use crate::core::extract::{fetch_buckets, ExtractDirs, FetchReport, FetchRequest};
use crate::core::operations::FileOpError;
use crate::core::partition::{partition_dataset, PartitionError, PartitionReport, PartitionRequest};
use crate::storage::ObjectStore;
use crate::training::{write_data_yaml, TrainError, TrainedModel, Trainer};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    File(#[from] FileOpError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Train(#[from] TrainError),
}

/// Paths of every artifact in a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub dataset_dir: PathBuf,
    pub data_yaml: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_layout(root, &WorkspaceLayout::default())
    }

    pub fn with_layout(root: impl Into<PathBuf>, layout: &WorkspaceLayout) -> Self {
        let root = root.into();
        Self {
            images_dir: root.join(&layout.images),
            labels_dir: root.join(&layout.labels),
            dataset_dir: root.join(&layout.dataset),
            data_yaml: root.join(&layout.data_yaml),
            root,
        }
    }

    pub fn extract_dirs(&self) -> ExtractDirs {
        ExtractDirs::new(&self.images_dir, &self.labels_dir)
    }
}

/// Totals of a full run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub fetch: FetchReport,
    pub partition: PartitionReport,
    pub data_yaml: PathBuf,
    pub trained_weights: Option<PathBuf>,
}

/// Run every stage for `config` inside `workspace`.
///
/// Ratios and the rest of the config are validated before storage is touched.
/// Per-object fetch failures end up in the report; partition and training
/// failures abort the run.
pub fn run_pipeline(
    config: &PipelineConfig,
    store: &dyn ObjectStore,
    workspace: &Workspace,
    trainer: Option<&dyn Trainer>,
) -> Result<PipelineReport, PipelineError> {
    let ratios = config.validate()?;
    let _span = info_span!("pipeline").entered();
    info!("Workspace: {:?}", workspace.root);

    let dirs = workspace.extract_dirs();
    dirs.ensure()?;

    let request = FetchRequest {
        buckets: config.buckets.clone(),
        prefix: config.prefix.clone(),
        suffix: config.object_suffix.clone(),
        jobs: config.jobs,
    };
    let fetch = fetch_buckets(store, &request, &config.classes, &dirs);

    let partition = partition_dataset(&PartitionRequest {
        images_dir: workspace.images_dir.clone(),
        labels_dir: workspace.labels_dir.clone(),
        output_dir: workspace.dataset_dir.clone(),
        ratios,
        seed: config.seed,
    })?;

    write_data_yaml(&workspace.data_yaml, &workspace.dataset_dir, &config.classes)?;

    let trained_weights = match trainer {
        Some(trainer) if partition.sizes.train > 0 => {
            let _span = info_span!("train").entered();
            let TrainedModel { best_weights, .. } = trainer.train(
                &workspace.data_yaml,
                &config.training.model,
                &config.training.hyperparameters,
            )?;
            Some(best_weights)
        }
        Some(_) => {
            warn!("Training skipped: the train split is empty");
            None
        }
        None => None,
    };

    info!(
        "Run totals: objects processed {}, objects failed {}, pairs {}, train {}, val {}, test {}, missing labels {}",
        fetch.objects_processed,
        fetch.objects_failed,
        partition.pairs_found,
        partition.sizes.train,
        partition.sizes.val,
        partition.sizes.test,
        partition.missing_labels.len()
    );

    Ok(PipelineReport {
        fetch,
        partition,
        data_yaml: workspace.data_yaml.clone(),
        trained_weights,
    })
}
