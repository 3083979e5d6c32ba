//! Deterministic train/val/test partitioning of image/label pairs.

mod pairing;
mod ratios;

pub use pairing::{collect_pairs, is_recognized_image, DatasetPair, PairScan};
pub use ratios::{SplitRatios, SplitSizes};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

use crate::core::dataset::DatasetSplit;
use crate::core::operations::{copy_file, ensure_dir, FileOpError};

#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("failed to read directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    File(#[from] FileOpError),
}

/// Inputs of one partition run
#[derive(Debug, Clone)]
pub struct PartitionRequest {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    /// Receives `images/{train,val,test}` and `labels/{train,val,test}`
    pub output_dir: PathBuf,
    pub ratios: SplitRatios,
    pub seed: u64,
}

/// Pairs assigned to each split, in shuffled order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionPlan {
    pub train: Vec<DatasetPair>,
    pub val: Vec<DatasetPair>,
    pub test: Vec<DatasetPair>,
}

impl PartitionPlan {
    pub fn get(&self, split: DatasetSplit) -> &[DatasetPair] {
        match split {
            DatasetSplit::Train => &self.train,
            DatasetSplit::Val => &self.val,
            DatasetSplit::Test => &self.test,
        }
    }

    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.train.len(),
            val: self.val.len(),
            test: self.test.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStatus {
    Completed,
    /// No recognized image in the images directory
    NoImages,
    /// Images were found but none had a label file
    NoPairs,
}

/// Totals for one partition run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionReport {
    pub status: PartitionStatus,
    pub images_found: usize,
    pub pairs_found: usize,
    pub sizes: SplitSizes,
    pub missing_labels: Vec<String>,
    pub orphan_labels: Vec<String>,
}

/// Reorder `pairs` with a generator seeded from `seed`.
///
/// The same input order and seed always give the same output order.
pub fn shuffle_pairs(pairs: &mut [DatasetPair], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    pairs.shuffle(&mut rng);
}

/// Shuffle and cut `pairs` into train, val and test.
pub fn plan_partition(mut pairs: Vec<DatasetPair>, ratios: SplitRatios, seed: u64) -> PartitionPlan {
    shuffle_pairs(&mut pairs, seed);
    let sizes = ratios.sizes(pairs.len());

    let test = pairs.split_off(sizes.train + sizes.val);
    let val = pairs.split_off(sizes.train);
    PartitionPlan {
        train: pairs,
        val,
        test,
    }
}

fn ensure_output_dirs(output_dir: &Path) -> Result<(), FileOpError> {
    for split in DatasetSplit::all() {
        ensure_dir(&split.images_dir(output_dir))?;
        ensure_dir(&split.labels_dir(output_dir))?;
    }
    Ok(())
}

fn copy_subset(pairs: &[DatasetPair], split: DatasetSplit, output_dir: &Path) -> Result<(), FileOpError> {
    let image_dest = split.images_dir(output_dir);
    let label_dest = split.labels_dir(output_dir);
    for pair in pairs {
        copy_file(&pair.image, &image_dest.join(pair.image_file()))?;
        copy_file(&pair.label, &label_dest.join(pair.label_file()))?;
    }
    Ok(())
}

/// Copy image/label pairs into `<output>/{images,labels}/{train,val,test}`.
///
/// The six output directories are created even when nothing is copied.
/// Sources are only read. Re-running with the same inputs overwrites the
/// same files with the same contents.
pub fn partition_dataset(request: &PartitionRequest) -> Result<PartitionReport, PartitionError> {
    let _span = info_span!("partition").entered();
    info!(
        "Splitting dataset: images={:?}, labels={:?}, output={:?}",
        request.images_dir, request.labels_dir, request.output_dir
    );
    ensure_output_dirs(&request.output_dir)?;

    let scan = collect_pairs(&request.images_dir, &request.labels_dir)?;
    let mut report = PartitionReport {
        status: PartitionStatus::Completed,
        images_found: scan.images_found,
        pairs_found: scan.pairs.len(),
        sizes: SplitSizes::default(),
        missing_labels: scan.missing_labels,
        orphan_labels: scan.orphan_labels,
    };

    if report.images_found == 0 {
        warn!("No images found in {:?}", request.images_dir);
        report.status = PartitionStatus::NoImages;
        return Ok(report);
    }
    if scan.pairs.is_empty() {
        warn!("No matching image/label pairs found");
        report.status = PartitionStatus::NoPairs;
        return Ok(report);
    }

    let plan = plan_partition(scan.pairs, request.ratios, request.seed);
    report.sizes = plan.sizes();

    info!("Total pairs: {}", report.pairs_found);
    info!("  -> Train: {}", report.sizes.train);
    info!("  -> Val:   {}", report.sizes.val);
    info!("  -> Test:  {}", report.sizes.test);

    for split in DatasetSplit::all() {
        copy_subset(plan.get(split), split, &request.output_dir)?;
    }

    info!(
        "Done copying to {:?}/images/{{train,val,test}} and labels/{{train,val,test}}",
        request.output_dir
    );
    Ok(report)
}
