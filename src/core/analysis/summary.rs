//! Per-split counts of a partitioned dataset, read back from disk.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::core::dataset::{parse_label_file, DatasetSplit};
use crate::core::partition::collect_pairs;
use crate::core::registry::ClassRegistry;

/// Statistics for one split directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSummary {
    pub split: &'static str,
    pub images: usize,
    pub label_files: usize,
    pub missing_labels: usize,
    pub records: usize,
    /// Pairs whose label file holds no records
    pub background: usize,
    /// Records per class name, in registry order
    pub per_class: Vec<(String, usize)>,
    pub unknown_class_records: usize,
    pub skipped_lines: usize,
}

impl SplitSummary {
    fn empty(split: DatasetSplit, registry: &ClassRegistry) -> Self {
        Self {
            split: split.as_str(),
            images: 0,
            label_files: 0,
            missing_labels: 0,
            records: 0,
            background: 0,
            per_class: registry.names().iter().map(|n| (n.clone(), 0)).collect(),
            unknown_class_records: 0,
            skipped_lines: 0,
        }
    }

    /// Get percentage of pairs without any record
    pub fn background_percentage(&self) -> f32 {
        if self.label_files == 0 {
            return 0.0;
        }
        (self.background as f32 / self.label_files as f32) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub splits: Vec<SplitSummary>,
}

impl DatasetSummary {
    pub fn total_images(&self) -> usize {
        self.splits.iter().map(|s| s.images).sum()
    }

    pub fn total_records(&self) -> usize {
        self.splits.iter().map(|s| s.records).sum()
    }
}

/// Count images, label files and records per class for one split.
///
/// A missing split directory yields an all-zero summary.
pub fn summarize_split(
    dataset_root: &Path,
    split: DatasetSplit,
    registry: &ClassRegistry,
) -> SplitSummary {
    let mut summary = SplitSummary::empty(split, registry);
    let images_dir = split.images_dir(dataset_root);

    let scan = match collect_pairs(&images_dir, &split.labels_dir(dataset_root)) {
        Ok(scan) => scan,
        Err(e) => {
            warn!("Cannot summarize split {}: {}", split, e);
            return summary;
        }
    };

    summary.images = scan.images_found;
    summary.missing_labels = scan.missing_labels.len();

    let mut per_class: BTreeMap<u32, usize> = BTreeMap::new();
    for pair in &scan.pairs {
        let Some(label) = parse_label_file(&pair.label) else {
            warn!("Failed to read label file {:?}", pair.label);
            continue;
        };
        summary.label_files += 1;
        summary.skipped_lines += label.skipped_lines;
        if label.is_background() {
            summary.background += 1;
        }
        for detection in &label.detections {
            summary.records += 1;
            if registry.name_of(detection.class_id).is_some() {
                *per_class.entry(detection.class_id).or_default() += 1;
            } else {
                summary.unknown_class_records += 1;
            }
        }
    }

    for (class_id, count) in per_class {
        summary.per_class[class_id as usize].1 = count;
    }

    info!(
        "Split {}: {} images, {} records, {} background",
        split, summary.images, summary.records, summary.background
    );
    summary
}

/// Summaries for train, val and test under `dataset_root`.
pub fn summarize_dataset(dataset_root: &Path, registry: &ClassRegistry) -> DatasetSummary {
    DatasetSummary {
        splits: DatasetSplit::all()
            .into_iter()
            .map(|split| summarize_split(dataset_root, split, registry))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_pair(root: &Path, split: DatasetSplit, stem: &str, label: &str) {
        let images = split.images_dir(root);
        let labels = split.labels_dir(root);
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        fs::write(images.join(format!("{}.png", stem)), b"x").unwrap();
        fs::write(labels.join(format!("{}.txt", stem)), label).unwrap();
    }

    #[test]
    fn test_summarize_counts_classes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ClassRegistry::default();
        write_pair(dir.path(), DatasetSplit::Train, "a", "1 0.5 0.5 0.2 0.3\n1 0.1 0.1 0.05 0.05");
        write_pair(dir.path(), DatasetSplit::Train, "b", "");
        write_pair(dir.path(), DatasetSplit::Train, "c", "0 0.1 0.1 0.1 0.1\n9 0.1 0.1 0.1 0.1");
        write_pair(dir.path(), DatasetSplit::Val, "d", "4 0.1 0.1 0.1 0.1");

        let summary = summarize_dataset(dir.path(), &registry);

        let train = &summary.splits[0];
        assert_eq!(train.split, "train");
        assert_eq!(train.images, 3);
        assert_eq!(train.label_files, 3);
        assert_eq!(train.records, 4);
        assert_eq!(train.background, 1);
        assert_eq!(train.unknown_class_records, 1);
        assert_eq!(train.per_class[0], ("schematic".to_string(), 1));
        assert_eq!(train.per_class[1], ("table".to_string(), 2));

        let test = &summary.splits[2];
        assert_eq!(test.images, 0);
        assert_eq!(summary.total_images(), 4);
        assert_eq!(summary.total_records(), 5);
    }
}
