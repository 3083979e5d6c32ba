use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use tracing::{error, info, info_span, warn};

use super::{extract_object, ExtractDirs, ExtractError, ObjectOutcome};
use crate::core::dataset::label_file_name;
use crate::core::registry::ClassRegistry;
use crate::storage::ObjectStore;

/// Which objects to pull from storage
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub buckets: Vec<String>,
    pub prefix: String,
    /// Keys must end with this (ASCII case-insensitive); empty keeps everything
    pub suffix: String,
    /// Worker threads; 1 runs on the calling thread
    pub jobs: usize,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            prefix: String::new(),
            suffix: ".png".to_string(),
            jobs: 1,
        }
    }
}

/// A bucket listing or object that could not be turned into a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectFailure {
    pub bucket: String,
    /// `None` when listing the bucket itself failed
    pub key: Option<String>,
    pub reason: String,
}

/// Totals for one fetch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchReport {
    pub objects_listed: usize,
    pub objects_processed: usize,
    pub objects_failed: usize,
    pub records_written: usize,
    pub empty_label_files: usize,
    pub fields_failed: usize,
    pub lines_discarded: usize,
    pub duplicate_names: usize,
    pub failures: Vec<ObjectFailure>,
}

impl FetchReport {
    fn record(&mut self, bucket: &str, key: &str, result: Result<ObjectOutcome, ExtractError>) {
        match result {
            Ok(outcome) => {
                self.objects_processed += 1;
                self.records_written += outcome.records;
                self.fields_failed += outcome.fields_failed;
                self.lines_discarded += outcome.lines_discarded;
                if outcome.records == 0 {
                    self.empty_label_files += 1;
                }
            }
            Err(e) => {
                error!("Failed to process {}/{}: {}", bucket, key, e);
                self.objects_failed += 1;
                self.failures.push(ObjectFailure {
                    bucket: bucket.to_string(),
                    key: Some(key.to_string()),
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn matches_suffix(key: &str, suffix: &str) -> bool {
    key.len() >= suffix.len()
        && key.is_char_boundary(key.len() - suffix.len())
        && key[key.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn process(
    store: &dyn ObjectStore,
    registry: &ClassRegistry,
    dirs: &ExtractDirs,
    bucket: &str,
    key: &str,
) -> Result<ObjectOutcome, ExtractError> {
    let object = store.fetch_object(bucket, key)?;
    extract_object(&object, registry, dirs)
}

/// Indices into `work` grouped by the label file they write, groups in order
/// of first appearance and members in listing order.
///
/// Output is flat, so two objects in one group overwrite each other's files
/// and the last one listed wins.
fn group_by_output(work: &[(String, String)]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_name: HashMap<OsString, usize> = HashMap::new();

    for (i, (bucket, key)) in work.iter().enumerate() {
        let name = key.rsplit('/').next().unwrap_or(key);
        let Some(label) = label_file_name(Path::new(name)) else {
            // No file name: extraction rejects it, nothing to collide with
            groups.push(vec![i]);
            continue;
        };
        match by_name.get(&label) {
            Some(&g) => {
                warn!("{}/{} overwrites an earlier object written as {:?}", bucket, key, label);
                groups[g].push(i);
            }
            None => {
                by_name.insert(label, groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

/// List every bucket and extract each matching object into `dirs`.
///
/// A failing bucket listing or object is recorded in the report and the run
/// moves on. With `jobs > 1` objects are extracted on a rayon pool. Objects
/// that write the same files stay on one worker in listing order, so the
/// output matches a sequential run.
pub fn fetch_buckets(
    store: &dyn ObjectStore,
    request: &FetchRequest,
    registry: &ClassRegistry,
    dirs: &ExtractDirs,
) -> FetchReport {
    let _span = info_span!("fetch").entered();
    let mut report = FetchReport::default();
    let mut work: Vec<(String, String)> = Vec::new();

    for bucket in &request.buckets {
        match store.list_objects(bucket, &request.prefix) {
            Ok(keys) => {
                let before = work.len();
                work.extend(
                    keys.into_iter()
                        .filter(|key| matches_suffix(key, &request.suffix))
                        .map(|key| (bucket.clone(), key)),
                );
                info!(
                    "Bucket {:?}: {} matching objects under prefix {:?}",
                    bucket,
                    work.len() - before,
                    request.prefix
                );
            }
            Err(e) => {
                error!("Failed to list bucket {:?}: {}", bucket, e);
                report.failures.push(ObjectFailure {
                    bucket: bucket.clone(),
                    key: None,
                    reason: e.to_string(),
                });
            }
        }
    }
    report.objects_listed = work.len();

    let groups = group_by_output(&work);
    report.duplicate_names = work.len() - groups.len();

    // Groups never share an output file, so only groups run concurrently
    let run_group = |group: &Vec<usize>| -> Vec<(usize, Result<ObjectOutcome, ExtractError>)> {
        group
            .iter()
            .map(|&i| {
                let (bucket, key) = &work[i];
                (i, process(store, registry, dirs, bucket, key))
            })
            .collect()
    };

    let mut results: Vec<(usize, Result<ObjectOutcome, ExtractError>)> = if request.jobs > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(request.jobs)
            .build()
        {
            Ok(pool) => pool.install(|| groups.par_iter().flat_map_iter(run_group).collect()),
            Err(e) => {
                warn!("Failed to build extraction pool, running sequentially: {}", e);
                groups.iter().flat_map(run_group).collect()
            }
        }
    } else {
        groups.iter().flat_map(run_group).collect()
    };
    results.sort_by_key(|(i, _)| *i);

    for (i, result) in results {
        let (bucket, key) = &work[i];
        report.record(bucket, key, result);
    }

    info!(
        "Fetch complete. Listed: {}, processed: {}, failed: {}, records: {}, empty labels: {}, failed fields: {}",
        report.objects_listed,
        report.objects_processed,
        report.objects_failed,
        report.records_written,
        report.empty_label_files,
        report.fields_failed
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_is_case_insensitive() {
        assert!(matches_suffix("a/b/PAGE.PNG", ".png"));
        assert!(matches_suffix("x.png", ".png"));
        assert!(!matches_suffix("x.jpg", ".png"));
        assert!(!matches_suffix("png", ".png"));
        assert!(matches_suffix("anything", ""));
        assert!(!matches_suffix("é.pn", ".png"));
    }

    fn keys(keys: &[&str]) -> Vec<(String, String)> {
        keys.iter().map(|k| ("b".to_string(), k.to_string())).collect()
    }

    #[test]
    fn test_group_by_output_keeps_listing_order() {
        let work = keys(&["p1/x.png", "y.png", "p2/x.png", "p3/x.PNG", "dir/", "p4/y.png"]);

        let groups = group_by_output(&work);

        assert_eq!(groups, vec![vec![0, 2, 3], vec![1, 5], vec![4]]);
    }
}
