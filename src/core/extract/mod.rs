//! Label extraction: one stored object in, one image + one label file out.

mod fetch;
mod metadata;

pub use fetch::{fetch_buckets, FetchReport, FetchRequest, ObjectFailure};
pub use metadata::{
    decode_field, extract_labels, parse_field_lines, FieldError, FieldLines, FieldOutcome,
    FieldStats, LabelExtraction, LabelLine,
};

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::dataset::label_file_name;
use crate::core::operations::{ensure_dir, write_pair, FileOpError};
use crate::core::registry::ClassRegistry;
use crate::storage::{StorageError, StoredObject};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("object key {0:?} has no file name")]
    InvalidKey(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    File(#[from] FileOpError),
}

/// Flat output directories for downloaded images and generated labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractDirs {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

impl ExtractDirs {
    pub fn new(images_dir: impl Into<PathBuf>, labels_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            labels_dir: labels_dir.into(),
        }
    }

    pub fn ensure(&self) -> Result<(), FileOpError> {
        ensure_dir(&self.images_dir)?;
        ensure_dir(&self.labels_dir)
    }
}

/// Files written for one object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectOutcome {
    pub image_path: PathBuf,
    pub label_path: PathBuf,
    pub records: usize,
    pub fields_failed: usize,
    pub lines_discarded: usize,
}

/// Write one object's image and label file.
///
/// The label text is fully built before anything touches disk, and
/// [`write_pair`] removes the image again if the label cannot be written.
/// Running it twice on the same object overwrites the same two files.
pub fn extract_object(
    object: &StoredObject,
    registry: &ClassRegistry,
    dirs: &ExtractDirs,
) -> Result<ObjectOutcome, ExtractError> {
    let image_name = object.file_name();
    if image_name.is_empty() {
        return Err(ExtractError::InvalidKey(object.key.clone()));
    }
    let label_name = label_file_name(Path::new(image_name))
        .ok_or_else(|| ExtractError::InvalidKey(object.key.clone()))?;

    let extraction = extract_labels(&object.metadata, registry);
    let label_text = extraction.label_text();

    dirs.ensure()?;
    let image_path = dirs.images_dir.join(image_name);
    let label_path = dirs.labels_dir.join(label_name);
    write_pair(&image_path, &object.body, &label_path, &label_text)?;

    debug!(
        "Wrote {:?} with {} records ({} failed fields)",
        label_path,
        extraction.lines.len(),
        extraction.failed_fields()
    );

    Ok(ObjectOutcome {
        image_path,
        label_path,
        records: extraction.lines.len(),
        fields_failed: extraction.failed_fields(),
        lines_discarded: extraction.discarded_lines(),
    })
}
