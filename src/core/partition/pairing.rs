use image::ImageFormat;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::PartitionError;
use crate::core::dataset::{label_file_name, LABEL_EXTENSION};

/// An image and its label file, matched by base name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetPair {
    pub image: PathBuf,
    pub label: PathBuf,
}

impl DatasetPair {
    /// Image file name as stored on disk
    pub fn image_file(&self) -> &OsStr {
        self.image.file_name().unwrap_or(self.image.as_os_str())
    }

    pub fn label_file(&self) -> &OsStr {
        self.label.file_name().unwrap_or(self.label.as_os_str())
    }

    /// Display form of the image name, for reports
    pub fn image_name(&self) -> String {
        file_name(&self.image)
    }
}

/// Result of matching an images directory against a labels directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairScan {
    pub images_found: usize,
    /// In image file-name order
    pub pairs: Vec<DatasetPair>,
    /// Image file names with no label file
    pub missing_labels: Vec<String>,
    /// Label file names with no image
    pub orphan_labels: Vec<String>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether the extension is one of png, jpg/jpeg, bmp, tif/tiff (any case)
pub fn is_recognized_image(path: &Path) -> bool {
    matches!(
        ImageFormat::from_path(path),
        Ok(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tiff)
    )
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Enumerate recognized images (sorted by name) and pair each with
/// `<labels_dir>/<stem>.txt`.
///
/// Images without a label are listed in `missing_labels` and left out.
/// A missing labels directory means every image is unlabeled.
pub fn collect_pairs(images_dir: &Path, labels_dir: &Path) -> Result<PairScan, PartitionError> {
    let images: Vec<PathBuf> = list_files(images_dir)
        .map_err(|source| PartitionError::ReadDir {
            path: images_dir.to_path_buf(),
            source,
        })?
        .into_iter()
        .filter(|path| is_recognized_image(path))
        .collect();

    let mut scan = PairScan {
        images_found: images.len(),
        ..PairScan::default()
    };
    let mut paired_labels = HashSet::new();

    for image in images {
        let Some(label_name) = label_file_name(&image) else {
            continue;
        };
        let label = labels_dir.join(&label_name);
        if label.is_file() {
            paired_labels.insert(label_name);
            scan.pairs.push(DatasetPair { image, label });
        } else {
            debug!("No label for {:?}", image);
            scan.missing_labels.push(file_name(&image));
        }
    }

    match list_files(labels_dir) {
        Ok(labels) => {
            scan.orphan_labels = labels
                .iter()
                .filter(|path| {
                    path.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(LABEL_EXTENSION))
                })
                .filter(|path| {
                    path.file_name()
                        .is_some_and(|name| !paired_labels.contains(name))
                })
                .map(|path| file_name(path))
                .collect();
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Labels directory {:?} does not exist", labels_dir);
        }
        Err(source) => {
            return Err(PartitionError::ReadDir {
                path: labels_dir.to_path_buf(),
                source,
            })
        }
    }

    if !scan.missing_labels.is_empty() {
        warn!(
            "Skipping {} images without labels. Examples: {:?}",
            scan.missing_labels.len(),
            &scan.missing_labels[..scan.missing_labels.len().min(3)]
        );
    }
    if !scan.orphan_labels.is_empty() {
        info!("{} label files have no matching image", scan.orphan_labels.len());
    }

    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_extensions() {
        for name in ["a.png", "a.PNG", "a.jpg", "a.jpeg", "a.JPEG", "a.bmp", "a.tiff", "a.tif"] {
            assert!(is_recognized_image(Path::new(name)), "{}", name);
        }
        for name in ["a.gif", "a.webp", "a.txt", "a"] {
            assert!(!is_recognized_image(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn test_collect_pairs_reports_missing_and_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();

        for name in ["c.png", "a.jpg", "b.png", "notes.md"] {
            fs::write(images.join(name), b"x").unwrap();
        }
        for name in ["a.txt", "c.txt", "z.txt"] {
            fs::write(labels.join(name), b"").unwrap();
        }

        let scan = collect_pairs(&images, &labels).unwrap();

        assert_eq!(scan.images_found, 3);
        let names: Vec<String> = scan.pairs.iter().map(DatasetPair::image_name).collect();
        assert_eq!(names, vec!["a.jpg", "c.png"]);
        assert_eq!(scan.pairs[1].label, labels.join("c.txt"));
        assert_eq!(scan.missing_labels, vec!["b.png"]);
        assert_eq!(scan.orphan_labels, vec!["z.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_still_pair() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        fs::write(images.join(OsStr::from_bytes(b"scan\xe9.png")), b"x").unwrap();
        fs::write(labels.join(OsStr::from_bytes(b"scan\xe9.txt")), b"").unwrap();

        let scan = collect_pairs(&images, &labels).unwrap();

        assert_eq!(scan.pairs.len(), 1);
        assert_eq!(scan.pairs[0].image_file(), OsStr::from_bytes(b"scan\xe9.png"));
        assert_eq!(scan.pairs[0].label_file(), OsStr::from_bytes(b"scan\xe9.txt"));
        assert!(scan.missing_labels.is_empty());
        assert!(scan.orphan_labels.is_empty());
    }

    #[test]
    fn test_missing_labels_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("a.png"), b"x").unwrap();

        let scan = collect_pairs(&images, &dir.path().join("labels")).unwrap();

        assert!(scan.pairs.is_empty());
        assert_eq!(scan.missing_labels, vec!["a.png"]);
    }

    #[test]
    fn test_missing_images_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = collect_pairs(&dir.path().join("nope"), dir.path());
        assert!(matches!(result, Err(PartitionError::ReadDir { .. })));
    }
}
