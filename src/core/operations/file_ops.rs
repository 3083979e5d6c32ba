use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Result type for file operations
pub type FileOpResult<T> = Result<T, FileOpError>;

/// Error types for file operations
#[derive(Debug, thiserror::Error)]
pub enum FileOpError {
    #[error("failed to create directory {path:?}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy {src:?} to {dest:?}: {source}")]
    CopyFailed {
        src: PathBuf,
        dest: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Create a directory and all of its parents if they are missing.
pub fn ensure_dir(path: &Path) -> FileOpResult<()> {
    fs::create_dir_all(path).map_err(|source| FileOpError::CreateDirFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy `src` to `dest`, overwriting `dest`. The source is left untouched.
///
/// # Returns
/// * `Ok(bytes)` number of bytes copied
/// * `Err(FileOpError::CopyFailed)` if the copy failed
pub fn copy_file(src: &Path, dest: &Path) -> FileOpResult<u64> {
    debug!("Copying {:?} -> {:?}", src, dest);
    fs::copy(src, dest).map_err(|source| {
        error!("Failed to copy file from {:?} to {:?}: {}", src, dest, source);
        FileOpError::CopyFailed {
            src: src.to_path_buf(),
            dest: dest.to_path_buf(),
            source,
        }
    })
}

/// Write `contents` to `path`, replacing any existing file.
pub fn write_file(path: &Path, contents: &[u8]) -> FileOpResult<()> {
    fs::write(path, contents).map_err(|source| FileOpError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write an image and its label file as a unit.
///
/// The image goes first. If the label cannot be written the image is removed
/// again, so a failed call never leaves an image without its label.
pub fn write_pair(
    image_path: &Path,
    image_bytes: &[u8],
    label_path: &Path,
    label_text: &str,
) -> FileOpResult<()> {
    write_file(image_path, image_bytes)?;

    if let Err(e) = write_file(label_path, label_text.as_bytes()) {
        error!("Failed to write label {:?}, rolling back image: {}", label_path, e);
        if let Err(cleanup) = fs::remove_file(image_path) {
            warn!("Failed to remove image {:?} after label failure: {}", image_path, cleanup);
        }
        return Err(e);
    }

    Ok(())
}
