//! Object-storage collaborator.
//!
//! The pipeline only needs two capabilities from a storage provider: listing
//! keys under a bucket/prefix and fetching one object with its metadata.
//! Provider configuration (credentials, region) belongs to the implementor.

mod local;
mod memory;

pub use local::{LocalBucketStore, METADATA_SIDECAR_SUFFIX};
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::path::PathBuf;

/// One image payload plus its metadata fields (class name -> encoded label text)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub body: Vec<u8>,
    pub metadata: BTreeMap<String, String>,
}

impl StoredObject {
    /// Last `/`-separated segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("bucket {0:?} does not exist")]
    BucketNotFound(String),
    #[error("object {key:?} not found in bucket {bucket:?}")]
    ObjectNotFound { bucket: String, key: String },
    #[error("{0:?} escapes the store root")]
    OutsideRoot(String),
    #[error("failed to list {path:?}: {source}")]
    List {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid metadata sidecar {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Listing and fetching objects. Implementations must be shareable across
/// extraction worker threads.
pub trait ObjectStore: Send + Sync {
    /// Keys under `prefix` in `bucket`, in a stable order
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    fn fetch_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError>;
}
