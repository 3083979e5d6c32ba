use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{ObjectStore, StorageError, StoredObject};

/// Suffix of the JSON file holding an object's metadata map
pub const METADATA_SIDECAR_SUFFIX: &str = ".metadata.json";

/// Filesystem-backed store: `<root>/<bucket>/<key>`.
///
/// Metadata for `<key>` lives in an optional `<key>.metadata.json` holding a
/// JSON object of field name to encoded value. Sidecars are never listed.
#[derive(Debug, Clone)]
pub struct LocalBucketStore {
    root: PathBuf,
}

impl LocalBucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only plain path segments are accepted, so a bucket or key can never
    /// resolve above the store root.
    fn contained(name: &str) -> Result<&Path, StorageError> {
        let path = Path::new(name);
        if path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            Ok(path)
        } else {
            Err(StorageError::OutsideRoot(name.to_string()))
        }
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        let dir = self.root.join(Self::contained(bucket)?);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StorageError::BucketNotFound(bucket.to_string()))
        }
    }

    fn sidecar_path(object_path: &Path) -> PathBuf {
        let mut name = object_path.as_os_str().to_os_string();
        name.push(METADATA_SIDECAR_SUFFIX);
        PathBuf::from(name)
    }

    fn read_metadata(object_path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        let path = Self::sidecar_path(object_path);
        if !path.is_file() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| StorageError::Metadata { path, source })
    }
}

impl ObjectStore for LocalBucketStore {
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        let mut keys = Vec::new();

        for entry in WalkDir::new(&dir).follow_links(true) {
            let entry = entry.map_err(|source| StorageError::List {
                path: dir.clone(),
                source: source.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&dir) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if key.ends_with(METADATA_SIDECAR_SUFFIX) || !key.starts_with(prefix) {
                continue;
            }
            keys.push(key);
        }

        keys.sort();
        debug!("Listed {} objects in {:?} with prefix {:?}", keys.len(), bucket, prefix);
        Ok(keys)
    }

    fn fetch_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError> {
        let path = self.bucket_dir(bucket)?.join(Self::contained(key)?);
        if !path.is_file() {
            return Err(StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        let body = fs::read(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
        let metadata = Self::read_metadata(&path)?;

        Ok(StoredObject {
            key: key.to_string(),
            body,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_bucket(root: &Path) {
        let bucket = root.join("scans");
        fs::create_dir_all(bucket.join("2024")).unwrap();
        fs::write(bucket.join("2024").join("b.png"), b"png-b").unwrap();
        fs::write(bucket.join("a.png"), b"png-a").unwrap();
        fs::write(
            bucket.join("a.png.metadata.json"),
            r#"{"table": "MCAwLjUgMC41IDAuMiAwLjM="}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_list_skips_sidecars_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        seed_bucket(dir.path());
        let store = LocalBucketStore::new(dir.path());

        assert_eq!(
            store.list_objects("scans", "").unwrap(),
            vec!["2024/b.png", "a.png"]
        );
        assert_eq!(store.list_objects("scans", "2024/").unwrap(), vec!["2024/b.png"]);
    }

    #[test]
    fn test_fetch_reads_body_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        seed_bucket(dir.path());
        let store = LocalBucketStore::new(dir.path());

        let object = store.fetch_object("scans", "a.png").unwrap();
        assert_eq!(object.body, b"png-a");
        assert_eq!(object.metadata.len(), 1);

        let object = store.fetch_object("scans", "2024/b.png").unwrap();
        assert!(object.metadata.is_empty());
        assert_eq!(object.file_name(), "b.png");
    }

    #[test]
    fn test_missing_bucket_and_bad_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        seed_bucket(dir.path());
        let store = LocalBucketStore::new(dir.path());

        assert!(matches!(
            store.list_objects("other", ""),
            Err(StorageError::BucketNotFound(_))
        ));

        fs::write(dir.path().join("scans").join("a.png.metadata.json"), "[1,2]").unwrap();
        assert!(matches!(
            store.fetch_object("scans", "a.png"),
            Err(StorageError::Metadata { .. })
        ));
    }

    #[test]
    fn test_keys_cannot_leave_the_bucket() {
        let dir = tempfile::tempdir().unwrap();
        seed_bucket(dir.path());
        fs::write(dir.path().join("secret.png"), b"outside").unwrap();
        let store = LocalBucketStore::new(dir.path());

        for key in ["../secret.png", "2024/../../secret.png", "/etc/passwd"] {
            assert!(
                matches!(store.fetch_object("scans", key), Err(StorageError::OutsideRoot(_))),
                "{}",
                key
            );
        }
        assert!(matches!(
            store.list_objects("..", ""),
            Err(StorageError::OutsideRoot(_))
        ));
        assert_eq!(store.fetch_object("scans", "./a.png").unwrap().body, b"png-a");
    }
}
