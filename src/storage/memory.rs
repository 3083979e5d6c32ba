use std::collections::BTreeMap;

use super::{ObjectStore, StorageError, StoredObject};

/// In-process store keyed by bucket then object key
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&mut self, bucket: &str) {
        self.buckets.entry(bucket.to_string()).or_default();
    }

    /// Insert or replace an object, creating the bucket if needed
    pub fn put_object<I, K, V>(&mut self, bucket: &str, key: &str, body: Vec<u8>, metadata: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let object = StoredObject {
            key: key.to_string(),
            body,
            metadata: metadata
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        };
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }
}

impl ObjectStore for MemoryStore {
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self
            .buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn fetch_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filters_prefix() {
        let mut store = MemoryStore::new();
        store.put_object("b", "a/1.png", vec![1], Vec::<(String, String)>::new());
        store.put_object("b", "z/2.png", vec![2], [("table", "eA==")]);

        assert_eq!(store.list_objects("b", "a/").unwrap(), vec!["a/1.png"]);
        assert_eq!(store.list_objects("b", "").unwrap().len(), 2);

        let object = store.fetch_object("b", "z/2.png").unwrap();
        assert_eq!(object.file_name(), "2.png");
        assert_eq!(object.metadata.get("table").map(String::as_str), Some("eA=="));
    }

    #[test]
    fn test_missing_bucket_and_key() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.list_objects("nope", ""),
            Err(StorageError::BucketNotFound(_))
        ));

        let mut store = MemoryStore::new();
        store.create_bucket("b");
        assert!(matches!(
            store.fetch_object("b", "x.png"),
            Err(StorageError::ObjectNotFound { .. })
        ));
    }
}
