// In-memory object store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use effectful_core::effect::{ObjectHandle, StoredObject};
use effectful_core::interpreter::ObjectStore;
use effectful_error::BackendResult;

use crate::faults::Faults;

/// Content tag for a body: hex-encoded SHA-256
pub fn etag(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Buckets of objects held in memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<HashMap<String, BTreeMap<String, StoredObject>>>,
    faults: Faults,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection for `put`, `get`, `delete` and `list`
    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> BackendResult<ObjectHandle> {
        self.faults.check("put")?;
        let handle = ObjectHandle {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag: etag(&body),
            size: body.len() as u64,
            content_type: content_type.map(str::to_string),
            last_modified: Utc::now(),
        };
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    handle: handle.clone(),
                    body,
                },
            );
        Ok(handle)
    }

    async fn get(&self, bucket: &str, key: &str) -> BackendResult<Option<StoredObject>> {
        self.faults.check("get")?;
        let buckets = self.buckets.lock();
        Ok(buckets.get(bucket).and_then(|objects| objects.get(key)).cloned())
    }

    async fn delete(&self, bucket: &str, key: &str) -> BackendResult<bool> {
        self.faults.check("delete")?;
        let mut buckets = self.buckets.lock();
        Ok(buckets
            .get_mut(bucket)
            .map_or(false, |objects| objects.remove(key).is_some()))
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> BackendResult<Vec<ObjectHandle>> {
        self.faults.check("list")?;
        let buckets = self.buckets.lock();
        let prefix = prefix.unwrap_or("");
        let handles = buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .values()
                    .filter(|object| object.handle.key.starts_with(prefix))
                    .map(|object| object.handle.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_is_sha256_hex() {
        assert_eq!(
            etag(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let store = MemoryObjectStore::new();
        let handle = store
            .put("media", "img/a.png", Bytes::from_static(b"png"), Some("image/png"))
            .await
            .unwrap();
        assert_eq!(handle.size, 3);
        assert_eq!(handle.etag, etag(b"png"));
        assert_eq!(handle.content_type.as_deref(), Some("image/png"));

        store
            .put("media", "doc/b.txt", Bytes::from_static(b"txt"), None)
            .await
            .unwrap();

        let fetched = store.get("media", "img/a.png").await.unwrap().unwrap();
        assert_eq!(fetched.body, Bytes::from_static(b"png"));
        assert_eq!(fetched.handle, handle);

        let listed = store.list("media", Some("img/")).await.unwrap();
        assert_eq!(listed, vec![handle]);
        assert_eq!(store.list("media", None).await.unwrap().len(), 2);

        assert_eq!(store.delete("media", "img/a.png").await, Ok(true));
        assert_eq!(store.get("media", "img/a.png").await, Ok(None));
        assert_eq!(store.delete("media", "img/a.png").await, Ok(false));
    }
}
