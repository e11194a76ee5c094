// Object storage interpreter

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use effectful_error::BackendResult;

use super::{check_payload, require, ObjectInterpreter, Rejection};
use crate::config::InterpreterConfig;
use crate::effect::{ObjectEffect, ObjectFetch, ObjectHandle, ObjectResult, Removal, StoredObject};
use crate::outcome::Outcome;

/// A bucketed blob store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> BackendResult<ObjectHandle>;

    async fn get(&self, bucket: &str, key: &str) -> BackendResult<Option<StoredObject>>;

    /// Returns whether an object was removed
    async fn delete(&self, bucket: &str, key: &str) -> BackendResult<bool>;

    /// Handles of the objects under `prefix`, in key order
    async fn list(&self, bucket: &str, prefix: Option<&str>) -> BackendResult<Vec<ObjectHandle>>;
}

/// [`ObjectInterpreter`] over an [`ObjectStore`]
#[derive(Clone)]
pub struct ObjectStoreInterpreter {
    store: Arc<dyn ObjectStore>,
    config: Arc<InterpreterConfig>,
}

impl ObjectStoreInterpreter {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<InterpreterConfig>) -> Self {
        Self { store, config }
    }

    async fn apply(&self, effect: &ObjectEffect) -> Result<ObjectResult, Rejection> {
        match effect {
            ObjectEffect::Put(op) => {
                require("bucket", &op.bucket)?;
                require("key", &op.key)?;
                check_payload(&self.config, "object body", op.body.len())?;
                let handle = self
                    .store
                    .put(
                        &op.bucket,
                        &op.key,
                        op.body.clone(),
                        op.content_type.as_deref(),
                    )
                    .await?;
                Ok(ObjectResult::Stored(handle))
            }
            ObjectEffect::Get(op) => {
                require("bucket", &op.bucket)?;
                require("key", &op.key)?;
                let fetch = match self.store.get(&op.bucket, &op.key).await? {
                    Some(object) => ObjectFetch::Found(object),
                    None => ObjectFetch::Missing,
                };
                Ok(ObjectResult::Fetch(fetch))
            }
            ObjectEffect::Delete(op) => {
                require("bucket", &op.bucket)?;
                require("key", &op.key)?;
                let existed = self.store.delete(&op.bucket, &op.key).await?;
                Ok(ObjectResult::Removal(Removal::from_existed(existed)))
            }
            ObjectEffect::List(op) => {
                require("bucket", &op.bucket)?;
                let handles = self.store.list(&op.bucket, op.prefix.as_deref()).await?;
                Ok(ObjectResult::Listing(handles))
            }
        }
    }
}

#[async_trait]
impl ObjectInterpreter for ObjectStoreInterpreter {
    async fn handle(&self, effect: ObjectEffect) -> Outcome<ObjectResult> {
        self.apply(&effect)
            .await
            .map_err(|rejection| rejection.into_error(effect.into(), &self.config))
    }
}
