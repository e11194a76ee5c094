// Record database interpreter

use std::sync::Arc;

use async_trait::async_trait;

use effectful_error::BackendResult;

use super::{check_payload, require, Rejection, StorageInterpreter};
use crate::config::InterpreterConfig;
use crate::effect::{Document, Entry, Lookup, Removal, StorageEffect, StorageResult, Write};
use crate::outcome::Outcome;

/// A keyed, versioned document store
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, table: &str, key: &str) -> BackendResult<Lookup>;

    /// Write `value`; with `expected_version` set, only if the stored
    /// version matches (`Some(0)` meaning absent)
    async fn put(
        &self,
        table: &str,
        key: &str,
        value: Document,
        expected_version: Option<u64>,
    ) -> BackendResult<Write>;

    /// Returns whether a record was removed
    async fn delete(&self, table: &str, key: &str) -> BackendResult<bool>;

    /// Records whose key starts with `prefix`, in key order
    async fn query(&self, table: &str, prefix: &str, limit: Option<usize>)
        -> BackendResult<Vec<Entry>>;
}

/// [`StorageInterpreter`] over a [`RecordStore`]
#[derive(Clone)]
pub struct RecordStoreInterpreter {
    store: Arc<dyn RecordStore>,
    config: Arc<InterpreterConfig>,
}

impl RecordStoreInterpreter {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<InterpreterConfig>) -> Self {
        Self { store, config }
    }

    async fn apply(&self, effect: &StorageEffect) -> Result<StorageResult, Rejection> {
        match effect {
            StorageEffect::Get(op) => {
                require("table", &op.table)?;
                require("key", &op.key)?;
                let lookup = self.store.get(&op.table, &op.key).await?;
                Ok(StorageResult::Lookup(lookup))
            }
            StorageEffect::Put(op) => {
                require("table", &op.table)?;
                require("key", &op.key)?;
                let size = serde_json::to_vec(&op.value)
                    .map_err(|e| Rejection::invalid(format!("unencodable record: {e}")))?
                    .len();
                check_payload(&self.config, "record", size)?;
                let write = self
                    .store
                    .put(&op.table, &op.key, op.value.clone(), op.expected_version)
                    .await?;
                Ok(StorageResult::Write(write))
            }
            StorageEffect::Delete(op) => {
                require("table", &op.table)?;
                require("key", &op.key)?;
                let existed = self.store.delete(&op.table, &op.key).await?;
                Ok(StorageResult::Removal(Removal::from_existed(existed)))
            }
            StorageEffect::Query(op) => {
                require("table", &op.table)?;
                if op.limit == Some(0) {
                    return Err(Rejection::invalid("query limit must be positive"));
                }
                let entries = self.store.query(&op.table, &op.prefix, op.limit).await?;
                Ok(StorageResult::Entries(entries))
            }
        }
    }
}

#[async_trait]
impl StorageInterpreter for RecordStoreInterpreter {
    async fn handle(&self, effect: StorageEffect) -> Outcome<StorageResult> {
        self.apply(&effect)
            .await
            .map_err(|rejection| rejection.into_error(effect.into(), &self.config))
    }
}
