// In-memory record store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use effectful_core::effect::{Document, Entry, Lookup, Write};
use effectful_core::interpreter::RecordStore;
use effectful_error::BackendResult;

use crate::faults::Faults;

#[derive(Debug, Clone)]
struct Versioned {
    value: Document,
    version: u64,
}

/// Versioned records held in memory, one ordered map per table.
///
/// Versions start at 1 and increase by one on every write to the key.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, BTreeMap<String, Versioned>>>,
    faults: Faults,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection for `get`, `put`, `delete` and `query`
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Number of records in `table`
    pub fn len(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, table: &str, key: &str) -> BackendResult<Lookup> {
        self.faults.check("get")?;
        let tables = self.tables.lock();
        let lookup = match tables.get(table).and_then(|records| records.get(key)) {
            Some(record) => Lookup::Found(record.value.clone()),
            None => Lookup::NotFound,
        };
        Ok(lookup)
    }

    async fn put(
        &self,
        table: &str,
        key: &str,
        value: Document,
        expected_version: Option<u64>,
    ) -> BackendResult<Write> {
        self.faults.check("put")?;
        let mut tables = self.tables.lock();
        let records = tables.entry(table.to_string()).or_default();
        let current = records.get(key).map(|record| record.version);

        if let Some(expected) = expected_version {
            if current.unwrap_or(0) != expected {
                return Ok(Write::Conflict { current });
            }
        }

        let version = current.unwrap_or(0) + 1;
        records.insert(key.to_string(), Versioned { value, version });
        Ok(Write::Written { version })
    }

    async fn delete(&self, table: &str, key: &str) -> BackendResult<bool> {
        self.faults.check("delete")?;
        let mut tables = self.tables.lock();
        let removed = tables
            .get_mut(table)
            .map_or(false, |records| records.remove(key).is_some());
        Ok(removed)
    }

    async fn query(
        &self,
        table: &str,
        prefix: &str,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Entry>> {
        self.faults.check("query")?;
        let tables = self.tables.lock();
        let Some(records) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let entries = records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(key, record)| Entry {
                key: key.clone(),
                value: record.value.clone(),
                version: record.version,
            })
            .collect();
        Ok(entries)
    }
}
