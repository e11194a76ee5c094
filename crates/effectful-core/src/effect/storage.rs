// Storage family
//
// Record database operations: keyed documents grouped into tables.

use serde::{Deserialize, Serialize};

use super::Removal;

/// A stored record body
pub type Document = serde_json::Value;

/// Fetch one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRecord {
    pub table: String,
    pub key: String,
}

impl GetRecord {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }
}

/// Write one record, optionally only if its current version matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRecord {
    pub table: String,
    pub key: String,
    pub value: Document,
    /// `Some(0)` means "only if absent"
    pub expected_version: Option<u64>,
}

impl PutRecord {
    pub fn new(table: impl Into<String>, key: impl Into<String>, value: Document) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            value,
            expected_version: None,
        }
    }

    /// Make the write conditional on the record's current version
    pub fn if_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Remove one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRecord {
    pub table: String,
    pub key: String,
}

impl DeleteRecord {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }
}

/// Scan the records of a table whose keys start with `prefix`, in key order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecords {
    pub table: String,
    pub prefix: String,
    pub limit: Option<usize>,
}

impl QueryRecords {
    pub fn new(table: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            prefix: prefix.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Storage family effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StorageEffect {
    Get(GetRecord),
    Put(PutRecord),
    Delete(DeleteRecord),
    Query(QueryRecords),
}

impl StorageEffect {
    pub fn operation(&self) -> &'static str {
        match self {
            StorageEffect::Get(_) => "get_record",
            StorageEffect::Put(_) => "put_record",
            StorageEffect::Delete(_) => "delete_record",
            StorageEffect::Query(_) => "query_records",
        }
    }
}

//-----------------------------------------------------------------------------
// Results
//-----------------------------------------------------------------------------

/// Outcome of a record lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Lookup {
    Found(Document),
    NotFound,
}

/// Outcome of a record write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Write {
    /// The record now holds the written value at `version`
    Written { version: u64 },
    /// The conditional write lost; `current` is the version actually stored
    Conflict { current: Option<u64> },
}

/// One record returned by a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Document,
    pub version: u64,
}

/// Storage family results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "outcome", rename_all = "snake_case")]
pub enum StorageResult {
    Lookup(Lookup),
    Write(Write),
    Removal(Removal),
    Entries(Vec<Entry>),
}

request!(GetRecord, StorageEffect::Get, Storage, StorageResult::Lookup => Lookup);
request!(PutRecord, StorageEffect::Put, Storage, StorageResult::Write => Write);
request!(DeleteRecord, StorageEffect::Delete, Storage, StorageResult::Removal => Removal);
request!(QueryRecords, StorageEffect::Query, Storage, StorageResult::Entries => Vec<Entry>);
