// Cache family
//
// Byte values under string keys, with optional expiry.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::Removal;

/// Read a cached value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGet {
    pub key: String,
}

impl CacheGet {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Store a value; `ttl: None` defers to the interpreter's configured default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSet {
    pub key: String,
    pub value: Bytes,
    pub ttl: Option<Duration>,
}

impl CacheSet {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Evict a cached value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDelete {
    pub key: String,
}

impl CacheDelete {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Cache family effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CacheEffect {
    Get(CacheGet),
    Set(CacheSet),
    Delete(CacheDelete),
}

impl CacheEffect {
    pub fn operation(&self) -> &'static str {
        match self {
            CacheEffect::Get(_) => "get",
            CacheEffect::Set(_) => "set",
            CacheEffect::Delete(_) => "delete",
        }
    }
}

//-----------------------------------------------------------------------------
// Results
//-----------------------------------------------------------------------------

/// Outcome of a cache read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum CacheLookup {
    Hit(Bytes),
    Miss,
}

/// Acknowledgment of a cache write, with the expiry actually applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheAck {
    pub ttl: Option<Duration>,
}

/// Cache family results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "outcome", rename_all = "snake_case")]
pub enum CacheResult {
    Lookup(CacheLookup),
    Stored(CacheAck),
    Removal(Removal),
}

request!(CacheGet, CacheEffect::Get, Cache, CacheResult::Lookup => CacheLookup);
request!(CacheSet, CacheEffect::Set, Cache, CacheResult::Stored => CacheAck);
request!(CacheDelete, CacheEffect::Delete, Cache, CacheResult::Removal => Removal);
