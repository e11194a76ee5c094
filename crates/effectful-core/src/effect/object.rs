// Object family
//
// Blob storage: opaque bodies addressed by bucket and key.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Removal;

/// Store a body under `bucket/key`, replacing any previous object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl PutObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Fetch an object and its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetObject {
    pub bucket: String,
    pub key: String,
}

impl GetObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Remove an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteObject {
    pub bucket: String,
    pub key: String,
}

impl DeleteObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// List object handles in a bucket, optionally restricted to a key prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjects {
    pub bucket: String,
    pub prefix: Option<String>,
}

impl ListObjects {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Object family effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ObjectEffect {
    Put(PutObject),
    Get(GetObject),
    Delete(DeleteObject),
    List(ListObjects),
}

impl ObjectEffect {
    pub fn operation(&self) -> &'static str {
        match self {
            ObjectEffect::Put(_) => "put_object",
            ObjectEffect::Get(_) => "get_object",
            ObjectEffect::Delete(_) => "delete_object",
            ObjectEffect::List(_) => "list_objects",
        }
    }
}

//-----------------------------------------------------------------------------
// Results
//-----------------------------------------------------------------------------

/// Metadata of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHandle {
    pub bucket: String,
    pub key: String,
    /// Content digest of the body
    pub etag: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// A stored object together with its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub handle: ObjectHandle,
    pub body: Bytes,
}

/// Outcome of an object fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "object", rename_all = "snake_case")]
pub enum ObjectFetch {
    Found(StoredObject),
    Missing,
}

/// Object family results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "outcome", rename_all = "snake_case")]
pub enum ObjectResult {
    Stored(ObjectHandle),
    Fetch(ObjectFetch),
    Removal(Removal),
    Listing(Vec<ObjectHandle>),
}

request!(PutObject, ObjectEffect::Put, Object, ObjectResult::Stored => ObjectHandle);
request!(GetObject, ObjectEffect::Get, Object, ObjectResult::Fetch => ObjectFetch);
request!(DeleteObject, ObjectEffect::Delete, Object, ObjectResult::Removal => Removal);
request!(ListObjects, ObjectEffect::List, Object, ObjectResult::Listing => Vec<ObjectHandle>);
