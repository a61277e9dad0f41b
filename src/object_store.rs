// src/object_store.rs
//
// Pluggable object-store abstraction. The CLI only ships the GCS adapter
// (gcs_client.rs); tests plug in an in-memory store behind the same trait.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::constants::{DEFAULT_BUCKET_LOCATION, DEFAULT_STORAGE_CLASS, GCS_SCHEME};
use crate::error::StorageResult;

/// Object body as a stream of chunks.
pub type ByteStream = BoxStream<'static, StorageResult<Bytes>>;

/// Lazy, forward-only listing. Ends after the last page or the first error.
pub type ObjectStream<'a> = BoxStream<'a, StorageResult<ObjectMetadata>>;

/// Shared handle used by commands and by deletion tasks.
pub type DynObjectStore = Arc<dyn ObjectStore>;

/// Fully-qualified reference to one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub bucket: String,
    pub name: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", GCS_SCHEME, self.bucket, self.name)
    }
}

/// Provider-neutral object metadata, printed by `stat` and `list --jsonl`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub bucket: String,
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub generation: i64,
    pub metageneration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc32c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            bucket: self.bucket.clone(),
            name: self.name.clone(),
        }
    }
}

/// Bucket-level public access prevention setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PublicAccessPrevention {
    #[default]
    Inherited,
    Enforced,
}

/// Settings for a new bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub project: String,
    pub location: String,
    pub storage_class: String,
    pub public_access_prevention: PublicAccessPrevention,
}

impl BucketSpec {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: DEFAULT_BUCKET_LOCATION.to_string(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            public_access_prevention: PublicAccessPrevention::default(),
        }
    }
}

/// The operations gslite needs from a storage backend.
///
/// Missing objects and buckets are reported as
/// [`StorageError::NotFound`](crate::error::StorageError::NotFound) so
/// callers can decide per command whether absence is an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open an object for reading.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<ByteStream>;

    /// Upload `data` as a single object; the write is committed when this returns `Ok`.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()>;

    /// Fetch object metadata without the body.
    async fn stat(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata>;

    /// Enumerate every object whose name starts with `prefix`, page by page.
    fn list<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ObjectStream<'a>;

    /// Delete a single object.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    async fn create_bucket(&self, bucket: &str, spec: &BucketSpec) -> StorageResult<()>;

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()>;
}
