// src/uri.rs
//
// Parsing of `gs://bucket[/path]` object locators.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::GCS_SCHEME;
use crate::error::StorageError;

static LOCATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^gs://([^/]+)/?(.*)$").expect("locator pattern is valid"));

/// A bucket plus an object path (or prefix) inside it.
///
/// `path` may be empty, which denotes the bucket root: every object for
/// prefix operations, the bucket itself for `rmb`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    bucket: String,
    path: String,
}

impl ObjectLocator {
    /// Parse a locator such as `gs://my-bucket/logs/2024/`.
    ///
    /// # Examples
    /// ```
    /// use gslite::uri::ObjectLocator;
    ///
    /// let loc = ObjectLocator::parse("gs://my-bucket/path/to/file.txt").unwrap();
    /// assert_eq!(loc.bucket(), "my-bucket");
    /// assert_eq!(loc.path(), "path/to/file.txt");
    ///
    /// // Bucket-only locators are fine for prefix operations
    /// let root = ObjectLocator::parse("gs://my-bucket").unwrap();
    /// assert_eq!(root.path(), "");
    /// ```
    pub fn parse(text: &str) -> Result<Self, StorageError> {
        let caps = LOCATOR_RE
            .captures(text)
            .ok_or_else(|| StorageError::MalformedLocator(text.to_string()))?;

        Ok(Self {
            bucket: caps[1].to_string(),
            path: caps[2].to_string(),
        })
    }

    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        if bucket.is_empty() || bucket.contains('/') {
            return Err(StorageError::MalformedLocator(format!("{GCS_SCHEME}{bucket}")));
        }
        Ok(Self { bucket, path: path.into() })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// True when the locator names the bucket root.
    pub fn is_bucket_root(&self) -> bool {
        self.path.is_empty()
    }
}

impl FromStr for ObjectLocator {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", GCS_SCHEME, self.bucket, self.path)
    }
}
