// tests/common/mod.rs
//
// Common test utilities: an in-memory ObjectStore with paging, latency and
// failure injection, plus live-bucket configuration for the ignored GCS tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::env;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use gslite::object_store::{BucketSpec, ByteStream, ObjectStream};
use gslite::{ObjectMetadata, ObjectStore, StorageError, StorageResult};

/// Test configuration for live GCS tests
pub struct TestConfig {
    /// The GCS bucket to use for testing
    pub bucket: String,
    /// The prefix for all test objects
    pub test_prefix: String,
}

/// Get live test configuration from the environment, if a bucket is set.
pub fn get_test_config() -> Option<TestConfig> {
    let bucket = env::var("GCS_TEST_BUCKET").ok()?;
    Some(TestConfig {
        bucket,
        test_prefix: "gslite-test".to_string(),
    })
}

/// Print test header with formatting
pub fn print_test_header(test_name: &str) {
    println!("\n{}", "=".repeat(60));
    println!("TEST: {}", test_name);
    println!("{}", "=".repeat(60));
}

fn outage(what: &str) -> StorageError {
    StorageError::Backend(anyhow!("503 Service Unavailable: {}", what))
}

/// In-memory object store.
///
/// Listing is lexicographic and paged; deletes can be slowed down and made to
/// fail per key. Every delete call is counted, along with the peak number of
/// deletes running at once.
#[derive(Default)]
pub struct MockStore {
    objects: Mutex<BTreeMap<(String, String), Bytes>>,
    buckets: Mutex<BTreeSet<String>>,
    page_size: usize,
    delete_latency: Duration,
    failing_deletes: Mutex<HashMap<String, String>>,
    stale_listing: BTreeSet<(String, String)>,
    list_failure_page: Option<usize>,
    stat_failure: Option<String>,

    pub delete_calls: AtomicUsize,
    pub pages_served: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    deleted: Mutex<Vec<String>>,
    created_buckets: Mutex<Vec<(String, BucketSpec)>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            page_size: 1000,
            ..Default::default()
        }
    }

    /// Seed `bucket` with empty objects named `names`.
    pub fn with_objects<S: AsRef<str>>(self, bucket: &str, names: &[S]) -> Self {
        {
            let mut objects = self.objects.lock().unwrap();
            for name in names {
                objects.insert((bucket.to_string(), name.as_ref().to_string()), Bytes::new());
            }
        }
        self.with_bucket(bucket)
    }

    pub fn with_object(self, bucket: &str, name: &str, body: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), name.to_string()), Bytes::copy_from_slice(body));
        self.with_bucket(bucket)
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.buckets.lock().unwrap().insert(bucket.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_delete_latency(mut self, latency: Duration) -> Self {
        self.delete_latency = latency;
        self
    }

    /// Deleting `name` fails with a backend error carrying `message`.
    pub fn fail_delete(self, name: &str, message: &str) -> Self {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(name.to_string(), message.to_string());
        self
    }

    /// List `name` even though no such object exists, as if another client
    /// removed it between the listing and the delete.
    pub fn with_stale_entry(mut self, bucket: &str, name: &str) -> Self {
        self.stale_listing.insert((bucket.to_string(), name.to_string()));
        self
    }

    /// Listing fails when page `page` (0-based) is requested.
    pub fn fail_listing_at_page(mut self, page: usize) -> Self {
        self.list_failure_page = Some(page);
        self
    }

    /// `stat` fails with a backend error for every object.
    pub fn fail_stat(mut self, message: &str) -> Self {
        self.stat_failure = Some(message.to_string());
        self
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn created_buckets(&self) -> Vec<(String, BucketSpec)> {
        self.created_buckets.lock().unwrap().clone()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains(bucket)
    }

    pub fn contains(&self, bucket: &str, name: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), name.to_string()))
    }

    pub fn body(&self, bucket: &str, name: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }

    fn snapshot(&self, bucket: &str, prefix: &str) -> Vec<ObjectMetadata> {
        let objects = self.objects.lock().unwrap();
        let mut names: BTreeMap<&str, u64> = objects
            .iter()
            .filter(|((b, name), _)| b == bucket && name.starts_with(prefix))
            .map(|((_, name), body)| (name.as_str(), body.len() as u64))
            .collect();
        for (b, name) in &self.stale_listing {
            if b == bucket && name.starts_with(prefix) {
                names.entry(name.as_str()).or_insert(0);
            }
        }

        names
            .into_iter()
            .map(|(name, size)| ObjectMetadata {
                bucket: bucket.to_string(),
                name: name.to_string(),
                size,
                generation: 1,
                metageneration: 1,
                storage_class: Some("STANDARD".to_string()),
                ..Default::default()
            })
            .collect()
    }
}

struct InFlight<'a>(&'a MockStore);

impl<'a> InFlight<'a> {
    fn enter(store: &'a MockStore) -> Self {
        let now = store.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        store.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(store)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<ByteStream> {
        let body = self
            .body(bucket, key)
            .ok_or_else(|| StorageError::NotFound(format!("gs://{}/{}", bucket, key)))?;
        // Two chunks, to exercise chunked writes.
        let split = body.len() / 2;
        let chunks = vec![Ok(body.slice(..split)), Ok(body.slice(split..))];
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        if !self.has_bucket(bucket) {
            return Err(StorageError::NotFound(format!("gs://{}/", bucket)));
        }
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn stat(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        if let Some(message) = &self.stat_failure {
            return Err(outage(message));
        }
        if !self.contains(bucket, key) {
            return Err(StorageError::NotFound(format!("gs://{}/{}", bucket, key)));
        }
        self.snapshot(bucket, key)
            .into_iter()
            .find(|m| m.name == key)
            .ok_or_else(|| StorageError::NotFound(format!("gs://{}/{}", bucket, key)))
    }

    fn list<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ObjectStream<'a> {
        Box::pin(async_stream::stream! {
            let all = self.snapshot(bucket, prefix);
            let mut page = 0usize;
            let mut pages = all.chunks(self.page_size);
            loop {
                tokio::task::yield_now().await;
                if self.list_failure_page == Some(page) {
                    yield Err(outage("list"));
                    return;
                }
                let Some(items) = pages.next() else { break };
                self.pages_served.fetch_add(1, Ordering::SeqCst);
                for meta in items {
                    yield Ok(meta.clone());
                }
                page += 1;
            }
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(self);

        if self.delete_latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delete_latency).await;
        }

        if let Some(message) = self.failing_deletes.lock().unwrap().get(key) {
            return Err(outage(message));
        }

        let removed = self
            .objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        match removed {
            Some(_) => {
                self.deleted.lock().unwrap().push(key.to_string());
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("gs://{}/{}", bucket, key))),
        }
    }

    async fn create_bucket(&self, bucket: &str, spec: &BucketSpec) -> StorageResult<()> {
        let mut buckets = self.buckets.lock().unwrap();
        if !buckets.insert(bucket.to_string()) {
            return Err(StorageError::Backend(anyhow!("409 Conflict: bucket {} exists", bucket)));
        }
        self.created_buckets
            .lock()
            .unwrap()
            .push((bucket.to_string(), spec.clone()));
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.object_count(bucket) > 0 {
            return Err(StorageError::Backend(anyhow!("409 Conflict: bucket {} not empty", bucket)));
        }
        if self.buckets.lock().unwrap().remove(bucket) {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!("gs://{}/", bucket)))
        }
    }
}
