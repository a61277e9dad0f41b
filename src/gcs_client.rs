// src/gcs_client.rs
//
// Google Cloud Storage backend using the gcloud-storage crate.
// Authentication uses Application Default Credentials (ADC), or anonymous
// access when a custom endpoint (emulator / proxy) is configured.

use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use futures::StreamExt;
use gcloud_storage::client::{Client, ClientConfig};
use gcloud_storage::http::Error as GcsHttpError;
use gcloud_storage::http::buckets::delete::DeleteBucketRequest;
use gcloud_storage::http::buckets::insert::{
    BucketCreationConfig, InsertBucketParam, InsertBucketRequest,
};
use gcloud_storage::http::buckets::IamConfiguration;
use gcloud_storage::http::buckets::iam_configuration::PublicAccessPrevention as GcsPublicAccess;
use gcloud_storage::http::objects::Object;
use gcloud_storage::http::objects::delete::DeleteObjectRequest;
use gcloud_storage::http::objects::download::Range;
use gcloud_storage::http::objects::get::GetObjectRequest;
use gcloud_storage::http::objects::list::ListObjectsRequest;
use gcloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::object_store::{
    BucketSpec, ByteStream, ObjectMetadata, ObjectStore, ObjectStream, PublicAccessPrevention,
};

/// `ObjectStore` backed by the GCS JSON API.
///
/// The underlying client pools connections and is safe to share between the
/// listing task and every deletion task.
pub struct GcsStore {
    client: Client,
}

impl GcsStore {
    /// Create a client.
    ///
    /// With no custom endpoint, credentials are discovered from:
    /// - GOOGLE_APPLICATION_CREDENTIALS env var (loaded by dotenvy)
    /// - Metadata server (if running on GCP)
    /// - gcloud CLI credentials
    pub async fn connect(config: &StoreConfig) -> StorageResult<Self> {
        let client_config = match &config.endpoint {
            Some(endpoint) => {
                info!("Using custom GCS endpoint: {}", endpoint);
                ClientConfig {
                    storage_endpoint: endpoint.clone(),
                    ..ClientConfig::default()
                }
                .anonymous()
            }
            None => {
                debug!("Initializing GCS client with Application Default Credentials");
                ClientConfig::default()
                    .with_auth()
                    .await
                    .map_err(|e| anyhow!("Failed to initialize GCS authentication: {}", e))?
            }
        };

        Ok(Self {
            client: Client::new(client_config),
        })
    }
}

/// Map a client error to our taxonomy; HTTP 404 is the only NotFound.
fn classify(err: GcsHttpError, op: &str, target: String) -> StorageError {
    if let GcsHttpError::Response(resp) = &err {
        if resp.code == 404 {
            return StorageError::NotFound(target);
        }
    }
    StorageError::Backend(anyhow!("GCS {} failed for {}: {}", op, target, err))
}

fn object_uri(bucket: &str, object: &str) -> String {
    format!("gs://{}/{}", bucket, object)
}

fn to_metadata(obj: Object) -> ObjectMetadata {
    ObjectMetadata {
        size: u64::try_from(obj.size).unwrap_or_default(),
        content_type: obj.content_type,
        content_encoding: obj.content_encoding,
        cache_control: obj.cache_control,
        etag: Some(obj.etag).filter(|e| !e.is_empty()),
        generation: obj.generation,
        metageneration: obj.metageneration,
        storage_class: obj.storage_class,
        md5_hash: obj.md5_hash,
        crc32c: obj.crc32c,
        created: obj
            .time_created
            .and_then(|t| DateTime::from_timestamp(t.unix_timestamp(), t.nanosecond())),
        updated: obj
            .updated
            .and_then(|t| DateTime::from_timestamp(t.unix_timestamp(), t.nanosecond())),
        metadata: obj
            .metadata
            .map(|m| m.into_iter().collect::<BTreeMap<_, _>>())
            .unwrap_or_default(),
        bucket: obj.bucket,
        name: obj.name,
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<ByteStream> {
        debug!("GCS GET: bucket={}, object={}", bucket, key);

        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };
        let stream = self
            .client
            .download_streamed_object(&request, &Range::default())
            .await
            .map_err(|e| classify(e, "GET", object_uri(bucket, key)))?;

        let uri = object_uri(bucket, key);
        Ok(stream
            .map(move |chunk| {
                chunk.map_err(|e| {
                    StorageError::Backend(anyhow!("GCS GET stream error for {}: {}", uri, e))
                })
            })
            .boxed())
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        debug!("GCS PUT: bucket={}, object={}, size={}", bucket, key, data.len());

        let upload_type = UploadType::Simple(Media::new(key.to_string()));
        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: bucket.to_string(),
                    ..Default::default()
                },
                data.to_vec(),
                &upload_type,
            )
            .await
            .map_err(|e| classify(e, "PUT", object_uri(bucket, key)))?;

        debug!("GCS PUT success: {} bytes", data.len());
        Ok(())
    }

    async fn stat(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        debug!("GCS STAT: bucket={}, object={}", bucket, key);

        let obj = self
            .client
            .get_object(&GetObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| classify(e, "STAT", object_uri(bucket, key)))?;

        Ok(to_metadata(obj))
    }

    /// Pages through `objects.list` lazily: the next page is only requested
    /// once the caller has consumed the current one.
    fn list<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ObjectStream<'a> {
        Box::pin(async_stream::stream! {
            debug!("GCS LIST: bucket={}, prefix={:?}", bucket, prefix);

            let mut page_token: Option<String> = None;
            loop {
                let request = ListObjectsRequest {
                    bucket: bucket.to_string(),
                    prefix: Some(prefix.to_string()).filter(|p| !p.is_empty()),
                    page_token: page_token.clone(),
                    ..Default::default()
                };

                let response = match self.client.list_objects(&request).await {
                    Ok(r) => r,
                    Err(e) => {
                        yield Err(classify(e, "LIST", object_uri(bucket, prefix)));
                        return;
                    }
                };

                if let Some(items) = response.items {
                    debug!("GCS LIST page received: {} objects", items.len());
                    for obj in items {
                        yield Ok(to_metadata(obj));
                    }
                }

                match response.next_page_token {
                    Some(next) if !next.is_empty() => page_token = Some(next),
                    _ => break,
                }
            }

            debug!("GCS LIST complete");
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        debug!("GCS DELETE: bucket={}, object={}", bucket, key);

        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| classify(e, "DELETE", object_uri(bucket, key)))?;

        debug!("GCS DELETE success");
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, spec: &BucketSpec) -> StorageResult<()> {
        debug!(
            "GCS CREATE BUCKET: bucket={}, project={}, location={}, class={}",
            bucket, spec.project, spec.location, spec.storage_class
        );

        let public_access_prevention = match spec.public_access_prevention {
            PublicAccessPrevention::Inherited => GcsPublicAccess::Inherited,
            PublicAccessPrevention::Enforced => GcsPublicAccess::Enforced,
        };

        let request = InsertBucketRequest {
            name: bucket.to_string(),
            param: InsertBucketParam {
                project: spec.project.clone(),
                ..Default::default()
            },
            bucket: BucketCreationConfig {
                location: spec.location.clone(),
                storage_class: Some(spec.storage_class.clone()),
                iam_configuration: Some(IamConfiguration {
                    uniform_bucket_level_access: None,
                    public_access_prevention: Some(public_access_prevention),
                }),
                ..Default::default()
            },
        };

        self.client
            .insert_bucket(&request)
            .await
            .map_err(|e| classify(e, "CREATE BUCKET", format!("gs://{}/", bucket)))?;

        debug!("GCS CREATE BUCKET success");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        debug!("GCS DELETE BUCKET: bucket={}", bucket);

        self.client
            .delete_bucket(&DeleteBucketRequest {
                bucket: bucket.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| classify(e, "DELETE BUCKET", format!("gs://{}/", bucket)))?;

        debug!("GCS DELETE BUCKET success");
        Ok(())
    }
}
