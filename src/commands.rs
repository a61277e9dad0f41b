// src/commands.rs
//
// One handler per CLI subcommand. Handlers take the store and the I/O
// streams explicitly so they run the same against GCS or a test store.

use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

use crate::config::bucket_name_from_arg;
use crate::constants::{EXIT_FAILURE, EXIT_NOT_FOUND, EXIT_SUCCESS};
use crate::delete::{PrefixDeleter, delete_object};
use crate::error::{StorageError, StorageResult};
use crate::list::{ListFormat, list_to};
use crate::object_store::{BucketSpec, DynObjectStore, ObjectStore};
use crate::uri::ObjectLocator;

/// Print the concatenation of objects, in argument order.
pub async fn cat<W>(store: &dyn ObjectStore, args: &[String], out: &mut W) -> StorageResult<()>
where
    W: Write + ?Sized,
{
    for arg in args {
        let loc = ObjectLocator::parse(arg)?;
        let mut body = store.get(loc.bucket(), loc.path()).await?;
        while let Some(chunk) = body.next().await {
            out.write_all(&chunk?)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Upload everything readable from `input` as one object. Returns the byte count.
pub async fn put<R>(store: &dyn ObjectStore, arg: &str, input: &mut R) -> StorageResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let loc = ObjectLocator::parse(arg)?;
    if loc.is_bucket_root() {
        return Err(StorageError::InvalidArgument(format!("{loc} has no object name")));
    }

    let mut buf = Vec::new();
    input.read_to_end(&mut buf).await?;
    let len = buf.len() as u64;

    store.put(loc.bucket(), loc.path(), Bytes::from(buf)).await?;
    info!("Uploaded {} bytes to {}", len, loc);
    Ok(len)
}

/// Print object metadata as a single JSON document.
pub async fn stat<W>(store: &dyn ObjectStore, arg: &str, compact: bool, out: &mut W) -> StorageResult<()>
where
    W: Write + ?Sized,
{
    let loc = ObjectLocator::parse(arg)?;
    let meta = store.stat(loc.bucket(), loc.path()).await?;

    let doc = if compact {
        serde_json::to_string(&meta)
    } else {
        serde_json::to_string_pretty(&meta)
    }
    .map_err(anyhow::Error::from)?;

    writeln!(out, "{}", doc)?;
    out.flush()?;
    Ok(())
}

/// Succeeds if the object exists; `NotFound` otherwise.
pub async fn exists(store: &dyn ObjectStore, arg: &str) -> StorageResult<()> {
    let loc = ObjectLocator::parse(arg)?;
    store.stat(loc.bucket(), loc.path()).await.map(|_| ())
}

/// List every object under each locator.
pub async fn list<W>(
    store: &dyn ObjectStore,
    args: &[String],
    format: ListFormat,
    out: &mut W,
) -> StorageResult<()>
where
    W: Write + ?Sized,
{
    for arg in args {
        let loc = ObjectLocator::parse(arg)?;
        let n = list_to(store, &loc, format, out).await?;
        info!("Listed {} objects under {}", n, loc);
    }
    out.flush()?;
    Ok(())
}

/// Remove objects. With `recursive`, every object under each prefix is removed
/// with up to `jobs` deletes in flight. Locators are processed in order and
/// the first failure ends the command.
pub async fn rm(store: &DynObjectStore, args: &[String], recursive: bool, jobs: usize) -> StorageResult<()> {
    for arg in args {
        let loc = ObjectLocator::parse(arg)?;
        if recursive {
            let deleter = PrefixDeleter::new(Arc::clone(store), jobs);
            deleter.run(loc.bucket(), loc.path()).await?;
        } else {
            delete_object(&**store, &loc).await?;
        }
    }
    Ok(())
}

/// Create each named bucket with the same settings.
pub async fn mb(store: &dyn ObjectStore, names: &[String], spec: &BucketSpec) -> StorageResult<()> {
    if spec.project.is_empty() {
        return Err(StorageError::InvalidArgument(
            "no project given: pass --google-cloud-project or set GOOGLE_CLOUD_PROJECT".to_string(),
        ));
    }

    for name in names {
        let bucket = bucket_name_from_arg(name)?;
        store.create_bucket(&bucket, spec).await?;
        info!("Created bucket gs://{}/ in project {}", bucket, spec.project);
    }
    Ok(())
}

/// Delete each bucket; a bucket that does not exist counts as deleted.
pub async fn rmb(store: &dyn ObjectStore, args: &[String]) -> StorageResult<()> {
    for arg in args {
        let loc = ObjectLocator::parse(arg)?;
        if !loc.is_bucket_root() {
            warn!("ignoring object path in {}; deleting the bucket", loc);
        }
        match store.delete_bucket(loc.bucket()).await {
            Ok(()) => info!("Deleted bucket gs://{}/", loc.bucket()),
            Err(e) if e.is_not_found() => info!("Bucket gs://{}/ did not exist", loc.bucket()),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Map a command result to a process exit code.
///
/// `not_found_is_distinct` is set for `stat` and `exists`, the only commands
/// that report a missing target with its own code.
pub fn exit_code(result: &StorageResult<()>, not_found_is_distinct: bool) -> u8 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) if e.is_broken_pipe() => EXIT_SUCCESS,
        Err(e) if not_found_is_distinct && e.is_not_found() => EXIT_NOT_FOUND,
        Err(_) => EXIT_FAILURE,
    }
}
