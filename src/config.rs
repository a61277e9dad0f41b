// src/config.rs
//
// Runtime configuration that does not depend on the CLI parser.

use tokio::sync::Semaphore;

use crate::constants::{ENV_GCS_ENDPOINT_URL, ENV_STORAGE_EMULATOR_HOST, GCS_SCHEME};
use crate::error::StorageError;
use crate::uri::ObjectLocator;

/// How to reach the storage service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Custom endpoint (emulator or proxy). `None` means the public GCS endpoint
    /// with Application Default Credentials.
    pub endpoint: Option<String>,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: resolve_endpoint(|name| std::env::var(name).ok()),
        }
    }
}

/// Resolves the GCS storage endpoint from `GCS_ENDPOINT_URL`, falling back to
/// the emulator convention `STORAGE_EMULATOR_HOST=host:port`.
///
/// Takes the variable lookup as a closure so it stays a pure function.
pub fn resolve_endpoint<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_GCS_ENDPOINT_URL)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            lookup(ENV_STORAGE_EMULATOR_HOST)
                .filter(|v| !v.is_empty())
                .map(|host| {
                    if host.starts_with("http://") || host.starts_with("https://") {
                        host
                    } else {
                        format!("http://{}", host)
                    }
                })
        })
}

/// Coerce the `-j` value into a usable worker budget: anything below 1 becomes 1.
pub fn normalize_jobs(jobs: i64) -> usize {
    let jobs = usize::try_from(jobs.max(1)).unwrap_or(Semaphore::MAX_PERMITS);
    jobs.min(Semaphore::MAX_PERMITS)
}

/// `mb` accepts either a bare bucket name or a `gs://bucket/` locator.
pub fn bucket_name_from_arg(arg: &str) -> Result<String, StorageError> {
    if arg.starts_with(GCS_SCHEME) {
        let loc = ObjectLocator::parse(arg)?;
        if !loc.is_bucket_root() {
            return Err(StorageError::InvalidArgument(format!(
                "bucket locator must not contain an object path: {arg}"
            )));
        }
        return Ok(loc.bucket().to_string());
    }

    if arg.is_empty() || arg.contains('/') {
        return Err(StorageError::InvalidArgument(format!("invalid bucket name `{arg}`")));
    }
    Ok(arg.to_string())
}
