// src/list.rs
//
// Prefix listing rendered as plain URIs or JSON lines.

use std::io::Write;

use futures::StreamExt;

use crate::error::StorageResult;
use crate::object_store::{ObjectMetadata, ObjectStore};
use crate::uri::ObjectLocator;

/// Output format for `list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// One `gs://bucket/name` per line.
    #[default]
    Uri,
    /// One compact JSON metadata record per line.
    JsonLines,
}

/// Write one record in `format`, newline-terminated.
pub fn render_entry<W>(out: &mut W, meta: &ObjectMetadata, format: ListFormat) -> StorageResult<()>
where
    W: Write + ?Sized,
{
    match format {
        ListFormat::Uri => writeln!(out, "{}", meta.key())?,
        ListFormat::JsonLines => {
            let line = serde_json::to_string(meta).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

/// Stream every object under `locator` into `out`.
///
/// Stops at the first listing or write error. Returns the number of records
/// written; an empty listing is `Ok(0)`.
pub async fn list_to<W>(
    store: &dyn ObjectStore,
    locator: &ObjectLocator,
    format: ListFormat,
    out: &mut W,
) -> StorageResult<u64>
where
    W: Write + ?Sized,
{
    let mut listing = store.list(locator.bucket(), locator.path());
    let mut written = 0u64;
    while let Some(item) = listing.next().await {
        let meta = item?;
        render_entry(out, &meta, format)?;
        written += 1;
    }
    Ok(written)
}
