// src/lib.rs
//
// Crate root: public modules and the re-exports the binary uses.

pub mod constants;
pub mod config;
pub mod error;
pub mod uri;

// Backend abstraction and the GCS implementation
pub mod object_store;
pub mod gcs_client;

// Bounded fan-out primitives and the operations built on them
pub mod concurrency;
pub mod delete;
pub mod list;
pub mod commands;

pub use error::{StorageError, StorageResult};
pub use object_store::{BucketSpec, DynObjectStore, ObjectMetadata, ObjectStore, PublicAccessPrevention};
pub use uri::ObjectLocator;
