// src/constants.rs
//
// Centralized constants for gslite to avoid hardcoded values throughout the codebase

/// URI scheme accepted for object locators.
pub const GCS_SCHEME: &str = "gs://";

/// Default number of concurrent delete calls for `rm -r`.
pub const DEFAULT_DELETE_JOBS: i64 = 64;

/// Default location for `mb`.
pub const DEFAULT_BUCKET_LOCATION: &str = "US";

/// Default storage class for `mb`.
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

// ============================================================================
// Exit codes
// ============================================================================

pub const EXIT_SUCCESS: u8 = 0;

/// Any failure other than a missing object on `stat` / `exists`.
pub const EXIT_FAILURE: u8 = 1;

/// `stat` / `exists` target does not exist.
pub const EXIT_NOT_FOUND: u8 = 2;

// ============================================================================
// Environment variables
// ============================================================================

/// Project used by `mb` when `--google-cloud-project` is not given.
pub const ENV_GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";

/// Primary environment variable for custom GCS endpoint
/// Example: GCS_ENDPOINT_URL=http://localhost:4443
pub const ENV_GCS_ENDPOINT_URL: &str = "GCS_ENDPOINT_URL";

/// GCS emulator convention environment variable (STORAGE_EMULATOR_HOST=host:port)
/// If value doesn't start with http://, "http://" is prepended automatically
/// Example: STORAGE_EMULATOR_HOST=localhost:4443
pub const ENV_STORAGE_EMULATOR_HOST: &str = "STORAGE_EMULATOR_HOST";
