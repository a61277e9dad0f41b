// src/bin/cli.rs
//
//! gslite - small Google Cloud Storage client.
//!
//! Examples:
//! ```bash
//! gslite cat     gs://bucket/a.txt gs://bucket/b.txt     # concatenate objects
//! echo hi | gslite put gs://bucket/hello.txt             # upload stdin
//! gslite stat    -compact gs://bucket/hello.txt          # exit 2 if missing
//! gslite exists  gs://bucket/hello.txt                   # exit 0 / 2
//! gslite list    -jsonl gs://bucket/logs/                # one JSON record per line
//! gslite rm      -r -j 128 gs://bucket/logs/             # delete everything under a prefix
//! gslite mb      -location=EU my-new-bucket              # project from $GOOGLE_CLOUD_PROJECT
//! gslite rmb     gs://my-old-bucket/
//! ```

use std::ffi::OsString;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gslite::commands::{self, exit_code};
use gslite::config::{StoreConfig, normalize_jobs};
use gslite::constants::{
    DEFAULT_BUCKET_LOCATION, DEFAULT_DELETE_JOBS, DEFAULT_STORAGE_CLASS, ENV_GOOGLE_CLOUD_PROJECT,
    EXIT_FAILURE, EXIT_SUCCESS,
};
use gslite::gcs_client::GcsStore;
use gslite::list::ListFormat;
use gslite::{BucketSpec, DynObjectStore, PublicAccessPrevention, StorageResult};

/// Long flags that may also be written Go-style with a single dash
/// (`-compact`, `-location=EU`).
const SINGLE_DASH_LONG_FLAGS: &[&str] = &[
    "compact",
    "jsonl",
    "jobs",
    "storage-class",
    "location",
    "public-access-prevention",
    "google-cloud-project",
];

// -- Commands

#[derive(Parser, Debug)]
#[command(
    name = "gslite",
    version,
    about = "gslite - Small google storage client.",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        short = 'v',
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the concatenation of storage objects.
    Cat {
        /// gs://BUCKET/OBJECT ...
        locators: Vec<String>,
    },

    /// Upload stdin to an object.
    Put {
        /// gs://BUCKET/OBJECT
        locator: String,
    },

    /// Print object information as JSON. Exit code is 2 if the object did
    /// not exist, 1 on other errors.
    Stat {
        /// Print json in a compact format.
        #[arg(long)]
        compact: bool,

        /// gs://BUCKET/OBJECT
        locator: String,
    },

    /// Exit cleanly if the given object exists, with exit code 2 if it does not.
    Exists {
        /// gs://BUCKET/OBJECT
        locator: String,
    },

    /// Print all objects under the given prefixes.
    List {
        /// Print in jsonl format.
        #[arg(long)]
        jsonl: bool,

        /// gs://BUCKET/PREFIX ...
        locators: Vec<String>,
    },

    /// Remove objects, doing nothing successfully for objects that don't exist.
    /// With -r, removes everything the same `list` would print.
    Rm {
        /// Delete all objects with this prefix.
        #[arg(short = 'r')]
        recursive: bool,

        /// Maximum number of concurrent delete calls to perform.
        #[arg(
            short = 'j',
            long = "jobs",
            default_value_t = DEFAULT_DELETE_JOBS,
            allow_negative_numbers = true
        )]
        jobs: i64,

        /// gs://BUCKET/OBJECT ...
        locators: Vec<String>,
    },

    /// Create buckets.
    Mb {
        /// Bucket default storage class.
        #[arg(long, default_value = DEFAULT_STORAGE_CLASS)]
        storage_class: String,

        /// Bucket location.
        #[arg(long, default_value = DEFAULT_BUCKET_LOCATION)]
        location: String,

        /// Public access prevention.
        #[arg(long, value_enum, default_value_t = PublicAccessPrevention::Inherited)]
        public_access_prevention: PublicAccessPrevention,

        /// Project to make the bucket under.
        #[arg(long, env = ENV_GOOGLE_CLOUD_PROJECT, default_value = "")]
        google_cloud_project: String,

        /// NAME or gs://NAME/ ...
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Delete buckets, doing nothing successfully if they don't exist.
    Rmb {
        /// gs://BUCKET/ ...
        locators: Vec<String>,
    },
}

/// Rewrite Go-style single-dash long flags into clap's `--flag` form.
///
/// Returns a new argument vector; everything after `--` is left untouched.
fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split('=').next().unwrap_or(rest);
                    if SINGLE_DASH_LONG_FLAGS.contains(&name) {
                        OsString::from(format!("-{text}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",  // no -v: WARN level
        1 => "info",  // -v: INFO level
        _ => "debug", // -vv or more: DEBUG level
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    // Capture `log` records from dependencies
    tracing_log::LogTracer::init().ok();
}

/// Run one subcommand. The flag says whether NotFound gets its own exit code.
async fn dispatch(cmd: Command, store: DynObjectStore) -> (StorageResult<()>, bool) {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cmd {
        Command::Cat { locators } => (commands::cat(&*store, &locators, &mut out).await, false),
        Command::Put { locator } => {
            let mut stdin = tokio::io::stdin();
            (commands::put(&*store, &locator, &mut stdin).await.map(|_| ()), false)
        }
        Command::Stat { compact, locator } => {
            (commands::stat(&*store, &locator, compact, &mut out).await, true)
        }
        Command::Exists { locator } => (commands::exists(&*store, &locator).await, true),
        Command::List { jsonl, locators } => {
            let format = if jsonl { ListFormat::JsonLines } else { ListFormat::Uri };
            (commands::list(&*store, &locators, format, &mut out).await, false)
        }
        Command::Rm { recursive, jobs, locators } => {
            (commands::rm(&store, &locators, recursive, normalize_jobs(jobs)).await, false)
        }
        Command::Mb {
            storage_class,
            location,
            public_access_prevention,
            google_cloud_project,
            names,
        } => {
            let spec = BucketSpec {
                project: google_cloud_project,
                location,
                storage_class,
                public_access_prevention,
            };
            (commands::mb(&*store, &names, &spec).await, false)
        }
        Command::Rmb { locators } => (commands::rmb(&*store, &locators).await, false),
    }
}

/// Main CLI function
#[tokio::main]
async fn main() -> ExitCode {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            // help / version go to stdout and are not failures
            let code = if e.use_stderr() { EXIT_FAILURE } else { EXIT_SUCCESS };
            e.print().ok();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.verbose);

    let store: DynObjectStore = match GcsStore::connect(&StoreConfig::from_env()).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let quiet_not_found = matches!(cli.cmd, Command::Exists { .. });
    let (result, not_found_is_distinct) = dispatch(cli.cmd, store).await;

    if let Err(e) = &result {
        if e.is_broken_pipe() {
            debug!("stdout closed early: {}", e);
        } else if !(quiet_not_found && e.is_not_found()) {
            eprintln!("{}", e);
        }
    }
    io::stderr().flush().ok();

    ExitCode::from(exit_code(&result, not_found_is_distinct))
}
