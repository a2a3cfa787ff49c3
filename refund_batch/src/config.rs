//! Configuration for the batch service.
//!
//! Everything is read from `RFB_*` environment variables. A missing variable means the default is used. An invalid
//! value is logged and also replaced by the default, so a typo never stops the service from starting.
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::*;
use refund_engine::{
    ingest::DEFAULT_RECEIVE_WINDOW,
    processor::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_WORKERS},
    ProcessorConfig,
};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/refunds.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_PROCESSING_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_SPOOL_DIR: &str = "data/inbox";

/// Every variable the service reads, with the fallback used when it is unset.
pub const ENVIRONMENT_VARIABLES: [(&str, &str); 10] = [
    ("RUST_LOG", "error"),
    ("RFB_DATABASE_URL", DEFAULT_DATABASE_URL),
    ("RFB_DB_MAX_CONNECTIONS", "25"),
    ("RFB_MAX_WORKERS", "10"),
    ("RFB_BATCH_SIZE", "100"),
    ("RFB_PROCESSING_INTERVAL", "60"),
    ("RFB_ENABLE_QUEUE", "true"),
    ("RFB_QUEUE_SPOOL_DIR", DEFAULT_SPOOL_DIR),
    ("RFB_RECEIVE_WINDOW", "30"),
    ("RFB_ERROR_MESSAGES_PATH", "the built-in search path"),
];

#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub processor: ProcessorConfig,
    /// Time between scheduled runs. Zero means run once and exit.
    pub processing_interval: Duration,
    /// When false, no messages are pulled and only refunds already in the database are processed.
    pub enable_queue: bool,
    pub spool_dir: PathBuf,
    pub receive_window: Duration,
    /// Location of the error message catalogue for the simulated status service. The default search path is used
    /// when this is `None`.
    pub error_messages_path: Option<PathBuf>,
    /// Response delay range of the simulated status service.
    pub oracle_latency: (Duration, Duration),
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            processor: ProcessorConfig::default(),
            processing_interval: DEFAULT_PROCESSING_INTERVAL,
            enable_queue: true,
            spool_dir: PathBuf::from(DEFAULT_SPOOL_DIR),
            receive_window: DEFAULT_RECEIVE_WINDOW,
            error_messages_path: None,
            oracle_latency: (Duration::from_millis(100), Duration::from_millis(2000)),
        }
    }
}

impl BatchConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to its value, if set.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("RFB_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ RFB_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections = parse_or_default(&lookup, "RFB_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let batch_size = parse_or_default(&lookup, "RFB_BATCH_SIZE", DEFAULT_BATCH_SIZE);
        let max_workers = parse_or_default(&lookup, "RFB_MAX_WORKERS", DEFAULT_MAX_WORKERS);
        let processor = ProcessorConfig::new(batch_size, max_workers).unwrap_or_else(|e| {
            warn!(
                "🪛️ {e} Using the defaults of {DEFAULT_BATCH_SIZE} refunds per batch and {DEFAULT_MAX_WORKERS} \
                 workers instead."
            );
            ProcessorConfig::default()
        });
        let processing_interval = parse_or_default(
            &lookup,
            "RFB_PROCESSING_INTERVAL",
            DEFAULT_PROCESSING_INTERVAL.as_secs(),
        );
        let receive_window = parse_or_default(&lookup, "RFB_RECEIVE_WINDOW", DEFAULT_RECEIVE_WINDOW.as_secs());
        let enable_queue = lookup("RFB_ENABLE_QUEUE").map(|s| &s != "0" && &s.to_lowercase() != "false").unwrap_or(true);
        let spool_dir = lookup("RFB_QUEUE_SPOOL_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_SPOOL_DIR));
        let error_messages_path = lookup("RFB_ERROR_MESSAGES_PATH").filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        Self {
            database_url,
            db_max_connections,
            processor,
            processing_interval: Duration::from_secs(processing_interval),
            enable_queue,
            spool_dir,
            receive_window: Duration::from_secs(receive_window),
            error_messages_path,
            ..Default::default()
        }
    }
}

fn parse_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(name) {
        None => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e} Using the default, {default}, instead.");
            default
        }),
    }
}
