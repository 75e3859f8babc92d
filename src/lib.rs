use std::path::PathBuf;

use duckconn_engine::{
    row_to_json, run_demo, ConnectionOptions, DatabaseTarget, DuckDbConnection,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const DEFAULT_LOG_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "duckconn.log";

/// Runtime settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub database: DatabaseTarget,
    pub options: ConnectionOptions,
    pub log_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseTarget::InMemory,
            options: ConnectionOptions::default(),
            log_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(database) = get("DUCKCONN_DATABASE") {
            config.database = database
                .parse::<DatabaseTarget>()
                .map_err(|err| format!("DUCKCONN_DATABASE: {err}"))?;
        }
        if let Some(read_only) = get("DUCKCONN_READ_ONLY") {
            config.options.read_only = parse_flag(&read_only)
                .ok_or_else(|| format!("DUCKCONN_READ_ONLY: expected a boolean, got {read_only}"))?;
        }
        if let Some(threads) = get("DUCKCONN_THREADS") {
            let threads = threads
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| {
                    format!("DUCKCONN_THREADS: expected a positive integer, got {threads}")
                })?;
            config.options.threads = Some(threads);
        }
        config.options.max_memory = get("DUCKCONN_MAX_MEMORY");
        config.log_dir = get("DUCKCONN_LOG_DIR").map(PathBuf::from);
        if let Some(filter) = get("DUCKCONN_LOG").or_else(|| get("RUST_LOG")) {
            config.log_filter = filter;
        }
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Install the global subscriber: stderr always, plus a daily log file when
/// `log_dir` is set. Keep the returned guard alive until exit so buffered
/// file output is flushed.
pub fn init_tracing(config: &AppConfig) -> AppResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.log_filter)?;
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()?;
            Ok(None)
        }
    }
}

/// Entry point of the `duckconn` binary: run the demo against the configured
/// database and print each row.
pub fn run() -> AppResult<()> {
    let config = AppConfig::from_env()?;
    let _guard = init_tracing(&config)?;
    debug!(config = %serde_json::to_string(&config)?, "loaded configuration");
    info!(database = %config.database, "running demo");

    let mut db = DuckDbConnection::with_options(config.database, config.options);
    let rows = run_demo(&mut db)?;
    for row in &rows {
        println!("{}", row_to_json(row));
    }
    Ok(())
}
