use duckdb::{AccessMode, Config};
use serde::{Deserialize, Serialize};

use crate::EngineResult;

/// Open flags handed to DuckDB when a connection is established.
///
/// Unset fields leave the engine default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    #[serde(default)]
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    /// Memory limit in DuckDB notation, e.g. `"512MB"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<String>,
}

impl ConnectionOptions {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn to_duckdb_config(&self) -> EngineResult<Config> {
        let mut config = Config::default();
        if self.read_only {
            config = config.access_mode(AccessMode::ReadOnly)?;
        }
        if let Some(threads) = self.threads {
            config = config.threads(i64::from(threads))?;
        }
        if let Some(max_memory) = self.max_memory.as_deref() {
            config = config.max_memory(max_memory)?;
        }
        Ok(config)
    }
}
