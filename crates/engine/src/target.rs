use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Reserved target string for a transient, non-persistent database.
pub const IN_MEMORY_MARKER: &str = ":memory:";

/// Which DuckDB store a connection opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DatabaseTarget {
    #[default]
    InMemory,
    File(PathBuf),
}

impl DatabaseTarget {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::InMemory)
    }

    /// Filesystem location of a persistent target.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InMemory => None,
            Self::File(path) => Some(path),
        }
    }
}

impl FromStr for DatabaseTarget {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidTarget("database path is empty".into()));
        }
        if trimmed == IN_MEMORY_MARKER {
            return Ok(Self::InMemory);
        }
        Ok(Self::File(PathBuf::from(trimmed)))
    }
}

impl TryFrom<String> for DatabaseTarget {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatabaseTarget> for String {
    fn from(target: DatabaseTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => f.write_str(IN_MEMORY_MARKER),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}
