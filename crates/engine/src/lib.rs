mod db_manager;
mod demo;
mod error;
mod executor;
mod options;
mod rows;
mod schema;
mod target;

pub use db_manager::{ConnectionGuard, DuckDbConnection, Row};
pub use demo::run_demo;
pub use error::{EngineError, EngineResult};
pub use executor::{execute_args, execute_args_with, execute_command, execute_command_with};
pub use options::ConnectionOptions;
pub use rows::{row_to_json, rows_to_json, value_to_json};
pub use schema::{table_schema, TableColumn};
pub use target::{DatabaseTarget, IN_MEMORY_MARKER};

/// Engine value type carried in rows and bind parameters.
pub use duckdb::types::Value;
