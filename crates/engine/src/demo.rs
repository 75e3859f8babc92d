use tracing::info;

use crate::{DuckDbConnection, EngineResult, Row};

/// Create a two-row `test` table inside a scoped connection and read it back.
pub fn run_demo(db: &mut DuckDbConnection) -> EngineResult<Vec<Row>> {
    db.with_connection(|db| -> EngineResult<Vec<Row>> {
        db.execute_query("CREATE OR REPLACE TABLE test (id INTEGER, name VARCHAR)")?;
        db.execute_query("INSERT INTO test VALUES (1, 'Alice'), (2, 'Bob')")?;
        let rows = db.execute_query("SELECT * FROM test")?;
        for row in &rows {
            info!(?row, "demo row");
        }
        Ok(rows)
    })
}
