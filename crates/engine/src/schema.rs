use serde::{Deserialize, Serialize};

use crate::{DuckDbConnection, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub position: i64,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
}

/// Describe the columns of `table_name` in declaration order.
///
/// Goes through the manager, so it needs a live connection. A table that does
/// not exist yields an empty list.
pub fn table_schema(db: &DuckDbConnection, table_name: &str) -> EngineResult<Vec<TableColumn>> {
    let conn = db.connection()?;
    let mut stmt = conn.prepare(
        "SELECT ordinal_position::BIGINT, column_name, data_type, is_nullable, column_default
         FROM information_schema.columns
         WHERE table_name = ?
         ORDER BY ordinal_position",
    )?;
    let rows = stmt.query_map([table_name], |row| {
        let is_nullable: String = row.get(3)?;
        Ok(TableColumn {
            position: row.get(0)?,
            name: row.get(1)?,
            data_type: row.get(2)?,
            nullable: is_nullable.eq_ignore_ascii_case("YES"),
            default_value: row.get(4)?,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}
