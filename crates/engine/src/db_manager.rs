use std::fmt;
use std::ops::{Deref, DerefMut};

use duckdb::types::Value;
use duckdb::{params_from_iter, Connection, Statement};
use tracing::{debug, info, instrument, warn};

use crate::{ConnectionOptions, DatabaseTarget, EngineError, EngineResult};

/// One materialized result row, one engine value per column.
pub type Row = Vec<Value>;

/// Owns at most one live DuckDB handle for a single target.
///
/// The handle is present exactly while the manager is connected; every query
/// entry point checks for it and fails with [`EngineError::NotConnected`]
/// otherwise. Not meant to be shared across threads without external locking.
pub struct DuckDbConnection {
    target: DatabaseTarget,
    options: ConnectionOptions,
    conn: Option<Connection>,
}

impl DuckDbConnection {
    pub fn new(target: DatabaseTarget) -> Self {
        Self::with_options(target, ConnectionOptions::default())
    }

    pub fn open_in_memory() -> Self {
        Self::new(DatabaseTarget::InMemory)
    }

    pub fn with_options(target: DatabaseTarget, options: ConnectionOptions) -> Self {
        Self {
            target,
            options,
            conn: None,
        }
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open a handle to the target.
    ///
    /// Fails with [`EngineError::AlreadyConnected`] if a handle is already
    /// held; the existing handle stays open and usable.
    pub fn connect(&mut self) -> EngineResult<()> {
        if self.conn.is_some() {
            return Err(EngineError::AlreadyConnected(self.target.clone()));
        }

        let config = self.options.to_duckdb_config()?;
        let conn = match &self.target {
            DatabaseTarget::InMemory => Connection::open_in_memory_with_flags(config)?,
            DatabaseTarget::File(path) => Connection::open_with_flags(path, config)?,
        };
        self.conn = Some(conn);
        info!(database = %self.target, "connection to DuckDB established");
        Ok(())
    }

    /// Release the handle, if any. Calling this while unconnected is a no-op.
    ///
    /// A close failure reported by the engine is returned, but the manager
    /// is unconnected either way.
    pub fn disconnect(&mut self) -> EngineResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        let outcome = conn.close().map_err(|(_conn, err)| err);
        close_outcome(&self.target, outcome)
    }

    /// Borrow the live handle.
    pub fn connection(&self) -> EngineResult<&Connection> {
        self.conn.as_ref().ok_or(EngineError::NotConnected)
    }

    pub fn execute_query(&self, query: &str) -> EngineResult<Vec<Row>> {
        self.execute_query_with_params(query, &[])
    }

    /// Run `query` with positional bind values and return every result row.
    #[instrument(skip(self, params), fields(sql = %query, param_count = params.len()))]
    pub fn execute_query_with_params(
        &self,
        query: &str,
        params: &[Value],
    ) -> EngineResult<Vec<Row>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(query)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let stmt: &Statement = row.as_ref();
            let column_count = stmt.column_count();
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(row.get::<_, Value>(index)?);
            }
            result.push(values);
        }

        debug!(row_count = result.len(), "executed query");
        Ok(result)
    }

    /// Run a script of one or more statements, discarding any results.
    #[instrument(skip(self), fields(sql = %sql))]
    pub fn execute_batch(&self, sql: &str) -> EngineResult<()> {
        self.connection()?.execute_batch(sql)?;
        Ok(())
    }

    /// Connect and hand back a guard that disconnects when dropped.
    pub fn scoped(&mut self) -> EngineResult<ConnectionGuard<'_>> {
        self.connect()?;
        Ok(ConnectionGuard { db: self })
    }

    /// Connect, run `body`, then disconnect on every exit path.
    ///
    /// An error from `body` is returned as-is even if closing also fails; a
    /// close failure only surfaces when `body` succeeded.
    pub fn with_connection<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut DuckDbConnection) -> Result<T, E>,
        E: From<EngineError>,
    {
        let mut guard = self.scoped()?;
        match body(&mut *guard) {
            Ok(value) => {
                guard.close()?;
                Ok(value)
            }
            Err(err) => {
                drop(guard);
                Err(err)
            }
        }
    }
}

fn close_outcome(target: &DatabaseTarget, outcome: duckdb::Result<()>) -> EngineResult<()> {
    match outcome {
        Ok(()) => {
            info!(database = %target, "connection to DuckDB closed");
            Ok(())
        }
        Err(err) => {
            warn!(database = %target, error = %err, "DuckDB reported an error on close");
            Err(err.into())
        }
    }
}

impl Default for DuckDbConnection {
    fn default() -> Self {
        Self::open_in_memory()
    }
}

impl fmt::Debug for DuckDbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuckDbConnection")
            .field("target", &self.target)
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Drop for DuckDbConnection {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(database = %self.target, error = %err, "failed to close DuckDB connection");
        }
    }
}

/// Scope handle returned by [`DuckDbConnection::scoped`].
pub struct ConnectionGuard<'a> {
    db: &'a mut DuckDbConnection,
}

impl ConnectionGuard<'_> {
    /// Disconnect now and report any close failure.
    pub fn close(self) -> EngineResult<()> {
        self.db.disconnect()
    }
}

impl Deref for ConnectionGuard<'_> {
    type Target = DuckDbConnection;

    fn deref(&self) -> &Self::Target {
        self.db
    }
}

impl DerefMut for ConnectionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.db
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.db.disconnect() {
            warn!(database = %self.db.target, error = %err, "failed to close DuckDB connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{close_outcome, DuckDbConnection, Row};
    use crate::{ConnectionOptions, DatabaseTarget, EngineError, EngineResult};
    use duckdb::types::Value;
    use duckdb::Connection;
    use std::fs;
    use std::panic::{self, AssertUnwindSafe};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn seeded() -> DuckDbConnection {
        let mut db = DuckDbConnection::open_in_memory();
        db.connect().expect("connect");
        db.execute_query("CREATE TABLE t (id INTEGER, name VARCHAR)")
            .expect("create table");
        db.execute_query("INSERT INTO t VALUES (1, 'Alice'), (2, 'Bob')")
            .expect("insert rows");
        db
    }

    fn person(id: i32, name: &str) -> Row {
        vec![Value::Int(id), Value::Text(name.to_string())]
    }

    #[test]
    fn execute_before_connect_is_rejected() {
        let db = DuckDbConnection::default();
        let err = db.execute_query("SELECT 1").expect_err("should fail");
        assert!(matches!(err, EngineError::NotConnected));
        assert!(err.to_string().contains("not connected"));
    }

    #[test]
    fn execute_after_disconnect_is_rejected() {
        let mut db = seeded();
        db.disconnect().expect("disconnect");
        assert!(!db.is_connected());

        let err = db.execute_query("SELECT * FROM t").expect_err("should fail");
        assert!(matches!(err, EngineError::NotConnected));
        let err = db.execute_batch("SELECT 1").expect_err("should fail");
        assert!(matches!(err, EngineError::NotConnected));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut db = DuckDbConnection::open_in_memory();
        db.disconnect().expect("never connected");

        db.connect().expect("connect");
        db.disconnect().expect("first disconnect");
        db.disconnect().expect("second disconnect is a no-op");
        assert!(!db.is_connected());
    }

    #[test]
    fn round_trip_keeps_insertion_order() {
        let db = seeded();
        let rows = db.execute_query("SELECT * FROM t").expect("select");
        assert_eq!(rows, vec![person(1, "Alice"), person(2, "Bob")]);
    }

    #[test]
    fn positional_params_are_bound() {
        let db = seeded();
        let rows = db
            .execute_query_with_params("SELECT * FROM t WHERE id = ?", &[Value::Int(1)])
            .expect("select by id");
        assert_eq!(rows, vec![person(1, "Alice")]);

        let rows = db
            .execute_query_with_params(
                "SELECT name FROM t WHERE id = $1 OR name = $2 ORDER BY id",
                &[Value::Int(2), Value::Text("Alice".to_string())],
            )
            .expect("select by numbered params");
        assert_eq!(
            rows,
            vec![
                vec![Value::Text("Alice".to_string())],
                vec![Value::Text("Bob".to_string())],
            ]
        );
    }

    #[test]
    fn empty_result_is_an_empty_vec() {
        let db = seeded();
        let rows = db
            .execute_query_with_params("SELECT * FROM t WHERE id = ?", &[Value::Int(99)])
            .expect("select");
        assert!(rows.is_empty());
    }

    #[test]
    fn engine_errors_pass_through() {
        let db = seeded();
        let err = db.execute_query("SELEKT nonsense").expect_err("syntax error");
        assert!(matches!(err, EngineError::DuckDb(_)));

        let err = db
            .execute_query("SELECT * FROM missing_table")
            .expect_err("catalog error");
        assert!(matches!(err, EngineError::DuckDb(_)));
        assert!(err.to_string().contains("missing_table"));
    }

    #[test]
    fn connect_twice_fails_and_keeps_handle() {
        let mut db = seeded();
        let err = db.connect().expect_err("second connect should fail");
        assert!(matches!(err, EngineError::AlreadyConnected(DatabaseTarget::InMemory)));

        let rows = db.execute_query("SELECT count(*) FROM t").expect("still usable");
        assert_eq!(rows, vec![vec![Value::BigInt(2)]]);
    }

    #[test]
    fn reconnect_in_memory_starts_fresh() {
        let mut db = seeded();
        db.disconnect().expect("disconnect");
        db.connect().expect("reconnect");
        let err = db.execute_query("SELECT * FROM t").expect_err("table is gone");
        assert!(matches!(err, EngineError::DuckDb(_)));
    }

    #[test]
    fn execute_batch_runs_every_statement() {
        let mut db = DuckDbConnection::open_in_memory();
        db.connect().expect("connect");
        db.execute_batch(
            "CREATE TABLE t (id INTEGER, name VARCHAR);
             INSERT INTO t VALUES (1, 'Alice');
             INSERT INTO t VALUES (2, 'Bob');",
        )
        .expect("batch");
        let rows = db.execute_query("SELECT * FROM t ORDER BY id").expect("select");
        assert_eq!(rows, vec![person(1, "Alice"), person(2, "Bob")]);
    }

    #[test]
    fn close_failure_is_returned() {
        let target = DatabaseTarget::file("/tmp/duckconn_close.duckdb");
        close_outcome(&target, Ok(())).expect("clean close");

        let err = close_outcome(&target, Err(duckdb::Error::QueryReturnedNoRows))
            .expect_err("close failure should surface");
        assert!(matches!(
            err,
            EngineError::DuckDb(duckdb::Error::QueryReturnedNoRows)
        ));
    }

    #[test]
    fn guard_disconnects_on_drop() {
        let mut db = DuckDbConnection::open_in_memory();
        {
            let guard = db.scoped().expect("scoped");
            assert!(guard.is_connected());
            let rows = guard.execute_query("SELECT 42").expect("select");
            assert_eq!(rows, vec![vec![Value::Int(42)]]);
        }
        assert!(!db.is_connected());
    }

    #[test]
    fn guard_close_disconnects_once() {
        let mut db = DuckDbConnection::open_in_memory();
        let guard = db.scoped().expect("scoped");
        guard.close().expect("close");
        assert!(!db.is_connected());
    }

    #[test]
    fn scoped_acquisition_fails_when_already_connected() {
        let mut db = seeded();
        let err = db.scoped().err().expect("scoped should fail");
        assert!(matches!(err, EngineError::AlreadyConnected(_)));
        assert!(db.is_connected());
    }

    #[test]
    fn with_connection_returns_body_value() {
        let mut db = DuckDbConnection::open_in_memory();
        let rows = db
            .with_connection(|db| -> EngineResult<Vec<Row>> { db.execute_query("SELECT 'ok'") })
            .expect("scoped query");
        assert_eq!(rows, vec![vec![Value::Text("ok".to_string())]]);
        assert!(!db.is_connected());
    }

    #[test]
    fn failing_body_still_releases_file_handle() {
        let db_path = temp_db_path();
        let target = DatabaseTarget::file(&db_path);

        let mut db = DuckDbConnection::new(target.clone());
        let err = db
            .with_connection(|db| -> EngineResult<()> {
                db.execute_query("CREATE TABLE t (id INTEGER, name VARCHAR)")?;
                db.execute_query("INSERT INTO t VALUES (1, 'Alice'), (2, 'Bob')")?;
                db.execute_query("SELECT * FROM no_such_table")?;
                Ok(())
            })
            .expect_err("body should fail");
        assert!(matches!(err, EngineError::DuckDb(_)));
        assert!(!db.is_connected());

        let mut again = DuckDbConnection::new(target);
        again.connect().expect("reconnect same file");
        let rows = again.execute_query("SELECT * FROM t").expect("select");
        assert_eq!(rows, vec![person(1, "Alice"), person(2, "Bob")]);
        again.disconnect().expect("disconnect");

        cleanup_temp_db(&db_path);
    }

    #[test]
    fn panicking_body_still_releases_handle() {
        let mut db = DuckDbConnection::open_in_memory();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            db.with_connection(|_db| -> EngineResult<()> { panic!("boom") })
        }));
        assert!(outcome.is_err());
        assert!(!db.is_connected());
    }

    #[test]
    fn rows_match_direct_engine_query() {
        let db_path = temp_db_path();
        let mut db = DuckDbConnection::new(DatabaseTarget::file(&db_path));
        let wrapped = db
            .with_connection(|db| -> EngineResult<Vec<Row>> {
                db.execute_batch(
                    "CREATE TABLE m (k VARCHAR, v DOUBLE, flag BOOLEAN);
                     INSERT INTO m VALUES ('a', 1.5, true), ('b', NULL, false);",
                )?;
                db.execute_query("SELECT * FROM m ORDER BY k")
            })
            .expect("wrapped query");

        let conn = Connection::open(&db_path).expect("open direct");
        let mut stmt = conn.prepare("SELECT * FROM m ORDER BY k").expect("prepare");
        let direct = stmt
            .query_map([], |row| {
                Ok(vec![
                    row.get::<_, Value>(0)?,
                    row.get::<_, Value>(1)?,
                    row.get::<_, Value>(2)?,
                ])
            })
            .expect("query")
            .collect::<Result<Vec<_>, _>>()
            .expect("collect");
        drop(stmt);
        drop(conn);

        assert_eq!(wrapped, direct);
        assert_eq!(wrapped[1][1], Value::Null);
        cleanup_temp_db(&db_path);
    }

    #[test]
    fn read_only_option_rejects_writes() {
        let db_path = temp_db_path();
        let target = DatabaseTarget::file(&db_path);

        let mut writer = DuckDbConnection::new(target.clone());
        writer
            .with_connection(|db| db.execute_batch("CREATE TABLE t (id INTEGER)"))
            .expect("seed");

        let mut reader = DuckDbConnection::with_options(target, ConnectionOptions::read_only());
        reader.connect().expect("read-only connect");
        let err = reader
            .execute_query("INSERT INTO t VALUES (1)")
            .expect_err("write should fail");
        assert!(matches!(err, EngineError::DuckDb(_)));
        reader.disconnect().expect("disconnect");

        cleanup_temp_db(&db_path);
    }

    fn temp_db_path() -> String {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        format!("/tmp/duckconn_manager_test_{suffix}.duckdb")
    }

    fn cleanup_temp_db(db_path: &str) {
        let _ = fs::remove_file(db_path);
        let _ = fs::remove_file(format!("{db_path}.wal"));
        let _ = fs::remove_file(format!("{db_path}.wal.lck"));
    }
}
