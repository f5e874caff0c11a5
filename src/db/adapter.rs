// src/db/adapter.rs

//! The Storage Adapter: a thin, synchronous interface to the embedded SQLite
//! engine. This is the only place SQL text is sent to the driver; everything
//! above it (schema manager, object engine, reference engine) builds SQL
//! strings but routes every execution through here. The adapter itself
//! carries no schema knowledge — it only knows rows and parameters.

use crate::error::Result;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, ToSql};
use std::collections::HashMap;
use tracing::debug;

/// A single column value as returned by the engine, before any datatype or
/// assignment transformer has touched it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl RawValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<ValueRef<'_>> for RawValue {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => RawValue::Null,
            ValueRef::Integer(i) => RawValue::Integer(i),
            ValueRef::Real(f) => RawValue::Real(f),
            ValueRef::Text(t) => RawValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => RawValue::Blob(b.to_vec()),
        }
    }
}

impl ToSql for RawValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        let value = match self {
            RawValue::Null => SqlValue::Null,
            RawValue::Integer(i) => SqlValue::Integer(*i),
            RawValue::Real(f) => SqlValue::Real(*f),
            RawValue::Text(t) => SqlValue::Text(t.clone()),
            RawValue::Blob(b) => SqlValue::Blob(b.clone()),
        };
        Ok(rusqlite::types::ToSqlOutput::Owned(value))
    }
}

/// A row returned by the engine, keyed by column name.
pub type Row = HashMap<String, RawValue>;

fn row_to_map(row: &rusqlite::Row) -> rusqlite::Result<Row> {
    let stmt = row.as_ref();
    let mut map = Row::new();
    for (i, column) in stmt.column_names().iter().enumerate() {
        map.insert(column.to_string(), row.get_ref(i)?.into());
    }
    Ok(map)
}

/// Thin wrapper over a single `rusqlite::Connection`. Implementations that
/// expose multiple connections must give each its own `Adapter` and its own
/// `Registry` (see `registry::Registry`), per the crate's single-connection
/// concurrency model.
pub struct Adapter {
    conn: Connection,
}

impl Adapter {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute a single statement, returning the number of rows affected.
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        debug!(sql, "execute");
        Ok(self.conn.execute(sql, params)?)
    }

    /// Execute one or more semicolon-separated statements with no
    /// parameters (DDL, bootstrap scripts).
    pub fn execute_script(&self, sql: &str) -> Result<()> {
        debug!(bytes = sql.len(), "execute_script");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn fetch_one(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Option<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_map(row)?)),
            None => Ok(None),
        }
    }

    pub fn fetch_all(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_map(row)?);
        }
        Ok(out)
    }

    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    pub fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT;")?;
        }
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| crate::error::Error::StorageError(e))
    }

    /// Runs `f` inside a `BEGIN`/`COMMIT` block, rolling back on error or
    /// panic. Public composite operations (schema mutation, `modify`,
    /// `bind`) are expected to be wrapped this way by the caller so that a
    /// failure partway through leaves no partial structural mutation
    /// visible.
    pub fn transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN;")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_and_fetch_roundtrip() {
        let adapter = Adapter::open_in_memory().unwrap();
        adapter
            .execute_script("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        adapter
            .execute(
                "INSERT INTO t (name) VALUES (?1)",
                &[&"alice" as &dyn ToSql],
            )
            .unwrap();
        let id = adapter.last_insert_id();
        assert_eq!(id, 1);

        let row = adapter
            .fetch_one("SELECT * FROM t WHERE id = ?1", &[&id as &dyn ToSql])
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name").unwrap().as_str(), Some("alice"));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let adapter = Adapter::open_in_memory().unwrap();
        adapter
            .execute_script("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT UNIQUE)")
            .unwrap();

        let result: Result<()> = adapter.transaction(|| {
            adapter.execute(
                "INSERT INTO t (name) VALUES (?1)",
                &[&"bob" as &dyn ToSql],
            )?;
            Err(crate::error::Error::NotFound("boom".to_string()))
        });
        assert!(result.is_err());

        let rows = adapter.fetch_all("SELECT * FROM t", &[]).unwrap();
        assert!(rows.is_empty());
    }
}
