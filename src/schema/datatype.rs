// src/schema/datatype.rs

//! Datatype records: `(id, name, generator, parent_id?, read_src?, write_src?)`.
//! A datatype is root when `parent_id` is absent; otherwise it inherits its
//! effective generator from the root of its chain (see
//! `inheritance::InheritanceEngine::effective_generator`).

use crate::db::adapter::Adapter;
use crate::error::{Error, Result};
use crate::registry::Identified;
use rusqlite::ToSql;

#[derive(Debug, Clone)]
pub struct Datatype {
    pub id: i64,
    pub name: String,
    pub generator: Option<String>,
    pub parent_id: Option<i64>,
    pub read_transformer_source: Option<String>,
    pub write_transformer_source: Option<String>,
}

impl Identified for Datatype {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Datatype {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Inserts a new datatype row. Exactly one of `generator` or `parent_id`
    /// must be set; callers enforce that (see
    /// `schema::manager::SchemaManager::create_datatype`) before calling this.
    pub fn insert(adapter: &Adapter, record: &Datatype) -> Result<i64> {
        adapter.execute(
            "INSERT INTO structure_datatype (name, generator, parent_id, read_transformer_source, write_transformer_source) VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                &record.name as &dyn ToSql,
                &record.generator as &dyn ToSql,
                &record.parent_id as &dyn ToSql,
                &record.read_transformer_source as &dyn ToSql,
                &record.write_transformer_source as &dyn ToSql,
            ],
        )?;
        Ok(adapter.last_insert_id())
    }

    pub fn find_by_id(adapter: &Adapter, id: i64) -> Result<Option<Datatype>> {
        let row = adapter.fetch_one("SELECT * FROM structure_datatype WHERE id = ?1", &[&id as &dyn ToSql])?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    pub fn find_by_name(adapter: &Adapter, name: &str) -> Result<Option<Datatype>> {
        let row = adapter.fetch_one("SELECT * FROM structure_datatype WHERE name = ?1", &[&name as &dyn ToSql])?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    fn from_row(row: &crate::db::adapter::Row) -> Datatype {
        Datatype {
            id: row.get("id").and_then(|v| v.as_i64()).unwrap(),
            name: row.get("name").and_then(|v| v.as_str()).unwrap().to_string(),
            generator: row.get("generator").and_then(|v| v.as_str()).map(|s| s.to_string()),
            parent_id: row.get("parent_id").and_then(|v| v.as_i64()),
            read_transformer_source: row
                .get("read_transformer_source")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            write_transformer_source: row
                .get("write_transformer_source")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }
    }
}

impl Datatype {
    pub fn not_found(key: &str) -> Error {
        Error::NotFound(format!("datatype '{key}'"))
    }
}
