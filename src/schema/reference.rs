// src/schema/reference.rs

//! Reference records: `(id, name, origin_class_id, target_class_id,
//! cardinality?)`. Each reference owns a physical `reference_<name>` edge
//! table plus a per-origin version counter in `structure_reference_version`.

use crate::db::adapter::Adapter;
use crate::error::{Error, Result};
use crate::registry::Identified;
use rusqlite::ToSql;

#[derive(Debug, Clone)]
pub struct Reference {
    pub id: i64,
    pub name: String,
    pub origin_class_id: i64,
    pub target_class_id: i64,
    pub cardinality: Option<i64>,
}

impl Identified for Reference {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Reference {
    pub fn insert(adapter: &Adapter, record: &Reference) -> Result<i64> {
        adapter.execute(
            "INSERT INTO structure_reference (name, origin_class_id, target_class_id, cardinality) VALUES (?1, ?2, ?3, ?4)",
            &[
                &record.name as &dyn ToSql,
                &record.origin_class_id as &dyn ToSql,
                &record.target_class_id as &dyn ToSql,
                &record.cardinality as &dyn ToSql,
            ],
        )?;
        Ok(adapter.last_insert_id())
    }

    pub fn find_by_id(adapter: &Adapter, id: i64) -> Result<Option<Reference>> {
        let row = adapter.fetch_one("SELECT * FROM structure_reference WHERE id = ?1", &[&id as &dyn ToSql])?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    pub fn find_by_name(adapter: &Adapter, name: &str) -> Result<Option<Reference>> {
        let row = adapter.fetch_one(
            "SELECT * FROM structure_reference WHERE name = ?1",
            &[&name as &dyn ToSql],
        )?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    /// Current version counter for `(reference, origin)`, defaulting to 0
    /// when no row exists yet.
    pub fn current_version(adapter: &Adapter, reference_id: i64, origin_object_id: i64) -> Result<i64> {
        let row = adapter.fetch_one(
            "SELECT current_version FROM structure_reference_version WHERE reference_id = ?1 AND origin_object_id = ?2",
            &[&reference_id as &dyn ToSql, &origin_object_id as &dyn ToSql],
        )?;
        Ok(row.and_then(|r| r.get("current_version").and_then(|v| v.as_i64())).unwrap_or(0))
    }

    /// Bumps (or creates) the `(reference, origin)` version counter and
    /// returns the new value.
    pub fn bump_version(adapter: &Adapter, reference_id: i64, origin_object_id: i64) -> Result<i64> {
        let next = Self::current_version(adapter, reference_id, origin_object_id)? + 1;
        adapter.execute(
            "INSERT INTO structure_reference_version (reference_id, origin_object_id, current_version)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (reference_id, origin_object_id) DO UPDATE SET current_version = excluded.current_version",
            &[
                &reference_id as &dyn ToSql,
                &origin_object_id as &dyn ToSql,
                &next as &dyn ToSql,
            ],
        )?;
        Ok(next)
    }

    fn from_row(row: &crate::db::adapter::Row) -> Reference {
        Reference {
            id: row.get("id").and_then(|v| v.as_i64()).unwrap(),
            name: row.get("name").and_then(|v| v.as_str()).unwrap().to_string(),
            origin_class_id: row.get("origin_class_id").and_then(|v| v.as_i64()).unwrap(),
            target_class_id: row.get("target_class_id").and_then(|v| v.as_i64()).unwrap(),
            cardinality: row.get("cardinality").and_then(|v| v.as_i64()),
        }
    }
}

impl Reference {
    pub fn not_found(key: &str) -> Error {
        Error::NotFound(format!("reference '{key}'"))
    }
}
