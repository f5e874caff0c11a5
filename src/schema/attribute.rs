// src/schema/attribute.rs

//! Attribute records: `(id, name, datatype_id)`. An attribute is a named,
//! typed value slot; it only becomes a physical column once assigned to a
//! class (see `schema::assignment`).

use crate::db::adapter::Adapter;
use crate::error::{Error, Result};
use crate::registry::Identified;
use rusqlite::ToSql;

#[derive(Debug, Clone)]
pub struct Attribute {
    pub id: i64,
    pub name: String,
    pub datatype_id: i64,
}

impl Identified for Attribute {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Attribute {
    pub fn insert(adapter: &Adapter, record: &Attribute) -> Result<i64> {
        adapter.execute(
            "INSERT INTO structure_attribute (name, datatype_id) VALUES (?1, ?2)",
            &[&record.name as &dyn ToSql, &record.datatype_id as &dyn ToSql],
        )?;
        Ok(adapter.last_insert_id())
    }

    pub fn find_by_id(adapter: &Adapter, id: i64) -> Result<Option<Attribute>> {
        let row = adapter.fetch_one("SELECT * FROM structure_attribute WHERE id = ?1", &[&id as &dyn ToSql])?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    pub fn find_by_name(adapter: &Adapter, name: &str) -> Result<Option<Attribute>> {
        let row = adapter.fetch_one(
            "SELECT * FROM structure_attribute WHERE name = ?1",
            &[&name as &dyn ToSql],
        )?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    fn from_row(row: &crate::db::adapter::Row) -> Attribute {
        Attribute {
            id: row.get("id").and_then(|v| v.as_i64()).unwrap(),
            name: row.get("name").and_then(|v| v.as_str()).unwrap().to_string(),
            datatype_id: row.get("datatype_id").and_then(|v| v.as_i64()).unwrap(),
        }
    }
}

impl Attribute {
    pub fn not_found(key: &str) -> Error {
        Error::NotFound(format!("attribute '{key}'"))
    }
}
