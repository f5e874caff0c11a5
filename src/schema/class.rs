// src/schema/class.rs

//! Class records: `(id, name, parent_id?, traced)`. Single inheritance —
//! a class has at most one parent. `traced` marks classes whose objects
//! carry history for auditing purposes (DDL `*` suffix).

use crate::db::adapter::Adapter;
use crate::error::{Error, Result};
use crate::registry::Identified;
use rusqlite::ToSql;

#[derive(Debug, Clone)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub traced: bool,
}

impl Identified for Class {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Class {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn insert(adapter: &Adapter, record: &Class) -> Result<i64> {
        adapter.execute(
            "INSERT INTO structure_class (name, parent_id, traced) VALUES (?1, ?2, ?3)",
            &[
                &record.name as &dyn ToSql,
                &record.parent_id as &dyn ToSql,
                &record.traced as &dyn ToSql,
            ],
        )?;
        Ok(adapter.last_insert_id())
    }

    pub fn find_by_id(adapter: &Adapter, id: i64) -> Result<Option<Class>> {
        let row = adapter.fetch_one("SELECT * FROM structure_class WHERE id = ?1", &[&id as &dyn ToSql])?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    pub fn find_by_name(adapter: &Adapter, name: &str) -> Result<Option<Class>> {
        let row = adapter.fetch_one("SELECT * FROM structure_class WHERE name = ?1", &[&name as &dyn ToSql])?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    pub fn find_children(adapter: &Adapter, parent_id: i64) -> Result<Vec<Class>> {
        let rows = adapter.fetch_all(
            "SELECT * FROM structure_class WHERE parent_id = ?1 ORDER BY id",
            &[&parent_id as &dyn ToSql],
        )?;
        Ok(rows.iter().map(Self::from_row).collect())
    }

    fn from_row(row: &crate::db::adapter::Row) -> Class {
        Class {
            id: row.get("id").and_then(|v| v.as_i64()).unwrap(),
            name: row.get("name").and_then(|v| v.as_str()).unwrap().to_string(),
            parent_id: row.get("parent_id").and_then(|v| v.as_i64()),
            traced: row
                .get("traced")
                .and_then(|v| v.as_i64())
                .map(|i| i != 0)
                .unwrap_or(false),
        }
    }
}

impl Class {
    pub fn not_found(key: &str) -> Error {
        Error::NotFound(format!("class '{key}'"))
    }
}
