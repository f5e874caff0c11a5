// src/schema/assignment.rs

//! Attribute assignment records: `(class_id, attribute_id, indexed,
//! read/write_transformer_source)`. An assignment is what turns an
//! attribute into a physical column of `data_<class>`, and it may carry
//! its own transformer pair layered on top of the datatype's.

use crate::db::adapter::Adapter;
use crate::error::{Error, Result};
use rusqlite::ToSql;

#[derive(Debug, Clone)]
pub struct AttributeAssignment {
    pub class_id: i64,
    pub attribute_id: i64,
    pub indexed: bool,
    pub read_transformer_source: Option<String>,
    pub write_transformer_source: Option<String>,
}

impl AttributeAssignment {
    pub fn insert(adapter: &Adapter, record: &AttributeAssignment) -> Result<()> {
        adapter.execute(
            "INSERT INTO structure_attribute_assignment (class_id, attribute_id, indexed, read_transformer_source, write_transformer_source) VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                &record.class_id as &dyn ToSql,
                &record.attribute_id as &dyn ToSql,
                &record.indexed as &dyn ToSql,
                &record.read_transformer_source as &dyn ToSql,
                &record.write_transformer_source as &dyn ToSql,
            ],
        )?;
        Ok(())
    }

    pub fn find(adapter: &Adapter, class_id: i64, attribute_id: i64) -> Result<Option<AttributeAssignment>> {
        let row = adapter.fetch_one(
            "SELECT * FROM structure_attribute_assignment WHERE class_id = ?1 AND attribute_id = ?2",
            &[&class_id as &dyn ToSql, &attribute_id as &dyn ToSql],
        )?;
        Ok(row.map(|r| Self::from_row(&r)))
    }

    /// All assignments made directly on `class_id` (not walking ancestors —
    /// that is `inheritance::InheritanceEngine::assignment_for`'s job).
    pub fn find_for_class(adapter: &Adapter, class_id: i64) -> Result<Vec<AttributeAssignment>> {
        let rows = adapter.fetch_all(
            "SELECT * FROM structure_attribute_assignment WHERE class_id = ?1",
            &[&class_id as &dyn ToSql],
        )?;
        Ok(rows.iter().map(Self::from_row).collect())
    }

    fn from_row(row: &crate::db::adapter::Row) -> AttributeAssignment {
        AttributeAssignment {
            class_id: row.get("class_id").and_then(|v| v.as_i64()).unwrap(),
            attribute_id: row.get("attribute_id").and_then(|v| v.as_i64()).unwrap(),
            indexed: row
                .get("indexed")
                .and_then(|v| v.as_i64())
                .map(|i| i != 0)
                .unwrap_or(false),
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

impl AttributeAssignment {
    pub fn duplicate(class: &str, attribute: &str) -> Error {
        Error::DuplicateName(format!("attribute '{attribute}' is already assigned on class '{class}'"))
    }
}
