// src/db/schema.rs

//! Bootstrap schema for the metadata layer (§6.1 of the object-store spec).
//!
//! Creates `info`, the six `structure_*` tables, and `data_meta`. Physical
//! per-class (`data_<class>`) and per-reference (`reference_<name>`) tables
//! are created later, at runtime, by the Schema Manager — they are not part
//! of the bootstrap script.

use crate::db::adapter::Adapter;
use crate::error::Result;
use tracing::{debug, info};

/// Current bootstrap schema version.
pub const SCHEMA_VERSION: i32 = 1;

fn init_schema_version(adapter: &Adapter) -> Result<()> {
    adapter.execute_script(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
}

pub fn get_schema_version(adapter: &Adapter) -> Result<i32> {
    init_schema_version(adapter)?;
    let row = adapter.fetch_one(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        &[],
    )?;
    Ok(row.and_then(|r| r.get("version").and_then(|v| v.as_i64())).unwrap_or(0) as i32)
}

fn set_schema_version(adapter: &Adapter, version: i32) -> Result<()> {
    adapter.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        &[&version],
    )?;
    Ok(())
}

/// Apply all pending bootstrap migrations.
pub fn migrate(adapter: &Adapter) -> Result<()> {
    let current_version = get_schema_version(adapter)?;
    info!(current_version, "checking bootstrap schema version");

    if current_version >= SCHEMA_VERSION {
        info!("bootstrap schema up to date");
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!(version, "applying bootstrap migration");
        apply_migration(adapter, version)?;
        set_schema_version(adapter, version)?;
    }

    info!(version = SCHEMA_VERSION, "bootstrap schema up to date");
    Ok(())
}

fn apply_migration(adapter: &Adapter, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(adapter),
        _ => panic!("unknown bootstrap migration version: {version}"),
    }
}

/// Initial bootstrap schema.
///
/// Creates the structural metadata tables: `structure_datatype`,
/// `structure_class`, `structure_attribute`, `structure_attribute_assignment`,
/// `structure_reference`, `structure_reference_version`, `data_meta`, `info`.
fn migrate_v1(adapter: &Adapter) -> Result<()> {
    debug!("creating bootstrap schema version 1");

    adapter.execute_script(
        "
        -- Free-form activity log, read by `info()`
        CREATE TABLE info (
            time DATETIME DEFAULT CURRENT_TIMESTAMP,
            version TEXT,
            comment TEXT
        );

        -- Datatypes: root datatypes own a generator, derived ones inherit it
        CREATE TABLE structure_datatype (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            generator TEXT,
            parent_id INTEGER REFERENCES structure_datatype(id),
            read_transformer_source TEXT,
            write_transformer_source TEXT
        );

        -- Classes: single inheritance, one data_<name> table per class
        CREATE TABLE structure_class (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            parent_id INTEGER REFERENCES structure_class(id),
            traced BOOLEAN NOT NULL DEFAULT 0
        );

        -- Attributes: named, typed value slots, reusable across classes
        CREATE TABLE structure_attribute (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            datatype_id INTEGER NOT NULL REFERENCES structure_datatype(id)
        );

        -- Attribute assignments: an attribute materialised as a column on a class
        CREATE TABLE structure_attribute_assignment (
            class_id INTEGER NOT NULL REFERENCES structure_class(id),
            attribute_id INTEGER NOT NULL REFERENCES structure_attribute(id),
            indexed BOOLEAN NOT NULL DEFAULT 0,
            read_transformer_source TEXT,
            write_transformer_source TEXT,
            PRIMARY KEY (class_id, attribute_id)
        );

        -- References: directed, named edge types between two classes
        CREATE TABLE structure_reference (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            origin_class_id INTEGER NOT NULL REFERENCES structure_class(id),
            target_class_id INTEGER NOT NULL REFERENCES structure_class(id),
            cardinality INTEGER
        );

        -- Per-(reference, origin) monotonic version counter
        CREATE TABLE structure_reference_version (
            reference_id INTEGER NOT NULL REFERENCES structure_reference(id),
            origin_object_id INTEGER NOT NULL,
            current_version INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (reference_id, origin_object_id)
        );

        -- Object identities: one row per logical object, spanning versions
        CREATE TABLE data_meta (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_id INTEGER NOT NULL REFERENCES structure_class(id),
            status INTEGER NOT NULL DEFAULT 0,
            current_version INTEGER NOT NULL DEFAULT 0,
            created DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        ",
    )?;

    info!("bootstrap schema version 1 created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_creates_all_structural_tables() {
        let adapter = Adapter::open_in_memory().unwrap();
        migrate(&adapter).unwrap();

        let tables: Vec<String> = adapter
            .fetch_all(
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                &[],
            )
            .unwrap()
            .into_iter()
            .map(|row| row.get("name").unwrap().as_str().unwrap().to_string())
            .collect();

        for expected in [
            "info",
            "structure_datatype",
            "structure_class",
            "structure_attribute",
            "structure_attribute_assignment",
            "structure_reference",
            "structure_reference_version",
            "data_meta",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let adapter = Adapter::open_in_memory().unwrap();
        migrate(&adapter).unwrap();
        let v1 = get_schema_version(&adapter).unwrap();
        migrate(&adapter).unwrap();
        let v2 = get_schema_version(&adapter).unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v1, SCHEMA_VERSION);
    }
}
