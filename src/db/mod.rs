// src/db/mod.rs

//! The Storage Adapter layer: connection handling, bootstrap schema, and the
//! thin execute/fetch interface everything above it is built on.

pub mod adapter;
pub mod schema;

pub use adapter::{Adapter, RawValue, Row};

use crate::error::Result;

/// Open a database at `path`, applying any pending bootstrap migrations.
pub fn open(path: &str) -> Result<Adapter> {
    let adapter = Adapter::open(path)?;
    schema::migrate(&adapter)?;
    Ok(adapter)
}

/// Open an in-memory database, applying any pending bootstrap migrations.
/// Used by tests and by the CLI's `--db-path :memory:` convention.
pub fn open_in_memory() -> Result<Adapter> {
    let adapter = Adapter::open_in_memory()?;
    schema::migrate(&adapter)?;
    Ok(adapter)
}
