// src/lib.rs

//! A versioned, schema-evolving object store built on an embedded SQLite
//! engine.
//!
//! The layers, bottom to top: the Storage Adapter ([`db`]) wraps a single
//! `rusqlite` connection; the Structure Registry ([`registry`]) read-through
//! caches structural metadata; the Schema Manager ([`schema`]) creates and
//! resolves datatypes, classes, attributes, and references; the Inheritance
//! Engine ([`inheritance`]) flattens single-inheritance class and datatype
//! chains; the Transformer Host ([`transform`]) runs the Lua-backed
//! read/write value pipeline; the Object Engine ([`object`]) owns object
//! lifecycle and versioning; the Reference Engine ([`reference_engine`])
//! owns the directed edge graph between objects; the DDL Interpreter
//! ([`ddl`]) compiles the surface schema language into Schema Manager calls;
//! [`object_list`] is a read-only façade over a set of objects; and
//! [`store`] ties all of it together behind one public type.

pub mod db;
pub mod ddl;
pub mod error;
pub mod inheritance;
pub mod naming;
pub mod object;
pub mod object_list;
pub mod reference_engine;
pub mod registry;
pub mod schema;
pub mod store;
pub mod transform;
pub mod value;

pub use db::adapter::{Adapter, RawValue, Row};
pub use error::{Error, Result};
pub use inheritance::InheritanceEngine;
pub use object::{Object, ObjectEngine, Status};
pub use object_list::{ObjectList, TableRow};
pub use reference_engine::ReferenceEngine;
pub use registry::{Identified, Registry};
pub use schema::{Attribute, AttributeAssignment, Class, Datatype, Key, Reference, SchemaManager};
pub use store::{InfoEntry, Store};
pub use transform::{Host, ObjectSummary, TransformLookup};
pub use value::Value;
