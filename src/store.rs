// src/store.rs

//! `Store` (§6.3): the single entry point that owns the adapter, the
//! Structure Registries, the Inheritance Engine, and the Transformer Host,
//! and exposes the full schema/object/reference surface over them.
//!
//! Every engine below (`SchemaManager`, `ObjectEngine`, `ReferenceEngine`)
//! borrows its dependencies by reference and carries no state of its own, so
//! `Store`'s methods construct the engine they need as a short-lived local
//! value rather than storing it — this sidesteps the self-referential
//! struct a permanently-borrowing field would require.

use std::rc::{Rc, Weak};

use rusqlite::ToSql;

use crate::db::{self, adapter::Adapter};
use crate::ddl;
use crate::error::Result;
use crate::inheritance::InheritanceEngine;
use crate::object::{Object, ObjectEngine, Status};
use crate::reference_engine::ReferenceEngine;
use crate::registry::Registry;
use crate::schema::{Attribute, AttributeAssignment, Class, Datatype, Key, Reference, SchemaManager};
use crate::transform::{Host, ObjectSummary, TransformLookup};
use crate::value::Value;
use std::collections::HashMap;

/// One row of the free-form activity log (`info` table, §6.1).
#[derive(Debug, Clone, serde::Serialize)]
pub struct InfoEntry {
    pub time: String,
    pub version: Option<String>,
    pub comment: Option<String>,
}

struct StoreInner {
    adapter: Adapter,
    datatypes: Registry<Datatype>,
    classes: Registry<Class>,
    attributes: Registry<Attribute>,
    references: Registry<Reference>,
    inheritance: InheritanceEngine,
    host: Host,
}

impl StoreInner {
    fn schema(&self) -> SchemaManager<'_> {
        SchemaManager {
            adapter: &self.adapter,
            datatypes: &self.datatypes,
            classes: &self.classes,
            attributes: &self.attributes,
            references: &self.references,
            inheritance: &self.inheritance,
        }
    }
}

impl TransformLookup for StoreInner {
    fn lookup_class(&self, name: &str) -> Option<(i64, String)> {
        self.schema().get_class(name).ok().map(|c| (c.id, c.name))
    }

    fn lookup_attribute(&self, name: &str) -> Option<(i64, String)> {
        self.schema().get_attribute(name).ok().map(|a| (a.id, a.name))
    }

    fn lookup_reference(&self, name: &str) -> Option<(i64, String)> {
        self.schema().get_reference(name).ok().map(|r| (r.id, r.name))
    }

    fn lookup_object(&self, id: i64) -> Option<ObjectSummary> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.adapter, schema: &schema, host: &self.host };
        let object = objects.get_object(id).ok()?;
        objects.object_summary(&object).ok()
    }
}

/// The object store's public entry point. Cheaply clonable — clones share
/// the same underlying connection and caches via `Rc`.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        Self::from_adapter(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_adapter(db::open_in_memory()?)
    }

    fn from_adapter(adapter: Adapter) -> Result<Self> {
        let inner = Rc::new(StoreInner {
            adapter,
            datatypes: Registry::new(),
            classes: Registry::new(),
            attributes: Registry::new(),
            references: Registry::new(),
            inheritance: InheritanceEngine::new(),
            host: Host::new()?,
        });
        let lookup: Weak<dyn TransformLookup> = Rc::downgrade(&inner);
        inner.host.bind(lookup);
        Ok(Self { inner })
    }

    fn schema(&self) -> SchemaManager<'_> {
        self.inner.schema()
    }

    // ---- Schema: datatypes --------------------------------------------

    pub fn create_datatype(
        &self,
        name: &str,
        read_transformer_source: Option<String>,
        write_transformer_source: Option<String>,
        generator: Option<String>,
        parent: Option<&Datatype>,
    ) -> Result<Datatype> {
        self.schema().create_datatype(name, read_transformer_source, write_transformer_source, generator, parent)
    }

    pub fn get_datatype<'k>(&self, key: impl Into<Key<'k>>) -> Result<Datatype> {
        self.schema().get_datatype(key)
    }

    // ---- Schema: classes ------------------------------------------------

    pub fn create_class(&self, name: &str, parent: Option<&Class>, traced: bool) -> Result<Class> {
        self.schema().create_class(name, parent, traced)
    }

    pub fn get_class<'k>(&self, key: impl Into<Key<'k>>) -> Result<Class> {
        self.schema().get_class(key)
    }

    pub fn children(&self, class: &Class) -> Result<Vec<Class>> {
        self.schema().children(class)
    }

    pub fn descendants(&self, class: &Class) -> Result<Vec<Class>> {
        self.schema().descendants(class)
    }

    pub fn family_tree(&self, class: &Class) -> Result<Vec<Class>> {
        self.schema().family_tree(class)
    }

    // ---- Schema: attributes ---------------------------------------------

    pub fn create_attribute(&self, name: &str, datatype: &Datatype) -> Result<Attribute> {
        self.schema().create_attribute(name, datatype)
    }

    pub fn get_attribute<'k>(&self, key: impl Into<Key<'k>>) -> Result<Attribute> {
        self.schema().get_attribute(key)
    }

    pub fn assign(
        &self,
        class: &Class,
        attribute: &Attribute,
        indexed: bool,
        read_transformer_source: Option<String>,
        write_transformer_source: Option<String>,
    ) -> Result<AttributeAssignment> {
        self.schema().assign(class, attribute, indexed, read_transformer_source, write_transformer_source)
    }

    pub fn assignment_for(&self, class: &Class, attribute_id: i64) -> Result<Option<(Class, AttributeAssignment)>> {
        self.schema().assignment_for(class, attribute_id)
    }

    // ---- Schema: references ----------------------------------------------

    pub fn create_reference(&self, name: &str, origin: &Class, target: &Class, cardinality: Option<i64>) -> Result<Reference> {
        self.schema().create_reference(name, origin, target, cardinality)
    }

    pub fn get_reference<'k>(&self, key: impl Into<Key<'k>>) -> Result<Reference> {
        self.schema().get_reference(key)
    }

    // ---- Objects ----------------------------------------------------------

    pub fn touch(&self, class: &Class) -> Result<Object> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.touch(class)
    }

    pub fn create_object(&self, class: &Class, attributes: HashMap<String, Value>) -> Result<Object> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.create_object(class, attributes)
    }

    pub fn modify(&self, object: &mut Object, attributes: HashMap<String, Value>) -> Result<()> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.modify(object, attributes)
    }

    pub fn activate(&self, object: &mut Object) -> Result<()> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.activate(object)
    }

    pub fn deactivate(&self, object: &mut Object) -> Result<()> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.deactivate(object)
    }

    pub fn delete(&self, object: &mut Object) -> Result<()> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.delete(object)
    }

    pub fn get_value(&self, object: &Object, name: &str) -> Result<Value> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.get_value(object, name)
    }

    pub fn get_unprocessed_value(&self, object: &Object, name: &str) -> Result<Value> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.get_unprocessed_value(object, name)
    }

    pub fn get_object(&self, id: i64) -> Result<Object> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.get_object(id)
    }

    pub fn get_instances(&self, class: &Class, recursive: bool, active_only: bool) -> Result<Vec<Object>> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.get_instances(class, recursive, active_only)
    }

    pub fn dump(&self, object: &Object) -> Result<String> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        objects.dump(object)
    }

    // ---- References ---------------------------------------------------

    /// Binds `targets` to `origin` over `reference`, by name or id.
    pub fn bind<'k>(&self, reference: impl Into<Key<'k>>, origin: &Object, targets: &[&Object], rebind: bool) -> Result<()> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        let refs = ReferenceEngine { adapter: &self.inner.adapter, schema: &schema, objects: &objects };
        let reference = schema.get_reference(reference)?;
        refs.bind(&reference, origin, targets, rebind)
    }

    /// Resolves a reference already looked up by the caller — used by
    /// `ObjectList::hop`, which resolves the reference once up front rather
    /// than once per contained object.
    pub fn hop(&self, reference: &Reference, origin_id: i64, version: Option<i64>, active_only: bool) -> Result<Vec<Object>> {
        let schema = self.schema();
        let objects = ObjectEngine { adapter: &self.inner.adapter, schema: &schema, host: &self.inner.host };
        let refs = ReferenceEngine { adapter: &self.inner.adapter, schema: &schema, objects: &objects };
        refs.hop(reference, origin_id, version, active_only)
    }

    pub fn hop_by_name<'k>(&self, reference: impl Into<Key<'k>>, origin_id: i64, version: Option<i64>, active_only: bool) -> Result<Vec<Object>> {
        let reference = self.get_reference(reference)?;
        self.hop(&reference, origin_id, version, active_only)
    }

    pub fn hop_first<'k>(&self, reference: impl Into<Key<'k>>, origin_id: i64, version: Option<i64>, active_only: bool) -> Result<Option<Object>> {
        Ok(self.hop_by_name(reference, origin_id, version, active_only)?.into_iter().next())
    }

    // ---- DDL ------------------------------------------------------------

    /// Runs a DDL program (§4.8) against the current schema.
    pub fn run_ddl(&self, text: &str) -> Result<()> {
        let schema = self.schema();
        ddl::run(&schema, text)
    }

    // ---- Housekeeping -----------------------------------------------------

    pub fn commit(&self) -> Result<()> {
        self.inner.adapter.commit()
    }

    /// Drops every Structure Registry's cached records and clears the
    /// Inheritance Engine's derived-data caches, forcing the next read to go
    /// back to storage. Does not touch the Transformer Host's compiled
    /// function cache, which is keyed by source text and stays valid.
    pub fn clear_cache(&self) {
        self.inner.datatypes.clear();
        self.inner.classes.clear();
        self.inner.attributes.clear();
        self.inner.references.clear();
        self.inner.inheritance.clear();
    }

    /// Appends a row to the free-form activity log (`info` table), stamped
    /// with this crate's own version.
    pub fn log(&self, comment: &str) -> Result<()> {
        let version = env!("CARGO_PKG_VERSION");
        self.inner.adapter.execute(
            "INSERT INTO info (version, comment) VALUES (?1, ?2)",
            &[&version as &dyn ToSql, &comment as &dyn ToSql],
        )?;
        Ok(())
    }

    /// The most recent activity log entries, newest first, `limit` of them
    /// (or every entry when `limit` is `None`).
    pub fn info(&self, limit: Option<i64>) -> Result<Vec<InfoEntry>> {
        let sql = match limit {
            Some(n) => format!("SELECT time, version, comment FROM info ORDER BY time DESC LIMIT {n}"),
            None => "SELECT time, version, comment FROM info ORDER BY time DESC".to_string(),
        };
        let rows = self.inner.adapter.fetch_all(&sql, &[])?;
        Ok(rows
            .into_iter()
            .map(|row| InfoEntry {
                time: row.get("time").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                version: row.get("version").and_then(|v| v.as_str()).map(str::to_string),
                comment: row.get("comment").and_then(|v| v.as_str()).map(str::to_string),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_then_object_lifecycle_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store.create_datatype("text", None, None, Some("TEXT".into()), None).unwrap();
        store.run_ddl("+attributes { first_name:text }\nPerson { first_name }").unwrap();

        let person = store.get_class("Person").unwrap();
        let mut attrs = HashMap::new();
        attrs.insert("first_name".to_string(), Value::Text("Ada".to_string()));
        let object = store.create_object(&person, attrs).unwrap();

        assert_eq!(object.status, Status::Active);
        assert_eq!(store.get_value(&object, "first_name").unwrap(), Value::Text("Ada".to_string()));

        let fetched = store.get_object(object.id).unwrap();
        assert_eq!(fetched.id, object.id);
    }

    #[test]
    fn bind_and_hop_by_name_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let person = store.create_class("Person", None, false).unwrap();
        let address = store.create_class("Address", None, false).unwrap();
        store.create_reference("lives_at", &person, &address, None).unwrap();

        let mut origin = store.touch(&person).unwrap();
        store.activate(&mut origin).unwrap();
        let mut target = store.touch(&address).unwrap();
        store.activate(&mut target).unwrap();

        store.bind("lives_at", &origin, &[&target], false).unwrap();
        let hopped = store.hop_by_name("lives_at", origin.id, None, true).unwrap();
        assert_eq!(hopped.len(), 1);
        assert_eq!(hopped[0].id, target.id);
    }

    #[test]
    fn clear_cache_forces_registry_miss_without_breaking_reads() {
        let store = Store::open_in_memory().unwrap();
        let person = store.create_class("Person", None, false).unwrap();
        store.clear_cache();
        let reloaded = store.get_class(person.id).unwrap();
        assert_eq!(reloaded.name, "Person");
    }

    #[test]
    fn log_and_info_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        store.log("created schema").unwrap();
        let entries = store.info(Some(10)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].comment.as_deref(), Some("created schema"));
    }

    #[test]
    fn money_transformer_survives_a_store_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let int = store.create_datatype("int", None, None, Some("INTEGER".into()), None).unwrap();
        let money = store
            .create_datatype(
                "money",
                Some("return decimal_from_units(value, 2)".to_string()),
                Some("return decimal_to_units(value, 2)".to_string()),
                None,
                Some(&int),
            )
            .unwrap();
        let person = store.create_class("Person", None, false).unwrap();
        let price = store.create_attribute("price", &money).unwrap();
        store.assign(&person, &price, false, None, None).unwrap();

        let mut attrs = HashMap::new();
        attrs.insert("price".to_string(), Value::Decimal(crate::value::decimal_from_units(499, 2)));
        let object = store.create_object(&person, attrs).unwrap();

        match store.get_value(&object, "price").unwrap() {
            Value::Decimal(d) => assert_eq!(d.to_string(), "4.99"),
            other => panic!("expected decimal, got {other:?}"),
        }
    }
}
