// src/object.rs

//! The Object Engine: object lifecycle, the two-stage read/write pipelines,
//! `modify`, and the multi-table class view that materialises an object's
//! inherited attributes in one query.
//!
//! An [`Object`] owns its `raw_attributes` map and the memoisation of
//! derived (unprocessed/processed) values; it does not own its [`Class`],
//! which outlives it. Memoisation lives in `RefCell`s so reads can be served
//! through a shared `&Object` the same way the Structure Registry serves
//! read-through caches through `&self`.

use std::cell::RefCell;
use std::collections::HashMap;

use rusqlite::ToSql;

use crate::db::adapter::{Adapter, RawValue};
use crate::error::{Error, Result};
use crate::naming;
use crate::schema::assignment::AttributeAssignment;
use crate::schema::class::Class;
use crate::schema::datatype::Datatype;
use crate::schema::SchemaManager;
use crate::transform::{Host, ObjectSummary};
use crate::value::Value;

/// Status codes, matching the bootstrap schema's `data_meta.status` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    InCreation,
    Active,
    Inactive,
    Deleted,
}

impl Status {
    pub fn as_i64(self) -> i64 {
        match self {
            Status::InCreation => 0,
            Status::Active => 1,
            Status::Inactive => 2,
            Status::Deleted => 3,
        }
    }
}

impl TryFrom<i64> for Status {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Ok(match value {
            0 => Status::InCreation,
            1 => Status::Active,
            2 => Status::Inactive,
            3 => Status::Deleted,
            other => return Err(Error::NotFound(format!("status code '{other}'"))),
        })
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Status::InCreation => "In creation",
            Status::Active => "Active",
            Status::Inactive => "Inactive",
            Status::Deleted => "Deleted",
        };
        write!(f, "{label}")
    }
}

/// A logical object: one identity spanning many versioned rows across its
/// class's family tree. `raw_attributes` is the dynamic attribute bag (§9);
/// `unprocessed_cache`/`processed_cache` memoise the two read-pipeline
/// stages, invalidated per-key by [`Object::update_raw_attributes`].
#[derive(Debug, Clone)]
pub struct Object {
    pub id: i64,
    pub class: Class,
    pub status: Status,
    pub created: String,
    pub current_version: i64,
    raw_attributes: RefCell<HashMap<String, RawValue>>,
    unprocessed_cache: RefCell<HashMap<String, Value>>,
    processed_cache: RefCell<HashMap<String, Value>>,
}

impl Object {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.raw_attributes.borrow().keys().cloned().collect()
    }

    pub fn get_raw_value(&self, name: &str) -> Result<RawValue> {
        self.raw_attributes
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Merges freshly written raw values into the bag and drops any cached
    /// unprocessed/processed value for the touched keys, per §4.6's read
    /// pipeline note ("memoisation is invalidated for any attribute
    /// overwritten by `update_raw_attributes`").
    fn update_raw_attributes(&self, updates: HashMap<String, RawValue>) {
        for key in updates.keys() {
            self.unprocessed_cache.borrow_mut().remove(key);
            self.processed_cache.borrow_mut().remove(key);
        }
        self.raw_attributes.borrow_mut().extend(updates);
    }
}

/// The datatype's own chain root-first; §4.5.1's `compose_read` applies
/// each level's read transformer on the way down from root to the datatype.
fn compose_read(schema: &SchemaManager<'_>, host: &Host, datatype: &Datatype, raw: Value) -> Result<Value> {
    let chain = schema.inheritance.datatype_chain(schema.adapter, datatype)?;
    let mut value = raw;
    for level in &chain {
        value = host.invoke_datatype(level.read_transformer_source.as_deref(), value);
    }
    Ok(value)
}

/// Mirror of [`compose_read`]: dt's own write transformer applies first,
/// each ancestor's after, root last — the processed-to-raw direction
/// reverses the read direction (§4.5.1).
fn compose_write(schema: &SchemaManager<'_>, host: &Host, datatype: &Datatype, value: Value) -> Result<Value> {
    let chain = schema.inheritance.datatype_chain(schema.adapter, datatype)?;
    let mut value = value;
    for level in chain.iter().rev() {
        value = host.invoke_datatype(level.write_transformer_source.as_deref(), value);
    }
    Ok(value)
}

/// Borrows the adapter, Schema Manager, and Transformer Host it needs;
/// owns no state of its own, matching the Structure Registry's "non-owning
/// handle" ownership rule from §3.
pub struct ObjectEngine<'a> {
    pub adapter: &'a Adapter,
    pub schema: &'a SchemaManager<'a>,
    pub host: &'a Host,
}

impl<'a> ObjectEngine<'a> {
    /// Creates a new object in `InCreation` with every inherited attribute
    /// `NULL`, per §3's Lifecycle.
    pub fn touch(&self, class: &Class) -> Result<Object> {
        self.adapter.execute("INSERT INTO data_meta (class_id) VALUES (?1)", &[&class.id as &dyn ToSql])?;
        let id = self.adapter.last_insert_id();

        let meta = self
            .adapter
            .fetch_one("SELECT status, current_version, created FROM data_meta WHERE id = ?1", &[&id as &dyn ToSql])?
            .ok_or_else(|| Error::NotFound(format!("object '{id}'")))?;
        let status = Status::try_from(meta.get("status").and_then(|v| v.as_i64()).unwrap_or(0))?;
        let current_version = meta.get("current_version").and_then(|v| v.as_i64()).unwrap_or(0);
        let created = meta.get("created").and_then(|v| v.as_str()).unwrap_or_default().to_string();

        let mut raw_attributes = HashMap::new();
        for ancestor in self.schema.family_tree(class)? {
            for assignment in AttributeAssignment::find_for_class(self.adapter, ancestor.id)? {
                let attribute = self.schema.get_attribute(assignment.attribute_id)?;
                raw_attributes.insert(attribute.name, RawValue::Null);
            }
        }

        tracing::debug!(id, class = class.name, "touched object");
        Ok(Object {
            id,
            class: class.clone(),
            status,
            created,
            current_version,
            raw_attributes: RefCell::new(raw_attributes),
            unprocessed_cache: RefCell::new(HashMap::new()),
            processed_cache: RefCell::new(HashMap::new()),
        })
    }

    /// `touch` followed by an optional `modify` and `activate`.
    pub fn create_object(&self, class: &Class, attributes: HashMap<String, Value>) -> Result<Object> {
        let mut object = self.touch(class)?;
        if !attributes.is_empty() {
            self.modify(&mut object, attributes)?;
        }
        self.activate(&mut object)?;
        Ok(object)
    }

    fn set_status(&self, object: &mut Object, status: Status) -> Result<()> {
        self.adapter
            .execute("UPDATE data_meta SET status = ?1 WHERE id = ?2", &[&status.as_i64() as &dyn ToSql, &object.id as &dyn ToSql])?;
        object.status = status;
        Ok(())
    }

    pub fn activate(&self, object: &mut Object) -> Result<()> {
        self.set_status(object, Status::Active)
    }

    pub fn deactivate(&self, object: &mut Object) -> Result<()> {
        self.set_status(object, Status::Inactive)
    }

    /// Terminal only for traversal defaults (§4.6's Status transitions);
    /// the row itself is never removed.
    pub fn delete(&self, object: &mut Object) -> Result<()> {
        self.set_status(object, Status::Deleted)
    }

    /// Snapshots `object` into the shape the Transformer Host's `this`
    /// parameter and `get_object` global expect.
    pub fn object_summary(&self, object: &Object) -> Result<ObjectSummary> {
        let mut attributes = Vec::new();
        for name in object.attribute_names() {
            attributes.push((name.clone(), self.get_unprocessed_value(object, &name)?));
        }
        Ok(ObjectSummary {
            id: object.id,
            class_name: object.class.name.clone(),
            status: object.status.as_i64(),
            attributes,
        })
    }

    /// Stage 2 of the read pipeline (§4.6): datatype chain read transforms,
    /// memoised per attribute.
    pub fn get_unprocessed_value(&self, object: &Object, name: &str) -> Result<Value> {
        if let Some(cached) = object.unprocessed_cache.borrow().get(name) {
            return Ok(cached.clone());
        }
        let raw = object.get_raw_value(name)?;
        let attribute = self.schema.get_attribute(name)?;
        let datatype = self.schema.get_datatype(attribute.datatype_id)?;
        let unprocessed = compose_read(self.schema, self.host, &datatype, Value::from(raw))?;
        object.unprocessed_cache.borrow_mut().insert(name.to_string(), unprocessed.clone());
        Ok(unprocessed)
    }

    /// Stage 3 of the read pipeline: the assignment's own read transform
    /// applied on top of the unprocessed value. This is what callers see.
    pub fn get_value(&self, object: &Object, name: &str) -> Result<Value> {
        if let Some(cached) = object.processed_cache.borrow().get(name) {
            return Ok(cached.clone());
        }
        let unprocessed = self.get_unprocessed_value(object, name)?;
        let attribute = self.schema.get_attribute(name)?;
        let (_, assignment) = self
            .schema
            .assignment_for(&object.class, attribute.id)?
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))?;
        let this = self.object_summary(object)?;
        let processed = self.host.invoke_assignment(assignment.read_transformer_source.as_deref(), unprocessed, Some(&this));
        object.processed_cache.borrow_mut().insert(name.to_string(), processed.clone());
        Ok(processed)
    }

    /// §4.6's `modify` algorithm: write pipeline per touched attribute,
    /// partitioned by the class that owns its assignment, one new row (or
    /// version stamp) per ancestor class, then the object's version counter
    /// advances last.
    pub fn modify(&self, object: &mut Object, attributes: HashMap<String, Value>) -> Result<()> {
        let current_version = object.current_version;
        let new_version = current_version + 1;
        let mut raw_updates: HashMap<String, RawValue> = HashMap::new();
        let this = self.object_summary(object)?;

        for ancestor in self.schema.family_tree(&object.class)? {
            let table = naming::data_table_name(&ancestor.name);
            let assignments = AttributeAssignment::find_for_class(self.adapter, ancestor.id)?;

            let mut class_attribute_names = Vec::with_capacity(assignments.len());
            let mut by_name: HashMap<String, AttributeAssignment> = HashMap::with_capacity(assignments.len());
            for assignment in assignments {
                let attribute = self.schema.get_attribute(assignment.attribute_id)?;
                class_attribute_names.push(attribute.name.clone());
                by_name.insert(attribute.name, assignment);
            }

            let mut current_attributes: HashMap<String, RawValue> = HashMap::new();
            for (name, value) in attributes.iter() {
                let Some(assignment) = by_name.get(name) else { continue };
                let attribute = self.schema.get_attribute(assignment.attribute_id)?;
                let datatype = self.schema.get_datatype(attribute.datatype_id)?;
                let written = self.host.invoke_assignment(assignment.write_transformer_source.as_deref(), value.clone(), Some(&this));
                let raw = compose_write(self.schema, self.host, &datatype, written)?.into_raw()?;
                current_attributes.insert(name.clone(), raw);
            }

            if current_attributes.is_empty() {
                self.adapter.execute(
                    &format!("UPDATE {table} SET version = ?1 WHERE id = ?2 AND version = ?3"),
                    &[&new_version as &dyn ToSql, &object.id as &dyn ToSql, &current_version as &dyn ToSql],
                )?;
                continue;
            }

            let cols_to_adopt: Vec<&String> =
                class_attribute_names.iter().filter(|name| !current_attributes.contains_key(*name)).collect();
            if !cols_to_adopt.is_empty() {
                let col_list = cols_to_adopt.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
                let sql = format!("SELECT {col_list} FROM {table} WHERE id = ?1 AND version = ?2");
                if let Some(row) = self.adapter.fetch_one(&sql, &[&object.id as &dyn ToSql, &current_version as &dyn ToSql])? {
                    for col in cols_to_adopt {
                        if let Some(value) = row.get(col.as_str()) {
                            current_attributes.insert(col.clone(), value.clone());
                        }
                    }
                }
            }

            raw_updates.extend(current_attributes.clone());

            let ordered: Vec<(String, RawValue)> = current_attributes.into_iter().collect();
            let mut cols = String::from("id, version");
            let mut placeholders = String::from("?1, ?2");
            for (i, (name, _)) in ordered.iter().enumerate() {
                cols.push_str(&format!(", {name}"));
                placeholders.push_str(&format!(", ?{}", i + 3));
            }
            let sql = format!("INSERT INTO {table} ({cols}) VALUES ({placeholders})");
            let mut params: Vec<&dyn ToSql> = vec![&object.id, &new_version];
            for (_, value) in &ordered {
                params.push(value);
            }
            self.adapter.execute(&sql, &params)?;
        }

        self.adapter
            .execute("UPDATE data_meta SET current_version = ?1 WHERE id = ?2", &[&new_version as &dyn ToSql, &object.id as &dyn ToSql])?;
        object.current_version = new_version;
        object.update_raw_attributes(raw_updates);
        tracing::debug!(id = object.id, new_version, "modified object");
        Ok(())
    }

    /// §4.6's `class_view_sql`: one row per object id, every inherited
    /// attribute aliased to its own name via a `LEFT JOIN` per ancestor
    /// class, so a row with any ancestor missing its current-version entry
    /// still yields nulls rather than dropping the object.
    pub fn class_view_sql(&self, class: &Class) -> Result<String> {
        let family = self.schema.family_tree(class)?;
        let mut cols = vec!["data_meta.id AS id".to_string()];
        let mut joins = Vec::with_capacity(family.len());
        for ancestor in &family {
            let table = naming::data_table_name(&ancestor.name);
            joins.push(format!(
                "LEFT JOIN {table} ON data_meta.id = {table}.id AND data_meta.current_version = {table}.version"
            ));
            for assignment in AttributeAssignment::find_for_class(self.adapter, ancestor.id)? {
                let attribute = self.schema.get_attribute(assignment.attribute_id)?;
                cols.push(format!("{table}.{col} AS {col}", col = attribute.name));
            }
        }
        Ok(format!(
            "SELECT {} FROM data_meta {} WHERE data_meta.class_id = {}",
            cols.join(", "),
            joins.join(" "),
            class.id
        ))
    }

    /// Fetches the meta row, resolves the class, then selects the class
    /// view filtered to this id to materialise the object's raw attributes.
    pub fn get_object(&self, id: i64) -> Result<Object> {
        let meta = self
            .adapter
            .fetch_one("SELECT * FROM data_meta WHERE id = ?1", &[&id as &dyn ToSql])?
            .ok_or_else(|| Error::NotFound(format!("object '{id}'")))?;
        let class_id = meta.get("class_id").and_then(|v| v.as_i64()).unwrap();
        let class = self.schema.get_class(class_id)?;
        let status = Status::try_from(meta.get("status").and_then(|v| v.as_i64()).unwrap_or(0))?;
        let current_version = meta.get("current_version").and_then(|v| v.as_i64()).unwrap_or(0);
        let created = meta.get("created").and_then(|v| v.as_str()).unwrap_or_default().to_string();

        let view_sql = self.class_view_sql(&class)?;
        let sql = format!("{view_sql} AND data_meta.id = ?1");
        let row = self.adapter.fetch_one(&sql, &[&id as &dyn ToSql])?;

        let mut raw_attributes = HashMap::new();
        if let Some(row) = row {
            for (column, value) in row {
                if column == "id" {
                    continue;
                }
                raw_attributes.insert(column, value);
            }
        }

        Ok(Object {
            id,
            class,
            status,
            created,
            current_version,
            raw_attributes: RefCell::new(raw_attributes),
            unprocessed_cache: RefCell::new(HashMap::new()),
            processed_cache: RefCell::new(HashMap::new()),
        })
    }

    /// §2's "supplemented" recursive form of `get_instances`: `recursive`
    /// widens the class filter to the whole descendant set.
    pub fn get_instances(&self, class: &Class, recursive: bool, active_only: bool) -> Result<Vec<Object>> {
        let mut class_ids = vec![class.id];
        if recursive {
            class_ids.extend(self.schema.descendants(class)?.into_iter().map(|c| c.id));
        }

        let placeholders = (1..=class_ids.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let mut sql = format!("SELECT id FROM data_meta WHERE class_id IN ({placeholders})");
        if active_only {
            sql.push_str(&format!(" AND status = {}", Status::Active.as_i64()));
        }
        let params: Vec<&dyn ToSql> = class_ids.iter().map(|id| id as &dyn ToSql).collect();
        let rows = self.adapter.fetch_all(&sql, &params)?;

        rows.into_iter()
            .map(|row| self.get_object(row.get("id").and_then(|v| v.as_i64()).unwrap()))
            .collect()
    }

    /// Human-readable dump: class, id, status, then every attribute's
    /// processed value — the CLI's `dump` subcommand and §2's supplemented
    /// `Object::dump` convenience.
    pub fn dump(&self, object: &Object) -> Result<String> {
        let mut names = object.attribute_names();
        names.sort();
        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            let value = self.get_value(object, &name)?;
            lines.push(format!("  {name} = {value:?}"));
        }
        Ok(format!("{} {} ({}):\n{}", object.class.name, object.id, object.status, lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::inheritance::InheritanceEngine;
    use crate::registry::Registry;
    use crate::schema::{Attribute, Datatype as DatatypeRecord};

    struct Fixture {
        adapter: Adapter,
        datatypes: Registry<DatatypeRecord>,
        classes: Registry<Class>,
        attributes: Registry<Attribute>,
        references: Registry<crate::schema::Reference>,
        inheritance: InheritanceEngine,
        host: Host,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                adapter: db::open_in_memory().unwrap(),
                datatypes: Registry::new(),
                classes: Registry::new(),
                attributes: Registry::new(),
                references: Registry::new(),
                inheritance: InheritanceEngine::new(),
                host: Host::new().unwrap(),
            }
        }

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

    #[test]
    fn inheritance_flattening() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let engine = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };

        let text = schema.create_datatype("text", None, None, Some("TEXT".into()), None).unwrap();
        let int = schema.create_datatype("int", None, None, Some("INTEGER".into()), None).unwrap();
        let person = schema.create_class("Person", None, false).unwrap();
        let employee = schema.create_class("Employee", Some(&person), false).unwrap();
        let first_name = schema.create_attribute("first_name", &text).unwrap();
        let salary = schema.create_attribute("salary", &int).unwrap();
        schema.assign(&person, &first_name, false, None, None).unwrap();
        schema.assign(&employee, &salary, false, None, None).unwrap();

        let mut object = engine.touch(&employee).unwrap();
        let mut attrs = HashMap::new();
        attrs.insert("first_name".to_string(), Value::Text("A".to_string()));
        attrs.insert("salary".to_string(), Value::Integer(10));
        engine.modify(&mut object, attrs).unwrap();

        assert_eq!(engine.get_value(&object, "first_name").unwrap(), Value::Text("A".to_string()));
        assert_eq!(engine.get_value(&object, "salary").unwrap(), Value::Integer(10));
    }

    #[test]
    fn versioned_modify_carries_ancestor_columns_forward() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let engine = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };

        let text = schema.create_datatype("text", None, None, Some("TEXT".into()), None).unwrap();
        let int = schema.create_datatype("int", None, None, Some("INTEGER".into()), None).unwrap();
        let person = schema.create_class("Person", None, false).unwrap();
        let employee = schema.create_class("Employee", Some(&person), false).unwrap();
        let first_name = schema.create_attribute("first_name", &text).unwrap();
        let salary = schema.create_attribute("salary", &int).unwrap();
        schema.assign(&person, &first_name, false, None, None).unwrap();
        schema.assign(&employee, &salary, false, None, None).unwrap();

        let mut object = engine.touch(&employee).unwrap();
        let mut first = HashMap::new();
        first.insert("first_name".to_string(), Value::Text("A".to_string()));
        engine.modify(&mut object, first).unwrap();

        // First modify only touches Person's column; Employee has no row yet
        // so its "stamp forward" update is a no-op until something assigned
        // to it is actually written.
        assert_eq!(object.current_version, 1);
        let person_rows = fx
            .adapter
            .fetch_all("SELECT version FROM data_Person WHERE id = ?1 ORDER BY version", &[&object.id as &dyn ToSql])
            .unwrap();
        let versions: Vec<i64> = person_rows.iter().map(|r| r.get("version").unwrap().as_i64().unwrap()).collect();
        assert_eq!(versions, vec![1]);
        let employee_rows = fx
            .adapter
            .fetch_all("SELECT version FROM data_Employee WHERE id = ?1", &[&object.id as &dyn ToSql])
            .unwrap();
        assert!(employee_rows.is_empty());

        let mut second = HashMap::new();
        second.insert("salary".to_string(), Value::Integer(10));
        engine.modify(&mut object, second).unwrap();

        // Second modify only touches Employee's column; Person's existing v1
        // row is stamped forward in place rather than duplicated (§4.6: "UPDATE
        // data_K SET version = new ... stamp the latest row with the new
        // version"), so Person still has exactly one row, now at v2.
        assert_eq!(object.current_version, 2);

        let person_rows = fx
            .adapter
            .fetch_all("SELECT version FROM data_Person WHERE id = ?1 ORDER BY version", &[&object.id as &dyn ToSql])
            .unwrap();
        let versions: Vec<i64> = person_rows.iter().map(|r| r.get("version").unwrap().as_i64().unwrap()).collect();
        assert_eq!(versions, vec![2]);

        let employee_rows = fx
            .adapter
            .fetch_all("SELECT version FROM data_Employee WHERE id = ?1 ORDER BY version", &[&object.id as &dyn ToSql])
            .unwrap();
        let versions: Vec<i64> = employee_rows.iter().map(|r| r.get("version").unwrap().as_i64().unwrap()).collect();
        assert_eq!(versions, vec![2]);

        assert_eq!(engine.get_value(&object, "first_name").unwrap(), Value::Text("A".to_string()));
        assert_eq!(engine.get_value(&object, "salary").unwrap(), Value::Integer(10));
    }

    #[test]
    fn transformer_pipeline_roundtrips_decimal_money() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let engine = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };

        let money = schema
            .create_datatype(
                "money",
                Some("return decimal_from_units(value, 2)".to_string()),
                Some("return decimal_to_units(value, 2)".to_string()),
                Some("INTEGER".into()),
                None,
            )
            .unwrap();
        let person = schema.create_class("Person", None, false).unwrap();
        let price = schema.create_attribute("price", &money).unwrap();
        schema.assign(&person, &price, false, None, None).unwrap();

        let mut object = engine.touch(&person).unwrap();
        let mut attrs = HashMap::new();
        attrs.insert("price".to_string(), Value::Decimal(crate::value::decimal_from_units(123, 2)));
        engine.modify(&mut object, attrs).unwrap();

        let raw = object.get_raw_value("price").unwrap();
        assert_eq!(raw, RawValue::Integer(123));

        match engine.get_value(&object, "price").unwrap() {
            Value::Decimal(d) => assert_eq!(d.to_string(), "1.23"),
            other => panic!("expected decimal, got {other:?}"),
        }
    }

    #[test]
    fn assignment_for_unassigned_class_attribute_is_unknown() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let engine = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };

        let int = schema.create_datatype("int", None, None, Some("INTEGER".into()), None).unwrap();
        let person = schema.create_class("Person", None, false).unwrap();
        schema.create_attribute("unused", &int).unwrap();
        let object = engine.touch(&person).unwrap();

        let err = engine.get_value(&object, "unused").unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute(_)));
    }
}
