// src/schema/mod.rs

//! The Schema Manager (§4.5): creates datatypes, classes, attributes,
//! references, and attribute assignments, and keeps their physical tables
//! and indices in lockstep with the structural metadata rows. Reads go
//! through the Structure Registry first; a miss falls back to the database
//! and populates the registry for next time.

pub mod assignment;
pub mod attribute;
pub mod class;
pub mod datatype;
pub mod reference;

use crate::db::adapter::Adapter;
use crate::error::{Error, Result};
use crate::inheritance::InheritanceEngine;
use crate::naming;
use crate::registry::Registry;

pub use assignment::AttributeAssignment;
pub use attribute::Attribute;
pub use class::Class;
pub use datatype::Datatype;
pub use reference::Reference;

/// A lookup key accepted by every `get_*` method: every structural read
/// resolves by either integer id or unique name.
#[derive(Debug, Clone, Copy)]
pub enum Key<'a> {
    Id(i64),
    Name(&'a str),
}

impl From<i64> for Key<'_> {
    fn from(id: i64) -> Self {
        Key::Id(id)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Key::Name(name)
    }
}

/// Owns no state of its own; it borrows the registries and inheritance
/// engine the store already holds so every method here can read-through
/// cache and invalidate consistently with the rest of the crate.
pub struct SchemaManager<'a> {
    pub adapter: &'a Adapter,
    pub datatypes: &'a Registry<Datatype>,
    pub classes: &'a Registry<Class>,
    pub attributes: &'a Registry<Attribute>,
    pub references: &'a Registry<Reference>,
    pub inheritance: &'a InheritanceEngine,
}

impl<'a> SchemaManager<'a> {
    // ---- Datatype -----------------------------------------------------

    pub fn create_datatype(
        &self,
        name: &str,
        read_transformer_source: Option<String>,
        write_transformer_source: Option<String>,
        generator: Option<String>,
        parent: Option<&Datatype>,
    ) -> Result<Datatype> {
        naming::validate_identifier(name)?;
        if generator.is_none() && parent.is_none() {
            return Err(Error::InvalidDatatype(name.to_string()));
        }
        if self.datatypes_find_by_name(name)?.is_some() {
            return Err(Error::DuplicateName(format!("datatype '{name}'")));
        }

        let record = Datatype {
            id: 0,
            name: name.to_string(),
            generator,
            parent_id: parent.map(|p| p.id),
            read_transformer_source,
            write_transformer_source,
        };
        let id = Datatype::insert(self.adapter, &record)?;
        let record = Datatype { id, ..record };
        self.datatypes.put(record.clone());
        tracing::debug!(name, id, "created datatype");
        Ok(record)
    }

    pub fn get_datatype<'k>(&self, key: impl Into<Key<'k>>) -> Result<Datatype> {
        match key.into() {
            Key::Id(id) => {
                if let Some(record) = self.datatypes.get_by_id(id) {
                    return Ok(record);
                }
                let record = Datatype::find_by_id(self.adapter, id)?
                    .ok_or_else(|| Datatype::not_found(&id.to_string()))?;
                self.datatypes.put(record.clone());
                Ok(record)
            }
            Key::Name(name) => {
                if let Some(record) = self.datatypes.get_by_name(name) {
                    return Ok(record);
                }
                let record = Datatype::find_by_name(self.adapter, name)?
                    .ok_or_else(|| Datatype::not_found(name))?;
                self.datatypes.put(record.clone());
                Ok(record)
            }
        }
    }

    fn datatypes_find_by_name(&self, name: &str) -> Result<Option<Datatype>> {
        if self.datatypes.contains_name(name) {
            return Ok(self.datatypes.get_by_name(name));
        }
        Datatype::find_by_name(self.adapter, name)
    }

    pub fn effective_generator(&self, datatype: &Datatype) -> Result<String> {
        self.inheritance.effective_generator(self.adapter, datatype)
    }

    // ---- Class ----------------------------------------------------------

    pub fn create_class(&self, name: &str, parent: Option<&Class>, traced: bool) -> Result<Class> {
        naming::validate_identifier(name)?;
        if self.classes_find_by_name(name)?.is_some() {
            return Err(Error::DuplicateName(format!("class '{name}'")));
        }

        self.adapter.execute_script(&format!(
            "CREATE TABLE {} (id INTEGER, version INTEGER, created DATETIME DEFAULT CURRENT_TIMESTAMP, PRIMARY KEY(id, version))",
            naming::data_table_name(name),
        ))?;

        let record = Class { id: 0, name: name.to_string(), parent_id: parent.map(|p| p.id), traced };
        let id = Class::insert(self.adapter, &record)?;
        let record = Class { id, ..record };
        self.classes.put(record.clone());
        tracing::debug!(name, id, parent = ?parent.map(|p| &p.name), "created class");
        Ok(record)
    }

    pub fn get_class<'k>(&self, key: impl Into<Key<'k>>) -> Result<Class> {
        match key.into() {
            Key::Id(id) => {
                if let Some(record) = self.classes.get_by_id(id) {
                    return Ok(record);
                }
                let record =
                    Class::find_by_id(self.adapter, id)?.ok_or_else(|| Class::not_found(&id.to_string()))?;
                self.classes.put(record.clone());
                Ok(record)
            }
            Key::Name(name) => {
                if let Some(record) = self.classes.get_by_name(name) {
                    return Ok(record);
                }
                let record =
                    Class::find_by_name(self.adapter, name)?.ok_or_else(|| Class::not_found(name))?;
                self.classes.put(record.clone());
                Ok(record)
            }
        }
    }

    fn classes_find_by_name(&self, name: &str) -> Result<Option<Class>> {
        if self.classes.contains_name(name) {
            return Ok(self.classes.get_by_name(name));
        }
        Class::find_by_name(self.adapter, name)
    }

    pub fn children(&self, class: &Class) -> Result<Vec<Class>> {
        self.inheritance.children(self.adapter, class.id)
    }

    pub fn descendants(&self, class: &Class) -> Result<Vec<Class>> {
        self.inheritance.descendants(self.adapter, class.id)
    }

    pub fn family_tree(&self, class: &Class) -> Result<Vec<Class>> {
        self.inheritance.family_tree(self.adapter, class)
    }

    // ---- Attribute --------------------------------------------------------

    pub fn create_attribute(&self, name: &str, datatype: &Datatype) -> Result<Attribute> {
        naming::validate_identifier(name)?;
        if self.attributes_find_by_name(name)?.is_some() {
            return Err(Error::DuplicateName(format!("attribute '{name}'")));
        }

        let record = Attribute { id: 0, name: name.to_string(), datatype_id: datatype.id };
        let id = Attribute::insert(self.adapter, &record)?;
        let record = Attribute { id, ..record };
        self.attributes.put(record.clone());
        tracing::debug!(name, id, "created attribute");
        Ok(record)
    }

    pub fn get_attribute<'k>(&self, key: impl Into<Key<'k>>) -> Result<Attribute> {
        match key.into() {
            Key::Id(id) => {
                if let Some(record) = self.attributes.get_by_id(id) {
                    return Ok(record);
                }
                let record = Attribute::find_by_id(self.adapter, id)?
                    .ok_or_else(|| Attribute::not_found(&id.to_string()))?;
                self.attributes.put(record.clone());
                Ok(record)
            }
            Key::Name(name) => {
                if let Some(record) = self.attributes.get_by_name(name) {
                    return Ok(record);
                }
                let record = Attribute::find_by_name(self.adapter, name)?
                    .ok_or_else(|| Attribute::not_found(name))?;
                self.attributes.put(record.clone());
                Ok(record)
            }
        }
    }

    fn attributes_find_by_name(&self, name: &str) -> Result<Option<Attribute>> {
        if self.attributes.contains_name(name) {
            return Ok(self.attributes.get_by_name(name));
        }
        Attribute::find_by_name(self.adapter, name)
    }

    /// Materialises `attribute` as a column of `class`'s physical table,
    /// optionally indexed, optionally carrying its own transformer pair.
    pub fn assign(
        &self,
        class: &Class,
        attribute: &Attribute,
        indexed: bool,
        read_transformer_source: Option<String>,
        write_transformer_source: Option<String>,
    ) -> Result<AttributeAssignment> {
        if AttributeAssignment::find(self.adapter, class.id, attribute.id)?.is_some() {
            return Err(AttributeAssignment::duplicate(&class.name, &attribute.name));
        }

        let datatype = self.get_datatype(attribute.datatype_id)?;
        let generator = self.effective_generator(&datatype)?;
        let table = naming::data_table_name(&class.name);

        self.adapter
            .execute_script(&format!("ALTER TABLE {table} ADD COLUMN {} {generator}", attribute.name))?;
        if indexed {
            self.adapter.execute_script(&format!(
                "CREATE INDEX {} ON {table}({})",
                naming::index_name(&class.name, &attribute.name),
                attribute.name,
            ))?;
        }

        let record = AttributeAssignment {
            class_id: class.id,
            attribute_id: attribute.id,
            indexed,
            read_transformer_source,
            write_transformer_source,
        };
        AttributeAssignment::insert(self.adapter, &record)?;
        self.inheritance.clear();
        tracing::debug!(class = class.name, attribute = attribute.name, indexed, "assigned attribute");
        Ok(record)
    }

    pub fn assignment_for(&self, class: &Class, attribute_id: i64) -> Result<Option<(Class, AttributeAssignment)>> {
        self.inheritance.assignment_for(self.adapter, class, attribute_id)
    }

    pub fn all_assignments(&self, class: &Class) -> Result<Vec<(Class, AttributeAssignment)>> {
        self.inheritance.all_assignments(self.adapter, class)
    }

    // ---- Reference --------------------------------------------------------

    pub fn create_reference(
        &self,
        name: &str,
        origin: &Class,
        target: &Class,
        cardinality: Option<i64>,
    ) -> Result<Reference> {
        naming::validate_identifier(name)?;
        if self.references_find_by_name(name)?.is_some() {
            return Err(Error::DuplicateName(format!("reference '{name}'")));
        }

        let record =
            Reference { id: 0, name: name.to_string(), origin_class_id: origin.id, target_class_id: target.id, cardinality };
        let id = Reference::insert(self.adapter, &record)?;
        let record = Reference { id, ..record };

        self.adapter.execute_script(&format!(
            "CREATE TABLE {} (origin_id INTEGER REFERENCES data_meta(id), target_id INTEGER REFERENCES data_meta(id), version INTEGER, created DATETIME DEFAULT CURRENT_TIMESTAMP, PRIMARY KEY(origin_id, target_id, version))",
            naming::reference_table_name(name),
        ))?;

        self.references.put(record.clone());
        tracing::debug!(name, id, origin = origin.name, target = target.name, "created reference");
        Ok(record)
    }

    pub fn get_reference<'k>(&self, key: impl Into<Key<'k>>) -> Result<Reference> {
        match key.into() {
            Key::Id(id) => {
                if let Some(record) = self.references.get_by_id(id) {
                    return Ok(record);
                }
                let record = Reference::find_by_id(self.adapter, id)?
                    .ok_or_else(|| Reference::not_found(&id.to_string()))?;
                self.references.put(record.clone());
                Ok(record)
            }
            Key::Name(name) => {
                if let Some(record) = self.references.get_by_name(name) {
                    return Ok(record);
                }
                let record = Reference::find_by_name(self.adapter, name)?
                    .ok_or_else(|| Reference::not_found(name))?;
                self.references.put(record.clone());
                Ok(record)
            }
        }
    }

    fn references_find_by_name(&self, name: &str) -> Result<Option<Reference>> {
        if self.references.contains_name(name) {
            return Ok(self.references.get_by_name(name));
        }
        Reference::find_by_name(self.adapter, name)
    }
}
