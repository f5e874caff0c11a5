// src/reference_engine.rs

//! The Reference Engine (§4.7): directed, named, cardinality-bounded edges
//! between objects. `bind` is append-only per `(reference, origin)` version:
//! carrying a target forward inserts a new row at the new version rather
//! than mutating the row at the prior version, so prior-version rows stay
//! queryable (§3 Invariant #6). `hop` resolves a version (current by
//! default) and materialises its targets through the Object Engine.

use std::collections::HashSet;

use rusqlite::ToSql;

use crate::db::adapter::Adapter;
use crate::error::{Error, Result};
use crate::naming;
use crate::object::{Object, ObjectEngine, Status};
use crate::schema::reference::Reference;
use crate::schema::SchemaManager;

/// Borrows the adapter, Schema Manager, and Object Engine it needs to
/// resolve targets; owns no state, same ownership rule as the other
/// engines (§3).
pub struct ReferenceEngine<'a> {
    pub adapter: &'a Adapter,
    pub schema: &'a SchemaManager<'a>,
    pub objects: &'a ObjectEngine<'a>,
}

impl<'a> ReferenceEngine<'a> {
    /// §4.7's `bind` algorithm: enforce cardinality, bump the
    /// `(reference, origin)` version, carry every currently bound target
    /// forward unless `rebind` by inserting a row for it at the new version
    /// (the row at the prior version is left untouched, so a historical
    /// `hop` against that version still finds it), then insert whichever of
    /// `targets` are not already carried.
    pub fn bind(&self, reference: &Reference, origin: &Object, targets: &[&Object], rebind: bool) -> Result<()> {
        if let Some(cardinality) = reference.cardinality {
            if targets.len() as i64 > cardinality {
                return Err(Error::CardinalityExceeded(format!(
                    "{} targets exceed cardinality {cardinality} for reference '{}'",
                    targets.len(),
                    reference.name
                )));
            }
            if !rebind {
                let current_bound = self.hop(reference, origin.id, None, true)?.len() as i64;
                if targets.len() as i64 + current_bound > cardinality {
                    return Err(Error::CardinalityExceeded(format!(
                        "{current_bound} objects already linked via '{}'; adding {} more exceeds cardinality {cardinality}",
                        reference.name,
                        targets.len()
                    )));
                }
            }
        }

        let new_version = Reference::bump_version(self.adapter, reference.id, origin.id)?;
        let table = naming::reference_table_name(&reference.name);
        let mut remaining: Vec<&&Object> = targets.iter().collect();

        if !rebind && new_version > 1 {
            let prior_version = new_version - 1;
            let carried = self.adapter.fetch_all(
                &format!("SELECT target_id FROM {table} WHERE origin_id = ?1 AND version = ?2"),
                &[&origin.id as &dyn ToSql, &prior_version as &dyn ToSql],
            )?;
            if !carried.is_empty() {
                let carried_ids: HashSet<i64> = carried
                    .into_iter()
                    .filter_map(|row| row.get("target_id").and_then(|v| v.as_i64()))
                    .collect();
                for target_id in &carried_ids {
                    self.adapter.execute(
                        &format!("INSERT INTO {table} (origin_id, target_id, version) VALUES (?1, ?2, ?3)"),
                        &[&origin.id as &dyn ToSql, target_id as &dyn ToSql, &new_version as &dyn ToSql],
                    )?;
                }
                remaining.retain(|target| !carried_ids.contains(&target.id));
            }
        }

        for target in remaining {
            self.adapter.execute(
                &format!("INSERT INTO {table} (origin_id, target_id, version) VALUES (?1, ?2, ?3)"),
                &[&origin.id as &dyn ToSql, &target.id as &dyn ToSql, &new_version as &dyn ToSql],
            )?;
        }

        tracing::debug!(reference = reference.name, origin = origin.id, new_version, rebind, "bound reference");
        Ok(())
    }

    /// §4.7's `hop`: resolves `version` (the current version when absent,
    /// an empty result when no binding has ever been made), then
    /// materialises the bound target ids, optionally filtering to active
    /// objects only.
    pub fn hop(&self, reference: &Reference, origin_id: i64, version: Option<i64>, active_only: bool) -> Result<Vec<Object>> {
        let version = match version {
            Some(v) => v,
            None => {
                let row = self.adapter.fetch_one(
                    "SELECT current_version FROM structure_reference_version WHERE reference_id = ?1 AND origin_object_id = ?2",
                    &[&reference.id as &dyn ToSql, &origin_id as &dyn ToSql],
                )?;
                match row {
                    Some(row) => row.get("current_version").and_then(|v| v.as_i64()).unwrap_or(0),
                    None => return Ok(Vec::new()),
                }
            }
        };

        let table = naming::reference_table_name(&reference.name);
        let rows = self.adapter.fetch_all(
            &format!("SELECT target_id FROM {table} WHERE origin_id = ?1 AND version = ?2"),
            &[&origin_id as &dyn ToSql, &version as &dyn ToSql],
        )?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let target_id = row.get("target_id").and_then(|v| v.as_i64()).unwrap();
            let object = self.objects.get_object(target_id)?;
            if !active_only || object.status == Status::Active {
                out.push(object);
            }
        }
        Ok(out)
    }

    /// Convenience wrapper over `hop` returning the first target, or
    /// `None` if the hop yields nothing — a single-valued reference's
    /// common access pattern (§2's supplemented convenience ops).
    pub fn hop_first(&self, reference: &Reference, origin_id: i64, version: Option<i64>, active_only: bool) -> Result<Option<Object>> {
        Ok(self.hop(reference, origin_id, version, active_only)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::inheritance::InheritanceEngine;
    use crate::registry::Registry;
    use crate::schema::{Attribute, Class, Datatype};
    use crate::transform::Host;

    struct Fixture {
        adapter: Adapter,
        datatypes: Registry<Datatype>,
        classes: Registry<Class>,
        attributes: Registry<Attribute>,
        references: Registry<Reference>,
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
    fn cardinality_enforcement_rejects_excess_targets() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let objects = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };
        let refs = ReferenceEngine { adapter: &fx.adapter, schema: &schema, objects: &objects };

        let person = schema.create_class("Person", None, false).unwrap();
        let address = schema.create_class("Address", None, false).unwrap();
        let lives_at = schema.create_reference("lives_at", &person, &address, Some(1)).unwrap();

        let origin = objects.touch(&person).unwrap();
        let a1 = objects.touch(&address).unwrap();
        let a2 = objects.touch(&address).unwrap();

        let err = refs.bind(&lives_at, &origin, &[&a1, &a2], false).unwrap_err();
        assert!(matches!(err, Error::CardinalityExceeded(_)));

        refs.bind(&lives_at, &origin, &[&a1], false).unwrap();
        let err = refs.bind(&lives_at, &origin, &[&a2], false).unwrap_err();
        assert!(matches!(err, Error::CardinalityExceeded(_)));
    }

    #[test]
    fn hop_returns_historical_version_on_request() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let objects = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };
        let refs = ReferenceEngine { adapter: &fx.adapter, schema: &schema, objects: &objects };

        let person = schema.create_class("Person", None, false).unwrap();
        let address = schema.create_class("Address", None, false).unwrap();
        let manages = schema.create_reference("manages", &person, &address, None).unwrap();

        let origin = objects.touch(&person).unwrap();
        let mut a1 = objects.touch(&address).unwrap();
        objects.activate(&mut a1).unwrap();
        let mut a2 = objects.touch(&address).unwrap();
        objects.activate(&mut a2).unwrap();

        refs.bind(&manages, &origin, &[&a1], false).unwrap();
        refs.bind(&manages, &origin, &[&a2], false).unwrap();

        let current = refs.hop(&manages, origin.id, None, true).unwrap();
        let current_ids: Vec<i64> = current.iter().map(|o| o.id).collect();
        assert_eq!(current_ids, vec![a1.id, a2.id]);

        let historical = refs.hop(&manages, origin.id, Some(1), true).unwrap();
        let historical_ids: Vec<i64> = historical.iter().map(|o| o.id).collect();
        assert_eq!(historical_ids, vec![a1.id]);
    }

    #[test]
    fn rebind_replaces_rather_than_carries_forward() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let objects = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };
        let refs = ReferenceEngine { adapter: &fx.adapter, schema: &schema, objects: &objects };

        let person = schema.create_class("Person", None, false).unwrap();
        let address = schema.create_class("Address", None, false).unwrap();
        let manages = schema.create_reference("manages", &person, &address, None).unwrap();

        let origin = objects.touch(&person).unwrap();
        let mut a1 = objects.touch(&address).unwrap();
        objects.activate(&mut a1).unwrap();
        let mut a2 = objects.touch(&address).unwrap();
        objects.activate(&mut a2).unwrap();

        refs.bind(&manages, &origin, &[&a1], false).unwrap();
        refs.bind(&manages, &origin, &[&a2], true).unwrap();

        let current = refs.hop(&manages, origin.id, None, true).unwrap();
        let current_ids: Vec<i64> = current.iter().map(|o| o.id).collect();
        assert_eq!(current_ids, vec![a2.id]);
    }

    #[test]
    fn hop_filters_out_inactive_targets() {
        let fx = Fixture::new();
        let schema = fx.schema();
        let objects = ObjectEngine { adapter: &fx.adapter, schema: &schema, host: &fx.host };
        let refs = ReferenceEngine { adapter: &fx.adapter, schema: &schema, objects: &objects };

        let person = schema.create_class("Person", None, false).unwrap();
        let address = schema.create_class("Address", None, false).unwrap();
        let manages = schema.create_reference("manages", &person, &address, None).unwrap();

        let origin = objects.touch(&person).unwrap();
        let a1 = objects.touch(&address).unwrap();

        refs.bind(&manages, &origin, &[&a1], false).unwrap();

        assert!(refs.hop(&manages, origin.id, None, true).unwrap().is_empty());
        assert_eq!(refs.hop(&manages, origin.id, None, false).unwrap().len(), 1);
    }
}
