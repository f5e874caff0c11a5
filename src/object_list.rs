// src/object_list.rs

//! `ObjectList` (§4.9): a read-only container of object handles with a
//! cached tabular snapshot, reference-hopping, and predicate-based
//! sub-selection. Methods that need schema or storage access take `&Store`
//! explicitly rather than holding a borrow of it, so an `ObjectList` itself
//! stays a plain, freely clonable value.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::object::Object;
use crate::schema::Key;
use crate::store::Store;
use crate::value::Value;

/// One row of a table snapshot: every attribute present on at least one
/// contained object, `id` always present.
pub type TableRow = HashMap<String, Value>;

#[derive(Default)]
pub struct ObjectList {
    objects: Vec<Object>,
    table_cache: RefCell<Option<Vec<TableRow>>>,
}

impl ObjectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_objects(objects: Vec<Object>) -> Self {
        Self { objects, table_cache: RefCell::new(None) }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    pub fn append(&mut self, object: Object) {
        self.objects.push(object);
        self.table_cache.borrow_mut().take();
    }

    pub fn extend(&mut self, objects: impl IntoIterator<Item = Object>) {
        self.objects.extend(objects);
        self.table_cache.borrow_mut().take();
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.table_cache.borrow_mut().take();
    }

    /// Materialises one row per object with every attribute resolved to its
    /// processed value, caching the result until the next mutation.
    pub fn to_table(&self, store: &Store) -> Result<Vec<TableRow>> {
        if let Some(cached) = self.table_cache.borrow().as_ref() {
            return Ok(cached.clone());
        }

        let mut rows = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let mut row = TableRow::new();
            row.insert("id".to_string(), Value::Integer(object.id));
            for name in object.attribute_names() {
                row.insert(name.clone(), store.get_value(object, &name)?);
            }
            rows.push(row);
        }

        *self.table_cache.borrow_mut() = Some(rows.clone());
        Ok(rows)
    }

    /// `column(name)` — the `(id, value)` pairs for `name` across every
    /// contained object, in source order.
    pub fn column(&self, store: &Store, name: &str) -> Result<Vec<(i64, Value)>> {
        self.objects.iter().map(|o| Ok((o.id, store.get_value(o, name)?))).collect()
    }

    /// Hops `reference` across every contained object and deduplicates the
    /// aggregate target set by id, first-seen order (§4.7's `hop` combined
    /// with §4.9's aggregation rule).
    pub fn hop<'k>(&self, store: &Store, reference: impl Into<Key<'k>>, active_only: bool) -> Result<ObjectList> {
        let reference = store.get_reference(reference)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for object in &self.objects {
            for target in store.hop(&reference, object.id, None, active_only)? {
                if seen.insert(target.id) {
                    out.push(target);
                }
            }
        }
        Ok(ObjectList::from_objects(out))
    }

    /// Returns a new list containing exactly the source objects whose id
    /// satisfies `predicate`.
    pub fn filter(&self, mut predicate: impl FnMut(&Object) -> bool) -> ObjectList {
        ObjectList::from_objects(self.objects.iter().filter(|o| predicate(o)).cloned().collect())
    }

    /// A fixed-width ASCII rendering of `to_table()`, columns in
    /// first-object-seen order, used by the CLI's `dump` subcommand.
    pub fn render_table(&self, store: &Store) -> Result<String> {
        let rows = self.to_table(store)?;
        if rows.is_empty() {
            return Ok(String::new());
        }

        let mut columns = vec!["id".to_string()];
        for row in &rows {
            for key in row.keys() {
                if key != "id" && !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let cell = |row: &TableRow, col: &str| -> String {
            row.get(col).map(|v| format!("{v:?}")).unwrap_or_else(|| "NULL".to_string())
        };

        let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
        for row in &rows {
            for (i, col) in columns.iter().enumerate() {
                widths[i] = widths[i].max(cell(row, col).len());
            }
        }

        let mut out = String::new();
        for (i, col) in columns.iter().enumerate() {
            out.push_str(&format!("{:width$}  ", col, width = widths[i]));
        }
        out.push('\n');
        for row in &rows {
            for (i, col) in columns.iter().enumerate() {
                out.push_str(&format!("{:width$}  ", cell(row, col), width = widths[i]));
            }
            out.push('\n');
        }
        Ok(out)
    }
}

impl FromIterator<Object> for ObjectList {
    fn from_iter<I: IntoIterator<Item = Object>>(iter: I) -> Self {
        ObjectList::from_objects(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use std::collections::HashMap as Map;

    #[test]
    fn hop_dedupes_targets_first_seen_order() {
        let store = Store::open_in_memory().unwrap();
        let int = store.create_datatype("int", None, None, Some("INTEGER".into()), None).unwrap();
        let _ = &int;
        let person = store.create_class("Person", None, false).unwrap();
        let address = store.create_class("Address", None, false).unwrap();
        store.create_reference("lives_at", &person, &address, None).unwrap();

        let a1 = store.touch(&address).unwrap();
        let mut p1 = store.touch(&person).unwrap();
        store.activate(&mut p1).unwrap();
        let mut p2 = store.touch(&person).unwrap();
        store.activate(&mut p2).unwrap();

        store.bind("lives_at", &p1, &[&a1], false).unwrap();
        store.bind("lives_at", &p2, &[&a1], false).unwrap();

        let list = ObjectList::from_objects(vec![p1, p2]);
        let hopped = list.hop(&store, "lives_at", false).unwrap();
        assert_eq!(hopped.len(), 1);
    }

    #[test]
    fn to_table_is_cached_until_mutated() {
        let store = Store::open_in_memory().unwrap();
        let text = store.create_datatype("text", None, None, Some("TEXT".into()), None).unwrap();
        let person = store.create_class("Person", None, false).unwrap();
        let first_name = store.create_attribute("first_name", &text).unwrap();
        store.assign(&person, &first_name, false, None, None).unwrap();

        let mut attrs = Map::new();
        attrs.insert("first_name".to_string(), Value::Text("A".to_string()));
        let object = store.create_object(&person, attrs).unwrap();

        let mut list = ObjectList::new();
        list.append(object);

        let table = list.to_table(&store).unwrap();
        assert_eq!(table.len(), 1);

        list.clear();
        let table = list.to_table(&store).unwrap();
        assert!(table.is_empty());
    }
}
