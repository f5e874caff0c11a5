// src/inheritance.rs

//! The Inheritance Engine: family-tree walks and attribute-assignment
//! resolution shared by the Schema Manager and the Object Engine. Every
//! method here is read-only with respect to the database; the memoized
//! results are cleared alongside everything else by `Store::clear_cache`.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::db::adapter::Adapter;
use crate::error::Result;
use crate::schema::assignment::AttributeAssignment;
use crate::schema::class::Class;
use crate::schema::datatype::Datatype;

#[derive(Default)]
pub struct InheritanceEngine {
    family_tree_cache: RefCell<HashMap<i64, Vec<Class>>>,
    children_cache: RefCell<HashMap<i64, Vec<Class>>>,
    assignment_cache: RefCell<HashMap<(i64, i64), Option<(Class, AttributeAssignment)>>>,
    datatype_chain_cache: RefCell<HashMap<i64, Vec<Datatype>>>,
}

impl InheritanceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ancestor chain of `class`, root first, `class` itself last.
    pub fn family_tree(&self, adapter: &Adapter, class: &Class) -> Result<Vec<Class>> {
        if let Some(cached) = self.family_tree_cache.borrow().get(&class.id) {
            return Ok(cached.clone());
        }

        let mut chain = vec![class.clone()];
        let mut current = class.clone();
        while let Some(parent_id) = current.parent_id {
            let parent = Class::find_by_id(adapter, parent_id)?
                .ok_or_else(|| Class::not_found(&parent_id.to_string()))?;
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();

        self.family_tree_cache.borrow_mut().insert(class.id, chain.clone());
        Ok(chain)
    }

    /// Direct children of `class_id` (one level, not the full descendant set).
    pub fn children(&self, adapter: &Adapter, class_id: i64) -> Result<Vec<Class>> {
        if let Some(cached) = self.children_cache.borrow().get(&class_id) {
            return Ok(cached.clone());
        }
        let children = Class::find_children(adapter, class_id)?;
        self.children_cache.borrow_mut().insert(class_id, children.clone());
        Ok(children)
    }

    /// Every class reachable below `class_id`, breadth-first, not including
    /// `class_id` itself.
    pub fn descendants(&self, adapter: &Adapter, class_id: i64) -> Result<Vec<Class>> {
        let mut out = Vec::new();
        let mut frontier = vec![class_id];
        while let Some(id) = frontier.pop() {
            for child in self.children(adapter, id)? {
                frontier.push(child.id);
                out.push(child);
            }
        }
        Ok(out)
    }

    /// The attribute assignment governing `attribute_id` as seen from
    /// `class`: walks from `class` up towards the root and returns the
    /// first assignment found, together with the class it was declared on.
    /// A descendant's own assignment always wins over one inherited from an
    /// ancestor because the walk starts at the most specific class.
    pub fn assignment_for(
        &self,
        adapter: &Adapter,
        class: &Class,
        attribute_id: i64,
    ) -> Result<Option<(Class, AttributeAssignment)>> {
        let key = (class.id, attribute_id);
        if let Some(cached) = self.assignment_cache.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let tree = self.family_tree(adapter, class)?;
        let mut found = None;
        for ancestor in tree.into_iter().rev() {
            if let Some(assignment) = AttributeAssignment::find(adapter, ancestor.id, attribute_id)? {
                found = Some((ancestor, assignment));
                break;
            }
        }

        self.assignment_cache.borrow_mut().insert(key, found.clone());
        Ok(found)
    }

    /// Every attribute assignment visible on `class`, ancestor assignments
    /// included, with descendant assignments shadowing ancestor ones of the
    /// same attribute.
    pub fn all_assignments(
        &self,
        adapter: &Adapter,
        class: &Class,
    ) -> Result<Vec<(Class, AttributeAssignment)>> {
        let tree = self.family_tree(adapter, class)?;
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for ancestor in tree.into_iter().rev() {
            for assignment in AttributeAssignment::find_for_class(adapter, ancestor.id)? {
                if seen.insert(assignment.attribute_id) {
                    out.push((ancestor.clone(), assignment));
                }
            }
        }
        Ok(out)
    }

    /// The datatype's own chain, root first, `datatype` itself last.
    pub fn datatype_chain(&self, adapter: &Adapter, datatype: &Datatype) -> Result<Vec<Datatype>> {
        if let Some(cached) = self.datatype_chain_cache.borrow().get(&datatype.id) {
            return Ok(cached.clone());
        }

        let mut chain = vec![datatype.clone()];
        let mut current = datatype.clone();
        while let Some(parent_id) = current.parent_id {
            let parent = Datatype::find_by_id(adapter, parent_id)?
                .ok_or_else(|| Datatype::not_found(&parent_id.to_string()))?;
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();

        self.datatype_chain_cache.borrow_mut().insert(datatype.id, chain.clone());
        Ok(chain)
    }

    /// The generator inherited from the root of `datatype`'s chain. Every
    /// chain has exactly one generator, held by its root.
    pub fn effective_generator(&self, adapter: &Adapter, datatype: &Datatype) -> Result<String> {
        let chain = self.datatype_chain(adapter, datatype)?;
        chain
            .first()
            .and_then(|root| root.generator.clone())
            .ok_or_else(|| Datatype::not_found(&datatype.name))
    }

    pub fn clear(&self) {
        self.family_tree_cache.borrow_mut().clear();
        self.children_cache.borrow_mut().clear();
        self.assignment_cache.borrow_mut().clear();
        self.datatype_chain_cache.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::schema::class::Class;

    fn make_class(adapter: &Adapter, name: &str, parent_id: Option<i64>) -> Class {
        let mut record = Class { id: 0, name: name.to_string(), parent_id, traced: false };
        record.id = Class::insert(adapter, &record).unwrap();
        record
    }

    #[test]
    fn family_tree_is_root_first() {
        let adapter = db::open_in_memory().unwrap();
        let root = make_class(&adapter, "Root", None);
        let mid = make_class(&adapter, "Mid", Some(root.id));
        let leaf = make_class(&adapter, "Leaf", Some(mid.id));

        let engine = InheritanceEngine::new();
        let tree = engine.family_tree(&adapter, &leaf).unwrap();
        let names: Vec<&str> = tree.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Mid", "Leaf"]);
    }

    #[test]
    fn assignment_for_prefers_descendant_over_ancestor() {
        let adapter = db::open_in_memory().unwrap();
        let root = make_class(&adapter, "Root", None);
        let leaf = make_class(&adapter, "Leaf", Some(root.id));

        let dt = Datatype { id: 0, name: "text".into(), generator: Some("builtin.text".into()), parent_id: None, read_transformer_source: None, write_transformer_source: None };
        let dt_id = Datatype::insert(&adapter, &dt).unwrap();
        let attr = crate::schema::attribute::Attribute { id: 0, name: "title".into(), datatype_id: dt_id };
        let attr_id = crate::schema::attribute::Attribute::insert(&adapter, &attr).unwrap();

        AttributeAssignment::insert(&adapter, &AttributeAssignment {
            class_id: root.id, attribute_id: attr_id, indexed: false,
            read_transformer_source: None, write_transformer_source: None,
        }).unwrap();
        AttributeAssignment::insert(&adapter, &AttributeAssignment {
            class_id: leaf.id, attribute_id: attr_id, indexed: true,
            read_transformer_source: None, write_transformer_source: None,
        }).unwrap();

        let engine = InheritanceEngine::new();
        let (owner, assignment) = engine.assignment_for(&adapter, &leaf, attr_id).unwrap().unwrap();
        assert_eq!(owner.name, "Leaf");
        assert!(assignment.indexed);
    }
}
