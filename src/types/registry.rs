//! Type registry for storing and retrieving type definitions

use std::collections::HashMap;
use std::rc::Rc;

use super::schema::TypeDefinition;

/// Name to definition store.
///
/// Registering an existing name replaces the old definition and logs a
/// warning; the last writer wins.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Rc<TypeDefinition>>,
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, returning the one it replaced
    pub fn register(&mut self, def: TypeDefinition) -> Option<Rc<TypeDefinition>> {
        let name = def.name().to_string();
        let previous = self.types.insert(name.clone(), Rc::new(def));
        if previous.is_some() {
            tracing::warn!(type_name = %name, "type already registered, overwriting previous definition");
        } else {
            tracing::debug!(type_name = %name, "registered type");
        }
        previous
    }

    /// Get a definition by name
    pub fn get(&self, name: &str) -> Option<Rc<TypeDefinition>> {
        self.types.get(name).cloned()
    }

    /// Check if a type exists
    pub fn has(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All registered definitions, in no particular order
    pub fn all(&self) -> Vec<Rc<TypeDefinition>> {
        self.types.values().cloned().collect()
    }

    /// Get all type names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|s| s.as_str())
    }

    /// Remove a definition; `false` if the name was not registered
    pub fn remove(&mut self, name: &str) -> bool {
        self.types.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Drop every definition. Meant for test isolation; production code has
    /// no reason to call this.
    pub fn clear(&mut self) {
        self.types.clear();
    }
}
