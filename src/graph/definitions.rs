//! Definition Registry
//!
//! Named definition records (dependency names plus a factory) registered
//! before any resolution happens. Pure storage: nothing here runs a factory.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::FactoryScope;
use crate::error::Result;

/// Dependency token for the synchronous module lookup capability
pub const REQUIRE: &str = "require";

/// Dependency token for the defining module's own exports container
pub const EXPORTS: &str = "exports";

/// Populates exports in place. The resolver ignores everything but errors.
pub type Factory = Rc<dyn Fn(&mut FactoryScope<'_>) -> Result<()>>;

/// A named unit declaring its dependencies and a populate-on-demand factory
#[derive(Clone)]
pub struct DefinitionRecord {
    pub name: String,
    pub dependencies: Vec<String>,
    pub factory: Factory,
}

impl DefinitionRecord {
    pub fn new<F>(name: impl Into<String>, dependencies: Vec<String>, factory: F) -> Self
    where
        F: Fn(&mut FactoryScope<'_>) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            dependencies,
            factory: Rc::new(factory),
        }
    }
}

impl fmt::Debug for DefinitionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionRecord")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Registry of definition records, keyed by name, in registration order
#[derive(Debug, Default, Clone)]
pub struct DefinitionRegistry {
    records: IndexMap<String, DefinitionRecord>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. A later definition with the same name replaces
    /// the earlier one.
    pub fn define<F>(&mut self, name: &str, dependencies: &[&str], factory: F)
    where
        F: Fn(&mut FactoryScope<'_>) -> Result<()> + 'static,
    {
        let dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self.insert(DefinitionRecord::new(name, dependencies, factory));
    }

    pub fn insert(&mut self, record: DefinitionRecord) {
        if self.records.contains_key(&record.name) {
            tracing::warn!(module = %record.name, "duplicate definition replaces earlier record");
        }
        self.records.insert(record.name.clone(), record);
    }

    pub fn get(&self, name: &str) -> Option<&DefinitionRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> impl Iterator<Item = DefinitionRecord> {
        self.records.into_values()
    }
}

impl Extend<DefinitionRecord> for DefinitionRegistry {
    fn extend<T: IntoIterator<Item = DefinitionRecord>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let mut defs = DefinitionRegistry::new();
        defs.define("a", &[REQUIRE, EXPORTS, "b"], |_| Ok(()));

        let record = defs.get("a").unwrap();
        assert_eq!(record.dependencies, vec!["require", "exports", "b"]);
        assert!(!defs.contains("b"));
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn test_redefinition_replaces_in_place() {
        let mut defs = DefinitionRegistry::new();
        defs.define("a", &[], |_| Ok(()));
        defs.define("b", &[], |_| Ok(()));
        defs.define("a", &["b"], |_| Ok(()));

        assert_eq!(defs.len(), 2);
        assert_eq!(defs.get("a").unwrap().dependencies, vec!["b"]);
        assert_eq!(defs.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
