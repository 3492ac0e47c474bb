//! Module Graph
//!
//! Resolves named definition records into module entries whose exports
//! containers are populated by the records' factories.
//!
//! A module entry is created and registered *before* its dependencies are
//! resolved. A dependency that leads back to a module still being resolved
//! receives that module's (possibly still empty) exports handle instead of
//! recursing, which is what makes mutually dependent definitions resolvable.
//! Exports live in an arena and are addressed by [`ModuleId`], so every
//! dependent observes the same container once its factory has filled it.

pub mod definitions;
pub mod loader;

pub use definitions::{DefinitionRecord, DefinitionRegistry, Factory, EXPORTS, REQUIRE};
pub use loader::{load_bundle, BundleFile, DefinitionSpec};

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::algo::kosaraju_scc;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::descriptor::{DescriptorPool, EnumId, ExportPath, Link, MessageId, ServiceId};
use crate::error::{ReconError, Result};

/// Localization capability pre-seeded so definitions depending on it resolve
pub const NLS_MODULE: &str = "vs/nls";

/// Localized-languages capability pre-seeded alongside [`NLS_MODULE`]
pub const NLS_LANGUAGES_MODULE: &str = "vs/nls!vs/editor/common/languages";

/// Handle to a module entry in a [`ModuleGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

impl ModuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Host function exported by a pre-seeded capability
pub type NativeFn = fn(&[serde_json::Value]);

/// A value stored in a module's exports
#[derive(Debug, Clone)]
pub enum ExportValue {
    Message(MessageId),
    Enum(EnumId),
    Service(ServiceId),
    /// Another module's exports, re-exported
    Module(ModuleId),
    Native(NativeFn),
    Data(serde_json::Value),
}

impl ExportValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ExportValue::Message(_) => "message",
            ExportValue::Enum(_) => "enum",
            ExportValue::Service(_) => "service",
            ExportValue::Module(_) => "module",
            ExportValue::Native(_) => "function",
            ExportValue::Data(_) => "data",
        }
    }
}

/// Insertion-ordered exports container
pub type Exports = IndexMap<String, ExportValue>;

/// A lazily created module and its identity-stable exports
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub name: String,
    pub exports: Exports,
}

/// Argument handed to a factory, one per declared dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    /// Synchronous lookup capability, see [`FactoryScope::require`]
    Require,
    /// The defining module's own exports
    Exports(ModuleId),
    /// A resolved dependency's exports
    Module(ModuleId),
}

#[derive(Debug, Default)]
struct ModuleTable {
    entries: Vec<ModuleEntry>,
    by_name: HashMap<String, ModuleId>,
}

impl ModuleTable {
    fn insert(&mut self, name: &str, exports: Exports) -> ModuleId {
        let id = ModuleId(self.entries.len());
        self.entries.push(ModuleEntry {
            name: name.to_string(),
            exports,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }
}

// =============================================================================
// Factory scope
// =============================================================================

/// Everything a factory may touch while it runs
pub struct FactoryScope<'a> {
    module: ModuleId,
    args: &'a [Argument],
    table: &'a mut ModuleTable,
    pool: &'a mut DescriptorPool,
}

impl<'a> FactoryScope<'a> {
    /// The module this factory is populating
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn name(&self) -> &str {
        &self.table.entries[self.module.0].name
    }

    /// Resolved arguments, in declared dependency order
    pub fn args(&self) -> &[Argument] {
        self.args
    }

    pub fn arg(&self, index: usize) -> Option<Argument> {
        self.args.get(index).copied()
    }

    pub fn exports(&self, id: ModuleId) -> &Exports {
        &self.table.entries[id.0].exports
    }

    /// Mutable access to any module's exports; factories may mutate the
    /// containers they were handed, not just their own.
    pub fn exports_mut(&mut self, id: ModuleId) -> &mut Exports {
        &mut self.table.entries[id.0].exports
    }

    pub fn own_exports_mut(&mut self) -> &mut Exports {
        let id = self.module;
        self.exports_mut(id)
    }

    /// Look up any registered module entry by name
    pub fn require(&self, name: &str) -> Option<&ModuleEntry> {
        self.lookup(name).map(|id| &self.table.entries[id.0])
    }

    pub fn lookup(&self, name: &str) -> Option<ModuleId> {
        self.table.by_name.get(name).copied()
    }

    pub fn pool(&self) -> &DescriptorPool {
        &*self.pool
    }

    pub fn pool_mut(&mut self) -> &mut DescriptorPool {
        &mut *self.pool
    }

    /// Build a factory error for this module
    pub fn fail(&self, message: impl Into<String>) -> ReconError {
        ReconError::Factory {
            module: self.name().to_string(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Module graph
// =============================================================================

/// Definition registry, module registry and descriptor pool of one run
#[derive(Debug)]
pub struct ModuleGraph {
    definitions: DefinitionRegistry,
    table: ModuleTable,
    pool: DescriptorPool,
    deps: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
    undefined: Vec<String>,
}

impl ModuleGraph {
    pub fn new(definitions: DefinitionRegistry) -> Self {
        let mut graph = Self {
            definitions,
            table: ModuleTable::default(),
            pool: DescriptorPool::new(),
            deps: DiGraph::new(),
            nodes: HashMap::new(),
            undefined: Vec::new(),
        };
        graph.seed(NLS_MODULE, "create", nls_create);
        graph.seed(NLS_LANGUAGES_MODULE, "localized", nls_localized);
        graph
    }

    fn seed(&mut self, name: &str, export: &str, f: NativeFn) {
        let mut exports = Exports::new();
        exports.insert(export.to_string(), ExportValue::Native(f));
        self.table.insert(name, exports);
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    /// Register another definition; only affects names not yet resolved
    pub fn define(&mut self, record: DefinitionRecord) {
        self.definitions.insert(record);
    }

    /// Resolve `name`, running its factory (and its dependencies') at most once.
    pub fn resolve(&mut self, name: &str) -> Result<ModuleId> {
        if let Some(id) = self.get(name) {
            return Ok(id);
        }

        // Registered before recursing: cycles back to `name` see this entry.
        let id = self.table.insert(name, Exports::new());
        let from = self.node(name);

        let Some(record) = self.definitions.get(name).cloned() else {
            tracing::debug!(module = name, "no definition, exports left empty");
            self.undefined.push(name.to_string());
            return Ok(id);
        };

        let mut args = Vec::with_capacity(record.dependencies.len());
        for dep in &record.dependencies {
            let arg = match dep.as_str() {
                REQUIRE => Argument::Require,
                EXPORTS => Argument::Exports(id),
                _ => {
                    let dep_id = self.resolve(dep)?;
                    let to = self.node(dep);
                    self.deps.update_edge(from, to, ());
                    Argument::Module(dep_id)
                }
            };
            args.push(arg);
        }

        let mut scope = FactoryScope {
            module: id,
            args: &args,
            table: &mut self.table,
            pool: &mut self.pool,
        };
        (record.factory)(&mut scope)?;

        tracing::debug!(
            module = name,
            exports = self.table.entries[id.0].exports.len(),
            "resolved module"
        );
        Ok(id)
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.deps.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }

    pub fn get(&self, name: &str) -> Option<ModuleId> {
        self.table.by_name.get(name).copied()
    }

    pub fn entry(&self, id: ModuleId) -> &ModuleEntry {
        &self.table.entries[id.0]
    }

    pub fn exports(&self, id: ModuleId) -> &Exports {
        &self.entry(id).exports
    }

    /// Synchronous lookup of a registered entry by name
    pub fn require(&self, name: &str) -> Option<&ModuleEntry> {
        self.get(name).map(|id| self.entry(id))
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut DescriptorPool {
        &mut self.pool
    }

    pub fn module_count(&self) -> usize {
        self.table.entries.len()
    }

    /// Names that were resolved with no definition record behind them
    pub fn undefined(&self) -> &[String] {
        &self.undefined
    }

    /// Service descriptors exported directly by a module
    pub fn services_in(&self, id: ModuleId) -> Vec<ServiceId> {
        self.exports(id)
            .values()
            .filter_map(|v| match v {
                ExportValue::Service(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn lookup_export(&self, path: &ExportPath) -> Result<&ExportValue> {
        let missing = || ReconError::MissingExport {
            module: path.module.clone(),
            key: path.key.clone(),
        };
        let id = self.get(&path.module).ok_or_else(missing)?;
        self.exports(id).get(&path.key).ok_or_else(missing)
    }

    pub fn resolve_message(&self, link: &Link<MessageId>) -> Result<MessageId> {
        match link {
            Link::Resolved(id) => Ok(*id),
            Link::Export(path) => match self.lookup_export(path)? {
                ExportValue::Message(id) => Ok(*id),
                _ => Err(ReconError::ExportKind {
                    module: path.module.clone(),
                    key: path.key.clone(),
                    expected: "message",
                }),
            },
        }
    }

    pub fn resolve_enum(&self, link: &Link<EnumId>) -> Result<EnumId> {
        match link {
            Link::Resolved(id) => Ok(*id),
            Link::Export(path) => match self.lookup_export(path)? {
                ExportValue::Enum(id) => Ok(*id),
                _ => Err(ReconError::ExportKind {
                    module: path.module.clone(),
                    key: path.key.clone(),
                    expected: "enum",
                }),
            },
        }
    }

    /// Groups of mutually dependent modules observed during resolution
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = kosaraju_scc(&self.deps)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.deps.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .into_iter()
                    .map(|idx| self.deps[idx].clone())
                    .collect();
                names.sort();
                names
            })
            .collect();
        groups.sort();
        groups
    }

    /// Graphviz rendering of the resolved dependency edges
    pub fn to_dot(&self) -> String {
        format!("{:?}", Dot::with_config(&self.deps, &[Config::EdgeNoLabel]))
    }

    pub fn edge_count(&self) -> usize {
        self.deps.edge_count()
    }
}

fn nls_create(args: &[serde_json::Value]) {
    tracing::debug!(?args, "nls create");
}

fn nls_localized(args: &[serde_json::Value]) {
    tracing::debug!(?args, "nls localized");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::rc::Rc;

    fn data(v: i64) -> ExportValue {
        ExportValue::Data(serde_json::json!(v))
    }

    #[test]
    fn test_resolve_runs_factory_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut defs = DefinitionRegistry::new();
        defs.define("a", &[EXPORTS], move |scope| {
            counter.set(counter.get() + 1);
            scope.own_exports_mut().insert("x".into(), data(1));
            Ok(())
        });

        let mut graph = ModuleGraph::new(defs);
        let first = graph.resolve("a").unwrap();
        let second = graph.resolve("a").unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert!(graph.exports(first).contains_key("x"));
    }

    #[test]
    fn test_mutual_dependencies_resolve() {
        let mut defs = DefinitionRegistry::new();
        defs.define("a", &[EXPORTS, "b"], |scope| {
            let Some(Argument::Module(b)) = scope.arg(1) else {
                return Err(scope.fail("expected b"));
            };
            scope.own_exports_mut().insert("a".into(), data(1));
            scope.own_exports_mut().insert("peer".into(), ExportValue::Module(b));
            Ok(())
        });
        defs.define("b", &[EXPORTS, "a"], |scope| {
            let Some(Argument::Module(a)) = scope.arg(1) else {
                return Err(scope.fail("expected a"));
            };
            // a's factory has not run yet
            assert!(scope.exports(a).is_empty());
            scope.own_exports_mut().insert("b".into(), data(2));
            scope.own_exports_mut().insert("peer".into(), ExportValue::Module(a));
            Ok(())
        });

        let mut graph = ModuleGraph::new(defs);
        let a = graph.resolve("a").unwrap();
        let b = graph.get("b").unwrap();

        let ExportValue::Module(seen_by_b) = graph.exports(b)["peer"] else {
            panic!("b should hold a handle to a");
        };
        assert_eq!(seen_by_b, a);
        assert!(graph.exports(seen_by_b).contains_key("a"));
        assert!(graph.exports(a).contains_key("peer"));
        assert_eq!(graph.cycles(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn test_reserved_tokens() {
        let mut defs = DefinitionRegistry::new();
        defs.define("dep", &[EXPORTS], |scope| {
            scope.own_exports_mut().insert("v".into(), data(7));
            Ok(())
        });
        defs.define("main", &[REQUIRE, EXPORTS, "dep"], |scope| {
            assert_eq!(scope.arg(0), Some(Argument::Require));
            assert_eq!(scope.arg(1), Some(Argument::Exports(scope.module())));
            let dep = scope.require("dep").map(|m| m.exports.len());
            assert_eq!(dep, Some(1));
            Ok(())
        });

        let mut graph = ModuleGraph::new(defs);
        graph.resolve("main").unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.to_dot().contains("main"));
    }

    #[test]
    fn test_missing_definition_yields_empty_exports() {
        let mut defs = DefinitionRegistry::new();
        defs.define("main", &["vs/base/missing", NLS_MODULE], |_| Ok(()));

        let mut graph = ModuleGraph::new(defs);
        graph.resolve("main").unwrap();

        let missing = graph.get("vs/base/missing").unwrap();
        assert!(graph.exports(missing).is_empty());
        assert_eq!(graph.undefined(), &["vs/base/missing".to_string()]);

        let nls = graph.require(NLS_MODULE).unwrap();
        assert!(matches!(nls.exports["create"], ExportValue::Native(_)));

        let lone = graph.resolve("never/defined").unwrap();
        assert!(graph.exports(lone).is_empty());
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut defs = DefinitionRegistry::new();
        defs.define("bad", &[], |scope| Err(scope.fail("boom")));

        let mut graph = ModuleGraph::new(defs);
        let err = graph.resolve("bad").unwrap_err();
        assert!(matches!(err, ReconError::Factory { ref module, .. } if module == "bad"));
    }

    #[test]
    fn test_resolve_export_links() {
        let mut defs = DefinitionRegistry::new();
        defs.define("types", &[EXPORTS], |scope| {
            let id = scope.pool_mut().add_message("pkg.v1.Thing");
            scope.own_exports_mut().insert("Thing".into(), ExportValue::Message(id));
            Ok(())
        });

        let mut graph = ModuleGraph::new(defs);
        graph.resolve("types").unwrap();

        let link = Link::Export(ExportPath::new("types", "Thing"));
        let id = graph.resolve_message(&link).unwrap();
        assert_eq!(graph.pool().message(id).type_name, "pkg.v1.Thing");

        let missing = Link::Export(ExportPath::new("types", "Other"));
        assert!(matches!(
            graph.resolve_message(&missing),
            Err(ReconError::MissingExport { .. })
        ));

        let wrong_kind = Link::Export(ExportPath::new("types", "Thing"));
        assert!(matches!(
            graph.resolve_enum(&wrong_kind),
            Err(ReconError::ExportKind { expected: "enum", .. })
        ));
    }
}
