//! Enum, Type and Service Registries
//!
//! Deduplicating, order-preserving registries keyed by fully-qualified
//! descriptor name. Registration walks message fields depth-first, so the
//! order of entries (and therefore of the document) follows the order of
//! methods and fields in the input descriptors.
//!
//! Entries are created for every type seen, top-level or nested. Only
//! global entries become top-level blocks; nested ones are inlined into the
//! preamble of each type that references them, once per referencing type.
//! Message blocks are rendered when the document is assembled, so a type
//! referenced while it is still being walked is inlined like any other.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use super::names;
use super::proto::{self, EnumNumbering};
use super::scalar::scalar_name;
use crate::descriptor::{EnumDescriptor, EnumId, FieldKind, MessageId, MethodKind, ServiceId};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::graph::ModuleGraph;

/// Identity of an enum registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumEntryId(usize);

/// Identity of a type registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeEntryId(usize);

// =============================================================================
// Enum Registry
// =============================================================================

#[derive(Debug, Clone)]
pub struct EnumEntry {
    pub qualified_name: String,
    pub local_name: String,
    pub global: bool,
    pub lines: Vec<String>,
}

#[derive(Debug, Default)]
pub struct EnumRegistry {
    entries: Vec<EnumEntry>,
    by_name: HashMap<String, EnumEntryId>,
}

impl EnumRegistry {
    /// Register an enum; a name seen before returns the existing entry
    pub fn register(
        &mut self,
        prefix: &str,
        desc: &EnumDescriptor,
        global: bool,
        numbering: EnumNumbering,
    ) -> EnumEntryId {
        if let Some(id) = self.find(&desc.type_name) {
            return id;
        }

        let local_name = names::local_name(prefix, &desc.type_name);
        let lines = proto::enum_block(&local_name, &desc.type_name, &desc.values, numbering);
        let id = EnumEntryId(self.entries.len());
        self.entries.push(EnumEntry {
            qualified_name: desc.type_name.clone(),
            local_name,
            global,
            lines,
        });
        self.by_name.insert(desc.type_name.clone(), id);
        id
    }

    pub fn find(&self, qualified_name: &str) -> Option<EnumEntryId> {
        self.by_name.get(qualified_name).copied()
    }

    pub fn get(&self, id: EnumEntryId) -> &EnumEntry {
        &self.entries[id.0]
    }

    /// Top-level entries in registration order
    pub fn globals(&self) -> impl Iterator<Item = &EnumEntry> {
        self.entries.iter().filter(|e| e.global)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
    }
}

// =============================================================================
// Type Registry
// =============================================================================

/// A nested definition inlined into the preamble of a message block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Local {
    Enum(EnumEntryId),
    Type(TypeEntryId),
}

#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub qualified_name: String,
    pub local_name: String,
    pub global: bool,
    /// Rendered field lines, without indentation
    pub fields: Vec<String>,
    /// Nested definitions inlined into this entry's block, in field order
    pub locals: IndexSet<Local>,
    /// False while the entry's own fields are still being walked
    pub complete: bool,
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_name: HashMap<String, TypeEntryId>,
}

impl TypeRegistry {
    fn insert_pending(
        &mut self,
        qualified_name: &str,
        local_name: &str,
        global: bool,
    ) -> TypeEntryId {
        let id = TypeEntryId(self.entries.len());
        self.entries.push(TypeEntry {
            qualified_name: qualified_name.to_string(),
            local_name: local_name.to_string(),
            global,
            fields: Vec::new(),
            locals: IndexSet::new(),
            complete: false,
        });
        self.by_name.insert(qualified_name.to_string(), id);
        id
    }

    fn complete(&mut self, id: TypeEntryId, fields: Vec<String>, locals: IndexSet<Local>) {
        let entry = &mut self.entries[id.0];
        entry.fields = fields;
        entry.locals = locals;
        entry.complete = true;
    }

    /// Make a nested entry a top-level block as well
    fn promote(&mut self, id: TypeEntryId) {
        self.entries[id.0].global = true;
    }

    pub fn find(&self, qualified_name: &str) -> Option<TypeEntryId> {
        self.by_name.get(qualified_name).copied()
    }

    pub fn get(&self, id: TypeEntryId) -> &TypeEntry {
        &self.entries[id.0]
    }

    /// Ids of top-level entries in registration order
    pub fn global_ids(&self) -> impl Iterator<Item = TypeEntryId> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.global)
            .map(|(i, _)| TypeEntryId(i))
    }

    pub fn globals(&self) -> impl Iterator<Item = &TypeEntry> {
        self.entries.iter().filter(|e| e.global)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
    }
}

// =============================================================================
// Service Registry
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub qualified_name: String,
    pub package: String,
    pub name: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    entries: IndexMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    pub fn contains(&self, qualified_name: &str) -> bool {
        self.entries.contains_key(qualified_name)
    }

    pub fn get(&self, qualified_name: &str) -> Option<&ServiceEntry> {
        self.entries.get(qualified_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, entry: ServiceEntry) {
        self.entries.insert(entry.qualified_name.clone(), entry);
    }
}

// =============================================================================
// Registries
// =============================================================================

/// The emission-side registries of one generation run
#[derive(Debug, Default)]
pub struct Registries {
    pub enums: EnumRegistry,
    pub types: TypeRegistry,
    pub services: ServiceRegistry,
    pub diagnostics: Diagnostics,
    pub numbering: EnumNumbering,
}

impl Registries {
    /// Register an enum descriptor
    pub fn register_enum(
        &mut self,
        modules: &ModuleGraph,
        prefix: &str,
        id: EnumId,
        global: bool,
    ) -> EnumEntryId {
        let desc = modules.pool().enum_descriptor(id);
        self.enums.register(prefix, desc, global, self.numbering)
    }

    /// Register a message descriptor and, depth-first, everything its fields
    /// reference. Returns the existing entry for a name seen before.
    pub fn register_type(
        &mut self,
        modules: &ModuleGraph,
        prefix: &str,
        id: MessageId,
        global: bool,
    ) -> Result<TypeEntryId> {
        let desc = modules.pool().message(id);
        if let Some(existing) = self.types.find(&desc.type_name) {
            return Ok(existing);
        }

        let local = names::local_name(prefix, &desc.type_name);
        let entry_id = self.types.insert_pending(&desc.type_name, &local, global);
        tracing::debug!(type_name = %desc.type_name, global, "registering message");

        let mut locals = IndexSet::new();
        let mut fields = Vec::with_capacity(desc.fields.len());

        for field in &desc.fields {
            let field_type = match &field.kind {
                FieldKind::Message(link) => {
                    let target = modules.resolve_message(link)?;
                    let target_name = &modules.pool().message(target).type_name;
                    if *target_name == desc.type_name {
                        local.clone()
                    } else {
                        let nested = names::is_nested(prefix, target_name);
                        let child = self.register_type(modules, prefix, target, !nested)?;
                        // pending children are inlined too; blocks render lazily
                        if !self.types.get(child).global {
                            locals.insert(Local::Type(child));
                        }
                        self.types.get(child).local_name.clone()
                    }
                }
                FieldKind::Enum(link) => {
                    let target = modules.resolve_enum(link)?;
                    let target_name = &modules.pool().enum_descriptor(target).type_name;
                    let nested = names::is_nested(prefix, target_name);
                    let entry = self.register_enum(modules, prefix, target, !nested);
                    if !self.enums.get(entry).global {
                        locals.insert(Local::Enum(entry));
                    }
                    self.enums.get(entry).local_name.clone()
                }
                FieldKind::Scalar(code) => match scalar_name(*code) {
                    Ok(name) => name.to_string(),
                    Err(err) => {
                        tracing::error!(type_name = %desc.type_name, field = %field.name, %err);
                        self.diagnostics
                            .unknown_scalar(&desc.type_name, &field.name, *code);
                        String::new()
                    }
                },
                FieldKind::Other(kind) => {
                    tracing::warn!(
                        type_name = %desc.type_name,
                        field = %field.name,
                        kind = %kind,
                        "dropping field of unsupported kind"
                    );
                    self.diagnostics
                        .unknown_field_kind(&desc.type_name, &field.name, kind);
                    continue;
                }
            };

            fields.push(proto::field_line(
                field.qualifier,
                &field_type,
                &field.name,
                field.number,
            ));
        }

        self.types.complete(entry_id, fields, locals);
        Ok(entry_id)
    }

    /// Emit a service and register its request/response types under the
    /// service's package. Returns false when the service was already emitted.
    pub fn emit_service(&mut self, modules: &ModuleGraph, id: ServiceId) -> Result<bool> {
        let desc = modules.pool().service(id);
        if self.services.contains(&desc.type_name) {
            return Ok(false);
        }

        let (package, name) = names::split_service(&desc.type_name);
        let prefix = names::package_prefix(package);

        let mut rpcs = Vec::with_capacity(desc.methods.len());
        for method in desc.methods.values() {
            let input = modules.resolve_message(&method.input)?;
            let output = modules.resolve_message(&method.output)?;
            let input = self.register_type(modules, &prefix, input, true)?;
            let output = self.register_type(modules, &prefix, output, true)?;
            // a type first seen nested still needs a top-level block here
            for id in [input, output] {
                if !self.types.get(id).global {
                    tracing::debug!(
                        type_name = %self.types.get(id).qualified_name,
                        "promoting nested method type to top level"
                    );
                    self.types.promote(id);
                }
            }

            if !matches!(method.kind, MethodKind::Unary | MethodKind::ServerStreaming) {
                tracing::warn!(
                    service = %desc.type_name,
                    method = %method.name,
                    kind = method.kind.as_str(),
                    "rendering streaming method as unary"
                );
                self.diagnostics
                    .streaming_downgraded(&desc.type_name, &method.name, method.kind.as_str());
            }

            rpcs.push(proto::rpc_line(
                &method.name,
                &self.types.get(input).local_name,
                method.kind.is_server_streaming(),
                &self.types.get(output).local_name,
            ));
        }

        tracing::info!(service = %desc.type_name, methods = rpcs.len(), "emitted service");
        self.services.insert(ServiceEntry {
            qualified_name: desc.type_name.clone(),
            package: package.to_string(),
            name: name.to_string(),
            lines: proto::service_block(name, &rpcs),
        });
        Ok(true)
    }

    /// Render a message block with its nested definitions inlined.
    ///
    /// A local already open further out in the output is not inlined again;
    /// its name resolves through the enclosing block.
    pub fn render_type(&self, id: TypeEntryId) -> Vec<String> {
        self.render_nested(id, &mut Vec::new())
    }

    fn render_nested(&self, id: TypeEntryId, open: &mut Vec<TypeEntryId>) -> Vec<String> {
        let entry = self.types.get(id);
        open.push(id);

        let mut preamble = Vec::new();
        for local in &entry.locals {
            match *local {
                Local::Enum(e) => preamble.extend(proto::indent(&self.enums.get(e).lines)),
                Local::Type(t) if !open.contains(&t) => {
                    let block = self.render_nested(t, open);
                    preamble.extend(proto::indent(&block));
                }
                Local::Type(_) => {}
            }
        }

        open.pop();
        proto::message_block(&entry.local_name, &entry.qualified_name, &preamble, &entry.fields)
    }

    /// Top-level blocks in document order: enums, messages, services
    pub fn blocks(&self) -> Vec<Vec<String>> {
        self.enums
            .globals()
            .map(|e| e.lines.clone())
            .chain(self.types.global_ids().map(|id| self.render_type(id)))
            .chain(self.services.iter().map(|s| s.lines.clone()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.enums.clear();
        self.types.clear();
        self.services.clear();
        self.diagnostics.clear();
    }
}
