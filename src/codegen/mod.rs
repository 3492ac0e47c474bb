//! Schema Reconstruction
//!
//! Walks reflected service descriptors and rebuilds a proto3 document.
//!
//! Architecture:
//! - Generator: owns the module graph and the emission registries of one run
//! - Registries: dedup + scope inference, depth-first from each service
//! - proto: pure text rendering and document assembly
//!
//! Output order is fully determined by the order of methods and fields in
//! the input descriptors, so identical input yields identical bytes.

pub mod names;
pub mod proto;
pub mod registry;
pub mod scalar;

pub use proto::{DocumentHeader, EnumNumbering, ProtoDocument};
pub use registry::{
    EnumEntry, EnumEntryId, EnumRegistry, Local, Registries, ServiceEntry, ServiceRegistry,
    TypeEntry, TypeEntryId, TypeRegistry,
};
pub use scalar::{scalar_name, ScalarType};

use crate::config::OutputConfig;
use crate::descriptor::{EnumId, MessageId, ServiceId};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::{ReconError, Result};
use crate::graph::{DefinitionRegistry, ModuleGraph, ModuleId};

// =============================================================================
// Generator
// =============================================================================

/// Context of one generation run. Nothing here is global: a fresh
/// generator (or [`Generator::reset`]) starts a new run.
#[derive(Debug)]
pub struct Generator {
    modules: ModuleGraph,
    registries: Registries,
}

impl Generator {
    pub fn new(definitions: DefinitionRegistry) -> Self {
        Self {
            modules: ModuleGraph::new(definitions),
            registries: Registries::default(),
        }
    }

    pub fn with_numbering(mut self, numbering: EnumNumbering) -> Self {
        self.registries.numbering = numbering;
        self
    }

    pub fn modules(&self) -> &ModuleGraph {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleGraph {
        &mut self.modules
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.registries.diagnostics
    }

    pub fn resolve(&mut self, name: &str) -> Result<ModuleId> {
        self.modules.resolve(name)
    }

    /// Resolve a target module and emit the one service it exports
    pub fn emit_module(&mut self, name: &str) -> Result<ServiceId> {
        let id = self.modules.resolve(name)?;
        let services = self.modules.services_in(id);
        let service = match services.as_slice() {
            [only] => *only,
            [] => {
                return Err(ReconError::MissingService {
                    module: name.to_string(),
                })
            }
            many => {
                return Err(ReconError::AmbiguousService {
                    module: name.to_string(),
                    count: many.len(),
                })
            }
        };
        self.registries.emit_service(&self.modules, service)?;
        Ok(service)
    }

    pub fn emit_service(&mut self, id: ServiceId) -> Result<bool> {
        self.registries.emit_service(&self.modules, id)
    }

    pub fn register_type(
        &mut self,
        prefix: &str,
        id: MessageId,
        global: bool,
    ) -> Result<TypeEntryId> {
        self.registries.register_type(&self.modules, prefix, id, global)
    }

    pub fn register_enum(&mut self, prefix: &str, id: EnumId, global: bool) -> EnumEntryId {
        self.registries.register_enum(&self.modules, prefix, id, global)
    }

    /// Package of the first emitted service
    pub fn first_package(&self) -> Option<&str> {
        self.registries
            .services
            .iter()
            .map(|s| s.package.as_str())
            .find(|p| !p.is_empty())
    }

    /// Record an info diagnostic for every module resolved without a
    /// definition, once per module
    pub fn note_undefined_modules(&mut self) {
        let diagnostics = &mut self.registries.diagnostics;
        for name in self.modules.undefined() {
            let noted = diagnostics
                .with_code(DiagnosticCode::UndefinedModule)
                .any(|d| d.subject == *name);
            if !noted {
                diagnostics.undefined_module(name);
            }
        }
    }

    pub fn render(&self, header: &DocumentHeader) -> String {
        proto::render_document(header, &self.registries.blocks())
    }

    /// Forget everything emitted so far; resolved modules are kept
    pub fn reset(&mut self) {
        self.registries.clear();
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Emit every target module's service and assemble the document
pub fn generate(
    generator: &mut Generator,
    targets: &[String],
    output: &OutputConfig,
) -> Result<ProtoDocument> {
    if targets.is_empty() {
        return Err(ReconError::NoTargets);
    }

    for target in targets {
        generator.emit_module(target)?;
    }
    generator.note_undefined_modules();

    let package = match &output.package {
        Some(package) => package.clone(),
        None => generator.first_package().ok_or(ReconError::NoPackage)?.to_string(),
    };

    let contents = generator.render(&output.header(&package));
    Ok(ProtoDocument {
        file_name: output.file_name_for(&package),
        package,
        contents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FieldKind, Link, MethodDescriptor, MethodKind};
    use crate::graph::{ExportValue, EXPORTS};

    fn echo_definitions() -> DefinitionRegistry {
        let mut defs = DefinitionRegistry::new();
        defs.define("echo_connectweb", &[EXPORTS], |scope| {
            let pool = scope.pool_mut();
            let req = pool.add_message("pkg.v1.EchoRequest");
            pool.message_mut(req)
                .fields
                .push(FieldDescriptor::new("messages", 1, FieldKind::Scalar(9)).repeated());
            let res = pool.add_message("pkg.v1.EchoResponse");
            pool.message_mut(res)
                .fields
                .push(FieldDescriptor::new("count", 2, FieldKind::Scalar(5)));
            let svc = pool.add_service("pkg.v1.Echo");
            pool.service_mut(svc).methods.insert(
                "say".into(),
                MethodDescriptor {
                    name: "Say".into(),
                    input: Link::Resolved(req),
                    output: Link::Resolved(res),
                    kind: MethodKind::ServerStreaming,
                },
            );
            scope.own_exports_mut().insert("Echo".into(), ExportValue::Service(svc));
            Ok(())
        });
        defs.define("empty_connectweb", &[EXPORTS], |_| Ok(()));
        defs
    }

    #[test]
    fn test_emit_module_and_render() {
        let mut gen = Generator::new(echo_definitions());
        gen.emit_module("echo_connectweb").unwrap();
        // emitting the same service again is a no-op
        gen.emit_module("echo_connectweb").unwrap();

        assert_eq!(gen.first_package(), Some("pkg.v1"));
        let doc = gen.render(&OutputConfig::default().header("pkg.v1"));
        assert_eq!(doc.matches("service Echo {").count(), 1);
        assert!(doc.contains("\trpc Say(EchoRequest) returns (stream EchoResponse) {}\n"));
        assert!(doc.contains("\trepeated string messages = 1;\n"));
        assert!(doc.contains("\tint32 count = 2;\n"));
    }

    #[test]
    fn test_module_without_service() {
        let mut gen = Generator::new(echo_definitions());
        assert!(matches!(
            gen.emit_module("empty_connectweb"),
            Err(ReconError::MissingService { .. })
        ));
        assert!(matches!(
            gen.emit_module("not_defined"),
            Err(ReconError::MissingService { .. })
        ));
    }

    #[test]
    fn test_reset_starts_a_new_run() {
        let mut gen = Generator::new(echo_definitions());
        gen.emit_module("echo_connectweb").unwrap();
        assert_eq!(gen.registries().types.len(), 2);

        gen.reset();
        assert!(gen.registries().types.is_empty());
        assert!(gen.registries().services.is_empty());

        gen.emit_module("echo_connectweb").unwrap();
        assert_eq!(gen.registries().services.len(), 1);
    }

    #[test]
    fn test_generate_requires_targets() {
        let mut gen = Generator::new(echo_definitions());
        let err = generate(&mut gen, &[], &OutputConfig::default()).unwrap_err();
        assert!(matches!(err, ReconError::NoTargets));
    }

    #[test]
    fn test_generate_derives_package() {
        let mut gen = Generator::new(echo_definitions());
        let targets = ["echo_connectweb".to_string()];
        let doc = generate(&mut gen, &targets, &OutputConfig::default()).unwrap();

        assert_eq!(doc.package, "pkg.v1");
        assert_eq!(doc.file_name, "pkg.proto");
        assert!(doc.contents.starts_with(
            "syntax = \"proto3\";\npackage pkg.v1;\noption go_package = \"cursor/gen/pkg/v1;pkgv1\";\n"
        ));
    }

    #[test]
    fn test_repeated_generate_notes_undefined_once() {
        let mut gen = Generator::new(echo_definitions());
        gen.resolve("vs/base/missing").unwrap();
        let targets = ["echo_connectweb".to_string()];
        generate(&mut gen, &targets, &OutputConfig::default()).unwrap();
        generate(&mut gen, &targets, &OutputConfig::default()).unwrap();

        let undefined: Vec<_> = gen
            .diagnostics()
            .with_code(DiagnosticCode::UndefinedModule)
            .map(|d| d.subject.as_str())
            .collect();
        assert_eq!(undefined, vec!["vs/base/missing"]);
    }
}
