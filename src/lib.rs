//! Proto Schema Reconstruction
//!
//! Rebuilds a proto3 schema document from the runtime descriptors that an
//! RPC client bundle registers through its module loader.
//!
//! ## Features
//!
//! - **Module Graph**: lazy, cycle-safe resolution of named module definitions
//! - **Descriptor Arena**: messages, enums and services addressed by handle
//! - **Scope Inference**: nested types are inlined, top-level types emitted once
//! - **Deterministic Output**: identical input yields byte-identical documents
//! - **Diagnostics**: lossy conversions are reported, never silently dropped
//!
//! ## Architecture
//!
//! ```text
//! bundle.json ──> graph::loader ──> DefinitionRegistry
//!                                         │
//!                                         v
//!                 ModuleGraph (resolve, early registration)
//!                                         │ DescriptorPool
//!                                         v
//!                 codegen::Registries (enums, types, services)
//!                                         │
//!                                         v
//!                 ProtoDocument ──> <out>/<pkg>/<ver>/<file>.proto
//! ```

pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod graph;

pub use codegen::{generate, DocumentHeader, EnumNumbering, Generator, ProtoDocument};
pub use config::ReconConfig;
pub use descriptor::{
    DescriptorPool, EnumId, ExportPath, FieldDescriptor, FieldKind, Link, MessageId, MethodKind,
    ServiceId,
};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use error::{ReconError, Result};
pub use graph::{load_bundle, DefinitionRegistry, ModuleGraph, ModuleId};
