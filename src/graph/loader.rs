//! Definition Bundle Loading
//!
//! Reads definition records produced by the extraction step from a JSON file
//! or a directory of JSON files and turns each record into a
//! [`DefinitionRecord`] whose factory materializes the declared descriptors.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use walkdir::WalkDir;

use super::{DefinitionRecord, DefinitionRegistry, ExportValue, FactoryScope};
use crate::descriptor::{
    EnumValue, ExportPath, FieldDescriptor, FieldKind, Link, MethodDescriptor, MethodKind,
    Qualifier,
};
use crate::error::{ReconError, Result};

// =============================================================================
// Bundle format
// =============================================================================

/// Top level of a bundle file: a wrapped or bare list of records
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BundleFile {
    Bare(Vec<DefinitionSpec>),
    Wrapped { definitions: Vec<DefinitionSpec> },
}

impl BundleFile {
    pub fn into_definitions(self) -> Vec<DefinitionSpec> {
        match self {
            BundleFile::Wrapped { definitions } => definitions,
            BundleFile::Bare(definitions) => definitions,
        }
    }
}

/// One definition record as written by the extraction step
#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionSpec {
    pub name: String,
    #[serde(default, alias = "dependencies")]
    pub deps: Vec<String>,
    #[serde(default)]
    pub exports: IndexMap<String, ExportSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSpec {
    Message(MessageSpec),
    Enum(EnumSpec),
    Service(ServiceSpec),
    /// Re-export of a dependency's exports, by module name
    Module(String),
    Value(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSpec {
    pub type_name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub no: u32,
    pub name: String,
    pub kind: String,
    #[serde(rename = "T", default)]
    pub target: Option<TargetSpec>,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default, alias = "optional")]
    pub opt: bool,
}

/// Field target: a scalar code or a reference to another export
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    Scalar(i64),
    /// `"Key"` or `"module#Key"`
    Name(String),
    Ref {
        #[serde(rename = "ref")]
        key: String,
        #[serde(default)]
        from: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumSpec {
    pub type_name: String,
    #[serde(default)]
    pub values: Vec<EnumValueSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumValueSpec {
    pub name: String,
    #[serde(default)]
    pub no: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub type_name: String,
    #[serde(default)]
    pub methods: IndexMap<String, MethodSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(rename = "I")]
    pub input: TargetSpec,
    #[serde(rename = "O")]
    pub output: TargetSpec,
    #[serde(default)]
    pub kind: i64,
}

// =============================================================================
// Loading
// =============================================================================

/// Load a bundle file, or every `*.json` file below a directory in path order
pub fn load_bundle(path: &Path) -> Result<DefinitionRegistry> {
    let mut files: Vec<PathBuf> = if path.is_dir() {
        WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && p.extension().map(|e| e == "json").unwrap_or(false))
            .collect()
    } else {
        vec![path.to_path_buf()]
    };
    files.sort();

    let mut registry = DefinitionRegistry::new();
    for file in files {
        let content = fs::read_to_string(&file)?;
        let specs = parse_bundle(&content).map_err(|e| ReconError::Bundle {
            path: file.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %file.display(), records = specs.len(), "loaded bundle file");
        for spec in specs {
            registry.insert(spec.into_record());
        }
    }

    Ok(registry)
}

pub fn parse_bundle(content: &str) -> serde_json::Result<Vec<DefinitionSpec>> {
    let bundle: BundleFile = serde_json::from_str(content)?;
    Ok(bundle.into_definitions())
}

impl DefinitionSpec {
    /// Convert into a record whose factory populates its own exports
    pub fn into_record(self) -> DefinitionRecord {
        let DefinitionSpec {
            name,
            deps,
            exports,
        } = self;
        DefinitionRecord::new(name, deps, move |scope| materialize(scope, &exports))
    }
}

fn materialize(scope: &mut FactoryScope<'_>, exports: &IndexMap<String, ExportSpec>) -> Result<()> {
    let module = scope.name().to_string();

    for (key, spec) in exports {
        let value = match spec {
            ExportSpec::Message(message) => {
                let fields = message
                    .fields
                    .iter()
                    .map(|f| field_descriptor(&module, f))
                    .collect::<Result<Vec<_>>>()?;
                let id = scope.pool_mut().add_message(&message.type_name);
                scope.pool_mut().message_mut(id).fields = fields;
                ExportValue::Message(id)
            }
            ExportSpec::Enum(e) => {
                let values = e
                    .values
                    .iter()
                    .map(|v| EnumValue {
                        name: v.name.clone(),
                        number: v.no,
                    })
                    .collect();
                ExportValue::Enum(scope.pool_mut().add_enum(&e.type_name, values))
            }
            ExportSpec::Service(service) => {
                let mut methods = IndexMap::with_capacity(service.methods.len());
                for (method_key, method) in &service.methods {
                    let descriptor = MethodDescriptor {
                        name: method.name.clone(),
                        input: Link::Export(export_path(&module, &method.input, "I")?),
                        output: Link::Export(export_path(&module, &method.output, "O")?),
                        kind: MethodKind::from_code(method.kind),
                    };
                    methods.insert(method_key.clone(), descriptor);
                }
                let id = scope.pool_mut().add_service(&service.type_name);
                scope.pool_mut().service_mut(id).methods = methods;
                ExportValue::Service(id)
            }
            ExportSpec::Module(dep) => match scope.lookup(dep) {
                Some(id) => ExportValue::Module(id),
                None => return Err(scope.fail(format!("re-export of unknown module {}", dep))),
            },
            ExportSpec::Value(v) => ExportValue::Data(v.clone()),
        };
        scope.own_exports_mut().insert(key.clone(), value);
    }

    Ok(())
}

fn field_descriptor(module: &str, field: &FieldSpec) -> Result<FieldDescriptor> {
    let kind = match field.kind.as_str() {
        "scalar" => match &field.target {
            Some(TargetSpec::Scalar(code)) => FieldKind::Scalar(*code),
            _ => return Err(bad_target(module, &field.name, "scalar code")),
        },
        "message" => FieldKind::Message(Link::Export(target_path(module, field)?)),
        "enum" => FieldKind::Enum(Link::Export(target_path(module, field)?)),
        other => FieldKind::Other(other.to_string()),
    };

    Ok(FieldDescriptor {
        name: field.name.clone(),
        number: field.no,
        kind,
        qualifier: Qualifier::from_flags(field.repeated, field.opt),
    })
}

fn target_path(module: &str, field: &FieldSpec) -> Result<ExportPath> {
    match &field.target {
        Some(target) => export_path(module, target, &field.name),
        None => Err(bad_target(module, &field.name, "type reference")),
    }
}

fn export_path(module: &str, target: &TargetSpec, what: &str) -> Result<ExportPath> {
    match target {
        TargetSpec::Name(name) => Ok(match name.split_once('#') {
            Some((from, key)) => ExportPath::new(from, key),
            None => ExportPath::new(module, name.as_str()),
        }),
        TargetSpec::Ref { key, from } => Ok(ExportPath::new(
            from.as_deref().unwrap_or(module),
            key.as_str(),
        )),
        TargetSpec::Scalar(_) => Err(bad_target(module, what, "type reference")),
    }
}

fn bad_target(module: &str, field: &str, expected: &str) -> ReconError {
    ReconError::Factory {
        module: module.to_string(),
        message: format!("'{}' needs a {}", field, expected),
    }
}
