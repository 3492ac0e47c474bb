//! Error types for schema reconstruction

use std::path::PathBuf;

use thiserror::Error;

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, ReconError>;

/// Fatal reconstruction errors.
///
/// Per-field anomalies (unknown scalars, unknown field kinds) are not errors;
/// they are collected as [`crate::Diagnostics`] and the run continues.
#[derive(Error, Debug)]
pub enum ReconError {
    #[error("No type for scalar code {0}")]
    UnknownScalar(i64),

    #[error("Module {module} exports no service descriptor")]
    MissingService { module: String },

    #[error("Module {module} exports {count} service descriptors, expected exactly one")]
    AmbiguousService { module: String, count: usize },

    #[error("Export {key} not found in module {module}")]
    MissingExport { module: String, key: String },

    #[error("Export {key} in module {module} is not a {expected} descriptor")]
    ExportKind {
        module: String,
        key: String,
        expected: &'static str,
    },

    #[error("Factory for module {module} failed: {message}")]
    Factory { module: String, message: String },

    #[error("No target modules configured")]
    NoTargets,

    #[error("No package name configured and no service was emitted")]
    NoPackage,

    #[error("Invalid definition bundle {path}: {message}")]
    Bundle { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
