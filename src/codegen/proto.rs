//! Proto3 Emitter
//!
//! Renders registry entries into proto3 text and assembles the final
//! document. Nothing here looks at descriptors beyond the values passed in.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::descriptor::{EnumValue, Qualifier};
use crate::error::{ReconError, Result};

/// How enum value numbers are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumNumbering {
    /// Position in declaration order
    #[default]
    Positional,
    /// Number carried by the descriptor, falling back to the position
    Declared,
}

// =============================================================================
// Blocks
// =============================================================================

pub fn indent(lines: &[String]) -> impl Iterator<Item = String> + '_ {
    lines.iter().map(|l| format!("\t{}", l))
}

pub fn enum_block(
    local_name: &str,
    qualified_name: &str,
    values: &[EnumValue],
    numbering: EnumNumbering,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(values.len() + 2);
    lines.push(format!("enum {} {{ // {}", local_name, qualified_name));
    for (position, value) in values.iter().enumerate() {
        let number = match numbering {
            EnumNumbering::Positional => position as i64,
            EnumNumbering::Declared => value.number.map(i64::from).unwrap_or(position as i64),
        };
        lines.push(format!("\t{} = {};", value.name, number));
    }
    lines.push("}".to_string());
    lines
}

pub fn field_line(qualifier: Qualifier, field_type: &str, name: &str, number: u32) -> String {
    format!("{}{} {} = {};", qualifier.prefix(), field_type, name, number)
}

/// `preamble` is expected to be indented already; field lines are not
pub fn message_block(
    local_name: &str,
    qualified_name: &str,
    preamble: &[String],
    fields: &[String],
) -> Vec<String> {
    let mut lines = Vec::with_capacity(preamble.len() + fields.len() + 2);
    lines.push(format!("message {} {{ // {}", local_name, qualified_name));
    lines.extend(preamble.iter().cloned());
    lines.extend(indent(fields));
    lines.push("}".to_string());
    lines
}

pub fn rpc_line(method: &str, input: &str, server_streaming: bool, output: &str) -> String {
    let stream = if server_streaming { "stream " } else { "" };
    format!("rpc {}({}) returns ({}{}) {{}}", method, input, stream, output)
}

pub fn service_block(name: &str, rpcs: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rpcs.len() + 2);
    lines.push(format!("service {} {{", name));
    lines.extend(indent(rpcs));
    lines.push("}".to_string());
    lines
}

// =============================================================================
// Document
// =============================================================================

/// Header directives of a schema document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub package: String,
    pub option_name: String,
    pub option_value: String,
}

/// Concatenate the header and every top-level block
pub fn render_document(header: &DocumentHeader, blocks: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str("syntax = \"proto3\";\n");
    out.push_str(&format!("package {};\n", header.package));
    out.push_str(&format!(
        "option {} = \"{}\";\n",
        header.option_name, header.option_value
    ));
    for block in blocks {
        out.push_str(&block.join("\n"));
        out.push('\n');
    }
    out
}

/// A rendered schema document and where it belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoDocument {
    pub package: String,
    pub file_name: String,
    pub contents: String,
}

impl ProtoDocument {
    /// `<seg1>/<seg2>/.../<file_name>` for package `seg1.seg2...`
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self
            .package
            .split('.')
            .filter(|s| !s.is_empty())
            .collect();
        path.push(&self.file_name);
        path
    }

    /// SHA-256 of the contents, hex encoded
    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(self.contents.as_bytes()))
    }

    /// Write under `out_dir`, creating the package directories first
    pub fn write_to(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(self.relative_path());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ReconError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &self.contents).map_err(|source| ReconError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), sha256 = %self.checksum(), "wrote schema document");
        Ok(path)
    }
}
