//! Diagnostics
//!
//! Collects non-fatal anomalies found while reconstructing a schema.
//! A run with diagnostics still produces a document; it is just lossy.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Scalar field carries a wire code with no canonical name
    UnknownScalar,
    /// Field kind is not message, enum or scalar; the field is dropped
    UnknownFieldKind,
    /// Client or bidi streaming method rendered as a unary call
    StreamingDowngraded,
    /// Module resolved with no definition record behind it
    UndefinedModule,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownScalar => "E001",
            Self::UnknownFieldKind => "W001",
            Self::StreamingDowngraded => "W002",
            Self::UndefinedModule => "I001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownScalar => Severity::Error,
            Self::UnknownFieldKind | Self::StreamingDowngraded => Severity::Warning,
            Self::UndefinedModule => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Fully-qualified descriptor or module name the item is about
    pub subject: String,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(
        subject: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.subject
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Ordered collection of diagnostics from one generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Record a scalar code with no canonical name
    pub fn unknown_scalar(&mut self, type_name: &str, field: &str, code: i64) {
        self.push(
            DiagnosticItem::new(
                type_name,
                DiagnosticCode::UnknownScalar,
                format!("No type for scalar {} on field '{}'", code, field),
            )
            .with_context("field emitted with a blank type"),
        );
    }

    /// Record a field dropped because its kind is not understood
    pub fn unknown_field_kind(&mut self, type_name: &str, field: &str, kind: &str) {
        self.push(DiagnosticItem::new(
            type_name,
            DiagnosticCode::UnknownFieldKind,
            format!("Dropped field '{}' of unsupported kind '{}'", field, kind),
        ));
    }

    pub fn streaming_downgraded(&mut self, service: &str, method: &str, kind: &str) {
        self.push(DiagnosticItem::new(
            service,
            DiagnosticCode::StreamingDowngraded,
            format!("Method '{}' is {} but was rendered as unary", method, kind),
        ));
    }

    pub fn undefined_module(&mut self, module: &str) {
        self.push(DiagnosticItem::new(
            module,
            DiagnosticCode::UndefinedModule,
            "Resolved with no definition; exports are empty",
        ));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items carrying a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
