//! Reflected descriptors
//!
//! Message, enum and service descriptors as they survive in a compiled
//! bundle. Descriptors live in a [`DescriptorPool`] arena and reference each
//! other through ids or through lazy export paths, so recursive and mutually
//! recursive structures need no shared ownership.

use serde::{Deserialize, Serialize};

use indexmap::IndexMap;

/// Handle to a message descriptor in a [`DescriptorPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(usize);

/// Handle to an enum descriptor in a [`DescriptorPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(usize);

/// Handle to a service descriptor in a [`DescriptorPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(usize);

// =============================================================================
// Links
// =============================================================================

/// Location of a descriptor inside some module's exports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportPath {
    pub module: String,
    pub key: String,
}

impl ExportPath {
    pub fn new(module: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            key: key.into(),
        }
    }
}

/// Reference from a field or method to another descriptor.
///
/// `Export` links are resolved against the module graph when the schema is
/// emitted, after every factory has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link<I> {
    Resolved(I),
    Export(ExportPath),
}

impl<I> From<I> for Link<I> {
    fn from(id: I) -> Self {
        Link::Resolved(id)
    }
}

// =============================================================================
// Message descriptors
// =============================================================================

/// Field cardinality qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qualifier {
    Repeated,
    Optional,
    #[default]
    None,
}

impl Qualifier {
    /// Build from the reflected `repeated` / `opt` flags; repeated wins
    pub fn from_flags(repeated: bool, optional: bool) -> Self {
        if repeated {
            Qualifier::Repeated
        } else if optional {
            Qualifier::Optional
        } else {
            Qualifier::None
        }
    }

    /// Text placed before the field type
    pub fn prefix(&self) -> &'static str {
        match self {
            Qualifier::Repeated => "repeated ",
            Qualifier::Optional => "optional ",
            Qualifier::None => "",
        }
    }
}

/// What a field refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Message(Link<MessageId>),
    Enum(Link<EnumId>),
    /// Wire scalar code, see [`crate::codegen::scalar`]
    Scalar(i64),
    /// Any other reflected kind (e.g. `map`); dropped on emission
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub kind: FieldKind,
    pub qualifier: Qualifier,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            number,
            kind,
            qualifier: Qualifier::None,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.qualifier = Qualifier::Repeated;
        self
    }

    pub fn optional(mut self) -> Self {
        self.qualifier = Qualifier::Optional;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// Fully-qualified, dot-separated name
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
}

// =============================================================================
// Enum descriptors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    /// Number carried by the descriptor, if any
    pub number: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub type_name: String,
    /// Values in declaration order
    pub values: Vec<EnumValue>,
}

// =============================================================================
// Service descriptors
// =============================================================================

/// Call shape of an RPC method, from its reflected kind code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BiDiStreaming,
    Unknown(i64),
}

impl MethodKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => MethodKind::Unary,
            1 => MethodKind::ServerStreaming,
            2 => MethodKind::ClientStreaming,
            3 => MethodKind::BiDiStreaming,
            other => MethodKind::Unknown(other),
        }
    }

    pub fn is_server_streaming(&self) -> bool {
        matches!(self, MethodKind::ServerStreaming)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Unary => "unary",
            MethodKind::ServerStreaming => "server streaming",
            MethodKind::ClientStreaming => "client streaming",
            MethodKind::BiDiStreaming => "bidi streaming",
            MethodKind::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub input: Link<MessageId>,
    pub output: Link<MessageId>,
    pub kind: MethodKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub type_name: String,
    /// Methods keyed by their reflected property name, in declaration order
    pub methods: IndexMap<String, MethodDescriptor>,
}

// =============================================================================
// Pool
// =============================================================================

/// Arena owning every descriptor materialized by module factories
#[derive(Debug, Default)]
pub struct DescriptorPool {
    messages: Vec<MessageDescriptor>,
    enums: Vec<EnumDescriptor>,
    services: Vec<ServiceDescriptor>,
}

impl DescriptorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message with no fields yet; fields can be pushed later through
    /// [`DescriptorPool::message_mut`], which is how self-references are built.
    pub fn add_message(&mut self, type_name: impl Into<String>) -> MessageId {
        self.messages.push(MessageDescriptor {
            type_name: type_name.into(),
            fields: Vec::new(),
        });
        MessageId(self.messages.len() - 1)
    }

    pub fn add_enum(&mut self, type_name: impl Into<String>, values: Vec<EnumValue>) -> EnumId {
        self.enums.push(EnumDescriptor {
            type_name: type_name.into(),
            values,
        });
        EnumId(self.enums.len() - 1)
    }

    pub fn add_service(&mut self, type_name: impl Into<String>) -> ServiceId {
        self.services.push(ServiceDescriptor {
            type_name: type_name.into(),
            methods: IndexMap::new(),
        });
        ServiceId(self.services.len() - 1)
    }

    pub fn message(&self, id: MessageId) -> &MessageDescriptor {
        &self.messages[id.0]
    }

    pub fn message_mut(&mut self, id: MessageId) -> &mut MessageDescriptor {
        &mut self.messages[id.0]
    }

    pub fn enum_descriptor(&self, id: EnumId) -> &EnumDescriptor {
        &self.enums[id.0]
    }

    pub fn service(&self, id: ServiceId) -> &ServiceDescriptor {
        &self.services[id.0]
    }

    pub fn service_mut(&mut self, id: ServiceId) -> &mut ServiceDescriptor {
        &mut self.services[id.0]
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

/// Convenience for building enum values in declaration order
pub fn enum_values<I, S>(names: I) -> Vec<EnumValue>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(|name| EnumValue {
            name: name.into(),
            number: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifier_from_flags() {
        assert_eq!(Qualifier::from_flags(true, true), Qualifier::Repeated);
        assert_eq!(Qualifier::from_flags(false, true), Qualifier::Optional);
        assert_eq!(Qualifier::from_flags(false, false).prefix(), "");
    }

    #[test]
    fn test_method_kind_codes() {
        assert!(MethodKind::from_code(1).is_server_streaming());
        assert!(!MethodKind::from_code(0).is_server_streaming());
        assert!(!MethodKind::from_code(3).is_server_streaming());
        assert_eq!(MethodKind::from_code(9), MethodKind::Unknown(9));
    }

    #[test]
    fn test_self_referencing_message() {
        let mut pool = DescriptorPool::new();
        let node = pool.add_message("pkg.v1.Node");
        pool.message_mut(node)
            .fields
            .push(FieldDescriptor::new("children", 1, FieldKind::Message(node.into())).repeated());

        let desc = pool.message(node);
        assert_eq!(desc.fields.len(), 1);
        assert_eq!(desc.fields[0].kind, FieldKind::Message(Link::Resolved(node)));
        assert_eq!(desc.fields[0].qualifier, Qualifier::Repeated);
    }
}
