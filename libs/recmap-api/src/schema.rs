use std::collections::HashMap;
use std::sync::Arc;

use crate::value::{MapValue, OpaqueKind, RecordValue, Value};

/// Integer storage width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// Float storage width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FloatWidth {
    W32,
    W64,
}

/// Declared type description. Used for destination mapping key/value types
/// and for record field types.
///
/// `Named` wraps a user-declared type around its underlying representation,
/// so a key type "whose underlying representation is a string" and named
/// numeric value types convert like their base type.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TypeSpec {
    Bool,
    Int(IntWidth),
    UInt(IntWidth),
    Float(FloatWidth),
    Str,
    Ptr(Box<TypeSpec>),
    Seq(Box<TypeSpec>),
    Map {
        key: Box<TypeSpec>,
        value: Box<TypeSpec>,
    },
    Record(Arc<RecordDescriptor>),
    /// A record type referenced by name, resolved through the process-wide
    /// `DescriptorRegistry`. This is how a record type refers to itself
    /// (directly or through pointers).
    RecordRef(String),
    /// Erased holder type — accepts any concrete value verbatim.
    Dynamic,
    Opaque(OpaqueKind),
    Named {
        name: String,
        base: Box<TypeSpec>,
    },
}

impl TypeSpec {
    pub fn int64() -> TypeSpec {
        TypeSpec::Int(IntWidth::W64)
    }

    pub fn uint64() -> TypeSpec {
        TypeSpec::UInt(IntWidth::W64)
    }

    pub fn ptr(inner: TypeSpec) -> TypeSpec {
        TypeSpec::Ptr(Box::new(inner))
    }

    pub fn seq(element: TypeSpec) -> TypeSpec {
        TypeSpec::Seq(Box::new(element))
    }

    pub fn map(key: TypeSpec, value: TypeSpec) -> TypeSpec {
        TypeSpec::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn record_ref(name: impl Into<String>) -> TypeSpec {
        TypeSpec::RecordRef(name.into())
    }

    pub fn named(name: impl Into<String>, base: TypeSpec) -> TypeSpec {
        TypeSpec::Named {
            name: name.into(),
            base: Box::new(base),
        }
    }

    /// Strip `Named` wrappers down to the underlying representation.
    pub fn underlying(&self) -> &TypeSpec {
        let mut t = self;
        while let TypeSpec::Named { base, .. } = t {
            t = base;
        }
        t
    }

    /// Whether the type is a string or a named type whose underlying
    /// representation is a string. Mapping key types must satisfy this.
    pub fn is_string_representable(&self) -> bool {
        matches!(self.underlying(), TypeSpec::Str)
    }

    /// The zero value of this type.
    pub fn zero_value(&self) -> Value {
        match self.underlying() {
            TypeSpec::Bool => Value::Bool(false),
            TypeSpec::Int(IntWidth::W8) => Value::I8(0),
            TypeSpec::Int(IntWidth::W16) => Value::I16(0),
            TypeSpec::Int(IntWidth::W32) => Value::I32(0),
            TypeSpec::Int(IntWidth::W64) => Value::I64(0),
            TypeSpec::UInt(IntWidth::W8) => Value::U8(0),
            TypeSpec::UInt(IntWidth::W16) => Value::U16(0),
            TypeSpec::UInt(IntWidth::W32) => Value::U32(0),
            TypeSpec::UInt(IntWidth::W64) => Value::U64(0),
            TypeSpec::Float(FloatWidth::W32) => Value::F32(0.0),
            TypeSpec::Float(FloatWidth::W64) => Value::F64(0.0),
            TypeSpec::Str => Value::Str(String::new()),
            TypeSpec::Ptr(_) => Value::Ptr(None),
            TypeSpec::Seq(_) => Value::Seq(Vec::new()),
            TypeSpec::Map { key, value } => {
                Value::Map(MapValue::nil((**key).clone(), (**value).clone()))
            }
            TypeSpec::Record(descriptor) => Value::Record(RecordValue::new(
                descriptor.clone(),
                descriptor
                    .fields
                    .iter()
                    .map(|f| f.field_type.zero_value())
                    .collect(),
            )),
            TypeSpec::RecordRef(name) => {
                // An unregistered reference degrades to an empty record;
                // registering self-referential descriptors is the caller's
                // responsibility.
                let descriptor = crate::registry::DescriptorRegistry::global()
                    .get(name)
                    .unwrap_or_else(|| RecordDescriptor::new(name.clone(), Vec::new()));
                TypeSpec::Record(descriptor).zero_value()
            }
            TypeSpec::Dynamic => Value::Dynamic(None),
            TypeSpec::Opaque(kind) => Value::Opaque(*kind),
            TypeSpec::Named { .. } => unreachable!("underlying() strips Named"),
        }
    }

    /// Short type name for diagnostics.
    pub fn name(&self) -> String {
        match self {
            TypeSpec::Bool => "bool".into(),
            TypeSpec::Int(IntWidth::W8) => "i8".into(),
            TypeSpec::Int(IntWidth::W16) => "i16".into(),
            TypeSpec::Int(IntWidth::W32) => "i32".into(),
            TypeSpec::Int(IntWidth::W64) => "i64".into(),
            TypeSpec::UInt(IntWidth::W8) => "u8".into(),
            TypeSpec::UInt(IntWidth::W16) => "u16".into(),
            TypeSpec::UInt(IntWidth::W32) => "u32".into(),
            TypeSpec::UInt(IntWidth::W64) => "u64".into(),
            TypeSpec::Float(FloatWidth::W32) => "f32".into(),
            TypeSpec::Float(FloatWidth::W64) => "f64".into(),
            TypeSpec::Str => "string".into(),
            TypeSpec::Ptr(inner) => format!("*{}", inner.name()),
            TypeSpec::Seq(element) => format!("[]{}", element.name()),
            TypeSpec::Map { key, value } => format!("map[{}]{}", key.name(), value.name()),
            TypeSpec::Record(d) => d.name.clone(),
            TypeSpec::RecordRef(name) => name.clone(),
            TypeSpec::Dynamic => "dynamic".into(),
            TypeSpec::Opaque(kind) => format!("opaque {kind:?}"),
            TypeSpec::Named { name, .. } => name.clone(),
        }
    }
}

/// Field visibility outside the record's declaring scope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
pub enum FieldVisibility {
    #[default]
    Visible,
    Encapsulated,
}

/// A single field in a record descriptor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: TypeSpec,
    #[serde(default)]
    pub visibility: FieldVisibility,
    /// Anonymous embedding — the field's record subtree is flattened into
    /// the enclosing level unless an annotation overrides its key.
    #[serde(default)]
    pub embedded: bool,
    /// Field-level properties. The copy annotation lives under
    /// `props["copy"]`; other keys are preserved but not interpreted.
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: TypeSpec) -> Self {
        Self {
            name: name.into(),
            field_type,
            visibility: FieldVisibility::Visible,
            embedded: false,
            props: HashMap::new(),
        }
    }

    pub fn encapsulated(mut self) -> Self {
        self.visibility = FieldVisibility::Encapsulated;
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Attach a copy annotation string, e.g. `"i"`, `"-"`, `"u,required"`.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.props.insert(
            crate::policy::ANNOTATION_PROP.to_string(),
            serde_json::Value::String(annotation.into()),
        );
        self
    }

    /// The raw copy annotation, if present and a string.
    pub fn annotation(&self) -> Option<&str> {
        self.props
            .get(crate::policy::ANNOTATION_PROP)
            .and_then(|v| v.as_str())
    }
}

/// Record type description: named, typed, annotated fields in declaration
/// order. Built once per concrete record type and shared via `Arc` —
/// read-only after construction, safe for concurrent reads.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordDescriptor {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl RecordDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fields,
        })
    }

    pub fn field_named(&self, name: &str) -> Option<(usize, &FieldSchema)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
    }
}
