use std::sync::Arc;

use crate::schema::{RecordDescriptor, TypeSpec};

/// Canonical runtime value representation.
///
/// Strategy by kind:
/// - Scalars (integers at every width, floats, bool, string): eager, owned
/// - `Ptr`: `Arc` so every pointer target has a stable identity (cycle
///   tracking) and pointer values can be shared without copying the target
/// - `Seq`, `Record`, `Map`: recursive
/// - `Dynamic`: an erased (runtime-type, value) holder; the concrete value
///   is inspected only when converted
/// - `Opaque`: values with no data representation here (raw memory handles,
///   channels, functions) — copyability is decided by the classifier table
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),

    /// Pointer indirection. `None` is the nil pointer.
    Ptr(Option<Arc<Value>>),
    /// Ordered sequence — elements converted individually.
    Seq(Vec<Value>),
    Record(RecordValue),
    Map(MapValue),

    /// Dynamically-typed value holder. `None` is the empty holder.
    Dynamic(Option<Box<Value>>),
    Opaque(OpaqueKind),
}

/// Kinds of values that carry no copyable data representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OpaqueKind {
    RawHandle,
    Channel,
    Function,
}

impl Value {
    /// Allocate a pointer to `value`.
    pub fn ptr(value: Value) -> Value {
        Value::Ptr(Some(Arc::new(value)))
    }

    /// The nil pointer.
    pub fn nil_ptr() -> Value {
        Value::Ptr(None)
    }

    /// Wrap a concrete value in a dynamic holder.
    pub fn dynamic(value: Value) -> Value {
        Value::Dynamic(Some(Box::new(value)))
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Ptr(_) => "pointer",
            Value::Seq(_) => "sequence",
            Value::Record(_) => "record",
            Value::Map(_) => "mapping",
            Value::Dynamic(_) => "dynamic",
            Value::Opaque(_) => "opaque",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::I8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Positional record value. Field order matches `descriptor.fields`.
///
/// Maximally lightweight — values only. All metadata (names, types,
/// visibility, copy annotations) lives in the descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub descriptor: Arc<RecordDescriptor>,
    pub values: Vec<Value>,
}

impl RecordValue {
    pub fn new(descriptor: Arc<RecordDescriptor>, values: Vec<Value>) -> Self {
        debug_assert_eq!(
            descriptor.fields.len(),
            values.len(),
            "record value arity must match its descriptor"
        );
        Self { descriptor, values }
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Destination mapping value: declared key/value types plus entries.
///
/// `entries == None` models a nil (unallocated) mapping, which is
/// distinguishable from an allocated empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    pub key_type: TypeSpec,
    pub value_type: TypeSpec,
    entries: Option<Vec<(String, Value)>>,
}

impl MapValue {
    /// A nil (unallocated) mapping.
    pub fn nil(key_type: TypeSpec, value_type: TypeSpec) -> Self {
        Self {
            key_type,
            value_type,
            entries: None,
        }
    }

    /// An allocated, empty mapping.
    pub fn empty(key_type: TypeSpec, value_type: TypeSpec) -> Self {
        Self {
            key_type,
            value_type,
            entries: Some(Vec::new()),
        }
    }

    pub fn is_nil(&self) -> bool {
        self.entries.is_none()
    }

    /// Allocate the entry storage if the mapping is nil.
    pub fn allocate(&mut self) {
        if self.entries.is_none() {
            self.entries = Some(Vec::new());
        }
    }

    /// Insert `(key, value)`, overwriting an existing entry for that key.
    /// Allocates if the mapping is nil.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let entries = self.entries.get_or_insert_with(Vec::new);
        if let Some(entry) = entries.iter_mut().find(|(k, _)| k == &key) {
            entry.1 = value;
        } else {
            entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Entries in insertion order. Empty for a nil mapping.
    pub fn entries(&self) -> &[(String, Value)] {
        self.entries.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
