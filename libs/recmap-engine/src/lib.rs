//! Record-to-mapping copy engine.
//!
//! Copies the fields of a record-typed value into a mapping-typed value:
//! per-field rename/exclude/require policy from declarative annotations,
//! recursive type coercion, encapsulated-field access behind an explicit
//! addressability contract, and cycle detection over pointer graphs.

pub mod copy;
pub mod enumerate;
pub mod registry;

mod access;
mod convert;
mod cycle;

pub use copy::{copy, copy_with, Source};
pub use enumerate::FieldDescriptor;

// One-stop re-exports of the data model crate.
pub use recmap_api::config::{CopyOptions, TypeClassifier};
pub use recmap_api::error::{CopyError, CopyErrorKind};
pub use recmap_api::policy::FieldPolicy;
pub use recmap_api::registry::DescriptorRegistry;
pub use recmap_api::schema::{
    FieldSchema, FieldVisibility, FloatWidth, IntWidth, RecordDescriptor, TypeSpec,
};
pub use recmap_api::value::{MapValue, OpaqueKind, RecordValue, Value};
