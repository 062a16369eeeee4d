use std::sync::Arc;

use recmap_api::config::CopyOptions;
use recmap_api::error::CopyError;
use recmap_api::registry::DescriptorRegistry;
use recmap_api::schema::{FloatWidth, IntWidth, RecordDescriptor, TypeSpec};
use recmap_api::value::{MapValue, RecordValue, Value};

use crate::cycle::{self, VisitedSet};

/// Per-call conversion state: the caller's options, the set of identities
/// currently being converted, and whether the top-level source was passed
/// by reference (addressability is inherited by nested records).
pub(crate) struct ConvertCtx<'o> {
    pub(crate) options: &'o CopyOptions,
    pub(crate) visited: VisitedSet,
    pub(crate) addressable: bool,
}

/// Convert `value` into a value of type `dest`.
///
/// Dispatch, in priority order: dynamic destinations take the concrete
/// value verbatim; dynamic sources are unwrapped; pointers are dereferenced
/// (nil becomes the destination zero value) or freshly allocated; then the
/// identical/numeric/sequence/record rules apply. Anything else is not
/// copyable.
pub(crate) fn convert(
    value: &Value,
    dest: &TypeSpec,
    ctx: &mut ConvertCtx<'_>,
) -> Result<Value, CopyError> {
    let dest = dest.underlying();

    // Resolve by-name record references so the rules below only ever see
    // concrete descriptors.
    let resolved;
    let dest = match dest {
        TypeSpec::RecordRef(name) => {
            let descriptor = DescriptorRegistry::global().get(name).ok_or_else(|| {
                CopyError::non_copyable(format!("unknown record type '{name}'"))
            })?;
            resolved = TypeSpec::Record(descriptor);
            &resolved
        }
        other => other,
    };

    match (value, dest) {
        // Opaque values are non-copyable unless the classifier allows their
        // kind, no matter the destination.
        (Value::Opaque(kind), _) if !ctx.options.classifier().is_copyable(*kind) => {
            Err(CopyError::non_copyable(format!(
                "opaque {kind:?} value is not copyable"
            )))
        }

        // An erased destination stores the concrete runtime value.
        (Value::Dynamic(Some(inner)), TypeSpec::Dynamic) => Ok((**inner).clone()),
        (_, TypeSpec::Dynamic) => Ok(value.clone()),

        // An erased source is unwrapped to its concrete value first.
        (Value::Dynamic(Some(inner)), _) => convert(inner, dest, ctx),
        (Value::Dynamic(None), _) => Ok(dest.zero_value()),

        // A nil source pointer converts to the destination zero value.
        (Value::Ptr(None), _) => Ok(dest.zero_value()),
        // A source pointer is dereferenced before conversion, guarded
        // against revisiting a target that is still being converted.
        (Value::Ptr(Some(target)), _) => {
            let id = cycle::ptr_identity(target);
            ctx.visited.enter(id, target.kind_name())?;
            let result = convert(target, dest, ctx);
            ctx.visited.leave(id);
            result
        }
        // A pointer destination gets a freshly allocated cell — never an
        // alias of the source storage.
        (_, TypeSpec::Ptr(inner)) => {
            let converted = convert(value, inner, ctx)?;
            Ok(Value::Ptr(Some(Arc::new(converted))))
        }

        (Value::Str(s), TypeSpec::Str) => Ok(Value::Str(s.clone())),
        (Value::Bool(b), TypeSpec::Bool) => Ok(Value::Bool(*b)),

        // Element-wise, order- and length-preserving.
        (Value::Seq(items), TypeSpec::Seq(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(convert(item, element, ctx)?);
            }
            Ok(Value::Seq(out))
        }

        // A nested record headed for a mapping-typed destination runs the
        // same enumeration + conversion pipeline.
        (Value::Record(record), TypeSpec::Map { key, value: value_type }) => {
            let id = cycle::record_identity(record);
            ctx.visited.enter(id, &record.descriptor.name)?;
            let mut map = MapValue::nil((**key).clone(), (**value_type).clone());
            let result = crate::copy::copy_record_to_map(&mut map, record, ctx);
            ctx.visited.leave(id);
            result?;
            Ok(Value::Map(map))
        }

        // Record to same record type: recursive full copy, every level
        // freshly allocated.
        (Value::Record(record), TypeSpec::Record(descriptor)) => {
            if !same_record_type(&record.descriptor, descriptor) {
                return Err(CopyError::non_copyable(format!(
                    "cannot convert record '{}' to record '{}'",
                    record.descriptor.name, descriptor.name
                )));
            }
            let id = cycle::record_identity(record);
            ctx.visited.enter(id, &record.descriptor.name)?;
            let result = deep_copy_record(record, ctx);
            ctx.visited.leave(id);
            result
        }

        // Mappings copy only between identical shapes.
        (Value::Map(map), TypeSpec::Map { key, value: value_type }) => {
            if map.key_type.underlying() == key.underlying()
                && map.value_type.underlying() == value_type.underlying()
            {
                Ok(Value::Map(map.clone()))
            } else {
                Err(CopyError::non_copyable(format!(
                    "cannot convert {} to {}",
                    TypeSpec::map(map.key_type.clone(), map.value_type.clone()).name(),
                    dest.name()
                )))
            }
        }

        // Classifier-allowed opaque values copy verbatim between matching
        // kinds.
        (Value::Opaque(kind), TypeSpec::Opaque(dest_kind)) if kind == dest_kind => {
            Ok(value.clone())
        }

        _ => {
            if let Some(n) = numeric(value) {
                if let Some(out) = cast_numeric(n, dest) {
                    return Ok(out);
                }
            }
            Err(CopyError::non_copyable(format!(
                "cannot convert {} to {}",
                value.kind_name(),
                dest.name()
            )))
        }
    }
}

fn same_record_type(a: &Arc<RecordDescriptor>, b: &Arc<RecordDescriptor>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

fn deep_copy_record(record: &RecordValue, ctx: &mut ConvertCtx<'_>) -> Result<Value, CopyError> {
    let mut values = Vec::with_capacity(record.values.len());
    for (field, value) in record.descriptor.fields.iter().zip(&record.values) {
        values.push(convert(value, &field.field_type, ctx)?);
    }
    Ok(Value::Record(RecordValue::new(
        record.descriptor.clone(),
        values,
    )))
}

enum Num {
    Int(i128),
    Float(f64),
}

fn numeric(value: &Value) -> Option<Num> {
    Some(match value {
        Value::I8(v) => Num::Int(*v as i128),
        Value::I16(v) => Num::Int(*v as i128),
        Value::I32(v) => Num::Int(*v as i128),
        Value::I64(v) => Num::Int(*v as i128),
        Value::U8(v) => Num::Int(*v as i128),
        Value::U16(v) => Num::Int(*v as i128),
        Value::U32(v) => Num::Int(*v as i128),
        Value::U64(v) => Num::Int(*v as i128),
        Value::F32(v) => Num::Float(*v as f64),
        Value::F64(v) => Num::Float(*v),
        _ => return None,
    })
}

/// Numeric family conversion with native cast semantics: integer narrowing
/// wraps (two's-complement truncation), integer-to-float and float-to-float
/// round to the nearest representable value, float-to-integer saturates.
fn cast_numeric(n: Num, dest: &TypeSpec) -> Option<Value> {
    Some(match dest {
        TypeSpec::Int(IntWidth::W8) => match n {
            Num::Int(v) => Value::I8(v as i8),
            Num::Float(f) => Value::I8(f as i8),
        },
        TypeSpec::Int(IntWidth::W16) => match n {
            Num::Int(v) => Value::I16(v as i16),
            Num::Float(f) => Value::I16(f as i16),
        },
        TypeSpec::Int(IntWidth::W32) => match n {
            Num::Int(v) => Value::I32(v as i32),
            Num::Float(f) => Value::I32(f as i32),
        },
        TypeSpec::Int(IntWidth::W64) => match n {
            Num::Int(v) => Value::I64(v as i64),
            Num::Float(f) => Value::I64(f as i64),
        },
        TypeSpec::UInt(IntWidth::W8) => match n {
            Num::Int(v) => Value::U8(v as u8),
            Num::Float(f) => Value::U8(f as u8),
        },
        TypeSpec::UInt(IntWidth::W16) => match n {
            Num::Int(v) => Value::U16(v as u16),
            Num::Float(f) => Value::U16(f as u16),
        },
        TypeSpec::UInt(IntWidth::W32) => match n {
            Num::Int(v) => Value::U32(v as u32),
            Num::Float(f) => Value::U32(f as u32),
        },
        TypeSpec::UInt(IntWidth::W64) => match n {
            Num::Int(v) => Value::U64(v as u64),
            Num::Float(f) => Value::U64(f as u64),
        },
        TypeSpec::Float(FloatWidth::W32) => match n {
            Num::Int(v) => Value::F32(v as f32),
            Num::Float(f) => Value::F32(f as f32),
        },
        TypeSpec::Float(FloatWidth::W64) => match n {
            Num::Int(v) => Value::F64(v as f64),
            Num::Float(f) => Value::F64(f),
        },
        _ => return None,
    })
}
