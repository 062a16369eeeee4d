use recmap_api::config::CopyOptions;
use recmap_api::error::{CopyError, CopyErrorKind};
use recmap_api::schema::FieldVisibility;
use recmap_api::value::{MapValue, RecordValue};

use crate::access;
use crate::convert::{self, ConvertCtx};
use crate::cycle::VisitedSet;
use crate::registry::PlanRegistry;

/// The source of a copy, carrying the addressability contract: a
/// by-reference source is backed by an addressable location, so its
/// encapsulated fields are readable; a by-value source is a detached copy,
/// and reading its encapsulated fields fails.
#[derive(Debug)]
pub enum Source<'a> {
    ByRef(&'a RecordValue),
    ByValue(RecordValue),
}

impl Source<'_> {
    pub fn record(&self) -> &RecordValue {
        match self {
            Source::ByRef(record) => record,
            Source::ByValue(record) => record,
        }
    }

    pub fn is_addressable(&self) -> bool {
        matches!(self, Source::ByRef(_))
    }
}

impl<'a> From<&'a RecordValue> for Source<'a> {
    fn from(record: &'a RecordValue) -> Self {
        Source::ByRef(record)
    }
}

impl From<RecordValue> for Source<'static> {
    fn from(record: RecordValue) -> Self {
        Source::ByValue(record)
    }
}

/// Copy the fields of `source` into the destination mapping with default
/// options.
pub fn copy<'a>(
    dest: &mut MapValue,
    source: impl Into<Source<'a>>,
) -> Result<(), CopyError> {
    copy_with(dest, source, &CopyOptions::default())
}

/// Copy the fields of `source` into the destination mapping.
///
/// The destination is allocated if nil. On failure it is left in a
/// partially populated, unspecified state. Concurrent copies are safe as
/// long as they target disjoint destinations and no one mutates the source
/// during the call.
pub fn copy_with<'a>(
    dest: &mut MapValue,
    source: impl Into<Source<'a>>,
    options: &CopyOptions,
) -> Result<(), CopyError> {
    let source = source.into();
    let mut ctx = ConvertCtx {
        options,
        visited: VisitedSet::new(),
        addressable: source.is_addressable(),
    };
    copy_record_to_map(dest, source.record(), &mut ctx)
}

/// The shared enumeration + conversion pipeline, used at the top level and
/// for nested record-valued fields headed into mapping-typed destinations.
///
/// Only this function mutates the destination; the converter produces
/// values and never touches it.
pub(crate) fn copy_record_to_map(
    dest: &mut MapValue,
    record: &RecordValue,
    ctx: &mut ConvertCtx<'_>,
) -> Result<(), CopyError> {
    // A mapping whose key type is not string-representable cannot receive
    // any field — this fails (or is tolerated) as a whole, never per field.
    if !dest.key_type.is_string_representable() {
        if ctx.options.ignores_non_copyable() {
            dest.allocate();
            return Ok(());
        }
        return Err(CopyError::non_copyable(format!(
            "mapping key type '{}' is not string-representable",
            dest.key_type.name()
        )));
    }
    dest.allocate();

    let plan = PlanRegistry::global().plan_for(&record.descriptor);
    for descriptor in plan.iter() {
        if descriptor.ignored {
            continue;
        }

        let value = match access::resolve(record, descriptor, ctx.addressable) {
            Ok(Some(value)) => value,
            // A nil pointer on the embedding path: the subtree is absent.
            Ok(None) => continue,
            Err(err) => {
                if descriptor.required {
                    return Err(err);
                }
                tracing::debug!(field = %descriptor.name, error = %err, "skipping unreadable field");
                continue;
            }
        };

        match convert::convert(value, &dest.value_type, ctx) {
            Ok(converted) => dest.set(descriptor.dest_key.clone(), converted),
            // Cycles and nested required failures are never masked.
            Err(err)
                if matches!(
                    err.kind(),
                    CopyErrorKind::CycleDetected | CopyErrorKind::FieldRequireCopying
                ) =>
            {
                return Err(err);
            }
            Err(err) => {
                if descriptor.required {
                    return Err(CopyError::require_copying(descriptor.name.clone(), err));
                }
                // Encapsulated fields are copied best-effort even in strict
                // mode; visible fields fail the call unless tolerated.
                if ctx.options.ignores_non_copyable()
                    || descriptor.visibility == FieldVisibility::Encapsulated
                {
                    tracing::debug!(field = %descriptor.name, error = %err, "skipping non-copyable field");
                    continue;
                }
                return Err(err);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recmap_api::schema::{FieldSchema, RecordDescriptor, TypeSpec};
    use recmap_api::value::Value;

    use super::*;

    #[test]
    fn source_addressability() {
        let d = RecordDescriptor::new("S", vec![FieldSchema::new("I", TypeSpec::int64())]);
        let record = RecordValue::new(d, vec![Value::I64(1)]);
        assert!(Source::from(&record).is_addressable());
        assert!(!Source::from(record).is_addressable());
    }

    #[test]
    fn destination_is_allocated_even_when_no_field_copies() {
        let d = RecordDescriptor::new("S", vec![]);
        let record = RecordValue::new(d, vec![]);
        let mut dest = MapValue::nil(TypeSpec::Str, TypeSpec::int64());
        copy(&mut dest, &record).unwrap();
        assert!(!dest.is_nil());
        assert!(dest.is_empty());
    }

    #[test]
    fn strict_mode_leaves_a_bad_destination_nil() {
        let d = RecordDescriptor::new("S", vec![FieldSchema::new("I", TypeSpec::int64())]);
        let record = RecordValue::new(d, vec![Value::I64(1)]);
        let mut dest = MapValue::nil(TypeSpec::int64(), TypeSpec::int64());
        let err = copy(&mut dest, &record).unwrap_err();
        assert_eq!(err.kind(), CopyErrorKind::TypeNonCopyable);
        assert!(dest.is_nil());
    }
}
