use recmap_api::error::CopyError;
use recmap_api::schema::FieldVisibility;
use recmap_api::value::{RecordValue, Value};

use crate::enumerate::FieldDescriptor;

/// Resolve a field descriptor against a source record value.
///
/// Returns `Ok(None)` when an embedding step on the path goes through a nil
/// pointer — the field is simply absent, not an error. Encapsulated fields
/// are readable only from an addressable (by-reference) source.
pub(crate) fn resolve<'a>(
    source: &'a RecordValue,
    descriptor: &FieldDescriptor,
    addressable: bool,
) -> Result<Option<&'a Value>, CopyError> {
    if descriptor.visibility == FieldVisibility::Encapsulated && !addressable {
        return Err(CopyError::unaddressable(descriptor.name.clone()));
    }

    let mut record = source;
    let last = descriptor.path.len() - 1;
    for (step, &index) in descriptor.path.iter().enumerate() {
        let value = record.field(index).ok_or_else(|| {
            CopyError::non_copyable(format!(
                "record '{}' value arity does not match its descriptor",
                record.descriptor.name
            ))
        })?;

        if step == last {
            return Ok(Some(value));
        }

        // Descend into the embedded record, through a pointer if declared so.
        record = match value {
            Value::Record(inner) => inner,
            Value::Ptr(Some(target)) => match target.as_ref() {
                Value::Record(inner) => inner,
                other => {
                    return Err(CopyError::non_copyable(format!(
                        "embedded field '{}' points at a {}, not a record",
                        descriptor.name,
                        other.kind_name()
                    )))
                }
            },
            Value::Ptr(None) => return Ok(None),
            other => {
                return Err(CopyError::non_copyable(format!(
                    "embedded field '{}' resolved through a {}, not a record",
                    descriptor.name,
                    other.kind_name()
                )))
            }
        };
    }

    unreachable!("descriptor paths are never empty")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recmap_api::error::CopyErrorKind;
    use recmap_api::schema::{FieldSchema, RecordDescriptor, TypeSpec};

    use super::*;
    use crate::enumerate::flatten;

    fn nested_source(inner_ptr: Option<Value>) -> (RecordValue, Vec<FieldDescriptor>) {
        let ss3 = RecordDescriptor::new(
            "SS3",
            vec![FieldSchema::new("I", TypeSpec::int64()).with_annotation("i")],
        );
        let ss2 = RecordDescriptor::new(
            "SS2",
            vec![FieldSchema::new("SS3", TypeSpec::ptr(TypeSpec::Record(ss3))).embedded()],
        );
        let ss = RecordDescriptor::new(
            "SS",
            vec![FieldSchema::new("SS2", TypeSpec::Record(ss2.clone())).embedded()],
        );
        let plan = flatten(&ss);
        let ss2_value = RecordValue::new(ss2, vec![inner_ptr.unwrap_or(Value::Ptr(None))]);
        let source = RecordValue::new(ss, vec![Value::Record(ss2_value)]);
        (source, plan)
    }

    #[test]
    fn resolves_through_embedded_pointer() {
        let ss3 = RecordDescriptor::new(
            "SS3",
            vec![FieldSchema::new("I", TypeSpec::int64()).with_annotation("i")],
        );
        let inner = Value::ptr(Value::Record(RecordValue::new(ss3, vec![Value::I64(42)])));
        let (source, plan) = nested_source(Some(inner));
        let got = resolve(&source, &plan[0], false).unwrap();
        assert_eq!(got, Some(&Value::I64(42)));
    }

    #[test]
    fn nil_pointer_on_the_path_means_absent() {
        let (source, plan) = nested_source(None);
        assert_eq!(resolve(&source, &plan[0], false).unwrap(), None);
    }

    #[test]
    fn encapsulated_field_needs_addressable_source() {
        let d = RecordDescriptor::new(
            "SS",
            vec![FieldSchema::new("u", TypeSpec::uint64()).encapsulated()],
        );
        let plan = flatten(&d);
        let source = RecordValue::new(d, vec![Value::U64(2)]);

        let err = resolve(&source, &plan[0], false).unwrap_err();
        assert_eq!(err.kind(), CopyErrorKind::ValueUnaddressable);

        let got = resolve(&source, &plan[0], true).unwrap();
        assert_eq!(got, Some(&Value::U64(2)));
    }
}
