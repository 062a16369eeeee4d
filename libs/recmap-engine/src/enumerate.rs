use std::collections::HashMap;

use recmap_api::policy::FieldPolicy;
use recmap_api::schema::{FieldVisibility, RecordDescriptor, TypeSpec};

/// One field to attempt in a copy, with its resolved policy and the path of
/// field indices through embedded records. Derived once per source record
/// descriptor, immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Declared field name (at its own nesting level).
    pub name: String,
    /// Destination mapping key. Never empty unless `ignored`.
    pub dest_key: String,
    pub required: bool,
    /// Excluded by annotation: the field is never read, never errored on.
    pub ignored: bool,
    pub visibility: FieldVisibility,
    /// Field indices from the top-level record down to the field itself.
    /// Pointer hops along the way are implicit in the field types.
    pub path: Vec<usize>,
}

impl FieldDescriptor {
    /// Embedding depth: 0 for a top-level field.
    fn depth(&self) -> usize {
        self.path.len() - 1
    }
}

/// Produce the ordered, flattened field plan for a record descriptor.
///
/// Embedded record subtrees are expanded depth-first, in place at the
/// position of their embedding field. Name collisions resolve outward: an
/// explicit field at a shallower depth shadows a same-named field reached
/// through deeper embedding, and same-depth collisions drop every candidate
/// for that name.
pub fn flatten(descriptor: &RecordDescriptor) -> Vec<FieldDescriptor> {
    let mut out = Vec::new();
    walk(descriptor, &mut Vec::new(), &mut out);
    resolve_shadowing(out)
}

fn walk(descriptor: &RecordDescriptor, prefix: &mut Vec<usize>, out: &mut Vec<FieldDescriptor>) {
    for (index, field) in descriptor.fields.iter().enumerate() {
        let policy = FieldPolicy::parse(field.annotation());

        prefix.push(index);

        if policy.excluded {
            // The whole subtree of an excluded embedded field is gone too.
            out.push(FieldDescriptor {
                name: field.name.clone(),
                dest_key: String::new(),
                required: false,
                ignored: true,
                visibility: field.visibility,
                path: prefix.clone(),
            });
            prefix.pop();
            continue;
        }

        // A key override turns an embedded field into a regular one.
        if field.embedded && policy.key_override.is_none() {
            if let Some(inner) = embedded_record(&field.field_type) {
                walk(inner, prefix, out);
                prefix.pop();
                continue;
            }
        }

        out.push(FieldDescriptor {
            name: field.name.clone(),
            dest_key: policy.dest_key(&field.name).to_string(),
            required: policy.required,
            ignored: false,
            visibility: field.visibility,
            path: prefix.clone(),
        });
        prefix.pop();
    }
}

/// The record descriptor behind an embeddable field type: a record, or a
/// pointer to a record, possibly behind named wrappers.
fn embedded_record(field_type: &TypeSpec) -> Option<&RecordDescriptor> {
    match field_type.underlying() {
        TypeSpec::Record(d) => Some(d),
        TypeSpec::Ptr(inner) => match inner.underlying() {
            TypeSpec::Record(d) => Some(d),
            _ => None,
        },
        _ => None,
    }
}

/// Keep, for each field name, only the candidates at the shallowest depth;
/// drop the name entirely when that depth is ambiguous. Survivors keep their
/// expansion order.
fn resolve_shadowing(candidates: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    let mut min_depth: HashMap<&str, usize> = HashMap::new();
    let mut at_min: HashMap<&str, usize> = HashMap::new();
    for c in &candidates {
        let d = c.depth();
        match min_depth.get(c.name.as_str()).copied() {
            Some(m) if d > m => {}
            Some(m) if d == m => {
                *at_min.get_mut(c.name.as_str()).unwrap() += 1;
            }
            _ => {
                min_depth.insert(&c.name, d);
                at_min.insert(&c.name, 1);
            }
        }
    }

    candidates
        .iter()
        .filter(|c| {
            min_depth.get(c.name.as_str()) == Some(&c.depth())
                && at_min.get(c.name.as_str()) == Some(&1)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recmap_api::schema::FieldSchema;

    use super::*;

    #[test]
    fn declaration_order_and_policies() {
        let d = RecordDescriptor::new(
            "SS",
            vec![
                FieldSchema::new("I", TypeSpec::int64()).with_annotation("i"),
                FieldSchema::new("U", TypeSpec::uint64()),
                FieldSchema::new("X", TypeSpec::int64()).with_annotation("-"),
                FieldSchema::new("R", TypeSpec::int64()).with_annotation(",required"),
            ],
        );
        let plan = flatten(&d);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].dest_key, "i");
        assert_eq!(plan[1].dest_key, "U");
        assert!(plan[2].ignored);
        assert_eq!(plan[2].dest_key, "");
        assert!(plan[3].required);
        assert_eq!(plan[3].dest_key, "R");
        assert_eq!(plan[1].path, vec![1]);
    }

    #[test]
    fn three_level_embedding_flattens_in_place() {
        let ss3 = RecordDescriptor::new(
            "SS3",
            vec![FieldSchema::new("I", TypeSpec::int64()).with_annotation("i")],
        );
        let ss2 = RecordDescriptor::new(
            "SS2",
            vec![FieldSchema::new("SS3", TypeSpec::Record(ss3)).embedded()],
        );
        let ss = RecordDescriptor::new(
            "SS",
            vec![
                FieldSchema::new("A", TypeSpec::int64()),
                FieldSchema::new("SS2", TypeSpec::Record(ss2)).embedded(),
                FieldSchema::new("Z", TypeSpec::int64()),
            ],
        );
        let plan = flatten(&ss);
        let keys: Vec<&str> = plan.iter().map(|f| f.dest_key.as_str()).collect();
        assert_eq!(keys, vec!["A", "i", "Z"]);
        assert_eq!(plan[1].path, vec![1, 0, 0]);
    }

    #[test]
    fn embedding_through_pointer_flattens() {
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
            vec![FieldSchema::new("SS2", TypeSpec::Record(ss2)).embedded()],
        );
        let plan = flatten(&ss);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].dest_key, "i");
        assert_eq!(plan[0].path, vec![0, 0, 0]);
    }

    #[test]
    fn outer_field_shadows_embedded_one() {
        let inner = RecordDescriptor::new(
            "Inner",
            vec![
                FieldSchema::new("N", TypeSpec::int64()),
                FieldSchema::new("Only", TypeSpec::int64()),
            ],
        );
        let outer = RecordDescriptor::new(
            "Outer",
            vec![
                FieldSchema::new("Inner", TypeSpec::Record(inner)).embedded(),
                FieldSchema::new("N", TypeSpec::int64()),
            ],
        );
        let plan = flatten(&outer);
        let names: Vec<(&str, usize)> =
            plan.iter().map(|f| (f.name.as_str(), f.path.len())).collect();
        // The embedded N is gone; the shallow N survives.
        assert_eq!(names, vec![("Only", 2), ("N", 1)]);
    }

    #[test]
    fn same_depth_collision_drops_both() {
        let a = RecordDescriptor::new("A", vec![FieldSchema::new("N", TypeSpec::int64())]);
        let b = RecordDescriptor::new("B", vec![FieldSchema::new("N", TypeSpec::int64())]);
        let outer = RecordDescriptor::new(
            "Outer",
            vec![
                FieldSchema::new("A", TypeSpec::Record(a)).embedded(),
                FieldSchema::new("B", TypeSpec::Record(b)).embedded(),
            ],
        );
        assert_eq!(flatten(&outer), vec![]);
    }

    #[test]
    fn excluded_embedded_field_removes_subtree() {
        let inner = RecordDescriptor::new(
            "Inner",
            vec![FieldSchema::new("N", TypeSpec::int64())],
        );
        let outer = RecordDescriptor::new(
            "Outer",
            vec![
                FieldSchema::new("Inner", TypeSpec::Record(inner)).embedded().with_annotation("-"),
                FieldSchema::new("M", TypeSpec::int64()),
            ],
        );
        let plan = flatten(&outer);
        let live: Vec<&str> = plan
            .iter()
            .filter(|f| !f.ignored)
            .map(|f| f.dest_key.as_str())
            .collect();
        assert_eq!(live, vec!["M"]);
    }

    #[test]
    fn key_override_stops_embedding() {
        let inner = RecordDescriptor::new(
            "Inner",
            vec![FieldSchema::new("N", TypeSpec::int64())],
        );
        let outer = RecordDescriptor::new(
            "Outer",
            vec![FieldSchema::new("Inner", TypeSpec::Record(inner))
                .embedded()
                .with_annotation("inner")],
        );
        let plan = flatten(&outer);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].dest_key, "inner");
        assert_eq!(plan[0].path, vec![0]);
    }
}
