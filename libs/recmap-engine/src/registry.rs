use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use recmap_api::schema::RecordDescriptor;

use crate::enumerate::{self, FieldDescriptor};

/// Process-wide cache of flattened field plans, one per concrete record
/// descriptor. Entries are read-only after insertion, so concurrent copies
/// share plans without rebuilding them.
///
/// Keyed by descriptor address; the held `Arc` keeps the address stable for
/// the lifetime of the entry.
#[derive(Debug, Default)]
pub struct PlanRegistry {
    plans: RwLock<HashMap<usize, PlanEntry>>,
}

#[derive(Debug)]
struct PlanEntry {
    _descriptor: Arc<RecordDescriptor>,
    plan: Arc<[FieldDescriptor]>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide registry.
    pub fn global() -> &'static PlanRegistry {
        static GLOBAL: OnceLock<PlanRegistry> = OnceLock::new();
        GLOBAL.get_or_init(PlanRegistry::new)
    }

    /// The flattened field plan for `descriptor`, built on first use.
    pub fn plan_for(&self, descriptor: &Arc<RecordDescriptor>) -> Arc<[FieldDescriptor]> {
        let key = Arc::as_ptr(descriptor) as usize;

        {
            let guard = match self.plans.read() {
                Ok(g) => g,
                Err(poisoned) => {
                    tracing::warn!("plan registry read lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            if let Some(entry) = guard.get(&key) {
                return entry.plan.clone();
            }
        }

        let plan: Arc<[FieldDescriptor]> = enumerate::flatten(descriptor).into();

        let mut guard = match self.plans.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("plan registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        // A racing writer may have inserted meanwhile; keep its entry.
        let entry = guard.entry(key).or_insert(PlanEntry {
            _descriptor: descriptor.clone(),
            plan,
        });
        entry.plan.clone()
    }

    pub fn len(&self) -> usize {
        let guard = match self.plans.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("plan registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use recmap_api::schema::{FieldSchema, TypeSpec};

    use super::*;

    #[test]
    fn plan_is_built_once_per_descriptor() {
        let registry = PlanRegistry::new();
        let d = RecordDescriptor::new(
            "SS",
            vec![FieldSchema::new("I", TypeSpec::int64()).with_annotation("i")],
        );

        let first = registry.plan_for(&d);
        let second = registry.plan_for(&d);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(first[0].dest_key, "i");
    }

    #[test]
    fn distinct_descriptors_get_distinct_plans() {
        let registry = PlanRegistry::new();
        let a = RecordDescriptor::new("A", vec![FieldSchema::new("X", TypeSpec::int64())]);
        let b = RecordDescriptor::new("B", vec![FieldSchema::new("Y", TypeSpec::int64())]);
        let pa = registry.plan_for(&a);
        let pb = registry.plan_for(&b);
        assert_eq!(registry.len(), 2);
        assert_eq!(pa[0].dest_key, "X");
        assert_eq!(pb[0].dest_key, "Y");
    }
}
