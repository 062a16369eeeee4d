use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::schema::RecordDescriptor;

/// Process-wide registry of record descriptors by type name.
///
/// `TypeSpec::RecordRef` resolves against this registry, which is what lets
/// a record type reference itself (directly or transitively through
/// pointers). Descriptors are read-only after registration, so concurrent
/// reads need no coordination beyond the lock.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: RwLock<HashMap<String, Arc<RecordDescriptor>>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide registry.
    pub fn global() -> &'static DescriptorRegistry {
        static GLOBAL: OnceLock<DescriptorRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DescriptorRegistry::new)
    }

    /// Register a descriptor under its own name, replacing any previous
    /// registration of that name.
    pub fn register(&self, descriptor: Arc<RecordDescriptor>) {
        let mut guard = match self.descriptors.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("descriptor registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<RecordDescriptor>> {
        let guard = match self.descriptors.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("descriptor registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{FieldSchema, TypeSpec};

    use super::*;

    #[test]
    fn register_and_resolve() {
        let registry = DescriptorRegistry::new();
        assert!(!registry.contains("RegNode"));

        let d = RecordDescriptor::new(
            "RegNode",
            vec![FieldSchema::new("Next", TypeSpec::ptr(TypeSpec::record_ref("RegNode")))],
        );
        registry.register(d.clone());
        let got = registry.get("RegNode").expect("registered");
        assert!(Arc::ptr_eq(&got, &d));
    }

    #[test]
    fn re_registration_replaces() {
        let registry = DescriptorRegistry::new();
        let a = RecordDescriptor::new("RegDup", vec![FieldSchema::new("A", TypeSpec::int64())]);
        let b = RecordDescriptor::new("RegDup", vec![FieldSchema::new("B", TypeSpec::Str)]);
        registry.register(a);
        registry.register(b.clone());
        assert!(Arc::ptr_eq(&registry.get("RegDup").unwrap(), &b));
    }
}
