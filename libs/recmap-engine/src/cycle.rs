use std::collections::HashSet;
use std::sync::Arc;

use recmap_api::error::CopyError;
use recmap_api::value::{RecordValue, Value};

/// Identities of values currently being converted.
///
/// Created at the start of one top-level copy call and discarded at its end,
/// never shared across calls. A key is registered before descending into a
/// pointer target or record value and removed when that descent completes,
/// so diamond-shaped sharing (the same target reached twice sequentially)
/// is not a cycle — only a revisit of an in-progress key is.
#[derive(Debug, Default)]
pub(crate) struct VisitedSet {
    active: HashSet<usize>,
}

impl VisitedSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register an identity. Fails fast when it is already in progress.
    pub(crate) fn enter(&mut self, key: usize, type_name: &str) -> Result<(), CopyError> {
        if !self.active.insert(key) {
            return Err(CopyError::cycle(type_name));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self, key: usize) {
        self.active.remove(&key);
    }
}

/// Stable identity of a pointer target.
pub(crate) fn ptr_identity(target: &Arc<Value>) -> usize {
    Arc::as_ptr(target) as usize
}

/// Stable identity of a record value for the duration of a borrow.
pub(crate) fn record_identity(record: &RecordValue) -> usize {
    record as *const RecordValue as usize
}

#[cfg(test)]
mod tests {
    use recmap_api::error::CopyErrorKind;

    use super::*;

    #[test]
    fn revisiting_an_in_progress_key_is_a_cycle() {
        let mut visited = VisitedSet::new();
        visited.enter(1, "SS").unwrap();
        let err = visited.enter(1, "SS").unwrap_err();
        assert_eq!(err.kind(), CopyErrorKind::CycleDetected);
    }

    #[test]
    fn left_keys_can_be_entered_again() {
        let mut visited = VisitedSet::new();
        visited.enter(1, "SS").unwrap();
        visited.leave(1);
        visited.enter(1, "SS").unwrap();
    }

    #[test]
    fn distinct_keys_nest_freely() {
        let mut visited = VisitedSet::new();
        visited.enter(1, "SS").unwrap();
        visited.enter(2, "SS").unwrap();
        visited.enter(3, "SS").unwrap();
    }

    #[test]
    fn shared_pointer_targets_have_one_identity() {
        let target = Arc::new(Value::I64(1));
        let other = Arc::new(Value::I64(1));
        assert_eq!(ptr_identity(&target), ptr_identity(&target.clone()));
        assert_ne!(ptr_identity(&target), ptr_identity(&other));
    }
}
