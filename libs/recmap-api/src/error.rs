/// Error kind discriminant, for caller comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyErrorKind {
    TypeNonCopyable,
    FieldRequireCopying,
    ValueUnaddressable,
    CycleDetected,
}

/// Copy failure — returned synchronously from the copy entry points.
///
/// Non-required fields that fail under the tolerant configuration are
/// silently omitted and never reported; the caller owns all user-facing
/// reporting.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// A value's type cannot be converted to the required destination type,
    /// or the destination mapping's key type is not string-representable.
    #[error("type is not copyable: {detail}")]
    TypeNonCopyable { detail: String },

    /// A field marked `required` could not be copied, overriding the
    /// tolerant mode. Wraps the underlying cause.
    #[error("field '{field}' requires copying: {source}")]
    FieldRequireCopying {
        field: String,
        #[source]
        source: Box<CopyError>,
    },

    /// An encapsulated field could not be read because the source value was
    /// not backed by an addressable location (passed by value).
    #[error("value is not addressable: encapsulated field '{field}' needs a by-reference source")]
    ValueUnaddressable { field: String },

    /// A value still being converted was reached again. Never masked by the
    /// tolerant mode.
    #[error("cycle detected while copying '{type_name}'")]
    CycleDetected { type_name: String },
}

impl CopyError {
    pub fn non_copyable(detail: impl Into<String>) -> Self {
        CopyError::TypeNonCopyable {
            detail: detail.into(),
        }
    }

    pub fn unaddressable(field: impl Into<String>) -> Self {
        CopyError::ValueUnaddressable {
            field: field.into(),
        }
    }

    pub fn require_copying(field: impl Into<String>, cause: CopyError) -> Self {
        CopyError::FieldRequireCopying {
            field: field.into(),
            source: Box::new(cause),
        }
    }

    pub fn cycle(type_name: impl Into<String>) -> Self {
        CopyError::CycleDetected {
            type_name: type_name.into(),
        }
    }

    pub fn kind(&self) -> CopyErrorKind {
        match self {
            CopyError::TypeNonCopyable { .. } => CopyErrorKind::TypeNonCopyable,
            CopyError::FieldRequireCopying { .. } => CopyErrorKind::FieldRequireCopying,
            CopyError::ValueUnaddressable { .. } => CopyErrorKind::ValueUnaddressable,
            CopyError::CycleDetected { .. } => CopyErrorKind::CycleDetected,
        }
    }

    /// Whether this error, or any wrapped cause, has the given kind.
    pub fn is(&self, kind: CopyErrorKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        match self {
            CopyError::FieldRequireCopying { source, .. } => source.is(kind),
            _ => false,
        }
    }

    /// The name of the offending field, if the failure is attributable to
    /// one.
    pub fn field(&self) -> Option<&str> {
        match self {
            CopyError::FieldRequireCopying { field, .. }
            | CopyError::ValueUnaddressable { field } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_comparison_walks_the_wrap_chain() {
        let err = CopyError::require_copying("P", CopyError::non_copyable("opaque RawHandle"));
        assert_eq!(err.kind(), CopyErrorKind::FieldRequireCopying);
        assert!(err.is(CopyErrorKind::FieldRequireCopying));
        assert!(err.is(CopyErrorKind::TypeNonCopyable));
        assert!(!err.is(CopyErrorKind::ValueUnaddressable));
        assert_eq!(err.field(), Some("P"));
    }

    #[test]
    fn display_includes_the_cause() {
        let err = CopyError::require_copying("P", CopyError::non_copyable("cannot convert"));
        let msg = err.to_string();
        assert!(msg.contains("field 'P'"), "{msg}");
        assert!(msg.contains("cannot convert"), "{msg}");
    }
}
