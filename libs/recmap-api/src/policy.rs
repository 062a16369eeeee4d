/// Field property key carrying the copy annotation string.
pub const ANNOTATION_PROP: &str = "copy";

/// Key-position token that excludes a field entirely.
const EXCLUDE_TOKEN: &str = "-";

/// Flag token: the field's copy must succeed.
const REQUIRED_FLAG: &str = "required";

/// Parsed per-field copy policy.
///
/// Grammar: `<key-override>[,<flag>]*`. The leading token, if non-empty,
/// overrides the destination key; `-` in that position excludes the field.
/// Recognized flags: `required`. Unrecognized flags are ignored, and
/// malformed input degrades to defaults — parsing never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldPolicy {
    pub key_override: Option<String>,
    pub required: bool,
    pub excluded: bool,
}

impl FieldPolicy {
    /// Parse a raw annotation string. Absent or empty metadata yields the
    /// default policy (declared name as key, not required, not excluded).
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        if raw.is_empty() {
            return Self::default();
        }

        let mut tokens = raw.split(',');

        let mut policy = Self::default();
        match tokens.next() {
            // An excluded field short-circuits everything else.
            Some(EXCLUDE_TOKEN) => {
                policy.excluded = true;
                return policy;
            }
            Some("") | None => {}
            Some(key) => policy.key_override = Some(key.to_string()),
        }

        for flag in tokens {
            if flag == REQUIRED_FLAG {
                policy.required = true;
            }
            // Unknown flags are ignored for forward compatibility.
        }

        policy
    }

    /// The destination key for a field declared as `declared_name`.
    pub fn dest_key<'a>(&'a self, declared_name: &'a str) -> &'a str {
        self.key_override.as_deref().unwrap_or(declared_name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn absent_and_empty_yield_defaults() {
        assert_eq!(FieldPolicy::parse(None), FieldPolicy::default());
        assert_eq!(FieldPolicy::parse(Some("")), FieldPolicy::default());
    }

    #[test]
    fn key_override() {
        let p = FieldPolicy::parse(Some("i"));
        assert_eq!(p.key_override.as_deref(), Some("i"));
        assert!(!p.required);
        assert!(!p.excluded);
        assert_eq!(p.dest_key("I"), "i");
    }

    #[test]
    fn empty_key_keeps_declared_name() {
        let p = FieldPolicy::parse(Some(",required"));
        assert_eq!(p.key_override, None);
        assert!(p.required);
        assert_eq!(p.dest_key("U"), "U");
    }

    #[test]
    fn key_and_required_flag() {
        let p = FieldPolicy::parse(Some("u,required"));
        assert_eq!(p.key_override.as_deref(), Some("u"));
        assert!(p.required);
    }

    #[test]
    fn exclude_token_short_circuits_flags() {
        let p = FieldPolicy::parse(Some("-"));
        assert!(p.excluded);
        // Nothing after `-` is interpreted.
        let p = FieldPolicy::parse(Some("-,required"));
        assert!(p.excluded);
        assert!(!p.required);
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let p = FieldPolicy::parse(Some("k,omitempty,required,whatever"));
        assert_eq!(p.key_override.as_deref(), Some("k"));
        assert!(p.required);
    }
}
