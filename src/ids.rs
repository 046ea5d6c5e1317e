//! Identifier parsing and composite identifiers.
//!
//! Every stored UUID is parsed before the first remote call of an operation.
//! A parse failure is an attribute-pinned error and leaves state untouched.

use std::fmt;

use uuid::Uuid;

use crate::schema::Diagnostic;
use crate::value::AttrValue;

/// Parse a UUID held by `attribute`.
pub fn parse_uuid(attribute: &str, raw: &str) -> Result<Uuid, Diagnostic> {
    Uuid::parse_str(raw).map_err(|e| {
        Diagnostic::attribute_error(
            attribute,
            "Invalid ID",
            format!("Unable to parse {} '{}' as a UUID: {}", attribute, raw, e),
        )
    })
}

/// Parse a required UUID attribute, rejecting null and unknown values.
pub fn require_uuid(attribute: &str, value: &AttrValue<String>) -> Result<Uuid, Diagnostic> {
    match value {
        AttrValue::Known(raw) => parse_uuid(attribute, raw),
        AttrValue::Unknown => Err(Diagnostic::attribute_error(
            attribute,
            "Invalid ID",
            format!("{} is not known yet", attribute),
        )),
        AttrValue::Null => Err(Diagnostic::attribute_error(
            attribute,
            "Invalid ID",
            format!("{} is not set", attribute),
        )),
    }
}

/// Parse an optional UUID attribute. Null and unknown yield `None`.
pub fn optional_uuid(attribute: &str, value: &AttrValue<String>) -> Result<Option<Uuid>, Diagnostic> {
    match value {
        AttrValue::Known(raw) => parse_uuid(attribute, raw).map(Some),
        _ => Ok(None),
    }
}

/// A two-part identifier for relationship resources, e.g. `team_id/mapping_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    /// Parent-side key.
    pub first: String,
    /// Child-side key.
    pub second: String,
    separator: char,
}

impl CompositeId {
    /// Build a composite id joined with `separator`.
    pub fn new(first: impl Into<String>, second: impl Into<String>, separator: char) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            separator,
        }
    }

    /// Parse `a<sep>b` where `<sep>` is any of `separators`.
    ///
    /// `parts` names the two halves for the error message, e.g.
    /// `("profile_id", "tool_id")`.
    pub fn parse(raw: &str, separators: &[char], parts: (&str, &str)) -> Result<Self, Diagnostic> {
        let invalid = || {
            let forms: Vec<String> = separators
                .iter()
                .map(|sep| format!("{}{}{}", parts.0, sep, parts.1))
                .collect();
            Diagnostic::error("Invalid Import ID").with_detail(format!(
                "Expected import identifier in the format {}, got: '{}'",
                forms.join(" or "),
                raw
            ))
        };

        let separator = separators
            .iter()
            .copied()
            .find(|sep| raw.contains(*sep))
            .ok_or_else(invalid)?;
        let mut split = raw.splitn(2, separator);
        let first = split.next().unwrap_or_default();
        let second = split.next().unwrap_or_default();
        if first.is_empty() || second.is_empty() || second.contains(separators) {
            return Err(invalid());
        }
        Ok(Self::new(first, second, separator))
    }

    /// Parse and require both halves to be UUIDs.
    pub fn parse_uuids(
        raw: &str,
        separators: &[char],
        parts: (&str, &str),
    ) -> Result<(Self, Uuid, Uuid), Diagnostic> {
        let id = Self::parse(raw, separators, parts)?;
        let first = parse_uuid(parts.0, &id.first)?;
        let second = parse_uuid(parts.1, &id.second)?;
        Ok((id, first, second))
    }

    /// The canonical delimited form.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, self.separator, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = "550e8400-e29b-41d4-a716-446655440000";
    const TOOL: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

    #[test]
    fn test_parse_uuid_pins_attribute() {
        let err = parse_uuid("profile_id", "not-a-uuid").unwrap_err();
        assert_eq!(err.summary, "Invalid ID");
        assert_eq!(err.attribute.as_deref(), Some("profile_id"));
    }

    #[test]
    fn test_require_uuid_rejects_null_and_unknown() {
        assert!(require_uuid("id", &AttrValue::Null).is_err());
        assert!(require_uuid("id", &AttrValue::Unknown).is_err());
        assert!(require_uuid("id", &AttrValue::string(PROFILE)).is_ok());
        assert_eq!(optional_uuid("id", &AttrValue::Null).unwrap(), None);
    }

    #[test]
    fn test_composite_parses_either_separator() {
        let colon = format!("{}:{}", PROFILE, TOOL);
        let (id, profile, tool) =
            CompositeId::parse_uuids(&colon, &[':', '/'], ("profile_id", "tool_id")).unwrap();
        assert_eq!(profile.to_string(), PROFILE);
        assert_eq!(tool.to_string(), TOOL);
        assert_eq!(id.encode(), colon);

        let slash = format!("{}/{}", PROFILE, TOOL);
        let id = CompositeId::parse(&slash, &[':', '/'], ("profile_id", "tool_id")).unwrap();
        assert_eq!(id.first, PROFILE);
        assert_eq!(id.second, TOOL);
    }

    #[test]
    fn test_composite_rejects_malformed() {
        for raw in ["", "only-one-part", ":b", "a:", "a:b:c"] {
            let err = CompositeId::parse(raw, &[':'], ("a", "b")).unwrap_err();
            assert_eq!(err.summary, "Invalid Import ID", "input {:?}", raw);
        }
    }

    #[test]
    fn test_composite_validates_sub_keys_before_use() {
        let err = CompositeId::parse_uuids("abc:def", &[':'], ("profile_id", "tool_id")).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("profile_id"));
    }
}
