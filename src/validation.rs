//! Configuration validation.
//!
//! Validates a host configuration object against a [`Schema`] before any
//! remote call is made: structure and types first, then per-attribute
//! [`Validator`]s, then the schema's cross-attribute [`ConfigValidator`]s.
//! Unknown values are accepted everywhere and skipped by value checks; they
//! are re-validated once the host knows them.
//!
//! # Example
//!
//! ```
//! use archestra_provider::schema::{Schema, Attribute};
//! use archestra_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("threshold", Attribute::optional_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "team-budget", "threshold": 100}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "team-budget", "threshold": "lots"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("threshold".to_string()));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::{Attribute, AttributeType, ConfigValidator, Diagnostic, Schema, Validator};
use crate::value::is_unknown;

/// Validate a configuration object against a schema.
///
/// Returns every diagnostic found; an empty list means the configuration is
/// valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes must not be configured
/// - Attributes the schema does not declare are rejected
/// - Attribute types must match the schema
/// - Attribute validators run on known values
/// - Cross-attribute validators run last
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(other))),
            );
            return diagnostics;
        }
    };

    for name in obj.keys() {
        if schema.attribute(name).is_none() {
            diagnostics.push(Diagnostic::attribute_error(
                name.as_str(),
                "Unsupported Argument",
                format!("An argument named \"{}\" is not expected here.", name),
            ));
        }
    }

    for (name, attr) in schema.attributes() {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for validator in &schema.config_validators {
        validate_combination(validator, obj, &mut diagnostics);
    }

    diagnostics
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let computed_only = attr.flags.computed && !attr.flags.optional && !attr.flags.required;

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(Diagnostic::attribute_error(
                    path,
                    "Missing Required Attribute",
                    format!(
                        "The argument \"{}\" is required, but no definition was found.",
                        path
                    ),
                ));
            }
        }
        Some(v) if computed_only => {
            if !is_unknown(v) {
                diagnostics.push(Diagnostic::attribute_error(
                    path,
                    "Invalid Configuration for Read-Only Attribute",
                    format!(
                        "Cannot set value for attribute \"{}\": it is computed by the provider.",
                        path
                    ),
                ));
            }
        }
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                for validator in &attr.validators {
                    validate_value(validator, v, path, diagnostics);
                }
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if is_unknown(value) || value.is_null() {
        return;
    }

    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        }
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
        AttributeType::Object(attrs) => {
            if let Some(obj) = value.as_object() {
                validate_object_type(attrs, obj, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        }
    }
}

fn validate_object_type(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, value) in obj {
        let attr_path = format!("{}.{}", path, name);
        match attrs.get(name) {
            Some(attr_type) => validate_attribute_type(attr_type, value, &attr_path, diagnostics),
            None => diagnostics.push(Diagnostic::attribute_error(
                attr_path,
                "Unsupported Argument",
                format!("An attribute named \"{}\" is not expected here.", name),
            )),
        }
    }
}

fn validate_value(validator: &Validator, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if is_unknown(value) {
        return;
    }

    match validator {
        Validator::OneOf(allowed) => {
            // Lists of enumerated strings are checked element by element.
            if let Some(items) = value.as_array() {
                for (i, item) in items.iter().enumerate() {
                    validate_value(validator, item, &format!("{}.{}", path, i), diagnostics);
                }
                return;
            }
            if let Some(s) = value.as_str() {
                if !allowed.contains(&s) {
                    let quoted: Vec<String> = allowed.iter().map(|a| format!("\"{}\"", a)).collect();
                    diagnostics.push(Diagnostic::attribute_error(
                        path,
                        "Invalid Attribute Value Match",
                        format!(
                            "Attribute {} value must be one of: [{}], got: \"{}\"",
                            path,
                            quoted.join(" "),
                            s
                        ),
                    ));
                }
            }
        }
        Validator::AtLeast(min) => {
            if let Some(n) = value.as_i64() {
                if n < *min {
                    diagnostics.push(Diagnostic::attribute_error(
                        path,
                        "Invalid Attribute Value",
                        format!("Attribute {} value must be at least {}, got: {}", path, min, n),
                    ));
                }
            }
        }
        Validator::Uuid => {
            if let Some(s) = value.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    diagnostics.push(Diagnostic::attribute_error(
                        path,
                        "Invalid Attribute Value",
                        format!("Attribute {} must be a valid UUID, got: \"{}\"", path, s),
                    ));
                }
            }
        }
        Validator::MinItems(min) => {
            if let Some(items) = value.as_array() {
                if items.len() < *min {
                    diagnostics.push(Diagnostic::attribute_error(
                        path,
                        "Invalid Attribute Value",
                        format!(
                            "Attribute {} list must contain at least {} elements, got: {}",
                            path,
                            min,
                            items.len()
                        ),
                    ));
                }
            }
        }
    }
}

/// Presence of a configured value: `None` when null, `Some(None)` when
/// unknown, `Some(Some(v))` when known.
fn presence<'a>(obj: &'a serde_json::Map<String, Value>, name: &str) -> Option<Option<&'a Value>> {
    match obj.get(name) {
        None | Some(Value::Null) => None,
        Some(v) if is_unknown(v) => Some(None),
        Some(v) => Some(Some(v)),
    }
}

fn sibling_is(obj: &serde_json::Map<String, Value>, sibling: &str, expected: &str) -> bool {
    matches!(presence(obj, sibling), Some(Some(Value::String(s))) if s == expected)
}

fn validate_combination(
    validator: &ConfigValidator,
    obj: &serde_json::Map<String, Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match validator {
        ConfigValidator::RequiredWhen {
            attribute,
            sibling,
            value,
        } => {
            if sibling_is(obj, sibling, value) && presence(obj, attribute).is_none() {
                diagnostics.push(Diagnostic::attribute_error(
                    *attribute,
                    "Missing Required Attribute",
                    format!("{} must be set when {} is '{}'", attribute, sibling, value),
                ));
            }
        }
        ConfigValidator::ForbiddenWhen {
            attribute,
            sibling,
            value,
        } => {
            if sibling_is(obj, sibling, value) && presence(obj, attribute).is_some() {
                diagnostics.push(Diagnostic::attribute_error(
                    *attribute,
                    "Invalid Attribute Combination",
                    format!("{} must not be set when {} is '{}'", attribute, sibling, value),
                ));
            }
        }
        ConfigValidator::NonEmptyWhen {
            attribute,
            sibling,
            value,
        } => {
            if !sibling_is(obj, sibling, value) {
                return;
            }
            let empty = match presence(obj, attribute) {
                None => true,
                Some(None) => false,
                Some(Some(v)) => v.as_array().is_some_and(Vec::is_empty),
            };
            if empty {
                diagnostics.push(Diagnostic::attribute_error(
                    *attribute,
                    "Missing Required Attribute",
                    format!(
                        "{} must contain at least one element when {} is '{}'",
                        attribute, sibling, value
                    ),
                ));
            }
        }
        ConfigValidator::ExactlyOneOf(names) => {
            let set: Vec<&str> = names
                .iter()
                .copied()
                .filter(|name| presence(obj, name).is_some())
                .collect();
            let listed = names.join(", ");
            match set.as_slice() {
                [] => diagnostics.push(
                    Diagnostic::error("Invalid Attribute Combination").with_detail(format!(
                        "Exactly one of these attributes must be configured: [{}]",
                        listed
                    )),
                ),
                [_] => {}
                [_, rest @ ..] => {
                    for name in rest {
                        diagnostics.push(Diagnostic::attribute_error(
                            *name,
                            "Invalid Attribute Combination",
                            format!(
                                "Exactly one of these attributes must be configured: [{}]",
                                listed
                            ),
                        ));
                    }
                }
            }
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::attribute_error(
        path,
        format!("Invalid type for attribute '{}'", path),
        format!("Expected {}, got {}", expected, value_type_name(got)),
    )
}
