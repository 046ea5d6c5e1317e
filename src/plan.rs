//! Schema-driven plan computation.
//!
//! Turns the host's proposed new state into a planned state by applying the
//! schema's plan modifiers, then derives the requires-replace paths and the
//! change list. Handler-specific plan rewrites run between [`plan_attributes`]
//! and [`requires_replace`] so their effects are reflected in both.

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::types::AttributeChange;
use crate::value::{is_unknown, unknown};

fn field<'a>(object: Option<&'a Value>, name: &str) -> &'a Value {
    object.and_then(|o| o.get(name)).unwrap_or(&Value::Null)
}

/// Whether any attribute the configuration controls differs from prior state.
fn configured_change(schema: &Schema, prior: &Value, planned: &Map<String, Value>, config: &Value) -> bool {
    schema.attributes().any(|(name, attr)| {
        let configured = !field(Some(config), name).is_null();
        if attr.flags.computed && !configured && attr.default_value().is_none() {
            return false;
        }
        planned.get(name).unwrap_or(&Value::Null) != field(Some(prior), name)
    })
}

/// Apply defaults, unknown marking and UseStateForUnknown.
///
/// On create every computed attribute the configuration leaves null becomes
/// unknown. On update those attributes keep their prior value when nothing
/// configured changed or when they carry UseStateForUnknown; otherwise they
/// become unknown so the host does not compare them.
pub fn plan_attributes(schema: &Schema, prior: Option<&Value>, proposed: &Value, config: &Value) -> Value {
    let mut planned = Map::new();

    for (name, attr) in schema.attributes() {
        let config_value = field(Some(config), name);
        let mut value = field(Some(proposed), name).clone();

        if config_value.is_null() {
            if let Some(default) = attr.default_value() {
                value = default.clone();
            } else if attr.flags.computed {
                value = Value::Null;
            }
        }
        planned.insert(name.clone(), value);
    }

    let prior = prior.filter(|p| !p.is_null());
    let changed = prior.map_or(true, |p| configured_change(schema, p, &planned, config));

    for (name, attr) in schema.attributes() {
        let configured = !field(Some(config), name).is_null();
        if !attr.flags.computed || configured || attr.default_value().is_some() {
            continue;
        }
        let prior_value = field(prior, name);
        let value = match prior {
            None => unknown(),
            Some(_) if attr.uses_state_for_unknown() && !prior_value.is_null() => prior_value.clone(),
            Some(_) if !changed => prior_value.clone(),
            Some(_) => unknown(),
        };
        planned.insert(name.clone(), value);
    }

    Value::Object(planned)
}

/// Attribute paths whose planned value differs from prior state and whose
/// schema marks them RequiresReplace.
pub fn requires_replace(schema: &Schema, prior: &Value, planned: &Value) -> Vec<String> {
    if prior.is_null() || planned.is_null() {
        return Vec::new();
    }
    schema
        .attributes()
        .filter(|(_, attr)| attr.requires_replace())
        .filter(|(name, _)| field(Some(planned), name) != field(Some(prior), name))
        .map(|(name, _)| name.clone())
        .collect()
}

/// The per-attribute change list between prior state and plan.
///
/// Values of sensitive attributes are never included.
pub fn changes(schema: &Schema, prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
    let planned = (!planned.is_null()).then_some(planned);

    schema
        .attributes()
        .filter_map(|(name, attr)| {
            let before = field(prior, name);
            let after = field(planned, name);
            if before == after {
                return None;
            }
            if attr.flags.sensitive {
                return Some(AttributeChange::redacted(name.as_str()));
            }
            Some(match (before.is_null(), after.is_null()) {
                (true, _) => AttributeChange::added(name.as_str(), after.clone()),
                (false, true) => AttributeChange::removed(name.as_str(), before.clone()),
                (false, false) => AttributeChange::modified(name.as_str(), before.clone(), after.clone()),
            })
        })
        .collect()
}

/// Mark `attributes` unknown in a planned object.
pub fn mark_unknown(planned: &mut Value, attributes: &[&str]) {
    if let Value::Object(map) = planned {
        for name in attributes {
            map.insert((*name).to_string(), unknown());
        }
    }
}

/// Whether a planned attribute is still unknown.
pub fn is_planned_unknown(planned: &Value, name: &str) -> bool {
    is_unknown(field(Some(planned), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use crate::value::UNKNOWN_VALUE;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("profile_id", Attribute::required_string().with_requires_replace())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("is_active", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("updated_at", Attribute::computed_string())
            .with_attribute("password", Attribute::optional_string().sensitive())
    }

    #[test]
    fn test_create_marks_computed_unknown_and_applies_default() {
        let config = json!({"profile_id": "p", "name": "n"});
        let planned = plan_attributes(&schema(), None, &config, &config);

        assert_eq!(planned["id"], json!(UNKNOWN_VALUE));
        assert_eq!(planned["updated_at"], json!(UNKNOWN_VALUE));
        assert_eq!(planned["is_active"], json!(true));
        assert_eq!(planned["name"], json!("n"));
        assert_eq!(planned["password"], Value::Null);
    }

    #[test]
    fn test_update_without_changes_keeps_prior() {
        let prior = json!({
            "id": "x", "profile_id": "p", "name": "n", "is_active": true,
            "updated_at": "t1", "password": null,
        });
        let config = json!({"profile_id": "p", "name": "n"});
        let planned = plan_attributes(&schema(), Some(&prior), &prior, &config);

        assert_eq!(planned, prior);
        assert!(changes(&schema(), Some(&prior), &planned).is_empty());
        assert!(requires_replace(&schema(), &prior, &planned).is_empty());
    }

    #[test]
    fn test_update_with_changes_uses_state_for_unknown() {
        let prior = json!({
            "id": "x", "profile_id": "p", "name": "n", "is_active": true,
            "updated_at": "t1", "password": null,
        });
        let config = json!({"profile_id": "p", "name": "renamed"});
        let mut proposed = prior.clone();
        proposed["name"] = json!("renamed");

        let planned = plan_attributes(&schema(), Some(&prior), &proposed, &config);

        assert_eq!(planned["id"], json!("x"));
        assert_eq!(planned["updated_at"], json!(UNKNOWN_VALUE));
        assert!(is_planned_unknown(&planned, "updated_at"));

        let changed: Vec<_> = changes(&schema(), Some(&prior), &planned)
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(changed, vec!["name".to_string(), "updated_at".to_string()]);
    }

    #[test]
    fn test_requires_replace_paths() {
        let prior = json!({"id": "x", "profile_id": "p1", "name": "n"});
        let planned = json!({"id": "x", "profile_id": "p2", "name": "n"});
        assert_eq!(requires_replace(&schema(), &prior, &planned), vec!["profile_id".to_string()]);
        assert!(requires_replace(&schema(), &Value::Null, &planned).is_empty());
    }

    #[test]
    fn test_sensitive_changes_are_redacted() {
        let prior = json!({"password": "old"});
        let planned = json!({"password": "new"});
        let diff = changes(&schema(), Some(&prior), &planned);
        assert_eq!(diff, vec![AttributeChange::redacted("password")]);
    }

    #[test]
    fn test_destroy_lists_removed_attributes() {
        let prior = json!({"id": "x", "name": "n"});
        let diff = changes(&schema(), Some(&prior), &Value::Null);
        assert_eq!(diff.len(), 2);
        assert!(diff.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_mark_unknown() {
        let mut planned = json!({"id": "x", "version": 1});
        mark_unknown(&mut planned, &["id", "version"]);
        assert_eq!(planned, json!({"id": UNKNOWN_VALUE, "version": UNKNOWN_VALUE}));
    }
}
