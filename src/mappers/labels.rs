//! Agent labels.
//!
//! Label order is user-meaningful. The service may return labels in any
//! order, so state is rebuilt in the configuration's key order.

use serde::{Deserialize, Serialize};

use crate::client::models::Label;
use crate::schema::AttributeType;
use crate::value::{order_by_config, AttrValue};

/// One `{key, value}` label in state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelModel {
    /// Label key.
    pub key: String,
    /// Label value.
    pub value: String,
}

/// Attribute type of a label list.
pub fn label_list_type() -> AttributeType {
    AttributeType::list(AttributeType::object([
        ("key", AttributeType::String),
        ("value", AttributeType::String),
    ]))
}

/// Planned labels as a request body. Null and unknown send an empty list.
pub fn to_request(labels: &AttrValue<Vec<LabelModel>>) -> Vec<Label> {
    labels
        .as_known()
        .map(|items| {
            items
                .iter()
                .map(|l| Label {
                    key: l.key.clone(),
                    value: l.value.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Returned labels in state form.
///
/// Without configured labels (import, or labels never set) the response is
/// taken as-is and an empty response stays null. Otherwise the response is
/// remapped into configured key order.
pub fn from_response(configured: &AttrValue<Vec<LabelModel>>, returned: Vec<Label>) -> AttrValue<Vec<LabelModel>> {
    let returned: Vec<LabelModel> = returned
        .into_iter()
        .map(|l| LabelModel {
            key: l.key,
            value: l.value,
        })
        .collect();

    match configured {
        AttrValue::Known(items) if !items.is_empty() => {
            AttrValue::Known(order_by_config(items, returned, |l| l.key.clone()))
        }
        AttrValue::Known(_) => AttrValue::Known(returned),
        _ if returned.is_empty() => AttrValue::Null,
        _ => AttrValue::Known(returned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(key: &str, value: &str) -> LabelModel {
        LabelModel {
            key: key.into(),
            value: value.into(),
        }
    }

    fn wire(key: &str, value: &str) -> Label {
        Label {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_configured_order_wins() {
        let configured = AttrValue::Known(vec![label("team", "eng"), label("env", "test")]);
        let returned = vec![wire("env", "test"), wire("team", "eng")];

        let state = from_response(&configured, returned);
        assert_eq!(state, AttrValue::Known(vec![label("team", "eng"), label("env", "test")]));
    }

    #[test]
    fn test_import_takes_response_order() {
        let state = from_response(&AttrValue::Null, vec![wire("b", "2"), wire("a", "1")]);
        assert_eq!(state, AttrValue::Known(vec![label("b", "2"), label("a", "1")]));

        assert_eq!(from_response(&AttrValue::Null, vec![]), AttrValue::Null);
    }

    #[test]
    fn test_explicit_empty_list_stays_empty() {
        let state = from_response(&AttrValue::Known(vec![]), vec![]);
        assert_eq!(state, AttrValue::Known(vec![]));
    }

    #[test]
    fn test_to_request() {
        assert!(to_request(&AttrValue::Null).is_empty());
        assert_eq!(
            to_request(&AttrValue::Known(vec![label("k", "v")])),
            vec![wire("k", "v")]
        );
    }
}
