//! Prompt state shared by the `prompt` resource and data source.

use serde::{Deserialize, Serialize};

use crate::client::models::Prompt;
use crate::value::AttrValue;

/// State of one prompt version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptModel {
    pub id: AttrValue<String>,
    pub profile_id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub system_prompt: AttrValue<String>,
    pub user_prompt: AttrValue<String>,
    pub is_active: AttrValue<bool>,
    pub version: AttrValue<i64>,
    pub parent_prompt_id: AttrValue<String>,
    pub created_at: AttrValue<String>,
    pub updated_at: AttrValue<String>,
}

impl PromptModel {
    /// Overwrite every read-surfaced field from a response.
    ///
    /// `is_active` and `parent_prompt_id` keep their current value when the
    /// service omits them.
    pub fn apply(&mut self, prompt: &Prompt) {
        self.id = AttrValue::Known(prompt.id.to_string());
        self.profile_id = AttrValue::Known(prompt.agent_id.to_string());
        self.name = AttrValue::Known(prompt.name.clone());
        self.system_prompt = prompt.system_prompt.clone().into();
        self.user_prompt = prompt.user_prompt.clone().into();
        self.is_active = AttrValue::from_response(prompt.is_active)
            .or_prior(self.is_active.clone())
            .resolve_unknown();
        self.version = AttrValue::Known(prompt.version);
        self.parent_prompt_id = AttrValue::from_response(prompt.parent_prompt_id.map(|id| id.to_string()))
            .or_prior(self.parent_prompt_id.clone())
            .resolve_unknown();
        self.created_at = AttrValue::Known(prompt.created_at.clone());
        self.updated_at = AttrValue::Known(prompt.updated_at.clone());
    }

    /// Build state from a response alone.
    pub fn from_prompt(prompt: &Prompt) -> Self {
        let mut model = Self::default();
        model.apply(prompt);
        model
    }

    /// Whether a change between `self` and `other` forces a new version.
    pub fn versioning_change(&self, other: &Self) -> bool {
        self.name != other.name || self.system_prompt != other.system_prompt || self.user_prompt != other.user_prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prompt() -> Prompt {
        serde_json::from_value(json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "agentId": "22222222-2222-2222-2222-222222222222",
            "name": "p1",
            "userPrompt": "u1",
            "version": 1,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn test_apply_maps_fields() {
        let model = PromptModel::from_prompt(&prompt());
        assert_eq!(model.profile_id.as_str(), Some("22222222-2222-2222-2222-222222222222"));
        assert_eq!(model.user_prompt.as_str(), Some("u1"));
        assert!(model.system_prompt.is_null());
        assert!(model.parent_prompt_id.is_null());
        assert_eq!(model.version, AttrValue::Known(1));
    }

    #[test]
    fn test_apply_keeps_unreturned_flags() {
        let mut model = PromptModel {
            is_active: AttrValue::Known(false),
            ..Default::default()
        };
        model.apply(&prompt());
        assert_eq!(model.is_active, AttrValue::Known(false));

        let mut planned = PromptModel {
            is_active: AttrValue::Unknown,
            ..Default::default()
        };
        planned.apply(&prompt());
        assert!(planned.is_active.is_null());
    }

    #[test]
    fn test_versioning_change() {
        let a = PromptModel::from_prompt(&prompt());
        let mut b = a.clone();
        b.is_active = AttrValue::Known(false);
        assert!(!a.versioning_change(&b));

        b.user_prompt = AttrValue::string("u2");
        assert!(a.versioning_change(&b));
    }
}
