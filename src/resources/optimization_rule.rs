//! `archestra_optimization_rule`: routes matching requests to a cheaper
//! model. The service has no single-rule endpoint, so read scans the list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{OptimizationRule, OptimizationRuleRequest, RuleCondition};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::resources::limit::ENTITY_TYPES;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::value::AttrValue;

const LLM_PROVIDERS: &[&str] = &["openai", "anthropic", "gemini"];

/// One trigger condition in state. Exactly one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConditionModel {
    pub max_length: Option<i64>,
    pub has_tools: Option<bool>,
}

impl From<RuleCondition> for RuleConditionModel {
    fn from(condition: RuleCondition) -> Self {
        match condition {
            RuleCondition::MaxLength { max_length } => Self {
                max_length: Some(max_length),
                has_tools: None,
            },
            RuleCondition::HasTools { has_tools } => Self {
                max_length: None,
                has_tools: Some(has_tools),
            },
        }
    }
}

impl RuleConditionModel {
    fn to_request(&self) -> Option<RuleCondition> {
        match (self.max_length, self.has_tools) {
            (Some(max_length), None) => Some(RuleCondition::MaxLength { max_length }),
            (None, Some(has_tools)) => Some(RuleCondition::HasTools { has_tools }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationRuleModel {
    pub id: AttrValue<String>,
    pub entity_type: AttrValue<String>,
    pub entity_id: AttrValue<String>,
    pub llm_provider: AttrValue<String>,
    pub target_model: AttrValue<String>,
    pub enabled: AttrValue<bool>,
    pub conditions: AttrValue<Vec<RuleConditionModel>>,
}

impl OptimizationRuleModel {
    fn apply(&mut self, rule: OptimizationRule) {
        self.id = AttrValue::Known(rule.id.to_string());
        self.entity_type = AttrValue::Known(rule.entity_type);
        self.entity_id = AttrValue::Known(rule.entity_id);
        self.llm_provider = AttrValue::Known(rule.provider);
        self.target_model = AttrValue::Known(rule.target_model);
        self.enabled = AttrValue::Known(rule.enabled);
        self.conditions = AttrValue::Known(rule.conditions.into_iter().map(RuleConditionModel::from).collect());
    }

    fn request(&self) -> OptimizationRuleRequest {
        OptimizationRuleRequest {
            entity_type: self.entity_type.to_request().unwrap_or_default(),
            entity_id: self.entity_id.to_request().unwrap_or_default(),
            provider: self.llm_provider.to_request().unwrap_or_default(),
            target_model: self.target_model.to_request().unwrap_or_default(),
            enabled: self.enabled.to_request().unwrap_or(true),
            conditions: self
                .conditions
                .as_known()
                .map(|items| items.iter().filter_map(RuleConditionModel::to_request).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptimizationRuleResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for OptimizationRuleResource {
    type Model = OptimizationRuleModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_optimization_rule", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages a cost optimization rule.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("entity_type", Attribute::required_string().one_of(ENTITY_TYPES))
            .with_attribute("entity_id", Attribute::required_string())
            .with_attribute(
                "llm_provider",
                Attribute::required_string()
                    .with_description("Provider whose requests the rule applies to")
                    .one_of(LLM_PROVIDERS),
            )
            .with_attribute(
                "target_model",
                Attribute::required_string().with_description("Model matching requests are switched to"),
            )
            .with_attribute("enabled", Attribute::optional_bool().with_default(serde_json::json!(true)))
            .with_attribute(
                "conditions",
                Attribute::new(
                    AttributeType::list(AttributeType::object([
                        ("max_length", AttributeType::Int64),
                        ("has_tools", AttributeType::Bool),
                    ])),
                    AttributeFlags::required(),
                )
                .with_description("Triggers; each sets exactly one of max_length or has_tools"),
            )
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    fn validate(&self, config: &OptimizationRuleModel) -> Vec<Diagnostic> {
        let Some(conditions) = config.conditions.as_known() else {
            return Vec::new();
        };
        conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.to_request().is_none())
            .map(|(i, _)| {
                Diagnostic::attribute_error(
                    format!("conditions.{}", i),
                    "Invalid Attribute Combination",
                    "Each condition must set exactly one of max_length or has_tools",
                )
            })
            .collect()
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: OptimizationRuleModel,
    ) -> Result<OptimizationRuleModel, Diagnostic> {
        let client = self.client.get()?;
        let rule = client
            .create_optimization_rule(ctx, &plan.request())
            .await
            .expect_ok("create optimization rule")?;
        info!(id = %rule.id, target_model = %rule.target_model, "Created optimization rule");
        plan.apply(rule);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: OptimizationRuleModel,
    ) -> Result<Option<OptimizationRuleModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let rules = client
            .list_optimization_rules(ctx)
            .await
            .expect_ok("read optimization rules")?;
        let Some(rule) = rules.into_iter().find(|r| r.id == id) else {
            return Ok(None);
        };
        state.apply(rule);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        prior: OptimizationRuleModel,
        mut plan: OptimizationRuleModel,
    ) -> Result<OptimizationRuleModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let rule = client
            .update_optimization_rule(ctx, id, &plan.request())
            .await
            .expect_ok("update optimization rule")?;
        plan.apply(rule);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: OptimizationRuleModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client
            .delete_optimization_rule(ctx, id)
            .await
            .deleted("delete optimization rule")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<OptimizationRuleModel, Diagnostic> {
        Ok(OptimizationRuleModel {
            id: AttrValue::Known(parse_uuid("id", id)?.to_string()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const RULE: &str = "c0000000-0000-0000-0000-000000000001";

    fn remote() -> serde_json::Value {
        json!({
            "id": RULE,
            "entityType": "organization",
            "entityId": "org-1",
            "provider": "anthropic",
            "targetModel": "claude-3-5-haiku",
            "enabled": true,
            "conditions": [{"maxLength": 1000}, {"hasTools": false}],
        })
    }

    #[tokio::test]
    async fn test_read_scans_rule_list() {
        let mock = MockTransport::new();
        mock.respond(Method::POST, "/api/optimization-rules", 200, remote());
        mock.respond(Method::GET, "/api/optimization-rules", 200, json!([remote()]));
        let tester = configured_tester(&mock).await;

        let config = json!({
            "entity_type": "organization",
            "entity_id": "org-1",
            "llm_provider": "anthropic",
            "target_model": "claude-3-5-haiku",
            "conditions": [{"max_length": 1000, "has_tools": null}, {"max_length": null, "has_tools": false}],
        });
        tester.validate_resource_config("archestra_optimization_rule", config.clone()).await.unwrap();
        let state = tester.lifecycle_create("archestra_optimization_rule", config).await.unwrap();

        assert_eq!(state["enabled"], true);
        assert_eq!(state["conditions"][0]["max_length"], 1000);
        assert!(state["conditions"][0]["has_tools"].is_null());
        assert_eq!(state["conditions"][1]["has_tools"], false);

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["conditions"], json!([{"maxLength": 1000}, {"hasTools": false}]));
        assert_eq!(body["provider"], "anthropic");
    }

    #[tokio::test]
    async fn test_missing_rule_is_drift() {
        let mock = MockTransport::new();
        mock.respond(Method::GET, "/api/optimization-rules", 200, json!([]));
        let tester = configured_tester(&mock).await;

        let state = tester
            .read("archestra_optimization_rule", json!({"id": RULE}))
            .await
            .unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_condition_needs_exactly_one_trigger() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;
        let err = tester
            .validate_resource_config(
                "archestra_optimization_rule",
                json!({
                    "entity_type": "team",
                    "entity_id": "t-1",
                    "llm_provider": "openai",
                    "target_model": "gpt-4o-mini",
                    "conditions": [{"max_length": 10, "has_tools": true}],
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("conditions.0"));
    }
}
