//! `archestra_trusted_data_policy` and `archestra_tool_invocation_policy`.
//!
//! Both attach a list of `{key, operator, value}` conditions and an action to
//! an agent tool assignment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{
    PolicyCondition, ToolInvocationPolicy, ToolInvocationPolicyRequest, TrustedDataPolicy, TrustedDataPolicyRequest,
};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

const OPERATORS: &[&str] = &["equal", "notEqual", "contains", "notContains", "startsWith", "endsWith", "regex"];

const TRUSTED_DATA_ACTIONS: &[&str] = &["mark_as_trusted", "block_always", "sanitize_with_dual_llm"];

const TOOL_INVOCATION_ACTIONS: &[&str] = &["allow_when_context_is_untrusted", "block_always"];

fn conditions_attribute() -> Attribute {
    Attribute::new(
        AttributeType::list(AttributeType::object([
            ("key", AttributeType::String),
            ("operator", AttributeType::String),
            ("value", AttributeType::String),
        ])),
        AttributeFlags::required(),
    )
    .with_description("Conditions matched against the tool's arguments or output")
    .with_validator(Validator::MinItems(1))
}

fn agent_tool_id_attribute() -> Attribute {
    Attribute::required_string()
        .with_description("Agent tool assignment the policy applies to")
        .with_requires_replace()
        .with_validator(Validator::Uuid)
}

fn validate_operators(conditions: &AttrValue<Vec<PolicyCondition>>) -> Vec<Diagnostic> {
    let Some(conditions) = conditions.as_known() else {
        return Vec::new();
    };
    conditions
        .iter()
        .enumerate()
        .filter(|(_, c)| !OPERATORS.contains(&c.operator.as_str()))
        .map(|(i, c)| {
            Diagnostic::attribute_error(
                format!("conditions.{}.operator", i),
                "Invalid Attribute Value Match",
                format!("Operator must be one of: [{}], got: \"{}\"", OPERATORS.join(" "), c.operator),
            )
        })
        .collect()
}

// =========================================================================
// Trusted data
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustedDataPolicyModel {
    pub id: AttrValue<String>,
    pub agent_tool_id: AttrValue<String>,
    pub description: AttrValue<String>,
    pub conditions: AttrValue<Vec<PolicyCondition>>,
    pub action: AttrValue<String>,
}

impl TrustedDataPolicyModel {
    fn apply(&mut self, policy: TrustedDataPolicy) {
        self.id = AttrValue::Known(policy.id.to_string());
        self.agent_tool_id = AttrValue::Known(policy.tool_id.to_string());
        self.description = policy.description.into();
        self.conditions = AttrValue::Known(policy.conditions);
        self.action = AttrValue::Known(policy.action);
    }

    fn request(&self) -> Result<TrustedDataPolicyRequest, Diagnostic> {
        Ok(TrustedDataPolicyRequest {
            tool_id: require_uuid("agent_tool_id", &self.agent_tool_id)?,
            description: self.description.to_request(),
            conditions: self.conditions.to_request().unwrap_or_default(),
            action: self.action.to_request().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrustedDataPolicyResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for TrustedDataPolicyResource {
    type Model = TrustedDataPolicyModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_trusted_data_policy", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Decides whether a tool's output is trusted.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("agent_tool_id", agent_tool_id_attribute())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("conditions", conditions_attribute())
            .with_attribute(
                "action",
                Attribute::optional_string()
                    .with_default(serde_json::json!("mark_as_trusted"))
                    .one_of(TRUSTED_DATA_ACTIONS),
            )
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    fn validate(&self, config: &TrustedDataPolicyModel) -> Vec<Diagnostic> {
        validate_operators(&config.conditions)
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: TrustedDataPolicyModel,
    ) -> Result<TrustedDataPolicyModel, Diagnostic> {
        let client = self.client.get()?;
        let policy = client
            .create_trusted_data_policy(ctx, &plan.request()?)
            .await
            .expect_ok("create trusted data policy")?;
        info!(id = %policy.id, action = %policy.action, "Created trusted data policy");
        plan.apply(policy);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: TrustedDataPolicyModel,
    ) -> Result<Option<TrustedDataPolicyModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(policy) = client
            .get_trusted_data_policy(ctx, id)
            .await
            .found("read trusted data policy")?
        else {
            return Ok(None);
        };
        state.apply(policy);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        prior: TrustedDataPolicyModel,
        mut plan: TrustedDataPolicyModel,
    ) -> Result<TrustedDataPolicyModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let policy = client
            .update_trusted_data_policy(ctx, id, &plan.request()?)
            .await
            .expect_ok("update trusted data policy")?;
        plan.apply(policy);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: TrustedDataPolicyModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client
            .delete_trusted_data_policy(ctx, id)
            .await
            .deleted("delete trusted data policy")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<TrustedDataPolicyModel, Diagnostic> {
        Ok(TrustedDataPolicyModel {
            id: AttrValue::Known(parse_uuid("id", id)?.to_string()),
            ..Default::default()
        })
    }
}

// =========================================================================
// Tool invocation
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolInvocationPolicyModel {
    pub id: AttrValue<String>,
    pub agent_tool_id: AttrValue<String>,
    pub conditions: AttrValue<Vec<PolicyCondition>>,
    pub action: AttrValue<String>,
    pub reason: AttrValue<String>,
}

impl ToolInvocationPolicyModel {
    fn apply(&mut self, policy: ToolInvocationPolicy) {
        self.id = AttrValue::Known(policy.id.to_string());
        self.agent_tool_id = AttrValue::Known(policy.tool_id.to_string());
        self.conditions = AttrValue::Known(policy.conditions);
        self.action = AttrValue::Known(policy.action);
        self.reason = policy.reason.into();
    }

    fn request(&self) -> Result<ToolInvocationPolicyRequest, Diagnostic> {
        Ok(ToolInvocationPolicyRequest {
            tool_id: require_uuid("agent_tool_id", &self.agent_tool_id)?,
            conditions: self.conditions.to_request().unwrap_or_default(),
            action: self.action.to_request().unwrap_or_default(),
            reason: self.reason.to_request(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolInvocationPolicyResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for ToolInvocationPolicyResource {
    type Model = ToolInvocationPolicyModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_tool_invocation_policy", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Decides whether a tool may be invoked.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("agent_tool_id", agent_tool_id_attribute())
            .with_attribute("conditions", conditions_attribute())
            .with_attribute("action", Attribute::required_string().one_of(TOOL_INVOCATION_ACTIONS))
            .with_attribute("reason", Attribute::optional_string())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    fn validate(&self, config: &ToolInvocationPolicyModel) -> Vec<Diagnostic> {
        validate_operators(&config.conditions)
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: ToolInvocationPolicyModel,
    ) -> Result<ToolInvocationPolicyModel, Diagnostic> {
        let client = self.client.get()?;
        let policy = client
            .create_tool_invocation_policy(ctx, &plan.request()?)
            .await
            .expect_ok("create tool invocation policy")?;
        info!(id = %policy.id, action = %policy.action, "Created tool invocation policy");
        plan.apply(policy);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: ToolInvocationPolicyModel,
    ) -> Result<Option<ToolInvocationPolicyModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(policy) = client
            .get_tool_invocation_policy(ctx, id)
            .await
            .found("read tool invocation policy")?
        else {
            return Ok(None);
        };
        state.apply(policy);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        prior: ToolInvocationPolicyModel,
        mut plan: ToolInvocationPolicyModel,
    ) -> Result<ToolInvocationPolicyModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let policy = client
            .update_tool_invocation_policy(ctx, id, &plan.request()?)
            .await
            .expect_ok("update tool invocation policy")?;
        plan.apply(policy);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: ToolInvocationPolicyModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client
            .delete_tool_invocation_policy(ctx, id)
            .await
            .deleted("delete tool invocation policy")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<ToolInvocationPolicyModel, Diagnostic> {
        Ok(ToolInvocationPolicyModel {
            id: AttrValue::Known(parse_uuid("id", id)?.to_string()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{assert_plan_replaces, configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const POLICY: &str = "b0000000-0000-0000-0000-000000000001";
    const AGENT_TOOL: &str = "11111111-1111-1111-1111-111111111111";

    fn conditions(operator: &str) -> serde_json::Value {
        json!([{"key": "url", "operator": operator, "value": "https://internal"}])
    }

    #[tokio::test]
    async fn test_trusted_data_default_action() {
        let mock = MockTransport::new();
        let remote = json!({
            "id": POLICY,
            "toolId": AGENT_TOOL,
            "conditions": conditions("startsWith"),
            "action": "mark_as_trusted",
        });
        mock.respond(Method::POST, "/api/trusted-data-policies", 200, remote.clone());
        mock.respond(Method::GET, &format!("/api/trusted-data-policies/{}", POLICY), 200, remote);
        let tester = configured_tester(&mock).await;

        let config = json!({"agent_tool_id": AGENT_TOOL, "conditions": conditions("startsWith")});
        let state = tester.lifecycle_create("archestra_trusted_data_policy", config).await.unwrap();
        assert_eq!(state["action"], "mark_as_trusted");
        assert_eq!(state["conditions"], conditions("startsWith"));

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["toolId"], AGENT_TOOL);
        assert_eq!(body["action"], "mark_as_trusted");
    }

    #[tokio::test]
    async fn test_unknown_operator_is_rejected() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let err = tester
            .validate_resource_config(
                "archestra_tool_invocation_policy",
                json!({"agent_tool_id": AGENT_TOOL, "conditions": conditions("like"), "action": "block_always"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("conditions.0.operator"));
    }

    #[tokio::test]
    async fn test_moving_policy_to_another_tool_replaces() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;
        let prior = json!({
            "id": POLICY, "agent_tool_id": AGENT_TOOL, "conditions": conditions("regex"),
            "action": "block_always", "reason": "no",
        });
        let plan = tester
            .plan_update(
                "archestra_tool_invocation_policy",
                prior,
                json!({
                    "agent_tool_id": "11111111-1111-1111-1111-222222222222",
                    "conditions": conditions("regex"),
                    "action": "block_always",
                    "reason": "no",
                }),
            )
            .await
            .unwrap();
        assert_plan_replaces(&plan, "agent_tool_id");
    }
}
