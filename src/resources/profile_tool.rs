//! `archestra_profile_tool`: a tool assigned to a profile.
//!
//! Identified by the `profile_id:tool_id` pair; the relationship UUID the
//! configuration endpoint needs is discovered by listing the profile's tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::client::models::{AgentTool, AgentToolSettings};
use crate::client::{ApiResult, ArchestraClient};
use crate::context::OpContext;
use crate::ids::{optional_uuid, require_uuid, CompositeId};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

pub(crate) const TOOL_RESULT_TREATMENTS: &[&str] = &["trusted", "untrusted", "sanitize_with_dual_llm"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileToolModel {
    pub id: AttrValue<String>,
    pub profile_id: AttrValue<String>,
    pub tool_id: AttrValue<String>,
    pub credential_source_mcp_server_id: AttrValue<String>,
    pub execution_source_mcp_server_id: AttrValue<String>,
    pub use_dynamic_team_credential: AttrValue<bool>,
    pub allow_usage_when_untrusted_data_is_present: AttrValue<bool>,
    pub tool_result_treatment: AttrValue<String>,
    pub response_modifier_template: AttrValue<String>,
}

impl ProfileToolModel {
    fn apply(&mut self, record: &AgentTool) {
        self.id = AttrValue::Known(record.id.to_string());
        self.profile_id = AttrValue::Known(record.agent_id.to_string());
        self.tool_id = AttrValue::Known(record.tool_id.to_string());
        self.credential_source_mcp_server_id = record.credential_source_mcp_server_id.map(|id| id.to_string()).into();
        self.execution_source_mcp_server_id = record.execution_source_mcp_server_id.map(|id| id.to_string()).into();
        self.use_dynamic_team_credential = AttrValue::Known(record.use_dynamic_team_credential);
        self.allow_usage_when_untrusted_data_is_present =
            AttrValue::Known(record.allow_usage_when_untrusted_data_is_present);
        self.tool_result_treatment = AttrValue::Known(record.tool_result_treatment.clone());
        self.response_modifier_template = record.response_modifier_template.clone().into();
    }

    fn settings(&self) -> Result<AgentToolSettings, Diagnostic> {
        Ok(AgentToolSettings {
            credential_source_mcp_server_id: optional_uuid(
                "credential_source_mcp_server_id",
                &self.credential_source_mcp_server_id,
            )?,
            execution_source_mcp_server_id: optional_uuid(
                "execution_source_mcp_server_id",
                &self.execution_source_mcp_server_id,
            )?,
            use_dynamic_team_credential: self.use_dynamic_team_credential.to_request(),
            allow_usage_when_untrusted_data_is_present: self.allow_usage_when_untrusted_data_is_present.to_request(),
            tool_result_treatment: self.tool_result_treatment.to_request(),
            // Null leaves the stored template untouched.
            response_modifier_template: self.response_modifier_template.to_request(),
        })
    }
}

/// Find the relationship record of `tool_id` on `agent_id`. `None` when the
/// agent or the assignment is gone.
pub(crate) async fn find_assignment(
    client: &ArchestraClient,
    ctx: &OpContext,
    agent_id: Uuid,
    tool_id: Uuid,
) -> Result<Option<AgentTool>, Diagnostic> {
    let tools = client
        .list_agent_tools(ctx, agent_id)
        .await
        .found("list profile tools")?
        .unwrap_or_default();
    Ok(tools.into_iter().find(|t| t.tool_id == tool_id))
}

#[derive(Debug, Clone, Default)]
pub struct ProfileToolResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for ProfileToolResource {
    type Model = ProfileToolModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_profile_tool", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Assigns a tool to a profile and configures how it runs.")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("Relationship identifier")
                    .with_state_for_unknown(),
            )
            .with_attribute(
                "profile_id",
                Attribute::required_string()
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "tool_id",
                Attribute::required_string()
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "credential_source_mcp_server_id",
                Attribute::optional_string()
                    .with_description("MCP server installation whose credentials the tool uses")
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "execution_source_mcp_server_id",
                Attribute::optional_string()
                    .with_description("MCP server installation that executes the tool")
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "use_dynamic_team_credential",
                Attribute::optional_bool().with_default(serde_json::json!(false)),
            )
            .with_attribute(
                "allow_usage_when_untrusted_data_is_present",
                Attribute::optional_bool().with_default(serde_json::json!(false)),
            )
            .with_attribute(
                "tool_result_treatment",
                Attribute::optional_string()
                    .with_default(serde_json::json!("trusted"))
                    .one_of(TOOL_RESULT_TREATMENTS),
            )
            .with_attribute("response_modifier_template", Attribute::optional_string())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: ProfileToolModel) -> Result<ProfileToolModel, Diagnostic> {
        let client = self.client.get()?;
        let agent_id = require_uuid("profile_id", &plan.profile_id)?;
        let tool_id = require_uuid("tool_id", &plan.tool_id)?;
        let settings = plan.settings()?;

        let assignment = AgentToolSettings {
            credential_source_mcp_server_id: settings.credential_source_mcp_server_id,
            execution_source_mcp_server_id: settings.execution_source_mcp_server_id,
            ..Default::default()
        };
        client
            .assign_tool(ctx, agent_id, tool_id, &assignment)
            .await
            .expect_ok("assign tool to profile")?;

        let record = find_assignment(client, ctx, agent_id, tool_id).await?.ok_or_else(|| {
            Diagnostic::error("Profile Tool Not Found").with_detail(format!(
                "Tool {} was assigned to profile {} but the assignment is not listed",
                tool_id, agent_id
            ))
        })?;

        let record = client
            .update_agent_tool(ctx, record.id, &settings)
            .await
            .expect_ok("configure profile tool")?;

        info!(profile_id = %agent_id, tool_id = %tool_id, "Assigned tool to profile");
        plan.apply(&record);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: ProfileToolModel) -> Result<Option<ProfileToolModel>, Diagnostic> {
        let client = self.client.get()?;
        let agent_id = require_uuid("profile_id", &state.profile_id)?;
        let tool_id = require_uuid("tool_id", &state.tool_id)?;

        let Some(record) = find_assignment(client, ctx, agent_id, tool_id).await? else {
            return Ok(None);
        };
        state.apply(&record);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        prior: ProfileToolModel,
        mut plan: ProfileToolModel,
    ) -> Result<ProfileToolModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let record = client
            .update_agent_tool(ctx, id, &plan.settings()?)
            .await
            .expect_ok("update profile tool")?;
        plan.apply(&record);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: ProfileToolModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let agent_id = require_uuid("profile_id", &state.profile_id)?;
        let tool_id = require_uuid("tool_id", &state.tool_id)?;
        client
            .unassign_tool(ctx, agent_id, tool_id)
            .await
            .deleted("unassign tool from profile")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<ProfileToolModel, Diagnostic> {
        let (_, agent_id, tool_id) = CompositeId::parse_uuids(id, &[':', '/'], ("profile_id", "tool_id"))?;
        Ok(ProfileToolModel {
            profile_id: AttrValue::Known(agent_id.to_string()),
            tool_id: AttrValue::Known(tool_id.to_string()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{assert_plan_replaces, configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::{json, Value};

    const PROFILE: &str = "550e8400-e29b-41d4-a716-446655440000";
    const TOOL: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
    const RELATION: &str = "77777777-7777-7777-7777-777777777777";

    fn record(treatment: &str) -> Value {
        json!({
            "id": RELATION,
            "agentId": PROFILE,
            "toolId": TOOL,
            "tool": {"id": TOOL, "name": "archestra__whoami"},
            "useDynamicTeamCredential": false,
            "allowUsageWhenUntrustedDataIsPresent": false,
            "toolResultTreatment": treatment,
        })
    }

    #[tokio::test]
    async fn test_import_composite_id_then_read() {
        let mock = MockTransport::new();
        let other = json!({"id": "88888888-8888-8888-8888-888888888888", "agentId": PROFILE,
            "toolId": "99999999-9999-9999-9999-999999999999"});
        mock.respond(Method::GET, "/api/agent-tools", 200, json!([other, record("trusted")]));
        let tester = configured_tester(&mock).await;

        let import_id = format!("{}:{}", PROFILE, TOOL);
        let imported = tester.import_resource("archestra_profile_tool", &import_id).await.unwrap();
        let state = tester
            .read("archestra_profile_tool", imported[0].state.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state["profile_id"], PROFILE);
        assert_eq!(state["tool_id"], TOOL);
        assert_eq!(state["id"], RELATION);
        assert_eq!(mock.requests()[0].query, vec![("agentId".to_string(), PROFILE.to_string())]);
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_id() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let err = tester
            .import_resource("archestra_profile_tool", &format!("{}:not-a-uuid", PROFILE))
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Invalid ID");
        assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("tool_id"));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_then_configures() {
        let mock = MockTransport::new();
        let assign = format!("/api/agents/{}/tools/{}", PROFILE, TOOL);
        mock.respond(Method::POST, &assign, 200, json!({"success": true}));
        mock.respond(Method::GET, "/api/agent-tools", 200, json!([record("trusted")]));
        mock.respond(
            Method::PATCH,
            &format!("/api/agent-tools/{}", RELATION),
            200,
            record("untrusted"),
        );
        let tester = configured_tester(&mock).await;

        let config = json!({"profile_id": PROFILE, "tool_id": TOOL, "tool_result_treatment": "untrusted"});
        let plan = tester.plan_create("archestra_profile_tool", config.clone()).await.unwrap();
        assert_eq!(plan.planned_state["use_dynamic_team_credential"], false);

        let state = tester
            .create("archestra_profile_tool", plan.planned_state, config)
            .await
            .unwrap();
        assert_eq!(state["tool_result_treatment"], "untrusted");
        assert!(state["response_modifier_template"].is_null());

        let patch = &mock.requests_to(Method::PATCH, &format!("/api/agent-tools/{}", RELATION))[0];
        let body = patch.body.as_ref().unwrap();
        assert_eq!(body["toolResultTreatment"], "untrusted");
        assert!(body.get("responseModifierTemplate").is_none());
    }

    #[tokio::test]
    async fn test_failed_assignment_skips_configuration() {
        let mock = MockTransport::new();
        mock.respond(
            Method::POST,
            &format!("/api/agents/{}/tools/{}", PROFILE, TOOL),
            409,
            json!({"error": {"message": "Tool already assigned"}}),
        );
        let tester = configured_tester(&mock).await;

        let config = json!({"profile_id": PROFILE, "tool_id": TOOL});
        let plan = tester.plan_create("archestra_profile_tool", config.clone()).await.unwrap();
        let err = tester
            .create("archestra_profile_tool", plan.planned_state, config)
            .await
            .unwrap_err();
        assert_eq!(
            err.diagnostics()[0].detail.as_deref(),
            Some("Unable to assign tool to profile: Tool already assigned")
        );
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_changing_tool_replaces() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;
        let prior = json!({
            "id": RELATION, "profile_id": PROFILE, "tool_id": TOOL,
            "credential_source_mcp_server_id": null, "execution_source_mcp_server_id": null,
            "use_dynamic_team_credential": false, "allow_usage_when_untrusted_data_is_present": false,
            "tool_result_treatment": "trusted", "response_modifier_template": null,
        });
        let config = json!({"profile_id": PROFILE, "tool_id": "99999999-9999-9999-9999-999999999999"});
        let plan = tester.plan_update("archestra_profile_tool", prior, config).await.unwrap();
        assert_plan_replaces(&plan, "tool_id");
    }
}
