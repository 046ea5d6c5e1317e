//! `archestra_agent_tool` and `archestra_profile_tool`: a tool assigned to an
//! agent, looked up by tool name.
//!
//! Built-in tools are assigned to a new agent asynchronously, so the lookup
//! retries until the tool shows up or the budget runs out.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::models::AgentTool;
use crate::client::{ApiResult, ArchestraClient};
use crate::context::OpContext;
use crate::data_sources::settle;
use crate::ids::require_uuid;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::retry::{retry_until_found, RetryConfig};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

/// The parent attribute (`agent_id` or `profile_id`) is carried under the
/// name the registered variant declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignedToolModel {
    pub id: AttrValue<String>,
    pub tool_name: AttrValue<String>,
    pub tool_id: AttrValue<String>,
    #[serde(flatten)]
    pub parent: BTreeMap<String, AttrValue<String>>,
}

fn schema(parent: &'static str, noun: &str) -> Schema {
    Schema::v0()
        .with_description(format!(
            "Looks up a tool assigned to a {} by name. Waits for built-in tools of new {}s to appear.",
            noun, noun
        ))
        .with_attribute(
            parent,
            Attribute::required_string()
                .with_description(format!("The {} the tool is assigned to", noun))
                .with_validator(Validator::Uuid),
        )
        .with_attribute(
            "tool_name",
            Attribute::required_string().with_description("Tool name, e.g. archestra__whoami"),
        )
        .with_attribute("id", Attribute::computed_string().with_description("Relationship identifier"))
        .with_attribute("tool_id", Attribute::computed_string())
}

/// Poll the agent's tool list until `tool_name` is assigned.
async fn lookup(
    client: &ArchestraClient,
    ctx: &OpContext,
    retry: &RetryConfig,
    agent_id: Uuid,
    tool_name: &str,
) -> Result<AgentTool, Diagnostic> {
    let result = retry_until_found(ctx, retry, || async move {
        let tools = client
            .list_agent_tools(ctx, agent_id)
            .await
            .found("list agent tools")?
            .unwrap_or_default();
        Ok::<_, Diagnostic>(tools.into_iter().find(|t| t.tool_name() == Some(tool_name)))
    })
    .await;

    settle(result, || {
        format!(
            "Tool '{}' is not assigned to {} after {} attempts",
            tool_name, agent_id, retry.max_attempts
        )
    })
}

/// Tool lookup, registered once per parent kind.
#[derive(Debug, Clone)]
pub struct AssignedToolDataSource {
    client: ClientSlot,
    retry: RetryConfig,
    noun: &'static str,
    parent: &'static str,
}

impl AssignedToolDataSource {
    /// The lookup registered as `<provider>_agent_tool`.
    pub fn agent() -> Self {
        Self {
            client: ClientSlot::default(),
            retry: RetryConfig::new("agent tool"),
            noun: "agent",
            parent: "agent_id",
        }
    }

    /// The lookup registered as `<provider>_profile_tool`.
    pub fn profile() -> Self {
        Self {
            client: ClientSlot::default(),
            retry: RetryConfig::new("profile tool"),
            noun: "profile",
            parent: "profile_id",
        }
    }
}

#[async_trait]
impl DataSource for AssignedToolDataSource {
    type Model = AssignedToolModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_{}_tool", provider_type_name, self.noun)
    }

    fn schema(&self) -> Schema {
        schema(self.parent, self.noun)
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: AssignedToolModel) -> Result<AssignedToolModel, Diagnostic> {
        let client = self.client.get()?;
        let parent = config.parent.get(self.parent).cloned().unwrap_or_default();
        let parent_id = require_uuid(self.parent, &parent)?;
        let tool_name = config.tool_name.as_str().unwrap_or_default();
        let record = lookup(client, ctx, &self.retry, parent_id, tool_name).await?;

        config.id = AttrValue::Known(record.id.to_string());
        config.tool_id = AttrValue::Known(record.tool_id.to_string());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::{json, Value};

    const AGENT: &str = "10000000-0000-0000-0000-000000000001";
    const WHOAMI: &str = "20000000-0000-0000-0000-000000000002";
    const RELATION: &str = "30000000-0000-0000-0000-000000000003";

    fn assignment(tool_id: &str, name: &str) -> Value {
        json!({
            "id": RELATION,
            "agentId": AGENT,
            "toolId": tool_id,
            "tool": {"id": tool_id, "name": name},
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_appears_after_retries() {
        let mock = MockTransport::new();
        let other = assignment("40000000-0000-0000-0000-000000000004", "archestra__other");
        mock.respond_sequence(
            Method::GET,
            "/api/agent-tools",
            vec![
                (200, json!([])),
                (200, json!([other.clone()])),
                (200, json!([other.clone()])),
                (200, json!([other, assignment(WHOAMI, "archestra__whoami")])),
            ],
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source(
                "archestra_agent_tool",
                json!({"agent_id": AGENT, "tool_name": "archestra__whoami"}),
            )
            .await
            .unwrap();

        assert_eq!(state["tool_id"], WHOAMI);
        assert_eq!(state["id"], RELATION);
        assert_eq!(state["agent_id"], AGENT);
        assert!(state.get("profile_id").is_none());
        let calls = mock.requests_to(Method::GET, "/api/agent-tools");
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].query, vec![("agentId".to_string(), AGENT.to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_tool_is_not_found() {
        let mock = MockTransport::new();
        let client = mock.client();
        let ctx = OpContext::new();
        let retry = RetryConfig::new("profile tool").with_max_attempts(3);

        mock.respond(Method::GET, "/api/agent-tools", 200, json!([]));
        let agent = Uuid::parse_str(AGENT).unwrap();
        let err = lookup(&client, &ctx, &retry, agent, "archestra__whoami")
            .await
            .unwrap_err();

        assert_eq!(err.summary, "Not Found");
        assert!(err.detail.as_deref().unwrap().contains("after 3 attempts"));
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_profile_variant_uses_profile_id() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/agent-tools",
            200,
            json!([assignment(WHOAMI, "archestra__whoami")]),
        );
        let tester = configured_tester(&mock).await;

        let config = json!({"profile_id": AGENT, "tool_name": "archestra__whoami"});
        tester
            .validate_data_source_config("archestra_profile_tool", config.clone())
            .await
            .unwrap();
        let state = tester.read_data_source("archestra_profile_tool", config).await.unwrap();
        assert_eq!(state["profile_id"], AGENT);
        assert_eq!(state["tool_id"], WHOAMI);
        assert!(state.get("agent_id").is_none());
    }
}
