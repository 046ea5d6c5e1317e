//! `archestra_dual_llm_config`: prompts and limits of the dual-LLM
//! quarantine pattern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{DualLlmConfig, DualLlmConfigRequest};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualLlmConfigModel {
    pub id: AttrValue<String>,
    pub enabled: AttrValue<bool>,
    pub main_agent_prompt: AttrValue<String>,
    pub quarantined_agent_prompt: AttrValue<String>,
    pub summary_prompt: AttrValue<String>,
    pub max_rounds: AttrValue<i64>,
    pub created_at: AttrValue<String>,
    pub updated_at: AttrValue<String>,
}

impl DualLlmConfigModel {
    pub(crate) fn apply(&mut self, config: DualLlmConfig) {
        self.id = AttrValue::Known(config.id.to_string());
        self.enabled = AttrValue::Known(config.enabled);
        self.main_agent_prompt = AttrValue::Known(config.main_agent_prompt);
        self.quarantined_agent_prompt = AttrValue::Known(config.quarantined_agent_prompt);
        self.summary_prompt = AttrValue::Known(config.summary_prompt);
        self.max_rounds = AttrValue::Known(config.max_rounds);
        self.created_at = config.created_at.into();
        self.updated_at = config.updated_at.into();
    }

    fn request(&self) -> DualLlmConfigRequest {
        DualLlmConfigRequest {
            enabled: self.enabled.to_request().unwrap_or(true),
            main_agent_prompt: self.main_agent_prompt.to_request().unwrap_or_default(),
            quarantined_agent_prompt: self.quarantined_agent_prompt.to_request().unwrap_or_default(),
            summary_prompt: self.summary_prompt.to_request().unwrap_or_default(),
            max_rounds: self.max_rounds.to_request().unwrap_or(5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DualLlmConfigResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for DualLlmConfigResource {
    type Model = DualLlmConfigModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_dual_llm_config", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages a dual-LLM configuration for handling untrusted tool output.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("enabled", Attribute::optional_bool().with_default(serde_json::json!(true)))
            .with_attribute(
                "main_agent_prompt",
                Attribute::required_string().with_description("Prompt of the privileged agent"),
            )
            .with_attribute(
                "quarantined_agent_prompt",
                Attribute::required_string().with_description("Prompt of the quarantined agent"),
            )
            .with_attribute(
                "summary_prompt",
                Attribute::required_string().with_description("Prompt that summarizes the exchange"),
            )
            .with_attribute(
                "max_rounds",
                Attribute::optional_int64()
                    .with_default(serde_json::json!(5))
                    .with_validator(Validator::AtLeast(1)),
            )
            .with_attribute("created_at", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("updated_at", Attribute::computed_string())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: DualLlmConfigModel) -> Result<DualLlmConfigModel, Diagnostic> {
        let client = self.client.get()?;
        let config = client
            .create_dual_llm_config(ctx, &plan.request())
            .await
            .expect_ok("create dual LLM config")?;
        info!(id = %config.id, "Created dual LLM config");
        plan.apply(config);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: DualLlmConfigModel,
    ) -> Result<Option<DualLlmConfigModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(config) = client
            .get_dual_llm_config(ctx, id)
            .await
            .found("read dual LLM config")?
        else {
            return Ok(None);
        };
        state.apply(config);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        prior: DualLlmConfigModel,
        mut plan: DualLlmConfigModel,
    ) -> Result<DualLlmConfigModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let config = client
            .update_dual_llm_config(ctx, id, &plan.request())
            .await
            .expect_ok("update dual LLM config")?;
        plan.apply(config);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: DualLlmConfigModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client
            .delete_dual_llm_config(ctx, id)
            .await
            .deleted("delete dual LLM config")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<DualLlmConfigModel, Diagnostic> {
        Ok(DualLlmConfigModel {
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

    #[tokio::test]
    async fn test_defaults_are_sent() {
        let mock = MockTransport::new();
        mock.respond(
            Method::POST,
            "/api/dual-llm-config",
            200,
            json!({
                "id": "e0000000-0000-0000-0000-000000000001",
                "enabled": true,
                "mainAgentPrompt": "main",
                "quarantinedAgentPrompt": "quarantined",
                "summaryPrompt": "summary",
                "maxRounds": 5,
                "createdAt": "2025-01-01T00:00:00Z",
                "updatedAt": "2025-01-01T00:00:00Z",
            }),
        );
        let tester = configured_tester(&mock).await;

        let config = json!({
            "main_agent_prompt": "main",
            "quarantined_agent_prompt": "quarantined",
            "summary_prompt": "summary",
        });
        let plan = tester.plan_create("archestra_dual_llm_config", config.clone()).await.unwrap();
        assert_eq!(plan.planned_state["max_rounds"], 5);

        let state = tester
            .create("archestra_dual_llm_config", plan.planned_state, config)
            .await
            .unwrap();
        assert_eq!(state["enabled"], true);

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["maxRounds"], 5);
        assert_eq!(body["enabled"], true);
    }

    #[tokio::test]
    async fn test_max_rounds_must_be_positive() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;
        let err = tester
            .validate_resource_config(
                "archestra_dual_llm_config",
                json!({"main_agent_prompt": "m", "quarantined_agent_prompt": "q", "summary_prompt": "s", "max_rounds": 0}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("max_rounds"));
    }
}
