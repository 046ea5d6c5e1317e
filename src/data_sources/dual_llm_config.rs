//! `archestra_dual_llm_config`.

use async_trait::async_trait;

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::ids::require_uuid;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::resources::dual_llm_config::DualLlmConfigModel;
use crate::schema::{Attribute, Diagnostic, Schema, Validator};

#[derive(Debug, Clone, Default)]
pub struct DualLlmConfigDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for DualLlmConfigDataSource {
    type Model = DualLlmConfigModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_dual_llm_config", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Reads a dual-LLM configuration by id.")
            .with_attribute("id", Attribute::required_string().with_validator(Validator::Uuid))
            .with_attribute("enabled", Attribute::computed_bool())
            .with_attribute("main_agent_prompt", Attribute::computed_string())
            .with_attribute("quarantined_agent_prompt", Attribute::computed_string())
            .with_attribute("summary_prompt", Attribute::computed_string())
            .with_attribute("max_rounds", Attribute::computed_int64())
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("updated_at", Attribute::computed_string())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: DualLlmConfigModel) -> Result<DualLlmConfigModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &config.id)?;
        let found = client
            .get_dual_llm_config(ctx, id)
            .await
            .found("read dual LLM config")?
            .ok_or_else(|| not_found(format!("No dual LLM config with id {}", id)))?;
        config.apply(found);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_by_id() {
        let id = "d1000000-0000-0000-0000-000000000001";
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            &format!("/api/dual-llm-config/{}", id),
            200,
            json!({
                "id": id,
                "enabled": false,
                "mainAgentPrompt": "main",
                "quarantinedAgentPrompt": "quarantine",
                "summaryPrompt": "summary",
                "maxRounds": 3,
            }),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source("archestra_dual_llm_config", json!({"id": id}))
            .await
            .unwrap();
        assert_eq!(state["enabled"], false);
        assert_eq!(state["max_rounds"], 3);
        assert!(state["created_at"].is_null());
    }
}
