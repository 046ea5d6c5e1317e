//! `archestra_prompt`: a prompt looked up by id or by name.

use async_trait::async_trait;

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::ids::optional_uuid;
use crate::mappers::prompts::PromptModel;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::schema::{Attribute, ConfigValidator, Diagnostic, Schema};

fn prompt_attributes(schema: Schema) -> Schema {
    schema
        .with_attribute("profile_id", Attribute::computed_string())
        .with_attribute("system_prompt", Attribute::computed_string())
        .with_attribute("user_prompt", Attribute::computed_string())
        .with_attribute("is_active", Attribute::computed_bool())
        .with_attribute("version", Attribute::computed_int64())
        .with_attribute("parent_prompt_id", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
        .with_attribute("updated_at", Attribute::computed_string())
}

#[derive(Debug, Clone, Default)]
pub struct PromptDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for PromptDataSource {
    type Model = PromptModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_prompt", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Looks up a prompt by id, or the latest version of a prompt by name.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_config_validator(ConfigValidator::ExactlyOneOf(vec!["id", "name"]));
        prompt_attributes(schema)
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, config: PromptModel) -> Result<PromptModel, Diagnostic> {
        let client = self.client.get()?;

        let prompt = if let Some(id) = optional_uuid("id", &config.id)? {
            client
                .get_prompt(ctx, id)
                .await
                .found("read prompt")?
                .ok_or_else(|| not_found(format!("No prompt with id {}", id)))?
        } else {
            let name = config.name.as_str().unwrap_or_default();
            client
                .list_prompts(ctx)
                .await
                .expect_ok("list prompts")?
                .into_iter()
                .filter(|p| p.name == name)
                .max_by_key(|p| p.version)
                .ok_or_else(|| not_found(format!("No prompt named '{}'", name)))?
        };

        Ok(PromptModel::from_prompt(&prompt))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::{json, Value};

    const PROFILE: &str = "a1000000-0000-0000-0000-000000000001";

    fn version(id: &str, version: i64, parent: Option<&str>) -> Value {
        json!({
            "id": id,
            "agentId": PROFILE,
            "name": "triage",
            "userPrompt": format!("v{}", version),
            "isActive": true,
            "version": version,
            "parentPromptId": parent,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-02T00:00:00Z",
        })
    }

    #[tokio::test]
    async fn test_by_name_returns_latest_version() {
        let first = "a2000000-0000-0000-0000-000000000001";
        let second = "a2000000-0000-0000-0000-000000000002";
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/prompts",
            200,
            json!([version(first, 1, None), version(second, 2, Some(first))]),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source("archestra_prompt", json!({"name": "triage"}))
            .await
            .unwrap();
        assert_eq!(state["id"], second);
        assert_eq!(state["version"], 2);
        assert_eq!(state["parent_prompt_id"], first);
        assert_eq!(state["profile_id"], PROFILE);
    }

    #[tokio::test]
    async fn test_by_id_not_found() {
        let id = "a2000000-0000-0000-0000-000000000009";
        let mock = MockTransport::new();
        mock.respond(Method::GET, &format!("/api/prompts/{}", id), 404, Value::Null);
        let tester = configured_tester(&mock).await;

        let err = tester
            .read_data_source("archestra_prompt", json!({"id": id}))
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Not Found");
    }

    #[tokio::test]
    async fn test_id_and_name_are_exclusive() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let err = tester
            .validate_data_source_config(
                "archestra_prompt",
                json!({"id": "a2000000-0000-0000-0000-000000000001", "name": "triage"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("name"));
        assert!(tester
            .validate_data_source_config("archestra_prompt", json!({}))
            .await
            .is_err());
    }
}
