//! `archestra_prompt_versions`: every version of a prompt, oldest first.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::ids::require_uuid;
use crate::mappers::prompts::PromptModel;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptVersionsModel {
    pub prompt_id: AttrValue<String>,
    pub versions: AttrValue<Vec<PromptModel>>,
}

fn version_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::String),
        ("profile_id", AttributeType::String),
        ("name", AttributeType::String),
        ("system_prompt", AttributeType::String),
        ("user_prompt", AttributeType::String),
        ("is_active", AttributeType::Bool),
        ("version", AttributeType::Int64),
        ("parent_prompt_id", AttributeType::String),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
    ])
}

#[derive(Debug, Clone, Default)]
pub struct PromptVersionsDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for PromptVersionsDataSource {
    type Model = PromptVersionsModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_prompt_versions", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Lists the version history of a prompt.")
            .with_attribute(
                "prompt_id",
                Attribute::required_string()
                    .with_description("Any version of the prompt")
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "versions",
                Attribute::new(AttributeType::list(version_type()), AttributeFlags::computed())
                    .with_description("Versions ordered by version number"),
            )
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: PromptVersionsModel) -> Result<PromptVersionsModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("prompt_id", &config.prompt_id)?;
        let mut versions = client
            .list_prompt_versions(ctx, id)
            .await
            .found("list prompt versions")?
            .ok_or_else(|| not_found(format!("No prompt with id {}", id)))?;
        versions.sort_by_key(|p| p.version);

        config.versions = AttrValue::Known(versions.iter().map(PromptModel::from_prompt).collect());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_versions_sorted_oldest_first() {
        let first = "b1000000-0000-0000-0000-000000000001";
        let second = "b1000000-0000-0000-0000-000000000002";
        let profile = "b2000000-0000-0000-0000-000000000001";
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            &format!("/api/prompts/{}/versions", second),
            200,
            json!([
                {"id": second, "agentId": profile, "name": "p", "version": 2, "parentPromptId": first,
                 "createdAt": "t2", "updatedAt": "t2"},
                {"id": first, "agentId": profile, "name": "p", "version": 1,
                 "createdAt": "t1", "updatedAt": "t1"},
            ]),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source("archestra_prompt_versions", json!({"prompt_id": second}))
            .await
            .unwrap();
        let versions = state["versions"].as_array().unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0]["id"], first);
        assert!(versions[0]["parent_prompt_id"].is_null());
        assert_eq!(versions[1]["version"], 2);
        assert_eq!(versions[1]["parent_prompt_id"], first);
    }
}
