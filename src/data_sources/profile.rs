//! `archestra_profile`: a profile looked up by name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::mappers::labels::{self, label_list_type, LabelModel};
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::schema::{Attribute, AttributeFlags, Diagnostic, Schema};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileModel {
    pub id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub labels: AttrValue<Vec<LabelModel>>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for ProfileDataSource {
    type Model = ProfileModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_profile", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Looks up a profile by name.")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("labels", Attribute::new(label_list_type(), AttributeFlags::computed()))
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: ProfileModel) -> Result<ProfileModel, Diagnostic> {
        let client = self.client.get()?;
        let name = config.name.as_str().unwrap_or_default();
        let agents = client.list_agents(ctx).await.expect_ok("list profiles")?;
        let Some(agent) = agents.into_iter().find(|a| a.name == name) else {
            return Err(not_found(format!("No profile named '{}'", name)));
        };

        config.id = AttrValue::Known(agent.id.to_string());
        config.labels = labels::from_response(&AttrValue::Null, agent.labels);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{assert_error_contains, configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_lookup_by_name() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/agents",
            200,
            json!([
                {"id": "90000000-0000-0000-0000-000000000001", "name": "default"},
                {
                    "id": "90000000-0000-0000-0000-000000000002",
                    "name": "support",
                    "labels": [{"key": "env", "value": "prod"}],
                },
            ]),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source("archestra_profile", json!({"name": "support"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "90000000-0000-0000-0000-000000000002");
        assert_eq!(state["labels"], json!([{"key": "env", "value": "prod"}]));

        let err = tester
            .read_data_source("archestra_profile", json!({"name": "missing"}))
            .await
            .unwrap_err();
        assert_error_contains(err.diagnostics(), "No profile named 'missing'");
    }
}
