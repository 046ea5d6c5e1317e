//! `archestra_team`: a team looked up by id or name.

use async_trait::async_trait;

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::ids::optional_uuid;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::resources::team::TeamModel;
use crate::schema::{Attribute, ConfigValidator, Diagnostic, Schema};

#[derive(Debug, Clone, Default)]
pub struct TeamDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for TeamDataSource {
    type Model = TeamModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_team", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Looks up a team by id or name.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("organization_id", Attribute::computed_string())
            .with_attribute("created_by", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
            .with_config_validator(ConfigValidator::ExactlyOneOf(vec!["id", "name"]))
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: TeamModel) -> Result<TeamModel, Diagnostic> {
        let client = self.client.get()?;

        let team = if let Some(id) = optional_uuid("id", &config.id)? {
            client
                .get_team(ctx, id)
                .await
                .found("read team")?
                .ok_or_else(|| not_found(format!("No team with id {}", id)))?
        } else {
            let name = config.name.as_str().unwrap_or_default();
            client
                .list_teams(ctx)
                .await
                .expect_ok("list teams")?
                .into_iter()
                .find(|t| t.name == name)
                .ok_or_else(|| not_found(format!("No team named '{}'", name)))?
        };

        config.apply(team);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const TEAM: &str = "e1000000-0000-0000-0000-000000000001";

    #[tokio::test]
    async fn test_lookup_by_id_and_by_name() {
        let team = json!({"id": TEAM, "name": "platform", "organizationId": "org-1"});
        let mock = MockTransport::new();
        mock.respond(Method::GET, &format!("/api/teams/{}", TEAM), 200, team.clone());
        mock.respond(Method::GET, "/api/teams", 200, json!([team]));
        let tester = configured_tester(&mock).await;

        let by_id = tester
            .read_data_source("archestra_team", json!({"id": TEAM}))
            .await
            .unwrap();
        let by_name = tester
            .read_data_source("archestra_team", json!({"name": "platform"}))
            .await
            .unwrap();

        assert_eq!(by_id, by_name);
        assert_eq!(by_name["id"], TEAM);
        assert_eq!(by_id["name"], "platform");
        assert!(by_id["description"].is_null());
    }
}
