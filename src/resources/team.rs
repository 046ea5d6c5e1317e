//! `archestra_team`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{Team, TeamRequest};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamModel {
    pub id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub description: AttrValue<String>,
    pub organization_id: AttrValue<String>,
    pub created_by: AttrValue<String>,
    pub created_at: AttrValue<String>,
}

impl TeamModel {
    pub(crate) fn apply(&mut self, team: Team) {
        self.id = AttrValue::Known(team.id.to_string());
        self.name = AttrValue::Known(team.name);
        self.description = team.description.into();
        self.organization_id = team.organization_id.into();
        self.created_by = team.created_by.into();
        self.created_at = team.created_at.into();
    }

    fn request(&self) -> TeamRequest {
        TeamRequest {
            name: self.name.to_request().unwrap_or_default(),
            description: self.description.to_request(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for TeamResource {
    type Model = TeamModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_team", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages a team.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("organization_id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("created_by", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("created_at", Attribute::computed_string().with_state_for_unknown())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: TeamModel) -> Result<TeamModel, Diagnostic> {
        let client = self.client.get()?;
        let team = client.create_team(ctx, &plan.request()).await.expect_ok("create team")?;
        info!(id = %team.id, name = %team.name, "Created team");
        plan.apply(team);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: TeamModel) -> Result<Option<TeamModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(team) = client.get_team(ctx, id).await.found("read team")? else {
            return Ok(None);
        };
        state.apply(team);
        Ok(Some(state))
    }

    async fn update(&self, ctx: &OpContext, prior: TeamModel, mut plan: TeamModel) -> Result<TeamModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let team = client
            .update_team(ctx, id, &plan.request())
            .await
            .expect_ok("update team")?;
        plan.apply(team);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: TeamModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client.delete_team(ctx, id).await.deleted("delete team")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<TeamModel, Diagnostic> {
        Ok(TeamModel {
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

    const TEAM: &str = "55555555-5555-5555-5555-555555555555";

    #[tokio::test]
    async fn test_delete_tolerates_missing_team() {
        let mock = MockTransport::new();
        mock.respond(Method::DELETE, &format!("/api/teams/{}", TEAM), 404, json!({"message": "gone"}));
        let tester = configured_tester(&mock).await;

        tester
            .lifecycle_delete("archestra_team", json!({"id": TEAM, "name": "eng"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_surfaces_other_statuses() {
        let mock = MockTransport::new();
        mock.respond(Method::DELETE, &format!("/api/teams/{}", TEAM), 403, serde_json::Value::Null);
        let tester = configured_tester(&mock).await;

        let err = tester
            .delete("archestra_team", json!({"id": TEAM, "name": "eng"}))
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Unexpected API Response");
        assert_eq!(
            err.diagnostics()[0].detail.as_deref(),
            Some("Expected 200 OK or 404 Not Found, got status 403")
        );
    }

    #[tokio::test]
    async fn test_empty_description_is_preserved() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            &format!("/api/teams/{}", TEAM),
            200,
            json!({"id": TEAM, "name": "eng", "description": ""}),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read("archestra_team", json!({"id": TEAM}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state["description"], "");
    }
}
