//! `archestra_mcp_server_team_access`: grants a team access to an installed
//! MCP server. Identified by `mcp_server_id/team_id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{require_uuid, CompositeId};
use crate::resource::{ClientSlot, Lifecycle, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamAccessModel {
    pub id: AttrValue<String>,
    pub mcp_server_id: AttrValue<String>,
    pub team_id: AttrValue<String>,
}

#[derive(Debug, Clone, Default)]
pub struct McpServerTeamAccessResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for McpServerTeamAccessResource {
    type Model = TeamAccessModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_mcp_server_team_access", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Grants a team access to an MCP server installation.")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("`mcp_server_id/team_id`")
                    .with_state_for_unknown(),
            )
            .with_attribute(
                "mcp_server_id",
                Attribute::required_string()
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "team_id",
                Attribute::required_string()
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::ReplacementOnly
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: TeamAccessModel) -> Result<TeamAccessModel, Diagnostic> {
        let client = self.client.get()?;
        let server_id = require_uuid("mcp_server_id", &plan.mcp_server_id)?;
        let team_id = require_uuid("team_id", &plan.team_id)?;

        client
            .grant_team_mcp_server_access(ctx, server_id, team_id)
            .await
            .expect_ok("grant team access to MCP server")?;

        info!(mcp_server_id = %server_id, team_id = %team_id, "Granted team access");
        plan.id = AttrValue::Known(CompositeId::new(server_id.to_string(), team_id.to_string(), '/').encode());
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: TeamAccessModel) -> Result<Option<TeamAccessModel>, Diagnostic> {
        let client = self.client.get()?;
        let server_id = require_uuid("mcp_server_id", &state.mcp_server_id)?;
        let team_id = require_uuid("team_id", &state.team_id)?;

        let Some(server) = client
            .get_mcp_server(ctx, server_id)
            .await
            .found("read MCP server")?
        else {
            return Ok(None);
        };
        if !server.teams.contains(&team_id) {
            return Ok(None);
        }
        state.id = AttrValue::Known(CompositeId::new(server_id.to_string(), team_id.to_string(), '/').encode());
        Ok(Some(state))
    }

    async fn delete(&self, ctx: &OpContext, state: TeamAccessModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let server_id = require_uuid("mcp_server_id", &state.mcp_server_id)?;
        let team_id = require_uuid("team_id", &state.team_id)?;
        client
            .revoke_team_mcp_server_access(ctx, server_id, team_id)
            .await
            .deleted("revoke team access to MCP server")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<TeamAccessModel, Diagnostic> {
        let (id, server_id, team_id) = CompositeId::parse_uuids(id, &['/'], ("mcp_server_id", "team_id"))?;
        Ok(TeamAccessModel {
            id: AttrValue::Known(id.encode()),
            mcp_server_id: AttrValue::Known(server_id.to_string()),
            team_id: AttrValue::Known(team_id.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const SERVER: &str = "c0000000-0000-0000-0000-000000000001";
    const TEAM: &str = "55555555-5555-5555-5555-555555555555";

    #[tokio::test]
    async fn test_create_and_read_membership() {
        let mock = MockTransport::new();
        mock.respond(
            Method::POST,
            &format!("/api/v1/mcp-servers/{}/teams/{}", SERVER, TEAM),
            204,
            serde_json::Value::Null,
        );
        mock.respond_sequence(
            Method::GET,
            &format!("/api/mcp_server/{}", SERVER),
            vec![
                (200, json!({"id": SERVER, "name": "github", "teams": [TEAM]})),
                (200, json!({"id": SERVER, "name": "github", "teams": []})),
            ],
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .lifecycle_create("archestra_mcp_server_team_access", json!({"mcp_server_id": SERVER, "team_id": TEAM}))
            .await
            .unwrap();
        assert_eq!(state["id"], format!("{}/{}", SERVER, TEAM));

        let revoked = tester.read("archestra_mcp_server_team_access", state).await.unwrap();
        assert!(revoked.is_none());
    }

    #[tokio::test]
    async fn test_import_requires_slash_form() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let err = tester
            .import_resource("archestra_mcp_server_team_access", &format!("{}:{}", SERVER, TEAM))
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Invalid Import ID");
    }
}
