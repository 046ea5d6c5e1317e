//! `archestra_team_external_group`: maps an identity-provider group onto a
//! team. Identified by `team_id/mapping_id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{AddTeamExternalGroup, TeamExternalGroup};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{require_uuid, CompositeId};
use crate::resource::{ClientSlot, Lifecycle, ProviderData, Resource};
use crate::schema::{Attribute, ConfigValidator, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamExternalGroupModel {
    pub id: AttrValue<String>,
    pub mapping_id: AttrValue<String>,
    pub team_id: AttrValue<String>,
    pub external_group_id: AttrValue<String>,
    pub external_group_name: AttrValue<String>,
}

impl TeamExternalGroupModel {
    fn group_identifier(&self) -> Option<String> {
        self.external_group_id
            .to_request()
            .or_else(|| self.external_group_name.to_request())
    }

    fn apply(&mut self, group: TeamExternalGroup) {
        self.id = AttrValue::Known(CompositeId::new(group.team_id.to_string(), group.id.to_string(), '/').encode());
        self.mapping_id = AttrValue::Known(group.id.to_string());
        self.team_id = AttrValue::Known(group.team_id.to_string());
        // Only the configured field is refreshed; import fills the id form.
        if self.external_group_name.is_known() {
            self.external_group_name = AttrValue::Known(group.group_identifier);
        } else {
            self.external_group_id = AttrValue::Known(group.group_identifier);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamExternalGroupResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for TeamExternalGroupResource {
    type Model = TeamExternalGroupModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_team_external_group", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Maps an external identity-provider group to a team.")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("`team_id/mapping_id`")
                    .with_state_for_unknown(),
            )
            .with_attribute("mapping_id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute(
                "team_id",
                Attribute::required_string()
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "external_group_id",
                Attribute::optional_string()
                    .with_description("Group identifier as sent by the identity provider")
                    .with_requires_replace(),
            )
            .with_attribute(
                "external_group_name",
                Attribute::optional_string()
                    .with_description("Group name, for identity providers that send names")
                    .with_requires_replace(),
            )
            .with_config_validator(ConfigValidator::ExactlyOneOf(vec![
                "external_group_id",
                "external_group_name",
            ]))
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::ReplacementOnly
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: TeamExternalGroupModel,
    ) -> Result<TeamExternalGroupModel, Diagnostic> {
        let client = self.client.get()?;
        let team_id = require_uuid("team_id", &plan.team_id)?;
        let group_identifier = plan.group_identifier().ok_or_else(|| {
            Diagnostic::error("Missing Group Identifier")
                .with_detail("One of external_group_id or external_group_name must be set")
        })?;

        let group = client
            .add_team_external_group(ctx, team_id, &AddTeamExternalGroup { group_identifier })
            .await
            .expect_ok("add external group to team")?;

        info!(team_id = %team_id, mapping_id = %group.id, "Mapped external group to team");
        plan.apply(group);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: TeamExternalGroupModel,
    ) -> Result<Option<TeamExternalGroupModel>, Diagnostic> {
        let client = self.client.get()?;
        let team_id = require_uuid("team_id", &state.team_id)?;
        let mapping_id = require_uuid("mapping_id", &state.mapping_id)?;

        let groups = client
            .list_team_external_groups(ctx, team_id)
            .await
            .found("list team external groups")?
            .unwrap_or_default();
        let Some(group) = groups.into_iter().find(|g| g.id == mapping_id) else {
            return Ok(None);
        };
        state.apply(group);
        Ok(Some(state))
    }

    async fn delete(&self, ctx: &OpContext, state: TeamExternalGroupModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let team_id = require_uuid("team_id", &state.team_id)?;
        let mapping_id = require_uuid("mapping_id", &state.mapping_id)?;
        client
            .remove_team_external_group(ctx, team_id, mapping_id)
            .await
            .deleted("remove external group from team")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<TeamExternalGroupModel, Diagnostic> {
        let (id, team_id, mapping_id) = CompositeId::parse_uuids(id, &['/'], ("team_id", "mapping_id"))?;
        Ok(TeamExternalGroupModel {
            id: AttrValue::Known(id.encode()),
            mapping_id: AttrValue::Known(mapping_id.to_string()),
            team_id: AttrValue::Known(team_id.to_string()),
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
    const MAPPING: &str = "66666666-6666-6666-6666-666666666666";

    fn group() -> serde_json::Value {
        json!({"id": MAPPING, "teamId": TEAM, "groupIdentifier": "engineering"})
    }

    #[tokio::test]
    async fn test_name_form_is_refreshed() {
        let mock = MockTransport::new();
        let path = format!("/api/teams/{}/external-groups", TEAM);
        mock.respond(Method::POST, &path, 200, group());
        mock.respond(Method::GET, &path, 200, json!([group()]));
        let tester = configured_tester(&mock).await;

        let state = tester
            .lifecycle_create(
                "archestra_team_external_group",
                json!({"team_id": TEAM, "external_group_name": "engineering"}),
            )
            .await
            .unwrap();
        assert_eq!(state["id"], format!("{}/{}", TEAM, MAPPING));
        assert_eq!(state["external_group_name"], "engineering");
        assert!(state["external_group_id"].is_null());
    }

    #[tokio::test]
    async fn test_import_then_read() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            &format!("/api/teams/{}/external-groups", TEAM),
            200,
            json!([group()]),
        );
        let tester = configured_tester(&mock).await;

        let imported = tester
            .import_resource("archestra_team_external_group", &format!("{}/{}", TEAM, MAPPING))
            .await
            .unwrap();
        let state = tester
            .read("archestra_team_external_group", imported[0].state.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state["team_id"], TEAM);
        assert_eq!(state["mapping_id"], MAPPING);
        assert_eq!(state["external_group_id"], "engineering");
    }

    #[tokio::test]
    async fn test_both_identifiers_rejected() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;
        let err = tester
            .validate_resource_config(
                "archestra_team_external_group",
                json!({"team_id": TEAM, "external_group_id": "a", "external_group_name": "b"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("external_group_name"));
    }
}
