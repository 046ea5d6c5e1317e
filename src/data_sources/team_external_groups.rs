//! `archestra_team_external_groups`: the identity-provider groups mapped onto
//! a team.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::models::TeamExternalGroup;
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::ids::require_uuid;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalGroupModel {
    pub id: String,
    pub group_identifier: String,
    pub created_at: Option<String>,
}

impl From<TeamExternalGroup> for ExternalGroupModel {
    fn from(group: TeamExternalGroup) -> Self {
        Self {
            id: group.id.to_string(),
            group_identifier: group.group_identifier,
            created_at: group.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamExternalGroupsModel {
    pub team_id: AttrValue<String>,
    pub groups: AttrValue<Vec<ExternalGroupModel>>,
}

#[derive(Debug, Clone, Default)]
pub struct TeamExternalGroupsDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for TeamExternalGroupsDataSource {
    type Model = TeamExternalGroupsModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_team_external_groups", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let group = AttributeType::object([
            ("id", AttributeType::String),
            ("group_identifier", AttributeType::String),
            ("created_at", AttributeType::String),
        ]);
        Schema::v0()
            .with_description("Lists the external groups mapped onto a team.")
            .with_attribute("team_id", Attribute::required_string().with_validator(Validator::Uuid))
            .with_attribute("groups", Attribute::new(AttributeType::list(group), AttributeFlags::computed()))
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut config: TeamExternalGroupsModel,
    ) -> Result<TeamExternalGroupsModel, Diagnostic> {
        let client = self.client.get()?;
        let team_id = require_uuid("team_id", &config.team_id)?;
        let groups = client
            .list_team_external_groups(ctx, team_id)
            .await
            .found("list team external groups")?
            .ok_or_else(|| not_found(format!("No team with id {}", team_id)))?;

        config.groups = AttrValue::Known(groups.into_iter().map(ExternalGroupModel::from).collect());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::{json, Value};

    const TEAM: &str = "e2000000-0000-0000-0000-000000000001";

    #[tokio::test]
    async fn test_lists_group_mappings() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            &format!("/api/teams/{}/external-groups", TEAM),
            200,
            json!([{
                "id": "e3000000-0000-0000-0000-000000000001",
                "teamId": TEAM,
                "groupIdentifier": "cn=eng,ou=groups",
            }]),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source("archestra_team_external_groups", json!({"team_id": TEAM}))
            .await
            .unwrap();
        assert_eq!(
            state["groups"],
            json!([{
                "id": "e3000000-0000-0000-0000-000000000001",
                "group_identifier": "cn=eng,ou=groups",
                "created_at": null,
            }])
        );
    }

    #[tokio::test]
    async fn test_missing_team_is_not_found() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            &format!("/api/teams/{}/external-groups", TEAM),
            404,
            Value::Null,
        );
        let tester = configured_tester(&mock).await;

        let err = tester
            .read_data_source("archestra_team_external_groups", json!({"team_id": TEAM}))
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Not Found");
    }
}
