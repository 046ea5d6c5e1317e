//! `archestra_role`: a custom RBAC role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{Permissions, Role, RoleRequest};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleModel {
    pub id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub description: AttrValue<String>,
    pub permissions: AttrValue<Permissions>,
    pub role: AttrValue<String>,
    pub predefined: AttrValue<bool>,
    pub organization_id: AttrValue<String>,
}

impl RoleModel {
    pub(crate) fn apply(&mut self, role: Role) {
        self.id = AttrValue::Known(role.id.to_string());
        self.name = AttrValue::Known(role.name);
        self.description = role.description.into();
        self.permissions = AttrValue::Known(role.permissions);
        self.role = AttrValue::Known(role.role);
        self.predefined = AttrValue::Known(role.predefined);
        self.organization_id = role.organization_id.into();
    }

    fn request(&self) -> RoleRequest {
        RoleRequest {
            name: self.name.to_request().unwrap_or_default(),
            description: self.description.to_request(),
            permissions: self.permissions.to_request().unwrap_or_default(),
        }
    }
}

/// Attribute type of a permission map.
pub(crate) fn permissions_type() -> AttributeType {
    AttributeType::map(AttributeType::list(AttributeType::String))
}

#[derive(Debug, Clone, Default)]
pub struct RoleResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for RoleResource {
    type Model = RoleModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_role", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages a custom RBAC role.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("name", Attribute::required_string().with_description("Display name"))
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "permissions",
                Attribute::new(permissions_type(), AttributeFlags::required())
                    .with_description("Map of resource type to allowed actions"),
            )
            .with_attribute(
                "role",
                Attribute::computed_string()
                    .with_description("Slug derived from the name")
                    .with_state_for_unknown(),
            )
            .with_attribute("predefined", Attribute::computed_bool().with_state_for_unknown())
            .with_attribute("organization_id", Attribute::computed_string().with_state_for_unknown())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: RoleModel) -> Result<RoleModel, Diagnostic> {
        let client = self.client.get()?;
        let role = client.create_role(ctx, &plan.request()).await.expect_ok("create role")?;
        info!(id = %role.id, slug = %role.role, "Created role");
        plan.apply(role);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: RoleModel) -> Result<Option<RoleModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(role) = client.get_role(ctx, id).await.found("read role")? else {
            return Ok(None);
        };
        state.apply(role);
        Ok(Some(state))
    }

    async fn update(&self, ctx: &OpContext, prior: RoleModel, mut plan: RoleModel) -> Result<RoleModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let role = client
            .update_role(ctx, id, &plan.request())
            .await
            .expect_ok("update role")?;
        plan.apply(role);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: RoleModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client.delete_role(ctx, id).await.deleted("delete role")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<RoleModel, Diagnostic> {
        Ok(RoleModel {
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

    const ROLE: &str = "f0000000-0000-0000-0000-000000000001";

    #[tokio::test]
    async fn test_create_role_with_permissions() {
        let mock = MockTransport::new();
        let response = json!({
            "id": ROLE,
            "name": "Auditor",
            "role": "auditor",
            "permissions": {"agent": ["read"], "team": ["read", "update"]},
            "predefined": false,
            "organizationId": "org-1",
        });
        mock.respond(Method::POST, "/api/roles", 200, response.clone());
        mock.respond(Method::GET, &format!("/api/roles/{}", ROLE), 200, response);
        let tester = configured_tester(&mock).await;

        let config = json!({
            "name": "Auditor",
            "permissions": {"agent": ["read"], "team": ["read", "update"]},
        });
        tester.validate_resource_config("archestra_role", config.clone()).await.unwrap();
        let state = tester.lifecycle_create("archestra_role", config).await.unwrap();

        assert_eq!(state["role"], "auditor");
        assert_eq!(state["predefined"], false);
        assert_eq!(state["permissions"]["team"], json!(["read", "update"]));
        assert!(state["description"].is_null());

        let body = mock.requests()[0].body.clone().unwrap();
        assert!(body.get("description").is_none());
    }
}
