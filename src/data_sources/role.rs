//! `archestra_role`: a predefined or custom role looked up by id or name.

use async_trait::async_trait;

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::ids::optional_uuid;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::resources::role::{permissions_type, RoleModel};
use crate::schema::{Attribute, AttributeFlags, ConfigValidator, Diagnostic, Schema};

#[derive(Debug, Clone, Default)]
pub struct RoleDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for RoleDataSource {
    type Model = RoleModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_role", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Looks up a role by id, or by display name or slug.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("permissions", Attribute::new(permissions_type(), AttributeFlags::computed()))
            .with_attribute("role", Attribute::computed_string())
            .with_attribute("predefined", Attribute::computed_bool())
            .with_attribute("organization_id", Attribute::computed_string())
            .with_config_validator(ConfigValidator::ExactlyOneOf(vec!["id", "name"]))
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: RoleModel) -> Result<RoleModel, Diagnostic> {
        let client = self.client.get()?;

        let role = if let Some(id) = optional_uuid("id", &config.id)? {
            client
                .get_role(ctx, id)
                .await
                .found("read role")?
                .ok_or_else(|| not_found(format!("No role with id {}", id)))?
        } else {
            let name = config.name.as_str().unwrap_or_default();
            client
                .list_roles(ctx)
                .await
                .expect_ok("list roles")?
                .into_iter()
                .find(|r| r.name == name || r.role == name)
                .ok_or_else(|| not_found(format!("No role named '{}'", name)))?
        };

        config.apply(role);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_predefined_role_by_slug() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/roles",
            200,
            json!([
                {"id": "c1000000-0000-0000-0000-000000000001", "name": "Admin", "role": "admin",
                 "permissions": {"agent": ["admin"]}, "predefined": true},
                {"id": "c1000000-0000-0000-0000-000000000002", "name": "Member", "role": "member",
                 "predefined": true},
            ]),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source("archestra_role", json!({"name": "member"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "c1000000-0000-0000-0000-000000000002");
        assert_eq!(state["name"], "Member");
        assert_eq!(state["predefined"], true);
        assert_eq!(state["permissions"], json!({}));
        assert!(state["organization_id"].is_null());
    }
}
