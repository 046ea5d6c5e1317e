//! `archestra_user_role_assignment`: the organization role of one user.
//!
//! Every user always has a role, so the resource owns the assignment rather
//! than an entity. Deleting it returns the user to `member`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::client::models::SetUserRole;
use crate::client::{ApiResult, ArchestraClient};
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

/// Predefined role slugs. Custom roles are referenced by UUID.
const PREDEFINED_ROLES: &[&str] = &["admin", "editor", "member"];

const DEFAULT_ROLE: &str = "member";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRoleAssignmentModel {
    pub id: AttrValue<String>,
    pub user_id: AttrValue<String>,
    pub role: AttrValue<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserRoleAssignmentResource {
    client: ClientSlot,
}

impl UserRoleAssignmentResource {
    async fn assign(
        &self,
        client: &ArchestraClient,
        ctx: &OpContext,
        user_id: Uuid,
        role: String,
        action: &str,
    ) -> Result<String, Diagnostic> {
        let user = client
            .set_user_role(ctx, user_id, &SetUserRole { role: role.clone() })
            .await
            .expect_ok(action)?;
        Ok(user.role.unwrap_or(role))
    }
}

#[async_trait]
impl Resource for UserRoleAssignmentResource {
    type Model = UserRoleAssignmentModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_user_role_assignment", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Assigns an organization role to a user.")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("Same as user_id")
                    .with_state_for_unknown(),
            )
            .with_attribute(
                "user_id",
                Attribute::required_string()
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "role",
                Attribute::required_string()
                    .with_description("Predefined role slug (admin, editor, member) or custom role ID"),
            )
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    fn validate(&self, config: &UserRoleAssignmentModel) -> Vec<Diagnostic> {
        match config.role.as_str() {
            Some(role) if !PREDEFINED_ROLES.contains(&role) && Uuid::parse_str(role).is_err() => {
                vec![Diagnostic::attribute_error(
                    "role",
                    "Invalid Role",
                    format!(
                        "Role must be one of {} or a custom role ID, got: \"{}\"",
                        PREDEFINED_ROLES.join(", "),
                        role
                    ),
                )]
            }
            _ => Vec::new(),
        }
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: UserRoleAssignmentModel,
    ) -> Result<UserRoleAssignmentModel, Diagnostic> {
        let client = self.client.get()?;
        let user_id = require_uuid("user_id", &plan.user_id)?;
        let role = plan.role.to_request().unwrap_or_default();

        let assigned = self.assign(client, ctx, user_id, role, "assign user role").await?;
        info!(user_id = %user_id, role = %assigned, "Assigned user role");

        plan.id = AttrValue::Known(user_id.to_string());
        plan.role = AttrValue::Known(assigned);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: UserRoleAssignmentModel,
    ) -> Result<Option<UserRoleAssignmentModel>, Diagnostic> {
        let client = self.client.get()?;
        let user_id = require_uuid("user_id", &state.user_id)?;
        let Some(user) = client.get_user(ctx, user_id).await.found("read user role")? else {
            return Ok(None);
        };
        state.id = AttrValue::Known(user.id.to_string());
        state.role = user.role.into();
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        _prior: UserRoleAssignmentModel,
        mut plan: UserRoleAssignmentModel,
    ) -> Result<UserRoleAssignmentModel, Diagnostic> {
        let client = self.client.get()?;
        let user_id = require_uuid("user_id", &plan.user_id)?;
        let role = plan.role.to_request().unwrap_or_default();
        plan.role = AttrValue::Known(self.assign(client, ctx, user_id, role, "update user role").await?);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: UserRoleAssignmentModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let user_id = require_uuid("user_id", &state.user_id)?;
        // A deleted user has no role left to reset.
        client
            .set_user_role(ctx, user_id, &SetUserRole { role: DEFAULT_ROLE.to_string() })
            .await
            .found("reset user role")?;
        info!(user_id = %user_id, "Reset user role to {}", DEFAULT_ROLE);
        Ok(())
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<UserRoleAssignmentModel, Diagnostic> {
        let user_id = parse_uuid("user_id", id)?.to_string();
        Ok(UserRoleAssignmentModel {
            id: AttrValue::Known(user_id.clone()),
            user_id: AttrValue::Known(user_id),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{assert_plan_updates_in_place, configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const USER: &str = "44444444-4444-4444-4444-444444444444";
    const CUSTOM_ROLE: &str = "f0000000-0000-0000-0000-000000000001";

    fn user(role: &str) -> serde_json::Value {
        json!({"id": USER, "email": "ada@example.com", "name": "Ada", "role": role})
    }

    #[tokio::test]
    async fn test_delete_resets_to_member() {
        let mock = MockTransport::new();
        let role_path = format!("/api/users/{}/role", USER);
        mock.respond_sequence(Method::PUT, &role_path, vec![(200, user("admin")), (200, user("member"))]);
        mock.respond(Method::GET, &format!("/api/users/{}", USER), 200, user("admin"));
        let tester = configured_tester(&mock).await;

        let state = tester
            .lifecycle_create("archestra_user_role_assignment", json!({"user_id": USER, "role": "admin"}))
            .await
            .unwrap();
        assert_eq!(state["id"], USER);
        assert_eq!(state["role"], "admin");

        tester
            .lifecycle_delete("archestra_user_role_assignment", state)
            .await
            .unwrap();
        let puts = mock.requests_to(Method::PUT, &role_path);
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[1].body, Some(json!({"role": "member"})));
    }

    #[tokio::test]
    async fn test_role_must_be_slug_or_uuid() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        tester
            .validate_resource_config(
                "archestra_user_role_assignment",
                json!({"user_id": USER, "role": CUSTOM_ROLE}),
            )
            .await
            .unwrap();
        let err = tester
            .validate_resource_config(
                "archestra_user_role_assignment",
                json!({"user_id": USER, "role": "owner"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].attribute.as_deref(), Some("role"));
        assert_eq!(err.diagnostics()[0].summary, "Invalid Role");
    }

    #[tokio::test]
    async fn test_role_change_updates_in_place() {
        let mock = MockTransport::new();
        mock.respond(Method::PUT, &format!("/api/users/{}/role", USER), 200, user(CUSTOM_ROLE));
        let tester = configured_tester(&mock).await;

        let prior = json!({"id": USER, "user_id": USER, "role": "member"});
        let config = json!({"user_id": USER, "role": CUSTOM_ROLE});
        let plan = tester
            .plan_update("archestra_user_role_assignment", prior.clone(), config.clone())
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);

        let state = tester
            .update("archestra_user_role_assignment", prior, plan.planned_state, config)
            .await
            .unwrap();
        assert_eq!(state["role"], CUSTOM_ROLE);
    }
}
