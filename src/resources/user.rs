//! `archestra_user`.
//!
//! The password is write-only: it is sent on create and whenever the planned
//! value differs from state, and is never read back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{CreateUser, UpdateUser, User};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::mappers::users::UserAttrs;
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::{AttrValue, Sensitive};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserModel {
    #[serde(flatten)]
    pub user: UserAttrs,
    pub password: AttrValue<Sensitive<String>>,
}

impl UserModel {
    fn password(&self) -> Option<String> {
        self.password.as_known().map(|p| p.expose().clone())
    }

    fn patch(&self, prior: &UserModel) -> UpdateUser {
        let password_changed = prior.password != self.password;
        UpdateUser {
            email: self.user.email.to_request(),
            name: self.user.name.to_request(),
            password: self.password().filter(|_| password_changed),
            email_verified: self.user.email_verified.to_request(),
            image: self.user.image.to_request(),
            banned: self.user.banned.to_request(),
            ban_reason: self.user.ban_reason.to_request(),
        }
    }

    fn apply(&mut self, user: &User) {
        let role = self.user.role.clone();
        self.user.apply(user);
        if user.role.is_none() && role.is_known() {
            self.user.role = role;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for UserResource {
    type Model = UserModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_user", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages an Archestra user.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("email", Attribute::required_string())
            .with_attribute(
                "password",
                Attribute::required_string()
                    .with_description("Initial password. Never read back from the service.")
                    .sensitive(),
            )
            .with_attribute(
                "email_verified",
                Attribute::optional_bool().with_default(serde_json::json!(false)),
            )
            .with_attribute("image", Attribute::optional_string().with_description("Profile image URL"))
            .with_attribute(
                "role",
                Attribute::optional_computed_string()
                    .with_description("Organization role slug")
                    .with_state_for_unknown(),
            )
            .with_attribute("banned", Attribute::optional_bool().with_default(serde_json::json!(false)))
            .with_attribute("ban_reason", Attribute::optional_string())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: UserModel) -> Result<UserModel, Diagnostic> {
        let client = self.client.get()?;
        let body = CreateUser {
            email: plan.user.email.to_request().unwrap_or_default(),
            name: plan.user.name.to_request().unwrap_or_default(),
            password: plan.password().unwrap_or_default(),
            email_verified: plan.user.email_verified.to_request(),
            image: plan.user.image.to_request(),
            role: plan.user.role.to_request(),
        };
        let mut user = client.create_user(ctx, &body).await.expect_ok("create user")?;
        info!(id = %user.id, "Created user");

        // Ban state is not part of the create body.
        if plan.user.banned.as_known() == Some(&true) || plan.user.ban_reason.is_known() {
            let patch = UpdateUser {
                banned: plan.user.banned.to_request(),
                ban_reason: plan.user.ban_reason.to_request(),
                ..Default::default()
            };
            user = client
                .update_user(ctx, user.id, &patch)
                .await
                .expect_ok("set user ban state")?;
        }

        plan.apply(&user);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: UserModel) -> Result<Option<UserModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.user.id)?;
        let Some(user) = client.get_user(ctx, id).await.found("read user")? else {
            return Ok(None);
        };
        state.apply(&user);
        Ok(Some(state))
    }

    async fn update(&self, ctx: &OpContext, prior: UserModel, mut plan: UserModel) -> Result<UserModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.user.id)?;
        let user = client
            .update_user(ctx, id, &plan.patch(&prior))
            .await
            .expect_ok("update user")?;
        plan.apply(&user);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: UserModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.user.id)?;
        client.delete_user(ctx, id).await.deleted("delete user")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<UserModel, Diagnostic> {
        Ok(UserModel {
            user: UserAttrs {
                id: AttrValue::Known(parse_uuid("id", id)?.to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const USER: &str = "44444444-4444-4444-4444-444444444444";

    fn user(name: &str) -> serde_json::Value {
        json!({"id": USER, "email": "ada@example.com", "name": name, "emailVerified": false, "role": "member"})
    }

    #[tokio::test]
    async fn test_password_is_write_only() {
        let mock = MockTransport::new();
        mock.respond(Method::POST, "/api/users", 200, user("Ada"));
        mock.respond(Method::GET, &format!("/api/users/{}", USER), 200, user("Ada"));
        let tester = configured_tester(&mock).await;

        let config = json!({"name": "Ada", "email": "ada@example.com", "password": "hunter22"});
        let state = tester.lifecycle_create("archestra_user", config).await.unwrap();

        assert_eq!(state["password"], "hunter22");
        assert_eq!(state["role"], "member");
        assert_eq!(state["banned"], false);
        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["password"], "hunter22");
        assert_eq!(mock.requests_to(Method::PATCH, &format!("/api/users/{}", USER)).len(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_password_is_not_resent() {
        let mock = MockTransport::new();
        mock.respond(Method::PATCH, &format!("/api/users/{}", USER), 200, user("Ada L."));
        let tester = configured_tester(&mock).await;

        let prior = json!({
            "id": USER, "name": "Ada", "email": "ada@example.com", "password": "hunter22",
            "email_verified": false, "image": null, "role": "member", "banned": false, "ban_reason": null,
        });
        let config = json!({"name": "Ada L.", "email": "ada@example.com", "password": "hunter22"});
        let plan = tester.plan_update("archestra_user", prior.clone(), config.clone()).await.unwrap();
        let password_change = plan.changes.iter().find(|c| c.path == "password");
        assert!(password_change.is_none());

        let state = tester
            .update("archestra_user", prior, plan.planned_state, config)
            .await
            .unwrap();
        assert_eq!(state["name"], "Ada L.");
        let body = mock.requests()[0].body.clone().unwrap();
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_ban_is_applied_after_create() {
        let mock = MockTransport::new();
        mock.respond(Method::POST, "/api/users", 200, user("Ada"));
        let mut banned = user("Ada");
        banned["banned"] = json!(true);
        banned["banReason"] = json!("spam");
        mock.respond(Method::PATCH, &format!("/api/users/{}", USER), 200, banned);
        let tester = configured_tester(&mock).await;

        let config = json!({
            "name": "Ada", "email": "ada@example.com", "password": "pw",
            "banned": true, "ban_reason": "spam",
        });
        let plan = tester.plan_create("archestra_user", config.clone()).await.unwrap();
        let state = tester.create("archestra_user", plan.planned_state, config).await.unwrap();
        assert_eq!(state["banned"], true);
        assert_eq!(state["ban_reason"], "spam");

        let patch = mock.requests()[1].body.clone().unwrap();
        assert_eq!(patch, json!({"banned": true, "banReason": "spam"}));
    }
}
