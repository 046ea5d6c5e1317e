//! `archestra_user`: a user looked up by id or email.

use async_trait::async_trait;

use crate::context::OpContext;
use crate::data_sources::not_found;
use crate::ids::optional_uuid;
use crate::mappers::users::{find_user, UserAttrs};
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::schema::{Attribute, ConfigValidator, Diagnostic, Schema};

#[derive(Debug, Clone, Default)]
pub struct UserDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for UserDataSource {
    type Model = UserAttrs;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_user", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Looks up a user by id or email.")
            .with_attribute("id", Attribute::optional_computed_string())
            .with_attribute(
                "email",
                Attribute::optional_computed_string().with_description("Matched case-insensitively"),
            )
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("email_verified", Attribute::computed_bool())
            .with_attribute("image", Attribute::computed_string())
            .with_attribute("role", Attribute::computed_string())
            .with_attribute("banned", Attribute::computed_bool())
            .with_attribute("ban_reason", Attribute::computed_string())
            .with_config_validator(ConfigValidator::ExactlyOneOf(vec!["id", "email"]))
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: UserAttrs) -> Result<UserAttrs, Diagnostic> {
        let client = self.client.get()?;
        let id = optional_uuid("id", &config.id)?;
        let email = config.email.as_str();

        let Some(user) = find_user(client, ctx, id, email).await? else {
            let key = match id {
                Some(id) => format!("id {}", id),
                None => format!("email '{}'", email.unwrap_or_default()),
            };
            return Err(not_found(format!("No user with {}", key)));
        };

        config.apply(&user);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_lookup_by_email() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/users",
            200,
            json!([{
                "id": "f2000000-0000-0000-0000-000000000001",
                "email": "Ada@Example.com",
                "name": "Ada",
                "role": "admin",
            }]),
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source("archestra_user", json!({"email": "ada@example.com"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "f2000000-0000-0000-0000-000000000001");
        assert_eq!(state["role"], "admin");
        assert_eq!(state["banned"], false);

        let request = &mock.requests_to(Method::GET, "/api/users")[0];
        assert_eq!(request.query, vec![("email".to_string(), "ada@example.com".to_string())]);
    }

    #[tokio::test]
    async fn test_unknown_email_is_not_found() {
        let mock = MockTransport::new();
        mock.respond(Method::GET, "/api/users", 200, json!([]));
        let tester = configured_tester(&mock).await;

        let err = tester
            .read_data_source("archestra_user", json!({"email": "nobody@example.com"}))
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Not Found");
        assert!(err.diagnostics()[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("nobody@example.com"));
    }
}
