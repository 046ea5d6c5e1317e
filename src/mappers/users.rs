//! User state and lookup shared by the `user` resource and data source.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::models::User;
use crate::client::{ApiResult, ArchestraClient};
use crate::context::OpContext;
use crate::schema::Diagnostic;
use crate::value::AttrValue;

/// Read-surfaced user attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAttrs {
    pub id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub email: AttrValue<String>,
    pub email_verified: AttrValue<bool>,
    pub image: AttrValue<String>,
    pub role: AttrValue<String>,
    pub banned: AttrValue<bool>,
    pub ban_reason: AttrValue<String>,
}

impl UserAttrs {
    /// Overwrite from a response.
    pub fn apply(&mut self, user: &User) {
        self.id = AttrValue::Known(user.id.to_string());
        self.name = AttrValue::Known(user.name.clone());
        self.email = AttrValue::Known(user.email.clone());
        self.email_verified = AttrValue::Known(user.email_verified);
        self.image = user.image.clone().into();
        self.role = user.role.clone().into();
        // The service leaves `banned` out for users that were never banned.
        self.banned = AttrValue::Known(user.banned.unwrap_or(false));
        self.ban_reason = user.ban_reason.clone().into();
    }

    /// Build from a response alone.
    pub fn from_user(user: &User) -> Self {
        let mut attrs = Self::default();
        attrs.apply(user);
        attrs
    }
}

/// Look a user up by id, or else by exact email. `Ok(None)` when absent.
pub async fn find_user(
    client: &ArchestraClient,
    ctx: &OpContext,
    id: Option<Uuid>,
    email: Option<&str>,
) -> Result<Option<User>, Diagnostic> {
    if let Some(id) = id {
        return client.get_user(ctx, id).await.found("read user by ID");
    }
    if let Some(email) = email {
        let users = client
            .find_users_by_email(ctx, email)
            .await
            .found("read user by email")?
            .unwrap_or_default();
        return Ok(users.into_iter().find(|u| u.email.eq_ignore_ascii_case(email)));
    }
    Err(Diagnostic::error("Missing User Identifier").with_detail("One of 'id' or 'email' must be provided"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use reqwest::Method;
    use serde_json::json;

    const USER: &str = "44444444-4444-4444-4444-444444444444";

    fn user_json(email: &str) -> serde_json::Value {
        json!({"id": USER, "email": email, "name": "Ada", "emailVerified": true})
    }

    #[test]
    fn test_apply_defaults_banned() {
        let user: User = serde_json::from_value(user_json("ada@example.com")).unwrap();
        let attrs = UserAttrs::from_user(&user);
        assert_eq!(attrs.banned, AttrValue::Known(false));
        assert!(attrs.image.is_null());
        assert_eq!(attrs.email_verified, AttrValue::Known(true));
    }

    #[tokio::test]
    async fn test_find_user_by_email_matches_exactly() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/users",
            200,
            json!([user_json("ada.lovelace@example.com"), user_json("ada@example.com")]),
        );
        let client = mock.client();

        let found = find_user(&client, &OpContext::new(), None, Some("ADA@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.email, "ada@example.com");

        let request = &mock.requests()[0];
        assert_eq!(request.query, vec![("email".to_string(), "ADA@example.com".to_string())]);
    }

    #[tokio::test]
    async fn test_find_user_by_id_not_found() {
        let mock = MockTransport::new();
        mock.respond(Method::GET, &format!("/api/users/{}", USER), 404, json!({}));
        let found = find_user(&mock.client(), &OpContext::new(), Some(USER.parse().unwrap()), None)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
