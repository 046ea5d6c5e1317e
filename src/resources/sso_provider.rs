//! `archestra_sso_provider`: an OIDC or SAML identity provider.
//!
//! The service may omit secrets (`client_secret`, `cert`) from responses.
//! When it does, state keeps the previously written value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{
    OidcConfig, RoleMapping, RoleMappingRule, SamlConfig, SsoProvider, SsoProviderRequest, TeamSyncConfig,
};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, AttributeFlags, AttributeType, ConfigValidator, Diagnostic, Schema};
use crate::value::{empty_as_null, AttrValue, Sensitive};

const TOKEN_ENDPOINT_AUTHENTICATION: &[&str] = &["client_secret_basic", "client_secret_post"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfigModel {
    pub client_id: String,
    pub client_secret: Option<Sensitive<String>>,
    pub discovery_endpoint: Option<String>,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub user_info_endpoint: Option<String>,
    pub jwks_endpoint: Option<String>,
    pub token_endpoint_authentication: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub pkce: Option<bool>,
}

impl OidcConfigModel {
    fn from_response(config: OidcConfig, prior: Option<&OidcConfigModel>) -> Self {
        let client_secret = config
            .client_secret
            .filter(|s| !s.is_empty())
            .map(Sensitive::new)
            .or_else(|| prior.and_then(|p| p.client_secret.clone()));
        Self {
            client_id: config.client_id,
            client_secret,
            discovery_endpoint: config.discovery_endpoint,
            authorization_endpoint: config.authorization_endpoint,
            token_endpoint: config.token_endpoint,
            user_info_endpoint: config.user_info_endpoint,
            jwks_endpoint: config.jwks_endpoint,
            token_endpoint_authentication: config.token_endpoint_authentication,
            scopes: config.scopes,
            pkce: config.pkce,
        }
    }

    fn to_request(&self) -> OidcConfig {
        OidcConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.as_ref().map(|s| s.expose().clone()),
            discovery_endpoint: self.discovery_endpoint.clone(),
            authorization_endpoint: self.authorization_endpoint.clone(),
            token_endpoint: self.token_endpoint.clone(),
            user_info_endpoint: self.user_info_endpoint.clone(),
            jwks_endpoint: self.jwks_endpoint.clone(),
            token_endpoint_authentication: self.token_endpoint_authentication.clone(),
            scopes: self.scopes.clone(),
            pkce: self.pkce,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamlConfigModel {
    pub entry_point: Option<String>,
    pub cert: Option<Sensitive<String>>,
    pub callback_url: Option<String>,
    pub audience: Option<String>,
    pub idp_metadata: Option<String>,
    pub sp_metadata: Option<String>,
    pub want_assertions_signed: Option<bool>,
}

impl SamlConfigModel {
    fn from_response(config: SamlConfig, prior: Option<&SamlConfigModel>) -> Self {
        let cert = config
            .cert
            .filter(|s| !s.is_empty())
            .map(Sensitive::new)
            .or_else(|| prior.and_then(|p| p.cert.clone()));
        Self {
            entry_point: config.entry_point,
            cert,
            callback_url: config.callback_url,
            audience: config.audience,
            idp_metadata: config.idp_metadata,
            sp_metadata: config.sp_metadata,
            want_assertions_signed: config.want_assertions_signed,
        }
    }

    fn to_request(&self) -> SamlConfig {
        SamlConfig {
            entry_point: self.entry_point.clone(),
            cert: self.cert.as_ref().map(|s| s.expose().clone()),
            callback_url: self.callback_url.clone(),
            audience: self.audience.clone(),
            idp_metadata: self.idp_metadata.clone(),
            sp_metadata: self.sp_metadata.clone(),
            want_assertions_signed: self.want_assertions_signed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMappingRuleModel {
    pub expression: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMappingModel {
    pub rules: Option<Vec<RoleMappingRuleModel>>,
    pub default_role: Option<String>,
    pub strict_mode: Option<bool>,
    pub skip_role_sync: Option<bool>,
}

impl From<RoleMapping> for RoleMappingModel {
    fn from(mapping: RoleMapping) -> Self {
        Self {
            rules: mapping.rules.map(|rules| {
                rules
                    .into_iter()
                    .map(|r| RoleMappingRuleModel {
                        expression: r.expression,
                        role: r.role,
                    })
                    .collect()
            }),
            default_role: mapping.default_role,
            strict_mode: mapping.strict_mode,
            skip_role_sync: mapping.skip_role_sync,
        }
    }
}

impl From<&RoleMappingModel> for RoleMapping {
    fn from(model: &RoleMappingModel) -> Self {
        Self {
            rules: model.rules.as_ref().map(|rules| {
                rules
                    .iter()
                    .map(|r| RoleMappingRule {
                        expression: r.expression.clone(),
                        role: r.role.clone(),
                    })
                    .collect()
            }),
            default_role: model.default_role.clone(),
            strict_mode: model.strict_mode,
            skip_role_sync: model.skip_role_sync,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSyncConfigModel {
    pub enabled: Option<bool>,
    pub groups_expression: Option<String>,
}

impl From<TeamSyncConfig> for TeamSyncConfigModel {
    fn from(config: TeamSyncConfig) -> Self {
        Self {
            enabled: config.enabled,
            groups_expression: config.groups_expression,
        }
    }
}

impl From<&TeamSyncConfigModel> for TeamSyncConfig {
    fn from(model: &TeamSyncConfigModel) -> Self {
        Self {
            enabled: model.enabled,
            groups_expression: model.groups_expression.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoProviderModel {
    pub id: AttrValue<String>,
    pub provider_id: AttrValue<String>,
    pub domain: AttrValue<String>,
    pub issuer: AttrValue<String>,
    pub domain_verified: AttrValue<bool>,
    pub oidc_config: AttrValue<OidcConfigModel>,
    pub saml_config: AttrValue<SamlConfigModel>,
    pub role_mapping: AttrValue<RoleMappingModel>,
    pub team_sync_config: AttrValue<TeamSyncConfigModel>,
}

impl SsoProviderModel {
    fn apply(&mut self, provider: SsoProvider) {
        self.id = AttrValue::Known(provider.id);
        self.provider_id = AttrValue::Known(provider.provider_id);
        self.domain = empty_as_null(provider.domain);
        self.issuer = empty_as_null(provider.issuer);
        self.domain_verified = provider.domain_verified.into();

        let prior_oidc = self.oidc_config.as_known().cloned();
        self.oidc_config = provider
            .oidc_config
            .map(|c| OidcConfigModel::from_response(c, prior_oidc.as_ref()))
            .into();
        let prior_saml = self.saml_config.as_known().cloned();
        self.saml_config = provider
            .saml_config
            .map(|c| SamlConfigModel::from_response(c, prior_saml.as_ref()))
            .into();

        self.role_mapping = provider.role_mapping.map(RoleMappingModel::from).into();
        self.team_sync_config = provider.team_sync_config.map(TeamSyncConfigModel::from).into();
    }

    fn request(&self) -> SsoProviderRequest {
        SsoProviderRequest {
            provider_id: self.provider_id.to_request().unwrap_or_default(),
            domain: self.domain.to_request(),
            issuer: self.issuer.to_request(),
            oidc_config: self.oidc_config.as_known().map(OidcConfigModel::to_request),
            saml_config: self.saml_config.as_known().map(SamlConfigModel::to_request),
            role_mapping: self.role_mapping.as_known().map(RoleMapping::from),
            team_sync_config: self.team_sync_config.as_known().map(TeamSyncConfig::from),
        }
    }
}

/// Ids are server-assigned and free-form; dot segments cannot address one.
fn usable_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".."
}

fn require_id(id: &AttrValue<String>) -> Result<&str, Diagnostic> {
    match id.as_str() {
        Some(id) if usable_id(id) => Ok(id),
        Some(id) => Err(Diagnostic::attribute_error(
            "id",
            "Invalid ID",
            format!("'{}' is not a valid SSO provider ID", id),
        )),
        None => Err(Diagnostic::attribute_error("id", "Invalid ID", "SSO provider ID is not set")),
    }
}

fn oidc_config_type() -> AttributeType {
    AttributeType::object([
        ("client_id", AttributeType::String),
        ("client_secret", AttributeType::String),
        ("discovery_endpoint", AttributeType::String),
        ("authorization_endpoint", AttributeType::String),
        ("token_endpoint", AttributeType::String),
        ("user_info_endpoint", AttributeType::String),
        ("jwks_endpoint", AttributeType::String),
        ("token_endpoint_authentication", AttributeType::String),
        ("scopes", AttributeType::list(AttributeType::String)),
        ("pkce", AttributeType::Bool),
    ])
}

fn saml_config_type() -> AttributeType {
    AttributeType::object([
        ("entry_point", AttributeType::String),
        ("cert", AttributeType::String),
        ("callback_url", AttributeType::String),
        ("audience", AttributeType::String),
        ("idp_metadata", AttributeType::String),
        ("sp_metadata", AttributeType::String),
        ("want_assertions_signed", AttributeType::Bool),
    ])
}

fn role_mapping_type() -> AttributeType {
    AttributeType::object([
        (
            "rules",
            AttributeType::list(AttributeType::object([
                ("expression", AttributeType::String),
                ("role", AttributeType::String),
            ])),
        ),
        ("default_role", AttributeType::String),
        ("strict_mode", AttributeType::Bool),
        ("skip_role_sync", AttributeType::Bool),
    ])
}

fn team_sync_config_type() -> AttributeType {
    AttributeType::object([
        ("enabled", AttributeType::Bool),
        ("groups_expression", AttributeType::String),
    ])
}

#[derive(Debug, Clone, Default)]
pub struct SsoProviderResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for SsoProviderResource {
    type Model = SsoProviderModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_sso_provider", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages an SSO identity provider.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute(
                "provider_id",
                Attribute::required_string()
                    .with_description("User-chosen identifier of the provider")
                    .with_requires_replace(),
            )
            .with_attribute(
                "domain",
                Attribute::optional_computed_string().with_description("Email domain routed to this provider"),
            )
            .with_attribute("issuer", Attribute::optional_computed_string())
            .with_attribute("domain_verified", Attribute::computed_bool())
            .with_attribute(
                "oidc_config",
                Attribute::new(oidc_config_type(), AttributeFlags::optional().sensitive())
                    .with_description("OIDC settings; conflicts with saml_config"),
            )
            .with_attribute(
                "saml_config",
                Attribute::new(saml_config_type(), AttributeFlags::optional().sensitive())
                    .with_description("SAML settings; conflicts with oidc_config"),
            )
            .with_attribute("role_mapping", Attribute::new(role_mapping_type(), AttributeFlags::optional()))
            .with_attribute(
                "team_sync_config",
                Attribute::new(team_sync_config_type(), AttributeFlags::optional()),
            )
            .with_config_validator(ConfigValidator::ExactlyOneOf(vec!["oidc_config", "saml_config"]))
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    fn validate(&self, config: &SsoProviderModel) -> Vec<Diagnostic> {
        let Some(auth) = config
            .oidc_config
            .as_known()
            .and_then(|c| c.token_endpoint_authentication.as_deref())
        else {
            return Vec::new();
        };
        if TOKEN_ENDPOINT_AUTHENTICATION.contains(&auth) {
            return Vec::new();
        }
        vec![Diagnostic::attribute_error(
            "oidc_config.token_endpoint_authentication",
            "Invalid Attribute Value Match",
            format!(
                "Attribute oidc_config.token_endpoint_authentication value must be one of: [{}], got: \"{}\"",
                TOKEN_ENDPOINT_AUTHENTICATION.join(" "),
                auth
            ),
        )]
    }

    async fn create(&self, ctx: &OpContext, mut plan: SsoProviderModel) -> Result<SsoProviderModel, Diagnostic> {
        let client = self.client.get()?;
        let provider = client
            .create_sso_provider(ctx, &plan.request())
            .await
            .expect_ok("create SSO provider")?;
        info!(id = %provider.id, provider_id = %provider.provider_id, "Created SSO provider");
        plan.apply(provider);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: SsoProviderModel) -> Result<Option<SsoProviderModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_id(&state.id)?;
        let Some(provider) = client.get_sso_provider(ctx, id).await.found("read SSO provider")? else {
            return Ok(None);
        };
        state.apply(provider);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        prior: SsoProviderModel,
        mut plan: SsoProviderModel,
    ) -> Result<SsoProviderModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_id(&prior.id)?;
        let provider = client
            .update_sso_provider(ctx, id, &plan.request())
            .await
            .expect_ok("update SSO provider")?;
        plan.apply(provider);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: SsoProviderModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_id(&state.id)?;
        client.delete_sso_provider(ctx, id).await.deleted("delete SSO provider")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<SsoProviderModel, Diagnostic> {
        if !usable_id(id) {
            return Err(Diagnostic::error("Invalid Import ID").with_detail("Expected the SSO provider ID"));
        }
        Ok(SsoProviderModel {
            id: AttrValue::string(id),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::{json, Value};

    fn oidc_config(secret: Value) -> Value {
        json!({
            "client_id": "client",
            "client_secret": secret,
            "discovery_endpoint": "https://idp.example.com/.well-known/openid-configuration",
            "authorization_endpoint": null,
            "token_endpoint": null,
            "user_info_endpoint": null,
            "jwks_endpoint": null,
            "token_endpoint_authentication": "client_secret_post",
            "scopes": ["openid", "email"],
            "pkce": true,
        })
    }

    fn remote() -> Value {
        json!({
            "id": "sso-1",
            "providerId": "okta",
            "domain": "example.com",
            "issuer": "",
            "domainVerified": false,
            "oidcConfig": {
                "clientId": "client",
                "discoveryEndpoint": "https://idp.example.com/.well-known/openid-configuration",
                "tokenEndpointAuthentication": "client_secret_post",
                "scopes": ["openid", "email"],
                "pkce": true,
            },
        })
    }

    #[tokio::test]
    async fn test_client_secret_survives_read() {
        let mock = MockTransport::new();
        mock.respond(Method::POST, "/api/identity-providers", 200, remote());
        mock.respond(Method::GET, "/api/identity-providers/sso-1", 200, remote());
        let tester = configured_tester(&mock).await;

        let config = json!({
            "provider_id": "okta",
            "domain": "example.com",
            "oidc_config": oidc_config(json!("s3cret")),
        });
        let state = tester.lifecycle_create("archestra_sso_provider", config).await.unwrap();

        assert_eq!(state["id"], "sso-1");
        assert_eq!(state["oidc_config"]["client_secret"], "s3cret");
        assert!(state["issuer"].is_null());
        assert!(state["saml_config"].is_null());

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["oidcConfig"]["clientSecret"], "s3cret");
        assert!(body.get("samlConfig").is_none());
    }

    #[tokio::test]
    async fn test_requires_exactly_one_protocol() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let err = tester
            .validate_resource_config("archestra_sso_provider", json!({"provider_id": "okta"}))
            .await
            .unwrap_err();
        assert!(!err.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_token_endpoint_authentication_is_checked() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let mut oidc = oidc_config(json!("s3cret"));
        oidc["token_endpoint_authentication"] = json!("private_key_jwt");
        let err = tester
            .validate_resource_config("archestra_sso_provider", json!({"provider_id": "okta", "oidc_config": oidc}))
            .await
            .unwrap_err();
        assert_eq!(
            err.diagnostics()[0].attribute.as_deref(),
            Some("oidc_config.token_endpoint_authentication")
        );
    }

    #[tokio::test]
    async fn test_changing_provider_id_replaces() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;
        let prior = json!({
            "id": "sso-1", "provider_id": "okta", "domain": "example.com", "issuer": null,
            "domain_verified": false, "oidc_config": oidc_config(json!("s3cret")),
            "saml_config": null, "role_mapping": null, "team_sync_config": null,
        });
        let plan = tester
            .plan_update(
                "archestra_sso_provider",
                prior,
                json!({"provider_id": "azure", "domain": "example.com", "oidc_config": oidc_config(json!("s3cret"))}),
            )
            .await
            .unwrap();
        assert_eq!(plan.requires_replace, vec!["provider_id".to_string()]);
    }

    #[tokio::test]
    async fn test_imported_id_is_escaped_in_request_path() {
        let id = "x/../../users/u1";
        let mut found = remote();
        found["id"] = json!(id);
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/identity-providers/x%2F..%2F..%2Fusers%2Fu1",
            200,
            found,
        );
        let tester = configured_tester(&mock).await;

        let imported = tester.import_resource("archestra_sso_provider", id).await.unwrap();
        let state = tester
            .read("archestra_sso_provider", imported[0].state.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state["id"], id);
        assert_eq!(state["provider_id"], "okta");
        let paths: Vec<String> = mock.requests().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec!["/api/identity-providers/x%2F..%2F..%2Fusers%2Fu1".to_string()]);
    }

    #[tokio::test]
    async fn test_dot_segment_import_is_rejected() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let err = tester.import_resource("archestra_sso_provider", "..").await.unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Invalid Import ID");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_without_id_is_an_error() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;
        let state = json!({
            "id": null, "provider_id": "okta", "domain": "example.com", "issuer": null,
            "domain_verified": false, "oidc_config": oidc_config(json!("s3cret")),
            "saml_config": null, "role_mapping": null, "team_sync_config": null,
        });

        let err = tester.delete("archestra_sso_provider", state).await.unwrap_err();
        let diagnostic = &err.diagnostics()[0];
        assert_eq!(diagnostic.summary, "Invalid ID");
        assert_eq!(diagnostic.attribute.as_deref(), Some("id"));
        assert!(mock.requests().is_empty());
    }
}
