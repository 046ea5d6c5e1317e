//! Named request and response records for the Archestra API.
//!
//! One record per entity, shared by resource and data source handlers. The
//! service speaks camelCase JSON. Optional request fields are omitted rather
//! than sent as null.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered `{key, value}` agent label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label key.
    pub key: String,
    /// Label value.
    pub value: String,
}

/// An agent (profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Create/update body for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub name: String,
    pub labels: Vec<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

/// Tool identity embedded in agent-tool records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRef {
    pub id: Uuid,
    pub name: String,
}

/// The relationship between an agent and a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTool {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub tool_id: Uuid,
    #[serde(default)]
    pub tool: Option<ToolRef>,
    #[serde(default)]
    pub credential_source_mcp_server_id: Option<Uuid>,
    #[serde(default)]
    pub execution_source_mcp_server_id: Option<Uuid>,
    #[serde(default)]
    pub use_dynamic_team_credential: bool,
    #[serde(default)]
    pub allow_usage_when_untrusted_data_is_present: bool,
    #[serde(default = "default_tool_result_treatment")]
    pub tool_result_treatment: String,
    #[serde(default)]
    pub response_modifier_template: Option<String>,
}

fn default_tool_result_treatment() -> String {
    "trusted".to_string()
}

impl AgentTool {
    /// The tool's display name, when the record embeds it.
    pub fn tool_name(&self) -> Option<&str> {
        self.tool.as_ref().map(|t| t.name.as_str())
    }
}

/// Assignment and patch body for an agent tool. Omitted fields are left
/// unchanged by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentToolSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_source_mcp_server_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_source_mcp_server_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_dynamic_team_credential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_usage_when_untrusted_data_is_present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result_treatment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modifier_template: Option<String>,
}

/// MCP server identity embedded in tool records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A tool known to the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub catalog_id: Option<Uuid>,
    #[serde(default)]
    pub mcp_server: Option<McpServerRef>,
}

impl Tool {
    /// Whether the tool is served by the MCP server installation `server_id`.
    pub fn served_by(&self, server_id: &str) -> bool {
        self.mcp_server.as_ref().is_some_and(|s| s.id == server_id)
    }
}

/// An installed MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub catalog_id: Option<Uuid>,
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub teams: Vec<Uuid>,
}

/// Installation body for an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallMcpServer {
    pub name: String,
    pub catalog_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
}

/// One version of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    pub version: i64,
    #[serde(default)]
    pub parent_prompt_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

/// Create body for a prompt or a new prompt version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub agent_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_prompt_id: Option<Uuid>,
}

/// A dual-LLM configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualLlmConfig {
    pub id: Uuid,
    pub enabled: bool,
    pub main_agent_prompt: String,
    pub quarantined_agent_prompt: String,
    pub summary_prompt: String,
    pub max_rounds: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Create/update body for a dual-LLM configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DualLlmConfigRequest {
    pub enabled: bool,
    pub main_agent_prompt: String,
    pub quarantined_agent_prompt: String,
    pub summary_prompt: String,
    pub max_rounds: i64,
}

/// Permission map from resource type to allowed actions.
pub type Permissions = BTreeMap<String, Vec<String>>;

/// An RBAC role, predefined or custom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub predefined: bool,
    #[serde(default)]
    pub organization_id: Option<String>,
}

/// Create/update body for a custom role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permissions: Permissions,
}

/// A tenant user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub banned: Option<bool>,
    #[serde(default)]
    pub ban_reason: Option<String>,
}

/// Create body for a user. Carries the password; never log it.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Patch body for a user.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_reason: Option<String>,
}

/// Body for assigning a role to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetUserRole {
    pub role: String,
}

/// A team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Create/update body for a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A mapping from an identity-provider group to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamExternalGroup {
    pub id: Uuid,
    pub team_id: Uuid,
    pub group_identifier: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for mapping an external group onto a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTeamExternalGroup {
    pub group_identifier: String,
}

/// OIDC settings of an SSO provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcConfig {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_authentication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkce: Option<bool>,
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("discovery_endpoint", &self.discovery_endpoint)
            .finish_non_exhaustive()
    }
}

/// SAML settings of an SSO provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub want_assertions_signed: Option<bool>,
}

impl std::fmt::Debug for SamlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamlConfig")
            .field("entry_point", &self.entry_point)
            .field("cert", &self.cert.as_ref().map(|_| "<redacted>"))
            .field("callback_url", &self.callback_url)
            .finish_non_exhaustive()
    }
}

/// One role-mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMappingRule {
    pub expression: String,
    pub role: String,
}

/// Role mapping for users signing in through an SSO provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RoleMappingRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_role_sync: Option<bool>,
}

/// Team synchronisation from identity-provider groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_expression: Option<String>,
}

/// An SSO identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoProvider {
    pub id: String,
    pub provider_id: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub domain_verified: Option<bool>,
    #[serde(default)]
    pub oidc_config: Option<OidcConfig>,
    #[serde(default)]
    pub saml_config: Option<SamlConfig>,
    #[serde(default)]
    pub role_mapping: Option<RoleMapping>,
    #[serde(default)]
    pub team_sync_config: Option<TeamSyncConfig>,
}

/// Create/update body for an SSO provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoProviderRequest {
    pub provider_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_config: Option<OidcConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saml_config: Option<SamlConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_mapping: Option<RoleMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_sync_config: Option<TeamSyncConfig>,
}

/// A usage limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limit {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub limit_type: String,
    pub limit_value: i64,
    #[serde(default)]
    pub model: Option<Vec<String>>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub mcp_server_name: Option<String>,
}

/// Create/update body for a usage limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub limit_type: String,
    pub limit_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_server_name: Option<String>,
}

/// One `{key, operator, value}` policy condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCondition {
    pub key: String,
    pub operator: String,
    pub value: String,
}

/// A trusted-data policy on an agent tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedDataPolicy {
    pub id: Uuid,
    pub tool_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<PolicyCondition>,
    pub action: String,
}

/// Create/update body for a trusted-data policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedDataPolicyRequest {
    pub tool_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub conditions: Vec<PolicyCondition>,
    pub action: String,
}

/// A tool-invocation policy on an agent tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationPolicy {
    pub id: Uuid,
    pub tool_id: Uuid,
    #[serde(default)]
    pub conditions: Vec<PolicyCondition>,
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Create/update body for a tool-invocation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationPolicyRequest {
    pub tool_id: Uuid,
    pub conditions: Vec<PolicyCondition>,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The tenant's organization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub default_llm_config_id: Option<String>,
    #[serde(default)]
    pub default_dual_llm_config_id: Option<String>,
    #[serde(default)]
    pub custom_font: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub limit_cleanup_interval: Option<String>,
    #[serde(default)]
    pub compression_scope: Option<String>,
    #[serde(default)]
    pub onboarding_complete: Option<bool>,
    #[serde(default)]
    pub convert_tool_results_to_toon: Option<bool>,
}

/// Upsert body for the organization singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_llm_config_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_dual_llm_config_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_cleanup_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_tool_results_to_toon: Option<bool>,
}

/// A trigger condition of an optimization rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleCondition {
    /// Fires when the prompt is at most this long.
    MaxLength {
        #[serde(rename = "maxLength")]
        max_length: i64,
    },
    /// Fires depending on whether the request carries tools.
    HasTools {
        #[serde(rename = "hasTools")]
        has_tools: bool,
    },
}

/// A cost optimization rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRule {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub provider: String,
    pub target_model: String,
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

/// Create/update body for an optimization rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRuleRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub provider: String,
    pub target_model: String,
    pub enabled: bool,
    pub conditions: Vec<RuleCondition>,
}

/// Per-model token pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub id: Uuid,
    pub model: String,
    pub price_per_million_input: String,
    pub price_per_million_output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_request_fields_are_omitted() {
        let body = LimitRequest {
            entity_type: "organization".into(),
            entity_id: "org-1".into(),
            limit_type: "mcp_server_calls".into(),
            limit_value: 10,
            model: None,
            tool_name: None,
            mcp_server_name: Some("github".into()),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "entityType": "organization",
                "entityId": "org-1",
                "limitType": "mcp_server_calls",
                "limitValue": 10,
                "mcpServerName": "github",
            })
        );
    }

    #[test]
    fn test_rule_conditions_are_untagged() {
        let conditions: Vec<RuleCondition> =
            serde_json::from_value(json!([{"maxLength": 1000}, {"hasTools": false}])).unwrap();
        assert_eq!(
            conditions,
            vec![
                RuleCondition::MaxLength { max_length: 1000 },
                RuleCondition::HasTools { has_tools: false },
            ]
        );
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let oidc = OidcConfig {
            client_id: "client".into(),
            client_secret: Some("s3cret".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", oidc);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_agent_tool_defaults() {
        let record: AgentTool = serde_json::from_value(json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "agentId": "22222222-2222-2222-2222-222222222222",
            "toolId": "33333333-3333-3333-3333-333333333333",
        }))
        .unwrap();
        assert_eq!(record.tool_result_treatment, "trusted");
        assert!(!record.use_dynamic_team_credential);
        assert_eq!(record.tool_name(), None);
    }
}
