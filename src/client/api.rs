//! Endpoint surface of [`ArchestraClient`].

use reqwest::Method;
use serde::de::IgnoredAny;
use url::Url;
use uuid::Uuid;

use super::models::*;
use super::{ApiRequest, ArchestraClient, ClientError, Reply};
use crate::context::OpContext;

type ApiReply<T> = Result<Reply<T>, ClientError>;

/// `/api/identity-providers/{id}` with the free-form `id` escaped as a single
/// path segment.
fn sso_provider_path(id: &str) -> Result<String, ClientError> {
    // `push` drops dot segments instead of escaping them.
    if id.is_empty() || id == "." || id == ".." {
        return Err(ClientError::Config(format!("'{}' is not a usable SSO provider ID", id)));
    }
    let mut url = Url::parse("http://archestra.invalid/api/identity-providers")
        .map_err(|e| ClientError::Config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::Config("SSO provider path cannot take segments".to_string()))?
        .push(id);
    Ok(url.path().to_string())
}

impl ArchestraClient {
    // =========================================================================
    // Agents
    // =========================================================================

    /// `GET /api/agents`
    pub async fn list_agents(&self, ctx: &OpContext) -> ApiReply<Vec<Agent>> {
        self.get(ctx, "/api/agents".to_string()).await
    }

    /// `GET /api/agents/{id}`
    pub async fn get_agent(&self, ctx: &OpContext, id: Uuid) -> ApiReply<Agent> {
        self.get(ctx, format!("/api/agents/{}", id)).await
    }

    /// `POST /api/agents`
    pub async fn create_agent(&self, ctx: &OpContext, body: &AgentRequest) -> ApiReply<Agent> {
        self.send_json(ctx, Method::POST, "/api/agents".to_string(), body).await
    }

    /// `PUT /api/agents/{id}`
    pub async fn update_agent(&self, ctx: &OpContext, id: Uuid, body: &AgentRequest) -> ApiReply<Agent> {
        self.send_json(ctx, Method::PUT, format!("/api/agents/{}", id), body).await
    }

    /// `DELETE /api/agents/{id}`
    pub async fn delete_agent(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/agents/{}", id)).await
    }

    // =========================================================================
    // Agent tools
    // =========================================================================

    /// `POST /api/agents/{agent_id}/tools/{tool_id}`
    pub async fn assign_tool(
        &self,
        ctx: &OpContext,
        agent_id: Uuid,
        tool_id: Uuid,
        body: &AgentToolSettings,
    ) -> ApiReply<IgnoredAny> {
        self.send_json(ctx, Method::POST, format!("/api/agents/{}/tools/{}", agent_id, tool_id), body)
            .await
    }

    /// `DELETE /api/agents/{agent_id}/tools/{tool_id}`
    pub async fn unassign_tool(&self, ctx: &OpContext, agent_id: Uuid, tool_id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/agents/{}/tools/{}", agent_id, tool_id)).await
    }

    /// `GET /api/agent-tools?agentId=`
    pub async fn list_agent_tools(&self, ctx: &OpContext, agent_id: Uuid) -> ApiReply<Vec<AgentTool>> {
        let request = ApiRequest::new(Method::GET, "/api/agent-tools").with_query("agentId", agent_id.to_string());
        self.execute(ctx, request).await
    }

    /// `PATCH /api/agent-tools/{id}`
    pub async fn update_agent_tool(
        &self,
        ctx: &OpContext,
        id: Uuid,
        body: &AgentToolSettings,
    ) -> ApiReply<AgentTool> {
        self.send_json(ctx, Method::PATCH, format!("/api/agent-tools/{}", id), body).await
    }

    /// `GET /api/tools`
    pub async fn list_tools(&self, ctx: &OpContext) -> ApiReply<Vec<Tool>> {
        self.get(ctx, "/api/tools".to_string()).await
    }

    // =========================================================================
    // MCP servers
    // =========================================================================

    /// `POST /api/mcp_server`
    pub async fn install_mcp_server(&self, ctx: &OpContext, body: &InstallMcpServer) -> ApiReply<McpServer> {
        self.send_json(ctx, Method::POST, "/api/mcp_server".to_string(), body).await
    }

    /// `GET /api/mcp_server/{id}`
    pub async fn get_mcp_server(&self, ctx: &OpContext, id: Uuid) -> ApiReply<McpServer> {
        self.get(ctx, format!("/api/mcp_server/{}", id)).await
    }

    /// `DELETE /api/mcp_server/{id}`
    pub async fn delete_mcp_server(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/mcp_server/{}", id)).await
    }

    /// `POST /api/v1/mcp-servers/{server_id}/teams/{team_id}`
    pub async fn grant_team_mcp_server_access(
        &self,
        ctx: &OpContext,
        server_id: Uuid,
        team_id: Uuid,
    ) -> ApiReply<IgnoredAny> {
        let request = ApiRequest::new(Method::POST, format!("/api/v1/mcp-servers/{}/teams/{}", server_id, team_id));
        self.execute(ctx, request).await
    }

    /// `DELETE /api/v1/mcp-servers/{server_id}/teams/{team_id}`
    pub async fn revoke_team_mcp_server_access(
        &self,
        ctx: &OpContext,
        server_id: Uuid,
        team_id: Uuid,
    ) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/v1/mcp-servers/{}/teams/{}", server_id, team_id))
            .await
    }

    // =========================================================================
    // Prompts
    // =========================================================================

    /// `GET /api/prompts`
    pub async fn list_prompts(&self, ctx: &OpContext) -> ApiReply<Vec<Prompt>> {
        self.get(ctx, "/api/prompts".to_string()).await
    }

    /// `POST /api/prompts`; with a parent reference this creates a new version.
    pub async fn create_prompt(&self, ctx: &OpContext, body: &PromptRequest) -> ApiReply<Prompt> {
        self.send_json(ctx, Method::POST, "/api/prompts".to_string(), body).await
    }

    /// `GET /api/prompts/{id}`
    pub async fn get_prompt(&self, ctx: &OpContext, id: Uuid) -> ApiReply<Prompt> {
        self.get(ctx, format!("/api/prompts/{}", id)).await
    }

    /// `DELETE /api/prompts/{id}`
    pub async fn delete_prompt(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/prompts/{}", id)).await
    }

    /// `GET /api/prompts/{id}/versions`
    pub async fn list_prompt_versions(&self, ctx: &OpContext, id: Uuid) -> ApiReply<Vec<Prompt>> {
        self.get(ctx, format!("/api/prompts/{}/versions", id)).await
    }

    // =========================================================================
    // Dual-LLM configurations
    // =========================================================================

    /// `GET /api/dual-llm-config`
    pub async fn list_dual_llm_configs(&self, ctx: &OpContext) -> ApiReply<Vec<DualLlmConfig>> {
        self.get(ctx, "/api/dual-llm-config".to_string()).await
    }

    /// `POST /api/dual-llm-config`
    pub async fn create_dual_llm_config(
        &self,
        ctx: &OpContext,
        body: &DualLlmConfigRequest,
    ) -> ApiReply<DualLlmConfig> {
        self.send_json(ctx, Method::POST, "/api/dual-llm-config".to_string(), body).await
    }

    /// `GET /api/dual-llm-config/{id}`
    pub async fn get_dual_llm_config(&self, ctx: &OpContext, id: Uuid) -> ApiReply<DualLlmConfig> {
        self.get(ctx, format!("/api/dual-llm-config/{}", id)).await
    }

    /// `PUT /api/dual-llm-config/{id}`
    pub async fn update_dual_llm_config(
        &self,
        ctx: &OpContext,
        id: Uuid,
        body: &DualLlmConfigRequest,
    ) -> ApiReply<DualLlmConfig> {
        self.send_json(ctx, Method::PUT, format!("/api/dual-llm-config/{}", id), body).await
    }

    /// `DELETE /api/dual-llm-config/{id}`
    pub async fn delete_dual_llm_config(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/dual-llm-config/{}", id)).await
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// `GET /api/roles`
    pub async fn list_roles(&self, ctx: &OpContext) -> ApiReply<Vec<Role>> {
        self.get(ctx, "/api/roles".to_string()).await
    }

    /// `POST /api/roles`
    pub async fn create_role(&self, ctx: &OpContext, body: &RoleRequest) -> ApiReply<Role> {
        self.send_json(ctx, Method::POST, "/api/roles".to_string(), body).await
    }

    /// `GET /api/roles/{id}`
    pub async fn get_role(&self, ctx: &OpContext, id: Uuid) -> ApiReply<Role> {
        self.get(ctx, format!("/api/roles/{}", id)).await
    }

    /// `PUT /api/roles/{id}`
    pub async fn update_role(&self, ctx: &OpContext, id: Uuid, body: &RoleRequest) -> ApiReply<Role> {
        self.send_json(ctx, Method::PUT, format!("/api/roles/{}", id), body).await
    }

    /// `DELETE /api/roles/{id}`
    pub async fn delete_role(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/roles/{}", id)).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// `POST /api/users`
    pub async fn create_user(&self, ctx: &OpContext, body: &CreateUser) -> ApiReply<User> {
        self.send_json(ctx, Method::POST, "/api/users".to_string(), body).await
    }

    /// `GET /api/users?email=`
    pub async fn find_users_by_email(&self, ctx: &OpContext, email: &str) -> ApiReply<Vec<User>> {
        let request = ApiRequest::new(Method::GET, "/api/users").with_query("email", email);
        self.execute(ctx, request).await
    }

    /// `GET /api/users/{id}`
    pub async fn get_user(&self, ctx: &OpContext, id: Uuid) -> ApiReply<User> {
        self.get(ctx, format!("/api/users/{}", id)).await
    }

    /// `PATCH /api/users/{id}`
    pub async fn update_user(&self, ctx: &OpContext, id: Uuid, body: &UpdateUser) -> ApiReply<User> {
        self.send_json(ctx, Method::PATCH, format!("/api/users/{}", id), body).await
    }

    /// `DELETE /api/users/{id}`
    pub async fn delete_user(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/users/{}", id)).await
    }

    /// `PUT /api/users/{id}/role`
    pub async fn set_user_role(&self, ctx: &OpContext, id: Uuid, body: &SetUserRole) -> ApiReply<User> {
        self.send_json(ctx, Method::PUT, format!("/api/users/{}/role", id), body).await
    }

    // =========================================================================
    // Teams
    // =========================================================================

    /// `GET /api/teams`
    pub async fn list_teams(&self, ctx: &OpContext) -> ApiReply<Vec<Team>> {
        self.get(ctx, "/api/teams".to_string()).await
    }

    /// `POST /api/teams`
    pub async fn create_team(&self, ctx: &OpContext, body: &TeamRequest) -> ApiReply<Team> {
        self.send_json(ctx, Method::POST, "/api/teams".to_string(), body).await
    }

    /// `GET /api/teams/{id}`
    pub async fn get_team(&self, ctx: &OpContext, id: Uuid) -> ApiReply<Team> {
        self.get(ctx, format!("/api/teams/{}", id)).await
    }

    /// `PUT /api/teams/{id}`
    pub async fn update_team(&self, ctx: &OpContext, id: Uuid, body: &TeamRequest) -> ApiReply<Team> {
        self.send_json(ctx, Method::PUT, format!("/api/teams/{}", id), body).await
    }

    /// `DELETE /api/teams/{id}`
    pub async fn delete_team(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/teams/{}", id)).await
    }

    /// `GET /api/teams/{team_id}/external-groups`
    pub async fn list_team_external_groups(
        &self,
        ctx: &OpContext,
        team_id: Uuid,
    ) -> ApiReply<Vec<TeamExternalGroup>> {
        self.get(ctx, format!("/api/teams/{}/external-groups", team_id)).await
    }

    /// `POST /api/teams/{team_id}/external-groups`
    pub async fn add_team_external_group(
        &self,
        ctx: &OpContext,
        team_id: Uuid,
        body: &AddTeamExternalGroup,
    ) -> ApiReply<TeamExternalGroup> {
        self.send_json(ctx, Method::POST, format!("/api/teams/{}/external-groups", team_id), body)
            .await
    }

    /// `DELETE /api/teams/{team_id}/external-groups/{mapping_id}`
    pub async fn remove_team_external_group(
        &self,
        ctx: &OpContext,
        team_id: Uuid,
        mapping_id: Uuid,
    ) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/teams/{}/external-groups/{}", team_id, mapping_id))
            .await
    }

    // =========================================================================
    // SSO providers
    // =========================================================================

    /// `POST /api/identity-providers`
    pub async fn create_sso_provider(&self, ctx: &OpContext, body: &SsoProviderRequest) -> ApiReply<SsoProvider> {
        self.send_json(ctx, Method::POST, "/api/identity-providers".to_string(), body).await
    }

    /// `GET /api/identity-providers/{id}`
    pub async fn get_sso_provider(&self, ctx: &OpContext, id: &str) -> ApiReply<SsoProvider> {
        self.get(ctx, sso_provider_path(id)?).await
    }

    /// `PUT /api/identity-providers/{id}`
    pub async fn update_sso_provider(
        &self,
        ctx: &OpContext,
        id: &str,
        body: &SsoProviderRequest,
    ) -> ApiReply<SsoProvider> {
        self.send_json(ctx, Method::PUT, sso_provider_path(id)?, body).await
    }

    /// `DELETE /api/identity-providers/{id}`
    pub async fn delete_sso_provider(&self, ctx: &OpContext, id: &str) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, sso_provider_path(id)?).await
    }

    // =========================================================================
    // Limits and policies
    // =========================================================================

    /// `POST /api/limits`
    pub async fn create_limit(&self, ctx: &OpContext, body: &LimitRequest) -> ApiReply<Limit> {
        self.send_json(ctx, Method::POST, "/api/limits".to_string(), body).await
    }

    /// `GET /api/limits/{id}`
    pub async fn get_limit(&self, ctx: &OpContext, id: Uuid) -> ApiReply<Limit> {
        self.get(ctx, format!("/api/limits/{}", id)).await
    }

    /// `PUT /api/limits/{id}`
    pub async fn update_limit(&self, ctx: &OpContext, id: Uuid, body: &LimitRequest) -> ApiReply<Limit> {
        self.send_json(ctx, Method::PUT, format!("/api/limits/{}", id), body).await
    }

    /// `DELETE /api/limits/{id}`
    pub async fn delete_limit(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/limits/{}", id)).await
    }

    /// `POST /api/trusted-data-policies`
    pub async fn create_trusted_data_policy(
        &self,
        ctx: &OpContext,
        body: &TrustedDataPolicyRequest,
    ) -> ApiReply<TrustedDataPolicy> {
        self.send_json(ctx, Method::POST, "/api/trusted-data-policies".to_string(), body)
            .await
    }

    /// `GET /api/trusted-data-policies/{id}`
    pub async fn get_trusted_data_policy(&self, ctx: &OpContext, id: Uuid) -> ApiReply<TrustedDataPolicy> {
        self.get(ctx, format!("/api/trusted-data-policies/{}", id)).await
    }

    /// `PUT /api/trusted-data-policies/{id}`
    pub async fn update_trusted_data_policy(
        &self,
        ctx: &OpContext,
        id: Uuid,
        body: &TrustedDataPolicyRequest,
    ) -> ApiReply<TrustedDataPolicy> {
        self.send_json(ctx, Method::PUT, format!("/api/trusted-data-policies/{}", id), body)
            .await
    }

    /// `DELETE /api/trusted-data-policies/{id}`
    pub async fn delete_trusted_data_policy(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/trusted-data-policies/{}", id)).await
    }

    /// `POST /api/autonomy-policies/tool-invocation`
    pub async fn create_tool_invocation_policy(
        &self,
        ctx: &OpContext,
        body: &ToolInvocationPolicyRequest,
    ) -> ApiReply<ToolInvocationPolicy> {
        self.send_json(ctx, Method::POST, "/api/autonomy-policies/tool-invocation".to_string(), body)
            .await
    }

    /// `GET /api/autonomy-policies/tool-invocation/{id}`
    pub async fn get_tool_invocation_policy(
        &self,
        ctx: &OpContext,
        id: Uuid,
    ) -> ApiReply<ToolInvocationPolicy> {
        self.get(ctx, format!("/api/autonomy-policies/tool-invocation/{}", id)).await
    }

    /// `PUT /api/autonomy-policies/tool-invocation/{id}`
    pub async fn update_tool_invocation_policy(
        &self,
        ctx: &OpContext,
        id: Uuid,
        body: &ToolInvocationPolicyRequest,
    ) -> ApiReply<ToolInvocationPolicy> {
        self.send_json(
            ctx,
            Method::PUT,
            format!("/api/autonomy-policies/tool-invocation/{}", id),
            body,
        )
        .await
    }

    /// `DELETE /api/autonomy-policies/tool-invocation/{id}`
    pub async fn delete_tool_invocation_policy(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/autonomy-policies/tool-invocation/{}", id))
            .await
    }

    // =========================================================================
    // Organization
    // =========================================================================

    /// `GET /api/organization`
    pub async fn get_organization(&self, ctx: &OpContext) -> ApiReply<Organization> {
        self.get(ctx, "/api/organization".to_string()).await
    }

    /// `PATCH /api/organization`; the singleton upsert.
    pub async fn update_organization(
        &self,
        ctx: &OpContext,
        body: &UpdateOrganization,
    ) -> ApiReply<Organization> {
        self.send_json(ctx, Method::PATCH, "/api/organization".to_string(), body).await
    }

    /// `GET /api/optimization-rules`
    pub async fn list_optimization_rules(&self, ctx: &OpContext) -> ApiReply<Vec<OptimizationRule>> {
        self.get(ctx, "/api/optimization-rules".to_string()).await
    }

    /// `POST /api/optimization-rules`
    pub async fn create_optimization_rule(
        &self,
        ctx: &OpContext,
        body: &OptimizationRuleRequest,
    ) -> ApiReply<OptimizationRule> {
        self.send_json(ctx, Method::POST, "/api/optimization-rules".to_string(), body).await
    }

    /// `PUT /api/optimization-rules/{id}`
    pub async fn update_optimization_rule(
        &self,
        ctx: &OpContext,
        id: Uuid,
        body: &OptimizationRuleRequest,
    ) -> ApiReply<OptimizationRule> {
        self.send_json(ctx, Method::PUT, format!("/api/optimization-rules/{}", id), body)
            .await
    }

    /// `DELETE /api/optimization-rules/{id}`
    pub async fn delete_optimization_rule(&self, ctx: &OpContext, id: Uuid) -> ApiReply<IgnoredAny> {
        self.delete_at(ctx, format!("/api/optimization-rules/{}", id)).await
    }

    /// `GET /api/token-prices`
    pub async fn list_token_prices(&self, ctx: &OpContext) -> ApiReply<Vec<TokenPrice>> {
        self.get(ctx, "/api/token-prices".to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sso_provider_id_is_one_segment() {
        assert_eq!(sso_provider_path("okta-1").unwrap(), "/api/identity-providers/okta-1");
        assert_eq!(
            sso_provider_path("x/../../users/u1").unwrap(),
            "/api/identity-providers/x%2F..%2F..%2Fusers%2Fu1"
        );
        assert_eq!(sso_provider_path("a?b#c").unwrap(), "/api/identity-providers/a%3Fb%23c");
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        for id in ["", ".", ".."] {
            assert!(matches!(sso_provider_path(id), Err(ClientError::Config(_))), "{:?}", id);
        }
    }
}
