//! `archestra_mcp_server_installation`: an MCP server installed from the
//! catalog. Every attribute forces replacement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::models::{InstallMcpServer, McpServer};
use crate::client::{ApiResult, ArchestraClient};
use crate::context::OpContext;
use crate::ids::{optional_uuid, parse_uuid, require_uuid};
use crate::resource::{ClientSlot, Lifecycle, ProviderData, Resource};
use crate::retry::{retry_until_found, RetryConfig, RetryError};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerInstallationModel {
    pub id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub mcp_server_id: AttrValue<String>,
    pub team_id: AttrValue<String>,
    pub display_name: AttrValue<String>,
}

impl McpServerInstallationModel {
    fn apply(&mut self, server: McpServer) {
        self.id = AttrValue::Known(server.id.to_string());
        // The service may decorate the name; the configured one stays in state.
        if !self.name.is_known() {
            self.name = AttrValue::Known(server.name.clone());
        }
        self.display_name = AttrValue::Known(server.name);
        if let Some(catalog_id) = server.catalog_id {
            self.mcp_server_id = AttrValue::Known(catalog_id.to_string());
        }
        self.team_id = AttrValue::from_response(server.team_id.map(|id| id.to_string()));
    }
}

#[derive(Debug, Clone)]
pub struct McpServerInstallationResource {
    client: ClientSlot,
    readiness: RetryConfig,
}

impl Default for McpServerInstallationResource {
    fn default() -> Self {
        Self {
            client: ClientSlot::default(),
            readiness: RetryConfig::new("MCP server tools"),
        }
    }
}

impl McpServerInstallationResource {
    /// Wait until the installation serves at least one tool. Never fails the
    /// create: a server that is still starting is reported as a warning.
    async fn await_tools(&self, client: &ArchestraClient, ctx: &OpContext, server_id: Uuid) {
        let server = server_id.to_string();
        let server = server.as_str();
        let result = retry_until_found(ctx, &self.readiness, || async move {
            let tools = client.list_tools(ctx).await.expect_ok("list tools")?;
            let count = tools.iter().filter(|t| t.served_by(server)).count();
            Ok::<_, Diagnostic>((count > 0).then_some(count))
        })
        .await;

        let detail = match result {
            Ok(Some(count)) => {
                info!(id = %server_id, tools = count, "MCP server is serving tools");
                return;
            }
            Ok(None) => format!(
                "MCP server {} was installed but exposed no tools after {} attempts. It may still be starting.",
                server_id, self.readiness.max_attempts
            ),
            Err(RetryError::Cancelled(what)) => format!("Stopped waiting for {}: operation cancelled", what),
            Err(RetryError::Operation(diag)) => diag.detail.unwrap_or(diag.summary),
        };
        warn!(id = %server_id, "{}", detail);
        ctx.warn(Diagnostic::warning("MCP Server Not Fully Ready").with_detail(detail));
    }
}

#[async_trait]
impl Resource for McpServerInstallationResource {
    type Model = McpServerInstallationModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_mcp_server_installation", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Installs an MCP server from the private registry catalog.")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("Installation identifier")
                    .with_state_for_unknown(),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Installation name")
                    .with_requires_replace(),
            )
            .with_attribute(
                "mcp_server_id",
                Attribute::required_string()
                    .with_description("Catalog item to install")
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "team_id",
                Attribute::optional_string()
                    .with_description("Team that owns the installation")
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute(
                "display_name",
                Attribute::computed_string()
                    .with_description("Name assigned by the service")
                    .with_state_for_unknown(),
            )
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::ReplacementOnly
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: McpServerInstallationModel,
    ) -> Result<McpServerInstallationModel, Diagnostic> {
        let client = self.client.get()?;
        let body = InstallMcpServer {
            name: plan.name.to_request().unwrap_or_default(),
            catalog_id: require_uuid("mcp_server_id", &plan.mcp_server_id)?,
            team_id: optional_uuid("team_id", &plan.team_id)?,
        };
        let server = client
            .install_mcp_server(ctx, &body)
            .await
            .expect_ok("install MCP server")?;

        info!(id = %server.id, name = %server.name, "Installed MCP server");
        let server_id = server.id;
        plan.apply(server);
        self.await_tools(client, ctx, server_id).await;
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: McpServerInstallationModel,
    ) -> Result<Option<McpServerInstallationModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(server) = client.get_mcp_server(ctx, id).await.found("read MCP server")? else {
            return Ok(None);
        };
        state.apply(server);
        Ok(Some(state))
    }

    async fn delete(&self, ctx: &OpContext, state: McpServerInstallationModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client.delete_mcp_server(ctx, id).await.deleted("uninstall MCP server")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<McpServerInstallationModel, Diagnostic> {
        Ok(McpServerInstallationModel {
            id: AttrValue::Known(parse_uuid("id", id)?.to_string()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ProviderService;
    use crate::resource::AnyResource;
    use crate::testing::{assert_plan_replaces, configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    const SERVER: &str = "c0000000-0000-0000-0000-000000000001";
    const CATALOG: &str = "c0000000-0000-0000-0000-0000000000ca";

    fn state() -> serde_json::Value {
        json!({"id": SERVER, "name": "github", "mcp_server_id": CATALOG, "team_id": null, "display_name": "github"})
    }

    #[tokio::test]
    async fn test_every_change_replaces() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let plan = tester
            .plan_update(
                "archestra_mcp_server_installation",
                state(),
                json!({"name": "github-2", "mcp_server_id": CATALOG}),
            )
            .await
            .unwrap();
        assert_plan_replaces(&plan, "name");
        assert!(!plan.requires_replace.contains(&"mcp_server_id".to_string()));
    }

    #[tokio::test]
    async fn test_update_is_unreachable() {
        let mock = MockTransport::new();
        let tester = configured_tester(&mock).await;

        let err = tester
            .update("archestra_mcp_server_installation", state(), state(), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Update Not Supported");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_timeout_is_a_warning() {
        let mock = MockTransport::new();
        mock.respond(
            Method::POST,
            "/api/mcp_server",
            200,
            json!({"id": SERVER, "name": "github", "catalogId": CATALOG}),
        );
        mock.respond(Method::GET, "/api/tools", 200, json!([]));

        let mut resource = McpServerInstallationResource::default();
        resource.readiness = RetryConfig::new("MCP server tools")
            .with_max_attempts(3)
            .with_backoff(Duration::from_millis(10), Duration::from_millis(20));
        Resource::configure(&mut resource, Some(&ProviderData::new(mock.client())));

        let ctx = OpContext::new();
        let state = AnyResource::create(
            &resource,
            &ctx,
            json!({"name": "github", "mcp_server_id": CATALOG, "id": crate::value::UNKNOWN_VALUE}),
        )
        .await
        .unwrap();

        assert_eq!(state["id"], SERVER);
        let warnings = ctx.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].summary, "MCP Server Not Fully Ready");
        assert_eq!(mock.requests_to(Method::GET, "/api/tools").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_server_has_no_warning() {
        let mock = MockTransport::new();
        mock.respond(
            Method::POST,
            "/api/mcp_server",
            200,
            json!({"id": SERVER, "name": "github-abc", "catalogId": CATALOG}),
        );
        mock.respond_sequence(
            Method::GET,
            "/api/tools",
            vec![
                (200, json!([])),
                (
                    200,
                    json!([{"id": "d0000000-0000-0000-0000-000000000001", "name": "github__search",
                        "mcpServer": {"id": SERVER, "name": "github-abc"}}]),
                ),
            ],
        );
        let tester = configured_tester(&mock).await;

        let config = json!({"name": "github", "mcp_server_id": CATALOG});
        let plan = tester
            .plan_create("archestra_mcp_server_installation", config.clone())
            .await
            .unwrap();
        let outcome = tester
            .provider()
            .apply("archestra_mcp_server_installation", None, Some(plan.planned_state), config)
            .await
            .unwrap();
        assert!(outcome.diagnostics.is_empty());
        let state = outcome.value.unwrap();
        assert_eq!(state["name"], "github");
        assert_eq!(state["display_name"], "github-abc");
    }
}
