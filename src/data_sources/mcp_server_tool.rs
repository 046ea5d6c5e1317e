//! `archestra_mcp_server_tool`: a tool served by an installed MCP server.
//!
//! A freshly installed server registers its tools asynchronously; the lookup
//! retries until the named tool is listed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::data_sources::settle;
use crate::ids::require_uuid;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::retry::{retry_until_found, RetryConfig};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerToolModel {
    pub id: AttrValue<String>,
    pub mcp_server_id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub description: AttrValue<String>,
}

#[derive(Debug, Clone)]
pub struct McpServerToolDataSource {
    client: ClientSlot,
    retry: RetryConfig,
}

impl Default for McpServerToolDataSource {
    fn default() -> Self {
        Self {
            client: ClientSlot::default(),
            retry: RetryConfig::new("MCP server tool"),
        }
    }
}

#[async_trait]
impl DataSource for McpServerToolDataSource {
    type Model = McpServerToolModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_mcp_server_tool", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Looks up a tool served by an MCP server installation.")
            .with_attribute(
                "mcp_server_id",
                Attribute::required_string()
                    .with_description("Installation identifier")
                    .with_validator(Validator::Uuid),
            )
            .with_attribute("name", Attribute::required_string().with_description("Tool name"))
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("description", Attribute::computed_string())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: McpServerToolModel) -> Result<McpServerToolModel, Diagnostic> {
        let client = self.client.get()?;
        let server_id = require_uuid("mcp_server_id", &config.mcp_server_id)?.to_string();
        let server = server_id.as_str();
        let name = config.name.as_str().unwrap_or_default();

        let result = retry_until_found(ctx, &self.retry, || async move {
            let tools = client.list_tools(ctx).await.expect_ok("list tools")?;
            Ok::<_, Diagnostic>(tools.into_iter().find(|t| t.served_by(server) && t.name == name))
        })
        .await;
        let tool = settle(result, || {
            format!(
                "MCP server {} does not serve a tool named '{}' after {} attempts",
                server, name, self.retry.max_attempts
            )
        })?;

        config.id = AttrValue::Known(tool.id.to_string());
        config.description = tool.description.into();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const SERVER: &str = "50000000-0000-0000-0000-000000000005";
    const TOOL: &str = "60000000-0000-0000-0000-000000000006";

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_server_tools() {
        let mock = MockTransport::new();
        let elsewhere = json!({
            "id": "70000000-0000-0000-0000-000000000007",
            "name": "read_file",
            "mcpServer": {"id": "80000000-0000-0000-0000-000000000008"},
        });
        mock.respond_sequence(
            Method::GET,
            "/api/tools",
            vec![
                (200, json!([elsewhere.clone()])),
                (
                    200,
                    json!([elsewhere, {
                        "id": TOOL,
                        "name": "read_file",
                        "description": "Read a file",
                        "mcpServer": {"id": SERVER, "name": "fs"},
                    }]),
                ),
            ],
        );
        let tester = configured_tester(&mock).await;

        let state = tester
            .read_data_source(
                "archestra_mcp_server_tool",
                json!({"mcp_server_id": SERVER, "name": "read_file"}),
            )
            .await
            .unwrap();

        assert_eq!(state["id"], TOOL);
        assert_eq!(state["description"], "Read a file");
        assert_eq!(mock.requests_to(Method::GET, "/api/tools").len(), 2);
    }

    #[tokio::test]
    async fn test_list_failure_aborts_lookup() {
        let mock = MockTransport::new();
        mock.respond(Method::GET, "/api/tools", 403, json!({"message": "forbidden"}));
        let tester = configured_tester(&mock).await;

        let err = tester
            .read_data_source(
                "archestra_mcp_server_tool",
                json!({"mcp_server_id": SERVER, "name": "read_file"}),
            )
            .await
            .unwrap_err();

        assert_eq!(err.diagnostics()[0].detail.as_deref(), Some("Unable to list tools: forbidden"));
        assert_eq!(mock.requests().len(), 1);
    }
}
