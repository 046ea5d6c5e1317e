//! `archestra_limit`: a usage limit on an organization, team or agent.
//!
//! Which discriminator fields are allowed depends on `limit_kind`:
//! `token_cost` takes a model list, `mcp_server_calls` a server name and
//! `tool_calls` both a server and a tool name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{Limit, LimitRequest};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, AttributeFlags, AttributeType, ConfigValidator, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

pub(crate) const ENTITY_TYPES: &[&str] = &["organization", "team", "agent"];

const LIMIT_KINDS: &[&str] = &["token_cost", "tool_calls", "mcp_server_calls"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitModel {
    pub id: AttrValue<String>,
    pub entity_type: AttrValue<String>,
    pub entity_id: AttrValue<String>,
    pub limit_kind: AttrValue<String>,
    pub threshold: AttrValue<i64>,
    pub model: AttrValue<Vec<String>>,
    pub tool_name: AttrValue<String>,
    pub mcp_server_name: AttrValue<String>,
}

impl LimitModel {
    fn apply(&mut self, limit: Limit) {
        self.id = AttrValue::Known(limit.id.to_string());
        self.entity_type = AttrValue::Known(limit.entity_type);
        self.entity_id = AttrValue::Known(limit.entity_id);
        self.limit_kind = AttrValue::Known(limit.limit_type);
        self.threshold = AttrValue::Known(limit.limit_value);
        // An empty model list and no list are the same to the service.
        self.model = match limit.model {
            Some(models) if !models.is_empty() => AttrValue::Known(models),
            _ if self.model.is_known() => AttrValue::Known(Vec::new()),
            _ => AttrValue::Null,
        };
        self.tool_name = limit.tool_name.into();
        self.mcp_server_name = limit.mcp_server_name.into();
    }

    fn request(&self) -> LimitRequest {
        LimitRequest {
            entity_type: self.entity_type.to_request().unwrap_or_default(),
            entity_id: self.entity_id.to_request().unwrap_or_default(),
            limit_type: self.limit_kind.to_request().unwrap_or_default(),
            limit_value: self.threshold.to_request().unwrap_or_default(),
            model: self.model.to_request(),
            tool_name: self.tool_name.to_request(),
            mcp_server_name: self.mcp_server_name.to_request(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LimitResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for LimitResource {
    type Model = LimitModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_limit", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages a token cost or call count limit.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("entity_type", Attribute::required_string().one_of(ENTITY_TYPES))
            .with_attribute(
                "entity_id",
                Attribute::required_string().with_description("Organization, team or agent the limit applies to"),
            )
            .with_attribute("limit_kind", Attribute::required_string().one_of(LIMIT_KINDS))
            .with_attribute(
                "threshold",
                Attribute::required_int64()
                    .with_description("Limit value: cost for token_cost, call count otherwise")
                    .with_validator(Validator::AtLeast(1)),
            )
            .with_attribute(
                "model",
                Attribute::new(AttributeType::list(AttributeType::String), AttributeFlags::optional())
                    .with_description("Models counted by a token_cost limit"),
            )
            .with_attribute("tool_name", Attribute::optional_string())
            .with_attribute("mcp_server_name", Attribute::optional_string())
            .with_config_validator(ConfigValidator::NonEmptyWhen {
                attribute: "model",
                sibling: "limit_kind",
                value: "token_cost",
            })
            .with_config_validator(ConfigValidator::ForbiddenWhen {
                attribute: "tool_name",
                sibling: "limit_kind",
                value: "token_cost",
            })
            .with_config_validator(ConfigValidator::ForbiddenWhen {
                attribute: "mcp_server_name",
                sibling: "limit_kind",
                value: "token_cost",
            })
            .with_config_validator(ConfigValidator::RequiredWhen {
                attribute: "mcp_server_name",
                sibling: "limit_kind",
                value: "mcp_server_calls",
            })
            .with_config_validator(ConfigValidator::ForbiddenWhen {
                attribute: "model",
                sibling: "limit_kind",
                value: "mcp_server_calls",
            })
            .with_config_validator(ConfigValidator::RequiredWhen {
                attribute: "mcp_server_name",
                sibling: "limit_kind",
                value: "tool_calls",
            })
            .with_config_validator(ConfigValidator::RequiredWhen {
                attribute: "tool_name",
                sibling: "limit_kind",
                value: "tool_calls",
            })
            .with_config_validator(ConfigValidator::ForbiddenWhen {
                attribute: "model",
                sibling: "limit_kind",
                value: "tool_calls",
            })
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: LimitModel) -> Result<LimitModel, Diagnostic> {
        let client = self.client.get()?;
        let limit = client.create_limit(ctx, &plan.request()).await.expect_ok("create limit")?;
        info!(id = %limit.id, kind = %limit.limit_type, "Created limit");
        plan.apply(limit);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: LimitModel) -> Result<Option<LimitModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(limit) = client.get_limit(ctx, id).await.found("read limit")? else {
            return Ok(None);
        };
        state.apply(limit);
        Ok(Some(state))
    }

    async fn update(&self, ctx: &OpContext, prior: LimitModel, mut plan: LimitModel) -> Result<LimitModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let limit = client
            .update_limit(ctx, id, &plan.request())
            .await
            .expect_ok("update limit")?;
        plan.apply(limit);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: LimitModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client.delete_limit(ctx, id).await.deleted("delete limit")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<LimitModel, Diagnostic> {
        Ok(LimitModel {
            id: AttrValue::Known(parse_uuid("id", id)?.to_string()),
            ..Default::default()
        })
    }
}
