//! `archestra_agent` and `archestra_profile`.
//!
//! Both names manage the same entity; the profile name is the current
//! product naming and the agent name is kept for existing configurations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{Agent, AgentRequest};
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::mappers::labels::{self, label_list_type, LabelModel};
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, AttributeFlags, Diagnostic, Schema};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentModel {
    pub id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub labels: AttrValue<Vec<LabelModel>>,
}

impl AgentModel {
    fn apply(&mut self, agent: Agent) {
        self.id = AttrValue::Known(agent.id.to_string());
        self.name = AttrValue::Known(agent.name);
        self.labels = labels::from_response(&self.labels, agent.labels);
    }

    fn request(&self, teams: Option<Vec<String>>) -> AgentRequest {
        AgentRequest {
            name: self.name.to_request().unwrap_or_default(),
            labels: labels::to_request(&self.labels),
            teams,
        }
    }
}

/// Agent handler, registered under one of two names.
#[derive(Debug, Clone)]
pub struct AgentResource {
    client: ClientSlot,
    suffix: &'static str,
}

impl AgentResource {
    /// The handler registered as `<provider>_agent`.
    pub fn agent() -> Self {
        Self {
            client: ClientSlot::default(),
            suffix: "agent",
        }
    }

    /// The handler registered as `<provider>_profile`.
    pub fn profile() -> Self {
        Self {
            client: ClientSlot::default(),
            suffix: "profile",
        }
    }
}

#[async_trait]
impl Resource for AgentResource {
    type Model = AgentModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_{}", provider_type_name, self.suffix)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(format!("Manages an Archestra {}.", self.suffix))
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("Identifier")
                    .with_state_for_unknown(),
            )
            .with_attribute("name", Attribute::required_string().with_description("Display name"))
            .with_attribute(
                "labels",
                Attribute::new(label_list_type(), AttributeFlags::optional())
                    .with_description("Ordered key/value labels"),
            )
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(&self, ctx: &OpContext, mut plan: AgentModel) -> Result<AgentModel, Diagnostic> {
        let client = self.client.get()?;
        let agent = client
            .create_agent(ctx, &plan.request(Some(Vec::new())))
            .await
            .expect_ok(&format!("create {}", self.suffix))?;

        info!(id = %agent.id, kind = self.suffix, "Created agent");
        plan.apply(agent);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: AgentModel) -> Result<Option<AgentModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(agent) = client
            .get_agent(ctx, id)
            .await
            .found(&format!("read {}", self.suffix))?
        else {
            return Ok(None);
        };
        state.apply(agent);
        Ok(Some(state))
    }

    async fn update(&self, ctx: &OpContext, prior: AgentModel, mut plan: AgentModel) -> Result<AgentModel, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &prior.id)?;
        let agent = client
            .update_agent(ctx, id, &plan.request(None))
            .await
            .expect_ok(&format!("update {}", self.suffix))?;
        plan.apply(agent);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: AgentModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client
            .delete_agent(ctx, id)
            .await
            .deleted(&format!("delete {}", self.suffix))
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<AgentModel, Diagnostic> {
        let id = parse_uuid("id", id)?;
        Ok(AgentModel {
            id: AttrValue::Known(id.to_string()),
            ..Default::default()
        })
    }
}
