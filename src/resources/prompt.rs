//! `archestra_prompt`: a versioned prompt of a profile.
//!
//! Prompts are immutable per version. Every update posts a new version that
//! points at the prior one through `parentPromptId`, so the identifier and
//! version number change on each apply.

use async_trait::async_trait;
use tracing::info;

use crate::client::models::PromptRequest;
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::ids::{parse_uuid, require_uuid};
use crate::mappers::prompts::PromptModel;
use crate::resource::{ClientSlot, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::value::AttrValue;

fn request(model: &PromptModel) -> Result<PromptRequest, Diagnostic> {
    Ok(PromptRequest {
        agent_id: require_uuid("profile_id", &model.profile_id)?,
        name: model.name.to_request().unwrap_or_default(),
        system_prompt: model.system_prompt.to_request(),
        user_prompt: model.user_prompt.to_request(),
        is_active: model.is_active.to_request(),
        parent_prompt_id: None,
    })
}

#[derive(Debug, Clone, Default)]
pub struct PromptResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for PromptResource {
    type Model = PromptModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_prompt", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages a prompt in the private prompt registry. Changes create a new version.")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("Identifier of the current version")
                    .with_state_for_unknown(),
            )
            .with_attribute(
                "profile_id",
                Attribute::required_string()
                    .with_requires_replace()
                    .with_validator(Validator::Uuid),
            )
            .with_attribute("name", Attribute::required_string())
            .with_attribute("system_prompt", Attribute::optional_string())
            .with_attribute("user_prompt", Attribute::optional_string())
            .with_attribute(
                "is_active",
                Attribute::optional_bool().with_default(serde_json::json!(true)),
            )
            .with_attribute("version", Attribute::computed_int64().with_state_for_unknown())
            .with_attribute(
                "parent_prompt_id",
                Attribute::computed_string()
                    .with_description("Identifier of the version this one replaced")
                    .with_state_for_unknown(),
            )
            .with_attribute("created_at", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("updated_at", Attribute::computed_string().with_state_for_unknown())
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    fn modify_plan(&self, prior: Option<&PromptModel>, plan: &mut PromptModel) -> Result<(), Diagnostic> {
        let Some(prior) = prior else {
            return Ok(());
        };
        // Any update mints a version, so the version identity is only known
        // after apply.
        if prior.versioning_change(plan) || prior.is_active != plan.is_active {
            plan.id = AttrValue::Unknown;
            plan.version = AttrValue::Unknown;
            plan.parent_prompt_id = AttrValue::Unknown;
            plan.created_at = AttrValue::Unknown;
            plan.updated_at = AttrValue::Unknown;
        }
        Ok(())
    }

    async fn create(&self, ctx: &OpContext, mut plan: PromptModel) -> Result<PromptModel, Diagnostic> {
        let client = self.client.get()?;
        let prompt = client
            .create_prompt(ctx, &request(&plan)?)
            .await
            .expect_ok("create prompt")?;

        info!(id = %prompt.id, version = prompt.version, "Created prompt");
        plan.apply(&prompt);
        Ok(plan)
    }

    async fn read(&self, ctx: &OpContext, mut state: PromptModel) -> Result<Option<PromptModel>, Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        let Some(prompt) = client.get_prompt(ctx, id).await.found("read prompt")? else {
            return Ok(None);
        };
        state.apply(&prompt);
        Ok(Some(state))
    }

    async fn update(&self, ctx: &OpContext, prior: PromptModel, mut plan: PromptModel) -> Result<PromptModel, Diagnostic> {
        let client = self.client.get()?;
        let prior_id = require_uuid("id", &prior.id)?;

        let mut body = request(&plan)?;
        body.parent_prompt_id = Some(prior_id);
        let prompt = client
            .create_prompt(ctx, &body)
            .await
            .expect_ok("create prompt version")?;

        info!(id = %prompt.id, parent = %prior_id, version = prompt.version, "Created prompt version");
        plan.parent_prompt_id = AttrValue::Known(prior_id.to_string());
        plan.is_active = plan.is_active.or_prior(prior.is_active);
        plan.apply(&prompt);
        Ok(plan)
    }

    async fn delete(&self, ctx: &OpContext, state: PromptModel) -> Result<(), Diagnostic> {
        let client = self.client.get()?;
        let id = require_uuid("id", &state.id)?;
        client.delete_prompt(ctx, id).await.deleted("delete prompt")
    }

    async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<PromptModel, Diagnostic> {
        Ok(PromptModel {
            id: AttrValue::Known(parse_uuid("id", id)?.to_string()),
            ..Default::default()
        })
    }
}
