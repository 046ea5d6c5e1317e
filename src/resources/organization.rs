//! `archestra_organization_settings` and `archestra_organization_appearance`.
//!
//! Both manage slices of the tenant's single organization record. Create and
//! update are the same `PATCH /api/organization`; delete only forgets local
//! state. Fields left out of configuration adopt whatever the service holds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::models::{Organization, UpdateOrganization};
use crate::client::{ApiResult, ArchestraClient};
use crate::context::OpContext;
use crate::resource::{ClientSlot, Lifecycle, ProviderData, Resource};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::{empty_as_null, AttrValue};

const FONTS: &[&str] = &["inter", "lato", "open-sans", "roboto", "source-sans-pro"];

const COLOR_THEMES: &[&str] = &[
    "amber-minimal",
    "bold-tech",
    "bubblegum",
    "caffeine",
    "candyland",
    "catppuccin",
    "claude",
    "claymorphism",
    "clean-slate",
    "cosmic-night",
    "cyberpunk",
    "doom-64",
    "elegant-luxury",
    "graphite",
    "kodama-grove",
    "midnight-bloom",
    "mocha-mousse",
    "modern-minimal",
    "mono",
    "nature",
    "neo-brutalism",
    "northern-lights",
    "ocean-breeze",
    "pastel-dreams",
    "perpetuity",
    "quantum-rose",
    "retro-arcade",
    "solar-dusk",
    "starry-night",
    "sunset-horizon",
    "supabase",
    "t3-chat",
    "tangerine",
    "twitter",
    "vercel",
    "vintage-paper",
];

const LIMIT_CLEANUP_INTERVALS: &[&str] = &["1h", "12h", "24h", "1w", "1m"];

const COMPRESSION_SCOPES: &[&str] = &["organization", "team"];

fn font_attribute() -> Attribute {
    Attribute::optional_computed_string()
        .with_description("Custom UI font")
        .with_state_for_unknown()
        .one_of(FONTS)
}

fn color_theme_attribute() -> Attribute {
    Attribute::optional_computed_string()
        .with_description("UI color theme")
        .with_state_for_unknown()
        .one_of(COLOR_THEMES)
}

fn logo_attribute() -> Attribute {
    Attribute::optional_computed_string()
        .with_description("Logo as a base64 data URL")
        .with_state_for_unknown()
}

async fn upsert(
    client: &ArchestraClient,
    ctx: &OpContext,
    body: &UpdateOrganization,
    action: &str,
) -> Result<Organization, Diagnostic> {
    let organization = client.update_organization(ctx, body).await.expect_ok(action)?;
    info!(id = %organization.id, "Updated organization");
    Ok(organization)
}

async fn fetch(client: &ArchestraClient, ctx: &OpContext, action: &str) -> Result<Option<Organization>, Diagnostic> {
    client.get_organization(ctx).await.found(action)
}

// =========================================================================
// Settings
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationSettingsModel {
    pub id: AttrValue<String>,
    pub name: AttrValue<String>,
    pub font: AttrValue<String>,
    pub color_theme: AttrValue<String>,
    pub logo: AttrValue<String>,
    pub limit_cleanup_interval: AttrValue<String>,
    pub compression_scope: AttrValue<String>,
    pub onboarding_complete: AttrValue<bool>,
    pub convert_tool_results_to_toon: AttrValue<bool>,
    pub default_llm_config_id: AttrValue<String>,
    pub default_dual_llm_config_id: AttrValue<String>,
}

impl OrganizationSettingsModel {
    fn apply(&mut self, org: Organization) {
        self.id = AttrValue::Known(org.id);
        self.name = AttrValue::Known(org.name);
        self.font = empty_as_null(org.custom_font);
        self.color_theme = empty_as_null(org.theme);
        self.logo = empty_as_null(org.logo);
        self.limit_cleanup_interval = empty_as_null(org.limit_cleanup_interval);
        self.compression_scope = empty_as_null(org.compression_scope);
        self.onboarding_complete = org.onboarding_complete.into();
        self.convert_tool_results_to_toon = org.convert_tool_results_to_toon.into();
        self.default_llm_config_id = empty_as_null(org.default_llm_config_id);
        self.default_dual_llm_config_id = empty_as_null(org.default_dual_llm_config_id);
    }

    fn request(&self) -> UpdateOrganization {
        UpdateOrganization {
            default_llm_config_id: self.default_llm_config_id.to_request(),
            default_dual_llm_config_id: self.default_dual_llm_config_id.to_request(),
            custom_font: self.font.to_request(),
            theme: self.color_theme.to_request(),
            logo: self.logo.to_request(),
            limit_cleanup_interval: self.limit_cleanup_interval.to_request(),
            compression_scope: self.compression_scope.to_request(),
            onboarding_complete: self.onboarding_complete.to_request(),
            convert_tool_results_to_toon: self.convert_tool_results_to_toon.to_request(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationSettingsResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for OrganizationSettingsResource {
    type Model = OrganizationSettingsModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_organization_settings", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages organization-wide settings. Destroying it leaves the settings in place.")
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("name", Attribute::computed_string().with_state_for_unknown())
            .with_attribute("font", font_attribute())
            .with_attribute("color_theme", color_theme_attribute())
            .with_attribute("logo", logo_attribute())
            .with_attribute(
                "limit_cleanup_interval",
                Attribute::optional_computed_string()
                    .with_description("How often usage counters of limits reset")
                    .with_state_for_unknown()
                    .one_of(LIMIT_CLEANUP_INTERVALS),
            )
            .with_attribute(
                "compression_scope",
                Attribute::optional_computed_string()
                    .with_state_for_unknown()
                    .one_of(COMPRESSION_SCOPES),
            )
            .with_attribute(
                "onboarding_complete",
                Attribute::optional_computed_bool().with_state_for_unknown(),
            )
            .with_attribute(
                "convert_tool_results_to_toon",
                Attribute::optional_computed_bool()
                    .with_description("Convert JSON tool results to TOON to save tokens")
                    .with_state_for_unknown(),
            )
            .with_attribute(
                "default_llm_config_id",
                Attribute::optional_computed_string().with_state_for_unknown(),
            )
            .with_attribute(
                "default_dual_llm_config_id",
                Attribute::optional_computed_string().with_state_for_unknown(),
            )
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Singleton
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: OrganizationSettingsModel,
    ) -> Result<OrganizationSettingsModel, Diagnostic> {
        let client = self.client.get()?;
        let org = upsert(client, ctx, &plan.request(), "update organization settings").await?;
        plan.apply(org);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: OrganizationSettingsModel,
    ) -> Result<Option<OrganizationSettingsModel>, Diagnostic> {
        let client = self.client.get()?;
        let Some(org) = fetch(client, ctx, "read organization settings").await? else {
            return Ok(None);
        };
        state.apply(org);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        _prior: OrganizationSettingsModel,
        plan: OrganizationSettingsModel,
    ) -> Result<OrganizationSettingsModel, Diagnostic> {
        self.create(ctx, plan).await
    }

    async fn import_state(&self, _ctx: &OpContext, _id: &str) -> Result<OrganizationSettingsModel, Diagnostic> {
        Ok(OrganizationSettingsModel::default())
    }
}

// =========================================================================
// Appearance
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationAppearanceModel {
    pub font: AttrValue<String>,
    pub color_theme: AttrValue<String>,
    pub logo: AttrValue<String>,
}

impl OrganizationAppearanceModel {
    fn apply(&mut self, org: Organization) {
        self.font = empty_as_null(org.custom_font);
        self.color_theme = empty_as_null(org.theme);
        self.logo = empty_as_null(org.logo);
    }

    fn request(&self) -> UpdateOrganization {
        UpdateOrganization {
            custom_font: self.font.to_request(),
            theme: self.color_theme.to_request(),
            logo: self.logo.to_request(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationAppearanceResource {
    client: ClientSlot,
}

#[async_trait]
impl Resource for OrganizationAppearanceResource {
    type Model = OrganizationAppearanceModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_organization_appearance", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages the organization's font, theme and logo.")
            .with_attribute("font", font_attribute())
            .with_attribute("color_theme", color_theme_attribute())
            .with_attribute("logo", logo_attribute())
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Singleton
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_resource(data)
    }

    async fn create(
        &self,
        ctx: &OpContext,
        mut plan: OrganizationAppearanceModel,
    ) -> Result<OrganizationAppearanceModel, Diagnostic> {
        let client = self.client.get()?;
        let org = upsert(client, ctx, &plan.request(), "update organization appearance").await?;
        plan.apply(org);
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &OpContext,
        mut state: OrganizationAppearanceModel,
    ) -> Result<Option<OrganizationAppearanceModel>, Diagnostic> {
        let client = self.client.get()?;
        let Some(org) = fetch(client, ctx, "read organization appearance").await? else {
            return Ok(None);
        };
        state.apply(org);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &OpContext,
        _prior: OrganizationAppearanceModel,
        plan: OrganizationAppearanceModel,
    ) -> Result<OrganizationAppearanceModel, Diagnostic> {
        self.create(ctx, plan).await
    }

    async fn import_state(&self, _ctx: &OpContext, _id: &str) -> Result<OrganizationAppearanceModel, Diagnostic> {
        Ok(OrganizationAppearanceModel::default())
    }
}
