//! `archestra_roles`: every role of the tenant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ApiResult;
use crate::context::OpContext;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::resources::role::{permissions_type, RoleModel};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::value::AttrValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesModel {
    pub roles: AttrValue<Vec<RoleModel>>,
}

#[derive(Debug, Clone, Default)]
pub struct RolesDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for RolesDataSource {
    type Model = RolesModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_roles", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let role = AttributeType::object([
            ("id", AttributeType::String),
            ("name", AttributeType::String),
            ("description", AttributeType::String),
            ("permissions", permissions_type()),
            ("role", AttributeType::String),
            ("predefined", AttributeType::Bool),
            ("organization_id", AttributeType::String),
        ]);
        Schema::v0()
            .with_description("Lists predefined and custom roles.")
            .with_attribute("roles", Attribute::new(AttributeType::list(role), AttributeFlags::computed()))
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: RolesModel) -> Result<RolesModel, Diagnostic> {
        let client = self.client.get()?;
        let roles = client.list_roles(ctx).await.expect_ok("list roles")?;
        config.roles = AttrValue::Known(
            roles
                .into_iter()
                .map(|role| {
                    let mut model = RoleModel::default();
                    model.apply(role);
                    model
                })
                .collect(),
        );
        Ok(config)
    }
}
