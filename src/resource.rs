//! Handler contracts for managed resources and data sources.
//!
//! Handlers implement [`Resource`] or [`DataSource`] over a typed model. The
//! engine only sees the type-erased [`AnyResource`] / [`AnyDataSource`] views,
//! which decode host objects into the model, run the handler, and encode the
//! result back.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::ArchestraClient;
use crate::context::OpContext;
use crate::schema::{Diagnostic, Schema};
use crate::value::{decode, encode};

/// How the engine routes apply calls for a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Create, update and delete map to their own remote calls.
    #[default]
    Normal,
    /// Every mutable attribute requires replacement; update is unreachable.
    ReplacementOnly,
    /// One instance per tenant. Create and update are the same upsert and
    /// delete only forgets local state.
    Singleton,
}

/// Value the provider root hands to every handler at configure time.
#[derive(Clone)]
pub struct ProviderData {
    type_name: &'static str,
    data: Arc<dyn Any + Send + Sync>,
}

impl ProviderData {
    /// Wrap a shared capability.
    pub fn new<T: Any + Send + Sync>(data: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            data: Arc::new(data),
        }
    }

    /// Borrow the capability as `T`, if that is its concrete type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Concrete type name of the wrapped capability.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ProviderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderData")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// The HTTP capability slot every handler carries.
#[derive(Debug, Clone, Default)]
pub struct ClientSlot(Option<ArchestraClient>);

impl ClientSlot {
    /// Receive the capability on behalf of a resource handler.
    pub fn configure_resource(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.configure(data, "Unexpected Resource Configure Type")
    }

    /// Receive the capability on behalf of a data source handler.
    pub fn configure_data_source(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.configure(data, "Unexpected Data Source Configure Type")
    }

    fn configure(&mut self, data: Option<&ProviderData>, summary: &str) -> Vec<Diagnostic> {
        // Schema-only instances are built before the provider is configured.
        let Some(data) = data else {
            return Vec::new();
        };
        match data.downcast::<ArchestraClient>() {
            Some(client) => {
                self.0 = Some(client.clone());
                Vec::new()
            }
            None => vec![Diagnostic::error(summary).with_detail(format!(
                "Expected {}, got: {}. Please report this issue to the provider developers.",
                std::any::type_name::<ArchestraClient>(),
                data.type_name()
            ))],
        }
    }

    /// The configured client.
    pub fn get(&self) -> Result<&ArchestraClient, Diagnostic> {
        self.0.as_ref().ok_or_else(|| {
            Diagnostic::error("Unconfigured Client").with_detail(
                "The provider has not been configured yet. Ensure the provider block is valid.",
            )
        })
    }
}

/// The error for an update on a kind whose changes all force replacement.
pub fn update_not_supported() -> Diagnostic {
    Diagnostic::error("Update Not Supported")
        .with_detail("This resource must be replaced; every attribute change forces a new resource.")
}

/// Lifecycle contract of one managed entity kind.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Typed attribute model. Missing keys must deserialize as null.
    type Model: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Registry key, e.g. `archestra_team` for provider type `archestra`.
    fn metadata(&self, provider_type_name: &str) -> String;

    /// Attribute surface.
    fn schema(&self) -> Schema;

    /// Apply routing for this kind.
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Normal
    }

    /// Receive the shared capability.
    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic>;

    /// Handler-specific checks on a decoded configuration.
    fn validate(&self, config: &Self::Model) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Rewrite the plan after schema modifiers ran.
    fn modify_plan(&self, prior: Option<&Self::Model>, plan: &mut Self::Model) -> Result<(), Diagnostic> {
        let _ = (prior, plan);
        Ok(())
    }

    /// Create the entity; the returned state must be fully known.
    async fn create(&self, ctx: &OpContext, plan: Self::Model) -> Result<Self::Model, Diagnostic>;

    /// Refresh state. `None` means the entity is gone.
    async fn read(&self, ctx: &OpContext, state: Self::Model) -> Result<Option<Self::Model>, Diagnostic>;

    /// Apply plan deltas to an existing entity.
    async fn update(
        &self,
        ctx: &OpContext,
        prior: Self::Model,
        plan: Self::Model,
    ) -> Result<Self::Model, Diagnostic> {
        let _ = (ctx, prior, plan);
        Err(update_not_supported())
    }

    /// Delete the entity. 404 counts as success.
    async fn delete(&self, ctx: &OpContext, state: Self::Model) -> Result<(), Diagnostic> {
        let _ = (ctx, state);
        Err(Diagnostic::error("Delete Not Supported"))
    }

    /// Build the partial state a subsequent read completes.
    async fn import_state(&self, ctx: &OpContext, id: &str) -> Result<Self::Model, Diagnostic>;
}

/// Type-erased [`Resource`] over host JSON objects.
#[async_trait]
pub trait AnyResource: Send + Sync {
    /// See [`Resource::metadata`].
    fn type_name(&self, provider_type_name: &str) -> String;
    /// See [`Resource::schema`].
    fn schema(&self) -> Schema;
    /// See [`Resource::lifecycle`].
    fn lifecycle(&self) -> Lifecycle;
    /// See [`Resource::configure`].
    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic>;
    /// Decode and run handler checks.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;
    /// Decode, rewrite and re-encode a plan. Returns the input unchanged
    /// when the handler did not touch it.
    fn modify_plan(&self, prior: Option<&Value>, planned: Value) -> Result<Value, Diagnostic>;
    /// See [`Resource::create`].
    async fn create(&self, ctx: &OpContext, planned: Value) -> Result<Value, Diagnostic>;
    /// See [`Resource::read`].
    async fn read(&self, ctx: &OpContext, state: Value) -> Result<Option<Value>, Diagnostic>;
    /// See [`Resource::update`].
    async fn update(&self, ctx: &OpContext, prior: Value, planned: Value) -> Result<Value, Diagnostic>;
    /// See [`Resource::delete`].
    async fn delete(&self, ctx: &OpContext, state: Value) -> Result<(), Diagnostic>;
    /// See [`Resource::import_state`].
    async fn import_state(&self, ctx: &OpContext, id: &str) -> Result<Value, Diagnostic>;
}

#[async_trait]
impl<R: Resource> AnyResource for R {
    fn type_name(&self, provider_type_name: &str) -> String {
        self.metadata(provider_type_name)
    }

    fn schema(&self) -> Schema {
        Resource::schema(self)
    }

    fn lifecycle(&self) -> Lifecycle {
        Resource::lifecycle(self)
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        Resource::configure(self, data)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        match decode::<R::Model>(config.clone()) {
            Ok(model) => Resource::validate(self, &model),
            Err(diag) => vec![diag],
        }
    }

    fn modify_plan(&self, prior: Option<&Value>, planned: Value) -> Result<Value, Diagnostic> {
        let prior = prior.map(|p| decode::<R::Model>(p.clone())).transpose()?;
        let mut model: R::Model = decode(planned.clone())?;
        let baseline = encode(&model)?;

        Resource::modify_plan(self, prior.as_ref(), &mut model)?;

        let rewritten = encode(&model)?;
        Ok(if rewritten == baseline { planned } else { rewritten })
    }

    async fn create(&self, ctx: &OpContext, planned: Value) -> Result<Value, Diagnostic> {
        let model = Resource::create(self, ctx, decode(planned)?).await?;
        encode(&model)
    }

    async fn read(&self, ctx: &OpContext, state: Value) -> Result<Option<Value>, Diagnostic> {
        match Resource::read(self, ctx, decode(state)?).await? {
            Some(model) => encode(&model).map(Some),
            None => Ok(None),
        }
    }

    async fn update(&self, ctx: &OpContext, prior: Value, planned: Value) -> Result<Value, Diagnostic> {
        let model = Resource::update(self, ctx, decode(prior)?, decode(planned)?).await?;
        encode(&model)
    }

    async fn delete(&self, ctx: &OpContext, state: Value) -> Result<(), Diagnostic> {
        Resource::delete(self, ctx, decode(state)?).await
    }

    async fn import_state(&self, ctx: &OpContext, id: &str) -> Result<Value, Diagnostic> {
        let model = Resource::import_state(self, ctx, id).await?;
        encode(&model)
    }
}

/// Read-only query contract.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Typed attribute model. Missing keys must deserialize as null.
    type Model: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Registry key.
    fn metadata(&self, provider_type_name: &str) -> String;

    /// Attribute surface.
    fn schema(&self) -> Schema;

    /// Receive the shared capability.
    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic>;

    /// Handler-specific checks on a decoded configuration.
    fn validate(&self, config: &Self::Model) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Resolve the query.
    async fn read(&self, ctx: &OpContext, config: Self::Model) -> Result<Self::Model, Diagnostic>;
}

/// Type-erased [`DataSource`] over host JSON objects.
#[async_trait]
pub trait AnyDataSource: Send + Sync {
    /// See [`DataSource::metadata`].
    fn type_name(&self, provider_type_name: &str) -> String;
    /// See [`DataSource::schema`].
    fn schema(&self) -> Schema;
    /// See [`DataSource::configure`].
    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic>;
    /// Decode and run handler checks.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;
    /// See [`DataSource::read`].
    async fn read(&self, ctx: &OpContext, config: Value) -> Result<Value, Diagnostic>;
}

#[async_trait]
impl<D: DataSource> AnyDataSource for D {
    fn type_name(&self, provider_type_name: &str) -> String {
        self.metadata(provider_type_name)
    }

    fn schema(&self) -> Schema {
        DataSource::schema(self)
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        DataSource::configure(self, data)
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        match decode::<D::Model>(config.clone()) {
            Ok(model) => DataSource::validate(self, &model),
            Err(diag) => vec![diag],
        }
    }

    async fn read(&self, ctx: &OpContext, config: Value) -> Result<Value, Diagnostic> {
        let model = DataSource::read(self, ctx, decode(config)?).await?;
        encode(&model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use crate::value::AttrValue;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct NoteModel {
        id: AttrValue<String>,
        body: AttrValue<String>,
        revision: AttrValue<i64>,
    }

    #[derive(Default)]
    struct NoteResource {
        client: ClientSlot,
    }

    #[async_trait]
    impl Resource for NoteResource {
        type Model = NoteModel;

        fn metadata(&self, provider_type_name: &str) -> String {
            format!("{}_note", provider_type_name)
        }

        fn schema(&self) -> Schema {
            Schema::v0()
                .with_attribute("id", Attribute::computed_string())
                .with_attribute("body", Attribute::required_string())
                .with_attribute("revision", Attribute::computed_int64())
        }

        fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
            self.client.configure_resource(data)
        }

        fn modify_plan(&self, prior: Option<&NoteModel>, plan: &mut NoteModel) -> Result<(), Diagnostic> {
            if prior.is_some_and(|p| p.body != plan.body) {
                plan.revision = AttrValue::Unknown;
            }
            Ok(())
        }

        async fn create(&self, _ctx: &OpContext, mut plan: NoteModel) -> Result<NoteModel, Diagnostic> {
            self.client.get()?;
            plan.id = AttrValue::string("n-1");
            plan.revision = AttrValue::Known(1);
            Ok(plan)
        }

        async fn read(&self, _ctx: &OpContext, state: NoteModel) -> Result<Option<NoteModel>, Diagnostic> {
            Ok(Some(state))
        }

        async fn import_state(&self, _ctx: &OpContext, id: &str) -> Result<NoteModel, Diagnostic> {
            Ok(NoteModel {
                id: AttrValue::string(id),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_provider_data_downcast() {
        let data = ProviderData::new(42u32);
        assert_eq!(data.downcast::<u32>(), Some(&42));
        assert!(data.downcast::<String>().is_none());
        assert_eq!(data.type_name(), "u32");
    }

    #[test]
    fn test_client_slot_rejects_wrong_type() {
        let mut slot = ClientSlot::default();
        assert!(slot.configure_resource(None).is_empty());
        assert_eq!(slot.get().unwrap_err().summary, "Unconfigured Client");

        let diags = slot.configure_data_source(Some(&ProviderData::new("not a client")));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unexpected Data Source Configure Type");
        assert!(diags[0].detail.as_deref().unwrap().contains("got: &str"));
    }

    #[tokio::test]
    async fn test_unconfigured_handler_reports_diagnostic() {
        let resource = NoteResource::default();
        let err = AnyResource::create(&resource, &OpContext::new(), json!({"body": "b"}))
            .await
            .unwrap_err();
        assert_eq!(err.summary, "Unconfigured Client");
    }

    #[test]
    fn test_modify_plan_keeps_untouched_plan() {
        let resource = NoteResource::default();
        let prior = json!({"id": "n-1", "body": "b", "revision": 1});
        let planned = json!({"id": "n-1", "body": "b", "revision": 1, "extra": null});

        let out = AnyResource::modify_plan(&resource, Some(&prior), planned.clone()).unwrap();
        assert_eq!(out, planned);

        let changed = json!({"id": "n-1", "body": "c", "revision": 1});
        let out = AnyResource::modify_plan(&resource, Some(&prior), changed).unwrap();
        assert_eq!(out["revision"], json!(crate::value::UNKNOWN_VALUE));
    }

    #[tokio::test]
    async fn test_default_update_is_unsupported() {
        let resource = NoteResource::default();
        let err = AnyResource::update(&resource, &OpContext::new(), json!({}), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.summary, "Update Not Supported");
        assert_eq!(AnyResource::type_name(&resource, "archestra"), "archestra_note");
        assert_eq!(AnyResource::lifecycle(&resource), Lifecycle::Normal);
    }
}
