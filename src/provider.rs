//! The Archestra provider root.
//!
//! Owns the provider configuration schema, builds the HTTP capability at
//! configure time and hands it to a freshly built set of handlers. Every host
//! operation is dispatched by type name to one of those handlers; the generic
//! parts of the lifecycle (plan computation, apply routing per [`Lifecycle`],
//! drift-delete on read, warning merging) live here.

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{ArchestraClient, Transport};
use crate::context::OpContext;
use crate::error::ProviderError;
use crate::plan;
use crate::registry::{self, PROVIDER_TYPE_NAME};
use crate::resource::{update_not_supported, AnyDataSource, AnyResource, Lifecycle, ProviderData};
use crate::schema::{has_errors, Attribute, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, Outcome, PlanResult};
use crate::validation;
use crate::value::{contains_unknown, is_unknown, Sensitive};

/// Environment fallback for `base_url`.
pub const BASE_URL_ENV: &str = "ARCHESTRA_BASE_URL";

/// Environment fallback for `api_key`.
pub const API_KEY_ENV: &str = "ARCHESTRA_API_KEY";

/// Resolved connection settings.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: Sensitive<String>,
}

/// The provider block schema. Both settings are optional here so the
/// environment fallback can supply them.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_description("Manages an Archestra deployment through its HTTP API.")
        .with_attribute(
            "base_url",
            Attribute::optional_string()
                .with_description(format!("Archestra API base URL. May also be set with {}.", BASE_URL_ENV)),
        )
        .with_attribute(
            "api_key",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!("Archestra API key. May also be set with {}.", API_KEY_ENV)),
        )
}

fn setting(
    config: &Value,
    attribute: &str,
    env_var: &str,
    label: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, Diagnostic> {
    let configured = config.get(attribute).unwrap_or(&Value::Null);
    if is_unknown(configured) {
        return Err(Diagnostic::attribute_error(
            attribute,
            format!("Unknown Archestra API {}", label),
            format!(
                "The provider cannot create the Archestra API client because the {} value is not yet known. \
                 Set it statically in the configuration or use the {} environment variable.",
                attribute, env_var
            ),
        ));
    }

    configured
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| lookup(env_var).filter(|s| !s.is_empty()))
        .ok_or_else(|| {
            Diagnostic::attribute_error(
                attribute,
                format!("Missing Archestra API {}", label),
                format!(
                    "Set the {} value in the provider configuration or use the {} environment variable.",
                    attribute, env_var
                ),
            )
        })
}

/// Resolve the connection settings from the provider block, falling back to
/// `lookup` for each unset value. Explicit configuration wins.
pub fn resolve_endpoint(config: &Value, lookup: impl Fn(&str) -> Option<String>) -> Result<Endpoint, Vec<Diagnostic>> {
    let base_url = setting(config, "base_url", BASE_URL_ENV, "Base URL", &lookup);
    let api_key = setting(config, "api_key", API_KEY_ENV, "Key", &lookup);

    let (base_url, api_key) = match (base_url, api_key) {
        (Ok(base_url), Ok(api_key)) => (base_url, api_key),
        (base_url, api_key) => return Err(base_url.err().into_iter().chain(api_key.err()).collect()),
    };

    let valid = Url::parse(&base_url)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !valid {
        return Err(vec![Diagnostic::attribute_error(
            "base_url",
            "Invalid Archestra API Base URL",
            format!("'{}' is not an absolute http or https URL.", base_url),
        )]);
    }

    Ok(Endpoint {
        base_url,
        api_key: Sensitive::new(api_key),
    })
}

/// Handler instances keyed by registry name.
struct Handlers {
    resources: HashMap<String, Arc<dyn AnyResource>>,
    data_sources: HashMap<String, Arc<dyn AnyDataSource>>,
}

impl Handlers {
    fn build(data: Option<&ProviderData>) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        let resources = registry::resources()
            .into_iter()
            .map(|mut handler| {
                diagnostics.extend(handler.configure(data));
                (handler.type_name(PROVIDER_TYPE_NAME), Arc::from(handler))
            })
            .collect();

        let data_sources = registry::data_sources()
            .into_iter()
            .map(|mut handler| {
                diagnostics.extend(handler.configure(data));
                (handler.type_name(PROVIDER_TYPE_NAME), Arc::from(handler))
            })
            .collect();

        (
            Self {
                resources,
                data_sources,
            },
            diagnostics,
        )
    }
}

/// The Archestra provider.
pub struct ArchestraProvider {
    handlers: RwLock<Arc<Handlers>>,
    transport: Option<Arc<dyn Transport>>,
    shutdown: CancellationToken,
}

impl Default for ArchestraProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchestraProvider {
    /// A provider that talks to the configured endpoint over HTTPS.
    pub fn new() -> Self {
        let (handlers, _) = Handlers::build(None);
        Self {
            handlers: RwLock::new(Arc::new(handlers)),
            transport: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// A provider whose client sends every request through `transport`.
    /// The endpoint settings are still resolved and validated.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            ..Self::new()
        }
    }

    fn handlers(&self) -> Arc<Handlers> {
        match self.handlers.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn install(&self, handlers: Handlers) {
        let mut guard = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(handlers);
    }

    fn resource(&self, type_name: &str) -> Result<Arc<dyn AnyResource>, ProviderError> {
        self.handlers()
            .resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<Arc<dyn AnyDataSource>, ProviderError> {
        self.handlers()
            .data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownDataSource(type_name.to_string()))
    }

    fn context(&self) -> OpContext {
        OpContext::with_cancellation(self.shutdown.child_token())
    }

    fn connect(&self, endpoint: &Endpoint) -> Result<ArchestraClient, Diagnostic> {
        if let Some(transport) = &self.transport {
            return Ok(ArchestraClient::new(transport.clone()));
        }
        ArchestraClient::connect(&endpoint.base_url, endpoint.api_key.expose()).map_err(|e| {
            Diagnostic::error("Unable to Create Archestra API Client").with_detail(e.to_string())
        })
    }
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

/// Merge the context's warnings after an operation's own diagnostics.
fn finish<T>(ctx: &OpContext, value: T, mut diagnostics: Vec<Diagnostic>) -> Outcome<T> {
    diagnostics.extend(ctx.take_warnings());
    Outcome::with_diagnostics(value, diagnostics)
}

fn check_known(resource_type: &str, state: Value) -> Result<Value, Diagnostic> {
    if contains_unknown(&state) {
        return Err(Diagnostic::error("Provider Returned Unknown Value").with_detail(format!(
            "After applying changes to {} the provider still reported unknown attribute values. \
             Please report this issue to the provider developers.",
            resource_type
        )));
    }
    Ok(state)
}

#[async_trait]
impl ProviderService for ArchestraProvider {
    fn schema(&self) -> ProviderSchema {
        let handlers = self.handlers();
        let mut schema = ProviderSchema::new().with_provider_config(provider_config_schema());
        for (name, handler) in &handlers.resources {
            schema = schema.with_resource(name.clone(), handler.schema());
        }
        for (name, handler) in &handlers.data_sources {
            schema = schema.with_data_source(name.clone(), handler.schema());
        }
        schema
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&provider_config_schema(), &config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        let endpoint = match resolve_endpoint(&config, |name| env::var(name).ok()) {
            Ok(endpoint) => endpoint,
            Err(errors) => {
                diagnostics.extend(errors);
                return Ok(diagnostics);
            }
        };

        let client = match self.connect(&endpoint) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return Ok(diagnostics);
            }
        };

        let data = ProviderData::new(client);
        let (handlers, configure_diagnostics) = Handlers::build(Some(&data));
        diagnostics.extend(configure_diagnostics);
        if !has_errors(&diagnostics) {
            info!(base_url = %endpoint.base_url, "Archestra provider configured");
            self.install(handlers);
        }
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.shutdown.cancel();
        Ok(())
    }

    async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let mut diagnostics = validation::validate(&handler.schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(handler.validate(&config));
        }
        Ok(diagnostics)
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.data_source(data_source_type)?;
        let mut diagnostics = validation::validate(&handler.schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(handler.validate(&config));
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<Outcome<Option<PlanResult>>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let schema = handler.schema();
        let prior = present(prior_state);

        if proposed_state.is_null() {
            let mut plan = PlanResult::destroy();
            plan.changes = plan::changes(&schema, prior.as_ref(), &Value::Null);
            return Ok(Outcome::new(Some(plan)));
        }

        let planned = plan::plan_attributes(&schema, prior.as_ref(), &proposed_state, &config);
        let planned = match handler.modify_plan(prior.as_ref(), planned) {
            Ok(planned) => planned,
            Err(diag) => return Ok(Outcome::failed(vec![diag])),
        };

        let requires_replace = prior
            .as_ref()
            .map(|p| plan::requires_replace(&schema, p, &planned))
            .unwrap_or_default();
        let changes = plan::changes(&schema, prior.as_ref(), &planned);
        debug!(resource_type, changes = changes.len(), replace = requires_replace.len(), "Planned");

        Ok(Outcome::new(Some(PlanResult {
            planned_state: planned,
            requires_replace,
            changes,
        })))
    }

    async fn apply(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        planned_state: Option<Value>,
        _config: Value,
    ) -> Result<Outcome<Option<Value>>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let ctx = self.context();

        match (present(prior_state), present(planned_state)) {
            (None, None) => Ok(Outcome::new(None)),
            (Some(prior), None) => {
                if handler.lifecycle() == Lifecycle::Singleton {
                    info!(resource_type, "Removing singleton from state only");
                    return Ok(Outcome::new(None));
                }
                match handler.delete(&ctx, prior.clone()).await {
                    Ok(()) => {
                        info!(resource_type, "Deleted");
                        Ok(finish(&ctx, None, Vec::new()))
                    }
                    Err(diag) => Ok(finish(&ctx, Some(prior), vec![diag])),
                }
            }
            (None, Some(planned)) => {
                let created = handler
                    .create(&ctx, planned)
                    .await
                    .and_then(|state| check_known(resource_type, state));
                match created {
                    Ok(state) => {
                        info!(resource_type, "Created");
                        Ok(finish(&ctx, Some(state), Vec::new()))
                    }
                    Err(diag) => Ok(finish(&ctx, None, vec![diag])),
                }
            }
            (Some(prior), Some(planned)) => {
                if handler.lifecycle() == Lifecycle::ReplacementOnly {
                    return Ok(Outcome::with_diagnostics(Some(prior), vec![update_not_supported()]));
                }
                let updated = handler
                    .update(&ctx, prior.clone(), planned)
                    .await
                    .and_then(|state| check_known(resource_type, state));
                match updated {
                    Ok(state) => {
                        info!(resource_type, "Updated");
                        Ok(finish(&ctx, Some(state), Vec::new()))
                    }
                    Err(diag) => Ok(finish(&ctx, Some(prior), vec![diag])),
                }
            }
        }
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Outcome<Option<Value>>, ProviderError> {
        let handler = self.resource(resource_type)?;
        if current_state.is_null() {
            return Ok(Outcome::new(None));
        }
        let ctx = self.context();

        match handler.read(&ctx, current_state.clone()).await {
            Ok(Some(state)) => Ok(finish(&ctx, Some(state), Vec::new())),
            Ok(None) => {
                warn!(resource_type, "Resource no longer exists, removing from state");
                Ok(finish(&ctx, None, Vec::new()))
            }
            Err(diag) => Ok(finish(&ctx, Some(current_state), vec![diag])),
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Outcome<Vec<ImportedResource>>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let ctx = self.context();

        match handler.import_state(&ctx, id).await {
            Ok(state) => {
                info!(resource_type, id, "Imported");
                Ok(finish(&ctx, vec![ImportedResource::new(resource_type, state)], Vec::new()))
            }
            Err(diag) => Ok(finish(&ctx, Vec::new(), vec![diag])),
        }
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Outcome<Option<Value>>, ProviderError> {
        let handler = self.data_source(data_source_type)?;
        let ctx = self.context();

        match handler.read(&ctx, config).await {
            Ok(state) => Ok(finish(&ctx, Some(state), Vec::new())),
            Err(diag) => Ok(finish(&ctx, None, vec![diag])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{configured_tester, MockTransport, ProviderTester};
    use crate::value::UNKNOWN_VALUE;
    use reqwest::Method;
    use serde_json::json;

    const TEAM: &str = "66666666-6666-6666-6666-666666666666";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_explicit_config_wins_over_environment() {
        let config = json!({"base_url": "https://a.example", "api_key": "from-config"});
        let endpoint = resolve_endpoint(&config, |_| Some("https://env.example".to_string())).unwrap();
        assert_eq!(endpoint.base_url, "https://a.example");
        assert_eq!(endpoint.api_key.expose(), "from-config");
    }

    #[test]
    fn test_environment_fallback() {
        let endpoint = resolve_endpoint(&json!({}), |name| match name {
            BASE_URL_ENV => Some("http://localhost:9000".to_string()),
            API_KEY_ENV => Some("env-key".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:9000");
        assert_eq!(endpoint.api_key.expose(), "env-key");
        assert_eq!(format!("{:?}", endpoint.api_key), "<redacted>");
    }

    #[test]
    fn test_missing_settings_are_pinned() {
        let errors = resolve_endpoint(&json!({"base_url": ""}), no_env).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].summary, "Missing Archestra API Base URL");
        assert_eq!(errors[0].attribute.as_deref(), Some("base_url"));
        assert_eq!(errors[1].summary, "Missing Archestra API Key");
        assert_eq!(errors[1].attribute.as_deref(), Some("api_key"));
    }

    #[test]
    fn test_unknown_and_invalid_settings() {
        let errors = resolve_endpoint(&json!({"base_url": UNKNOWN_VALUE, "api_key": "k"}), no_env).unwrap_err();
        assert_eq!(errors[0].summary, "Unknown Archestra API Base URL");

        let errors = resolve_endpoint(&json!({"base_url": "not a url", "api_key": "k"}), no_env).unwrap_err();
        assert_eq!(errors[0].summary, "Invalid Archestra API Base URL");
        assert_eq!(errors[0].attribute.as_deref(), Some("base_url"));
    }

    #[tokio::test]
    async fn test_configure_sends_no_requests() {
        let mock = MockTransport::new();
        let _tester = configured_tester(&mock).await;
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_operation_before_configure_is_diagnosed() {
        let provider = ArchestraProvider::new();
        let outcome = provider
            .read_data_source("archestra_team", json!({"name": "eng"}))
            .await
            .unwrap();
        assert!(outcome.value.is_none());
        assert_eq!(outcome.diagnostics[0].summary, "Unconfigured Client");
    }

    #[tokio::test]
    async fn test_unknown_type_is_an_error() {
        let provider = ArchestraProvider::new();
        let err = provider.read("archestra_widget", json!({"id": "x"})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(name) if name == "archestra_widget"));

        let err = provider
            .read_data_source("archestra_widget", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownDataSource(_)));
    }

    #[tokio::test]
    async fn test_schema_lists_every_handler() {
        let tester = ProviderTester::new(ArchestraProvider::new());
        let schema = tester.schema();
        assert_eq!(schema.resources.len(), 19);
        assert_eq!(schema.data_sources.len(), 13);
        assert!(schema.provider.attribute("api_key").unwrap().flags.sensitive);
    }

    #[tokio::test]
    async fn test_drift_delete_emits_no_diagnostic() {
        let mock = MockTransport::new();
        mock.respond(Method::GET, &format!("/api/teams/{}", TEAM), 404, Value::Null);
        let tester = configured_tester(&mock).await;

        let outcome = tester
            .provider()
            .read("archestra_team", json!({"id": TEAM, "name": "eng"}))
            .await
            .unwrap();
        assert!(outcome.value.is_none());
        assert!(outcome.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_prior_state() {
        let mock = MockTransport::new();
        mock.respond(
            Method::PUT,
            &format!("/api/teams/{}", TEAM),
            400,
            json!({"error": {"message": "name taken"}}),
        );
        let tester = configured_tester(&mock).await;

        let prior = json!({"id": TEAM, "name": "eng", "description": null,
            "organization_id": "org-1", "created_by": "u", "created_at": "t"});
        let mut planned = prior.clone();
        planned["name"] = json!("platform");

        let outcome = tester
            .provider()
            .apply("archestra_team", Some(prior.clone()), Some(planned), json!({"name": "platform"}))
            .await
            .unwrap();
        assert_eq!(outcome.value, Some(prior));
        assert!(outcome.has_errors());
    }

    #[tokio::test]
    async fn test_apply_builds_requests_from_planned_state() {
        let mock = MockTransport::new();
        mock.respond(Method::POST, "/api/teams", 200, json!({"id": TEAM, "name": "eng"}));
        let tester = configured_tester(&mock).await;

        let planned = json!({"id": UNKNOWN_VALUE, "name": "eng", "description": null,
            "organization_id": UNKNOWN_VALUE, "created_by": UNKNOWN_VALUE, "created_at": UNKNOWN_VALUE});
        let outcome = tester
            .provider()
            .apply("archestra_team", None, Some(planned), json!({"name": "ignored"}))
            .await
            .unwrap();

        assert!(!outcome.has_errors());
        assert_eq!(outcome.value.unwrap()["name"], "eng");
        let body = mock.requests_to(Method::POST, "/api/teams")[0].body.clone().unwrap();
        assert_eq!(body["name"], "eng");
    }

    #[tokio::test]
    async fn test_destroy_plan_lists_removals() {
        let tester = ProviderTester::new(ArchestraProvider::new());
        let plan = tester
            .plan_delete("archestra_team", json!({"id": TEAM, "name": "eng"}))
            .await
            .unwrap();
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes.len(), 2);
    }

    #[tokio::test]
    async fn test_stop_cancels_in_flight_operations() {
        let mock = MockTransport::new();
        mock.respond_pending(Method::GET, &format!("/api/teams/{}", TEAM));
        let tester = configured_tester(&mock).await;
        let provider = tester.provider();

        let read = provider.read("archestra_team", json!({"id": TEAM, "name": "eng"}));
        let stop = async {
            tokio::task::yield_now().await;
            provider.stop().await.unwrap();
        };
        let (outcome, ()) = tokio::join!(read, stop);

        let outcome = outcome.unwrap();
        assert!(outcome.has_errors());
        assert_eq!(outcome.value.unwrap()["id"], TEAM);
    }
}
