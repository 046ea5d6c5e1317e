//! Testing utilities for the provider.
//!
//! [`MockTransport`] replays scripted API responses keyed by method and path
//! and records every request. [`ProviderTester`] drives a [`ProviderService`]
//! without spinning up a gRPC server.
//!
//! # Example
//!
//! ```ignore
//! use archestra_provider::testing::{configured_tester, MockTransport};
//! use reqwest::Method;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_team() {
//!     let mock = MockTransport::new();
//!     mock.respond(Method::POST, "/api/teams", 200, json!({"id": "...", "name": "eng"}));
//!     let tester = configured_tester(&mock).await;
//!
//!     let state = tester.lifecycle_create("archestra_team", json!({"name": "eng"})).await.unwrap();
//!     assert_eq!(state["name"], "eng");
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::client::{ApiRequest, ApiResponse, ArchestraClient, ClientError, Transport};
use crate::error::ProviderError;
use crate::provider::ArchestraProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, Outcome, PlanResult};

// =========================================================================
// Mock transport
// =========================================================================

#[derive(Debug, Clone)]
enum Scripted {
    Reply(ApiResponse),
    Pending,
}

/// In-memory [`Transport`] for tests.
///
/// Each route holds a queue of responses; the last one repeats. Requests to
/// unscripted routes answer 500 so they fail loudly.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn response(status: u16, body: Value) -> ApiResponse {
    let body = if body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(&body).unwrap_or_default()
    };
    ApiResponse { status, body }
}

impl MockTransport {
    /// Create an empty transport.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A client over this transport.
    pub fn client(self: &Arc<Self>) -> ArchestraClient {
        ArchestraClient::new(self.clone())
    }

    fn script(&self, method: Method, path: &str, responses: Vec<Scripted>) {
        lock(&self.routes).insert((method, path.to_string()), responses.into());
    }

    /// Answer every `method path` request with `status` and a JSON body.
    /// A `Value::Null` body sends no bytes.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.script(method, path, vec![Scripted::Reply(response(status, body))]);
    }

    /// Answer successive requests in order; the last response repeats.
    pub fn respond_sequence(&self, method: Method, path: &str, responses: Vec<(u16, Value)>) {
        let scripted = responses
            .into_iter()
            .map(|(status, body)| Scripted::Reply(response(status, body)))
            .collect();
        self.script(method, path, scripted);
    }

    /// Never answer requests to this route.
    pub fn respond_pending(&self, method: Method, path: &str) {
        self.script(method, path, vec![Scripted::Pending]);
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// Requests sent to one route.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    fn next(&self, method: &Method, path: &str) -> Option<Scripted> {
        let mut routes = lock(&self.routes);
        let queue = routes.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let scripted = self.next(&request.method, &request.path);
        let unexpected = format!("unexpected request: {} {}", request.method, request.path);
        lock(&self.requests).push(request);

        match scripted {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Pending) => std::future::pending().await,
            None => Ok(ApiResponse {
                status: 500,
                body: serde_json::to_vec(&serde_json::json!({ "message": unexpected })).unwrap_or_default(),
            }),
        }
    }
}

/// A provider configured against `mock`.
pub async fn configured_tester(mock: &Arc<MockTransport>) -> ProviderTester<ArchestraProvider> {
    let tester = ProviderTester::new(ArchestraProvider::with_transport(mock.clone()));
    let diagnostics = tester
        .provider()
        .configure(serde_json::json!({
            "base_url": "https://archestra.test",
            "api_key": "test-key",
        }))
        .await
        .unwrap_or_else(|e| vec![Diagnostic::from(e)]);
    assert_no_errors(&diagnostics);
    tester
}

// =========================================================================
// Provider tester
// =========================================================================

/// A test harness for provider implementations.
///
/// Wraps a `ProviderService` and exposes host-like operations that turn
/// error diagnostics into [`TestError`].
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.schema().resources.keys().cloned().collect()
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.schema().data_sources.keys().cloned().collect()
    }

    fn resource_schema(&self, resource_type: &str) -> Result<Schema, TestError> {
        self.schema()
            .resources
            .remove(resource_type)
            .ok_or_else(|| TestError::Provider(ProviderError::UnknownResource(resource_type.to_string())))
    }

    /// Configure the provider.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_resource_config(resource_type, config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(&self, data_source_type: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// The proposed new state the host would send for `config`: configured
    /// values, with computed attributes carried over from `prior`.
    pub fn propose(&self, resource_type: &str, prior: Option<&Value>, config: &Value) -> Result<Value, TestError> {
        let schema = self.resource_schema(resource_type)?;
        let mut proposed = Map::new();
        for (name, attr) in schema.attributes() {
            let configured = config.get(name).cloned().unwrap_or(Value::Null);
            let value = if configured.is_null() && attr.flags.computed {
                prior.and_then(|p| p.get(name)).cloned().unwrap_or(Value::Null)
            } else {
                configured
            };
            proposed.insert(name.clone(), value);
        }
        Ok(Value::Object(proposed))
    }

    /// Full plan operation with explicit inputs.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, TestError> {
        let outcome = self
            .provider
            .plan(resource_type, prior_state, proposed_state, config)
            .await?;
        let plan = into_result(outcome)?;
        plan.ok_or_else(|| TestError::Diagnostics(vec![Diagnostic::error("No plan returned")]))
    }

    /// Plan a resource creation.
    pub async fn plan_create(&self, resource_type: &str, config: Value) -> Result<PlanResult, TestError> {
        let proposed = self.propose(resource_type, None, &config)?;
        self.plan(resource_type, None, proposed, config).await
    }

    /// Plan a resource update.
    pub async fn plan_update(&self, resource_type: &str, prior_state: Value, config: Value) -> Result<PlanResult, TestError> {
        let proposed = self.propose(resource_type, Some(&prior_state), &config)?;
        self.plan(resource_type, Some(prior_state), proposed, config).await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(&self, resource_type: &str, prior_state: Value) -> Result<PlanResult, TestError> {
        self.plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Apply a planned creation.
    pub async fn create(&self, resource_type: &str, planned_state: Value, config: Value) -> Result<Value, TestError> {
        let outcome = self
            .provider
            .apply(resource_type, None, Some(planned_state), config)
            .await?;
        into_result(outcome)?.ok_or_else(|| TestError::Diagnostics(vec![Diagnostic::error("No state returned")]))
    }

    /// Apply a planned update.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        let outcome = self
            .provider
            .apply(resource_type, Some(prior_state), Some(planned_state), config)
            .await?;
        into_result(outcome)?.ok_or_else(|| TestError::Diagnostics(vec![Diagnostic::error("No state returned")]))
    }

    /// Apply a deletion.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), TestError> {
        let outcome = self
            .provider
            .apply(resource_type, Some(current_state), None, Value::Null)
            .await?;
        into_result(outcome).map(|_| ())
    }

    /// Read the current state of a resource. `None` means drift-deleted.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>, TestError> {
        let outcome = self.provider.read(resource_type, current_state).await?;
        into_result(outcome)
    }

    /// Import an existing resource.
    pub async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, TestError> {
        let outcome = self.provider.import_resource(resource_type, id).await?;
        into_result(outcome)
    }

    /// Read a data source.
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, TestError> {
        let outcome = self.provider.read_data_source(data_source_type, config).await?;
        into_result(outcome)?.ok_or_else(|| TestError::Diagnostics(vec![Diagnostic::error("No state returned")]))
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → apply → read.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        let plan = self.plan_create(resource_type, config.clone()).await?;
        let created = self.create(resource_type, plan.planned_state, config).await?;
        self.read(resource_type, created)
            .await?
            .ok_or_else(|| TestError::Diagnostics(vec![Diagnostic::error("Resource disappeared after create")]))
    }

    /// Run a full update lifecycle: plan → apply → read.
    pub async fn lifecycle_update(&self, resource_type: &str, prior_state: Value, config: Value) -> Result<Value, TestError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config.clone())
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state, config)
            .await?;
        self.read(resource_type, updated)
            .await?
            .ok_or_else(|| TestError::Diagnostics(vec![Diagnostic::error("Resource disappeared after update")]))
    }

    /// Run a full delete lifecycle: plan → apply.
    pub async fn lifecycle_delete(&self, resource_type: &str, current_state: Value) -> Result<(), TestError> {
        let plan = self.plan_delete(resource_type, current_state.clone()).await?;
        assert!(plan.planned_state.is_null(), "Expected a destroy plan");
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl TestError {
    /// The error diagnostics, empty for provider errors.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            TestError::Diagnostics(diags) => diags,
            TestError::Provider(_) => &[],
        }
    }
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn errors_only(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect()
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors = errors_only(diagnostics);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn into_result<T>(outcome: Outcome<T>) -> Result<T, TestError> {
    check_diagnostics(outcome.diagnostics)?;
    Ok(outcome.value)
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates changes but no replacement.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
    assert!(
        plan.requires_replace.is_empty(),
        "Expected plan to update in place, but it replaces on {:?}",
        plan.requires_replace
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan replaces the resource because of `path`.
///
/// # Panics
///
/// Panics if `path` is not among the requires-replace paths.
pub fn assert_plan_replaces(plan: &PlanResult, path: &str) {
    assert!(
        plan.requires_replace.iter().any(|p| p == path),
        "Expected plan to require replacement on '{}', got {:?}",
        path,
        plan.requires_replace
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| (&d.summary, &d.detail)).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error whose summary or detail contains
/// `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics.iter().any(|d| {
        d.is_error() && (d.summary.contains(substring) || d.detail.as_deref().is_some_and(|s| s.contains(substring)))
    });

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| (&d.summary, &d.detail))
            .collect::<Vec<_>>()
    );
}
