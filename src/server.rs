//! Server helpers for running the provider.
//!
//! This module provides the `ProviderService` trait the provider root
//! implements, and the `serve` functions that expose it over gRPC with the
//! handshake protocol.
//!
//! # Signal Handling
//!
//! The server handles OS signals (SIGTERM, SIGINT) for graceful shutdown.
//! When a signal is received, the server:
//! 1. Stops accepting new connections
//! 2. Waits for in-flight requests to complete, at most `shutdown_timeout`
//! 3. Calls the provider's `stop()` method
//! 4. Exits cleanly

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::schema::{has_errors, Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{ImportedResource, Outcome, PlanResult, HANDSHAKE_PREFIX, PROTOCOL_VERSION};

/// The operations the host drives, over ergonomic Rust types.
///
/// Attribute objects are `serde_json::Value`s. `None` states mean "no object":
/// a `None` prior state applies a create, a `None` planned state a delete,
/// and a `None` read result removes the resource from state.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider block before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(crate::validation::validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully, cancelling in-flight operations.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Compute the planned state for a change. A `Value::Null` proposed state
    /// plans a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<Outcome<Option<PlanResult>>, ProviderError>;

    /// Apply a planned create, update or delete.
    async fn apply(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        planned_state: Option<Value>,
        config: Value,
    ) -> Result<Outcome<Option<Value>>, ProviderError>;

    /// Refresh a resource's state.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Outcome<Option<Value>>, ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Outcome<Vec<ImportedResource>>, ProviderError>;

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Read data from the remote service.
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Outcome<Option<Value>>, ProviderError>;
}

/// Wrapper that implements the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

fn diagnostic_to_proto(diagnostic: Diagnostic) -> crate::generated::Diagnostic {
    let severity = match diagnostic.severity {
        DiagnosticSeverity::Error => crate::generated::diagnostic::Severity::Error,
        DiagnosticSeverity::Warning => crate::generated::diagnostic::Severity::Warning,
    };
    crate::generated::Diagnostic {
        severity: severity as i32,
        summary: diagnostic.summary,
        detail: diagnostic.detail.unwrap_or_default(),
        attribute: diagnostic.attribute.unwrap_or_default(),
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<crate::generated::Diagnostic> {
    diagnostics.into_iter().map(diagnostic_to_proto).collect()
}

fn error_to_diagnostics(err: ProviderError) -> Vec<crate::generated::Diagnostic> {
    vec![diagnostic_to_proto(Diagnostic::from(err))]
}

fn schema_to_proto(schema: &crate::schema::Schema) -> crate::generated::Schema {
    crate::generated::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &crate::schema::Block) -> crate::generated::Block {
    crate::generated::Block {
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| crate::generated::Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                description: attr.description.clone().unwrap_or_default(),
                required: attr.flags.required,
                optional: attr.flags.optional,
                computed: attr.flags.computed,
                sensitive: attr.flags.sensitive,
                requires_replace: attr.requires_replace(),
                default_value: attr
                    .default_value()
                    .and_then(|v| serde_json::to_vec(v).ok())
                    .unwrap_or_default(),
            })
            .collect(),
        description: block.description.clone().unwrap_or_default(),
    }
}

/// An empty byte string is "no object".
fn decode_object(bytes: &[u8]) -> Result<Option<Value>, ProviderError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(bytes)?))
}

/// Configurations are always objects; an empty one stands in for none.
fn decode_config(bytes: &[u8]) -> Result<Value, ProviderError> {
    Ok(decode_object(bytes)?.unwrap_or_else(|| Value::Object(Map::new())))
}

fn encode_object(value: Option<&Value>) -> Vec<u8> {
    value
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::to_vec(v).ok())
        .unwrap_or_default()
}

fn log_diagnostics(rpc: &str, type_name: &str, diagnostics: &[Diagnostic]) {
    if has_errors(diagnostics) {
        warn!(rpc, type_name, diagnostics = diagnostics.len(), "Completed with errors");
    } else {
        debug!(rpc, type_name, diagnostics = diagnostics.len(), "Completed");
    }
}

#[tonic::async_trait]
impl<P: ProviderService> crate::generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_provider_schema")]
    async fn get_provider_schema(
        &self,
        _request: tonic::Request<crate::generated::GetProviderSchemaRequest>,
    ) -> Result<tonic::Response<crate::generated::GetProviderSchemaResponse>, tonic::Status> {
        debug!("GetProviderSchema called");
        let schema = self.provider.schema();
        info!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "GetProviderSchema completed"
        );
        Ok(tonic::Response::new(crate::generated::GetProviderSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resource_schemas: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_source_schemas: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<crate::generated::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<crate::generated::ValidateProviderConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = async {
            let config = decode_config(&req.config)?;
            self.provider.validate_provider_config(config).await
        }
        .await;

        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateProviderConfig", "provider", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_diagnostics(e)
            }
        };
        Ok(tonic::Response::new(crate::generated::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.configure_provider")]
    async fn configure_provider(
        &self,
        request: tonic::Request<crate::generated::ConfigureProviderRequest>,
    ) -> Result<tonic::Response<crate::generated::ConfigureProviderResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(host_version = %req.host_version, "ConfigureProvider called");
        let result = async {
            let config = decode_config(&req.config)?;
            self.provider.configure(config).await
        }
        .await;

        let diagnostics = match result {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "ConfigureProvider completed with errors");
                } else {
                    info!("ConfigureProvider completed successfully");
                }
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ConfigureProvider failed");
                error_to_diagnostics(e)
            }
        };
        Ok(tonic::Response::new(crate::generated::ConfigureProviderResponse { diagnostics }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop_provider")]
    async fn stop_provider(
        &self,
        _request: tonic::Request<crate::generated::StopProviderRequest>,
    ) -> Result<tonic::Response<crate::generated::StopProviderResponse>, tonic::Status> {
        info!("StopProvider called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "StopProvider failed");
                e.to_string()
            }
        };
        Ok(tonic::Response::new(crate::generated::StopProviderResponse { error }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<crate::generated::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<crate::generated::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ValidateResourceConfig called");
        let result = async {
            let config = decode_config(&req.config)?;
            self.provider.validate_resource_config(&req.type_name, config).await
        }
        .await;

        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateResourceConfig", &req.type_name, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ValidateResourceConfig failed");
                error_to_diagnostics(e)
            }
        };
        Ok(tonic::Response::new(crate::generated::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_data_resource_config")]
    async fn validate_data_resource_config(
        &self,
        request: tonic::Request<crate::generated::ValidateDataResourceConfigRequest>,
    ) -> Result<tonic::Response<crate::generated::ValidateDataResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ValidateDataResourceConfig called");
        let result = async {
            let config = decode_config(&req.config)?;
            self.provider.validate_data_source_config(&req.type_name, config).await
        }
        .await;

        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateDataResourceConfig", &req.type_name, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ValidateDataResourceConfig failed");
                error_to_diagnostics(e)
            }
        };
        Ok(tonic::Response::new(crate::generated::ValidateDataResourceConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.plan_resource_change")]
    async fn plan_resource_change(
        &self,
        request: tonic::Request<crate::generated::PlanResourceChangeRequest>,
    ) -> Result<tonic::Response<crate::generated::PlanResourceChangeResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, is_create = req.prior_state.is_empty(), "PlanResourceChange called");
        let result = async {
            let prior_state = decode_object(&req.prior_state)?;
            let proposed_state = decode_object(&req.proposed_new_state)?.unwrap_or(Value::Null);
            let config = decode_config(&req.config)?;
            self.provider
                .plan(&req.type_name, prior_state, proposed_state, config)
                .await
        }
        .await;

        let response = match result {
            Ok(Outcome { value, diagnostics }) => {
                log_diagnostics("PlanResourceChange", &req.type_name, &diagnostics);
                let plan = value.unwrap_or_else(PlanResult::destroy);
                crate::generated::PlanResourceChangeResponse {
                    planned_state: encode_object(Some(&plan.planned_state)),
                    requires_replace: plan.requires_replace,
                    changes: plan.changes.into_iter().map(Into::into).collect(),
                    diagnostics: diagnostics_to_proto(diagnostics),
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "PlanResourceChange failed");
                crate::generated::PlanResourceChangeResponse {
                    diagnostics: error_to_diagnostics(e),
                    ..Default::default()
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.apply_resource_change")]
    async fn apply_resource_change(
        &self,
        request: tonic::Request<crate::generated::ApplyResourceChangeRequest>,
    ) -> Result<tonic::Response<crate::generated::ApplyResourceChangeResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(
            type_name = %req.type_name,
            create = req.prior_state.is_empty(),
            delete = req.planned_state.is_empty(),
            "ApplyResourceChange called"
        );
        let result = async {
            let prior_state = decode_object(&req.prior_state)?;
            let planned_state = decode_object(&req.planned_state)?;
            let config = decode_config(&req.config)?;
            self.provider
                .apply(&req.type_name, prior_state, planned_state, config)
                .await
        }
        .await;

        let response = match result {
            Ok(Outcome { value, diagnostics }) => {
                log_diagnostics("ApplyResourceChange", &req.type_name, &diagnostics);
                crate::generated::ApplyResourceChangeResponse {
                    new_state: encode_object(value.as_ref()),
                    diagnostics: diagnostics_to_proto(diagnostics),
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ApplyResourceChange failed");
                crate::generated::ApplyResourceChangeResponse {
                    new_state: req.prior_state.clone(),
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.read_resource")]
    async fn read_resource(
        &self,
        request: tonic::Request<crate::generated::ReadResourceRequest>,
    ) -> Result<tonic::Response<crate::generated::ReadResourceResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ReadResource called");
        let result = async {
            let current_state = decode_object(&req.current_state)?.unwrap_or(Value::Null);
            self.provider.read(&req.type_name, current_state).await
        }
        .await;

        let response = match result {
            Ok(Outcome { value, diagnostics }) => {
                log_diagnostics("ReadResource", &req.type_name, &diagnostics);
                crate::generated::ReadResourceResponse {
                    new_state: encode_object(value.as_ref()),
                    diagnostics: diagnostics_to_proto(diagnostics),
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ReadResource failed");
                crate::generated::ReadResourceResponse {
                    new_state: req.current_state.clone(),
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<crate::generated::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<crate::generated::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(type_name = %req.type_name, id = %req.id, "ImportResourceState called");

        let response = match self.provider.import_resource(&req.type_name, &req.id).await {
            Ok(Outcome { value, diagnostics }) => {
                log_diagnostics("ImportResourceState", &req.type_name, &diagnostics);
                crate::generated::ImportResourceStateResponse {
                    imported_resources: value.into_iter().map(Into::into).collect(),
                    diagnostics: diagnostics_to_proto(diagnostics),
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, id = %req.id, error = %e, "ImportResourceState failed");
                crate::generated::ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<crate::generated::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<crate::generated::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ReadDataSource called");
        let result = async {
            let config = decode_config(&req.config)?;
            self.provider.read_data_source(&req.type_name, config).await
        }
        .await;

        let response = match result {
            Ok(Outcome { value, diagnostics }) => {
                log_diagnostics("ReadDataSource", &req.type_name, &diagnostics);
                crate::generated::ReadDataSourceResponse {
                    state: encode_object(value.as_ref()),
                    diagnostics: diagnostics_to_proto(diagnostics),
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ReadDataSource failed");
                crate::generated::ReadDataSourceResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }
}

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long to wait for in-flight requests once a shutdown signal
    /// arrives. Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT on Unix, CTRL+C on Windows).
///
/// If the handlers cannot be installed the server runs until the host kills it.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                    _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(windows)]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received CTRL+C, initiating graceful shutdown"),
            Err(e) => {
                error!(error = %e, "Failed to install CTRL+C handler");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::future::pending::<()>().await;
    }
}

/// Serve a provider implementation as a gRPC server.
///
/// This function:
/// 1. Binds an available loopback port
/// 2. Starts the gRPC server
/// 3. Writes the handshake line to stdout
/// 4. Handles shutdown signals (SIGTERM/SIGINT) gracefully
///
/// The handshake format is: `ARCHESTRA_PROVIDER|<version>|<address>`
///
/// For custom configuration, use [`serve_with_options`].
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options.
///
/// See [`serve`] for details.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    serve_on_listener(provider, listener, addr, options).await
}

/// Serve a provider on a specific address.
///
/// Unlike [`serve`], this function binds to the specified address rather than
/// finding an available port.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// Serve a provider on a specific address with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    serve_on_listener(provider, listener, actual_addr, options).await
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);

    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let provider_for_shutdown = Arc::clone(&provider);

    let grpc_service = ProviderGrpcService { provider };
    let server = crate::generated::provider_server::ProviderServer::new(grpc_service);

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server_future = Server::builder()
        .add_service(server)
        .serve_with_incoming_shutdown(tokio_stream::wrappers::TcpListenerStream::new(listener), async move {
            wait_for_shutdown_signal().await;
            let _ = signalled_tx.send(());
        });
    tokio::pin!(server_future);

    // The timeout only bounds draining after a signal, never normal serving.
    tokio::select! {
        result = &mut server_future => {
            if let Err(e) = result {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
        }
        Ok(()) = signalled_rx => {
            match tokio::time::timeout(options.shutdown_timeout, &mut server_future).await {
                Ok(Ok(())) => info!("Server shutdown complete"),
                Ok(Err(e)) => {
                    error!(error = %e, "Server error during shutdown");
                    return Err(e.into());
                }
                Err(_) => warn!(timeout = ?options.shutdown_timeout, "Shutdown timeout exceeded, forcing shutdown"),
            }
        }
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider_for_shutdown.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::provider_server::Provider;
    use crate::provider::ArchestraProvider;
    use crate::schema::{Attribute, Schema};
    use crate::testing::MockTransport;
    use reqwest::Method;
    use serde_json::json;

    fn grpc(mock: &Arc<MockTransport>) -> ProviderGrpcService<ArchestraProvider> {
        ProviderGrpcService {
            provider: Arc::new(ArchestraProvider::with_transport(mock.clone())),
        }
    }

    fn json_bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    async fn configure(service: &ProviderGrpcService<ArchestraProvider>) {
        let response = service
            .configure_provider(tonic::Request::new(crate::generated::ConfigureProviderRequest {
                host_version: "1.9.0".to_string(),
                config: json_bytes(json!({"base_url": "https://archestra.test", "api_key": "k"})),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn test_block_to_proto_flags() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_requires_replace())
            .with_attribute("enabled", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("secret", Attribute::optional_string().sensitive());

        let proto = schema_to_proto(&schema);
        let block = proto.block.unwrap();
        let attr = |name: &str| block.attributes.iter().find(|a| a.name == name).unwrap().clone();

        assert!(attr("id").computed);
        assert!(attr("name").required && attr("name").requires_replace);
        assert_eq!(attr("enabled").default_value, b"true".to_vec());
        assert!(attr("secret").sensitive);
        assert!(attr("secret").default_value.is_empty());
    }

    #[test]
    fn test_empty_bytes_are_no_object() {
        assert_eq!(decode_object(&[]).unwrap(), None);
        assert_eq!(decode_config(&[]).unwrap(), json!({}));
        assert!(decode_object(b"{not json").is_err());
        assert!(encode_object(Some(&Value::Null)).is_empty());
        assert!(encode_object(None).is_empty());
    }

    #[test]
    fn test_diagnostic_to_proto() {
        let proto = diagnostic_to_proto(Diagnostic::warning("slow").with_attribute("name"));
        assert_eq!(proto.severity, crate::generated::diagnostic::Severity::Warning as i32);
        assert_eq!(proto.attribute, "name");
        assert!(proto.detail.is_empty());
    }

    #[tokio::test]
    async fn test_get_provider_schema() {
        let mock = MockTransport::new();
        let response = grpc(&mock)
            .get_provider_schema(tonic::Request::new(crate::generated::GetProviderSchemaRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.resource_schemas.len(), 19);
        assert_eq!(response.data_source_schemas.len(), 13);
        let provider = response.provider.unwrap().block.unwrap();
        assert!(provider.attributes.iter().any(|a| a.name == "api_key" && a.sensitive));
    }

    #[tokio::test]
    async fn test_unknown_type_becomes_diagnostic() {
        let mock = MockTransport::new();
        let response = grpc(&mock)
            .read_resource(tonic::Request::new(crate::generated::ReadResourceRequest {
                type_name: "archestra_widget".to_string(),
                current_state: json_bytes(json!({"id": "x"})),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics[0].summary, "Unknown Resource Type");
        assert_eq!(response.new_state, json_bytes(json!({"id": "x"})));
    }

    #[tokio::test]
    async fn test_drift_delete_returns_empty_state() {
        let team = "77777777-7777-7777-7777-777777777777";
        let mock = MockTransport::new();
        mock.respond(Method::GET, &format!("/api/teams/{}", team), 404, Value::Null);
        let service = grpc(&mock);
        configure(&service).await;

        let response = service
            .read_resource(tonic::Request::new(crate::generated::ReadResourceRequest {
                type_name: "archestra_team".to_string(),
                current_state: json_bytes(json!({"id": team, "name": "eng"})),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.new_state.is_empty());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_validation_error_is_pinned() {
        let mock = MockTransport::new();
        let response = grpc(&mock)
            .validate_resource_config(tonic::Request::new(crate::generated::ValidateResourceConfigRequest {
                type_name: "archestra_limit".to_string(),
                config: json_bytes(json!({
                    "entity_type": "organization",
                    "entity_id": "org-1",
                    "limit_kind": "token_cost",
                    "threshold": 100,
                    "tool_name": "x",
                })),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.iter().any(|d| d.attribute == "tool_name"
            && d.severity == crate::generated::diagnostic::Severity::Error as i32));
        assert!(mock.requests().is_empty());
    }
}
