//! HTTP capability for the Archestra control plane.
//!
//! [`ArchestraClient`] exposes one typed method per endpoint. Every call
//! returns a [`Reply`] that discriminates success, not-found and any other
//! status, so handlers decide per operation which statuses are part of their
//! contract. The wire is abstracted behind [`Transport`]; production uses
//! [`HttpTransport`], tests use an in-memory transport.

mod api;
mod http;

// Field names mirror the wire format.
#[allow(missing_docs)]
pub mod models;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::context::OpContext;
use crate::schema::Diagnostic;

pub use http::HttpTransport;

/// Failures below the HTTP status level.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response not received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A 2xx body did not match the expected record.
    #[error("Unable to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The host cancelled the operation while the call was in flight.
    #[error("request cancelled")]
    Cancelled,

    /// The endpoint or credential cannot be used to build requests.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// One outgoing API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL, starting with `/`.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Create a request without query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body<B: Serialize>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Raw status and body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes, possibly empty.
    pub body: Vec<u8>,
}

/// The wire underneath [`ArchestraClient`]. Implementations must be safe to
/// share across concurrent operations.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send one request and return its status and body.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// Structured error body. The service answers either
/// `{"error": {"message": "..."}}`, `{"error": "..."}` or `{"message": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detail { message: String },
    Text(String),
}

impl ErrorBody {
    /// Build an error body carrying `message`.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            error: None,
            message: Some(message.into()),
        }
    }

    /// The service's error message, if the body carried one.
    pub fn message(&self) -> Option<&str> {
        match &self.error {
            Some(ErrorField::Detail { message }) | Some(ErrorField::Text(message)) => Some(message),
            None => self.message.as_deref(),
        }
    }
}

/// Discriminated response of one endpoint call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// 2xx with the decoded body. An empty body decodes as JSON null.
    Ok(T),
    /// 404.
    NotFound(Option<ErrorBody>),
    /// Any other status, with the structured error body when one parsed.
    Failed {
        /// HTTP status code.
        status: u16,
        /// Parsed error body.
        error: Option<ErrorBody>,
    },
}

impl<T: DeserializeOwned> Reply<T> {
    fn decode(response: ApiResponse) -> Result<Self, ClientError> {
        match response.status {
            200..=299 => {
                let value = if response.body.is_empty() {
                    Value::Null
                } else {
                    serde_json::from_slice(&response.body)?
                };
                Ok(Self::Ok(serde_json::from_value(value)?))
            }
            404 => Ok(Self::NotFound(serde_json::from_slice(&response.body).ok())),
            status => Ok(Self::Failed {
                status,
                error: serde_json::from_slice(&response.body).ok(),
            }),
        }
    }
}

impl<T> Reply<T> {
    /// The HTTP status this reply stands for. Successful replies report 200.
    pub fn status(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::NotFound(_) => 404,
            Self::Failed { status, .. } => *status,
        }
    }

    fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            Self::Ok(_) => None,
            Self::NotFound(error) => error.as_ref(),
            Self::Failed { error, .. } => error.as_ref(),
        }
    }
}

fn api_error(action: &str, err: &ClientError) -> Diagnostic {
    Diagnostic::error("API Error").with_detail(format!("Unable to {}, got error: {}", action, err))
}

fn unexpected<T>(action: &str, reply: &Reply<T>, expected: &str) -> Diagnostic {
    if let Some(message) = reply.error_body().and_then(ErrorBody::message) {
        return Diagnostic::error("API Error").with_detail(format!("Unable to {}: {}", action, message));
    }
    Diagnostic::error("Unexpected API Response").with_detail(format!(
        "Expected {}, got status {}",
        expected,
        reply.status()
    ))
}

/// Status-contract helpers over the result of an endpoint call.
pub trait ApiResult<T> {
    /// Only 2xx is acceptable.
    fn expect_ok(self, action: &str) -> Result<T, Diagnostic>;

    /// 2xx yields the value, 404 yields `None`.
    fn found(self, action: &str) -> Result<Option<T>, Diagnostic>;

    /// 2xx and 404 both count as deleted.
    fn deleted(self, action: &str) -> Result<(), Diagnostic>;
}

impl<T> ApiResult<T> for Result<Reply<T>, ClientError> {
    fn expect_ok(self, action: &str) -> Result<T, Diagnostic> {
        match self {
            Err(e) => Err(api_error(action, &e)),
            Ok(Reply::Ok(value)) => Ok(value),
            Ok(reply) => Err(unexpected(action, &reply, "200 OK")),
        }
    }

    fn found(self, action: &str) -> Result<Option<T>, Diagnostic> {
        match self {
            Err(e) => Err(api_error(action, &e)),
            Ok(Reply::Ok(value)) => Ok(Some(value)),
            Ok(Reply::NotFound(_)) => Ok(None),
            Ok(reply) => Err(unexpected(action, &reply, "200 OK")),
        }
    }

    fn deleted(self, action: &str) -> Result<(), Diagnostic> {
        match self {
            Err(e) => Err(api_error(action, &e)),
            Ok(Reply::Ok(_)) | Ok(Reply::NotFound(_)) => Ok(()),
            Ok(reply) => Err(unexpected(action, &reply, "200 OK or 404 Not Found")),
        }
    }
}

/// Typed Archestra API client. Cheap to clone; clones share the transport.
#[derive(Debug, Clone)]
pub struct ArchestraClient {
    transport: Arc<dyn Transport>,
}

impl ArchestraClient {
    /// Wrap an existing transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build a client over HTTP with bearer authentication.
    pub fn connect(base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        Ok(Self::new(Arc::new(HttpTransport::new(base_url, api_key)?)))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &OpContext,
        request: ApiRequest,
    ) -> Result<Reply<T>, ClientError> {
        let method = request.method.clone();
        let path = request.path.clone();
        debug!(method = %method, path = %path, "Sending API request");

        let response = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(ClientError::Cancelled),
            response = self.transport.send(request) => response?,
        };

        debug!(method = %method, path = %path, status = response.status, "API response received");
        Reply::decode(response)
    }

    async fn get<T: DeserializeOwned>(&self, ctx: &OpContext, path: String) -> Result<Reply<T>, ClientError> {
        self.execute(ctx, ApiRequest::new(Method::GET, path)).await
    }

    async fn send_json<T, B>(
        &self,
        ctx: &OpContext,
        method: Method,
        path: String,
        body: &B,
    ) -> Result<Reply<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::new(method, path).with_body(&body)?;
        self.execute(ctx, request).await
    }

    async fn delete_at(&self, ctx: &OpContext, path: String) -> Result<Reply<serde::de::IgnoredAny>, ClientError> {
        self.execute(ctx, ApiRequest::new(Method::DELETE, path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use serde_json::json;

    #[test]
    fn test_error_body_shapes() {
        let nested: ErrorBody = serde_json::from_value(json!({"error": {"message": "name taken"}})).unwrap();
        assert_eq!(nested.message(), Some("name taken"));

        let text: ErrorBody = serde_json::from_value(json!({"error": "forbidden"})).unwrap();
        assert_eq!(text.message(), Some("forbidden"));

        let flat: ErrorBody = serde_json::from_value(json!({"message": "bad request"})).unwrap();
        assert_eq!(flat.message(), Some("bad request"));

        let empty: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.message(), None);
    }

    #[test]
    fn test_reply_decode() {
        let ok: Reply<Value> = Reply::decode(ApiResponse { status: 201, body: br#"{"id":"x"}"#.to_vec() }).unwrap();
        assert_eq!(ok, Reply::Ok(json!({"id": "x"})));

        let empty: Reply<Value> = Reply::decode(ApiResponse { status: 204, body: vec![] }).unwrap();
        assert_eq!(empty, Reply::Ok(Value::Null));

        let missing: Reply<Value> = Reply::decode(ApiResponse { status: 404, body: vec![] }).unwrap();
        assert_eq!(missing, Reply::NotFound(None));

        let failed: Reply<Value> =
            Reply::decode(ApiResponse { status: 409, body: br#"{"message":"conflict"}"#.to_vec() }).unwrap();
        assert_eq!(failed.status(), 409);
    }

    #[test]
    fn test_expect_ok_diagnostics() {
        let typed: Result<Reply<()>, ClientError> = Ok(Reply::Failed {
            status: 400,
            error: Some(ErrorBody::with_message("name is required")),
        });
        let diag = typed.expect_ok("create team").unwrap_err();
        assert_eq!(diag.summary, "API Error");
        assert_eq!(diag.detail.as_deref(), Some("Unable to create team: name is required"));

        let untyped: Result<Reply<()>, ClientError> = Ok(Reply::Failed { status: 500, error: None });
        let diag = untyped.expect_ok("create team").unwrap_err();
        assert_eq!(diag.summary, "Unexpected API Response");
        assert_eq!(diag.detail.as_deref(), Some("Expected 200 OK, got status 500"));

        let transport: Result<Reply<()>, ClientError> = Err(ClientError::Cancelled);
        let diag = transport.expect_ok("create team").unwrap_err();
        assert_eq!(diag.detail.as_deref(), Some("Unable to create team, got error: request cancelled"));
    }

    #[test]
    fn test_found_and_deleted() {
        let missing: Result<Reply<()>, ClientError> = Ok(Reply::NotFound(None));
        assert_eq!(missing.found("read team").unwrap(), None);

        let gone: Result<Reply<()>, ClientError> = Ok(Reply::NotFound(None));
        assert!(gone.deleted("delete team").is_ok());

        let refused: Result<Reply<()>, ClientError> = Ok(Reply::Failed { status: 403, error: None });
        let diag = refused.deleted("delete team").unwrap_err();
        assert_eq!(
            diag.detail.as_deref(),
            Some("Expected 200 OK or 404 Not Found, got status 403")
        );
    }

    #[tokio::test]
    async fn test_cancelled_call_never_completes() {
        let mock = MockTransport::new();
        mock.respond_pending(Method::GET, "/api/teams");
        let client = ArchestraClient::new(mock.clone());

        let ctx = OpContext::new();
        ctx.cancellation().cancel();

        let result = client.list_teams(&ctx).await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }
}
