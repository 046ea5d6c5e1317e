//! Error types for the Archestra provider.
//!
//! Operation outcomes travel as [`Diagnostic`]s. `ProviderError` covers the
//! faults below that level: an unknown type name or an undecodable payload.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors raised by the provider root and the server layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The host addressed a resource type the registry does not list.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The host addressed a data source type the registry does not list.
    #[error("Unknown data source type: {0}")]
    UnknownDataSource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let summary = match &err {
            ProviderError::UnknownResource(_) => "Unknown Resource Type",
            ProviderError::UnknownDataSource(_) => "Unknown Data Source Type",
            ProviderError::Serialization(_) => "Invalid Payload",
        };
        Diagnostic::error(summary).with_detail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::UnknownResource("archestra_widget".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: archestra_widget");

        let err = ProviderError::UnknownDataSource("archestra_gadget".to_string());
        assert_eq!(format!("{}", err), "Unknown data source type: archestra_gadget");
    }

    #[test]
    fn test_error_to_diagnostic() {
        let diag: Diagnostic = ProviderError::UnknownResource("archestra_widget".into()).into();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "Unknown Resource Type");
        assert_eq!(
            diag.detail.as_deref(),
            Some("Unknown resource type: archestra_widget")
        );
        assert!(diag.attribute.is_none());
    }

    #[test]
    fn test_bad_payload_is_invalid_payload() {
        let err: ProviderError = serde_json::from_slice::<serde_json::Value>(b"{nope")
            .unwrap_err()
            .into();
        let diag = Diagnostic::from(err);
        assert_eq!(diag.summary, "Invalid Payload");
        assert!(diag.detail.unwrap().starts_with("Serialization error:"));
    }
}
