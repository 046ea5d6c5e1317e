//! Engine-level result types exchanged between the provider root and the
//! server layer, plus their protobuf conversions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{has_errors, Diagnostic};

/// A change to a single attribute during a plan.
///
/// Sensitive attributes are reported with both values omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating or redacted).
    pub before: Option<Value>,
    /// The value after the change (None if deleting or redacted).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// Create a change whose values must not be disclosed.
    pub fn redacted(path: impl Into<String>) -> Self {
        Self::new(path, None, None)
    }
}

fn json_bytes(value: Option<Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(&v).ok())
        .unwrap_or_default()
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: json_bytes(change.before),
            after: json_bytes(change.after),
        }
    }
}

/// The result of planning one resource change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state; `Value::Null` plans a destroy.
    pub planned_state: Value,
    /// Attribute paths whose change forces delete-then-create.
    pub requires_replace: Vec<String>,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
}

impl PlanResult {
    /// A plan with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            requires_replace: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// A plan that destroys the resource.
    pub fn destroy() -> Self {
        Self::no_change(Value::Null)
    }
}

/// A resource state produced by import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type name.
    pub type_name: String,
    /// The partial state the subsequent read completes.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(type_name: impl Into<String>, state: Value) -> Self {
        Self {
            type_name: type_name.into(),
            state,
        }
    }
}

impl From<ImportedResource> for crate::generated::ImportedResource {
    fn from(resource: ImportedResource) -> Self {
        Self {
            type_name: resource.type_name,
            state: json_bytes(Some(resource.state)),
        }
    }
}

/// A value together with the diagnostics produced computing it.
///
/// Error diagnostics do not necessarily discard the value: a failed read
/// returns the unchanged prior state so the host keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    /// The computed value.
    pub value: T,
    /// Errors and warnings, in the order they were raised.
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    /// A value without diagnostics.
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// A value with diagnostics.
    pub fn with_diagnostics(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

impl<T: Default> Outcome<T> {
    /// An empty value carrying diagnostics.
    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self::with_diagnostics(T::default(), diagnostics)
    }
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 6;

/// The handshake prefix written to stdout.
pub const HANDSHAKE_PREFIX: &str = "ARCHESTRA_PROVIDER";
