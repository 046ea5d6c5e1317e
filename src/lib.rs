//! Archestra Provider
//!
//! An infrastructure-as-code provider plugin for the Archestra platform. The
//! host spawns the binary, reads the handshake line from stdout and then drives
//! it over gRPC to plan and apply changes to Archestra agents, MCP servers,
//! prompts, teams, users, policies and organization settings.
//!
//! # Layout
//!
//! - **client**: typed HTTP client for the Archestra REST API
//! - **schema / validation / plan**: attribute schemas, config validation and plan computation
//! - **resource**: the handler traits each resource and data source implements
//! - **resources / data_sources**: the 19 managed resources and 13 data sources
//! - **provider**: the provider root, endpoint resolution and lifecycle engine
//! - **server**: the gRPC adapter and the handshake protocol
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it writes a handshake string to stdout:
//!
//! ```text
//! ARCHESTRA_PROVIDER|6|127.0.0.1:50051
//! ```
//!
//! Format: `ARCHESTRA_PROVIDER|<protocol_version>|<address>`
//!
//! # Running
//!
//! ```ignore
//! use archestra_provider::{init_logging, serve, ArchestraProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(ArchestraProvider::new()).await
//! }
//! ```
//!
//! The API endpoint comes from the provider block (`base_url`, `api_key`) or,
//! when those are absent, from `ARCHESTRA_BASE_URL` and `ARCHESTRA_API_KEY`.

#![warn(clippy::all)]

pub mod client;
pub mod context;
pub mod data_sources;
pub mod error;
pub mod ids;
pub mod logging;
pub mod mappers;
pub mod plan;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::ArchestraProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, Outcome, PlanResult, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
