//! Read-only query handlers, one module per data source kind.

pub mod agent_tool;
pub mod dual_llm_config;
pub mod mcp_server_tool;
pub mod profile;
pub mod prompt;
pub mod prompt_versions;
pub mod role;
pub mod roles;
pub mod team;
pub mod team_external_groups;
pub mod token_prices;
pub mod user;

use crate::retry::RetryError;
use crate::schema::Diagnostic;

/// Terminal lookup failure of a data source.
pub(crate) fn not_found(detail: impl Into<String>) -> Diagnostic {
    Diagnostic::error("Not Found").with_detail(detail)
}

/// Turn the outcome of an eventually-consistent lookup into the found value
/// or a terminal diagnostic. `missing` describes what was never found.
pub(crate) fn settle<T>(
    result: Result<Option<T>, RetryError<Diagnostic>>,
    missing: impl FnOnce() -> String,
) -> Result<T, Diagnostic> {
    match result {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(not_found(missing())),
        Err(RetryError::Cancelled(what)) => {
            Err(Diagnostic::error("Lookup Cancelled").with_detail(format!("Stopped waiting for {}", what)))
        }
        Err(RetryError::Operation(diag)) => Err(diag),
    }
}
