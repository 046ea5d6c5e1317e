//! Managed resource handlers, one module per entity kind.

pub mod agent;
pub mod dual_llm_config;
pub mod limit;
pub mod mcp_server_installation;
pub mod mcp_server_team_access;
pub mod optimization_rule;
pub mod organization;
pub mod policies;
pub mod profile_tool;
pub mod prompt;
pub mod role;
pub mod sso_provider;
pub mod team;
pub mod team_external_group;
pub mod user;
pub mod user_role_assignment;
