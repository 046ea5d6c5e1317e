//! The fixed handler listings.
//!
//! Each call builds fresh, unconfigured handler instances. The provider root
//! builds one set for schema queries and another each time it is configured.

use crate::data_sources::agent_tool::AssignedToolDataSource;
use crate::data_sources::dual_llm_config::DualLlmConfigDataSource;
use crate::data_sources::mcp_server_tool::McpServerToolDataSource;
use crate::data_sources::profile::ProfileDataSource;
use crate::data_sources::prompt::PromptDataSource;
use crate::data_sources::prompt_versions::PromptVersionsDataSource;
use crate::data_sources::role::RoleDataSource;
use crate::data_sources::roles::RolesDataSource;
use crate::data_sources::team::TeamDataSource;
use crate::data_sources::team_external_groups::TeamExternalGroupsDataSource;
use crate::data_sources::token_prices::TokenPricesDataSource;
use crate::data_sources::user::UserDataSource;
use crate::resource::{AnyDataSource, AnyResource, DataSource, Resource};
use crate::resources::agent::AgentResource;
use crate::resources::dual_llm_config::DualLlmConfigResource;
use crate::resources::limit::LimitResource;
use crate::resources::mcp_server_installation::McpServerInstallationResource;
use crate::resources::mcp_server_team_access::McpServerTeamAccessResource;
use crate::resources::optimization_rule::OptimizationRuleResource;
use crate::resources::organization::{OrganizationAppearanceResource, OrganizationSettingsResource};
use crate::resources::policies::{ToolInvocationPolicyResource, TrustedDataPolicyResource};
use crate::resources::profile_tool::ProfileToolResource;
use crate::resources::prompt::PromptResource;
use crate::resources::role::RoleResource;
use crate::resources::sso_provider::SsoProviderResource;
use crate::resources::team::TeamResource;
use crate::resources::team_external_group::TeamExternalGroupResource;
use crate::resources::user::UserResource;
use crate::resources::user_role_assignment::UserRoleAssignmentResource;

/// Provider type name; every registry key is prefixed with it.
pub const PROVIDER_TYPE_NAME: &str = "archestra";

fn resource<R: Resource>(handler: R) -> Box<dyn AnyResource> {
    Box::new(handler)
}

fn data_source<D: DataSource>(handler: D) -> Box<dyn AnyDataSource> {
    Box::new(handler)
}

/// Every managed resource kind.
pub fn resources() -> Vec<Box<dyn AnyResource>> {
    vec![
        resource(AgentResource::agent()),
        resource(AgentResource::profile()),
        resource(ProfileToolResource::default()),
        resource(McpServerInstallationResource::default()),
        resource(McpServerTeamAccessResource::default()),
        resource(PromptResource::default()),
        resource(DualLlmConfigResource::default()),
        resource(RoleResource::default()),
        resource(UserResource::default()),
        resource(UserRoleAssignmentResource::default()),
        resource(TeamResource::default()),
        resource(TeamExternalGroupResource::default()),
        resource(SsoProviderResource::default()),
        resource(LimitResource::default()),
        resource(TrustedDataPolicyResource::default()),
        resource(ToolInvocationPolicyResource::default()),
        resource(OrganizationSettingsResource::default()),
        resource(OrganizationAppearanceResource::default()),
        resource(OptimizationRuleResource::default()),
    ]
}

/// Every read-only query.
pub fn data_sources() -> Vec<Box<dyn AnyDataSource>> {
    vec![
        data_source(ProfileDataSource::default()),
        data_source(AssignedToolDataSource::agent()),
        data_source(AssignedToolDataSource::profile()),
        data_source(McpServerToolDataSource::default()),
        data_source(PromptDataSource::default()),
        data_source(PromptVersionsDataSource::default()),
        data_source(RoleDataSource::default()),
        data_source(RolesDataSource::default()),
        data_source(DualLlmConfigDataSource::default()),
        data_source(TeamDataSource::default()),
        data_source(TeamExternalGroupsDataSource::default()),
        data_source(TokenPricesDataSource::default()),
        data_source(UserDataSource::default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_resource_names_are_unique() {
        let names: Vec<String> = resources()
            .iter()
            .map(|r| r.type_name(PROVIDER_TYPE_NAME))
            .collect();
        let unique: BTreeSet<_> = names.iter().collect();

        assert_eq!(names.len(), 19);
        assert_eq!(unique.len(), names.len());
        assert!(names.iter().all(|n| n.starts_with("archestra_")));
        assert!(names.contains(&"archestra_agent".to_string()));
        assert!(names.contains(&"archestra_profile".to_string()));
        assert!(names.contains(&"archestra_organization_appearance".to_string()));
    }

    #[test]
    fn test_data_source_names_are_unique() {
        let names: BTreeSet<String> = data_sources()
            .iter()
            .map(|d| d.type_name(PROVIDER_TYPE_NAME))
            .collect();

        assert_eq!(names.len(), 13);
        for expected in [
            "archestra_profile",
            "archestra_agent_tool",
            "archestra_profile_tool",
            "archestra_mcp_server_tool",
            "archestra_prompt_versions",
            "archestra_roles",
            "archestra_token_prices",
            "archestra_team_external_groups",
            "archestra_user",
        ] {
            assert!(names.contains(expected), "missing {}", expected);
        }
    }
}
