//! Response-to-state mappers shared by resource and data source handlers.

pub mod labels;
pub mod prompts;
pub mod users;
