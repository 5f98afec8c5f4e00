//! LDAP Provider Aggregate

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{LdapConfigState, ldap_config_router};
pub use entity::{LdapAttributeMap, LdapConfig, LdapConfigPatch};
pub use repository::{LdapConfigQuery, LdapConfigRepository};
