//! Keygate Platform
//!
//! Multi-tenant identity and authorization backend providing:
//! - OAuth2-style token issuance, validation, refresh and revocation
//! - Domain (tenant) and namespace (sub-tenant) management
//! - Micro-service credentials for machine-to-machine grants
//! - Per-domain LDAP provider configuration
//! - Login audit trail over every issued token
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - REST endpoints

// Core aggregates
pub mod token;
pub mod domain;
pub mod namespace;
pub mod micro;
pub mod provider;
pub mod audit;

// Shared infrastructure
pub mod shared;

// Re-export common types from shared
pub use shared::error::{PlatformError, Result};
pub use shared::tsid::TsidGenerator;
pub use shared::api_common::{PageRequest, ResourceSet, UpdateMode};
pub use shared::middleware::{AppState, AuthLayer, Authenticated};

// Re-export main entity types for convenience
pub use token::entity::{GrantType, Principal, Token, TokenType, UserType};
pub use domain::entity::Domain;
pub use namespace::entity::Namespace;
pub use micro::entity::Micro;
pub use provider::entity::{LdapAttributeMap, LdapConfig};
pub use audit::entity::LoginRecord;

// Re-export repositories
pub use token::repository::TokenRepository;
pub use domain::repository::DomainRepository;
pub use namespace::repository::NamespaceRepository;
pub use micro::repository::MicroRepository;
pub use provider::repository::LdapConfigRepository;
pub use audit::repository::LoginRecordRepository;

// Re-export services
pub use token::service::{Authenticator, TokenConfig, TokenIssuer};
pub use micro::registry::{EndpointRegistry, HttpEndpointRegistry, RegistryConfig};
