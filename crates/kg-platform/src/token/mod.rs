//! Token Aggregate
//!
//! Issued tokens: grant exchange, validation, refresh rotation,
//! revocation and administrative queries.

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use api::{TokenState, oauth_token_router, token_admin_router};
pub use entity::{GrantType, Principal, Token, TokenType, UserType};
pub use repository::{TokenQuery, TokenRepository};
pub use service::{AccountIdentity, Authenticator, IssueTokenRequest, TokenConfig, TokenIssuer};
