//! Domain Aggregate
//!
//! Top-level tenants and their administrative CRUD.

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{DomainState, domain_router};
pub use entity::{Domain, DomainPatch};
pub use repository::{DomainQuery, DomainRepository};
