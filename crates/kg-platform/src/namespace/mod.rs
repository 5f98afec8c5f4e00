//! Namespace Aggregate
//!
//! Sub-tenants inside a domain.

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{NamespaceState, namespace_router};
pub use entity::{Namespace, NamespacePatch};
pub use repository::{NamespaceQuery, NamespaceRepository};
