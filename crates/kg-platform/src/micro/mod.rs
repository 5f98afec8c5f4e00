//! Micro-Service Aggregate

pub mod api;
pub mod entity;
pub mod registry;
pub mod repository;

pub use api::{MicroState, micro_router};
pub use entity::{Micro, MicroPatch};
pub use registry::{EndpointRegistry, HttpEndpointRegistry, RegistryConfig, ServiceRegistration};
pub use repository::{MicroQuery, MicroRepository};
