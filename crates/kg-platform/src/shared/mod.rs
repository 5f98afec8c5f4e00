//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod tsid;
pub mod middleware;
pub mod api_common;
pub mod checks;
pub mod indexes;

// APIs
pub mod health_api;

// Re-export commonly used items
pub use error::{PlatformError, Result};
pub use tsid::TsidGenerator;
pub use middleware::{AppState, AuthLayer, Authenticated, OptionalAuth};
pub use api_common::{PageRequest, ResourceSet, UpdateMode};
pub use health_api::{health_router, HealthState};
