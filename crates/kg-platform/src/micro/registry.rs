//! Service Registry Client
//!
//! Announces this instance to an external endpoint registry at startup.
//! Registration failure is tolerated; the caller logs a warning and the
//! server keeps serving.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::shared::error::{PlatformError, Result};

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Registry base URL
    pub registry_url: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://localhost:8761".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Registration payload sent to the registry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegistration {
    pub name: String,
    pub version: String,
    pub base_url: String,
    pub endpoints: Vec<String>,
}

#[async_trait]
pub trait EndpointRegistry: Send + Sync {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()>;
}

pub struct HttpEndpointRegistry {
    config: RegistryConfig,
    client: reqwest::Client,
}

impl HttpEndpointRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PlatformError::internal(format!("registry client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl EndpointRegistry for HttpEndpointRegistry {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        let url = format!("{}/api/registry/services", self.config.registry_url);
        debug!("registering {} at {}", registration.name, url);

        let response = self
            .client
            .post(&url)
            .json(registration)
            .send()
            .await
            .map_err(|e| PlatformError::internal(format!("registry request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::internal(format!(
                "registry rejected registration: HTTP {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_payload_shape() {
        let registration = ServiceRegistration {
            name: "kg-platform".to_string(),
            version: "1.0.0".to_string(),
            base_url: "http://10.0.0.5:8080".to_string(),
            endpoints: vec!["/oauth/token".to_string()],
        };
        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["name"], "kg-platform");
        assert_eq!(json["baseUrl"], "http://10.0.0.5:8080");
        assert_eq!(json["endpoints"][0], "/oauth/token");
    }
}
