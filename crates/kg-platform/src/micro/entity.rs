//! Micro-Service Entity
//!
//! A registered backend service inside one domain. Each micro carries a
//! client id / client secret pair for the client_credentials grant; only
//! a hash of the secret is ever stored.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::shared::error::{PlatformError, Result};
use crate::shared::tsid::TsidGenerator;
use crate::token::entity::generate_opaque_token;

const CLIENT_ID_LEN: usize = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Micro {
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning domain, immutable
    pub domain: String,

    /// Unique within the domain
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Globally unique credential id presented on the token endpoint
    pub client_id: String,

    /// SHA-256 of the client secret; the raw secret is returned exactly
    /// once, on create and on credential refresh
    pub client_secret_hash: String,

    pub enabled: bool,

    /// Account that registered the service
    pub owner: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    /// Unset until the first update or credential rotation
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone)]
pub struct MicroPatch {
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl Micro {
    /// Register a new micro-service; returns the entity together with the
    /// raw client secret for the caller.
    pub fn new(
        domain: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<(Self, String)> {
        let domain = domain.into();
        let name = name.into();
        if domain.is_empty() {
            return Err(PlatformError::validation("domain is required"));
        }
        if name.is_empty() {
            return Err(PlatformError::validation("micro name is required"));
        }
        let secret = generate_opaque_token();
        let micro = Self {
            id: TsidGenerator::generate(),
            domain,
            name,
            description: None,
            client_id: generate_client_id(),
            client_secret_hash: hash_secret(&secret),
            enabled: true,
            owner: owner.into(),
            created_at: Utc::now(),
            updated_at: None,
        };
        Ok((micro, secret))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check a presented secret against the stored hash. A disabled micro
    /// never verifies.
    pub fn verify_secret(&self, presented: &str) -> bool {
        self.enabled && hash_secret(presented) == self.client_secret_hash
    }

    /// Replace the secret; returns the new raw value. The previous secret
    /// stops verifying immediately.
    pub fn rotate_secret(&mut self) -> String {
        let secret = generate_opaque_token();
        self.client_secret_hash = hash_secret(&secret);
        self.touch();
        secret
    }

    pub fn apply_put(&mut self, patch: MicroPatch) {
        self.description = patch.description;
        self.enabled = patch.enabled.unwrap_or(true);
        self.touch();
    }

    pub fn apply_patch(&mut self, patch: MicroPatch) {
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

fn generate_client_id() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..CLIENT_ID_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn hash_secret(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_micro() {
        let (micro, secret) = Micro::new("acme", "billing-svc", "alice").unwrap();
        assert_eq!(micro.domain, "acme");
        assert_eq!(micro.name, "billing-svc");
        assert!(micro.enabled);
        assert_eq!(micro.client_id.len(), 24);
        assert!(micro.client_id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(micro.client_secret_hash, secret);

        assert!(Micro::new("", "billing-svc", "alice").is_err());
        assert!(Micro::new("acme", "", "alice").is_err());
    }

    #[test]
    fn test_client_ids_are_distinct() {
        let (a, _) = Micro::new("acme", "svc-a", "alice").unwrap();
        let (b, _) = Micro::new("acme", "svc-b", "alice").unwrap();
        assert_ne!(a.client_id, b.client_id);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_verify_secret() {
        let (micro, secret) = Micro::new("acme", "billing-svc", "alice").unwrap();
        assert!(micro.verify_secret(&secret));
        assert!(!micro.verify_secret("wrong"));
        assert!(!micro.verify_secret(""));
    }

    #[test]
    fn test_disabled_micro_never_verifies() {
        let (mut micro, secret) = Micro::new("acme", "billing-svc", "alice").unwrap();
        micro.apply_patch(MicroPatch {
            enabled: Some(false),
            ..Default::default()
        });
        assert!(!micro.verify_secret(&secret));
    }

    #[test]
    fn test_rotate_secret_invalidates_old() {
        let (mut micro, old_secret) = Micro::new("acme", "billing-svc", "alice").unwrap();
        let new_secret = micro.rotate_secret();
        assert_ne!(old_secret, new_secret);
        assert!(!micro.verify_secret(&old_secret));
        assert!(micro.verify_secret(&new_secret));
    }

    #[test]
    fn test_update_modes() {
        let (mut micro, _) = Micro::new("acme", "billing-svc", "alice")
            .map(|(m, s)| (m.with_description("invoice processing"), s))
            .unwrap();

        micro.apply_patch(MicroPatch {
            enabled: Some(false),
            ..Default::default()
        });
        assert_eq!(micro.description.as_deref(), Some("invoice processing"));
        assert!(!micro.enabled);

        micro.apply_put(MicroPatch::default());
        assert_eq!(micro.description, None);
        assert!(micro.enabled);
    }
}
