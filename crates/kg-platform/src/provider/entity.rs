//! LDAP Provider Configuration
//!
//! One config per domain. The core only stores and serves it; the
//! actual bind against the directory happens in the Authenticator
//! collaborator wired into the token issuer.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{PlatformError, Result};
use crate::shared::tsid::TsidGenerator;

/// Directory attribute names the bridge reads an identity from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LdapAttributeMap {
    pub account: String,
    pub email: String,
    pub display_name: String,
}

impl Default for LdapAttributeMap {
    fn default() -> Self {
        Self {
            account: "uid".to_string(),
            email: "mail".to_string(),
            display_name: "cn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdapConfig {
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning domain; unique, immutable
    pub domain: String,

    /// Directory URL, ldap:// or ldaps://
    pub url: String,

    pub base_dn: String,

    /// Search account; anonymous bind when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,

    /// Never leaves the service; DTOs drop it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Filter template, `{username}` substituted at bind time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_filter: Option<String>,

    #[serde(default)]
    pub attribute_map: LdapAttributeMap,

    pub enabled: bool,

    /// Account that configured the provider
    pub owner: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    /// Unset until the first update
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone)]
pub struct LdapConfigPatch {
    pub url: Option<String>,
    pub base_dn: Option<String>,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub user_filter: Option<String>,
    pub attribute_map: Option<LdapAttributeMap>,
    pub enabled: Option<bool>,
}

impl LdapConfig {
    pub fn new(
        domain: impl Into<String>,
        url: impl Into<String>,
        base_dn: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Self> {
        let domain = domain.into();
        let url = url.into();
        let base_dn = base_dn.into();
        if domain.is_empty() {
            return Err(PlatformError::validation("domain is required"));
        }
        validate_url(&url)?;
        if base_dn.is_empty() {
            return Err(PlatformError::validation("base_dn is required"));
        }
        Ok(Self {
            id: TsidGenerator::generate(),
            domain,
            url,
            base_dn,
            bind_dn: None,
            bind_password: None,
            user_filter: None,
            attribute_map: LdapAttributeMap::default(),
            enabled: true,
            owner: owner.into(),
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    pub fn with_bind(
        mut self,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
    ) -> Self {
        self.bind_dn = Some(bind_dn.into());
        self.bind_password = Some(bind_password.into());
        self
    }

    pub fn with_user_filter(mut self, filter: impl Into<String>) -> Self {
        self.user_filter = Some(filter.into());
        self
    }

    pub fn with_attribute_map(mut self, map: LdapAttributeMap) -> Self {
        self.attribute_map = map;
        self
    }

    /// Full replacement of the mutable payload. `url` and `base_dn` stay
    /// required; the optional bind fields are cleared when absent.
    pub fn apply_put(&mut self, patch: LdapConfigPatch) -> Result<()> {
        let url = patch
            .url
            .ok_or_else(|| PlatformError::validation("url is required"))?;
        validate_url(&url)?;
        let base_dn = patch
            .base_dn
            .filter(|dn| !dn.is_empty())
            .ok_or_else(|| PlatformError::validation("base_dn is required"))?;

        self.url = url;
        self.base_dn = base_dn;
        self.bind_dn = patch.bind_dn;
        self.bind_password = patch.bind_password;
        self.user_filter = patch.user_filter;
        self.attribute_map = patch.attribute_map.unwrap_or_default();
        self.enabled = patch.enabled.unwrap_or(true);
        self.touch();
        Ok(())
    }

    pub fn apply_patch(&mut self, patch: LdapConfigPatch) -> Result<()> {
        if let Some(url) = patch.url {
            validate_url(&url)?;
            self.url = url;
        }
        if let Some(base_dn) = patch.base_dn {
            if base_dn.is_empty() {
                return Err(PlatformError::validation("base_dn is required"));
            }
            self.base_dn = base_dn;
        }
        if patch.bind_dn.is_some() {
            self.bind_dn = patch.bind_dn;
        }
        if patch.bind_password.is_some() {
            self.bind_password = patch.bind_password;
        }
        if patch.user_filter.is_some() {
            self.user_filter = patch.user_filter;
        }
        if let Some(map) = patch.attribute_map {
            self.attribute_map = map;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("ldap://") || url.starts_with("ldaps://") {
        Ok(())
    } else {
        Err(PlatformError::validation(
            "url must start with ldap:// or ldaps://",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config() {
        let config = LdapConfig::new(
            "acme",
            "ldaps://ldap.acme.example:636",
            "dc=acme,dc=example",
            "alice",
        )
        .unwrap();
        assert_eq!(config.domain, "acme");
        assert!(config.enabled);
        assert_eq!(config.attribute_map.account, "uid");
    }

    #[test]
    fn test_url_scheme_enforced() {
        assert!(LdapConfig::new("acme", "http://x", "dc=x", "alice").is_err());
        assert!(LdapConfig::new("acme", "", "dc=x", "alice").is_err());
        assert!(LdapConfig::new("acme", "ldap://x", "dc=x", "alice").is_ok());
    }

    #[test]
    fn test_put_requires_url_and_base_dn() {
        let mut config = LdapConfig::new("acme", "ldap://x", "dc=x", "alice")
            .unwrap()
            .with_bind("cn=admin,dc=x", "s3cret");

        let err = config.apply_put(LdapConfigPatch::default());
        assert!(err.is_err());

        config
            .apply_put(LdapConfigPatch {
                url: Some("ldaps://y".to_string()),
                base_dn: Some("dc=y".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.url, "ldaps://y");
        // Absent optionals are cleared on put
        assert_eq!(config.bind_dn, None);
        assert_eq!(config.bind_password, None);
        assert!(config.enabled);
    }

    #[test]
    fn test_patch_merges() {
        let mut config = LdapConfig::new("acme", "ldap://x", "dc=x", "alice")
            .unwrap()
            .with_bind("cn=admin,dc=x", "s3cret");

        config
            .apply_patch(LdapConfigPatch {
                enabled: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.bind_dn.as_deref(), Some("cn=admin,dc=x"));
        assert_eq!(config.url, "ldap://x");

        assert!(config
            .apply_patch(LdapConfigPatch {
                url: Some("ftp://nope".to_string()),
                ..Default::default()
            })
            .is_err());
    }
}
