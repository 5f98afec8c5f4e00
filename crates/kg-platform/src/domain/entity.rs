//! Domain Entity
//!
//! The top-level tenant. Every other resource lives inside exactly one
//! domain, and the domain's name never changes once created.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::{PlatformError, Result};
use crate::shared::tsid::TsidGenerator;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(rename = "_id")]
    pub id: String,

    /// Unique, immutable tenant name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub enabled: bool,

    /// Account that created the domain and acts as its primary
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

/// Mutable fields of a domain, used by both update modes.
#[derive(Debug, Default, Clone)]
pub struct DomainPatch {
    pub display_name: Option<String>,
    pub logo_path: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl Domain {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PlatformError::validation("domain name is required"));
        }
        Ok(Self {
            id: TsidGenerator::generate(),
            name,
            display_name: None,
            logo_path: None,
            description: None,
            enabled: true,
            owner: owner.into(),
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_logo_path(mut self, logo_path: impl Into<String>) -> Self {
        self.logo_path = Some(logo_path.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Full replace of the mutable fields. Absent optionals are cleared
    /// and an absent enabled flag falls back to the creation default.
    pub fn apply_put(&mut self, patch: DomainPatch) {
        self.display_name = patch.display_name;
        self.logo_path = patch.logo_path;
        self.description = patch.description;
        self.enabled = patch.enabled.unwrap_or(true);
        self.touch();
    }

    /// Merge only the fields the request carries.
    pub fn apply_patch(&mut self, patch: DomainPatch) {
        if patch.display_name.is_some() {
            self.display_name = patch.display_name;
        }
        if patch.logo_path.is_some() {
            self.logo_path = patch.logo_path;
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_domain_defaults() {
        let domain = Domain::new("acme", "alice").unwrap();
        assert_eq!(domain.name, "acme");
        assert_eq!(domain.owner, "alice");
        assert!(domain.enabled);
        assert!(!domain.id.is_empty());
        assert_eq!(domain.updated_at, None);
    }

    #[test]
    fn test_new_domain_rejects_empty_name() {
        assert!(Domain::new("", "alice").is_err());
    }

    #[test]
    fn test_patch_merges_present_fields() {
        let mut domain = Domain::new("acme", "alice")
            .unwrap()
            .with_display_name("Acme Corp")
            .with_description("tooling");
        assert_eq!(domain.updated_at, None);

        domain.apply_patch(DomainPatch {
            display_name: Some("Acme Inc".to_string()),
            ..Default::default()
        });

        assert_eq!(domain.display_name.as_deref(), Some("Acme Inc"));
        // Untouched fields survive a patch.
        assert_eq!(domain.description.as_deref(), Some("tooling"));
        assert!(domain.enabled);
        assert!(domain.updated_at.is_some());
    }

    #[test]
    fn test_put_replaces_all_mutable_fields() {
        let mut domain = Domain::new("acme", "alice")
            .unwrap()
            .with_display_name("Acme Corp")
            .with_logo_path("/logo.png");

        domain.apply_put(DomainPatch {
            description: Some("fresh".to_string()),
            enabled: Some(false),
            ..Default::default()
        });

        assert_eq!(domain.display_name, None);
        assert_eq!(domain.logo_path, None);
        assert_eq!(domain.description.as_deref(), Some("fresh"));
        assert!(!domain.enabled);
        // The name is not part of any update mode.
        assert_eq!(domain.name, "acme");
    }
}
