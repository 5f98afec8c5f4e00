//! Namespace Entity
//!
//! A sub-tenant inside one domain. Tokens can be upgraded into a
//! namespace scope; resources in different namespaces of the same
//! domain stay separated.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::{PlatformError, Result};
use crate::shared::tsid::TsidGenerator;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning domain, immutable
    pub domain: String,

    /// Unique within the domain
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub enabled: bool,

    /// Account that created the namespace
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
pub struct NamespacePatch {
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl Namespace {
    pub fn new(
        domain: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Self> {
        let domain = domain.into();
        let name = name.into();
        if domain.is_empty() {
            return Err(PlatformError::validation("domain is required"));
        }
        if name.is_empty() {
            return Err(PlatformError::validation("namespace name is required"));
        }
        Ok(Self {
            id: TsidGenerator::generate(),
            domain,
            name,
            description: None,
            enabled: true,
            owner: owner.into(),
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn apply_put(&mut self, patch: NamespacePatch) {
        self.description = patch.description;
        self.enabled = patch.enabled.unwrap_or(true);
        self.touch();
    }

    pub fn apply_patch(&mut self, patch: NamespacePatch) {
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
    fn test_new_namespace() {
        let ns = Namespace::new("acme", "payments", "alice").unwrap();
        assert_eq!(ns.domain, "acme");
        assert_eq!(ns.name, "payments");
        assert!(ns.enabled);
        assert_eq!(ns.updated_at, None);
        assert!(Namespace::new("", "payments", "alice").is_err());
        assert!(Namespace::new("acme", "", "alice").is_err());
    }

    #[test]
    fn test_update_modes() {
        let mut ns = Namespace::new("acme", "payments", "alice")
            .unwrap()
            .with_description("billing flows");

        ns.apply_patch(NamespacePatch {
            enabled: Some(false),
            ..Default::default()
        });
        assert_eq!(ns.description.as_deref(), Some("billing flows"));
        assert!(!ns.enabled);

        ns.apply_put(NamespacePatch::default());
        assert_eq!(ns.description, None);
        assert!(ns.enabled);
    }
}
