//! LDAP Provider Repository

use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
    options::FindOptions,
};

use super::entity::LdapConfig;
use crate::shared::api_common::PageRequest;
use crate::shared::error::Result;

/// Listing filter. Unlike the other tenant collections the domain is
/// optional here: a supper account may inventory providers across all
/// domains.
#[derive(Debug, Default, Clone)]
pub struct LdapConfigQuery {
    pub domain: Option<String>,
    pub enabled: Option<bool>,
    pub page: PageRequest,
}

pub struct LdapConfigRepository {
    collection: Collection<LdapConfig>,
}

impl LdapConfigRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("ldap_configs"),
        }
    }

    pub async fn insert(&self, config: &LdapConfig) -> Result<()> {
        self.collection.insert_one(config).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<LdapConfig>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_domain(&self, domain: &str) -> Result<Option<LdapConfig>> {
        Ok(self.collection.find_one(doc! { "domain": domain }).await?)
    }

    pub async fn exists_for_domain(&self, domain: &str) -> Result<bool> {
        let count = self
            .collection
            .count_documents(doc! { "domain": domain })
            .await?;
        Ok(count > 0)
    }

    pub async fn update(&self, config: &LdapConfig) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &config.id }, config)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, domain: &str, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "domain": domain })
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn search(&self, query: &LdapConfigQuery) -> Result<Vec<LdapConfig>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(query.page.skip())
            .limit(query.page.limit())
            .build();

        let cursor = self
            .collection
            .find(build_filter(query))
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn count(&self, query: &LdapConfigQuery) -> Result<i64> {
        Ok(self.collection.count_documents(build_filter(query)).await? as i64)
    }
}

fn build_filter(query: &LdapConfigQuery) -> Document {
    let mut filter = Document::new();
    if let Some(domain) = &query.domain {
        filter.insert("domain", domain);
    }
    if let Some(enabled) = query.enabled {
        filter.insert("enabled", enabled);
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_open_for_supper_inventory() {
        let filter = build_filter(&LdapConfigQuery::default());
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_scoped_when_domain_given() {
        let filter = build_filter(&LdapConfigQuery {
            domain: Some("acme".to_string()),
            enabled: Some(true),
            ..Default::default()
        });
        assert_eq!(filter.get_str("domain").unwrap(), "acme");
        assert!(filter.get_bool("enabled").unwrap());
    }
}
