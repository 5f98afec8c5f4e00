//! Micro-Service Repository

use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
    options::FindOptions,
};

use super::entity::Micro;
use crate::shared::api_common::PageRequest;
use crate::shared::error::Result;

#[derive(Debug, Default, Clone)]
pub struct MicroQuery {
    pub domain: String,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub page: PageRequest,
}

pub struct MicroRepository {
    collection: Collection<Micro>,
}

impl MicroRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("micros"),
        }
    }

    pub async fn insert(&self, micro: &Micro) -> Result<()> {
        self.collection.insert_one(micro).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Micro>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_in_domain(&self, domain: &str, id: &str) -> Result<Option<Micro>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": id, "domain": domain })
            .await?)
    }

    pub async fn find_by_name(&self, domain: &str, name: &str) -> Result<Option<Micro>> {
        Ok(self
            .collection
            .find_one(doc! { "domain": domain, "name": name })
            .await?)
    }

    /// Credential lookup for the token endpoint. Client ids are globally
    /// unique, so no domain scope applies here.
    pub async fn find_by_client_id(&self, client_id: &str) -> Result<Option<Micro>> {
        Ok(self
            .collection
            .find_one(doc! { "clientId": client_id })
            .await?)
    }

    pub async fn exists_by_name(&self, domain: &str, name: &str) -> Result<bool> {
        let count = self
            .collection
            .count_documents(doc! { "domain": domain, "name": name })
            .await?;
        Ok(count > 0)
    }

    pub async fn update(&self, micro: &Micro) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &micro.id }, micro)
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

    pub async fn search(&self, query: &MicroQuery) -> Result<Vec<Micro>> {
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

    pub async fn count(&self, query: &MicroQuery) -> Result<i64> {
        Ok(self.collection.count_documents(build_filter(query)).await? as i64)
    }
}

fn build_filter(query: &MicroQuery) -> Document {
    let mut filter = doc! { "domain": &query.domain };
    if let Some(name) = &query.name {
        filter.insert("name", name);
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
    fn test_filter_always_scoped_to_domain() {
        let filter = build_filter(&MicroQuery {
            domain: "acme".to_string(),
            ..Default::default()
        });
        assert_eq!(filter.get_str("domain").unwrap(), "acme");
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_filter_with_name_and_enabled() {
        let filter = build_filter(&MicroQuery {
            domain: "acme".to_string(),
            name: Some("billing-svc".to_string()),
            enabled: Some(true),
            ..Default::default()
        });
        assert_eq!(filter.get_str("name").unwrap(), "billing-svc");
        assert!(filter.get_bool("enabled").unwrap());
    }
}
