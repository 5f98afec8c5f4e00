//! Domain Repository

use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
    options::FindOptions,
};

use super::entity::Domain;
use crate::shared::api_common::PageRequest;
use crate::shared::error::Result;

#[derive(Debug, Default, Clone)]
pub struct DomainQuery {
    /// Restrict the listing to one domain name; set for every
    /// non-supper caller
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub page: PageRequest,
}

pub struct DomainRepository {
    collection: Collection<Domain>,
}

impl DomainRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("domains"),
        }
    }

    pub async fn insert(&self, domain: &Domain) -> Result<()> {
        self.collection.insert_one(domain).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Domain>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Domain>> {
        Ok(self.collection.find_one(doc! { "name": name }).await?)
    }

    pub async fn exists_by_name(&self, name: &str) -> Result<bool> {
        let count = self.collection.count_documents(doc! { "name": name }).await?;
        Ok(count > 0)
    }

    pub async fn update(&self, domain: &Domain) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &domain.id }, domain)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn search(&self, query: &DomainQuery) -> Result<Vec<Domain>> {
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

    pub async fn count(&self, query: &DomainQuery) -> Result<i64> {
        Ok(self.collection.count_documents(build_filter(query)).await? as i64)
    }
}

fn build_filter(query: &DomainQuery) -> Document {
    let mut filter = doc! {};
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
    fn test_filter_shape() {
        let filter = build_filter(&DomainQuery::default());
        assert!(filter.is_empty());

        let filter = build_filter(&DomainQuery {
            name: Some("acme".to_string()),
            enabled: Some(true),
            ..Default::default()
        });
        assert_eq!(filter.get_str("name").unwrap(), "acme");
        assert!(filter.get_bool("enabled").unwrap());
    }
}
