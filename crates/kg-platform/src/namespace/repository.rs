//! Namespace Repository

use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
    options::FindOptions,
};

use super::entity::Namespace;
use crate::shared::api_common::PageRequest;
use crate::shared::error::Result;

#[derive(Debug, Default, Clone)]
pub struct NamespaceQuery {
    pub domain: String,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub page: PageRequest,
}

pub struct NamespaceRepository {
    collection: Collection<Namespace>,
}

impl NamespaceRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("namespaces"),
        }
    }

    pub async fn insert(&self, namespace: &Namespace) -> Result<()> {
        self.collection.insert_one(namespace).await?;
        Ok(())
    }

    /// Lookup scoped to a domain; an id from another tenant comes back
    /// as absent, never as someone else's namespace.
    pub async fn find_in_domain(&self, domain: &str, id: &str) -> Result<Option<Namespace>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": id, "domain": domain })
            .await?)
    }

    pub async fn find_by_name(&self, domain: &str, name: &str) -> Result<Option<Namespace>> {
        Ok(self
            .collection
            .find_one(doc! { "domain": domain, "name": name })
            .await?)
    }

    pub async fn exists_by_name(&self, domain: &str, name: &str) -> Result<bool> {
        let count = self
            .collection
            .count_documents(doc! { "domain": domain, "name": name })
            .await?;
        Ok(count > 0)
    }

    pub async fn update(&self, namespace: &Namespace) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &namespace.id }, namespace)
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

    pub async fn search(&self, query: &NamespaceQuery) -> Result<Vec<Namespace>> {
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

    pub async fn count(&self, query: &NamespaceQuery) -> Result<i64> {
        Ok(self.collection.count_documents(build_filter(query)).await? as i64)
    }
}

fn build_filter(query: &NamespaceQuery) -> Document {
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
        let filter = build_filter(&NamespaceQuery {
            domain: "acme".to_string(),
            ..Default::default()
        });
        assert_eq!(filter.get_str("domain").unwrap(), "acme");
        assert_eq!(filter.len(), 1);
    }
}
