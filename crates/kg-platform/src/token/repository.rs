//! Token Repository
//!
//! Store access for issued tokens. The access token string is the
//! document `_id`; refresh tokens are located through their own unique
//! field. Rotation is a single `find_one_and_delete` so that exactly one
//! of any number of concurrent refresh attempts can win.

use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
    options::FindOptions,
};

use super::entity::{GrantType, Token};
use crate::shared::api_common::PageRequest;
use crate::shared::error::Result;

/// Filters for the administrative token listing. `domain` is always
/// required; a query can never cross tenant boundaries.
#[derive(Debug, Default, Clone)]
pub struct TokenQuery {
    pub domain: String,
    pub namespace_id: Option<String>,
    pub user_id: Option<String>,
    pub application_id: Option<String>,
    pub service_id: Option<String>,
    pub account: Option<String>,
    pub grant_type: Option<GrantType>,
    pub page: PageRequest,
}

pub struct TokenRepository {
    collection: Collection<Token>,
}

impl TokenRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("tokens"),
        }
    }

    pub async fn insert(&self, token: &Token) -> Result<()> {
        self.collection.insert_one(token).await?;
        Ok(())
    }

    pub async fn find_by_access_token(&self, access_token: &str) -> Result<Option<Token>> {
        Ok(self.collection.find_one(doc! { "_id": access_token }).await?)
    }

    pub async fn find_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Token>> {
        Ok(self
            .collection
            .find_one(doc! { "refreshToken": refresh_token })
            .await?)
    }

    /// Atomically claim a token for rotation. The matching document is
    /// removed and returned in one store operation; every concurrent
    /// caller except the winner sees `None`.
    pub async fn claim_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Token>> {
        Ok(self
            .collection
            .find_one_and_delete(doc! { "refreshToken": refresh_token })
            .await?)
    }

    /// Mark a token blocked in place. Returns false when no such token
    /// exists.
    pub async fn block(&self, access_token: &str, reason: &str) -> Result<bool> {
        let now = mongodb::bson::DateTime::now();
        let result = self
            .collection
            .update_one(
                doc! { "_id": access_token },
                doc! { "$set": {
                    "isBlock": true,
                    "blockReason": reason,
                    "blockAt": now,
                } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete_by_access_token(&self, access_token: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": access_token })
            .await?;
        Ok(result.deleted_count > 0)
    }

    /// Purge every token issued to an application, for teardown cascades.
    pub async fn delete_by_application(&self, domain: &str, application_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "domain": domain, "applicationId": application_id })
            .await?;
        Ok(result.deleted_count)
    }

    /// Purge every token issued to a micro-service credential.
    pub async fn delete_by_service(&self, domain: &str, service_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "domain": domain, "serviceId": service_id })
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn search(&self, query: &TokenQuery) -> Result<Vec<Token>> {
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

    pub async fn count(&self, query: &TokenQuery) -> Result<i64> {
        Ok(self.collection.count_documents(build_filter(query)).await? as i64)
    }
}

fn build_filter(query: &TokenQuery) -> Document {
    let mut filter = doc! { "domain": &query.domain };

    if let Some(ns) = &query.namespace_id {
        filter.insert("namespaceId", ns);
    }
    if let Some(uid) = &query.user_id {
        filter.insert("userId", uid);
    }
    if let Some(aid) = &query.application_id {
        filter.insert("applicationId", aid);
    }
    if let Some(sid) = &query.service_id {
        filter.insert("serviceId", sid);
    }
    if let Some(account) = &query.account {
        filter.insert("account", account);
    }
    if let Some(gt) = &query.grant_type {
        filter.insert("grantType", gt.as_str());
    }

    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_always_scoped_to_domain() {
        let query = TokenQuery {
            domain: "acme".to_string(),
            ..Default::default()
        };
        let filter = build_filter(&query);
        assert_eq!(filter.get_str("domain").unwrap(), "acme");
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_filter_includes_optional_fields() {
        let query = TokenQuery {
            domain: "acme".to_string(),
            namespace_id: Some("ns1".to_string()),
            user_id: Some("u1".to_string()),
            account: Some("alice".to_string()),
            grant_type: Some(GrantType::Password),
            ..Default::default()
        };
        let filter = build_filter(&query);
        assert_eq!(filter.get_str("namespaceId").unwrap(), "ns1");
        assert_eq!(filter.get_str("userId").unwrap(), "u1");
        assert_eq!(filter.get_str("account").unwrap(), "alice");
        assert_eq!(filter.get_str("grantType").unwrap(), "password");
        assert!(filter.get("applicationId").is_none());
        assert!(filter.get("serviceId").is_none());
    }

    // Store-backed paths (claim, block, cascades) require a MongoDB
    // connection. These would typically be integration tests.
}
