//! Login Record Repository

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
    options::FindOptions,
};

use super::entity::LoginRecord;
use crate::shared::api_common::{PageRequest, time_range_filter};
use crate::shared::error::Result;
use crate::token::GrantType;

#[derive(Debug, Default, Clone)]
pub struct LoginRecordQuery {
    pub domain: String,
    pub account: Option<String>,
    pub application_id: Option<String>,
    pub login_ip: Option<String>,
    pub city: Option<String>,
    pub grant_type: Option<GrantType>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

pub struct LoginRecordRepository {
    collection: Collection<LoginRecord>,
}

impl LoginRecordRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("login_records"),
        }
    }

    pub async fn insert(&self, record: &LoginRecord) -> Result<()> {
        self.collection.insert_one(record).await?;
        Ok(())
    }

    /// Stamp the logout time on the record belonging to a revoked token.
    pub async fn mark_logout(&self, access_token: &str) -> Result<u64> {
        let result = self
            .collection
            .update_one(
                doc! { "accessToken": access_token },
                doc! { "$set": { "logoutAt": bson::DateTime::now() } },
            )
            .await?;
        Ok(result.modified_count)
    }

    pub async fn search(&self, query: &LoginRecordQuery) -> Result<Vec<LoginRecord>> {
        let options = FindOptions::builder()
            .sort(doc! { "loginAt": -1 })
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

    pub async fn count(&self, query: &LoginRecordQuery) -> Result<i64> {
        Ok(self.collection.count_documents(build_filter(query)).await? as i64)
    }
}

fn build_filter(query: &LoginRecordQuery) -> Document {
    let mut filter = doc! { "domain": &query.domain };
    if let Some(account) = &query.account {
        filter.insert("account", account);
    }
    if let Some(application_id) = &query.application_id {
        filter.insert("applicationId", application_id);
    }
    if let Some(login_ip) = &query.login_ip {
        filter.insert("loginIp", login_ip);
    }
    if let Some(city) = &query.city {
        filter.insert("city", city);
    }
    if let Some(grant_type) = query.grant_type {
        filter.insert("grantType", grant_type.as_str());
    }
    time_range_filter(&mut filter, "loginAt", query.start_at, query.end_at);
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filter_always_scoped_to_domain() {
        let filter = build_filter(&LoginRecordQuery {
            domain: "acme".to_string(),
            ..Default::default()
        });
        assert_eq!(filter.get_str("domain").unwrap(), "acme");
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_filter_with_grant_and_range() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let filter = build_filter(&LoginRecordQuery {
            domain: "acme".to_string(),
            account: Some("alice".to_string()),
            grant_type: Some(GrantType::Ldap),
            start_at: Some(start),
            ..Default::default()
        });
        assert_eq!(filter.get_str("account").unwrap(), "alice");
        assert_eq!(filter.get_str("grantType").unwrap(), "ldap");
        let bounds = filter.get_document("loginAt").unwrap();
        assert!(bounds.contains_key("$gte"));
        assert!(!bounds.contains_key("$lte"));
    }
}
