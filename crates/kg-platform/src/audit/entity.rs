//! Login Audit Records
//!
//! One record per issued token, stamped with a logout time when the
//! token is revoked. Records survive the tokens they describe.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::tsid::TsidGenerator;
use crate::token::{GrantType, Token};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecord {
    #[serde(rename = "_id")]
    pub id: String,

    pub domain: String,

    pub account: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    pub grant_type: GrantType,

    /// Access token this login produced; correlation key for logout
    pub access_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_ip: Option<String>,

    /// Resolved from the login ip by an external enricher; absent until
    /// one runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub login_at: DateTime<Utc>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub logout_at: Option<DateTime<Utc>>,
}

impl LoginRecord {
    pub fn new(token: &Token) -> Self {
        Self {
            id: TsidGenerator::generate(),
            domain: token.domain.clone(),
            account: token.account.clone(),
            application_id: token.application_id.clone(),
            grant_type: token.grant_type,
            access_token: token.access_token.clone(),
            login_ip: None,
            city: None,
            user_agent: None,
            login_at: Utc::now(),
            logout_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Principal, UserType};

    #[test]
    fn test_record_copies_token_scope() {
        let token = Token::new(
            "acme",
            "alice",
            UserType::Sub,
            Principal::User("u-1".to_string()),
            GrantType::Password,
        );
        let record = LoginRecord::new(&token);

        assert_eq!(record.domain, "acme");
        assert_eq!(record.account, "alice");
        assert_eq!(record.access_token, token.access_token);
        assert_eq!(record.grant_type, GrantType::Password);
        assert_eq!(record.application_id, None);
        assert_eq!(record.logout_at, None);
    }
}
