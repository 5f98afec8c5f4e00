//! Login Record Admin API

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::LoginRecord;
use super::repository::{LoginRecordQuery, LoginRecordRepository};
use crate::shared::api_common::PageRequest;
use crate::shared::checks;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::token::GrantType;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecordDto {
    pub id: String,
    pub domain: String,
    pub account: String,
    pub application_id: Option<String>,
    pub grant_type: String,
    pub access_token: String,
    pub login_ip: Option<String>,
    pub city: Option<String>,
    pub user_agent: Option<String>,
    pub login_at: String,
    pub logout_at: Option<String>,
}

impl From<LoginRecord> for LoginRecordDto {
    fn from(record: LoginRecord) -> Self {
        Self {
            id: record.id,
            domain: record.domain,
            account: record.account,
            application_id: record.application_id,
            grant_type: record.grant_type.to_string(),
            access_token: record.access_token,
            login_ip: record.login_ip,
            city: record.city,
            user_agent: record.user_agent,
            login_at: record.login_at.to_rfc3339(),
            logout_at: record.logout_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecordListResponse {
    pub records: Vec<LoginRecordDto>,
    pub total: i64,
    pub page_number: u64,
    pub page_size: u64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoginRecordListQuery {
    /// Target domain; only a supper token may name a foreign one
    pub domain: Option<String>,
    pub account: Option<String>,
    pub application_id: Option<String>,
    pub login_ip: Option<String>,
    pub city: Option<String>,
    pub grant_type: Option<String>,
    /// Window start, RFC 3339
    pub start_at: Option<String>,
    /// Window end, RFC 3339
    pub end_at: Option<String>,
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Clone)]
pub struct LoginRecordState {
    pub record_repo: Arc<LoginRecordRepository>,
}

/// List login records, newest first
#[utoipa::path(
    get,
    path = "",
    tag = "audit",
    operation_id = "getApiAdminLoginRecords",
    params(LoginRecordListQuery),
    responses(
        (status = 200, description = "Login records", body = LoginRecordListResponse),
        (status = 403, description = "Caller is not a domain administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_login_records(
    State(state): State<LoginRecordState>,
    auth: Authenticated,
    Query(query): Query<LoginRecordListQuery>,
) -> Result<Json<LoginRecordListResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;
    let domain = checks::resolve_query_domain(&auth.0, query.domain.as_deref())?;

    let page = PageRequest {
        page_number: query.page_number,
        page_size: query.page_size,
    };
    page.validate()?;

    let grant_type = query
        .grant_type
        .as_deref()
        .map(|s| s.parse::<GrantType>())
        .transpose()?;
    let start_at = query.start_at.as_deref().map(parse_datetime).transpose()?;
    let end_at = query.end_at.as_deref().map(parse_datetime).transpose()?;

    let repo_query = LoginRecordQuery {
        domain,
        account: query.account,
        application_id: query.application_id,
        login_ip: query.login_ip,
        city: query.city,
        grant_type,
        start_at,
        end_at,
        page,
    };
    let total = state.record_repo.count(&repo_query).await?;
    let records = state.record_repo.search(&repo_query).await?;

    Ok(Json(LoginRecordListResponse {
        records: records.into_iter().map(LoginRecordDto::from).collect(),
        total,
        page_number: repo_query.page.page_number(),
        page_size: repo_query.page.page_size(),
    }))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, PlatformError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| PlatformError::validation(format!("invalid rfc3339 timestamp: {value}")))
}

/// Create login record router
pub fn login_record_router(state: LoginRecordState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_login_records))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        let parsed = parse_datetime("2024-05-01T12:00:00Z").unwrap();
        assert_eq!(parsed.timestamp(), 1714564800);
        assert!(parse_datetime("yesterday").is_err());
        assert!(parse_datetime("2024-05-01").is_err());
    }
}
