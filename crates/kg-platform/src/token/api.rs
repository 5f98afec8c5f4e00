//! Token Endpoints
//!
//! The OAuth-style exchange endpoint plus the administrative listing and
//! block operations.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::{GrantType, Token, TokenType, UserType};
use super::repository::TokenQuery;
use super::service::{IssueTokenRequest, TokenIssuer};
use crate::shared::api_common::{PageRequest, ResourceSet, SuccessResponse};
use crate::shared::checks;
use crate::shared::error::PlatformError;
use crate::shared::middleware::{Authenticated, OptionalAuth};

/// Token exchange request (form-urlencoded)
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueTokenBody {
    pub grant_type: String,
    pub domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub namespace_id: Option<String>,
    pub scope: Option<String>,
    pub description: Option<String>,
    /// Requested access TTL in seconds, personal access tokens only
    pub expires_in: Option<i64>,
}

/// Token exchange response
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
}

impl TokenResponse {
    /// Built once at issuance; the only place the refresh token is ever
    /// written to a response.
    fn from_issued(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: token
                .access_expired_at
                .map(|at| (at - Utc::now()).num_seconds()),
            refresh_token: token.refresh_token.clone(),
            scope: token.scope.clone(),
            domain: token.domain.clone(),
            namespace_id: token.namespace_id.clone(),
        }
    }
}

/// Token detail DTO. Has no refresh token field, so listings and
/// introspection can never leak it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub access_token: String,
    pub created_at: String,
    pub access_expired_at: Option<String>,
    pub refresh_expired_at: Option<String>,
    pub domain: String,
    pub namespace_id: Option<String>,
    pub user_id: Option<String>,
    pub application_id: Option<String>,
    pub service_id: Option<String>,
    pub user_type: UserType,
    pub account: String,
    pub client_id: Option<String>,
    pub start_grant_type: GrantType,
    pub grant_type: GrantType,
    pub token_type: TokenType,
    pub scope: Option<String>,
    pub description: Option<String>,
    pub is_block: bool,
    pub block_reason: Option<String>,
    pub block_at: Option<String>,
}

impl From<Token> for TokenDto {
    fn from(token: Token) -> Self {
        Self {
            access_token: token.access_token,
            created_at: token.created_at.to_rfc3339(),
            access_expired_at: token.access_expired_at.map(|at| at.to_rfc3339()),
            refresh_expired_at: token.refresh_expired_at.map(|at| at.to_rfc3339()),
            domain: token.domain,
            namespace_id: token.namespace_id,
            user_id: token.user_id,
            application_id: token.application_id,
            service_id: token.service_id,
            user_type: token.user_type,
            account: token.account,
            client_id: token.client_id,
            start_grant_type: token.start_grant_type,
            grant_type: token.grant_type,
            token_type: token.token_type,
            scope: token.scope,
            description: token.description,
            is_block: token.is_block,
            block_reason: token.block_reason,
            block_at: token.block_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Token list response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenListResponse {
    pub tokens: Vec<TokenDto>,
    pub total: i64,
    pub page_number: u64,
    pub page_size: u64,
}

impl From<ResourceSet<Token>> for TokenListResponse {
    fn from(set: ResourceSet<Token>) -> Self {
        Self {
            total: set.total,
            page_number: set.page.page_number(),
            page_size: set.page.page_size(),
            tokens: set.items.into_iter().map(TokenDto::from).collect(),
        }
    }
}

/// Query parameters for the administrative token listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TokenListQuery {
    /// Domain to query; supper accounts only, others are pinned to
    /// their own domain
    pub domain: Option<String>,
    pub namespace_id: Option<String>,
    pub user_id: Option<String>,
    pub application_id: Option<String>,
    pub service_id: Option<String>,
    pub account: Option<String>,
    pub grant_type: Option<String>,
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
}

/// Revocation target; defaults to the caller's own token
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RevokeTokenParams {
    pub access_token: Option<String>,
}

/// Block request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockTokenBody {
    pub access_token: String,
    pub reason: String,
}

/// Token endpoints state
#[derive(Clone)]
pub struct TokenState {
    pub issuer: Arc<TokenIssuer>,
}

/// Exchange a grant for a token
#[utoipa::path(
    post,
    path = "",
    tag = "token",
    operation_id = "postOauthToken",
    request_body = IssueTokenBody,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn issue_token(
    State(state): State<TokenState>,
    auth: OptionalAuth,
    headers: HeaderMap,
    axum::extract::Form(body): axum::extract::Form<IssueTokenBody>,
) -> Result<impl IntoResponse, PlatformError> {
    let grant_type: GrantType = body.grant_type.parse()?;
    let request = IssueTokenRequest {
        grant_type,
        domain: body.domain,
        username: body.username,
        password: body.password,
        client_id: body.client_id,
        client_secret: body.client_secret,
        refresh_token: body.refresh_token,
        namespace_id: body.namespace_id,
        scope: body.scope,
        description: body.description,
        expires_in: body.expires_in,
        client_ip: client_ip(&headers),
        user_agent: user_agent(&headers),
    };

    let token = state.issuer.issue(request, auth.0.as_ref()).await?;
    let response = TokenResponse::from_issued(&token);

    Ok((
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    ))
}

/// Describe the caller's own token
#[utoipa::path(
    get,
    path = "",
    tag = "token",
    operation_id = "getOauthToken",
    responses(
        (status = 200, description = "Token detail", body = TokenDto),
        (status = 401, description = "Invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn describe_token(auth: Authenticated) -> Result<Json<TokenDto>, PlatformError> {
    Ok(Json(auth.0.into()))
}

/// Revoke a token
#[utoipa::path(
    delete,
    path = "",
    tag = "token",
    operation_id = "deleteOauthToken",
    params(RevokeTokenParams),
    responses(
        (status = 200, description = "Token revoked", body = SuccessResponse),
        (status = 404, description = "Token not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn revoke_token(
    State(state): State<TokenState>,
    auth: Authenticated,
    Query(params): Query<RevokeTokenParams>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    let target = params
        .access_token
        .as_deref()
        .unwrap_or(&auth.0.access_token);
    state.issuer.revoke(target, &auth.0).await?;
    Ok(Json(SuccessResponse::with_message("token revoked")))
}

/// List tokens in a domain
#[utoipa::path(
    get,
    path = "",
    tag = "token",
    operation_id = "getApiAdminTokens",
    params(TokenListQuery),
    responses(
        (status = 200, description = "Tokens in the domain", body = TokenListResponse),
        (status = 403, description = "Not a domain administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn query_tokens(
    State(state): State<TokenState>,
    auth: Authenticated,
    Query(query): Query<TokenListQuery>,
) -> Result<Json<TokenListResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;
    let domain = checks::resolve_query_domain(&auth.0, query.domain.as_deref())?;
    let grant_type = query
        .grant_type
        .as_deref()
        .map(|s| s.parse::<GrantType>())
        .transpose()?;

    let set = state
        .issuer
        .search(TokenQuery {
            domain,
            namespace_id: query.namespace_id,
            user_id: query.user_id,
            application_id: query.application_id,
            service_id: query.service_id,
            account: query.account,
            grant_type,
            page: PageRequest {
                page_number: query.page_number,
                page_size: query.page_size,
            },
        })
        .await?;

    Ok(Json(set.into()))
}

/// Block a token
#[utoipa::path(
    post,
    path = "/block",
    tag = "token",
    operation_id = "postApiAdminTokensBlock",
    request_body = BlockTokenBody,
    responses(
        (status = 200, description = "Token blocked", body = SuccessResponse),
        (status = 403, description = "Not a domain administrator"),
        (status = 404, description = "Token not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn block_token(
    State(state): State<TokenState>,
    auth: Authenticated,
    Json(body): Json<BlockTokenBody>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    state
        .issuer
        .block(&body.access_token, &body.reason, &auth.0)
        .await?;
    Ok(Json(SuccessResponse::with_message("token blocked")))
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Create the token exchange router
pub fn oauth_token_router(state: TokenState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(issue_token, describe_token, revoke_token))
        .with_state(state)
}

/// Create the administrative token router
pub fn token_admin_router(state: TokenState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(query_tokens))
        .routes(routes!(block_token))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
