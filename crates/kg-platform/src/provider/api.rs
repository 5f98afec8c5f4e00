//! LDAP Provider Admin API
//!
//! Writes are restricted to domain administrators. The bind password is
//! write-only; no response shape carries it.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::{LdapAttributeMap, LdapConfig, LdapConfigPatch};
use super::repository::{LdapConfigQuery, LdapConfigRepository};
use crate::shared::api_common::{PageRequest, SuccessResponse, UpdateMode};
use crate::shared::checks;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::token::UserType;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LdapConfigDto {
    pub id: String,
    pub domain: String,
    pub url: String,
    pub base_dn: String,
    pub bind_dn: Option<String>,
    pub user_filter: Option<String>,
    pub attribute_map: LdapAttributeMap,
    pub enabled: bool,
    pub owner: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<LdapConfig> for LdapConfigDto {
    fn from(config: LdapConfig) -> Self {
        Self {
            id: config.id,
            domain: config.domain,
            url: config.url,
            base_dn: config.base_dn,
            bind_dn: config.bind_dn,
            user_filter: config.user_filter,
            attribute_map: config.attribute_map,
            enabled: config.enabled,
            owner: config.owner,
            created_at: config.created_at.to_rfc3339(),
            updated_at: config.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LdapConfigListResponse {
    pub configs: Vec<LdapConfigDto>,
    pub total: i64,
    pub page_number: u64,
    pub page_size: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLdapConfigBody {
    pub url: String,
    pub base_dn: String,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub user_filter: Option<String>,
    pub attribute_map: Option<LdapAttributeMap>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLdapConfigBody {
    pub update_mode: Option<String>,
    pub url: Option<String>,
    pub base_dn: Option<String>,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub user_filter: Option<String>,
    pub attribute_map: Option<LdapAttributeMap>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LdapConfigListQuery {
    /// Domain filter; only a supper token may omit it or name a foreign one
    pub domain: Option<String>,
    pub enabled: Option<bool>,
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DescribeLdapConfigParams {
    /// Defaults to the caller's own domain
    pub domain: Option<String>,
}

#[derive(Clone)]
pub struct LdapConfigState {
    pub ldap_repo: Arc<LdapConfigRepository>,
}

/// Configure LDAP for the caller's domain
#[utoipa::path(
    post,
    path = "",
    tag = "ldap",
    operation_id = "postApiAdminLdap",
    request_body = CreateLdapConfigBody,
    responses(
        (status = 200, description = "Provider configured", body = LdapConfigDto),
        (status = 403, description = "Caller is not a domain administrator"),
        (status = 409, description = "Domain already has a provider")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_ldap_config(
    State(state): State<LdapConfigState>,
    auth: Authenticated,
    Json(body): Json<CreateLdapConfigBody>,
) -> Result<Json<LdapConfigDto>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;
    let domain = &auth.0.domain;
    if state.ldap_repo.exists_for_domain(domain).await? {
        return Err(PlatformError::conflict(format!(
            "ldap config already exists for domain {domain}"
        )));
    }

    let mut config = LdapConfig::new(domain, body.url, body.base_dn, &auth.0.account)?;
    if let (Some(bind_dn), Some(bind_password)) = (body.bind_dn, body.bind_password) {
        config = config.with_bind(bind_dn, bind_password);
    }
    if let Some(filter) = body.user_filter {
        config = config.with_user_filter(filter);
    }
    if let Some(map) = body.attribute_map {
        config = config.with_attribute_map(map);
    }

    state.ldap_repo.insert(&config).await?;
    Ok(Json(config.into()))
}

/// List LDAP providers
#[utoipa::path(
    get,
    path = "",
    tag = "ldap",
    operation_id = "getApiAdminLdap",
    params(LdapConfigListQuery),
    responses(
        (status = 200, description = "Providers", body = LdapConfigListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_ldap_configs(
    State(state): State<LdapConfigState>,
    auth: Authenticated,
    Query(query): Query<LdapConfigListQuery>,
) -> Result<Json<LdapConfigListResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;

    let page = PageRequest {
        page_number: query.page_number,
        page_size: query.page_size,
    };
    page.validate()?;

    // Only a supper token may look across domains.
    let domain = if auth.0.user_type == UserType::Supper {
        query.domain
    } else {
        Some(checks::resolve_query_domain(&auth.0, query.domain.as_deref())?)
    };

    let repo_query = LdapConfigQuery {
        domain,
        enabled: query.enabled,
        page,
    };
    let total = state.ldap_repo.count(&repo_query).await?;
    let configs = state.ldap_repo.search(&repo_query).await?;

    Ok(Json(LdapConfigListResponse {
        configs: configs.into_iter().map(LdapConfigDto::from).collect(),
        total,
        page_number: repo_query.page.page_number(),
        page_size: repo_query.page.page_size(),
    }))
}

/// Describe one domain's LDAP provider
#[utoipa::path(
    get,
    path = "/describe",
    tag = "ldap",
    operation_id = "getApiAdminLdapDescribe",
    params(DescribeLdapConfigParams),
    responses(
        (status = 200, description = "Provider detail", body = LdapConfigDto),
        (status = 404, description = "Domain has no provider")
    ),
    security(("bearer_auth" = []))
)]
pub async fn describe_ldap_config(
    State(state): State<LdapConfigState>,
    auth: Authenticated,
    Query(params): Query<DescribeLdapConfigParams>,
) -> Result<Json<LdapConfigDto>, PlatformError> {
    let domain = checks::resolve_query_domain(&auth.0, params.domain.as_deref())?;
    let config = state
        .ldap_repo
        .find_by_domain(&domain)
        .await?
        .ok_or_else(|| PlatformError::not_found("ldap config", &domain))?;
    Ok(Json(config.into()))
}

/// Update an LDAP provider
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "ldap",
    operation_id = "putApiAdminLdapById",
    params(("id" = String, Path, description = "Config ID")),
    request_body = UpdateLdapConfigBody,
    responses(
        (status = 200, description = "Provider updated", body = LdapConfigDto),
        (status = 400, description = "Unknown update mode or invalid payload"),
        (status = 404, description = "Config not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_ldap_config(
    State(state): State<LdapConfigState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<UpdateLdapConfigBody>,
) -> Result<Json<LdapConfigDto>, PlatformError> {
    let mode = match body.update_mode.as_deref() {
        Some(mode) => mode.parse::<UpdateMode>()?,
        None => UpdateMode::Put,
    };
    checks::require_domain_admin(&auth.0)?;

    let mut config = state
        .ldap_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("ldap config", &id))?;
    checks::require_domain_access(&auth.0, &config.domain)?;

    let patch = LdapConfigPatch {
        url: body.url,
        base_dn: body.base_dn,
        bind_dn: body.bind_dn,
        bind_password: body.bind_password,
        user_filter: body.user_filter,
        attribute_map: body.attribute_map,
        enabled: body.enabled,
    };
    match mode {
        UpdateMode::Put => config.apply_put(patch)?,
        UpdateMode::Patch => config.apply_patch(patch)?,
    }

    state.ldap_repo.update(&config).await?;
    Ok(Json(config.into()))
}

/// Remove an LDAP provider
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "ldap",
    operation_id = "deleteApiAdminLdapById",
    params(("id" = String, Path, description = "Config ID")),
    responses(
        (status = 200, description = "Provider removed", body = SuccessResponse),
        (status = 404, description = "Config not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_ldap_config(
    State(state): State<LdapConfigState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;

    let config = state
        .ldap_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("ldap config", &id))?;
    checks::require_domain_access(&auth.0, &config.domain)?;

    if !state.ldap_repo.delete(&config.domain, &config.id).await? {
        return Err(PlatformError::not_found("ldap config", &id));
    }
    Ok(Json(SuccessResponse::with_message("ldap config removed")))
}

/// Create LDAP admin router
pub fn ldap_config_router(state: LdapConfigState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_ldap_config, list_ldap_configs))
        .routes(routes!(describe_ldap_config))
        .routes(routes!(update_ldap_config, delete_ldap_config))
        .with_state(state)
}
