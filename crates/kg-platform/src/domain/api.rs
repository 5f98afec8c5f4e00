//! Domain Admin API

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::{Domain, DomainPatch};
use super::repository::{DomainQuery, DomainRepository};
use crate::shared::api_common::{PageRequest, SuccessResponse, UpdateMode};
use crate::shared::checks;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::token::entity::UserType;

/// Domain response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainDto {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub logo_path: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    pub owner: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Domain> for DomainDto {
    fn from(domain: Domain) -> Self {
        Self {
            id: domain.id,
            name: domain.name,
            display_name: domain.display_name,
            logo_path: domain.logo_path,
            description: domain.description,
            enabled: domain.enabled,
            owner: domain.owner,
            created_at: domain.created_at.to_rfc3339(),
            updated_at: domain.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainListResponse {
    pub domains: Vec<DomainDto>,
    pub total: i64,
    pub page_number: u64,
    pub page_size: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDomainBody {
    pub name: String,
    pub display_name: Option<String>,
    pub logo_path: Option<String>,
    pub description: Option<String>,
}

/// Update request; `update_mode` defaults to a full replace
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDomainBody {
    pub update_mode: Option<String>,
    pub display_name: Option<String>,
    pub logo_path: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DomainListQuery {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DescribeDomainParams {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct DomainState {
    pub domain_repo: Arc<DomainRepository>,
}

/// Create a domain
#[utoipa::path(
    post,
    path = "",
    tag = "domain",
    operation_id = "postApiAdminDomains",
    request_body = CreateDomainBody,
    responses(
        (status = 200, description = "Domain created", body = DomainDto),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_domain(
    State(state): State<DomainState>,
    auth: Authenticated,
    Json(body): Json<CreateDomainBody>,
) -> Result<Json<DomainDto>, PlatformError> {
    if state.domain_repo.exists_by_name(&body.name).await? {
        return Err(PlatformError::conflict(format!(
            "domain {} already exists",
            body.name
        )));
    }

    let mut domain = Domain::new(body.name, &auth.0.account)?;
    if let Some(display_name) = body.display_name {
        domain = domain.with_display_name(display_name);
    }
    if let Some(logo_path) = body.logo_path {
        domain = domain.with_logo_path(logo_path);
    }
    if let Some(description) = body.description {
        domain = domain.with_description(description);
    }

    state.domain_repo.insert(&domain).await?;
    Ok(Json(domain.into()))
}

/// List domains
#[utoipa::path(
    get,
    path = "",
    tag = "domain",
    operation_id = "getApiAdminDomains",
    params(DomainListQuery),
    responses(
        (status = 200, description = "Domains", body = DomainListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_domains(
    State(state): State<DomainState>,
    auth: Authenticated,
    Query(query): Query<DomainListQuery>,
) -> Result<Json<DomainListResponse>, PlatformError> {
    let page = PageRequest {
        page_number: query.page_number,
        page_size: query.page_size,
    };
    page.validate()?;

    // Non-supper callers only ever see their own domain.
    let name = if auth.0.user_type == UserType::Supper {
        query.name
    } else {
        Some(auth.0.domain.clone())
    };

    let repo_query = DomainQuery {
        name,
        enabled: query.enabled,
        page,
    };
    let total = state.domain_repo.count(&repo_query).await?;
    let domains = state.domain_repo.search(&repo_query).await?;

    Ok(Json(DomainListResponse {
        domains: domains.into_iter().map(DomainDto::from).collect(),
        total,
        page_number: repo_query.page.page_number(),
        page_size: repo_query.page.page_size(),
    }))
}

/// Describe one domain by id or name
#[utoipa::path(
    get,
    path = "/describe",
    tag = "domain",
    operation_id = "getApiAdminDomainsDescribe",
    params(DescribeDomainParams),
    responses(
        (status = 200, description = "Domain detail", body = DomainDto),
        (status = 400, description = "Neither id nor name given"),
        (status = 404, description = "Domain not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn describe_domain(
    State(state): State<DomainState>,
    auth: Authenticated,
    Query(params): Query<DescribeDomainParams>,
) -> Result<Json<DomainDto>, PlatformError> {
    let domain = match (params.id.as_deref(), params.name.as_deref()) {
        (Some(id), _) => state
            .domain_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("domain", id))?,
        (None, Some(name)) => state
            .domain_repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| PlatformError::not_found("domain", name))?,
        (None, None) => {
            return Err(PlatformError::validation("id or name is required"));
        }
    };

    checks::require_domain_access(&auth.0, &domain.name)?;
    Ok(Json(domain.into()))
}

/// Update a domain
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "domain",
    operation_id = "putApiAdminDomainsById",
    params(("id" = String, Path, description = "Domain ID")),
    request_body = UpdateDomainBody,
    responses(
        (status = 200, description = "Domain updated", body = DomainDto),
        (status = 400, description = "Unknown update mode"),
        (status = 404, description = "Domain not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_domain(
    State(state): State<DomainState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<UpdateDomainBody>,
) -> Result<Json<DomainDto>, PlatformError> {
    let mode = match body.update_mode.as_deref() {
        Some(mode) => mode.parse::<UpdateMode>()?,
        None => UpdateMode::Put,
    };

    let mut domain = state
        .domain_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("domain", &id))?;
    checks::require_domain_admin(&auth.0)?;
    checks::require_domain_access(&auth.0, &domain.name)?;

    let patch = DomainPatch {
        display_name: body.display_name,
        logo_path: body.logo_path,
        description: body.description,
        enabled: body.enabled,
    };
    match mode {
        UpdateMode::Put => domain.apply_put(patch),
        UpdateMode::Patch => domain.apply_patch(patch),
    }

    state.domain_repo.update(&domain).await?;
    Ok(Json(domain.into()))
}

/// Delete a domain
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "domain",
    operation_id = "deleteApiAdminDomainsById",
    params(("id" = String, Path, description = "Domain ID")),
    responses(
        (status = 200, description = "Domain deleted", body = SuccessResponse),
        (status = 404, description = "Domain not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_domain(
    State(state): State<DomainState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    let domain = state
        .domain_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("domain", &id))?;
    checks::require_domain_admin(&auth.0)?;
    checks::require_domain_access(&auth.0, &domain.name)?;

    if !state.domain_repo.delete(&id).await? {
        return Err(PlatformError::not_found("domain", &id));
    }
    Ok(Json(SuccessResponse::with_message("domain deleted")))
}

/// Create domain admin router
pub fn domain_router(state: DomainState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_domain, list_domains))
        .routes(routes!(describe_domain))
        .routes(routes!(update_domain, delete_domain))
        .with_state(state)
}
