//! Micro-Service Admin API
//!
//! Registration and credential management for backend services. The raw
//! client secret appears in exactly two responses: create and credential
//! refresh. Every other read shows the client id only.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::{Micro, MicroPatch};
use super::repository::{MicroQuery, MicroRepository};
use crate::shared::api_common::{PageRequest, SuccessResponse, UpdateMode};
use crate::shared::checks;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::token::TokenRepository;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MicroDto {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub description: Option<String>,
    pub client_id: String,
    pub enabled: bool,
    pub owner: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Micro> for MicroDto {
    fn from(micro: Micro) -> Self {
        Self {
            id: micro.id,
            domain: micro.domain,
            name: micro.name,
            description: micro.description,
            client_id: micro.client_id,
            enabled: micro.enabled,
            owner: micro.owner,
            created_at: micro.created_at.to_rfc3339(),
            updated_at: micro.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Carries the raw client secret; returned on create and on credential
/// refresh, never again afterwards.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MicroCredentialsResponse {
    pub micro: MicroDto,
    pub client_secret: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MicroListResponse {
    pub micros: Vec<MicroDto>,
    pub total: i64,
    pub page_number: u64,
    pub page_size: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMicroBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMicroBody {
    pub update_mode: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MicroListQuery {
    /// Target domain; only a supper token may name a foreign one
    pub domain: Option<String>,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DescribeMicroParams {
    pub id: Option<String>,
    pub name: Option<String>,
    pub domain: Option<String>,
}

#[derive(Clone)]
pub struct MicroState {
    pub micro_repo: Arc<MicroRepository>,
    pub token_repo: Arc<TokenRepository>,
}

/// Register a micro-service in the caller's domain
#[utoipa::path(
    post,
    path = "",
    tag = "micro",
    operation_id = "postApiAdminMicros",
    request_body = CreateMicroBody,
    responses(
        (status = 200, description = "Micro registered, secret included once", body = MicroCredentialsResponse),
        (status = 409, description = "Name already taken in this domain")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_micro(
    State(state): State<MicroState>,
    auth: Authenticated,
    Json(body): Json<CreateMicroBody>,
) -> Result<Json<MicroCredentialsResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;
    let domain = &auth.0.domain;
    if state.micro_repo.exists_by_name(domain, &body.name).await? {
        return Err(PlatformError::conflict(format!(
            "micro {} already exists in domain {domain}",
            body.name
        )));
    }

    let (mut micro, secret) = Micro::new(domain, body.name, &auth.0.account)?;
    if let Some(description) = body.description {
        micro = micro.with_description(description);
    }

    state.micro_repo.insert(&micro).await?;
    info!(domain = %micro.domain, micro = %micro.name, "micro registered");
    Ok(Json(MicroCredentialsResponse {
        client_secret: secret,
        micro: micro.into(),
    }))
}

/// List micro-services
#[utoipa::path(
    get,
    path = "",
    tag = "micro",
    operation_id = "getApiAdminMicros",
    params(MicroListQuery),
    responses(
        (status = 200, description = "Micro-services", body = MicroListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_micros(
    State(state): State<MicroState>,
    auth: Authenticated,
    Query(query): Query<MicroListQuery>,
) -> Result<Json<MicroListResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;
    let domain = checks::resolve_query_domain(&auth.0, query.domain.as_deref())?;

    let page = PageRequest {
        page_number: query.page_number,
        page_size: query.page_size,
    };
    page.validate()?;

    let repo_query = MicroQuery {
        domain,
        name: query.name,
        enabled: query.enabled,
        page,
    };
    let total = state.micro_repo.count(&repo_query).await?;
    let micros = state.micro_repo.search(&repo_query).await?;

    Ok(Json(MicroListResponse {
        micros: micros.into_iter().map(MicroDto::from).collect(),
        total,
        page_number: repo_query.page.page_number(),
        page_size: repo_query.page.page_size(),
    }))
}

/// Describe one micro-service by id or name
#[utoipa::path(
    get,
    path = "/describe",
    tag = "micro",
    operation_id = "getApiAdminMicrosDescribe",
    params(DescribeMicroParams),
    responses(
        (status = 200, description = "Micro detail", body = MicroDto),
        (status = 400, description = "Neither id nor name given"),
        (status = 404, description = "Micro not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn describe_micro(
    State(state): State<MicroState>,
    auth: Authenticated,
    Query(params): Query<DescribeMicroParams>,
) -> Result<Json<MicroDto>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;
    let domain = checks::resolve_query_domain(&auth.0, params.domain.as_deref())?;

    let micro = match (params.id.as_deref(), params.name.as_deref()) {
        (Some(id), _) => state
            .micro_repo
            .find_in_domain(&domain, id)
            .await?
            .ok_or_else(|| PlatformError::not_found("micro", id))?,
        (None, Some(name)) => state
            .micro_repo
            .find_by_name(&domain, name)
            .await?
            .ok_or_else(|| PlatformError::not_found("micro", name))?,
        (None, None) => {
            return Err(PlatformError::validation("id or name is required"));
        }
    };
    Ok(Json(micro.into()))
}

/// Update a micro-service
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "micro",
    operation_id = "putApiAdminMicrosById",
    params(("id" = String, Path, description = "Micro ID")),
    request_body = UpdateMicroBody,
    responses(
        (status = 200, description = "Micro updated", body = MicroDto),
        (status = 400, description = "Unknown update mode"),
        (status = 404, description = "Micro not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_micro(
    State(state): State<MicroState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<UpdateMicroBody>,
) -> Result<Json<MicroDto>, PlatformError> {
    let mode = match body.update_mode.as_deref() {
        Some(mode) => mode.parse::<UpdateMode>()?,
        None => UpdateMode::Put,
    };
    checks::require_domain_admin(&auth.0)?;

    let mut micro = state
        .micro_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("micro", &id))?;
    checks::require_domain_access(&auth.0, &micro.domain)?;

    let patch = MicroPatch {
        description: body.description,
        enabled: body.enabled,
    };
    match mode {
        UpdateMode::Put => micro.apply_put(patch),
        UpdateMode::Patch => micro.apply_patch(patch),
    }

    state.micro_repo.update(&micro).await?;
    Ok(Json(micro.into()))
}

/// Delete a micro-service and revoke its tokens
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "micro",
    operation_id = "deleteApiAdminMicrosById",
    params(("id" = String, Path, description = "Micro ID")),
    responses(
        (status = 200, description = "Micro deleted", body = SuccessResponse),
        (status = 404, description = "Micro not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_micro(
    State(state): State<MicroState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;

    let micro = state
        .micro_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("micro", &id))?;
    checks::require_domain_access(&auth.0, &micro.domain)?;

    if !state.micro_repo.delete(&micro.domain, &micro.id).await? {
        return Err(PlatformError::not_found("micro", &id));
    }
    let revoked = state
        .token_repo
        .delete_by_service(&micro.domain, &micro.id)
        .await?;
    info!(domain = %micro.domain, micro = %micro.name, revoked, "micro deleted");
    Ok(Json(SuccessResponse::with_message("micro deleted")))
}

/// Rotate a micro-service's client secret and revoke its tokens
#[utoipa::path(
    post,
    path = "/{id}/refresh-credentials",
    tag = "micro",
    operation_id = "postApiAdminMicrosByIdRefreshCredentials",
    params(("id" = String, Path, description = "Micro ID")),
    responses(
        (status = 200, description = "New secret issued", body = MicroCredentialsResponse),
        (status = 404, description = "Micro not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh_micro_credentials(
    State(state): State<MicroState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<MicroCredentialsResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;

    let mut micro = state
        .micro_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("micro", &id))?;
    checks::require_domain_access(&auth.0, &micro.domain)?;

    let secret = micro.rotate_secret();
    state.micro_repo.update(&micro).await?;
    let revoked = state
        .token_repo
        .delete_by_service(&micro.domain, &micro.id)
        .await?;
    info!(domain = %micro.domain, micro = %micro.name, revoked, "micro credentials rotated");
    Ok(Json(MicroCredentialsResponse {
        client_secret: secret,
        micro: micro.into(),
    }))
}

/// Create micro admin router
pub fn micro_router(state: MicroState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_micro, list_micros))
        .routes(routes!(describe_micro))
        .routes(routes!(update_micro, delete_micro))
        .routes(routes!(refresh_micro_credentials))
        .with_state(state)
}
