//! Namespace Admin API

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::{Namespace, NamespacePatch};
use super::repository::{NamespaceQuery, NamespaceRepository};
use crate::shared::api_common::{PageRequest, SuccessResponse, UpdateMode};
use crate::shared::checks;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceDto {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub owner: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Namespace> for NamespaceDto {
    fn from(ns: Namespace) -> Self {
        Self {
            id: ns.id,
            domain: ns.domain,
            name: ns.name,
            description: ns.description,
            enabled: ns.enabled,
            owner: ns.owner,
            created_at: ns.created_at.to_rfc3339(),
            updated_at: ns.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceListResponse {
    pub namespaces: Vec<NamespaceDto>,
    pub total: i64,
    pub page_number: u64,
    pub page_size: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNamespaceBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNamespaceBody {
    pub update_mode: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NamespaceListQuery {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DescribeNamespaceParams {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct NamespaceState {
    pub namespace_repo: Arc<NamespaceRepository>,
}

/// Create a namespace in the caller's domain
#[utoipa::path(
    post,
    path = "",
    tag = "namespace",
    operation_id = "postApiAdminNamespaces",
    request_body = CreateNamespaceBody,
    responses(
        (status = 200, description = "Namespace created", body = NamespaceDto),
        (status = 409, description = "Name already taken in this domain")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_namespace(
    State(state): State<NamespaceState>,
    auth: Authenticated,
    Json(body): Json<CreateNamespaceBody>,
) -> Result<Json<NamespaceDto>, PlatformError> {
    let domain = &auth.0.domain;
    if state.namespace_repo.exists_by_name(domain, &body.name).await? {
        return Err(PlatformError::conflict(format!(
            "namespace {} already exists in domain {domain}",
            body.name
        )));
    }

    let mut namespace = Namespace::new(domain, body.name, &auth.0.account)?;
    if let Some(description) = body.description {
        namespace = namespace.with_description(description);
    }

    state.namespace_repo.insert(&namespace).await?;
    Ok(Json(namespace.into()))
}

/// List namespaces in the caller's domain
#[utoipa::path(
    get,
    path = "",
    tag = "namespace",
    operation_id = "getApiAdminNamespaces",
    params(NamespaceListQuery),
    responses(
        (status = 200, description = "Namespaces", body = NamespaceListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_namespaces(
    State(state): State<NamespaceState>,
    auth: Authenticated,
    Query(query): Query<NamespaceListQuery>,
) -> Result<Json<NamespaceListResponse>, PlatformError> {
    let page = PageRequest {
        page_number: query.page_number,
        page_size: query.page_size,
    };
    page.validate()?;

    let repo_query = NamespaceQuery {
        domain: auth.0.domain.clone(),
        name: query.name,
        enabled: query.enabled,
        page,
    };
    let total = state.namespace_repo.count(&repo_query).await?;
    let namespaces = state.namespace_repo.search(&repo_query).await?;

    Ok(Json(NamespaceListResponse {
        namespaces: namespaces.into_iter().map(NamespaceDto::from).collect(),
        total,
        page_number: repo_query.page.page_number(),
        page_size: repo_query.page.page_size(),
    }))
}

/// Describe one namespace by id or name
#[utoipa::path(
    get,
    path = "/describe",
    tag = "namespace",
    operation_id = "getApiAdminNamespacesDescribe",
    params(DescribeNamespaceParams),
    responses(
        (status = 200, description = "Namespace detail", body = NamespaceDto),
        (status = 400, description = "Neither id nor name given"),
        (status = 404, description = "Namespace not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn describe_namespace(
    State(state): State<NamespaceState>,
    auth: Authenticated,
    Query(params): Query<DescribeNamespaceParams>,
) -> Result<Json<NamespaceDto>, PlatformError> {
    let domain = &auth.0.domain;
    let namespace = match (params.id.as_deref(), params.name.as_deref()) {
        (Some(id), _) => state
            .namespace_repo
            .find_in_domain(domain, id)
            .await?
            .ok_or_else(|| PlatformError::not_found("namespace", id))?,
        (None, Some(name)) => state
            .namespace_repo
            .find_by_name(domain, name)
            .await?
            .ok_or_else(|| PlatformError::not_found("namespace", name))?,
        (None, None) => {
            return Err(PlatformError::validation("id or name is required"));
        }
    };
    Ok(Json(namespace.into()))
}

/// Update a namespace
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "namespace",
    operation_id = "putApiAdminNamespacesById",
    params(("id" = String, Path, description = "Namespace ID")),
    request_body = UpdateNamespaceBody,
    responses(
        (status = 200, description = "Namespace updated", body = NamespaceDto),
        (status = 400, description = "Unknown update mode"),
        (status = 404, description = "Namespace not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_namespace(
    State(state): State<NamespaceState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<UpdateNamespaceBody>,
) -> Result<Json<NamespaceDto>, PlatformError> {
    let mode = match body.update_mode.as_deref() {
        Some(mode) => mode.parse::<UpdateMode>()?,
        None => UpdateMode::Put,
    };
    checks::require_domain_admin(&auth.0)?;

    let mut namespace = state
        .namespace_repo
        .find_in_domain(&auth.0.domain, &id)
        .await?
        .ok_or_else(|| PlatformError::not_found("namespace", &id))?;

    let patch = NamespacePatch {
        description: body.description,
        enabled: body.enabled,
    };
    match mode {
        UpdateMode::Put => namespace.apply_put(patch),
        UpdateMode::Patch => namespace.apply_patch(patch),
    }

    state.namespace_repo.update(&namespace).await?;
    Ok(Json(namespace.into()))
}

/// Delete a namespace
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "namespace",
    operation_id = "deleteApiAdminNamespacesById",
    params(("id" = String, Path, description = "Namespace ID")),
    responses(
        (status = 200, description = "Namespace deleted", body = SuccessResponse),
        (status = 404, description = "Namespace not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_namespace(
    State(state): State<NamespaceState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    checks::require_domain_admin(&auth.0)?;
    if !state.namespace_repo.delete(&auth.0.domain, &id).await? {
        return Err(PlatformError::not_found("namespace", &id));
    }
    Ok(Json(SuccessResponse::with_message("namespace deleted")))
}

/// Create namespace admin router
pub fn namespace_router(state: NamespaceState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_namespace, list_namespaces))
        .routes(routes!(describe_namespace))
        .routes(routes!(update_namespace, delete_namespace))
        .with_state(state)
}
