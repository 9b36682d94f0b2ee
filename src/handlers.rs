use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{
        CreatePermissionRequest, CreateRoleRequest, MeResponse, Pagination, Permission,
        PermissionListResponse, PermissionSpec, RoleListResponse, RoleResponse, UpdateRoleRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Validation ---

fn validate_role_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("name cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_specs(specs: &[PermissionSpec]) -> Result<(), ApiError> {
    for spec in specs {
        spec.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
    }
    Ok(())
}

// --- Infrastructure ---

/// root
///
/// Liveness banner.
#[utoipa::path(get, path = "/", responses((status = 200, description = "Server is running")))]
pub async fn root() -> &'static str {
    "Server is running!"
}

#[utoipa::path(get, path = "/health", responses((status = 200, description = "Healthy")))]
pub async fn health() -> &'static str {
    "ok"
}

/// Fallback for unmatched paths. Only reached after authentication.
pub async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Resource not found".to_string(),
        }),
    )
}

/// get_me
///
/// Echoes the verified caller identity together with the names of the roles it holds.
/// A subject that is not a user id simply holds no roles.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Caller identity", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn get_me(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, ApiError> {
    let roles = match Uuid::parse_str(id.as_str()) {
        Ok(user_id) => state.repo.get_user_roles(user_id).await?,
        Err(_) => Vec::new(),
    };
    Ok(Json(MeResponse {
        id: id.to_string(),
        roles,
    }))
}

// --- Role Administration ---

/// create_role
///
/// Creates a role and links the listed permissions, upserting each `(action, resource)`
/// into the catalogue. Guarded by `create role`.
#[utoipa::path(
    post,
    path = "/api/v1/role",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 409, description = "Role name taken", body = ErrorBody),
        (status = 422, description = "Invalid role", body = ErrorBody)
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    validate_role_name(&payload.name)?;
    validate_specs(&payload.permissions)?;

    let role = state
        .repo
        .create_role(payload.name.trim(), &payload.permissions)
        .await?;
    tracing::info!(role_id = %role.id, name = %role.name, "role created");
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/v1/role/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleResponse>, ApiError> {
    state
        .repo
        .get_role(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// list_roles
///
/// Pages through roles ordered by name, with the total count.
#[utoipa::path(
    get,
    path = "/api/v1/roles",
    params(Pagination),
    responses((status = 200, description = "Roles", body = RoleListResponse))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<RoleListResponse>, ApiError> {
    let (roles, total) = state.repo.list_roles(page.limit(), page.offset()).await?;
    Ok(Json(RoleListResponse { roles, total }))
}

/// update_role
///
/// Renames a role and/or replaces its permission set. An omitted `permissions` field
/// leaves the grants untouched; an empty list clears them.
#[utoipa::path(
    patch,
    path = "/api/v1/role/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 422, description = "Invalid role", body = ErrorBody)
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>, ApiError> {
    if let Some(name) = payload.name.as_mut() {
        validate_role_name(name)?;
        *name = name.trim().to_string();
    }
    if let Some(specs) = &payload.permissions {
        validate_specs(specs)?;
    }

    state
        .repo
        .update_role(id, &payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    delete,
    path = "/api/v1/role/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_role(id).await? {
        tracing::info!(role_id = %id, "role deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Permission Administration ---

/// create_permission
///
/// Adds an `(action, resource)` pair to the catalogue. The action must be one of the
/// closed set; an existing pair is a conflict.
#[utoipa::path(
    post,
    path = "/api/v1/permission",
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 409, description = "Permission exists", body = ErrorBody),
        (status = 422, description = "Invalid permission", body = ErrorBody)
    )
)]
pub async fn create_permission(
    State(state): State<AppState>,
    Json(payload): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<Permission>), ApiError> {
    let spec = payload
        .into_spec()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let permission = state.repo.create_permission(&spec).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

#[utoipa::path(
    get,
    path = "/api/v1/permission/{id}",
    params(("id" = Uuid, Path, description = "Permission ID")),
    responses(
        (status = 200, description = "Permission", body = Permission),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Permission>, ApiError> {
    state
        .repo
        .get_permission(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    params(Pagination),
    responses((status = 200, description = "Permissions", body = PermissionListResponse))
)]
pub async fn list_permissions(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<PermissionListResponse>, ApiError> {
    let (permissions, total) = state
        .repo
        .list_permissions(page.limit(), page.offset())
        .await?;
    Ok(Json(PermissionListResponse { permissions, total }))
}

/// delete_permission
///
/// Removes a permission from the catalogue and from every role that granted it.
#[utoipa::path(
    delete,
    path = "/api/v1/permission/{id}",
    params(("id" = Uuid, Path, description = "Permission ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_permission(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Role Assignment (Admin) ---

/// assign_role
///
/// [Admin Route] Grants a role to a user. Returns 201 for a new membership and 200 if
/// the user already held the role.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/roles/{role_id}",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("role_id" = Uuid, Path, description = "Role ID")
    ),
    responses(
        (status = 201, description = "Role assigned"),
        (status = 200, description = "Already assigned"),
        (status = 403, description = "Admin privileges required", body = ErrorBody),
        (status = 409, description = "Unknown user or role", body = ErrorBody)
    )
)]
pub async fn assign_role(
    AuthUser { id: admin }: AuthUser,
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let created = state.repo.assign_role(user_id, role_id).await?;
    tracing::info!(%admin, %user_id, %role_id, created, "role assigned");
    Ok(if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    })
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}/roles/{role_id}",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("role_id" = Uuid, Path, description = "Role ID")
    ),
    responses(
        (status = 204, description = "Role revoked"),
        (status = 403, description = "Admin privileges required", body = ErrorBody),
        (status = 404, description = "User does not hold the role", body = ErrorBody)
    )
)]
pub async fn revoke_role(
    AuthUser { id: admin }: AuthUser,
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    if state.repo.revoke_role(user_id, role_id).await? {
        tracing::info!(%admin, %user_id, %role_id, "role revoked");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

