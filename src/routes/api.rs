use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// API Router Module
///
/// The `/api/v1` surface. Paths are registered in full (not nested) so the first
/// segment after the prefix is what the permission resolver reads as the resource:
/// `POST /api/v1/role` needs `create role`, `DELETE /api/v1/permission/{id}` needs
/// `delete permission`, and every `GET` passes without a grant.
pub fn api_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/v1/me
        .route("/api/v1/me", get(handlers::get_me))
        // --- Roles ---
        .route("/api/v1/role", post(handlers::create_role))
        .route(
            "/api/v1/role/{id}",
            get(handlers::get_role)
                .patch(handlers::update_role)
                .delete(handlers::delete_role),
        )
        .route("/api/v1/roles", get(handlers::list_roles))
        // --- Permissions ---
        .route("/api/v1/permission", post(handlers::create_permission))
        .route(
            "/api/v1/permission/{id}",
            get(handlers::get_permission).delete(handlers::delete_permission),
        )
        .route("/api/v1/permissions", get(handlers::list_permissions))
}
