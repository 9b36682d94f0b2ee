use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Role membership management, nested under `/admin`. `create_router` wraps this
/// router in the `admin_only` guard, so handlers here can assume an admin caller.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST/DELETE /admin/users/{id}/roles/{role_id}
        // Grants or revokes one role for one user.
        .route(
            "/users/{id}/roles/{role_id}",
            post(handlers::assign_role).delete(handlers::revoke_role),
        )
}
