//! The middleware chain every inbound request passes through.
//!
//! Order is fixed: `authenticate` runs on every request (fallback included), attaching
//! the verified identity. `authorize` then resolves the request to a permission and
//! asks the authority. Administrative routes additionally run `admin_only` once
//! matched. The first stage to fail writes its error and nothing after it runs.

use axum::{
    Router,
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::identity::{attach, caller_identity},
    authz::{Decision, path_id, resolve},
    error::AuthError,
    models::ROLE_ADMIN,
};

/// authenticate
///
/// Verifies the bearer credential and attaches the caller identity. Applied
/// unconditionally; a request without a valid token never reaches routing.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = match request.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_owned()),
            Err(_) => return AuthError::MalformedHeader.into_response(),
        },
    };

    match state.verifier.verify(header.as_deref()).await {
        Ok(identity) => {
            tracing::debug!(caller = %identity, "request authenticated");
            attach(request.extensions_mut(), identity);
            next.run(request).await
        }
        Err(err) => {
            tracing::info!(reason = %err, "request rejected during authentication");
            err.into_response()
        }
    }
}

/// authorize
///
/// Resolves the request to an `(action, resource)` pair and enforces it. Requests
/// that resolve to nothing pass straight through. Runs ahead of routing so paths served
/// by downstream routers are guarded the same as the ones mounted here.
pub async fn authorize(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let caller = caller_identity(request.extensions()).map(|identity| identity.as_str().to_owned());
    let path = request.uri().path();

    let pair = resolve(
        request.method(),
        path,
        caller.as_deref().unwrap_or_default(),
        path_id(path),
    );

    let Some(pair) = pair else {
        return next.run(request).await;
    };
    let Some(caller) = caller else {
        return AuthError::NotAuthenticated.into_response();
    };

    match state.authority.authorize(&caller, pair).await {
        Decision::Allow => next.run(request).await,
        Decision::Deny(err) => err.into_response(),
    }
}

/// admin_only
///
/// Lets the request through only if the caller holds the `admin` role.
pub async fn admin_only(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let user_id = match caller_identity(request.extensions()).map(|id| Uuid::parse_str(id.as_str()))
    {
        None => return AuthError::NotAuthenticated.into_response(),
        Some(Err(_)) => return AuthError::InvalidUserId.into_response(),
        Some(Ok(user_id)) => user_id,
    };

    match state.repo.user_exists(user_id).await {
        Ok(true) => {}
        Ok(false) => return AuthError::UserNotFound.into_response(),
        Err(e) => {
            tracing::error!(%user_id, error = %e, "user lookup failed");
            return AuthError::PermissionCheckFailed.into_response();
        }
    }

    match state.repo.user_has_role(user_id, ROLE_ADMIN).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            tracing::info!(%user_id, "admin route refused");
            AuthError::AdminRequired.into_response()
        }
        Err(e) => {
            tracing::error!(%user_id, error = %e, "role lookup failed");
            AuthError::PermissionCheckFailed.into_response()
        }
    }
}

/// Guards `routes` with the admin role check.
pub fn require_admin(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(state.clone(), admin_only))
}

/// Puts the gateway in front of everything registered on `router`, fallback included:
/// credential verification first, then the permission check.
pub fn wrap(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .layer(middleware::from_fn_with_state(state.clone(), authorize))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
}
