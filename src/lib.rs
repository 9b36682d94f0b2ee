use std::sync::Arc;

use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Credential verification and the permission authority.
pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing segregation (public, permission-guarded API, admin).
pub mod routes;
use routes::{admin, api, public};

// --- Public Re-exports ---

pub use auth::{CredentialVerifier, KeySetCache};
pub use authz::PermissionAuthority;
pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/openapi.json` and rendered by the Swagger UI at `/docs`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root, handlers::health, handlers::get_me,
        handlers::create_role, handlers::get_role, handlers::list_roles,
        handlers::update_role, handlers::delete_role,
        handlers::create_permission, handlers::get_permission,
        handlers::list_permissions, handlers::delete_permission,
        handlers::assign_role, handlers::revoke_role,
    ),
    components(
        schemas(
            models::PermissionAction, models::Resource, models::Permission, models::Role,
            models::RoleResponse, models::PermissionSpec, models::CreateRoleRequest,
            models::UpdateRoleRequest, models::CreatePermissionRequest,
            models::RoleListResponse, models::PermissionListResponse, models::MeResponse,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "inside-athletics", description = "Inside Athletics API gateway")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container for everything a request may need: the role graph
/// repository, the credential verifier (which owns the key set cache), the permission
/// authority and the loaded configuration. Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub verifier: Arc<CredentialVerifier>,
    pub authority: Arc<PermissionAuthority>,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the verifier and authority around a repository and a key set cache.
    pub fn new(repo: RepositoryState, keys: Arc<KeySetCache>, config: AppConfig) -> Self {
        Self {
            verifier: Arc::new(CredentialVerifier::new(keys)),
            authority: Arc::new(PermissionAuthority::new(repo.clone())),
            repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<PermissionAuthority> {
    fn from_ref(app_state: &AppState) -> Arc<PermissionAuthority> {
        app_state.authority.clone()
    }
}

/// create_router
///
/// Assembles the routing tree and the gateway chain. Credential verification and the
/// permission check wrap every route, the docs and the fallback; the admin group
/// additionally runs the admin role check.
pub fn create_router(state: AppState) -> Router {
    create_router_with(state, Router::new())
}

/// create_router_with
///
/// Same as `create_router`, with `downstream` mounted behind the gateway. Downstream
/// handlers can read the caller through the `AuthUser` extractor.
pub fn create_router_with(state: AppState, downstream: Router<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let routes = Router::new()
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(api::api_routes())
        .nest(
            "/admin",
            gateway::require_admin(admin::admin_routes(), &state),
        )
        .merge(downstream)
        .fallback(handlers::not_found);

    gateway::wrap(routes, &state)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above it.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
