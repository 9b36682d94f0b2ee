//! Maps an HTTP request onto the permission it needs.
//!
//! `resolve` is a pure function of its inputs. `None` means "no permission required":
//! safe verbs, infrastructure paths, verbs other than POST/PUT/PATCH/DELETE, and path
//! segments outside the resource table all fall through to `None`. The last two are
//! fail-open and preserved as observed behavior of the deployed API.

use axum::http::Method;

use crate::models::{PermissionAction, PermissionPair, Resource};

/// Prefix stripped before the resource segment is read.
pub const API_PREFIX: &str = "/api/v1/";

// Paths that never need a permission grant.
const INFRA_PREFIXES: [&str; 4] = ["/docs", "/openapi", "/swagger-ui", "/api-docs"];
const INFRA_PATHS: [&str; 2] = ["/", "/health"];

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

pub fn is_infra_path(path: &str) -> bool {
    INFRA_PATHS.contains(&path) || INFRA_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn base_action(method: &Method) -> Option<PermissionAction> {
    match *method {
        Method::POST => Some(PermissionAction::Create),
        Method::PUT | Method::PATCH => Some(PermissionAction::Update),
        Method::DELETE => Some(PermissionAction::Delete),
        _ => None,
    }
}

fn segments(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix(API_PREFIX).unwrap_or(path).split('/')
}

/// Reads the resource named by the first segment after the API prefix.
pub fn resource_from_path(path: &str) -> Option<Resource> {
    segments(path).next().and_then(Resource::from_segment)
}

/// The record id addressed by `path`: the segment right after the resource, as in
/// `/api/v1/user/{id}`.
pub fn path_id(path: &str) -> Option<&str> {
    segments(path).nth(1).filter(|id| !id.is_empty())
}

/// resolve
///
/// Returns the `(action, resource)` the caller must hold, or `None` when the request
/// is not guarded. A caller mutating the `user` record whose id equals their own
/// identity gets the `_own` variant of the action.
pub fn resolve(
    method: &Method,
    path: &str,
    caller: &str,
    path_id: Option<&str>,
) -> Option<PermissionPair> {
    if is_safe_method(method) || is_infra_path(path) {
        return None;
    }

    let Some(action) = base_action(method) else {
        tracing::debug!(%method, path, "unguarded verb, no permission required");
        return None;
    };

    let Some(resource) = resource_from_path(path) else {
        tracing::debug!(%method, path, "unguarded resource, no permission required");
        return None;
    };

    let owns_target = match path_id {
        Some(id) => !caller.is_empty() && !id.is_empty() && id == caller,
        None => false,
    };

    let action = match (resource, action) {
        (Resource::User, PermissionAction::Update) if owns_target => PermissionAction::UpdateOwn,
        (Resource::User, PermissionAction::Delete) if owns_target => PermissionAction::DeleteOwn,
        (_, action) => action,
    };

    Some(PermissionPair::new(action, resource))
}
