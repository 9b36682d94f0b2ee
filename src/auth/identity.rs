use axum::{
    extract::FromRequestParts,
    http::{Extensions, request::Parts},
};
use std::fmt;

use crate::error::AuthError;

/// Identity
///
/// The caller reference taken from a verified token's subject claim. Lives for one
/// request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Extensions are keyed by type; nothing outside this module can name this one, so a
// caller-supplied or unrelated `Identity` value can never stand in for a verified one.
#[derive(Clone)]
struct VerifiedIdentity(Identity);

/// Stores the verified identity on the request.
pub fn attach(extensions: &mut Extensions, identity: Identity) {
    extensions.insert(VerifiedIdentity(identity));
}

/// The verified identity of the in-flight request, if authentication ran and succeeded.
pub fn caller_identity(extensions: &Extensions) -> Option<&Identity> {
    extensions
        .get::<VerifiedIdentity>()
        .map(|verified| &verified.0)
        .filter(|identity| !identity.as_str().is_empty())
}

/// AuthUser Extractor Result
///
/// The verified identity as seen by handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Identity,
}

/// AuthUser Extractor Implementation
///
/// Reads the identity the gateway attached. Handlers mounted behind `authenticate`
/// always get one; anything else is rejected with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_identity(&parts.extensions)
            .cloned()
            .map(|id| AuthUser { id })
            .ok_or(AuthError::NotAuthenticated)
    }
}
