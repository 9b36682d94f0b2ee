use uuid::Uuid;

use crate::{error::AuthError, models::PermissionPair, repository::RepositoryState};

/// Decision
///
/// The outcome of one authorization check. A denial carries the error the gateway
/// writes to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(AuthError),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// PermissionAuthority
///
/// Answers "may this caller perform this action on this resource" from the role
/// graph. Every call re-reads the graph; there is no cache.
#[derive(Clone)]
pub struct PermissionAuthority {
    repo: RepositoryState,
}

impl PermissionAuthority {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// authorize
    ///
    /// Existence is checked before grants, so an unknown user is never authorized
    /// whatever the role data says. Repository failures deny with a 500.
    pub async fn authorize(&self, caller: &str, pair: PermissionPair) -> Decision {
        let Ok(user_id) = Uuid::parse_str(caller) else {
            tracing::info!(caller, "caller identity is not a user id");
            return Decision::Deny(AuthError::InvalidUserId);
        };

        match self.repo.user_exists(user_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(%user_id, "verified caller has no user record");
                return Decision::Deny(AuthError::UserNotFound);
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "user lookup failed");
                return Decision::Deny(AuthError::PermissionCheckFailed);
            }
        }

        match self
            .repo
            .count_user_permissions(user_id, pair.action, pair.resource.as_str())
            .await
        {
            Ok(count) if count > 0 => Decision::Allow,
            Ok(_) => {
                tracing::info!(%user_id, permission = %pair, "permission denied");
                Decision::Deny(AuthError::InsufficientPermissions)
            }
            Err(e) => {
                tracing::error!(%user_id, permission = %pair, error = %e, "permission lookup failed");
                Decision::Deny(AuthError::PermissionCheckFailed)
            }
        }
    }
}
