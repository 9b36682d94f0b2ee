use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Authorization Vocabulary ---

/// PermissionAction
///
/// The closed set of actions a permission can grant. The `_own` variants are the
/// self-service grants substituted when a caller mutates their own record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Create,
    Update,
    Delete,
    UpdateOwn,
    DeleteOwn,
}

impl PermissionAction {
    pub const ALL: [PermissionAction; 5] = [
        PermissionAction::Create,
        PermissionAction::Update,
        PermissionAction::Delete,
        PermissionAction::UpdateOwn,
        PermissionAction::DeleteOwn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionAction::Create => "create",
            PermissionAction::Update => "update",
            PermissionAction::Delete => "delete",
            PermissionAction::UpdateOwn => "update_own",
            PermissionAction::DeleteOwn => "delete_own",
        }
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionSpecError {
    #[error("permission spec must include action and resource")]
    Incomplete,
    #[error("permission action is invalid")]
    InvalidAction,
    #[error("permission resource is invalid")]
    InvalidResource,
}

impl FromStr for PermissionAction {
    type Err = PermissionSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or(PermissionSpecError::InvalidAction)
    }
}

/// Resource
///
/// The resource types the gateway knows how to guard. Path segments outside this table
/// are not guarded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    User,
    Sport,
    College,
    Role,
    Permission,
    Post,
    Comment,
    Tag,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::User,
        Resource::Sport,
        Resource::College,
        Resource::Role,
        Resource::Permission,
        Resource::Post,
        Resource::Comment,
        Resource::Tag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Sport => "sport",
            Resource::College => "college",
            Resource::Role => "role",
            Resource::Permission => "permission",
            Resource::Post => "post",
            Resource::Comment => "comment",
            Resource::Tag => "tag",
        }
    }

    /// Maps a URL path segment onto a resource. Singular and plural spellings are both
    /// accepted; matching is exact and case-sensitive.
    pub fn from_segment(segment: &str) -> Option<Resource> {
        match segment {
            "user" | "users" => Some(Resource::User),
            "sport" | "sports" => Some(Resource::Sport),
            "college" | "colleges" => Some(Resource::College),
            "role" | "roles" => Some(Resource::Role),
            "permission" | "permissions" => Some(Resource::Permission),
            "post" | "posts" => Some(Resource::Post),
            "comment" | "comments" => Some(Resource::Comment),
            "tag" | "tags" => Some(Resource::Tag),
            _ => None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PermissionPair
///
/// The `(action, resource)` a request must be granted before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermissionPair {
    pub action: PermissionAction,
    pub resource: Resource,
}

impl PermissionPair {
    pub fn new(action: PermissionAction, resource: Resource) -> Self {
        Self { action, resource }
    }
}

impl fmt::Display for PermissionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.resource)
    }
}

// --- Persisted Records ---

/// Permission
///
/// A row of the `permissions` catalogue. `(action, resource)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub action: PermissionAction,
    pub resource: String,
}

/// Raw `permissions` row; `action` is stored as text.
#[derive(Debug, FromRow)]
pub(crate) struct PermissionRow {
    pub id: Uuid,
    pub action: String,
    pub resource: String,
}

impl PermissionRow {
    pub(crate) fn into_permission(self) -> Result<Permission, PermissionSpecError> {
        Ok(Permission {
            id: self.id,
            action: self.action.parse()?,
            resource: self.resource,
        })
    }
}

/// Role
///
/// A named group of permissions. Role names are unique.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// RoleResponse
///
/// A role together with the permissions granted to it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<Permission>,
}

// --- Role Composition ---

/// PermissionSpec
///
/// An `(action, resource)` grant as supplied by an administrator, before it is
/// resolved to a catalogue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionSpec {
    pub action: PermissionAction,
    pub resource: String,
}

impl PermissionSpec {
    pub fn new(action: PermissionAction, resource: impl Into<String>) -> Self {
        Self {
            action,
            resource: resource.into(),
        }
    }

    pub fn validate(&self) -> Result<(), PermissionSpecError> {
        if self.resource.trim().is_empty() {
            return Err(PermissionSpecError::InvalidResource);
        }
        Ok(())
    }
}

/// RoleSpec
///
/// A role name plus its grants; the unit `Repository::seed_role` installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub permissions: Vec<PermissionSpec>,
}

/// RoleBuilder
///
/// Fluent construction of a `RoleSpec`.
///
/// ```
/// use inside_athletics::models::{PermissionAction, Resource, RoleBuilder};
///
/// let spec = RoleBuilder::new("editor")
///     .with_permission(PermissionAction::Update, Resource::Post)
///     .build();
/// assert_eq!(spec.permissions.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RoleBuilder {
    spec: RoleSpec,
}

impl RoleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: RoleSpec {
                name: name.into(),
                permissions: Vec::new(),
            },
        }
    }

    pub fn with_permission(mut self, action: PermissionAction, resource: Resource) -> Self {
        let grant = PermissionSpec::new(action, resource.as_str());
        if !self.spec.permissions.contains(&grant) {
            self.spec.permissions.push(grant);
        }
        self
    }

    /// Grants every action in `actions` on every resource in `resources`.
    pub fn with_permissions(mut self, actions: &[PermissionAction], resources: &[Resource]) -> Self {
        for resource in resources {
            for action in actions {
                self = self.with_permission(*action, *resource);
            }
        }
        self
    }

    pub fn build(self) -> RoleSpec {
        self.spec
    }
}

pub const ROLE_USER: &str = "user";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_ADMIN: &str = "admin";

fn with_member_grants(builder: RoleBuilder) -> RoleBuilder {
    builder
        .with_permission(PermissionAction::UpdateOwn, Resource::User)
        .with_permission(PermissionAction::DeleteOwn, Resource::User)
        .with_permission(PermissionAction::Create, Resource::Post)
        .with_permission(PermissionAction::Create, Resource::Comment)
}

/// The role catalogue installed on a fresh local database.
pub fn default_roles() -> Vec<RoleSpec> {
    let user = with_member_grants(RoleBuilder::new(ROLE_USER));

    let moderator = with_member_grants(RoleBuilder::new(ROLE_MODERATOR))
        .with_permission(PermissionAction::Delete, Resource::Post)
        .with_permission(PermissionAction::Delete, Resource::Comment)
        .with_permissions(
            &[
                PermissionAction::Create,
                PermissionAction::Update,
                PermissionAction::Delete,
            ],
            &[Resource::Tag],
        );

    let admin =
        RoleBuilder::new(ROLE_ADMIN).with_permissions(&PermissionAction::ALL, &Resource::ALL);

    vec![user.build(), moderator.build(), admin.build()]
}

// --- Request Payloads (Input Schemas) ---

/// CreateRoleRequest
///
/// Input payload for `POST /api/v1/role`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionSpec>,
}

/// UpdateRoleRequest
///
/// Partial update for `PATCH /api/v1/role/{id}`. A present `permissions` list replaces
/// the role's grants wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permissions: Option<Vec<PermissionSpec>>,
}

/// CreatePermissionRequest
///
/// Input payload for `POST /api/v1/permission`. The action arrives as free text so an
/// unknown action is reported as a validation error rather than a decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePermissionRequest {
    pub action: String,
    pub resource: String,
}

impl CreatePermissionRequest {
    pub fn into_spec(self) -> Result<PermissionSpec, PermissionSpecError> {
        if self.action.is_empty() || self.resource.is_empty() {
            return Err(PermissionSpecError::Incomplete);
        }
        let spec = PermissionSpec::new(self.action.parse()?, self.resource);
        spec.validate()?;
        Ok(spec)
    }
}

/// Pagination
///
/// `limit`/`offset` query parameters for the listing endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit.min(Self::MAX_LIMIT),
            _ => Self::DEFAULT_LIMIT,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// --- API Responses (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionListResponse {
    pub permissions: Vec<Permission>,
    pub total: i64,
}

/// MeResponse
///
/// The caller's verified identity and the roles it currently holds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub roles: Vec<String>,
}
