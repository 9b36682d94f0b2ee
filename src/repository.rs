use crate::models::{
    Permission, PermissionAction, PermissionRow, PermissionSpec, Role, RoleResponse, RoleSpec,
    UpdateRoleRequest,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// RepositoryError
///
/// Failures of the persistence layer. The gateway treats every variant as an
/// infrastructure fault and fails closed.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Conflict(String),
    #[error("repository unavailable")]
    Unavailable,
}

/// Repository Trait
///
/// The persistence contract for the role/permission graph. The gateway itself only
/// reads (`user_exists`, `count_user_permissions`, `user_has_role`); the remaining
/// methods back the administrative endpoints and startup seeding.
///
/// **Send + Sync + async_trait** are required to share the trait object
/// (`Arc<dyn Repository>`) across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Gateway Reads ---
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, RepositoryError>;
    // Number of grants for `(action, resource)` reachable through the user's roles.
    async fn count_user_permissions(
        &self,
        user_id: Uuid,
        action: PermissionAction,
        resource: &str,
    ) -> Result<i64, RepositoryError>;
    async fn user_has_role(&self, user_id: Uuid, role_name: &str) -> Result<bool, RepositoryError>;
    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError>;

    // --- Role Administration ---
    async fn create_role(
        &self,
        name: &str,
        permissions: &[PermissionSpec],
    ) -> Result<RoleResponse, RepositoryError>;
    async fn get_role(&self, id: Uuid) -> Result<Option<RoleResponse>, RepositoryError>;
    async fn list_roles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleResponse>, i64), RepositoryError>;
    async fn update_role(
        &self,
        id: Uuid,
        update: &UpdateRoleRequest,
    ) -> Result<Option<RoleResponse>, RepositoryError>;
    async fn delete_role(&self, id: Uuid) -> Result<bool, RepositoryError>;
    // Idempotent: installs the role if missing and links every grant of the spec.
    async fn seed_role(&self, spec: &RoleSpec) -> Result<Role, RepositoryError>;

    // --- Permission Catalogue ---
    async fn create_permission(&self, spec: &PermissionSpec)
    -> Result<Permission, RepositoryError>;
    async fn get_permission(&self, id: Uuid) -> Result<Option<Permission>, RepositoryError>;
    async fn list_permissions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Permission>, i64), RepositoryError>;
    async fn delete_permission(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Membership ---
    // Returns false when the membership already existed.
    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, RepositoryError>;
    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL
/// schema in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>, RepositoryError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"SELECT p.id, p.action, p.resource
               FROM permissions p
               JOIN role_permissions rp ON rp.permission_id = p.id
               WHERE rp.role_id = $1
               ORDER BY p.resource, p.action"#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().filter_map(to_permission).collect())
    }

    async fn with_permissions(&self, role: Role) -> Result<RoleResponse, RepositoryError> {
        let permissions = self.role_permissions(role.id).await?;
        Ok(RoleResponse {
            id: role.id,
            name: role.name,
            permissions,
        })
    }
}

/// Drops catalogue rows whose action is outside the known set; they can never match a
/// resolved request anyway.
fn to_permission(row: PermissionRow) -> Option<Permission> {
    let id = row.id;
    match row.into_permission() {
        Ok(permission) => Some(permission),
        Err(e) => {
            tracing::warn!(permission_id = %id, error = %e, "skipping unknown permission action");
            None
        }
    }
}

/// Maps constraint violations onto `Conflict`; everything else stays a database error.
fn classify(err: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict(conflict.to_string());
        }
    }
    RepositoryError::Database(err)
}

/// Finds or creates the catalogue row for `spec` and links it to `role_id`.
async fn link_permission(
    tx: &mut Transaction<'_, Postgres>,
    role_id: Uuid,
    spec: &PermissionSpec,
) -> Result<(), RepositoryError> {
    let permission_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO permissions (action, resource)
           VALUES ($1, $2)
           ON CONFLICT (action, resource) DO UPDATE SET action = EXCLUDED.action
           RETURNING id"#,
    )
    .bind(spec.action.as_str())
    .bind(&spec.resource)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        r#"INSERT INTO role_permissions (role_id, permission_id)
           VALUES ($1, $2)
           ON CONFLICT DO NOTHING"#,
    )
    .bind(role_id)
    .bind(permission_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// count_user_permissions
    ///
    /// Walks `user_roles -> role_permissions -> permissions` for the single grant the
    /// request needs. Non-transactional; a concurrent role edit may or may not be seen.
    async fn count_user_permissions(
        &self,
        user_id: Uuid,
        action: PermissionAction,
        resource: &str,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*)
               FROM user_roles ur
               JOIN role_permissions rp ON rp.role_id = ur.role_id
               JOIN permissions p ON p.id = rp.permission_id
               WHERE ur.user_id = $1 AND p.action = $2 AND p.resource = $3"#,
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(resource)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn user_has_role(&self, user_id: Uuid, role_name: &str) -> Result<bool, RepositoryError> {
        let has_role: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(
                   SELECT 1 FROM user_roles ur
                   JOIN roles r ON r.id = ur.role_id
                   WHERE ur.user_id = $1 AND r.name = $2
               )"#,
        )
        .bind(user_id)
        .bind(role_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(has_role)
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"SELECT r.name FROM roles r
               JOIN user_roles ur ON ur.role_id = r.id
               WHERE ur.user_id = $1
               ORDER BY r.name"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn create_role(
        &self,
        name: &str,
        permissions: &[PermissionSpec],
    ) -> Result<RoleResponse, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"INSERT INTO roles (name) VALUES ($1)
               RETURNING id, name, created_at, updated_at"#,
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "role name already exists"))?;

        for spec in permissions {
            link_permission(&mut tx, role.id, spec).await?;
        }

        tx.commit().await?;
        self.with_permissions(role).await
    }

    async fn get_role(&self, id: Uuid) -> Result<Option<RoleResponse>, RepositoryError> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match role {
            Some(role) => Ok(Some(self.with_permissions(role).await?)),
            None => Ok(None),
        }
    }

    async fn list_roles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleResponse>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await?;

        let roles = sqlx::query_as::<_, Role>(
            r#"SELECT id, name, created_at, updated_at FROM roles
               ORDER BY name LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut responses = Vec::with_capacity(roles.len());
        for role in roles {
            responses.push(self.with_permissions(role).await?);
        }
        Ok((responses, total))
    }

    /// update_role
    ///
    /// Renames the role and/or replaces its grants in one transaction.
    async fn update_role(
        &self,
        id: Uuid,
        update: &UpdateRoleRequest,
    ) -> Result<Option<RoleResponse>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"UPDATE roles SET name = COALESCE($2, name), updated_at = now()
               WHERE id = $1
               RETURNING id, name, created_at, updated_at"#,
        )
        .bind(id)
        .bind(update.name.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify(e, "role name already exists"))?;

        let Some(role) = role else {
            return Ok(None);
        };

        if let Some(permissions) = &update.permissions {
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for spec in permissions {
                link_permission(&mut tx, id, spec).await?;
            }
        }

        tx.commit().await?;
        Ok(Some(self.with_permissions(role).await?))
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn seed_role(&self, spec: &RoleSpec) -> Result<Role, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"INSERT INTO roles (name) VALUES ($1)
               ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
               RETURNING id, name, created_at, updated_at"#,
        )
        .bind(&spec.name)
        .fetch_one(&mut *tx)
        .await?;

        for grant in &spec.permissions {
            link_permission(&mut tx, role.id, grant).await?;
        }

        tx.commit().await?;
        Ok(role)
    }

    async fn create_permission(
        &self,
        spec: &PermissionSpec,
    ) -> Result<Permission, RepositoryError> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"INSERT INTO permissions (action, resource) VALUES ($1, $2)
               RETURNING id, action, resource"#,
        )
        .bind(spec.action.as_str())
        .bind(&spec.resource)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "permission already exists"))?;

        Ok(Permission {
            id: row.id,
            action: spec.action,
            resource: row.resource,
        })
    }

    async fn get_permission(&self, id: Uuid) -> Result<Option<Permission>, RepositoryError> {
        let row = sqlx::query_as::<_, PermissionRow>(
            "SELECT id, action, resource FROM permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(to_permission))
    }

    async fn list_permissions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Permission>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"SELECT id, action, resource FROM permissions
               ORDER BY resource, action LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().filter_map(to_permission).collect(), total))
    }

    async fn delete_permission(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "user or role does not exist"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-Memory Implementation (tests and offline runs) ---

#[derive(Default)]
struct MemoryGraph {
    users: HashSet<Uuid>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    role_permissions: HashSet<(Uuid, Uuid)>,
    user_roles: HashSet<(Uuid, Uuid)>,
}

impl MemoryGraph {
    fn permission_id(&mut self, spec: &PermissionSpec) -> Uuid {
        if let Some(existing) = self
            .permissions
            .values()
            .find(|p| p.action == spec.action && p.resource == spec.resource)
        {
            return existing.id;
        }
        let id = Uuid::new_v4();
        self.permissions.insert(
            id,
            Permission {
                id,
                action: spec.action,
                resource: spec.resource.clone(),
            },
        );
        id
    }

    fn link(&mut self, role_id: Uuid, spec: &PermissionSpec) {
        let permission_id = self.permission_id(spec);
        self.role_permissions.insert((role_id, permission_id));
    }

    fn role_response(&self, role: &Role) -> RoleResponse {
        let mut permissions: Vec<Permission> = self
            .role_permissions
            .iter()
            .filter(|(role_id, _)| *role_id == role.id)
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id).cloned())
            .collect();
        permissions.sort_by(|a, b| {
            (a.resource.as_str(), a.action.as_str()).cmp(&(b.resource.as_str(), b.action.as_str()))
        });
        RoleResponse {
            id: role.id,
            name: role.name.clone(),
            permissions,
        }
    }

    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory, used by the test suite and for
/// running the gateway without a database. `set_failing(true)` makes every call return
/// `RepositoryError::Unavailable`, simulating an unreachable database.
#[derive(Default)]
pub struct InMemoryRepository {
    graph: RwLock<MemoryGraph>,
    failing: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user id so `user_exists` reports it.
    pub async fn insert_user(&self, user_id: Uuid) {
        self.graph.write().await.users.insert(user_id);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        Ok(self.graph.read().await.users.contains(&user_id))
    }

    async fn count_user_permissions(
        &self,
        user_id: Uuid,
        action: PermissionAction,
        resource: &str,
    ) -> Result<i64, RepositoryError> {
        self.check()?;
        let graph = self.graph.read().await;
        let count = graph
            .user_roles
            .iter()
            .filter(|(member, _)| *member == user_id)
            .flat_map(|(_, role_id)| {
                graph
                    .role_permissions
                    .iter()
                    .filter(move |(granted_role, _)| granted_role == role_id)
            })
            .filter_map(|(_, permission_id)| graph.permissions.get(permission_id))
            .filter(|p| p.action == action && p.resource == resource)
            .count();
        Ok(count as i64)
    }

    async fn user_has_role(&self, user_id: Uuid, role_name: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .get_user_roles(user_id)
            .await?
            .iter()
            .any(|name| name == role_name))
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        self.check()?;
        let graph = self.graph.read().await;
        let names: BTreeSet<String> = graph
            .user_roles
            .iter()
            .filter(|(member, _)| *member == user_id)
            .filter_map(|(_, role_id)| graph.roles.get(role_id))
            .map(|role| role.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn create_role(
        &self,
        name: &str,
        permissions: &[PermissionSpec],
    ) -> Result<RoleResponse, RepositoryError> {
        self.check()?;
        let mut graph = self.graph.write().await;
        if graph.name_taken(name, None) {
            return Err(RepositoryError::Conflict("role name already exists".to_string()));
        }
        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        graph.roles.insert(role.id, role.clone());
        for spec in permissions {
            graph.link(role.id, spec);
        }
        Ok(graph.role_response(&role))
    }

    async fn get_role(&self, id: Uuid) -> Result<Option<RoleResponse>, RepositoryError> {
        self.check()?;
        let graph = self.graph.read().await;
        Ok(graph.roles.get(&id).map(|role| graph.role_response(role)))
    }

    async fn list_roles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleResponse>, i64), RepositoryError> {
        self.check()?;
        let graph = self.graph.read().await;
        let mut roles: Vec<&Role> = graph.roles.values().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        let page = roles
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|role| graph.role_response(role))
            .collect();
        Ok((page, roles.len() as i64))
    }

    async fn update_role(
        &self,
        id: Uuid,
        update: &UpdateRoleRequest,
    ) -> Result<Option<RoleResponse>, RepositoryError> {
        self.check()?;
        let mut graph = self.graph.write().await;
        if !graph.roles.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &update.name {
            if graph.name_taken(name, Some(id)) {
                return Err(RepositoryError::Conflict("role name already exists".to_string()));
            }
        }
        if let Some(permissions) = &update.permissions {
            graph.role_permissions.retain(|(role_id, _)| *role_id != id);
            for spec in permissions {
                graph.link(id, spec);
            }
        }
        let Some(role) = graph.roles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            role.name = name.clone();
        }
        role.updated_at = Utc::now();
        let role = role.clone();
        Ok(Some(graph.role_response(&role)))
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        let mut graph = self.graph.write().await;
        let removed = graph.roles.remove(&id).is_some();
        graph.role_permissions.retain(|(role_id, _)| *role_id != id);
        graph.user_roles.retain(|(_, role_id)| *role_id != id);
        Ok(removed)
    }

    async fn seed_role(&self, spec: &RoleSpec) -> Result<Role, RepositoryError> {
        self.check()?;
        let mut graph = self.graph.write().await;
        let existing = graph.roles.values().find(|r| r.name == spec.name).cloned();
        let role = match existing {
            Some(role) => role,
            None => {
                let now = Utc::now();
                let role = Role {
                    id: Uuid::new_v4(),
                    name: spec.name.clone(),
                    created_at: now,
                    updated_at: now,
                };
                graph.roles.insert(role.id, role.clone());
                role
            }
        };
        for grant in &spec.permissions {
            graph.link(role.id, grant);
        }
        Ok(role)
    }

    async fn create_permission(
        &self,
        spec: &PermissionSpec,
    ) -> Result<Permission, RepositoryError> {
        self.check()?;
        let mut graph = self.graph.write().await;
        let duplicate = graph
            .permissions
            .values()
            .any(|p| p.action == spec.action && p.resource == spec.resource);
        if duplicate {
            return Err(RepositoryError::Conflict("permission already exists".to_string()));
        }
        let id = graph.permission_id(spec);
        Ok(Permission {
            id,
            action: spec.action,
            resource: spec.resource.clone(),
        })
    }

    async fn get_permission(&self, id: Uuid) -> Result<Option<Permission>, RepositoryError> {
        self.check()?;
        Ok(self.graph.read().await.permissions.get(&id).cloned())
    }

    async fn list_permissions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Permission>, i64), RepositoryError> {
        self.check()?;
        let graph = self.graph.read().await;
        let mut permissions: Vec<Permission> = graph.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| {
            (a.resource.as_str(), a.action.as_str()).cmp(&(b.resource.as_str(), b.action.as_str()))
        });
        let total = permissions.len() as i64;
        let page = permissions
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete_permission(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        let mut graph = self.graph.write().await;
        let removed = graph.permissions.remove(&id).is_some();
        graph
            .role_permissions
            .retain(|(_, permission_id)| *permission_id != id);
        Ok(removed)
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        let mut graph = self.graph.write().await;
        if !graph.users.contains(&user_id) || !graph.roles.contains_key(&role_id) {
            return Err(RepositoryError::Conflict(
                "user or role does not exist".to_string(),
            ));
        }
        Ok(graph.user_roles.insert((user_id, role_id)))
    }

    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        Ok(self.graph.write().await.user_roles.remove(&(user_id, role_id)))
    }
}
