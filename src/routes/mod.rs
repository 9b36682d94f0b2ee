/// Router Module Index
///
/// Splits the routing tree by the guard each group sits behind. Every group is wrapped
/// by credential verification in `create_router`; the groups differ only in what runs
/// after it.

/// Liveness routes. Authenticated, never permission-checked.
pub mod public;

/// The `/api/v1` role and permission administration surface.
pub mod api;

/// Routes restricted to holders of the `admin` role.
pub mod admin;
