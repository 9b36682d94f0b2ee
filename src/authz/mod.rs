//! Authorization: request-to-permission resolution and the role-graph authority.

pub mod authority;
pub mod resolver;

pub use authority::{Decision, PermissionAuthority};
pub use resolver::{API_PREFIX, path_id, resolve};
