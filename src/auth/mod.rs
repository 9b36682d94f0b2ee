//! Authentication: key discovery, bearer token verification, and identity propagation.

pub mod identity;
pub mod keys;
pub mod verifier;

pub use identity::{AuthUser, Identity, attach, caller_identity};
pub use keys::{KeySetCache, KeySetError, KeySource, RemoteKeySource, StaticKeySource};
pub use verifier::{CredentialVerifier, bearer_token};
