use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use std::sync::Arc;

use super::{identity::Identity, keys::KeySetCache};
use crate::error::AuthError;

/// Tokens are only ever accepted with this algorithm, whatever their header claims.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::ES256;

/// Splits an `Authorization` header value into its bearer token.
///
/// The value must be exactly two tokens separated by one space, the first being the
/// literal `Bearer`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingHeader),
    };

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// CredentialVerifier
///
/// Turns a raw `Authorization` header into a verified caller identity. Stateless apart
/// from the shared key cache; safe to call concurrently.
pub struct CredentialVerifier {
    keys: Arc<KeySetCache>,
}

impl CredentialVerifier {
    pub fn new(keys: Arc<KeySetCache>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &Arc<KeySetCache> {
        &self.keys
    }

    /// verify
    ///
    /// 1. Header present and non-empty, else `MissingHeader`.
    /// 2. `Bearer <token>`, else `MalformedHeader`.
    /// 3. ES256 signature checked against the key named by the token's `kid`, plus
    ///    expiry, else `InvalidToken` (`KeySetUnavailable` if the keys cannot be fetched).
    /// 4. A non-empty string `sub`, else `IdentityUnavailable`.
    pub async fn verify(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let token = bearer_token(header)?;

        let token_header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "unparseable token header");
            AuthError::InvalidToken
        })?;

        if token_header.alg != TOKEN_ALGORITHM {
            tracing::debug!(alg = ?token_header.alg, "token signed with unexpected algorithm");
            return Err(AuthError::InvalidToken);
        }

        let kid = token_header.kid.ok_or(AuthError::InvalidToken)?;

        let jwk = match self.keys.key_for(&kid).await {
            Ok(Some(jwk)) => jwk,
            Ok(None) => {
                tracing::info!(kid = %kid, "token names an unknown signing key");
                return Err(AuthError::InvalidToken);
            }
            Err(_) => return Err(AuthError::KeySetUnavailable),
        };

        let decoding_key = DecodingKey::from_jwk(&jwk).map_err(|e| {
            tracing::warn!(kid = %kid, error = %e, "signing key cannot be used for verification");
            AuthError::InvalidToken
        })?;

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.algorithms = vec![TOKEN_ALGORITHM];
        // Supabase issues `aud: authenticated`; audience and issuer are not inspected.
        validation.validate_aud = false;

        let token_data =
            decode::<serde_json::Value>(token, &decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })?;

        let subject = token_data
            .claims
            .get("sub")
            .and_then(serde_json::Value::as_str)
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| {
                tracing::error!("verified token carries no usable subject claim");
                AuthError::IdentityUnavailable
            })?;

        Ok(Identity::new(subject))
    }
}
