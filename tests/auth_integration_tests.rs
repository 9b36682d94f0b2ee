mod common;

use async_trait::async_trait;
use axum::{Json, Router, http::StatusCode, routing::get};
use common::*;
use inside_athletics::{
    KeySetCache,
    auth::{
        CredentialVerifier, KeySetError, KeySource, RemoteKeySource, StaticKeySource,
        bearer_token,
    },
    error::AuthError,
};
use jsonwebtoken::{EncodingKey, Header, encode, jwk::JwkSet};
use serde_json::json;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::net::TcpListener;

fn verifier_over(source: Arc<ScriptedKeySource>) -> CredentialVerifier {
    CredentialVerifier::new(Arc::new(KeySetCache::new(source)))
}

// --- Header Parsing ---

#[test]
fn bearer_token_requires_a_header() {
    assert_eq!(bearer_token(None), Err(AuthError::MissingHeader));
    assert_eq!(bearer_token(Some("")), Err(AuthError::MissingHeader));
}

#[test]
fn bearer_token_requires_exact_scheme_and_one_space() {
    assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));

    for malformed in [
        "Token abc",
        "bearer abc",
        "Bearer",
        "Bearer  abc",
        "Bearer abc extra",
        "Basic dXNlcjpwYXNz",
    ] {
        assert_eq!(
            bearer_token(Some(malformed)),
            Err(AuthError::MalformedHeader),
            "{malformed:?} should be malformed"
        );
    }
}

#[test]
fn auth_errors_carry_fixed_messages_and_statuses() {
    assert_eq!(
        AuthError::MissingHeader.to_string(),
        "Authorization header not in request"
    );
    assert_eq!(
        AuthError::MalformedHeader.to_string(),
        "Bearer not included in Authorization header"
    );
    assert_eq!(AuthError::InvalidToken.to_string(), "Token is not valid");
    assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AuthError::IdentityUnavailable.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AuthError::InsufficientPermissions.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        AuthError::PermissionCheckFailed.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// --- Verification ---

#[tokio::test]
async fn valid_token_yields_subject() {
    let source = Arc::new(ScriptedKeySource::new(Some(key_a_set())));
    let verifier = verifier_over(source.clone());

    let header = bearer(&token_for("3f2c9a2e-5d1b-4c1e-9a5f-0f6c2b7d8e91"));
    let identity = verifier.verify(Some(&header)).await.unwrap();

    assert_eq!(identity.as_str(), "3f2c9a2e-5d1b-4c1e-9a5f-0f6c2b7d8e91");
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn key_set_is_fetched_once_and_reused() {
    let source = Arc::new(ScriptedKeySource::new(Some(key_a_set())));
    let verifier = verifier_over(source.clone());

    for _ in 0..5 {
        let header = bearer(&token_for("someone"));
        verifier.verify(Some(&header)).await.unwrap();
    }

    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let verifier = verifier_over(Arc::new(ScriptedKeySource::new(Some(key_a_set()))));
    let token = mint(
        KEY_A_PEM,
        Some(KEY_A_KID),
        &json!({ "sub": "someone", "exp": now() - 3600 }),
    );

    let result = verifier.verify(Some(&bearer(&token))).await;
    assert_eq!(result, Err(AuthError::InvalidToken));
}

#[tokio::test]
async fn token_without_expiry_is_rejected() {
    let verifier = verifier_over(Arc::new(ScriptedKeySource::new(Some(key_a_set()))));
    let token = mint(KEY_A_PEM, Some(KEY_A_KID), &json!({ "sub": "someone" }));

    let result = verifier.verify(Some(&bearer(&token))).await;
    assert_eq!(result, Err(AuthError::InvalidToken));
}

#[tokio::test]
async fn token_signed_by_an_untrusted_key_is_rejected() {
    let verifier = verifier_over(Arc::new(ScriptedKeySource::new(Some(key_a_set()))));
    // Claims the trusted kid but is signed with the other key.
    let forged = mint(
        KEY_B_PEM,
        Some(KEY_A_KID),
        &json!({ "sub": "someone", "exp": now() + 3600 }),
    );

    let result = verifier.verify(Some(&bearer(&forged))).await;
    assert_eq!(result, Err(AuthError::InvalidToken));
}

#[tokio::test]
async fn symmetric_algorithm_is_rejected() {
    let source = Arc::new(ScriptedKeySource::new(Some(key_a_set())));
    let verifier = verifier_over(source.clone());

    let mut header = Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some(KEY_A_KID.to_string());
    let token = encode(
        &header,
        &json!({ "sub": "someone", "exp": now() + 3600 }),
        &EncodingKey::from_secret(KEY_A_X.as_bytes()),
    )
    .unwrap();

    let result = verifier.verify(Some(&bearer(&token))).await;
    assert_eq!(result, Err(AuthError::InvalidToken));
    // Rejected on the header alone.
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn token_without_kid_is_rejected() {
    let verifier = verifier_over(Arc::new(ScriptedKeySource::new(Some(key_a_set()))));
    let token = mint(
        KEY_A_PEM,
        None,
        &json!({ "sub": "someone", "exp": now() + 3600 }),
    );

    let result = verifier.verify(Some(&bearer(&token))).await;
    assert_eq!(result, Err(AuthError::InvalidToken));
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let verifier = verifier_over(Arc::new(ScriptedKeySource::new(Some(key_a_set()))));
    let result = verifier.verify(Some("Bearer not-a-jwt")).await;
    assert_eq!(result, Err(AuthError::InvalidToken));
}

#[tokio::test]
async fn missing_or_empty_subject_is_a_server_fault() {
    let verifier = verifier_over(Arc::new(ScriptedKeySource::new(Some(key_a_set()))));

    let no_sub = mint(KEY_A_PEM, Some(KEY_A_KID), &json!({ "exp": now() + 3600 }));
    assert_eq!(
        verifier.verify(Some(&bearer(&no_sub))).await,
        Err(AuthError::IdentityUnavailable)
    );

    let empty_sub = mint(
        KEY_A_PEM,
        Some(KEY_A_KID),
        &json!({ "sub": "", "exp": now() + 3600 }),
    );
    assert_eq!(
        verifier.verify(Some(&bearer(&empty_sub))).await,
        Err(AuthError::IdentityUnavailable)
    );

    let numeric_sub = mint(
        KEY_A_PEM,
        Some(KEY_A_KID),
        &json!({ "sub": 42, "exp": now() + 3600 }),
    );
    assert_eq!(
        verifier.verify(Some(&bearer(&numeric_sub))).await,
        Err(AuthError::IdentityUnavailable)
    );
}

#[tokio::test]
async fn unreachable_key_endpoint_fails_closed() {
    let source = Arc::new(ScriptedKeySource::new(None));
    let verifier = verifier_over(source.clone());

    let result = verifier.verify(Some(&bearer(&token_for("someone")))).await;
    assert_eq!(result, Err(AuthError::KeySetUnavailable));
    assert_eq!(result.unwrap_err().status(), StatusCode::UNAUTHORIZED);

    // Failures are not cached: the next request fetches again and succeeds.
    source.set(Some(key_a_set()));
    let identity = verifier
        .verify(Some(&bearer(&token_for("someone"))))
        .await
        .unwrap();
    assert_eq!(identity.as_str(), "someone");
    assert_eq!(source.fetches(), 2);
}

// --- Key Rotation ---

#[tokio::test]
async fn unknown_kid_triggers_a_refresh_and_picks_up_rotated_keys() {
    let source = Arc::new(ScriptedKeySource::new(Some(key_a_set())));
    let verifier = verifier_over(source.clone());

    verifier
        .verify(Some(&bearer(&token_for("someone"))))
        .await
        .unwrap();
    assert_eq!(source.fetches(), 1);

    // The issuer rotates to key B.
    source.set(Some(key_b_set()));
    let rotated = mint(
        KEY_B_PEM,
        Some(KEY_B_KID),
        &json!({ "sub": "someone", "exp": now() + 3600 }),
    );

    let identity = verifier.verify(Some(&bearer(&rotated))).await.unwrap();
    assert_eq!(identity.as_str(), "someone");
    assert_eq!(source.fetches(), 2);

    // The new snapshot replaced the old one whole.
    let current = verifier.keys().current().unwrap();
    assert!(current.find(KEY_B_KID).is_some());
    assert!(current.find(KEY_A_KID).is_none());
}

#[tokio::test]
async fn kid_missing_after_refresh_is_invalid() {
    let source = Arc::new(ScriptedKeySource::new(Some(key_a_set())));
    let verifier = verifier_over(source.clone());
    verifier
        .verify(Some(&bearer(&token_for("someone"))))
        .await
        .unwrap();

    let stranger = mint(
        KEY_B_PEM,
        Some("never-published"),
        &json!({ "sub": "someone", "exp": now() + 3600 }),
    );

    let result = verifier.verify(Some(&bearer(&stranger))).await;
    assert_eq!(result, Err(AuthError::InvalidToken));
    // Initial fetch, then exactly one refresh for the miss.
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn concurrent_misses_share_one_refresh() {
    let source = Arc::new(ScriptedKeySource::new(Some(key_a_set())));
    let cache = Arc::new(KeySetCache::new(source.clone()));
    cache.refresh().await.unwrap();
    assert_eq!(source.fetches(), 1);

    source.set(Some(key_b_set()));

    let lookups: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.key_for(KEY_B_KID).await })
        })
        .collect();
    for lookup in lookups {
        assert!(lookup.await.unwrap().unwrap().is_some());
    }

    assert_eq!(source.fetches(), 2);
}

/// Answers every fetch with an error after `delay`, counting attempts.
struct SlowFailingSource {
    delay: Duration,
    fetches: AtomicUsize,
}

#[async_trait]
impl KeySource for SlowFailingSource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Err(KeySetError::Fetch {
            url: "test://jwks".to_string(),
            reason: "timed out".to_string(),
        })
    }
}

#[tokio::test]
async fn concurrent_misses_share_a_failed_refresh() {
    let source = Arc::new(SlowFailingSource {
        delay: Duration::from_millis(200),
        fetches: AtomicUsize::new(0),
    });
    let cache = Arc::new(KeySetCache::new(source.clone()));
    let started = Instant::now();

    let lookups: Vec<_> = (0..5)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.key_for("k").await })
        })
        .collect();
    for lookup in lookups {
        assert!(matches!(
            lookup.await.unwrap(),
            Err(KeySetError::Fetch { .. })
        ));
    }

    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert!(
        started.elapsed() < Duration::from_millis(600),
        "waiters must not queue up their own fetches: {:?}",
        started.elapsed()
    );

    // A later miss, after the failure has been reported, tries again.
    assert!(cache.key_for("k").await.is_err());
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn static_source_serves_its_set() {
    let source = StaticKeySource::new(key_a_set());
    let set = source.fetch().await.unwrap();
    assert!(set.find(KEY_A_KID).is_some());
}

// --- Remote Key Source ---

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

#[tokio::test]
async fn remote_source_fetches_jwks_document() {
    let document = json!({ "keys": [jwk(KEY_A_KID, KEY_A_X, KEY_A_Y)] });
    let base = serve(Router::new().route(
        "/auth/v1/.well-known/jwks.json",
        get(move || {
            let document = document.clone();
            async move { Json(document) }
        }),
    ))
    .await;

    let url = inside_athletics::config::jwks_url_for(&format!("{base}/"));
    let source = RemoteKeySource::new(url, Duration::from_secs(5)).unwrap();
    let set = source.fetch().await.unwrap();

    assert!(set.find(KEY_A_KID).is_some());
}

#[tokio::test]
async fn remote_source_reports_error_statuses() {
    let base = serve(Router::new().route(
        "/jwks.json",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;

    let source = RemoteKeySource::new(format!("{base}/jwks.json"), Duration::from_secs(5)).unwrap();
    let error = source.fetch().await.unwrap_err();

    assert!(error.to_string().contains("503"), "got: {error}");
}

#[tokio::test]
async fn remote_source_rejects_non_jwks_bodies() {
    let base = serve(Router::new().route("/jwks.json", get(|| async { "not json" }))).await;

    let source = RemoteKeySource::new(format!("{base}/jwks.json"), Duration::from_secs(5)).unwrap();
    assert!(source.fetch().await.is_err());
}
