//! Bearer token authentication.
//!
//! ID tokens are minted by the external auth provider; the service only
//! needs to map a token to the uid it was issued for.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};

/// A signed-in user and the ID token that proves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub id_token: String,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            id_token: id_token.into(),
        }
    }
}

/// Resolves ID tokens to users.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Fails with `Unauthorized` for unknown or revoked tokens.
    async fn verify(&self, token: &str) -> Result<AuthUser>;
}

/// Verifier backed by a fixed token table.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: RwLock<HashMap<String, String>>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    pub async fn insert(&self, token: impl Into<String>, uid: impl Into<String>) {
        self.tokens.write().await.insert(token.into(), uid.into());
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser> {
        self.tokens
            .read()
            .await
            .get(token)
            .map(|uid| AuthUser::new(uid.clone(), token))
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_verifier() {
        let verifier = StaticTokenVerifier::default();
        verifier.insert("tok-1", "alice").await;

        let user = verifier.verify("tok-1").await.unwrap();
        assert_eq!(user, AuthUser::new("alice", "tok-1"));

        assert!(matches!(
            verifier.verify("nope").await,
            Err(AppError::Unauthorized(_))
        ));

        assert!(verifier.revoke("tok-1").await);
        assert!(verifier.verify("tok-1").await.is_err());
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
