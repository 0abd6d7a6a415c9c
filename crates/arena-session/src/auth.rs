//! Authentication hook for validating player identity.
//!
//! Credentials are issued by the account service, not by this crate. The
//! arena only needs to turn a bearer token into an [`Identity`], so it
//! defines the [`Authenticator`] trait with a single async method and lets
//! the deployment plug in the real check (JWT validation, a call to the
//! account service, ...).
//!
//! [`TokenTable`] is a fixed token → identity map for development servers
//! and tests.

use std::collections::HashMap;

use arena_protocol::UserId;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Who a connection belongs to, once its token has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    /// Display name shown to other players.
    pub username: String,
}

impl Identity {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Verifies a client's bearer token and returns their identity.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for as long as the server runs. The returned future
/// must be `Send` so it can be awaited inside a spawned task.
///
/// # Example
///
/// ```rust
/// use arena_protocol::UserId;
/// use arena_session::{Authenticator, Identity, SessionError};
///
/// /// Treats the token as a numeric user id. Development only!
/// struct NumericTokens;
///
/// impl Authenticator for NumericTokens {
///     async fn verify(&self, token: &str) -> Result<Identity, SessionError> {
///         let id: u64 = token
///             .parse()
///             .map_err(|_| SessionError::AuthFailed("token must be a number".into()))?;
///         Ok(Identity::new(UserId(id), format!("guest{id}")))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token`.
    ///
    /// # Returns
    /// - `Ok(Identity)`: the token is valid, here's who they are
    /// - `Err(SessionError::AuthFailed)`: missing, malformed, expired, or
    ///   revoked
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// An [`Authenticator`] backed by a fixed table of tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, Identity>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` for `identity`, replacing any earlier entry.
    pub fn insert(&mut self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.insert(token, identity);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for TokenTable {
    async fn verify(&self, token: &str) -> Result<Identity, SessionError> {
        if token.is_empty() {
            return Err(SessionError::AuthFailed("missing token".into()));
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TokenTable {
        TokenTable::new().with("tok-ana", Identity::new(UserId(1), "ana"))
    }

    #[tokio::test]
    async fn test_verify_known_token_returns_identity() {
        let identity = table().verify("tok-ana").await.expect("valid token");
        assert_eq!(identity, Identity::new(UserId(1), "ana"));
    }

    #[tokio::test]
    async fn test_verify_unknown_token_fails() {
        let err = table().verify("tok-bob").await.unwrap_err();
        assert!(matches!(err, SessionError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_verify_empty_token_fails_as_missing() {
        let err = table().verify("").await.unwrap_err();
        assert_eq!(err.to_string(), "authentication failed: missing token");
    }

    #[test]
    fn test_insert_replaces_existing_token() {
        let mut t = table();
        t.insert("tok-ana", Identity::new(UserId(9), "ana2"));
        assert_eq!(t.len(), 1);
    }
}
