use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::PasswordCredentials;
use super::password::verify_password;
use super::token::{SessionClaims, TokenIssuer};
use crate::portal::domain::Identity;
use crate::portal::error::PortalError;
use crate::portal::store::EntityStore;

/// Resolves one request shape into the caller's identity.
pub trait Authenticator: Send + Sync {
    type Credentials: ?Sized;

    fn authenticate(
        &self,
        credentials: &Self::Credentials,
        now: DateTime<Utc>,
    ) -> Result<Identity, PortalError>;
}

/// Email and password login. Unknown emails and wrong passwords fail identically.
pub struct CredentialAuthenticator<S> {
    store: Arc<S>,
}

impl<S> CredentialAuthenticator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> Authenticator for CredentialAuthenticator<S>
where
    S: EntityStore,
{
    type Credentials = PasswordCredentials;

    fn authenticate(
        &self,
        credentials: &PasswordCredentials,
        _now: DateTime<Utc>,
    ) -> Result<Identity, PortalError> {
        let user = self
            .store
            .user_by_email(&credentials.email)?
            .ok_or(PortalError::InvalidCredentials)?;

        if !verify_password(&credentials.password, &user.password_hash)? {
            return Err(PortalError::InvalidCredentials);
        }
        Ok(Identity::new(user.id, user.role))
    }
}

/// Bearer session tokens: signature, expiry, revocation, then the user row.
pub struct TokenAuthenticator<S> {
    store: Arc<S>,
    tokens: Arc<TokenIssuer>,
}

impl<S> TokenAuthenticator<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// Valid, unrevoked claims without resolving the user.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, PortalError> {
        let claims = self.tokens.verify(token, now)?;
        if self.store.is_session_revoked(claims.jti)? {
            return Err(PortalError::InvalidToken);
        }
        Ok(claims)
    }
}

impl<S> Authenticator for TokenAuthenticator<S>
where
    S: EntityStore,
{
    type Credentials = str;

    fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, PortalError> {
        let claims = self.verify(token, now)?;
        let user = self
            .store
            .user(&claims.sub)?
            .ok_or(PortalError::UserNotFound(claims.sub))?;
        Ok(Identity::new(user.id, user.role))
    }
}
