use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::authenticator::{Authenticator, CredentialAuthenticator, TokenAuthenticator};
use super::domain::{
    normalize_email, validate_email, validate_password, AccountView, Credentials, DocumentKind,
    PasswordCredentials, Profile, ProfileDraft, Session, SignupRequest, User,
};
use super::password::hash_password;
use super::token::TokenIssuer;
use crate::portal::domain::{Identity, Role, UserId};
use crate::portal::error::{EntityKind, PortalError};
use crate::portal::events::{EventSink, PortalEvent};
use crate::portal::store::EntityStore;
use crate::portal::validation::ValidationError;

/// Accounts, sessions and profiles.
pub struct AuthService<S> {
    store: Arc<S>,
    tokens: Arc<TokenIssuer>,
    credentials: CredentialAuthenticator<S>,
    bearer: TokenAuthenticator<S>,
    events: Arc<dyn EventSink>,
}

impl<S> AuthService<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, tokens: TokenIssuer, events: Arc<dyn EventSink>) -> Self {
        let tokens = Arc::new(tokens);
        Self {
            credentials: CredentialAuthenticator::new(Arc::clone(&store)),
            bearer: TokenAuthenticator::new(Arc::clone(&store), Arc::clone(&tokens)),
            store,
            tokens,
            events,
        }
    }

    /// Creates the user and its role profile as a pair, then opens a session. When the profile
    /// write fails the user row is removed again and the profile error is returned.
    pub fn signup(&self, request: SignupRequest, now: DateTime<Utc>) -> Result<Session, PortalError> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password)?;
        request.profile.validate(now)?;

        let user = User {
            id: UserId::generate(),
            email,
            password_hash: hash_password(&request.password)?,
            role: request.profile.role(),
        };
        let user = self.store.insert_user(user)?;

        let profile = request.profile.into_profile(user.id, None);
        if let Err(err) = self.store.insert_profile(profile) {
            warn!(user_id = %user.id, error = %err, "profile write failed, rolling back signup");
            if let Err(rollback) = self.store.remove_user(&user.id) {
                error!(user_id = %user.id, error = %rollback, "signup rollback failed");
            }
            self.events
                .record(&PortalEvent::SignupRolledBack { user_id: user.id });
            return Err(err.into());
        }

        info!(user_id = %user.id, role = %user.role, "user signed up");
        self.events.record(&PortalEvent::UserSignedUp {
            user_id: user.id,
            role: user.role,
        });
        self.open_session(Identity::new(user.id, user.role), now)
    }

    pub fn login(
        &self,
        credentials: &PasswordCredentials,
        now: DateTime<Utc>,
    ) -> Result<Session, PortalError> {
        match self.credentials.authenticate(credentials, now) {
            Ok(identity) => {
                info!(user_id = %identity.user_id, "login succeeded");
                self.events.record(&PortalEvent::LoginSucceeded {
                    user_id: identity.user_id,
                });
                self.open_session(identity, now)
            }
            Err(PortalError::InvalidCredentials) => {
                warn!("login rejected");
                self.events.record(&PortalEvent::LoginRejected);
                Err(PortalError::InvalidCredentials)
            }
            Err(err) => Err(err),
        }
    }

    pub fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, PortalError> {
        self.bearer.authenticate(token, now)
    }

    /// Picks the authenticator matching the request shape.
    pub fn identify(
        &self,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Result<Identity, PortalError> {
        match credentials {
            Credentials::Password(password) => self.credentials.authenticate(password, now),
            Credentials::Bearer(token) => self.bearer.authenticate(token, now),
        }
    }

    /// Revokes the token until it would have expired anyway.
    pub fn logout(&self, token: &str, now: DateTime<Utc>) -> Result<(), PortalError> {
        let claims = self.bearer.verify(token, now)?;
        self.store.revoke_session(claims.jti, claims.expires_at(), now)?;

        info!(user_id = %claims.sub, "session revoked");
        self.events
            .record(&PortalEvent::LoggedOut { user_id: claims.sub });
        Ok(())
    }

    pub fn account(&self, identity: &Identity) -> Result<AccountView, PortalError> {
        let user = self
            .store
            .user(&identity.user_id)?
            .ok_or(PortalError::UserNotFound(identity.user_id))?;
        let profile = self.store.profile(&user.id)?;
        Ok(AccountView::new(&user, profile))
    }

    pub fn profile(&self, user_id: &UserId) -> Result<Profile, PortalError> {
        self.store
            .profile(user_id)?
            .ok_or_else(|| PortalError::not_found(EntityKind::Profile, user_id))
    }

    pub fn update_profile(
        &self,
        identity: &Identity,
        draft: ProfileDraft,
        now: DateTime<Utc>,
    ) -> Result<Profile, PortalError> {
        if draft.role() != identity.role {
            return Err(ValidationError::new("type", "must match the account role").into());
        }
        draft.validate(now)?;

        let existing = self.profile(&identity.user_id)?;
        let profile = draft.into_profile(identity.user_id, Some(&existing));
        let profile = self.store.replace_profile(profile)?;

        info!(user_id = %identity.user_id, "profile updated");
        Ok(profile)
    }

    /// Stores a reference to a document uploaded elsewhere.
    pub fn attach_document(
        &self,
        identity: &Identity,
        kind: DocumentKind,
        reference: &str,
    ) -> Result<Profile, PortalError> {
        identity.require(Role::Applicant, "only applicants keep documents")?;
        kind.validate_reference(reference)?;

        let Profile::Applicant(mut profile) = self.profile(&identity.user_id)? else {
            return Err(PortalError::not_found(EntityKind::Profile, identity.user_id));
        };
        let reference = Some(reference.trim().to_string());
        match kind {
            DocumentKind::Resume => profile.resume = reference,
            DocumentKind::ProfileImage => profile.profile_image = reference,
        }
        let profile = self.store.replace_profile(Profile::Applicant(profile))?;

        info!(user_id = %identity.user_id, document = %kind, "document attached");
        Ok(profile)
    }

    fn open_session(&self, identity: Identity, now: DateTime<Utc>) -> Result<Session, PortalError> {
        let issued = self.tokens.issue(identity.user_id, identity.role, now)?;
        Ok(Session {
            expires_at: issued.claims.expires_at(),
            token: issued.token,
            user_id: identity.user_id,
            role: identity.role,
        })
    }
}
