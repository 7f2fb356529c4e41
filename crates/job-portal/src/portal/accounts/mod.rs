//! Accounts, role profiles and session tokens.

mod authenticator;
mod domain;
mod password;
mod service;
mod token;

pub use authenticator::{Authenticator, CredentialAuthenticator, TokenAuthenticator};
pub use domain::{
    normalize_email, validate_contact_number, validate_email, validate_password, AccountView,
    ApplicantDraft, ApplicantProfile, Credentials, DocumentKind, DocumentReference, Education,
    PasswordCredentials, Profile, ProfileDraft, RecruiterDraft, RecruiterProfile, Session,
    SignupRequest, User,
};
pub use password::{hash_password, verify_password};
pub use service::AuthService;
pub use token::{IssuedToken, SessionClaims, TokenIssuer};
