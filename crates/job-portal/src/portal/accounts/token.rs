use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::portal::domain::{Role, UserId};
use crate::portal::error::PortalError;

/// Claims carried by a session token. `exp` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl SessionClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

/// Signs and checks HS256 session tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        user_id: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, PortalError> {
        let claims = SessionClaims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| PortalError::Credential(err.to_string()))?;
        Ok(IssuedToken { token, claims })
    }

    /// Checks the signature and that `now` is before `exp`. Revocation is checked by the caller.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, PortalError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the caller's clock below.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected session token");
                PortalError::InvalidToken
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(PortalError::InvalidToken);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key-for-session-tokens", Duration::minutes(30))
    }

    #[test]
    fn issued_tokens_round_trip_until_expiry() {
        let issuer = issuer();
        let now = Utc::now();
        let user_id = UserId::generate();

        let issued = issuer.issue(user_id, Role::Applicant, now).expect("issue");
        let claims = issuer.verify(&issued.token, now).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Applicant);
        assert_eq!(claims.exp - claims.iat, 30 * 60);

        let later = now + Duration::minutes(31);
        assert!(matches!(
            issuer.verify(&issued.token, later),
            Err(PortalError::InvalidToken)
        ));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let now = Utc::now();
        let foreign = TokenIssuer::new("someone-else", Duration::minutes(30))
            .issue(UserId::generate(), Role::Recruiter, now)
            .expect("issue");

        assert!(matches!(
            issuer().verify(&foreign.token, now),
            Err(PortalError::InvalidToken)
        ));
        assert!(matches!(
            issuer().verify("not-a-token", now),
            Err(PortalError::InvalidToken)
        ));
    }

    #[test]
    fn every_token_gets_its_own_id() {
        let issuer = issuer();
        let now = Utc::now();
        let user_id = UserId::generate();
        let first = issuer.issue(user_id, Role::Applicant, now).expect("issue");
        let second = issuer.issue(user_id, Role::Applicant, now).expect("issue");
        assert_ne!(first.claims.jti, second.claims.jti);
    }
}
