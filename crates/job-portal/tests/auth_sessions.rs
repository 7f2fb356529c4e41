use std::sync::Arc;

use chrono::{Duration, Utc};
use job_portal::config::AuthConfig;
use job_portal::portal::accounts::{
    ApplicantDraft, Education, PasswordCredentials, ProfileDraft, SignupRequest,
};
use job_portal::portal::{EntityStore, ErrorKind, NoopEventSink, Portal, Role};

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-secret".to_string(),
        token_ttl: Duration::minutes(15),
    }
}

fn signup_request() -> SignupRequest {
    SignupRequest {
        email: "Grace@Navy.mil".to_string(),
        password: "compilers-rock".to_string(),
        profile: ProfileDraft::Applicant(ApplicantDraft {
            name: "Grace Hopper".to_string(),
            education: vec![Education {
                institution_name: "Yale".to_string(),
                start_year: 1930,
                end_year: Some(1934),
            }],
            skills: vec!["cobol".to_string()],
        }),
    }
}

#[test]
fn signup_login_and_logout_round_trip() {
    let portal = Portal::in_memory(&auth_config(), Arc::new(NoopEventSink));
    let auth = portal.auth();
    let now = Utc::now();

    let signup = auth.signup(signup_request(), now).expect("signup");
    assert_eq!(signup.role, Role::Applicant);
    assert_eq!(signup.expires_at.timestamp(), (now + Duration::minutes(15)).timestamp());

    let session = auth
        .login(
            &PasswordCredentials {
                email: "grace@navy.mil".to_string(),
                password: "compilers-rock".to_string(),
            },
            now,
        )
        .expect("login");
    assert_eq!(session.user_id, signup.user_id);
    assert_ne!(session.token, signup.token);

    let identity = auth.authenticate(&session.token, now).expect("authenticate");
    assert_eq!(identity.user_id, signup.user_id);

    auth.logout(&session.token, now).expect("logout");
    assert_eq!(
        auth.authenticate(&session.token, now).unwrap_err().kind(),
        ErrorKind::InvalidToken
    );
    auth.authenticate(&signup.token, now)
        .expect("the signup session is still open");

    let account = auth.account(&identity).expect("account");
    assert_eq!(account.email, "grace@navy.mil");
    assert!(portal
        .store()
        .user_by_email("GRACE@navy.mil")
        .expect("lookup")
        .is_some());
}

#[test]
fn tokens_expire_after_the_configured_ttl() {
    let portal = Portal::in_memory(&auth_config(), Arc::new(NoopEventSink));
    let now = Utc::now();
    let session = portal
        .auth()
        .signup(signup_request(), now)
        .expect("signup");

    let err = portal
        .auth()
        .authenticate(&session.token, now + Duration::minutes(16))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidToken);
}
