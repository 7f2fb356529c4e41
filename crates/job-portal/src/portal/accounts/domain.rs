use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::portal::domain::{Role, UserId};
use crate::portal::ratings::UNRATED;
use crate::portal::validation::{ensure_word_limit, non_empty, ValidationError, MAX_STATEMENT_WORDS};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const EARLIEST_EDUCATION_YEAR: i32 = 1930;

/// Stored account row. The password hash never leaves the crate boundary in responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Lower-cased, trimmed form used for uniqueness and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::new("email", "is not a valid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Blank contact numbers mean none was given.
fn contact_number(number: Option<String>) -> Option<String> {
    number
        .map(|number| number.trim().to_string())
        .filter(|number| !number.is_empty())
}

/// `+`, a 1-3 digit country code and a 10 digit subscriber number.
pub fn validate_contact_number(number: &str) -> Result<(), ValidationError> {
    let digits = number.strip_prefix('+').unwrap_or_default();
    let well_formed = (11..=13).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(ValidationError::new(
            "contact_number",
            "must look like +<country code><10 digits>",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub institution_name: String,
    pub start_year: i32,
    #[serde(default)]
    pub end_year: Option<i32>,
}

impl Education {
    fn validate(&self, current_year: i32) -> Result<(), ValidationError> {
        non_empty("education.institution_name", &self.institution_name)?;
        if !(EARLIEST_EDUCATION_YEAR..=current_year).contains(&self.start_year) {
            return Err(ValidationError::new(
                "education.start_year",
                format!("must be between {EARLIEST_EDUCATION_YEAR} and {current_year}"),
            ));
        }
        if let Some(end_year) = self.end_year {
            if end_year < self.start_year || end_year > current_year {
                return Err(ValidationError::new(
                    "education.end_year",
                    format!("must be between {} and {current_year}", self.start_year),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruiterProfile {
    pub user_id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub rating: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// Role-specific profile; the tag always equals the owning user's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Profile {
    Recruiter(RecruiterProfile),
    Applicant(ApplicantProfile),
}

impl Profile {
    pub fn user_id(&self) -> UserId {
        match self {
            Profile::Recruiter(profile) => profile.user_id,
            Profile::Applicant(profile) => profile.user_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Profile::Recruiter(_) => Role::Recruiter,
            Profile::Applicant(_) => Role::Applicant,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Profile::Recruiter(profile) => &profile.name,
            Profile::Applicant(profile) => &profile.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterDraft {
    pub name: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDraft {
    pub name: String,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Profile fields supplied at signup or on edit. Ratings and documents are managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileDraft {
    Recruiter(RecruiterDraft),
    Applicant(ApplicantDraft),
}

impl ProfileDraft {
    pub fn role(&self) -> Role {
        match self {
            ProfileDraft::Recruiter(_) => Role::Recruiter,
            ProfileDraft::Applicant(_) => Role::Applicant,
        }
    }

    pub(crate) fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        match self {
            ProfileDraft::Recruiter(draft) => {
                non_empty("name", &draft.name)?;
                if let Some(number) = contact_number(draft.contact_number.clone()) {
                    validate_contact_number(&number)?;
                }
                if let Some(bio) = draft.bio.as_deref() {
                    ensure_word_limit("bio", bio, MAX_STATEMENT_WORDS)?;
                }
            }
            ProfileDraft::Applicant(draft) => {
                non_empty("name", &draft.name)?;
                let current_year = now.year();
                for entry in &draft.education {
                    entry.validate(current_year)?;
                }
            }
        }
        Ok(())
    }

    /// Builds the stored profile, carrying store-managed fields over from `existing`.
    pub(crate) fn into_profile(self, user_id: UserId, existing: Option<&Profile>) -> Profile {
        match self {
            ProfileDraft::Recruiter(draft) => Profile::Recruiter(RecruiterProfile {
                user_id,
                name: draft.name.trim().to_string(),
                contact_number: contact_number(draft.contact_number),
                bio: draft.bio,
            }),
            ProfileDraft::Applicant(draft) => {
                let (rating, resume, profile_image) = match existing {
                    Some(Profile::Applicant(current)) => (
                        current.rating,
                        current.resume.clone(),
                        current.profile_image.clone(),
                    ),
                    _ => (UNRATED, None, None),
                };
                Profile::Applicant(ApplicantProfile {
                    user_id,
                    name: draft.name.trim().to_string(),
                    education: draft.education,
                    skills: draft
                        .skills
                        .into_iter()
                        .map(|skill| skill.trim().to_string())
                        .filter(|skill| !skill.is_empty())
                        .collect(),
                    rating,
                    resume,
                    profile_image,
                })
            }
        }
    }
}

/// Documents live in external storage; profiles keep only their reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    ProfileImage,
}

impl DocumentKind {
    pub const fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            DocumentKind::Resume => &["pdf"],
            DocumentKind::ProfileImage => &["jpg", "jpeg", "png"],
        }
    }

    pub(crate) fn validate_reference(self, reference: &str) -> Result<(), ValidationError> {
        non_empty("reference", reference)?;
        let extension = reference
            .trim()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions().contains(&extension.as_str()) {
            return Err(ValidationError::new(
                "reference",
                format!("{self} must be one of: {}", self.allowed_extensions().join(", ")),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Resume => f.write_str("resume"),
            DocumentKind::ProfileImage => f.write_str("profile image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub reference: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub profile: ProfileDraft,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("profile", &self.profile)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request shapes an `Authenticator` can resolve into an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Password(PasswordCredentials),
    Bearer(String),
}

/// Issued on signup and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub profile: Option<Profile>,
}

impl AccountView {
    pub fn new(user: &User, profile: Option<Profile>) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn email_shape_is_checked_before_normalizing() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@@example.com").is_err());
        assert!(validate_email("ada lovelace@example.com").is_err());
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn contact_numbers_need_a_country_code() {
        assert!(validate_contact_number("+919876543210").is_ok());
        assert!(validate_contact_number("+1234567890123").is_ok());
        assert!(validate_contact_number("9876543210").is_err());
        assert!(validate_contact_number("+98765-43210").is_err());
        assert!(validate_contact_number("+12345678901234").is_err());
    }

    #[test]
    fn blank_contact_numbers_are_treated_as_missing() {
        let draft = |number: &str| RecruiterDraft {
            name: "Acme".to_string(),
            contact_number: Some(number.to_string()),
            bio: None,
        };

        for blank in ["", "   "] {
            let profile = ProfileDraft::Recruiter(draft(blank));
            assert!(profile.validate(now()).is_ok());
            match profile.into_profile(UserId::generate(), None) {
                Profile::Recruiter(stored) => assert_eq!(stored.contact_number, None),
                other => panic!("expected recruiter profile, got {other:?}"),
            }
        }

        let malformed = ProfileDraft::Recruiter(draft("12345"));
        assert_eq!(malformed.validate(now()).unwrap_err().field, "contact_number");
    }

    #[test]
    fn signup_debug_output_hides_the_password() {
        let request = SignupRequest {
            email: "ada@example.com".to_string(),
            password: "correct horse battery".to_string(),
            profile: ProfileDraft::Applicant(ApplicantDraft {
                name: "Ada".to_string(),
                education: Vec::new(),
                skills: Vec::new(),
            }),
        };

        let rendered = format!("{request:?}");
        assert!(rendered.contains("ada@example.com"));
        assert!(!rendered.contains("correct horse battery"));
    }

    #[test]
    fn education_years_are_bounded_by_the_current_year() {
        let draft = |start_year, end_year| {
            ProfileDraft::Applicant(ApplicantDraft {
                name: "Grace".to_string(),
                education: vec![Education {
                    institution_name: "Yale".to_string(),
                    start_year,
                    end_year,
                }],
                skills: Vec::new(),
            })
        };

        assert!(draft(2018, Some(2022)).validate(now()).is_ok());
        assert!(draft(1929, None).validate(now()).is_err());
        assert!(draft(2025, None).validate(now()).is_err());
        let err = draft(2020, Some(2019)).validate(now()).unwrap_err();
        assert_eq!(err.field, "education.end_year");
    }

    #[test]
    fn recruiter_bio_is_capped_at_the_statement_limit() {
        let draft = ProfileDraft::Recruiter(RecruiterDraft {
            name: "Acme".to_string(),
            contact_number: None,
            bio: Some(vec!["word"; MAX_STATEMENT_WORDS + 1].join(" ")),
        });
        assert_eq!(draft.validate(now()).unwrap_err().field, "bio");
    }

    #[test]
    fn rebuilding_an_applicant_profile_keeps_rating_and_documents() {
        let user_id = UserId::generate();
        let existing = Profile::Applicant(ApplicantProfile {
            user_id,
            name: "Grace".to_string(),
            education: Vec::new(),
            skills: Vec::new(),
            rating: 4.5,
            resume: Some("https://files.example/cv.pdf".to_string()),
            profile_image: None,
        });
        let draft = ProfileDraft::Applicant(ApplicantDraft {
            name: " Grace Hopper ".to_string(),
            education: Vec::new(),
            skills: vec!["cobol".to_string(), "  ".to_string()],
        });

        let Profile::Applicant(updated) = draft.into_profile(user_id, Some(&existing)) else {
            panic!("expected an applicant profile");
        };
        assert_eq!(updated.name, "Grace Hopper");
        assert_eq!(updated.rating, 4.5);
        assert_eq!(updated.skills, vec!["cobol".to_string()]);
        assert!(updated.resume.is_some());
    }

    #[test]
    fn document_references_are_checked_by_extension() {
        assert!(DocumentKind::Resume.validate_reference("cv.PDF").is_ok());
        assert!(DocumentKind::Resume.validate_reference("cv.docx").is_err());
        assert!(DocumentKind::ProfileImage
            .validate_reference("https://cdn.example/me.jpeg")
            .is_ok());
        assert!(DocumentKind::ProfileImage.validate_reference("me").is_err());
    }
}
