use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::accounts::{DocumentKind, DocumentReference, PasswordCredentials, ProfileDraft, SignupRequest};
use super::applications::{ApplicationQuery, ApplicationStatus, ApplicationSubmission, StatusUpdate};
use super::domain::{ApplicationId, Identity, JobId, UserId};
use super::error::PortalError;
use super::facade::Portal;
use super::jobs::{JobAmendment, JobQuery, JobSubmission};
use super::ratings::{RatingCategory, RatingSubmission};
use super::store::EntityStore;

type PortalState<S> = State<Arc<Portal<S>>>;

/// JSON body whose rejections render as portal validation errors.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(PortalError))]
pub(crate) struct ApiJson<T>(pub(crate) T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(PortalError))]
pub(crate) struct ApiPath<T>(pub(crate) T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(PortalError))]
pub(crate) struct ApiQuery<T>(pub(crate) T);

/// Runs credential work (Argon2 hashing) on the blocking pool.
pub(crate) async fn off_runtime<S, T, F>(portal: Arc<Portal<S>>, work: F) -> Result<T, PortalError>
where
    S: EntityStore + 'static,
    T: Send + 'static,
    F: FnOnce(&Portal<S>) -> Result<T, PortalError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&portal))
        .await
        .map_err(|err| PortalError::Credential(err.to_string()))?
}

/// Router exposing the auth, job, application, rating and profile endpoints.
pub fn portal_router<S>(portal: Arc<Portal<S>>) -> Router
where
    S: EntityStore + 'static,
{
    Router::new()
        .route("/auth/signup", post(signup_handler::<S>))
        .route("/auth/login", post(login_handler::<S>))
        .route("/auth/logout", post(logout_handler::<S>))
        .route(
            "/api/jobs",
            get(list_jobs_handler::<S>).post(create_job_handler::<S>),
        )
        .route(
            "/api/jobs/:job_id",
            get(job_handler::<S>)
                .put(update_job_handler::<S>)
                .delete(delete_job_handler::<S>),
        )
        .route("/api/jobs/:job_id/close", post(close_job_handler::<S>))
        .route(
            "/api/jobs/:job_id/applications",
            get(job_applications_handler::<S>).post(apply_handler::<S>),
        )
        .route("/api/applications", get(list_applications_handler::<S>))
        .route(
            "/api/applications/:application_id",
            get(application_handler::<S>).put(update_status_handler::<S>),
        )
        .route(
            "/api/applications/:application_id/joining-date",
            put(joining_date_handler::<S>),
        )
        .route(
            "/api/rating",
            get(rating_handler::<S>).put(rate_handler::<S>),
        )
        .route(
            "/api/user",
            get(account_handler::<S>).put(update_profile_handler::<S>),
        )
        .route("/api/user/:user_id", get(profile_handler::<S>))
        .route("/api/documents/:kind", put(attach_document_handler::<S>))
        .with_state(portal)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, PortalError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(PortalError::InvalidToken)
}

fn caller<S>(portal: &Portal<S>, headers: &HeaderMap) -> Result<Identity, PortalError>
where
    S: EntityStore + 'static,
{
    portal.auth().authenticate(bearer_token(headers)?, Utc::now())
}

pub(crate) async fn signup_handler<S>(
    State(portal): PortalState<S>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let session = off_runtime(portal, move |portal| {
        portal.auth().signup(request, Utc::now())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(session)).into_response())
}

pub(crate) async fn login_handler<S>(
    State(portal): PortalState<S>,
    ApiJson(credentials): ApiJson<PasswordCredentials>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let session = off_runtime(portal, move |portal| {
        portal.auth().login(&credentials, Utc::now())
    })
    .await?;
    Ok(Json(session).into_response())
}

pub(crate) async fn logout_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    portal.auth().logout(bearer_token(&headers)?, Utc::now())?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn list_jobs_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<JobQuery>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let viewer = caller(&portal, &headers)?;
    let jobs = portal.jobs().list_jobs(&viewer, &query)?;
    Ok(Json(jobs).into_response())
}

pub(crate) async fn create_job_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiJson(submission): ApiJson<JobSubmission>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let owner = caller(&portal, &headers)?;
    let job = portal.jobs().create_job(&owner, submission, Utc::now())?;
    Ok((StatusCode::CREATED, Json(job)).into_response())
}

pub(crate) async fn job_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(job_id): ApiPath<JobId>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    caller(&portal, &headers)?;
    let job = portal.jobs().job(&job_id)?;
    Ok(Json(job).into_response())
}

pub(crate) async fn update_job_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(job_id): ApiPath<JobId>,
    ApiJson(amendment): ApiJson<JobAmendment>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let owner = caller(&portal, &headers)?;
    let job = portal.jobs().update_job(&owner, &job_id, amendment)?;
    Ok(Json(job).into_response())
}

pub(crate) async fn delete_job_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(job_id): ApiPath<JobId>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let owner = caller(&portal, &headers)?;
    let retired = portal.jobs().delete_job(&owner, &job_id)?;
    Ok(Json(retired).into_response())
}

pub(crate) async fn close_job_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(job_id): ApiPath<JobId>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let owner = caller(&portal, &headers)?;
    let retired = portal.jobs().close_job(&owner, &job_id)?;
    Ok(Json(retired).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusFilter {
    #[serde(default)]
    status: Option<ApplicationStatus>,
}

pub(crate) async fn job_applications_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(job_id): ApiPath<JobId>,
    ApiQuery(filter): ApiQuery<StatusFilter>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let recruiter = caller(&portal, &headers)?;
    let applications = portal
        .applications()
        .job_applications(&recruiter, &job_id, filter.status)?;
    Ok(Json(applications).into_response())
}

pub(crate) async fn apply_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(job_id): ApiPath<JobId>,
    ApiJson(submission): ApiJson<ApplicationSubmission>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let applicant = caller(&portal, &headers)?;
    let application = portal
        .applications()
        .apply(&applicant, &job_id, submission, Utc::now())?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn list_applications_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ApplicationQuery>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let viewer = caller(&portal, &headers)?;
    let applications = portal.applications().list_applications(&viewer, &query)?;
    Ok(Json(applications).into_response())
}

pub(crate) async fn application_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(application_id): ApiPath<ApplicationId>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let viewer = caller(&portal, &headers)?;
    let application = portal.applications().application(&viewer, &application_id)?;
    Ok(Json(application).into_response())
}

pub(crate) async fn update_status_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(application_id): ApiPath<ApplicationId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let actor = caller(&portal, &headers)?;
    let receipt = portal
        .applications()
        .update_status(&actor, &application_id, update)?;
    Ok(Json(receipt).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoiningDateRequest {
    joining_date: DateTime<Utc>,
}

pub(crate) async fn joining_date_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(application_id): ApiPath<ApplicationId>,
    ApiJson(request): ApiJson<JoiningDateRequest>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let recruiter = caller(&portal, &headers)?;
    let application = portal.applications().set_joining_date(
        &recruiter,
        &application_id,
        request.joining_date,
    )?;
    Ok(Json(application).into_response())
}

pub(crate) async fn rate_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiJson(submission): ApiJson<RatingSubmission>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let sender = caller(&portal, &headers)?;
    let write = portal.rate(&sender, submission)?;
    let status = if write.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(write)).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct RatingLookup {
    category: RatingCategory,
    receiver_id: Uuid,
}

pub(crate) async fn rating_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiQuery(lookup): ApiQuery<RatingLookup>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let sender = caller(&portal, &headers)?;
    let rating = portal
        .ratings()
        .rating_by(&sender, lookup.category, lookup.receiver_id)?;
    Ok(Json(rating).into_response())
}

pub(crate) async fn account_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let identity = caller(&portal, &headers)?;
    let account = portal.auth().account(&identity)?;
    Ok(Json(account).into_response())
}

pub(crate) async fn update_profile_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiJson(draft): ApiJson<ProfileDraft>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let identity = caller(&portal, &headers)?;
    let profile = portal
        .auth()
        .update_profile(&identity, draft, Utc::now())?;
    Ok(Json(profile).into_response())
}

pub(crate) async fn profile_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    caller(&portal, &headers)?;
    let profile = portal.auth().profile(&user_id)?;
    Ok(Json(profile).into_response())
}

pub(crate) async fn attach_document_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    ApiPath(kind): ApiPath<DocumentKind>,
    ApiJson(document): ApiJson<DocumentReference>,
) -> Result<Response, PortalError>
where
    S: EntityStore + 'static,
{
    let identity = caller(&portal, &headers)?;
    let profile = portal
        .auth()
        .attach_document(&identity, kind, &document.reference)?;
    Ok(Json(profile).into_response())
}
