use chrono::Duration;
use uuid::Uuid;

use super::common::*;
use crate::portal::accounts::{Profile, User};
use crate::portal::applications::{Application, ApplicationStatus};
use crate::portal::domain::{ApplicationId, RatingId, Role, UserId};
use crate::portal::jobs::{JobChanges, JobStatus, Retirement};
use crate::portal::ratings::{Rating, RatingCategory};
use crate::portal::store::{
    EntityStore, InMemoryEntityStore, JobCounter, StatusTransition, StoreError, UniqueKey,
};

fn pending_application(harness: &Harness, job: &crate::portal::jobs::Job) -> Application {
    Application {
        id: ApplicationId::generate(),
        applicant_id: applicant(harness).user_id,
        recruiter_id: job.owner_id,
        job_id: job.id,
        status: ApplicationStatus::Applied,
        application_date: now(),
        joining_date: None,
        statement_of_purpose: String::new(),
    }
}

#[test]
fn emails_are_unique_after_normalizing() {
    let store = InMemoryEntityStore::new();
    let user = |email: &str| User {
        id: UserId::generate(),
        email: email.to_string(),
        password_hash: "hash".to_string(),
        role: Role::Applicant,
    };

    let stored = store.insert_user(user(" Ada@Example.com")).expect("insert");
    assert_eq!(stored.email, "ada@example.com");
    assert!(matches!(
        store.insert_user(user("ADA@example.com")),
        Err(StoreError::Conflict(UniqueKey::UserEmail))
    ));

    store.remove_user(&stored.id).expect("remove");
    store
        .insert_user(user("ada@example.com"))
        .expect("email is free again");
}

#[test]
fn application_insert_is_conditional_on_the_applicant_limit() {
    let harness = harness();
    let owner = recruiter(&harness);
    let job = post_job(&harness, &owner, 1, 1);

    harness
        .store
        .insert_application(pending_application(&harness, &job))
        .expect("first insert");
    let err = harness
        .store
        .insert_application(pending_application(&harness, &job))
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::LimitReached {
            counter: JobCounter::ActiveApplications,
            ..
        }
    ));
    assert_eq!(stored_job(&harness, &job.id).active_applications, 1);
}

#[test]
fn status_writes_are_compare_and_swap() {
    let harness = harness();
    let owner = recruiter(&harness);
    let job = post_job(&harness, &owner, 3, 1);
    let application = apply(&harness, &applicant(&harness), &job);
    let plan = ApplicationStatus::Applied
        .plan(ApplicationStatus::Rejected)
        .expect("applied can be rejected");
    let transition = StatusTransition {
        application_id: application.id,
        expected: ApplicationStatus::Applied,
        plan,
        joining_date: None,
    };

    harness
        .store
        .transition_application(&transition)
        .expect("first write wins");
    let err = harness
        .store
        .transition_application(&transition)
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::StatusMismatch {
            found: ApplicationStatus::Rejected,
            ..
        }
    ));
    assert_eq!(stored_job(&harness, &job.id).active_applications, 0);
}

#[test]
fn accepting_releases_competing_rows_for_the_same_pair() {
    let harness = harness();
    let owner = recruiter(&harness);
    let job = post_job(&harness, &owner, 3, 2);
    let candidate = applicant(&harness);
    let application = apply(&harness, &candidate, &job);
    let competitor = Application {
        id: ApplicationId::generate(),
        status: ApplicationStatus::Accepted,
        ..application.clone()
    };
    harness.store.seed_application(competitor.clone());
    let seeded = stored_job(&harness, &job.id);
    assert_eq!((seeded.active_applications, seeded.accepted_candidates), (2, 1));

    let receipt = harness
        .store
        .transition_application(&StatusTransition {
            application_id: application.id,
            expected: ApplicationStatus::Applied,
            plan: ApplicationStatus::Applied
                .plan(ApplicationStatus::Accepted)
                .expect("applied can be accepted"),
            joining_date: Some(now() + Duration::days(30)),
        })
        .expect("accept");

    assert_eq!(receipt.cancelled, vec![competitor.id]);
    assert_eq!(receipt.job.active_applications, 1);
    assert_eq!(receipt.job.accepted_candidates, 1);
    assert_eq!(
        stored_application(&harness, &competitor.id).status,
        ApplicationStatus::Cancelled
    );
}

#[test]
fn retire_is_idempotent_and_delete_overrides_close() {
    let harness = harness();
    let owner = recruiter(&harness);
    let job = post_job(&harness, &owner, 3, 1);
    let application = apply(&harness, &applicant(&harness), &job);

    let closed = harness
        .store
        .retire_job(&job.id, Retirement::Close)
        .expect("close");
    assert_eq!(closed.cascaded, vec![application.id]);
    let closed_again = harness
        .store
        .retire_job(&job.id, Retirement::Close)
        .expect("close again");
    assert!(closed_again.cascaded.is_empty());

    let deleted = harness
        .store
        .retire_job(&job.id, Retirement::Delete)
        .expect("delete closed job");
    assert_eq!(deleted.job.status, JobStatus::Deleted);
    assert!(deleted.cascaded.is_empty());
    assert_eq!(
        stored_application(&harness, &application.id).status,
        ApplicationStatus::Finished
    );

    assert!(matches!(
        harness.store.retire_job(&job.id, Retirement::Close),
        Err(StoreError::JobNotOpen(_))
    ));
}

#[test]
fn amendments_apply_only_to_open_jobs() {
    let harness = harness();
    let owner = recruiter(&harness);
    let job = post_job(&harness, &owner, 3, 1);
    let changes = JobChanges {
        deadline: Some(now() + Duration::days(10)),
        ..JobChanges::default()
    };

    harness.store.amend_job(&job.id, &changes).expect("amend");
    harness
        .store
        .retire_job(&job.id, Retirement::Close)
        .expect("close");
    assert!(matches!(
        harness.store.amend_job(&job.id, &changes),
        Err(StoreError::JobNotOpen(_))
    ));
}

#[test]
fn rating_upsert_keeps_one_row_per_triple() {
    let harness = harness();
    let owner = recruiter(&harness);
    let candidate = applicant(&harness);
    let job = post_job(&harness, &owner, 3, 1);
    let rating = |value| Rating {
        id: RatingId::generate(),
        category: RatingCategory::Job,
        receiver_id: job.id.0,
        sender_id: candidate.user_id,
        value,
    };

    let first = harness.store.upsert_rating(rating(1.0)).expect("insert");
    let second = harness.store.upsert_rating(rating(5.0)).expect("update");

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.rating.id, first.rating.id);
    assert_eq!(stored_job(&harness, &job.id).rating, 5.0);
}

#[test]
fn profile_replacement_preserves_the_aggregate_rating() {
    let harness = harness();
    let owner = recruiter(&harness);
    let candidate = applicant(&harness);
    harness
        .store
        .upsert_rating(Rating {
            id: RatingId::generate(),
            category: RatingCategory::Applicant,
            receiver_id: candidate.user_id.0,
            sender_id: owner.user_id,
            value: 2.0,
        })
        .expect("rate");

    let Some(Profile::Applicant(mut profile)) =
        harness.store.profile(&candidate.user_id).expect("profile")
    else {
        panic!("expected applicant profile");
    };
    profile.rating = 0.0;
    profile.name = "Renamed".to_string();
    let replaced = harness
        .store
        .replace_profile(Profile::Applicant(profile))
        .expect("replace");

    match replaced {
        Profile::Applicant(profile) => {
            assert_eq!(profile.rating, 2.0);
            assert_eq!(profile.name, "Renamed");
        }
        other => panic!("expected applicant profile, got {other:?}"),
    }
}

#[test]
fn revocations_are_pruned_against_the_supplied_clock() {
    let store = InMemoryEntityStore::new();
    let stale = Uuid::new_v4();
    let live = Uuid::new_v4();
    let fresh = Uuid::new_v4();

    store
        .revoke_session(stale, now() + Duration::minutes(5), now())
        .expect("revoke stale");
    store
        .revoke_session(live, now() + Duration::hours(1), now())
        .expect("revoke live");
    store
        .revoke_session(fresh, now() + Duration::hours(2), now() + Duration::minutes(10))
        .expect("revoke fresh");

    assert!(!store.is_session_revoked(stale).expect("lookup"));
    assert!(store.is_session_revoked(live).expect("lookup"));
    assert!(store.is_session_revoked(fresh).expect("lookup"));
}

#[test]
fn poisoned_lock_reports_unavailable() {
    let store = std::sync::Arc::new(InMemoryEntityStore::new());
    let poisoner = std::sync::Arc::clone(&store);
    let _ = std::thread::spawn(move || poisoner.poison()).join();

    assert!(matches!(store.jobs(), Err(StoreError::Unavailable(_))));
}
