use chrono::{Duration, Utc};
use clap::Args;
use job_portal::config::AuthConfig;
use job_portal::error::AppError;
use job_portal::portal::accounts::{
    ApplicantDraft, Education, ProfileDraft, RecruiterDraft, Session, SignupRequest,
};
use job_portal::portal::applications::ApplicationSubmission;
use job_portal::portal::jobs::{JobSubmission, JobType};
use job_portal::portal::ratings::{RatingCategory, RatingSubmission};
use job_portal::portal::{Identity, NoopEventSink, Portal};
use std::sync::Arc;

const DEMO_SECRET: &str = "job-portal-demo-secret";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of applicants that sign up and apply
    #[arg(long, default_value_t = 3)]
    pub(crate) applicants: u32,
    /// Open positions on the demo job
    #[arg(long, default_value_t = 1)]
    pub(crate) positions: u32,
    /// Print the final job record as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        applicants,
        positions,
        json,
    } = args;
    let applicants = applicants.max(1);
    let positions = positions.max(1);

    let auth = AuthConfig {
        jwt_secret: DEMO_SECRET.to_string(),
        token_ttl: Duration::hours(1),
    };
    let portal = Portal::in_memory(&auth, Arc::new(NoopEventSink));
    let now = Utc::now();

    println!("Job portal lifecycle demo");
    let recruiter = identity(&portal.auth().signup(
        SignupRequest {
            email: "hiring@acme.example".to_string(),
            password: "recruiter-pass".to_string(),
            profile: ProfileDraft::Recruiter(RecruiterDraft {
                name: "Acme Hiring".to_string(),
                contact_number: Some("+911234567890".to_string()),
                bio: Some("We build rockets.".to_string()),
            }),
        },
        now,
    )?);
    println!("- Recruiter signed up ({})", recruiter.user_id);

    let job = portal.jobs().create_job(
        &recruiter,
        JobSubmission {
            title: "Backend Engineer".to_string(),
            max_applicants: f64::from(applicants),
            max_positions: f64::from(positions),
            posting_date: None,
            deadline: now + Duration::days(14),
            skillsets: vec!["rust".to_string(), "sql".to_string()],
            job_type: JobType::FullTime,
            duration: 6.0,
            salary: 90_000.0,
        },
        now,
    )?;
    println!(
        "- Posted '{}' ({} applicants max, {} positions)",
        job.title, job.max_applicants, job.max_positions
    );

    let mut seekers = Vec::new();
    for index in 0..applicants {
        let seeker = identity(&portal.auth().signup(
            SignupRequest {
                email: format!("applicant{index}@mail.example"),
                password: "applicant-pass".to_string(),
                profile: ProfileDraft::Applicant(ApplicantDraft {
                    name: format!("Applicant {index}"),
                    education: vec![Education {
                        institution_name: "State University".to_string(),
                        start_year: 2018,
                        end_year: Some(2022),
                    }],
                    skills: vec!["rust".to_string()],
                }),
            },
            now,
        )?);
        let application = portal.applications().apply(
            &seeker,
            &job.id,
            ApplicationSubmission {
                statement_of_purpose: "I enjoy building reliable backend systems.".to_string(),
            },
            now,
        )?;
        println!("- Applicant {index} applied -> {}", application.status);
        seekers.push((seeker, application));
    }

    let latecomer = identity(&portal.auth().signup(
        SignupRequest {
            email: "late@mail.example".to_string(),
            password: "applicant-pass".to_string(),
            profile: ProfileDraft::Applicant(ApplicantDraft {
                name: "Late Applicant".to_string(),
                education: Vec::new(),
                skills: Vec::new(),
            }),
        },
        now,
    )?);
    match portal.applications().apply(
        &latecomer,
        &job.id,
        ApplicationSubmission::default(),
        now,
    ) {
        Ok(application) => println!("- Late applicant applied -> {}", application.status),
        Err(err) => println!("- Late applicant turned away: {} ({})", err, err.kind().label()),
    }

    let Some((hired, hired_application)) = seekers.first() else {
        return Ok(());
    };
    portal
        .applications()
        .shortlist(&recruiter, &hired_application.id)?;
    let receipt = portal.applications().accept(
        &recruiter,
        &hired_application.id,
        now + Duration::days(30),
    )?;
    println!(
        "- Accepted applicant 0 -> {} accepted / {} active, {} competing applications cancelled",
        receipt.job.accepted_candidates,
        receipt.job.active_applications,
        receipt.cancelled.len()
    );

    if let Some((_, second)) = seekers.get(1) {
        match portal.applications().reject(&recruiter, &second.id) {
            Ok(receipt) => println!("- Rejected applicant 1 -> {}", receipt.application.status),
            Err(err) => println!("- Applicant 1 left as is: {}", err),
        }
    }

    let retired = portal.jobs().close_job(&recruiter, &job.id)?;
    println!(
        "- Closed job -> {} applications finished",
        retired.cascaded.len()
    );

    let job_rating = portal.rate(
        hired,
        RatingSubmission {
            category: RatingCategory::Job,
            receiver_id: job.id.0,
            value: 4.0,
        },
    )?;
    let applicant_rating = portal.rate(
        &recruiter,
        RatingSubmission {
            category: RatingCategory::Applicant,
            receiver_id: hired.user_id.0,
            value: 5.0,
        },
    )?;
    println!(
        "- Ratings recorded: job {:.1}, applicant {:.1}",
        job_rating.aggregate, applicant_rating.aggregate
    );

    if json {
        let job = portal.jobs().job(&job.id)?;
        match serde_json::to_string_pretty(&job) {
            Ok(body) => println!("Final job record:\n{}", body),
            Err(err) => println!("Final job record unavailable: {}", err),
        }
    }

    Ok(())
}

fn identity(session: &Session) -> Identity {
    Identity::new(session.user_id, session.role)
}
