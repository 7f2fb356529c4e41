use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::portal::applications::ApplicationStatus;
use crate::portal::domain::{JobId, UserId};
use crate::portal::ratings::UNRATED;
use crate::portal::validation::{
    non_empty, positive_whole_number, whole_number, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
    Deleted,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
            JobStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[serde(alias = "Full Time")]
    FullTime,
    #[serde(alias = "Part Time")]
    PartTime,
    #[serde(alias = "Work From Home")]
    WorkFromHome,
}

impl JobType {
    pub const fn label(self) -> &'static str {
        match self {
            JobType::FullTime => "Full Time",
            JobType::PartTime => "Part Time",
            JobType::WorkFromHome => "Work From Home",
        }
    }
}

/// A posting owned by a recruiter, together with its capacity counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner_id: UserId,
    pub title: String,
    pub max_applicants: u32,
    pub max_positions: u32,
    pub active_applications: u32,
    pub accepted_candidates: u32,
    pub posting_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub skillsets: Vec<String>,
    pub job_type: JobType,
    /// Months; 0 means indefinite.
    pub duration_months: u32,
    pub salary: u32,
    pub rating: f32,
    pub status: JobStatus,
}

impl Job {
    pub fn accepts_applications_at(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Open && now <= self.deadline
    }

    pub fn open_positions(&self) -> u32 {
        self.max_positions.saturating_sub(self.accepted_candidates)
    }

    pub fn remaining_applications(&self) -> u32 {
        self.max_applicants.saturating_sub(self.active_applications)
    }
}

/// Inbound job posting. Numbers are taken as JSON floats so fractional input is reported as a
/// validation failure instead of a decoding error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub title: String,
    pub max_applicants: f64,
    pub max_positions: f64,
    #[serde(default)]
    pub posting_date: Option<DateTime<Utc>>,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub skillsets: Vec<String>,
    pub job_type: JobType,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub salary: f64,
}

impl JobSubmission {
    pub(crate) fn into_job(
        self,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Job, ValidationError> {
        non_empty("title", &self.title)?;
        let max_applicants = positive_whole_number("max_applicants", self.max_applicants)?;
        let max_positions = positive_whole_number("max_positions", self.max_positions)?;
        let duration_months = whole_number("duration", self.duration)?;
        let salary = whole_number("salary", self.salary)?;

        let posting_date = self.posting_date.unwrap_or(now);
        if self.deadline <= posting_date {
            return Err(ValidationError::new(
                "deadline",
                "must be later than the posting date",
            ));
        }

        let skillsets = self
            .skillsets
            .into_iter()
            .map(|skill| skill.trim().to_string())
            .filter(|skill| !skill.is_empty())
            .collect();

        Ok(Job {
            id: JobId::generate(),
            owner_id,
            title: self.title.trim().to_string(),
            max_applicants,
            max_positions,
            active_applications: 0,
            accepted_candidates: 0,
            posting_date,
            deadline: self.deadline,
            skillsets,
            job_type: self.job_type,
            duration_months,
            salary,
            rating: UNRATED,
            status: JobStatus::Open,
        })
    }
}

/// Recruiter edits to a posted job; absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAmendment {
    #[serde(default)]
    pub max_applicants: Option<f64>,
    #[serde(default)]
    pub max_positions: Option<f64>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl JobAmendment {
    pub(crate) fn validate(self, job: &Job) -> Result<JobChanges, ValidationError> {
        let max_applicants = self
            .max_applicants
            .map(|value| positive_whole_number("max_applicants", value))
            .transpose()?;
        let max_positions = self
            .max_positions
            .map(|value| positive_whole_number("max_positions", value))
            .transpose()?;

        if let Some(deadline) = self.deadline {
            if deadline <= job.posting_date {
                return Err(ValidationError::new(
                    "deadline",
                    "must be later than the posting date",
                ));
            }
        }

        Ok(JobChanges {
            max_applicants,
            max_positions,
            deadline: self.deadline,
        })
    }
}

/// Validated amendment, checked against live counters by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobChanges {
    pub max_applicants: Option<u32>,
    pub max_positions: Option<u32>,
    pub deadline: Option<DateTime<Utc>>,
}

impl JobChanges {
    pub fn is_empty(&self) -> bool {
        self.max_applicants.is_none() && self.max_positions.is_none() && self.deadline.is_none()
    }
}

/// Ways a job leaves the open state, each with the status its live applications take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retirement {
    Close,
    Delete,
}

impl Retirement {
    pub const fn job_status(self) -> JobStatus {
        match self {
            Retirement::Close => JobStatus::Closed,
            Retirement::Delete => JobStatus::Deleted,
        }
    }

    pub const fn cascade_status(self) -> ApplicationStatus {
        match self {
            Retirement::Close => ApplicationStatus::Finished,
            Retirement::Delete => ApplicationStatus::Deleted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSort {
    Salary,
    Duration,
    Rating,
    Deadline,
}

/// Listing filters; deleted jobs never match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobQuery {
    /// Case-insensitive title substring.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub salary_min: Option<u32>,
    #[serde(default)]
    pub salary_max: Option<u32>,
    /// Only jobs strictly shorter than this many months.
    #[serde(default)]
    pub duration_below: Option<u32>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    /// Restrict to the caller's own postings.
    #[serde(default)]
    pub mine: bool,
    #[serde(default)]
    pub include_closed: bool,
    #[serde(default)]
    pub sort: Option<JobSort>,
    #[serde(default)]
    pub descending: bool,
}

impl JobQuery {
    pub fn matches(&self, job: &Job) -> bool {
        match job.status {
            JobStatus::Deleted => return false,
            JobStatus::Closed if !self.include_closed => return false,
            _ => {}
        }

        if let Some(needle) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            if !job
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }

        self.job_type.map_or(true, |kind| job.job_type == kind)
            && self.salary_min.map_or(true, |min| job.salary >= min)
            && self.salary_max.map_or(true, |max| job.salary <= max)
            && self
                .duration_below
                .map_or(true, |limit| job.duration_months < limit)
            && self.owner_id.map_or(true, |owner| job.owner_id == owner)
    }

    pub fn sort(&self, jobs: &mut [Job]) {
        let Some(key) = self.sort else {
            jobs.sort_by(|a, b| b.posting_date.cmp(&a.posting_date));
            return;
        };

        jobs.sort_by(|a, b| {
            let ordering = match key {
                JobSort::Salary => a.salary.cmp(&b.salary),
                JobSort::Duration => a.duration_months.cmp(&b.duration_months),
                JobSort::Rating => a.rating.total_cmp(&b.rating),
                JobSort::Deadline => a.deadline.cmp(&b.deadline),
            };
            let ordering = if self.descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });
    }
}
