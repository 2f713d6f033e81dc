//! Project postings and the application state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Whether a project still takes applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Open,
    Closed,
}

/// Project document stored under `projects/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub created_by: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub application_deadline: DateTime<Utc>,
    pub status: ProjectStatus,
    pub applicants_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now > self.application_deadline
    }
}

/// Input for a new project posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub application_deadline: DateTime<Utc>,
}

// == Application Status ==
/// Lifecycle of an application.
///
/// ```text
/// applied -> accepted
/// applied -> rejected
/// applied -> withdrawn
/// ```
///
/// `accepted`, `rejected` and `withdrawn` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Applied)
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (
                ApplicationStatus::Applied,
                ApplicationStatus::Accepted
                    | ApplicationStatus::Rejected
                    | ApplicationStatus::Withdrawn
            )
        )
    }

    /// Moves to `next`, or fails with a `Rejected` error naming the current state.
    pub fn transition(self, next: ApplicationStatus) -> Result<ApplicationStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::Rejected(format!(
                "Application has already been {}",
                self.as_str()
            )))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

/// Application document stored under `projects/{projectId}/applications/{applicantUid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub applicant_uid: String,
    pub project_id: String,
    #[serde(default)]
    pub message: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner's verdict on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn target_status(self) -> ApplicationStatus {
        match self {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}
