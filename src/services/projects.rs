//! Project postings and the application workflow.
//!
//! Every operation that touches an application runs in one transaction
//! together with the project counter and the notification it produces, so
//! the counter and the application documents never drift apart.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::cache::CacheService;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    Application, ApplicationStatus, Decision, NewProject, Notification, NotificationKind,
    Project, ProjectStatus,
};
use crate::store::{
    fetch_as, query_as, run_transaction, Collection, DocRef, DocumentStore, Filter, Transaction,
};

const PROJECTS_PREFIX: &str = "projects:";
const OPEN_PROJECTS_KEY: &str = "projects:open";

fn project_not_found() -> AppError {
    AppError::NotFound("Project not found".to_string())
}

fn application_not_found() -> AppError {
    AppError::NotFound("Application not found".to_string())
}

fn not_project_owner() -> AppError {
    AppError::Forbidden("You can only manage applications for your own projects".to_string())
}

/// Loads a project inside `tx`, failing with `NotFound` if it is missing.
async fn load_project(tx: &mut Transaction, doc: &DocRef) -> Result<Project> {
    tx.get_as::<Project>(doc).await?.ok_or_else(project_not_found)
}

async fn load_application(tx: &mut Transaction, doc: &DocRef) -> Result<Application> {
    tx.get_as::<Application>(doc)
        .await?
        .ok_or_else(application_not_found)
}

// == Project Service ==
pub struct ProjectService {
    store: Arc<dyn DocumentStore>,
    cache: Arc<CacheService>,
    listing_ttl_ms: u64,
}

impl ProjectService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<CacheService>, config: &Config) -> Self {
        Self {
            store,
            cache,
            listing_ttl_ms: config.listing_ttl_ms,
        }
    }

    // == Projects ==
    pub async fn create_project(&self, owner_uid: &str, input: NewProject) -> Result<Project> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }

        let project = Project {
            id: Uuid::new_v4().to_string(),
            created_by: owner_uid.to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            category: input.category,
            application_deadline: input.application_deadline,
            status: ProjectStatus::Open,
            applicants_count: 0,
            created_at: Utc::now(),
        };
        let doc = DocRef::project(&project.id);
        let (doc, project) = (&doc, &project);

        run_transaction(&self.store, move |mut tx| async move {
            if tx.get(doc).await?.is_some() {
                return Err(AppError::Conflict(format!("{} already exists", doc)));
            }
            tx.set(doc.clone(), project.clone());
            Ok((tx, ()))
        })
        .await?;

        self.invalidate_listings().await;
        info!(id = %project.id, owner = owner_uid, "project created");
        Ok(project.clone())
    }

    pub async fn get_project(&self, id: &str) -> Result<Project> {
        fetch_as::<Project>(self.store.as_ref(), &DocRef::project(id))
            .await?
            .ok_or_else(project_not_found)
    }

    /// Open projects, soonest deadline first. Cached for the listing TTL.
    pub async fn list_open_projects(&self) -> Result<Vec<Project>> {
        if let Some(hit) = self.cache.get::<Vec<Project>>(OPEN_PROJECTS_KEY).await {
            return Ok(hit);
        }

        let mut projects = query_as::<Project>(
            self.store.as_ref(),
            &Collection::Projects,
            &Filter::ProjectStatus(ProjectStatus::Open),
        )
        .await?;
        projects.sort_by(|a, b| {
            a.application_deadline
                .cmp(&b.application_deadline)
                .then_with(|| a.id.cmp(&b.id))
        });

        self.cache
            .set(OPEN_PROJECTS_KEY, &projects, Some(self.listing_ttl_ms))
            .await;
        Ok(projects)
    }

    /// Stops a project from taking applications. Only the owner may close it.
    pub async fn close_project(&self, owner_uid: &str, id: &str) -> Result<Project> {
        let doc = DocRef::project(id);
        let doc = &doc;

        let project = run_transaction(&self.store, move |mut tx| async move {
            let mut project = load_project(&mut tx, doc).await?;
            if project.created_by != owner_uid {
                return Err(AppError::Forbidden(
                    "You can only close your own projects".to_string(),
                ));
            }
            if project.status != ProjectStatus::Closed {
                project.status = ProjectStatus::Closed;
                tx.set(doc.clone(), project.clone());
            }
            Ok((tx, project))
        })
        .await?;

        self.invalidate_listings().await;
        info!(id, "project closed");
        Ok(project)
    }

    /// Applications to a project, visible to its owner only.
    pub async fn list_applications(
        &self,
        owner_uid: &str,
        project_id: &str,
    ) -> Result<Vec<Application>> {
        let project = self.get_project(project_id).await?;
        if project.created_by != owner_uid {
            return Err(not_project_owner());
        }

        let mut applications = query_as::<Application>(
            self.store.as_ref(),
            &Collection::applications(project_id),
            &Filter::All,
        )
        .await?;
        applications.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(applications)
    }

    // == Apply ==
    /// Files an application and bumps the project's applicant counter.
    ///
    /// Rejected when the applicant owns the project, the project is closed,
    /// the deadline has passed or the applicant already has an application.
    pub async fn apply_to_project(
        &self,
        project_id: &str,
        applicant_uid: &str,
        message: Option<String>,
    ) -> Result<Application> {
        self.apply_at(project_id, applicant_uid, message, Utc::now())
            .await
    }

    async fn apply_at(
        &self,
        project_id: &str,
        applicant_uid: &str,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Application> {
        let project_doc = DocRef::project(project_id);
        let application_doc = DocRef::application(project_id, applicant_uid);
        let (project_doc, application_doc, message) = (&project_doc, &application_doc, &message);

        let application = run_transaction(&self.store, move |mut tx| async move {
            let mut project = load_project(&mut tx, project_doc).await?;

            if project.created_by == applicant_uid {
                return Err(AppError::Forbidden(
                    "You cannot apply to your own project".to_string(),
                ));
            }
            if project.status != ProjectStatus::Open {
                return Err(AppError::Rejected(
                    "Project is not accepting applications".to_string(),
                ));
            }
            if project.deadline_passed(now) {
                return Err(AppError::Rejected(
                    "Application deadline has passed".to_string(),
                ));
            }
            if tx.get(application_doc).await?.is_some() {
                return Err(AppError::Rejected(
                    "You have already applied to this project".to_string(),
                ));
            }

            let application = Application {
                applicant_uid: applicant_uid.to_string(),
                project_id: project_id.to_string(),
                message: message.clone().filter(|m| !m.trim().is_empty()),
                status: ApplicationStatus::Applied,
                created_at: now,
                updated_at: now,
            };
            project.applicants_count = project.applicants_count.saturating_add(1);

            let notification = Notification::new(
                project.created_by.clone(),
                NotificationKind::NewApplication,
                project.id.clone(),
                format!("New application to \"{}\"", project.title),
                now,
            );

            tx.set(application_doc.clone(), application.clone());
            tx.set(project_doc.clone(), project);
            tx.set(DocRef::notification(&notification.id), notification);
            Ok((tx, application))
        })
        .await?;

        self.invalidate_listings().await;
        info!(project_id, applicant = applicant_uid, "application filed");
        Ok(application)
    }

    // == Decide ==
    pub async fn accept_application(
        &self,
        owner_uid: &str,
        project_id: &str,
        applicant_uid: &str,
    ) -> Result<Application> {
        self.decide(owner_uid, project_id, applicant_uid, Decision::Accept)
            .await
    }

    pub async fn reject_application(
        &self,
        owner_uid: &str,
        project_id: &str,
        applicant_uid: &str,
    ) -> Result<Application> {
        self.decide(owner_uid, project_id, applicant_uid, Decision::Reject)
            .await
    }

    /// Settles an `applied` application and notifies the applicant.
    ///
    /// The applicant counter is left alone: it counts applications filed.
    pub async fn decide(
        &self,
        owner_uid: &str,
        project_id: &str,
        applicant_uid: &str,
        decision: Decision,
    ) -> Result<Application> {
        let project_doc = DocRef::project(project_id);
        let application_doc = DocRef::application(project_id, applicant_uid);
        let (project_doc, application_doc) = (&project_doc, &application_doc);

        let application = run_transaction(&self.store, move |mut tx| async move {
            let project = load_project(&mut tx, project_doc).await?;
            if project.created_by != owner_uid {
                return Err(not_project_owner());
            }

            let mut application = load_application(&mut tx, application_doc).await?;
            let now = Utc::now();
            application.status = application.status.transition(decision.target_status())?;
            application.updated_at = now;

            let (kind, verb) = match decision {
                Decision::Accept => (NotificationKind::ApplicationAccepted, "accepted"),
                Decision::Reject => (NotificationKind::ApplicationRejected, "declined"),
            };
            let notification = Notification::new(
                applicant_uid,
                kind,
                project.id.clone(),
                format!("Your application to \"{}\" was {}", project.title, verb),
                now,
            );

            tx.set(application_doc.clone(), application.clone());
            tx.set(DocRef::notification(&notification.id), notification);
            Ok((tx, application))
        })
        .await?;

        info!(
            project_id,
            applicant = applicant_uid,
            status = application.status.as_str(),
            "application decided"
        );
        Ok(application)
    }

    // == Withdraw ==
    /// Withdraws the applicant's own `applied` application and gives back
    /// its slot in the counter.
    pub async fn withdraw_application(
        &self,
        project_id: &str,
        applicant_uid: &str,
    ) -> Result<Application> {
        let project_doc = DocRef::project(project_id);
        let application_doc = DocRef::application(project_id, applicant_uid);
        let (project_doc, application_doc) = (&project_doc, &application_doc);

        let application = run_transaction(&self.store, move |mut tx| async move {
            let mut project = load_project(&mut tx, project_doc).await?;
            let mut application = load_application(&mut tx, application_doc).await?;

            // Only an applied application moves here, so the counter drops once
            application.status = application
                .status
                .transition(ApplicationStatus::Withdrawn)?;
            application.updated_at = Utc::now();
            project.applicants_count = project.applicants_count.saturating_sub(1);

            tx.set(application_doc.clone(), application.clone());
            tx.set(project_doc.clone(), project);
            Ok((tx, application))
        })
        .await?;

        self.invalidate_listings().await;
        info!(project_id, applicant = applicant_uid, "application withdrawn");
        Ok(application)
    }

    async fn invalidate_listings(&self) {
        self.cache.invalidate_prefix(PROJECTS_PREFIX).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::store::MemoryDocumentStore;
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryDocumentStore>,
        projects: ProjectService,
    }

    fn fixture() -> Fixture {
        let config = Config::default();
        let cache = Arc::new(CacheService::with_clock(
            config.max_entries,
            config.default_ttl_ms,
            Arc::new(ManualClock::new(0)),
        ));
        let store = Arc::new(MemoryDocumentStore::new());
        let projects = ProjectService::new(store.clone(), cache, &config);
        Fixture { store, projects }
    }

    fn new_project(deadline: DateTime<Utc>) -> NewProject {
        NewProject {
            title: "Mural".into(),
            description: "Paint a wall".into(),
            category: Some("painting".into()),
            application_deadline: deadline,
        }
    }

    async fn open_project(f: &Fixture) -> Project {
        f.projects
            .create_project("owner", new_project(Utc::now() + Duration::days(7)))
            .await
            .unwrap()
    }

    async fn notifications_for(f: &Fixture, uid: &str) -> Vec<Notification> {
        query_as::<Notification>(
            f.store.as_ref(),
            &Collection::Notifications,
            &Filter::RecipientUid(uid.to_string()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_increments_counter_once() {
        let f = fixture();
        let project = open_project(&f).await;

        let application = f
            .projects
            .apply_to_project(&project.id, "artist", Some("Pick me".into()))
            .await
            .unwrap();

        assert_eq!(application.status, ApplicationStatus::Applied);
        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 1);
        assert_eq!(f.store.count(&Collection::applications(&project.id)).await, 1);

        let notes = notifications_for(&f, "owner").await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::NewApplication);
    }

    #[tokio::test]
    async fn test_duplicate_application_rejected() {
        let f = fixture();
        let project = open_project(&f).await;
        f.projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap();

        let err = f
            .projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You have already applied to this project");
        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 1);
    }

    #[tokio::test]
    async fn test_self_application_forbidden() {
        let f = fixture();
        let project = open_project(&f).await;

        let err = f
            .projects
            .apply_to_project(&project.id, "owner", None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Forbidden(ref m) if m == "You cannot apply to your own project")
        );
        assert_eq!(f.store.count(&Collection::applications(&project.id)).await, 0);
    }

    #[tokio::test]
    async fn test_deadline_yesterday_rejected() {
        let f = fixture();
        let project = f
            .projects
            .create_project("owner", new_project(Utc::now() - Duration::days(1)))
            .await
            .unwrap();

        let err = f
            .projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Rejected(ref m) if m == "Application deadline has passed"));
        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 0);
        assert!(notifications_for(&f, "owner").await.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_is_inclusive() {
        let f = fixture();
        let deadline = Utc::now() + Duration::hours(1);
        let project = f
            .projects
            .create_project("owner", new_project(deadline))
            .await
            .unwrap();

        assert!(f
            .projects
            .apply_at(&project.id, "a1", None, deadline)
            .await
            .is_ok());
        let late = f
            .projects
            .apply_at(&project.id, "a2", None, deadline + Duration::milliseconds(1))
            .await;
        assert!(matches!(late, Err(AppError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_missing_and_closed_projects() {
        let f = fixture();
        let err = f
            .projects
            .apply_to_project("nope", "artist", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Project not found"));

        let project = open_project(&f).await;
        assert!(matches!(
            f.projects.close_project("artist", &project.id).await,
            Err(AppError::Forbidden(_))
        ));
        f.projects.close_project("owner", &project.id).await.unwrap();

        let err = f
            .projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Project is not accepting applications");
    }

    #[tokio::test]
    async fn test_accept_notifies_applicant_without_touching_counter() {
        let f = fixture();
        let project = open_project(&f).await;
        f.projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap();

        let accepted = f
            .projects
            .accept_application("owner", &project.id, "artist")
            .await
            .unwrap();

        assert_eq!(accepted.status, ApplicationStatus::Accepted);
        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 1);
        let notes = notifications_for(&f, "artist").await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::ApplicationAccepted);
    }

    #[tokio::test]
    async fn test_only_owner_decides() {
        let f = fixture();
        let project = open_project(&f).await;
        f.projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap();

        let err = f
            .projects
            .reject_application("stranger", &project.id, "artist")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You can only manage applications for your own projects"
        );
        assert!(matches!(
            f.projects.list_applications("stranger", &project.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(
            f.projects
                .list_applications("owner", &project.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_terminal_states_never_double_count() {
        let f = fixture();
        let project = open_project(&f).await;
        f.projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap();

        f.projects
            .withdraw_application(&project.id, "artist")
            .await
            .unwrap();
        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 0);

        let again = f.projects.withdraw_application(&project.id, "artist").await;
        assert!(matches!(again, Err(AppError::Rejected(_))));
        let accept = f
            .projects
            .accept_application("owner", &project.id, "artist")
            .await;
        assert!(matches!(
            accept,
            Err(AppError::Rejected(ref m)) if m == "Application has already been withdrawn"
        ));
        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 0);
    }

    #[tokio::test]
    async fn test_rejected_application_cannot_be_withdrawn() {
        let f = fixture();
        let project = open_project(&f).await;
        f.projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap();
        f.projects
            .reject_application("owner", &project.id, "artist")
            .await
            .unwrap();

        let result = f.projects.withdraw_application(&project.id, "artist").await;
        assert!(matches!(result, Err(AppError::Rejected(_))));
        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 1);
    }

    #[tokio::test]
    async fn test_apply_retries_through_conflicts() {
        let f = fixture();
        let project = open_project(&f).await;
        f.store.inject_conflicts(2);

        f.projects
            .apply_to_project(&project.id, "artist", None)
            .await
            .unwrap();

        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 1);
        assert_eq!(notifications_for(&f, "owner").await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_applicants_all_counted() {
        let f = Arc::new(fixture());
        let project = open_project(&f).await;

        let mut handles = Vec::new();
        for i in 0..4 {
            let f = Arc::clone(&f);
            let id = project.id.clone();
            handles.push(tokio::spawn(async move {
                f.projects
                    .apply_to_project(&id, &format!("artist{}", i), None)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(f.projects.get_project(&project.id).await.unwrap().applicants_count, 4);
    }

    #[tokio::test]
    async fn test_open_listing_refreshes_after_writes() {
        let f = fixture();
        assert!(f.projects.list_open_projects().await.unwrap().is_empty());

        let project = open_project(&f).await;
        let open = f.projects.list_open_projects().await.unwrap();
        assert_eq!(open.len(), 1);

        f.projects.close_project("owner", &project.id).await.unwrap();
        assert!(f.projects.list_open_projects().await.unwrap().is_empty());
    }
}
