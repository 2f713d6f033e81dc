//! Typed documents, collection paths and query filters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{
    Application, Artwork, Notification, Project, ProjectStatus, PublicProfile, UserProfile,
    UsernameReservation,
};

// == Collection ==
/// Collections of the document database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    PublicProfiles,
    Usernames,
    Artworks,
    Projects,
    /// Subcollection `projects/{project_id}/applications`
    Applications { project_id: String },
    Notifications,
}

impl Collection {
    pub fn applications(project_id: impl Into<String>) -> Self {
        Collection::Applications {
            project_id: project_id.into(),
        }
    }

    /// Canonical path, e.g. `projects/p1/applications`.
    pub fn path(&self) -> String {
        match self {
            Collection::Users => "users".to_string(),
            Collection::PublicProfiles => "publicProfiles".to_string(),
            Collection::Usernames => "usernames".to_string(),
            Collection::Artworks => "artworks".to_string(),
            Collection::Projects => "projects".to_string(),
            Collection::Applications { project_id } => {
                format!("projects/{}/applications", project_id)
            }
            Collection::Notifications => "notifications".to_string(),
        }
    }

    pub fn doc(&self, id: impl Into<String>) -> DocRef {
        DocRef {
            collection: self.clone(),
            id: id.into(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

// == Doc Ref ==
/// Address of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: Collection,
    pub id: String,
}

impl DocRef {
    pub fn user(uid: &str) -> Self {
        Collection::Users.doc(uid)
    }

    pub fn public_profile(uid: &str) -> Self {
        Collection::PublicProfiles.doc(uid)
    }

    /// Reservations are keyed by the lowercased username.
    pub fn username(username: &str) -> Self {
        Collection::Usernames.doc(username.to_lowercase())
    }

    pub fn artwork(id: &str) -> Self {
        Collection::Artworks.doc(id)
    }

    pub fn project(id: &str) -> Self {
        Collection::Projects.doc(id)
    }

    /// One application per applicant: the document id is the applicant uid.
    pub fn application(project_id: &str, applicant_uid: &str) -> Self {
        Collection::applications(project_id).doc(applicant_uid)
    }

    pub fn notification(id: &str) -> Self {
        Collection::Notifications.doc(id)
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

// == Versioned ==
/// A stored value with its write version. Versions only ever increase.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

// == Document ==
/// Every record the database holds, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Document {
    User(UserProfile),
    PublicProfile(PublicProfile),
    Username(UsernameReservation),
    Artwork(Artwork),
    Project(Project),
    Application(Application),
    Notification(Notification),
}

impl Document {
    pub fn kind(&self) -> &'static str {
        match self {
            Document::User(_) => "user",
            Document::PublicProfile(_) => "public_profile",
            Document::Username(_) => "username",
            Document::Artwork(_) => "artwork",
            Document::Project(_) => "project",
            Document::Application(_) => "application",
            Document::Notification(_) => "notification",
        }
    }

    /// Whether this record may live in `collection`.
    pub fn belongs_to(&self, collection: &Collection) -> bool {
        match (self, collection) {
            (Document::User(_), Collection::Users)
            | (Document::PublicProfile(_), Collection::PublicProfiles)
            | (Document::Username(_), Collection::Usernames)
            | (Document::Artwork(_), Collection::Artworks)
            | (Document::Project(_), Collection::Projects)
            | (Document::Notification(_), Collection::Notifications) => true,
            (Document::Application(app), Collection::Applications { project_id }) => {
                &app.project_id == project_id
            }
            _ => false,
        }
    }

    pub fn matches(&self, filter: &Filter) -> bool {
        match filter {
            Filter::All => true,
            Filter::OwnerUid(uid) => match self {
                Document::Artwork(a) => &a.owner_uid == uid,
                Document::Project(p) => &p.created_by == uid,
                _ => false,
            },
            Filter::RecipientUid(uid) => {
                matches!(self, Document::Notification(n) if &n.recipient_uid == uid)
            }
            Filter::Category(category) => match self {
                Document::Artwork(a) => a.category.eq_ignore_ascii_case(category),
                Document::Project(p) => p
                    .category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category)),
                _ => false,
            },
            Filter::Tag(tag) => matches!(
                self,
                Document::Artwork(a) if a.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
            ),
            Filter::ProjectStatus(status) => {
                matches!(self, Document::Project(p) if p.status == *status)
            }
        }
    }
}

// == Filter ==
/// Equality filters supported by `DocumentStore::query`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Artwork `ownerUid` or project `createdBy`
    OwnerUid(String),
    RecipientUid(String),
    Category(String),
    Tag(String),
    ProjectStatus(ProjectStatus),
}

// == Typed Access ==
/// Conversion between a record type and its `Document` variant.
pub trait DocumentKind: Sized {
    const KIND: &'static str;

    fn from_document(doc: Document) -> Option<Self>;

    fn into_document(self) -> Document;
}

macro_rules! document_kind {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl DocumentKind for $ty {
            const KIND: &'static str = $kind;

            fn from_document(doc: Document) -> Option<Self> {
                match doc {
                    Document::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_document(self) -> Document {
                Document::$variant(self)
            }
        }

        impl From<$ty> for Document {
            fn from(value: $ty) -> Self {
                Document::$variant(value)
            }
        }
    };
}

document_kind!(UserProfile, User, "user");
document_kind!(PublicProfile, PublicProfile, "public_profile");
document_kind!(UsernameReservation, Username, "username");
document_kind!(Artwork, Artwork, "artwork");
document_kind!(Project, Project, "project");
document_kind!(Application, Application, "application");
document_kind!(Notification, Notification, "notification");
