//! Domain records and HTTP DTOs
//!
//! Records are stored as documents and serialized camelCase, the shape the
//! browser client reads.

pub mod artwork;
pub mod notification;
pub mod project;
pub mod requests;
pub mod responses;
pub mod user;

pub use artwork::{Artwork, GalleryQuery, NewArtwork, DEFAULT_GALLERY_LIMIT, MAX_GALLERY_LIMIT};
pub use notification::{Notification, NotificationKind};
pub use project::{
    Application, ApplicationStatus, Decision, NewProject, Project, ProjectStatus,
};
pub use requests::{
    ApplyRequest, CreateArtworkRequest, CreateUserRequest, ImageUpload, MAX_IMAGE_BODY_BYTES,
    MAX_IMAGE_BYTES,
};
pub use responses::{
    ErrorResponse, HealthResponse, StatsResponse, UsernameAvailability,
};
pub use user::{
    NewUser, ProfileSyncData, ProfileUpdate, PublicProfile, UserProfile, UsernameReservation,
};
