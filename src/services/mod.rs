//! Domain services
//!
//! Each service owns handles to the storage seams it needs and is shared
//! behind an `Arc` by the HTTP layer.

pub mod artworks;
pub mod notifications;
pub mod profile_sync;
pub mod projects;
pub mod users;

pub use artworks::ArtworkService;
pub use notifications::NotificationService;
pub use profile_sync::{ProfileSyncClient, SYNC_PROFILE_PATH};
pub use projects::ProjectService;
pub use users::{validate_username, DeletionReport, UserService};
