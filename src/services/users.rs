//! User accounts: username reservation, profile edits, the public mirror
//! and account deletion.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, Result, StoreError};
use crate::models::{
    Artwork, NewUser, ProfileSyncData, ProfileUpdate, PublicProfile, UserProfile,
    UsernameReservation,
};
use crate::store::{
    fetch_as, paths, query_as, run_transaction, Collection, DocRef, DocumentStore, Filter,
    ObjectStorage,
};

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_.]{3,30}$").expect("Invalid username regex"))
}

/// Normalizes `name` and checks it is a legal username.
///
/// Usernames are 3 to 30 characters of `a-z`, `0-9`, `_` and `.`, and may
/// not start or end with a dot. Input is trimmed and lowercased first.
pub fn validate_username(name: &str) -> Result<String> {
    let normalized = name.trim().to_lowercase();

    if !username_pattern().is_match(&normalized) {
        return Err(AppError::Validation(
            "Username must be 3-30 characters: lowercase letters, digits, '_' or '.'".to_string(),
        ));
    }
    if normalized.starts_with('.') || normalized.ends_with('.') {
        return Err(AppError::Validation(
            "Username cannot start or end with '.'".to_string(),
        ));
    }
    Ok(normalized)
}

/// Outcome of a cascading account delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub uid: String,
    pub artworks_deleted: usize,
    pub objects_deleted: usize,
    /// Object deletes that failed and were skipped
    pub storage_failures: usize,
}

// == User Service ==
pub struct UserService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStorage>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStorage>) -> Self {
        Self { store, objects }
    }

    pub async fn is_username_available(&self, name: &str) -> Result<bool> {
        let username = validate_username(name)?;
        let reserved =
            fetch_as::<UsernameReservation>(self.store.as_ref(), &DocRef::username(&username))
                .await?;
        Ok(reserved.is_none())
    }

    // == Create ==
    /// Creates the account: private profile, username reservation and public mirror.
    ///
    /// The reservation is checked and written in one transaction, so two
    /// accounts can never hold the same name.
    pub async fn create_user(&self, input: NewUser) -> Result<UserProfile> {
        let username = validate_username(&input.username)?;
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }

        let user = UserProfile::new(
            NewUser {
                username: username.clone(),
                ..input
            },
            Utc::now(),
        );
        let user_doc = DocRef::user(&user.uid);
        let username_doc = DocRef::username(&username);
        let (user, user_doc, username_doc) = (&user, &user_doc, &username_doc);

        run_transaction(&self.store, move |mut tx| async move {
            if tx.get_as::<UserProfile>(user_doc).await?.is_some() {
                return Err(AppError::Rejected("Profile already exists".to_string()));
            }
            if tx
                .get_as::<UsernameReservation>(username_doc)
                .await?
                .is_some()
            {
                return Err(AppError::Rejected("Username is already taken".to_string()));
            }

            tx.set(user_doc.clone(), user.clone());
            tx.set(
                username_doc.clone(),
                UsernameReservation {
                    username: user.username.clone(),
                    uid: user.uid.clone(),
                    created_at: user.created_at,
                },
            );
            tx.set(DocRef::public_profile(&user.uid), user.public_profile());
            Ok((tx, ()))
        })
        .await?;

        info!(uid = %user.uid, username = %user.username, "user created");
        Ok(user.clone())
    }

    pub async fn get_user(&self, uid: &str) -> Result<UserProfile> {
        fetch_as::<UserProfile>(self.store.as_ref(), &DocRef::user(uid))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_public_profile(&self, uid: &str) -> Result<PublicProfile> {
        fetch_as::<PublicProfile>(self.store.as_ref(), &DocRef::public_profile(uid))
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    // == Update ==
    /// Applies `update` to the private profile and returns the result.
    ///
    /// The public mirror is refreshed separately through profile sync.
    pub async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<UserProfile> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        let doc = DocRef::user(uid);
        let (doc, update) = (&doc, &update);

        run_transaction(&self.store, move |mut tx| async move {
            let mut user = tx
                .get_as::<UserProfile>(doc)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
            user.apply(update.clone(), Utc::now());
            tx.set(doc.clone(), user.clone());
            Ok((tx, user))
        })
        .await
    }

    /// Stores a new profile photo and points the profile at it.
    ///
    /// The previous photo is removed afterwards; failing to remove it only
    /// leaves an orphaned object behind.
    pub async fn upload_profile_photo(
        &self,
        uid: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UserProfile> {
        // Fail before uploading anything for unknown users
        self.get_user(uid).await?;

        let path = paths::profile_photo_path(uid, file_name);
        let stored = self.objects.upload(&path, bytes, content_type).await?;
        let doc = DocRef::user(uid);
        let (doc, stored) = (&doc, &stored);

        let (user, previous) = run_transaction(&self.store, move |mut tx| async move {
            let mut user = tx
                .get_as::<UserProfile>(doc)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
            let previous = user.profile_photo_path.replace(stored.path.clone());
            user.profile_photo_url = Some(stored.url.clone());
            user.updated_at = Utc::now();
            tx.set(doc.clone(), user.clone());
            Ok((tx, (user, previous)))
        })
        .await?;

        if let Some(old) = previous.filter(|old| old != &stored.path) {
            if let Err(e) = self.objects.delete(&old).await {
                warn!(uid, path = %old, error = %e, "failed to delete previous profile photo");
            }
        }
        Ok(user)
    }

    // == Public Mirror ==
    /// Upserts `publicProfiles/{uid}` from `data`.
    ///
    /// The mirrored username always comes from the account's own record; a
    /// username in `data` is ignored, and an uid without an account mirrors none.
    pub async fn sync_public_profile(&self, data: ProfileSyncData) -> Result<PublicProfile> {
        if !data.is_syncable() {
            return Err(AppError::Validation(
                "Missing required fields: uid and name".to_string(),
            ));
        }

        let user_doc = DocRef::user(&data.uid);
        let mirror_doc = DocRef::public_profile(&data.uid);
        let (user_doc, mirror_doc, data) = (&user_doc, &mirror_doc, &data);

        let profile = run_transaction(&self.store, move |mut tx| async move {
            let owner = tx.get_as::<UserProfile>(user_doc).await?;
            let mut profile = data.clone().into_public_profile(Utc::now());
            profile.username = owner.map(|u| u.username);
            tx.set(mirror_doc.clone(), profile.clone());
            Ok((tx, profile))
        })
        .await?;

        info!(uid = %profile.uid, "public profile synced");
        Ok(profile)
    }

    // == Cascading Delete ==
    /// Removes the account and everything it owns.
    ///
    /// Stored objects (profile photo, artwork images) are deleted first on a
    /// best-effort basis; failures are logged and counted. The documents are
    /// then removed in one transaction: artworks, public profile, the user
    /// record and the username reservation if this account holds it.
    pub async fn delete_user_cascade(&self, uid: &str) -> Result<DeletionReport> {
        let user = fetch_as::<UserProfile>(self.store.as_ref(), &DocRef::user(uid)).await?;
        let public = fetch_as::<PublicProfile>(self.store.as_ref(), &DocRef::public_profile(uid))
            .await?;
        if user.is_none() && public.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let artworks = query_as::<Artwork>(
            self.store.as_ref(),
            &Collection::Artworks,
            &Filter::OwnerUid(uid.to_string()),
        )
        .await?;

        let mut report = DeletionReport {
            uid: uid.to_string(),
            ..Default::default()
        };

        // Everything under the account's folders, plus recorded paths in case they live elsewhere
        let mut object_paths = BTreeSet::new();
        for prefix in [
            paths::profile_photo_prefix(uid),
            paths::user_artworks_prefix(uid),
        ] {
            match self.objects.list(&prefix).await {
                Ok(found) => object_paths.extend(found),
                Err(e) => {
                    warn!(uid, prefix = %prefix, error = %e, "failed to list stored objects");
                    report.storage_failures += 1;
                }
            }
        }
        object_paths.extend(user.as_ref().and_then(|u| u.profile_photo_path.clone()));
        object_paths.extend(artworks.iter().map(|a| a.image_path.clone()));

        for path in &object_paths {
            match self.objects.delete(path).await {
                Ok(()) => report.objects_deleted += 1,
                Err(StoreError::NotFound(_)) => {}
                Err(e) => {
                    warn!(uid, path = %path, error = %e, "failed to delete stored object");
                    report.storage_failures += 1;
                }
            }
        }

        let username = user
            .as_ref()
            .map(|u| u.username.clone())
            .or_else(|| public.as_ref().and_then(|p| p.username.clone()));

        let reservation_doc = username.as_deref().map(DocRef::username);
        let (artworks_ref, reservation_doc) = (&artworks, &reservation_doc);

        run_transaction(&self.store, move |mut tx| async move {
            // Only free a reservation this account actually holds
            if let Some(doc) = reservation_doc {
                let held = tx.get_as::<UsernameReservation>(doc).await?;
                match held {
                    Some(reservation) if reservation.uid == uid => tx.delete(doc.clone()),
                    Some(reservation) => {
                        warn!(
                            uid,
                            username = %reservation.username,
                            holder = %reservation.uid,
                            "username held by another account, keeping it"
                        );
                    }
                    None => {}
                }
            }
            for artwork in artworks_ref {
                tx.delete(DocRef::artwork(&artwork.id));
            }
            tx.delete(DocRef::public_profile(uid));
            tx.delete(DocRef::user(uid));
            Ok((tx, ()))
        })
        .await?;

        report.artworks_deleted = artworks.len();
        info!(
            uid,
            artworks = report.artworks_deleted,
            objects = report.objects_deleted,
            storage_failures = report.storage_failures,
            "user deleted"
        );
        Ok(report)
    }
}
