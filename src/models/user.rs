//! User records: the private profile, its public mirror and username reservations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Private profile stored under `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Object storage path of the current profile photo
    #[serde(default)]
    pub profile_photo_path: Option<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    #[serde(default)]
    pub disciplines: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(input: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            uid: input.uid,
            username: input.username,
            name: input.name,
            email: input.email,
            bio: None,
            location: None,
            website: None,
            profile_photo_path: None,
            profile_photo_url: None,
            disciplines: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The subset of fields other users may read.
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            uid: self.uid.clone(),
            username: Some(self.username.clone()),
            name: self.name.clone(),
            bio: self.bio.clone(),
            location: self.location.clone(),
            website: self.website.clone(),
            profile_photo_url: self.profile_photo_url.clone(),
            disciplines: self.disciplines.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Applies the fields present in `update`.
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
        if let Some(website) = update.website {
            self.website = Some(website);
        }
        if let Some(disciplines) = update.disciplines {
            self.disciplines = disciplines;
        }
        self.updated_at = now;
    }

    /// Profile fields in the shape pushed to the public mirror.
    pub fn sync_data(&self) -> ProfileSyncData {
        ProfileSyncData {
            uid: self.uid.clone(),
            name: self.name.clone(),
            username: Some(self.username.clone()),
            bio: self.bio.clone(),
            location: self.location.clone(),
            website: self.website.clone(),
            profile_photo_url: self.profile_photo_url.clone(),
            disciplines: Some(self.disciplines.clone()),
        }
    }
}

/// Denormalized public copy stored under `publicProfiles/{uid}`. Never carries the email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub uid: String,
    #[serde(default)]
    pub username: Option<String>,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    #[serde(default)]
    pub disciplines: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Claim on a username, stored under `usernames/{username}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameReservation {
    pub username: String,
    pub uid: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/sync-profile`.
///
/// `uid` and `name` default to empty so a payload missing them is a
/// validation failure rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSyncData {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disciplines: Option<Vec<String>>,
}

impl ProfileSyncData {
    /// Both `uid` and `name` are present.
    pub fn is_syncable(&self) -> bool {
        !self.uid.trim().is_empty() && !self.name.trim().is_empty()
    }

    pub fn into_public_profile(self, now: DateTime<Utc>) -> PublicProfile {
        PublicProfile {
            uid: self.uid,
            username: self.username,
            name: self.name,
            bio: self.bio,
            location: self.location,
            website: self.website,
            profile_photo_url: self.profile_photo_url,
            disciplines: self.disciplines.unwrap_or_default(),
            updated_at: now,
        }
    }
}

/// Input for account creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub uid: String,
    pub username: String,
    pub name: String,
    pub email: String,
}

/// Partial profile edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub disciplines: Option<Vec<String>>,
}
