//! Client that pushes profile edits to the public-profile mirror.
//!
//! Pushes are best effort: the private profile is the record of truth, and a
//! failed push is repaired by the next edit.

use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::AuthUser;
use crate::cache::Debouncer;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ErrorResponse, ProfileSyncData};

pub const SYNC_PROFILE_PATH: &str = "/api/sync-profile";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// == Profile Sync Client ==
#[derive(Debug, Clone)]
pub struct ProfileSyncClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ProfileSyncClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), SYNC_PROFILE_PATH),
        })
    }

    /// Client for `config.sync_base_url`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.sync_base_url)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POSTs `data` with the user's ID token and fails on any non-2xx reply.
    pub async fn sync_profile(&self, data: &ProfileSyncData, auth: &AuthUser) -> Result<()> {
        if !data.is_syncable() {
            return Err(AppError::Validation(
                "Missing required fields: uid and name".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&auth.id_token)
            .json(data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(uid = %data.uid, "profile synced");
            return Ok(());
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(AppError::Sync(format!("{}: {}", status.as_u16(), message)))
    }

    /// Fire-and-forget variant of `sync_profile`.
    ///
    /// Does nothing without a signed-in user or a syncable payload; errors
    /// are logged and swallowed. Returns whether the push went through.
    pub async fn auto_sync_profile(&self, data: &ProfileSyncData, auth: Option<&AuthUser>) -> bool {
        let Some(auth) = auth else {
            debug!("no signed-in user, skipping profile sync");
            return false;
        };
        if !data.is_syncable() {
            debug!("profile data incomplete, skipping profile sync");
            return false;
        }

        match self.sync_profile(data, auth).await {
            Ok(()) => true,
            Err(e) => {
                warn!(uid = %data.uid, error = %e, "profile sync failed");
                false
            }
        }
    }

    /// Debounced pusher for `config.sync_base_url`, waiting
    /// `config.sync_debounce_ms` of quiet before each push.
    pub fn debounced_from_config(
        config: &Config,
    ) -> Result<Debouncer<(ProfileSyncData, AuthUser)>> {
        let client = Self::from_config(config)?;
        Ok(client.debounced(Duration::from_millis(config.sync_debounce_ms)))
    }

    /// A debouncer that pushes only the last edit made within `delay`.
    pub fn debounced(&self, delay: Duration) -> Debouncer<(ProfileSyncData, AuthUser)> {
        let client = self.clone();
        Debouncer::new(
            move |(data, auth): (ProfileSyncData, AuthUser)| {
                let client = client.clone();
                tokio::spawn(async move {
                    client.auto_sync_profile(&data, Some(&auth)).await;
                });
            },
            delay,
        )
    }
}
