//! API Handlers
//!
//! HTTP request handlers for each ArtEsfera endpoint. Handlers stay thin:
//! authenticate, decode, call one service, encode.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    Json,
};
use tracing::warn;

use crate::auth::{bearer_token, AuthUser, StaticTokenVerifier, TokenVerifier};
use crate::cache::CacheService;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    Application, ApplyRequest, Artwork, CreateArtworkRequest, CreateUserRequest, GalleryQuery,
    HealthResponse, ImageUpload, NewProject, NewUser, Notification, ProfileSyncData,
    ProfileUpdate, Project, PublicProfile, StatsResponse, UserProfile, UsernameAvailability,
};
use crate::services::{
    ArtworkService, DeletionReport, NotificationService, ProjectService, UserService,
};
use crate::store::{DocumentStore, MemoryDocumentStore, MemoryObjectStorage, ObjectStorage};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheService>,
    pub users: Arc<UserService>,
    pub artworks: Arc<ArtworkService>,
    pub projects: Arc<ProjectService>,
    pub notifications: Arc<NotificationService>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Wires every service onto the given backends.
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStorage>,
        cache: Arc<CacheService>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(Arc::clone(&store), Arc::clone(&objects))),
            artworks: Arc::new(ArtworkService::new(
                Arc::clone(&store),
                objects,
                Arc::clone(&cache),
                config,
            )),
            projects: Arc::new(ProjectService::new(
                Arc::clone(&store),
                Arc::clone(&cache),
                config,
            )),
            notifications: Arc::new(NotificationService::new(store)),
            cache,
            verifier,
        }
    }

    /// Creates a state on in-memory backends, with the tokens from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryObjectStorage::new()),
            Arc::new(CacheService::from_config(config)),
            Arc::new(StaticTokenVerifier::new(config.auth_tokens.clone())),
        )
    }
}

// == Auth Extractor ==
/// Resolves `Authorization: Bearer <token>` to the signed-in user.
#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        state.verifier.verify(token).await
    }
}

fn ensure_self(auth: &AuthUser, uid: &str, action: &str) -> Result<()> {
    if auth.uid == uid {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("You can only {} your own account", action)))
    }
}

// == Service Endpoints ==
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

// == Profile Sync ==
/// Handler for POST /api/sync-profile
///
/// Upserts the caller's public profile. The payload must name the caller.
pub async fn sync_profile_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(data): Json<ProfileSyncData>,
) -> Result<Json<PublicProfile>> {
    if !data.is_syncable() {
        return Err(AppError::Validation(
            "Missing required fields: uid and name".to_string(),
        ));
    }
    if data.uid != auth.uid {
        return Err(AppError::Forbidden(
            "You can only sync your own profile".to_string(),
        ));
    }

    Ok(Json(state.users.sync_public_profile(data).await?))
}

// == Users ==
pub async fn create_user_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::Validation(error_msg));
    }

    let user = state
        .users
        .create_user(NewUser {
            uid: auth.uid,
            username: req.username,
            name: req.name,
            email: req.email,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for GET /api/me: the caller's private profile.
pub async fn me_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.users.get_user(&auth.uid).await?))
}

/// Handler for PATCH /api/me
///
/// Updates the private profile, then refreshes the public mirror.
pub async fn update_me_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    let user = state.users.update_profile(&auth.uid, update).await?;
    refresh_public_profile(&state, &user).await;
    Ok(Json(user))
}

/// Handler for PUT /api/me/photo
pub async fn upload_photo_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(upload): Json<ImageUpload>,
) -> Result<Json<UserProfile>> {
    let bytes = upload.decode()?;
    let user = state
        .users
        .upload_profile_photo(&auth.uid, &upload.file_name, bytes, &upload.content_type)
        .await?;
    refresh_public_profile(&state, &user).await;
    Ok(Json(user))
}

async fn refresh_public_profile(state: &AppState, user: &UserProfile) {
    if let Err(e) = state.users.sync_public_profile(user.sync_data()).await {
        warn!(uid = %user.uid, error = %e, "public profile refresh failed");
    }
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<PublicProfile>> {
    Ok(Json(state.users.get_public_profile(&uid).await?))
}

pub async fn list_user_artworks_handler(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<Vec<Artwork>>> {
    Ok(Json(state.artworks.list_by_owner(&uid).await?))
}

/// Handler for DELETE /api/users/:uid: removes the caller's own account.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(uid): Path<String>,
) -> Result<Json<DeletionReport>> {
    ensure_self(&auth, &uid, "delete")?;
    let report = state.users.delete_user_cascade(&uid).await?;
    state.artworks.invalidate_listings().await;
    Ok(Json(report))
}

pub async fn username_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<UsernameAvailability>> {
    let available = state.users.is_username_available(&name).await?;
    Ok(Json(UsernameAvailability {
        username: name.trim().to_lowercase(),
        available,
    }))
}

// == Gallery & Artworks ==
pub async fn gallery_handler(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<Vec<Artwork>>> {
    Ok(Json(state.artworks.list_gallery(&query).await?))
}

pub async fn categories_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.artworks.list_categories().await?))
}

pub async fn tags_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.artworks.list_tags().await?))
}

pub async fn create_artwork_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateArtworkRequest>,
) -> Result<(StatusCode, Json<Artwork>)> {
    let (input, image) = req.into_parts()?;
    let artwork = state
        .artworks
        .create_artwork(&auth.uid, input, image)
        .await?;
    Ok((StatusCode::CREATED, Json(artwork)))
}

pub async fn get_artwork_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Artwork>> {
    Ok(Json(state.artworks.get_artwork(&id).await?))
}

pub async fn delete_artwork_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.artworks.delete_artwork(&auth.uid, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// == Projects ==
pub async fn create_project_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>)> {
    let project = state.projects.create_project(&auth.uid, input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects_handler(State(state): State<AppState>) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.projects.list_open_projects().await?))
}

pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    Ok(Json(state.projects.get_project(&id).await?))
}

pub async fn close_project_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    Ok(Json(state.projects.close_project(&auth.uid, &id).await?))
}

pub async fn list_applications_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Application>>> {
    Ok(Json(state.projects.list_applications(&auth.uid, &id).await?))
}

/// Handler for POST /api/projects/:id/applications. The body is optional.
pub async fn apply_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    body: Option<Json<ApplyRequest>>,
) -> Result<(StatusCode, Json<Application>)> {
    let message = body.and_then(|Json(req)| req.message);
    let application = state
        .projects
        .apply_to_project(&id, &auth.uid, message)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn accept_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, applicant)): Path<(String, String)>,
) -> Result<Json<Application>> {
    Ok(Json(
        state
            .projects
            .accept_application(&auth.uid, &id, &applicant)
            .await?,
    ))
}

pub async fn reject_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, applicant)): Path<(String, String)>,
) -> Result<Json<Application>> {
    Ok(Json(
        state
            .projects
            .reject_application(&auth.uid, &id, &applicant)
            .await?,
    ))
}

pub async fn withdraw_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Application>> {
    Ok(Json(
        state
            .projects
            .withdraw_application(&id, &auth.uid)
            .await?,
    ))
}

// == Notifications ==
pub async fn notifications_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(state.notifications.list_for_user(&auth.uid).await?))
}

pub async fn mark_read_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Notification>> {
    Ok(Json(state.notifications.mark_read(&auth.uid, &id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let mut config = Config::default();
        config.auth_tokens.insert("tok-ana".into(), "ana".into());
        AppState::from_config(&config)
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let response = stats_handler(State(state())).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_sync_profile_handler_checks_caller() {
        let state = state();
        let auth = AuthUser::new("ana", "tok-ana");

        let other = ProfileSyncData {
            uid: "bia".into(),
            name: "Bia".into(),
            ..Default::default()
        };
        let result = sync_profile_handler(State(state.clone()), auth.clone(), Json(other)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let missing_name = ProfileSyncData {
            uid: "ana".into(),
            ..Default::default()
        };
        let result =
            sync_profile_handler(State(state.clone()), auth.clone(), Json(missing_name)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let own = ProfileSyncData {
            uid: "ana".into(),
            name: "Ana".into(),
            ..Default::default()
        };
        let Json(profile) = sync_profile_handler(State(state), auth, Json(own))
            .await
            .unwrap();
        assert_eq!(profile.name, "Ana");
    }

    #[tokio::test]
    async fn test_delete_user_handler_only_self() {
        let state = state();
        let auth = AuthUser::new("ana", "tok-ana");

        let result =
            delete_user_handler(State(state), auth, Path("bia".to_string())).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_username_handler_normalizes() {
        let Json(resp) = username_handler(State(state()), Path(" Ana ".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.username, "ana");
        assert!(resp.available);
    }
}
