//! API Routes
//!
//! Configures the Axum router with all ArtEsfera endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::*;
use crate::models::MAX_IMAGE_BODY_BYTES;
use crate::services::SYNC_PROFILE_PATH;

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (the browser client is served separately)
/// - Tracing: Logs all requests for debugging
/// - Body limit: raised on the image upload routes to fit a base64 image
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route(SYNC_PROFILE_PATH, post(sync_profile_handler))
        // Users
        .route("/api/users", post(create_user_handler))
        .route("/api/me", get(me_handler).patch(update_me_handler))
        .route(
            "/api/me/photo",
            put(upload_photo_handler).layer(DefaultBodyLimit::max(MAX_IMAGE_BODY_BYTES)),
        )
        .route(
            "/api/users/:uid",
            get(get_user_handler).delete(delete_user_handler),
        )
        .route("/api/users/:uid/artworks", get(list_user_artworks_handler))
        .route("/api/usernames/:name", get(username_handler))
        // Gallery
        .route("/api/gallery", get(gallery_handler))
        .route("/api/gallery/categories", get(categories_handler))
        .route("/api/gallery/tags", get(tags_handler))
        .route(
            "/api/artworks",
            post(create_artwork_handler).layer(DefaultBodyLimit::max(MAX_IMAGE_BODY_BYTES)),
        )
        .route(
            "/api/artworks/:id",
            get(get_artwork_handler).delete(delete_artwork_handler),
        )
        // Projects
        .route(
            "/api/projects",
            get(list_projects_handler).post(create_project_handler),
        )
        .route("/api/projects/:id", get(get_project_handler))
        .route("/api/projects/:id/close", post(close_project_handler))
        .route(
            "/api/projects/:id/applications",
            get(list_applications_handler).post(apply_handler),
        )
        .route(
            "/api/projects/:id/applications/withdraw",
            post(withdraw_handler),
        )
        .route(
            "/api/projects/:id/applications/:uid/accept",
            post(accept_handler),
        )
        .route(
            "/api/projects/:id/applications/:uid/reject",
            post(reject_handler),
        )
        // Notifications
        .route("/api/notifications", get(notifications_handler))
        .route("/api/notifications/:id/read", post(mark_read_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
