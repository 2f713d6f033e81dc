//! API Module
//!
//! HTTP handlers and routing for the ArtEsfera REST API.
//!
//! # Endpoints
//! - `GET /health`, `GET /stats` - Service status and cache diagnostics
//! - `POST /api/sync-profile` - Upsert the caller's public profile
//! - `/api/users`, `/api/me`, `/api/usernames/:name` - Accounts
//! - `/api/gallery`, `/api/artworks` - Portfolio and cached gallery
//! - `/api/projects` - Postings and the application workflow
//! - `/api/notifications` - In-app notifications

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
