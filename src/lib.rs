//! ArtEsfera - Backend service for an artist marketplace
//!
//! Public profiles, portfolio artworks with a cached gallery, project
//! postings with an application workflow, and notifications. Storage,
//! blob storage and token verification sit behind traits.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{AppError, Result};
pub use tasks::spawn_cleanup_task;
