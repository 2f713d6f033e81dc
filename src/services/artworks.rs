//! Portfolio artworks and the cached gallery listings built from them.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Artwork, GalleryQuery, NewArtwork};
use crate::store::{
    fetch_as, paths, query_as, Collection, DocRef, DocumentStore, Filter, ObjectStorage,
    WriteBatch,
};

const GALLERY_PREFIX: &str = "gallery:";
const METADATA_PREFIX: &str = "meta:";
const CATEGORIES_KEY: &str = "meta:categories";
const TAGS_KEY: &str = "meta:tags";

// == Artwork Service ==
pub struct ArtworkService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStorage>,
    cache: Arc<CacheService>,
    listing_ttl_ms: u64,
    metadata_ttl_ms: u64,
    throttle_interval_ms: u64,
}

impl ArtworkService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStorage>,
        cache: Arc<CacheService>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            objects,
            cache,
            listing_ttl_ms: config.listing_ttl_ms,
            metadata_ttl_ms: config.metadata_ttl_ms,
            throttle_interval_ms: config.throttle_interval_ms,
        }
    }

    // == Create ==
    /// Uploads the image, then writes the artwork record.
    pub async fn create_artwork(
        &self,
        owner_uid: &str,
        input: NewArtwork,
        image: Vec<u8>,
    ) -> Result<Artwork> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
        if input.category.trim().is_empty() {
            return Err(AppError::Validation("Category cannot be empty".to_string()));
        }
        if image.is_empty() {
            return Err(AppError::Validation("Image is empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let path = paths::artwork_image_path(owner_uid, &id, &input.file_name);
        let stored = self.objects.upload(&path, image, &input.content_type).await?;

        let artwork = Artwork {
            id: id.clone(),
            owner_uid: owner_uid.to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            category: input.category.trim().to_lowercase(),
            tags: normalize_tags(input.tags),
            image_path: stored.path,
            image_url: stored.url,
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::new();
        batch.set(DocRef::artwork(&id), artwork.clone());
        if let Err(e) = self.store.commit(batch).await {
            // Record never landed; the uploaded image would be orphaned
            if let Err(cleanup) = self.objects.delete(&artwork.image_path).await {
                warn!(
                    path = %artwork.image_path,
                    error = %cleanup,
                    "failed to remove orphaned image"
                );
            }
            return Err(e.into());
        }

        self.invalidate_listings().await;
        info!(id = %artwork.id, owner = owner_uid, "artwork created");
        Ok(artwork)
    }

    pub async fn get_artwork(&self, id: &str) -> Result<Artwork> {
        fetch_as::<Artwork>(self.store.as_ref(), &DocRef::artwork(id))
            .await?
            .ok_or_else(|| AppError::NotFound("Artwork not found".to_string()))
    }

    /// Every artwork of `owner_uid`, newest first. Not cached.
    pub async fn list_by_owner(&self, owner_uid: &str) -> Result<Vec<Artwork>> {
        let mut artworks = query_as::<Artwork>(
            self.store.as_ref(),
            &Collection::Artworks,
            &Filter::OwnerUid(owner_uid.to_string()),
        )
        .await?;
        sort_newest_first(&mut artworks);
        Ok(artworks)
    }

    // == Gallery ==
    /// Gallery page for `query`, newest first.
    ///
    /// Served from the cache for the listing TTL. A miss is throttled per
    /// query, so a burst of identical uncached requests loads once and the
    /// rest get `Throttled`.
    pub async fn list_gallery(&self, query: &GalleryQuery) -> Result<Vec<Artwork>> {
        let key = query.cache_key();
        self.cached(&key, self.listing_ttl_ms, async {
            let filter = match (&query.category, &query.tag) {
                (Some(category), _) => Filter::Category(category.clone()),
                (None, Some(tag)) => Filter::Tag(tag.clone()),
                (None, None) => Filter::All,
            };
            let mut artworks =
                query_as::<Artwork>(self.store.as_ref(), &Collection::Artworks, &filter).await?;
            artworks.retain(|a| query.matches(a));
            sort_newest_first(&mut artworks);
            artworks.truncate(query.effective_limit());
            Ok(artworks)
        })
        .await
    }

    /// Distinct categories in use, sorted.
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        self.cached(CATEGORIES_KEY, self.metadata_ttl_ms, async {
            let artworks = self.all_artworks().await?;
            let categories: BTreeSet<String> =
                artworks.into_iter().map(|a| a.category).collect();
            Ok(categories.into_iter().collect())
        })
        .await
    }

    /// Distinct tags in use, sorted.
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        self.cached(TAGS_KEY, self.metadata_ttl_ms, async {
            let artworks = self.all_artworks().await?;
            let tags: BTreeSet<String> = artworks.into_iter().flat_map(|a| a.tags).collect();
            Ok(tags.into_iter().collect())
        })
        .await
    }

    // == Delete ==
    /// Deletes an artwork owned by `owner_uid`.
    pub async fn delete_artwork(&self, owner_uid: &str, id: &str) -> Result<()> {
        let artwork = self.get_artwork(id).await?;
        if artwork.owner_uid != owner_uid {
            return Err(AppError::Forbidden(
                "You can only delete your own artworks".to_string(),
            ));
        }

        if let Err(e) = self.objects.delete(&artwork.image_path).await {
            warn!(id, path = %artwork.image_path, error = %e, "failed to delete artwork image");
        }

        let mut batch = WriteBatch::new();
        batch.delete(DocRef::artwork(id));
        self.store.commit(batch).await?;

        self.invalidate_listings().await;
        info!(id, owner = owner_uid, "artwork deleted");
        Ok(())
    }

    /// Drops cached gallery pages and metadata after a write.
    pub async fn invalidate_listings(&self) {
        let gallery = self.cache.invalidate_prefix(GALLERY_PREFIX).await;
        let metadata = self.cache.invalidate_prefix(METADATA_PREFIX).await;
        debug!(gallery, metadata, "listing cache invalidated");
    }

    async fn all_artworks(&self) -> Result<Vec<Artwork>> {
        Ok(query_as::<Artwork>(self.store.as_ref(), &Collection::Artworks, &Filter::All).await?)
    }

    /// Cache-aside read: hit, else throttle check, else `load` and store.
    async fn cached<T, Fut>(&self, key: &str, ttl_ms: u64, load: Fut) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get::<T>(key).await {
            return Ok(hit);
        }

        if self
            .cache
            .should_throttle_request(key, self.throttle_interval_ms)
            .await
        {
            warn!(key, "uncached request throttled");
            return Err(AppError::Throttled(format!(
                "{} was requested too recently, retry shortly",
                key
            )));
        }

        let value = load.await?;
        self.cache.set(key, &value, Some(ttl_ms)).await;
        Ok(value)
    }
}

fn sort_newest_first(artworks: &mut [Artwork]) {
    artworks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Trims, lowercases and dedups tags, keeping first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}
