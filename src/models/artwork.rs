//! Portfolio artworks and gallery queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest page a gallery query may request.
pub const MAX_GALLERY_LIMIT: usize = 100;
pub const DEFAULT_GALLERY_LIMIT: usize = 24;

/// Artwork document stored under `artworks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    pub id: String,
    pub owner_uid: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Object storage path, `artworks/{uid}/{id}/{file}`
    pub image_path: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a new artwork; the image bytes travel separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtwork {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub file_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "image/jpeg".to_string()
}

/// Filter for gallery listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl GalleryQuery {
    /// Requested page size, clamped to `1..=MAX_GALLERY_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_GALLERY_LIMIT)
            .clamp(1, MAX_GALLERY_LIMIT)
    }

    /// Cache and throttle key; equal queries share a key.
    pub fn cache_key(&self) -> String {
        format!(
            "gallery:category={}:tag={}:limit={}",
            self.category.as_deref().unwrap_or("*"),
            self.tag.as_deref().unwrap_or("*"),
            self.effective_limit()
        )
    }

    pub fn matches(&self, artwork: &Artwork) -> bool {
        let category_ok = self
            .category
            .as_ref()
            .map_or(true, |c| artwork.category.eq_ignore_ascii_case(c));
        let tag_ok = self
            .tag
            .as_ref()
            .map_or(true, |t| artwork.tags.iter().any(|tag| tag.eq_ignore_ascii_case(t)));
        category_ok && tag_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artwork(category: &str, tags: &[&str]) -> Artwork {
        Artwork {
            id: "a1".into(),
            owner_uid: "u1".into(),
            title: "Dawn".into(),
            description: None,
            category: category.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image_path: "artworks/u1/a1/dawn.jpg".into(),
            image_url: "memory://artworks/u1/a1/dawn.jpg".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cache_key_is_stable_per_query() {
        let a = GalleryQuery {
            category: Some("painting".into()),
            ..Default::default()
        };
        let b = a.clone();
        let c = GalleryQuery::default();

        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert!(c.cache_key().starts_with("gallery:"));
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(GalleryQuery::default().effective_limit(), 24);
        let huge = GalleryQuery {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(huge.effective_limit(), MAX_GALLERY_LIMIT);
        let zero = GalleryQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.effective_limit(), 1);
    }

    #[test]
    fn test_matches_category_and_tag() {
        let art = artwork("Painting", &["oil", "landscape"]);

        assert!(GalleryQuery::default().matches(&art));
        assert!(GalleryQuery {
            category: Some("painting".into()),
            tag: Some("OIL".into()),
            limit: None
        }
        .matches(&art));
        assert!(!GalleryQuery {
            tag: Some("ink".into()),
            ..Default::default()
        }
        .matches(&art));
    }
}
