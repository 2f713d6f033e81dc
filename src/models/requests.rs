//! Request DTOs for the ArtEsfera API
//!
//! Image payloads travel base64-encoded inside JSON bodies.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::NewArtwork;

/// Largest accepted image, after decoding.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Body limit for routes carrying an image: the base64 form of
/// `MAX_IMAGE_BYTES` plus room for the surrounding JSON fields.
pub const MAX_IMAGE_BODY_BYTES: usize = MAX_IMAGE_BYTES.div_ceil(3) * 4 + 64 * 1024;

/// Request body for `POST /api/users`. The uid comes from the bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub name: String,
    pub email: String,
}

impl CreateUserRequest {
    /// Returns an error message if a required field is blank.
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("Name cannot be empty".to_string());
        }
        if !self.email.contains('@') {
            return Some("Email is not valid".to_string());
        }
        None
    }
}

/// An uploaded file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub file_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Standard base64, no data-URL prefix
    pub data: String,
}

fn default_content_type() -> String {
    "image/jpeg".to_string()
}

impl ImageUpload {
    /// Decodes the payload, rejecting empty, oversized and non-image uploads.
    pub fn decode(&self) -> Result<Vec<u8>> {
        if !self.content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Unsupported content type: {}",
                self.content_type
            )));
        }

        let bytes = STANDARD
            .decode(self.data.trim())
            .map_err(|e| AppError::Validation(format!("Image data is not valid base64: {}", e)))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Image is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "Image exceeds maximum size of {} bytes",
                MAX_IMAGE_BYTES
            )));
        }
        Ok(bytes)
    }
}

/// Request body for `POST /api/artworks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtworkRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image: ImageUpload,
}

impl CreateArtworkRequest {
    /// Splits the request into artwork metadata and decoded image bytes.
    pub fn into_parts(self) -> Result<(NewArtwork, Vec<u8>)> {
        let bytes = self.image.decode()?;
        let artwork = NewArtwork {
            title: self.title,
            description: self.description,
            category: self.category,
            tags: self.tags,
            file_name: self.image.file_name,
            content_type: self.image.content_type,
        };
        Ok((artwork, bytes))
    }
}

/// Request body for `POST /api/projects/:id/applications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_request_validate() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"username": "ana", "name": "Ana", "email": "a@b.c"}"#)
                .unwrap();
        assert!(req.validate().is_none());

        let req = CreateUserRequest {
            name: " ".into(),
            ..req
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_image_decode() {
        let upload = ImageUpload {
            file_name: "dawn.png".into(),
            content_type: "image/png".into(),
            data: STANDARD.encode([1u8, 2, 3]),
        };
        assert_eq!(upload.decode().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_image_decode_rejects_bad_input() {
        let mut upload = ImageUpload {
            file_name: "x.txt".into(),
            content_type: "text/plain".into(),
            data: STANDARD.encode([1u8]),
        };
        assert!(matches!(upload.decode(), Err(AppError::Validation(_))));

        upload.content_type = "image/png".into();
        upload.data = "not base64!".into();
        assert!(matches!(upload.decode(), Err(AppError::Validation(_))));

        upload.data = String::new();
        assert!(matches!(upload.decode(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_artwork_request_into_parts() {
        let json = format!(
            r#"{{"title": "Dawn", "category": "painting", "tags": ["oil"],
                "image": {{"fileName": "dawn.jpg", "data": "{}"}}}}"#,
            STANDARD.encode(b"jpeg")
        );
        let req: CreateArtworkRequest = serde_json::from_str(&json).unwrap();
        let (artwork, bytes) = req.into_parts().unwrap();

        assert_eq!(artwork.title, "Dawn");
        assert_eq!(artwork.content_type, "image/jpeg");
        assert_eq!(bytes, b"jpeg");
    }
}
