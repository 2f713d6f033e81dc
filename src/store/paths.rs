//! Object storage layout.
//!
//! - `profile-photos/{uid}/{file}`
//! - `artworks/{uid}/{artworkId}/{file}`

/// Strips directory components and characters that would break a path.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn profile_photo_path(uid: &str, file_name: &str) -> String {
    format!("profile-photos/{}/{}", uid, sanitize_file_name(file_name))
}

pub fn profile_photo_prefix(uid: &str) -> String {
    format!("profile-photos/{}/", uid)
}

pub fn artwork_image_path(uid: &str, artwork_id: &str, file_name: &str) -> String {
    format!(
        "artworks/{}/{}/{}",
        uid,
        artwork_id,
        sanitize_file_name(file_name)
    )
}

/// Every artwork image `uid` ever uploaded.
pub fn user_artworks_prefix(uid: &str) -> String {
    format!("artworks/{}/", uid)
}

pub fn artwork_prefix(uid: &str, artwork_id: &str) -> String {
    format!("artworks/{}/{}/", uid, artwork_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(profile_photo_path("u1", "me.png"), "profile-photos/u1/me.png");
        assert_eq!(
            artwork_image_path("u1", "a9", "dawn.jpg"),
            "artworks/u1/a9/dawn.jpg"
        );
        assert!(artwork_image_path("u1", "a9", "x.jpg").starts_with(&artwork_prefix("u1", "a9")));
        assert!(artwork_prefix("u1", "a9").starts_with(&user_artworks_prefix("u1")));
        assert!(!artwork_prefix("u10", "a9").starts_with(&user_artworks_prefix("u1")));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my pic.png"), "my_pic.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("dir/"), "file");
    }
}
