//! # Media URLs
//!
//! Drink images and guest profile pictures are stored as `bucket/path` strings.
//! Screens need public URLs, and guests without a picture get a generated avatar.

use crate::model::OrderWithDetails;
use url::Url;

const PUBLIC_OBJECT_PREFIX: [&str; 4] = ["storage", "v1", "object", "public"];
const AVATAR_ENDPOINT: &str = "https://ui-avatars.com/api/";

/// Turns storage paths on joined orders into public URLs.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    storage_base: Url,
}

impl MediaResolver {
    pub fn new(storage_base: Url) -> Self {
        Self { storage_base }
    }

    /// Public URL for a `bucket/path/to/object` storage path.
    ///
    /// Returns `None` when the path has no bucket or the base URL cannot carry a path.
    pub fn public_url(&self, full_path: &str) -> Option<String> {
        let trimmed = full_path.trim_start_matches('/');
        let (bucket, path) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if bucket.is_empty() {
            return None;
        }

        let mut url = self.storage_base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(PUBLIC_OBJECT_PREFIX)
            .push(bucket)
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Some(url.to_string())
    }

    /// Generated avatar for a guest who never uploaded a picture.
    pub fn avatar_url(display_name: &str) -> Option<String> {
        Url::parse_with_params(AVATAR_ENDPOINT, &[("name", display_name)])
            .ok()
            .map(String::from)
    }

    /// Fills in `drink.image_url` and rewrites `guest.profile_picture` in place.
    ///
    /// Values that are already absolute URLs are left alone, so resolving twice is harmless.
    pub fn resolve(&self, details: &mut OrderWithDetails) {
        if let Some(path) = details.drink.image_path.as_deref() {
            details.drink.image_url = self.public_url(path);
        }

        details.guest.profile_picture = match details.guest.profile_picture.take() {
            Some(picture) if is_absolute(&picture) => Some(picture),
            Some(path) => self.public_url(&path),
            None => Self::avatar_url(&details.guest.display_name),
        };
    }
}

fn is_absolute(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}
