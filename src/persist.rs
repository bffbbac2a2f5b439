use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::photo;
use crate::post::Post;
use crate::storage::KeyValueStore;

pub const POSTS_KEY: &str = "wall-posts";
pub const PROFILE_PHOTO_KEY: &str = "wall-profile-photo";

/// Typed access to the two wall records. Each key is read and written on
/// its own; nothing here spans both.
#[derive(Clone)]
pub struct WallStore {
    kv: Arc<dyn KeyValueStore>,
}

impl WallStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Reads a JSON value. Absent keys are `Ok(None)`; an unparseable value
    /// is an error for this key only.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.kv.get(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("persist: parse stored value for {key}"))?;
        Ok(Some(value))
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("persist: serialize value for {key}"))?;
        self.kv.set(key, &raw)
    }

    /// Loads the stored feed, dropping records that could never have been
    /// submitted (blank, or longer than `max_chars`).
    pub fn load_feed(&self, max_chars: usize) -> Vec<Post> {
        match self.load::<Vec<Post>>(POSTS_KEY) {
            Ok(posts) => {
                let mut posts = posts.unwrap_or_default();
                let stored = posts.len();
                posts.retain(|post| post.is_well_formed(max_chars));
                if posts.len() < stored {
                    tracing::warn!(
                        key = POSTS_KEY,
                        dropped = stored - posts.len(),
                        "discarding malformed stored posts"
                    );
                }
                posts
            }
            Err(err) => {
                tracing::warn!(key = POSTS_KEY, error = %format!("{err:#}"), "discarding stored feed");
                Vec::new()
            }
        }
    }

    pub fn save_feed(&self, posts: &[Post]) -> Result<()> {
        self.save(POSTS_KEY, posts)
    }

    // The photo is kept as the bare data URI rather than a JSON string.
    pub fn load_profile_photo(&self) -> Option<String> {
        match self.kv.get(PROFILE_PHOTO_KEY) {
            Ok(Some(raw)) if photo::is_image_uri(&raw) => Some(raw),
            Ok(Some(_)) => {
                tracing::warn!(key = PROFILE_PHOTO_KEY, "discarding stored profile photo");
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key = PROFILE_PHOTO_KEY, error = %format!("{err:#}"), "profile photo unreadable");
                None
            }
        }
    }

    pub fn save_profile_photo(&self, uri: &str) -> Result<()> {
        self.kv.set(PROFILE_PHOTO_KEY, uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Options, Store};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn sample(id: &str, message: &str) -> Post {
        Post {
            id: id.into(),
            name: "Chibueze Williams".into(),
            message: message.into(),
            photo: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn absent_records_default() {
        let store = WallStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load_feed(280).is_empty());
        assert_eq!(store.load_profile_photo(), None);
        assert!(store.load::<Vec<Post>>(POSTS_KEY).unwrap().is_none());
    }

    #[test]
    fn feed_round_trips_in_order() {
        let dir = tempdir().unwrap();
        let kv = Store::open(Options {
            path: Some(dir.path().join("wall.db")),
        })
        .unwrap();
        let store = WallStore::new(Arc::new(kv));
        let posts = vec![sample("2", "newer"), sample("1", "older")];
        store.save_feed(&posts).unwrap();
        assert_eq!(store.load_feed(280), posts);
    }

    #[test]
    fn malformed_feed_does_not_affect_photo() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(POSTS_KEY, "[{\"id\":\"1\",\"name\":").unwrap();
        kv.set(PROFILE_PHOTO_KEY, "data:image/png;base64,AAAA").unwrap();
        let store = WallStore::new(kv.clone());

        assert!(store.load::<Vec<Post>>(POSTS_KEY).is_err());
        assert!(store.load_feed(280).is_empty());
        assert_eq!(
            store.load_profile_photo().as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        // the bad value stays until something overwrites it
        assert!(kv.get(POSTS_KEY).unwrap().is_some());
    }

    #[test]
    fn blank_and_oversized_posts_are_dropped() {
        let kv = Arc::new(MemoryStore::new());
        let long = "x".repeat(281);
        let raw = format!(
            r#"[{{"id":"3","name":"n","message":"kept","created_at":"2024-01-02T03:04:05Z"}},
                {{"id":"2","name":"n","message":"   ","created_at":"2024-01-02T03:04:05Z"}},
                {{"id":"1","name":"n","message":"{long}","created_at":"2024-01-02T03:04:05Z"}}]"#
        );
        kv.set(POSTS_KEY, &raw).unwrap();
        let store = WallStore::new(kv);

        let posts = store.load_feed(280);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].message, "kept");
    }

    #[test]
    fn non_image_profile_photo_is_discarded() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(PROFILE_PHOTO_KEY, "\"not a uri\"").unwrap();
        let store = WallStore::new(kv);
        assert_eq!(store.load_profile_photo(), None);
    }

    #[test]
    fn profile_photo_is_stored_raw() {
        let kv = Arc::new(MemoryStore::new());
        let store = WallStore::new(kv.clone());
        store
            .save_profile_photo("data:image/jpeg;base64,/9j/")
            .unwrap();
        assert_eq!(
            kv.get(PROFILE_PHOTO_KEY).unwrap().as_deref(),
            Some("data:image/jpeg;base64,/9j/")
        );
    }
}
