use chrono::{DateTime, Utc};

use crate::config::{ProfileConfig, WallConfig};
use crate::format;
use crate::persist::WallStore;
use crate::photo::{self, DecodeResult, PhotoError, Slot};
use crate::post::{IdGenerator, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub message: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub networks: String,
    pub current_city: String,
}

impl From<&ProfileConfig> for Profile {
    fn from(cfg: &ProfileConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            networks: cfg.networks.clone(),
            current_city: cfg.current_city.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_chars: usize,
    pub max_photo_bytes: u64,
}

impl From<&WallConfig> for Limits {
    fn from(cfg: &WallConfig) -> Self {
        Self {
            max_chars: cfg.max_chars,
            max_photo_bytes: cfg.max_photo_bytes,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&WallConfig::default())
    }
}

/// In-memory working copy of the wall. The only writer to the store.
pub struct FeedController {
    store: WallStore,
    profile: Profile,
    limits: Limits,
    posts: Vec<Post>,
    profile_photo: Option<String>,
    draft: Draft,
    phase: Phase,
    hydrated: bool,
    ids: IdGenerator,
    generations: [u64; 2],
}

impl FeedController {
    pub fn new(store: WallStore, profile: Profile, limits: Limits) -> Self {
        Self {
            store,
            profile,
            limits,
            posts: Vec::new(),
            profile_photo: None,
            draft: Draft::default(),
            phase: Phase::Idle,
            hydrated: false,
            ids: IdGenerator::new(),
            generations: [0; 2],
        }
    }

    /// Loads the feed and profile photo. Only the first call has any effect.
    pub fn hydrate(&mut self) {
        if self.hydrated {
            return;
        }
        self.hydrated = true;
        self.posts = self.store.load_feed(self.limits.max_chars);
        self.profile_photo = self.store.load_profile_photo();
        self.ids.observe(&self.posts);
        tracing::info!(
            posts = self.posts.len(),
            profile_photo = self.profile_photo.is_some(),
            "wall hydrated"
        );
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_photo(&self) -> Option<&str> {
        self.profile_photo.as_deref()
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_chars(&self) -> i64 {
        format::remaining_chars(&self.draft.message, self.limits.max_chars)
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Idle && !self.draft.message.trim().is_empty()
    }

    /// Replaces the draft verbatim, cut to the character cap.
    pub fn set_draft_message(&mut self, text: &str) {
        self.draft.message = text.chars().take(self.limits.max_chars).collect();
    }

    /// Appends one keystroke. Returns false when the cap would be exceeded.
    pub fn push_draft_char(&mut self, ch: char) -> bool {
        if self.phase == Phase::Submitting {
            return false;
        }
        if self.draft.message.chars().count() >= self.limits.max_chars {
            return false;
        }
        self.draft.message.push(ch);
        true
    }

    pub fn pop_draft_char(&mut self) -> Option<char> {
        self.draft.message.pop()
    }

    pub fn set_draft_photo(&mut self, bytes: &[u8]) -> Result<(), PhotoError> {
        let uri = photo::encode_data_uri(bytes, self.limits.max_photo_bytes)?;
        self.draft.photo = Some(uri);
        Ok(())
    }

    pub fn clear_draft_photo(&mut self) {
        self.draft.photo = None;
    }

    pub fn set_profile_photo(&mut self, bytes: &[u8]) -> Result<(), PhotoError> {
        let uri = photo::encode_data_uri(bytes, self.limits.max_photo_bytes)?;
        self.replace_profile_photo(uri);
        Ok(())
    }

    fn replace_profile_photo(&mut self, uri: String) {
        if let Err(err) = self.store.save_profile_photo(&uri) {
            tracing::warn!(error = %format!("{err:#}"), "profile photo not persisted");
        }
        self.profile_photo = Some(uri);
    }

    /// Starts an asynchronous decode for `slot`; the returned generation
    /// supersedes every earlier request for the same slot.
    pub fn begin_decode(&mut self, slot: Slot) -> u64 {
        let counter = &mut self.generations[slot_index(slot)];
        *counter += 1;
        *counter
    }

    /// Applies a finished decode. Results from superseded requests and
    /// failed decodes leave state untouched; returns whether state changed.
    pub fn apply_decoded(&mut self, result: DecodeResult) -> Result<bool, PhotoError> {
        if result.generation != self.generations[slot_index(result.slot)] {
            tracing::debug!(slot = ?result.slot, generation = result.generation, "stale decode dropped");
            return Ok(false);
        }
        let uri = result.outcome?;
        match result.slot {
            Slot::Draft => self.draft.photo = Some(uri),
            Slot::Profile => self.replace_profile_photo(uri),
        }
        Ok(true)
    }

    pub fn submit(&mut self) -> Option<&Post> {
        self.submit_at(Utc::now())
    }

    /// Publishes the draft as a new post stamped `now`. Does nothing while a
    /// submit is in flight or when the trimmed draft is empty.
    pub fn submit_at(&mut self, now: DateTime<Utc>) -> Option<&Post> {
        if self.phase == Phase::Submitting {
            return None;
        }
        let message = self.draft.message.trim();
        if message.is_empty() {
            return None;
        }

        self.phase = Phase::Submitting;
        let post = Post {
            id: self.ids.next_id(now),
            name: self.profile.name.clone(),
            message: message.to_string(),
            photo: self.draft.photo.take(),
            created_at: now,
        };
        self.posts.insert(0, post);
        if let Err(err) = self.store.save_feed(&self.posts) {
            tracing::warn!(error = %format!("{err:#}"), "feed not persisted");
        }
        self.draft = Draft::default();
        self.phase = Phase::Idle;

        let post = &self.posts[0];
        tracing::info!(id = %post.id, chars = post.message.chars().count(), photo = post.photo.is_some(), "post shared");
        Some(post)
    }
}

fn slot_index(slot: Slot) -> usize {
    match slot {
        Slot::Draft => 0,
        Slot::Profile => 1,
    }
}
