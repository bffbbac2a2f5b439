use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single wall entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// A stored post is usable only if its message is non-blank and within
    /// the character cap.
    pub fn is_well_formed(&self, max_chars: usize) -> bool {
        !self.message.trim().is_empty() && self.message.chars().count() <= max_chars
    }
}

/// Largest millisecond timestamp chrono can represent (year 9999). Ids above
/// it cannot come from the clock and are not used as a floor.
const MAX_CLOCK_ID: i64 = 253_402_300_799_999;

/// Issues post ids from the millisecond clock, bumping past the last id so
/// two posts created within the same millisecond never collide.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures future ids sort after every numeric id already in `posts`.
    pub fn observe<'a>(&mut self, posts: impl IntoIterator<Item = &'a Post>) {
        for post in posts {
            match post.id.parse::<i64>() {
                Ok(value) if value <= MAX_CLOCK_ID => self.last = self.last.max(value),
                _ => {}
            }
        }
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let candidate = now.timestamp_millis();
        let id = if candidate > self.last {
            candidate
        } else {
            self.last.saturating_add(1)
        };
        self.last = id;
        id.to_string()
    }
}
