use chrono::{DateTime, Utc};

use crate::controller::FeedController;
use crate::format;

pub const PROFILE_SUBTITLE: &str = "wall";
pub const EMPTY_PLACEHOLDER: &str = "No posts yet. Be the first to share!";
pub const COMPOSER_PLACEHOLDER: &str = "What's on your mind?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallView<'a> {
    pub profile: ProfileView<'a>,
    pub composer: ComposerView<'a>,
    pub posts: Vec<PostView<'a>>,
}

impl WallView<'_> {
    pub fn empty_placeholder(&self) -> Option<&'static str> {
        self.posts.is_empty().then_some(EMPTY_PLACEHOLDER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView<'a> {
    pub name: &'a str,
    pub subtitle: &'static str,
    /// Shown in place of the photo when none has been uploaded.
    pub initials: String,
    pub photo: Option<&'a str>,
    pub networks: &'a str,
    pub current_city: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerView<'a> {
    pub message: &'a str,
    pub remaining: i64,
    pub can_submit: bool,
    pub submitting: bool,
    pub has_photo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub message: &'a str,
    pub photo: Option<&'a str>,
    pub age: String,
}

pub fn project(controller: &FeedController, now: DateTime<Utc>) -> WallView<'_> {
    let profile = controller.profile();
    let draft = controller.draft();

    WallView {
        profile: ProfileView {
            name: &profile.name,
            subtitle: PROFILE_SUBTITLE,
            initials: format::initials(&profile.name),
            photo: controller.profile_photo(),
            networks: &profile.networks,
            current_city: &profile.current_city,
        },
        composer: ComposerView {
            message: &draft.message,
            remaining: controller.remaining_chars().max(0),
            can_submit: controller.can_submit(),
            submitting: controller.phase() == crate::controller::Phase::Submitting,
            has_photo: draft.photo.is_some(),
        },
        posts: controller
            .posts()
            .iter()
            .map(|post| PostView {
                id: &post.id,
                name: &post.name,
                message: &post.message,
                photo: post.photo.as_deref(),
                age: format::relative_time(post.created_at, now),
            })
            .collect(),
    }
}

/// Plain-text rendering of the wall, newest post first.
pub fn to_plain_text(view: &WallView<'_>) -> String {
    let mut out = String::new();
    out.push_str(view.profile.name);
    out.push_str(" · ");
    out.push_str(view.profile.subtitle);
    out.push('\n');
    out.push_str(&format!(
        "Networks: {}\nCurrent City: {}\n",
        view.profile.networks, view.profile.current_city
    ));

    if let Some(placeholder) = view.empty_placeholder() {
        out.push('\n');
        out.push_str(placeholder);
        out.push('\n');
        return out;
    }

    for post in &view.posts {
        out.push('\n');
        out.push_str(post.name);
        out.push_str(" · ");
        out.push_str(&post.age);
        out.push('\n');
        if post.photo.is_some() {
            out.push_str("[photo]\n");
        }
        out.push_str(post.message);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Limits, Profile};
    use crate::config::ProfileConfig;
    use crate::persist::WallStore;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn controller() -> FeedController {
        let mut controller = FeedController::new(
            WallStore::new(Arc::new(MemoryStore::new())),
            Profile::from(&ProfileConfig::default()),
            Limits::default(),
        );
        controller.hydrate();
        controller
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn empty_wall_shows_placeholder() {
        let controller = controller();
        let view = project(&controller, now());
        assert_eq!(view.empty_placeholder(), Some(EMPTY_PLACEHOLDER));
        assert_eq!(view.profile.initials, "CW");
        assert_eq!(view.profile.photo, None);
        assert!(!view.composer.can_submit);
        assert_eq!(view.composer.remaining, 280);
        assert!(to_plain_text(&view).contains(EMPTY_PLACEHOLDER));
    }

    #[test]
    fn placeholder_disappears_after_first_post() {
        let mut controller = controller();
        controller.set_draft_message("hello wall");
        controller.submit_at(now());

        let view = project(&controller, now() + Duration::seconds(90));
        assert_eq!(view.empty_placeholder(), None);
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].message, "hello wall");
        assert_eq!(view.posts[0].age, "1 min");

        let text = to_plain_text(&view);
        assert!(!text.contains(EMPTY_PLACEHOLDER));
        assert!(text.contains("Chibueze Williams · 1 min\nhello wall"));
    }

    #[test]
    fn ages_are_computed_at_projection_time() {
        let mut controller = controller();
        controller.set_draft_message("tick");
        controller.submit_at(now());
        assert_eq!(project(&controller, now()).posts[0].age, "now");
        assert_eq!(
            project(&controller, now() + Duration::hours(2)).posts[0].age,
            "2h"
        );
    }

    #[test]
    fn composer_reflects_draft() {
        let mut controller = controller();
        controller.set_draft_message("draft");
        let view = project(&controller, now());
        assert_eq!(view.composer.message, "draft");
        assert_eq!(view.composer.remaining, 275);
        assert!(view.composer.can_submit);
        assert!(!view.composer.submitting);
        assert!(!view.composer.has_photo);
    }
}
