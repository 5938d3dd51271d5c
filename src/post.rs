//! Canonical post model.
//!
//! Source-schema-independent representation of a feed item. Posts are mapped
//! once at the feed boundary and treated as immutable afterwards. The model
//! is serde-serializable because the home-timeline snapshot is persisted as
//! a JSON array of mapped posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a post author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

/// Kind of an attached media object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Reference to a media attachment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
    /// Preview image for video attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// Engagement metrics at fetch time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
    pub views: u64,
}

/// A canonical feed post. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Opaque post identifier from the source.
    pub id: String,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Identifier of the conversation (thread root) this post belongs to.
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reposted_id: Option<String>,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default)]
    pub is_repost: bool,
    #[serde(default)]
    pub is_quote: bool,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub metrics: Engagement,
    /// Source-side sensitivity flag.
    #[serde(default)]
    pub sensitive: bool,
    /// Stable web URL of the post.
    pub permalink: String,
}

impl Post {
    /// Whether the post carries any usable text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Whether the post was authored by the given username
    /// (feed usernames are case-insensitive).
    pub fn is_authored_by(&self, username: &str) -> bool {
        self.author.username.eq_ignore_ascii_case(username)
    }
}
