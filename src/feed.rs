//! Feed-source boundary.
//!
//! The wire protocol lives behind [`FeedSource`]; this module defines the
//! page payload an author-timeline fetch hands back and the mapping from
//! that payload into the canonical [`Post`] model. Items whose author is
//! missing from the page's includes cannot be mapped and are skipped by
//! the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WatchError;
use crate::post::{Author, Engagement, MediaKind, MediaRef, Post};

/// Base URL used when constructing post permalinks.
pub const PERMALINK_BASE: &str = "https://twitter.com";

/// How a timeline item references another post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    RepliedTo,
    Quoted,
    Reposted,
}

/// Reference from a timeline item to another post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: RefKind,
    pub id: String,
}

/// One item of an author-timeline page, still in the source API's shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub references: Vec<ItemRef>,
    #[serde(default)]
    pub media_keys: Vec<String>,
    #[serde(default)]
    pub metrics: Engagement,
    #[serde(default)]
    pub sensitive: bool,
}

impl TimelineItem {
    fn reference(&self, kind: RefKind) -> Option<&str> {
        self.references
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.id.as_str())
    }
}

/// Media object from a page's includes table, keyed by media key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaObject {
    pub key: String,
    pub kind: MediaKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// A fetched timeline page: items plus the includes needed to resolve them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelinePage {
    #[serde(default)]
    pub items: Vec<TimelineItem>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub media: Vec<MediaObject>,
}

impl TimelinePage {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an included author by id.
    pub fn author(&self, id: &str) -> Option<&Author> {
        self.authors.iter().find(|a| a.id == id)
    }

    /// Newest creation time across the page. No delivery order is assumed
    /// from the source, so this takes the maximum rather than the first.
    pub fn newest_created_at(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|item| item.created_at).max()
    }

    /// Map an item against the page's includes. Returns `None` when the
    /// item's author is absent from the includes.
    pub fn map_item(&self, item: &TimelineItem) -> Option<Post> {
        let author = self.author(&item.author_id)?.clone();

        let in_reply_to_id = item.reference(RefKind::RepliedTo).map(str::to_string);
        let quoted_id = item.reference(RefKind::Quoted).map(str::to_string);
        let reposted_id = item.reference(RefKind::Reposted).map(str::to_string);

        let media = item
            .media_keys
            .iter()
            .filter_map(|key| self.media.iter().find(|m| &m.key == key))
            .map(|m| MediaRef {
                kind: m.kind,
                url: m.url.clone(),
                preview_url: m.preview_url.clone(),
            })
            .collect();

        let permalink = permalink(&author.username, &item.id);

        Some(Post {
            id: item.id.clone(),
            text: item.text.clone(),
            created_at: item.created_at,
            conversation_id: item.conversation_id.clone(),
            is_reply: in_reply_to_id.is_some(),
            is_quote: quoted_id.is_some(),
            is_repost: reposted_id.is_some(),
            in_reply_to_id,
            quoted_id,
            reposted_id,
            media,
            metrics: item.metrics,
            sensitive: item.sensitive,
            permalink,
            author,
        })
    }
}

/// Stable web URL of a post.
pub fn permalink(username: &str, post_id: &str) -> String {
    format!("{}/{}/status/{}", PERMALINK_BASE, username, post_id)
}

/// External feed source contract.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch a single post by id. `None` when it does not exist.
    async fn get_post_by_id(&self, id: &str) -> Result<Option<Post>, WatchError>;

    /// Resolve a username to an author. `None` when unknown.
    async fn get_author_by_username(&self, username: &str)
        -> Result<Option<Author>, WatchError>;

    /// Recent original posts of an author (reposts and plain replies are
    /// excluded source-side), bounded by `page_size` and optionally
    /// restricted to posts newer than `since`.
    async fn get_user_posts(
        &self,
        author_id: &str,
        since: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Result<TimelinePage, WatchError>;

    /// The agent's own home timeline, newest first.
    async fn get_home_timeline(&self, limit: usize) -> Result<Vec<Post>, WatchError>;
}

/// External publish service contract.
///
/// Publishing may split long text into a thread; one memory record is
/// returned per published segment, in publish order.
#[async_trait]
pub trait PublishService: Send + Sync {
    async fn publish(
        &self,
        text: &str,
        in_reply_to: &Post,
    ) -> Result<Vec<crate::memory::Memory>, WatchError>;
}
