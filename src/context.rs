//! Conversation context assembly.
//!
//! Builds the ephemeral per-post context the classifier and generator see:
//! the formatted current post, a cached snapshot of the agent's home
//! timeline, and the reconstructed reply-thread ancestry of the post.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStore, HOME_TIMELINE_KEY};
use crate::config::AgentConfig;
use crate::error::WatchError;
use crate::feed::FeedSource;
use crate::post::Post;

/// Upper bound on reply-ancestry reconstruction.
const MAX_THREAD_DEPTH: usize = 20;

/// Ephemeral context for one pipeline run. Discarded afterwards.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub post: Post,
    /// Formatted block for the triggering post.
    pub current_post: String,
    /// Formatted home-timeline snapshot.
    pub timeline: String,
    /// Reply ancestry of the post, oldest first. Empty for thread roots.
    pub thread: Vec<Post>,
}

/// Assembles conversation context from the feed and the cache store.
pub struct ContextBuilder {
    feed: Arc<dyn FeedSource>,
    cache: Arc<dyn CacheStore>,
    agent: AgentConfig,
    timeline_limit: usize,
}

impl ContextBuilder {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        cache: Arc<dyn CacheStore>,
        agent: AgentConfig,
        timeline_limit: usize,
    ) -> Self {
        Self {
            feed,
            cache,
            agent,
            timeline_limit,
        }
    }

    /// Assemble the context for one post.
    pub async fn build(
        &self,
        post: &Post,
        thread: Vec<Post>,
    ) -> Result<ConversationContext, WatchError> {
        let snapshot = self.home_timeline_snapshot().await?;
        Ok(ConversationContext {
            current_post: format_post(post),
            timeline: format_timeline(&self.agent.display_name, &snapshot),
            post: post.clone(),
            thread,
        })
    }

    /// Home-timeline snapshot, fetched once and cached as JSON. Reused
    /// across posts until the cache key is removed externally.
    async fn home_timeline_snapshot(&self) -> Result<Vec<Post>, WatchError> {
        match self.cache.get(HOME_TIMELINE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Post>>(&raw) {
                Ok(posts) => return Ok(posts),
                Err(err) => {
                    warn!(error = %err, "home-timeline snapshot is corrupt, refetching");
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "failed to read home-timeline snapshot");
            }
        }

        let posts = self.feed.get_home_timeline(self.timeline_limit).await?;
        debug!(count = posts.len(), "fetched home timeline");
        match serde_json::to_string_pretty(&posts) {
            Ok(json) => {
                if let Err(err) = self.cache.put(HOME_TIMELINE_KEY, &json) {
                    warn!(error = %err, "failed to persist home-timeline snapshot");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode home-timeline snapshot"),
        }
        Ok(posts)
    }

    /// Reconstruct the reply ancestry of a post, oldest first.
    ///
    /// Walks the `in_reply_to_id` chain, fetching each ancestor. Stops at
    /// thread roots, unknown posts, cycles, and [`MAX_THREAD_DEPTH`].
    pub async fn build_thread(&self, post: &Post) -> Result<Vec<Post>, WatchError> {
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(post.id.clone());

        let mut chain = Vec::new();
        let mut cursor = post.in_reply_to_id.clone();
        while let Some(id) = cursor {
            if chain.len() >= MAX_THREAD_DEPTH || !seen.insert(id.clone()) {
                break;
            }
            match self.feed.get_post_by_id(&id).await? {
                Some(ancestor) => {
                    cursor = ancestor.in_reply_to_id.clone();
                    chain.push(ancestor);
                }
                None => {
                    debug!(post_id = %id, "thread ancestor not found");
                    break;
                }
            }
        }

        chain.reverse();
        Ok(chain)
    }
}

/// Format a post the way prompts expect it.
pub fn format_post(post: &Post) -> String {
    format!(
        "  ID: {}\n  From: {} (@{})\n  Text: {}",
        post.id, post.author.display_name, post.author.username, post.text
    )
}

/// Format the home-timeline snapshot with the agent's heading.
pub fn format_timeline(display_name: &str, posts: &[Post]) -> String {
    let mut out = format!("# {}'s Home Timeline\n\n", display_name);
    for post in posts {
        out.push_str(&format!(
            "ID: {}\nFrom: {} (@{}){}\nText: {}\n---\n\n",
            post.id,
            post.author.display_name,
            post.author.username,
            post.in_reply_to_id
                .as_deref()
                .map(|id| format!(" In reply to: {}", id))
                .unwrap_or_default(),
            post.text
        ));
    }
    out
}
