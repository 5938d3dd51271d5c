//! Per-author incremental poll loop.
//!
//! Each poller owns a last-check watermark separating already-seen from
//! not-yet-seen posts for its author. The watermark is persisted best-effort
//! through the cache store; the dedup store remains the real idempotency
//! guard, so a lost watermark only costs re-fetches.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::cache::{watermark_key, CacheStore};
use crate::error::WatchError;
use crate::feed::FeedSource;
use crate::pipeline::ResponsePipeline;
use crate::watch::cancel::CancelToken;

/// Incremental poller for one watched author.
pub struct FeedPoller {
    username: String,
    feed: Arc<dyn FeedSource>,
    pipeline: Arc<ResponsePipeline>,
    cache: Arc<dyn CacheStore>,
    watermark: RwLock<Option<DateTime<Utc>>>,
    page_size: usize,
    item_delay: Duration,
}

impl FeedPoller {
    pub fn new(
        username: impl Into<String>,
        feed: Arc<dyn FeedSource>,
        pipeline: Arc<ResponsePipeline>,
        cache: Arc<dyn CacheStore>,
        page_size: usize,
        item_delay: Duration,
    ) -> Self {
        let username = username.into();
        let watermark = RwLock::new(load_watermark(cache.as_ref(), &username));
        Self {
            username,
            feed,
            pipeline,
            cache,
            watermark,
            page_size,
            item_delay,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        *self.watermark.read()
    }

    /// One poll pass: fetch posts newer than the watermark, hand each to
    /// the pipeline, then advance the watermark to the newest creation time
    /// in the page. Returns the watermark after the pass.
    pub async fn tick(&self) -> Result<Option<DateTime<Utc>>, WatchError> {
        debug!(username = %self.username, "checking for new posts");

        let author = self
            .feed
            .get_author_by_username(&self.username)
            .await?
            .ok_or_else(|| WatchError::AuthorNotFound(self.username.clone()))?;

        let since = self.watermark();
        let page = self
            .feed
            .get_user_posts(&author.id, since, self.page_size)
            .await?;

        if page.is_empty() {
            debug!(username = %self.username, "no new posts");
            return Ok(since);
        }

        for item in &page.items {
            let Some(post) = page.map_item(item) else {
                warn!(
                    username = %self.username,
                    post_id = %item.id,
                    "author missing from page includes, skipping item"
                );
                continue;
            };
            if let Err(err) = self.pipeline.handle(&post, Vec::new()).await {
                error!(
                    username = %self.username,
                    post_id = %post.id,
                    error = %err,
                    "failed to process post"
                );
            }
            sleep(self.item_delay).await;
        }

        if let Some(newest) = page.newest_created_at() {
            self.advance_watermark(newest);
        }
        Ok(self.watermark())
    }

    /// Advance the watermark. It never moves backward.
    fn advance_watermark(&self, to: DateTime<Utc>) {
        {
            let mut watermark = self.watermark.write();
            if watermark.is_some_and(|current| to <= current) {
                return;
            }
            *watermark = Some(to);
        }
        if let Err(err) = self
            .cache
            .put(&watermark_key(&self.username), &to.to_rfc3339())
        {
            warn!(
                username = %self.username,
                error = %err,
                "failed to persist watermark, keeping in-memory value"
            );
        }
    }

    /// Timer loop: an immediate tick, then one per interval until the token
    /// is cancelled. A failed tick is logged and the timer continues.
    pub async fn run(self: Arc<Self>, interval: Duration, token: Arc<CancelToken>) {
        info!(username = %self.username, interval_secs = interval.as_secs(), "watcher started");
        loop {
            if token.is_cancelled() {
                break;
            }
            if let Err(err) = self.tick().await {
                warn!(username = %self.username, error = %err, "poll tick failed");
            }
            tokio::select! {
                _ = sleep(interval) => {}
                _ = token.cancelled() => break,
            }
        }
        info!(username = %self.username, "watcher stopped");
    }
}

/// Load the persisted watermark for a username. Unreadable or unparseable
/// values are ignored with a warning.
fn load_watermark(cache: &dyn CacheStore, username: &str) -> Option<DateTime<Utc>> {
    let raw = match cache.get(&watermark_key(username)) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(username = %username, error = %err, "failed to load watermark");
            return None;
        }
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => {
            let watermark = parsed.with_timezone(&Utc);
            debug!(username = %username, watermark = %watermark, "loaded watermark");
            Some(watermark)
        }
        Err(_) => {
            warn!(username = %username, value = %raw, "invalid persisted watermark, ignoring");
            None
        }
    }
}
