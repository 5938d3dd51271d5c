//! One-shot fetch-and-process for explicitly configured post ids.
//!
//! Unlike a poller this is not a continuous watch: each configured id is
//! checked once per reconciliation pass, and the dedup store keeps repeat
//! passes from re-processing a handled post.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::AgentConfig;
use crate::context::ContextBuilder;
use crate::dedup::DedupStore;
use crate::error::WatchError;
use crate::feed::FeedSource;
use crate::pipeline::{PipelineOutcome, ResponsePipeline};

pub struct SinglePostFetcher {
    agent: AgentConfig,
    feed: Arc<dyn FeedSource>,
    context: Arc<ContextBuilder>,
    pipeline: Arc<ResponsePipeline>,
    dedup: DedupStore,
    item_delay: Duration,
}

impl SinglePostFetcher {
    pub fn new(
        agent: AgentConfig,
        feed: Arc<dyn FeedSource>,
        context: Arc<ContextBuilder>,
        pipeline: Arc<ResponsePipeline>,
        dedup: DedupStore,
        item_delay: Duration,
    ) -> Self {
        Self {
            agent,
            feed,
            context,
            pipeline,
            dedup,
            item_delay,
        }
    }

    /// Fetch and process one post id. Returns `None` when the id never
    /// reached the pipeline: already handled, missing, or authored by the
    /// agent itself.
    pub async fn process_one(&self, post_id: &str) -> Result<Option<PipelineOutcome>, WatchError> {
        if self.dedup.has_processed(post_id).await? {
            debug!(post_id = %post_id, "post already handled");
            return Ok(None);
        }

        let Some(post) = self.feed.get_post_by_id(post_id).await? else {
            warn!(post_id = %post_id, "post not found");
            return Ok(None);
        };

        if post.is_authored_by(&self.agent.username) {
            debug!(post_id = %post_id, "skipping own post");
            return Ok(None);
        }

        let thread = self.context.build_thread(&post).await?;
        let outcome = self.pipeline.handle(&post, thread).await?;
        debug!(post_id = %post_id, outcome = ?outcome, "finished processing post");
        Ok(Some(outcome))
    }

    /// Process a list of ids sequentially with a fixed inter-id delay. An
    /// error on one id is logged and never aborts the rest of the list.
    pub async fn process_all(&self, post_ids: &[String]) {
        for post_id in post_ids {
            if let Err(err) = self.process_one(post_id).await {
                error!(post_id = %post_id, error = %err, "failed to process post");
            }
            sleep(self.item_delay).await;
        }
    }
}
