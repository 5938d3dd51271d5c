//! Reconciliation loop: the top-level driver of the watch lifecycle.
//!
//! On each wake the loop runs the single-post list, then reconciles the
//! watcher set against the configured usernames, then schedules its next
//! wake after a jittered delay. Failures inside a pass are isolated by the
//! components themselves; the loop only ends on explicit shutdown.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::FeedwatchConfig;
use crate::context::ContextBuilder;
use crate::dedup::DedupStore;
use crate::feed::{FeedSource, PublishService};
use crate::memory::MemoryStore;
use crate::pipeline::ResponsePipeline;
use crate::services::{ActionHooks, Classifier, Generator};
use crate::watch::cancel::CancelToken;
use crate::watch::registry::WatcherRegistry;
use crate::watch::single::SinglePostFetcher;

/// Composition root and scheduling loop for the watch core.
pub struct WatchRuntime {
    config: FeedwatchConfig,
    fetcher: SinglePostFetcher,
    registry: WatcherRegistry,
    shutdown: Arc<CancelToken>,
}

impl WatchRuntime {
    /// Wire the pipeline, fetcher, and registry from the configuration and
    /// the external collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: FeedwatchConfig,
        feed: Arc<dyn FeedSource>,
        memory: Arc<dyn MemoryStore>,
        cache: Arc<dyn CacheStore>,
        classifier: Arc<dyn Classifier>,
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn PublishService>,
        hooks: Arc<dyn ActionHooks>,
    ) -> Self {
        let context = Arc::new(ContextBuilder::new(
            Arc::clone(&feed),
            Arc::clone(&cache),
            config.agent.clone(),
            config.watch.timeline_limit,
        ));
        let dedup = DedupStore::new(Arc::clone(&memory), config.agent.agent_id.clone());
        let pipeline = Arc::new(ResponsePipeline::new(
            config.agent.clone(),
            Arc::clone(&context),
            dedup.clone(),
            memory,
            Arc::clone(&cache),
            classifier,
            generator,
            publisher,
            hooks,
        ));
        let fetcher = SinglePostFetcher::new(
            config.agent.clone(),
            Arc::clone(&feed),
            context,
            Arc::clone(&pipeline),
            dedup,
            config.watch.item_delay(),
        );
        let registry = WatcherRegistry::new(feed, pipeline, cache, config.watch.clone());

        Self {
            config,
            fetcher,
            registry,
            shutdown: Arc::new(CancelToken::new()),
        }
    }

    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> Arc<CancelToken> {
        Arc::clone(&self.shutdown)
    }

    /// Run until the shutdown token is cancelled, then stop all watchers.
    pub async fn run(mut self) {
        info!(
            post_count = self.config.watch.post_ids.len(),
            user_count = self.config.watch.usernames.len(),
            "watch loop started"
        );

        loop {
            self.pass().await;

            let delay = self.next_delay();
            debug!(delay_secs = delay.as_secs(), "scheduling next reconciliation");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        self.registry.stop_all().await;
        info!("watch loop stopped");
    }

    /// One reconciliation pass. Component-level error isolation means this
    /// never fails the loop.
    pub async fn pass(&mut self) {
        debug!("reconciliation pass");
        self.fetcher.process_all(&self.config.watch.post_ids).await;
        self.registry.reconcile(&self.config.watch.usernames).await;
    }

    /// Jittered delay, uniform over the configured range.
    fn next_delay(&self) -> Duration {
        let (min, max) = self.config.watch.jitter_range();
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    /// The registry, for inspection. Mutation stays with the loop's tick.
    pub fn registry(&self) -> &WatcherRegistry {
        &self.registry
    }
}
