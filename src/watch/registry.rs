//! Watcher registry: keeps the running poller set consistent with the
//! desired username list.
//!
//! Mutation happens only from the reconciliation loop's own tick (single
//! writer), so the registry needs no lock of its own; pollers only observe
//! their cancellation tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

use crate::cache::CacheStore;
use crate::config::WatchSettings;
use crate::feed::FeedSource;
use crate::pipeline::ResponsePipeline;
use crate::watch::cancel::CancelToken;
use crate::watch::poller::FeedPoller;

/// A running watcher: the poller, its cancellation token, and its task.
struct WatchTarget {
    poller: Arc<FeedPoller>,
    token: Arc<CancelToken>,
    handle: JoinHandle<()>,
}

/// Registry of running per-author pollers.
pub struct WatcherRegistry {
    watchers: HashMap<String, WatchTarget>,
    feed: Arc<dyn FeedSource>,
    pipeline: Arc<ResponsePipeline>,
    cache: Arc<dyn CacheStore>,
    settings: WatchSettings,
}

impl WatcherRegistry {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        pipeline: Arc<ResponsePipeline>,
        cache: Arc<dyn CacheStore>,
        settings: WatchSettings,
    ) -> Self {
        Self {
            watchers: HashMap::new(),
            feed,
            pipeline,
            cache,
            settings,
        }
    }

    /// Usernames with a running poller, sorted.
    pub fn watched(&self) -> Vec<String> {
        let mut usernames: Vec<String> = self.watchers.keys().cloned().collect();
        usernames.sort();
        usernames
    }

    pub fn is_watching(&self, username: &str) -> bool {
        self.watchers.contains_key(username)
    }

    /// The running poller for a username, if any.
    pub fn poller(&self, username: &str) -> Option<Arc<FeedPoller>> {
        self.watchers
            .get(username)
            .map(|target| Arc::clone(&target.poller))
    }

    /// Make the running set equal to `desired`: cancel pollers for removed
    /// usernames, start pollers for new ones. Starts are staggered to avoid
    /// a thundering herd of initial fetches.
    pub async fn reconcile(&mut self, desired: &[String]) {
        let stale: Vec<String> = self
            .watchers
            .keys()
            .filter(|username| !desired.contains(username))
            .cloned()
            .collect();
        for username in stale {
            self.stop_watching(&username);
        }

        for username in desired {
            if !self.watchers.contains_key(username) {
                self.start_watching(username, self.settings.poll_interval());
                sleep(self.settings.start_stagger()).await;
            }
        }
    }

    /// Start a poller for a username. Idempotent: an existing poller for
    /// the same username is stopped first.
    pub fn start_watching(&mut self, username: &str, interval: Duration) {
        self.stop_watching(username);

        info!(username = %username, "starting watcher");
        let poller = Arc::new(FeedPoller::new(
            username,
            Arc::clone(&self.feed),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.cache),
            self.settings.page_size,
            self.settings.item_delay(),
        ));
        let token = Arc::new(CancelToken::new());
        let handle = tokio::spawn(Arc::clone(&poller).run(interval, Arc::clone(&token)));

        self.watchers
            .insert(username.to_string(), WatchTarget { poller, token, handle });
    }

    /// Cancel a username's poller. An in-flight tick completes on its own.
    pub fn stop_watching(&mut self, username: &str) {
        if let Some(target) = self.watchers.remove(username) {
            target.token.cancel();
            info!(username = %username, "stopped watcher");
        }
    }

    /// Cancel every poller and wait for their tasks to finish.
    pub async fn stop_all(&mut self) {
        let targets: Vec<(String, WatchTarget)> = self.watchers.drain().collect();
        for (username, target) in targets {
            target.token.cancel();
            let _ = target.handle.await;
            info!(username = %username, "stopped watcher");
        }
    }
}
