//! Shared in-memory fakes for the external collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use feedwatch::cache::CacheStore;
use feedwatch::config::{AgentConfig, WatchSettings};
use feedwatch::context::ConversationContext;
use feedwatch::error::WatchError;
use feedwatch::feed::{FeedSource, PublishService, TimelinePage};
use feedwatch::memory::{Memory, MemoryStore};
use feedwatch::post::{Author, Engagement, Post};
use feedwatch::services::{
    ActionHooks, Classifier, GeneratedReply, Generator, ResponseDecision,
};

pub fn agent() -> AgentConfig {
    AgentConfig {
        agent_id: "agent-1".to_string(),
        username: "botuser".to_string(),
        display_name: "Bot".to_string(),
    }
}

/// Watch settings with all inter-item delays zeroed for tests.
pub fn fast_settings() -> WatchSettings {
    WatchSettings {
        item_delay_ms: 0,
        start_stagger_ms: 0,
        poll_interval_secs: 3600,
        ..WatchSettings::default()
    }
}

pub fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

pub fn author(id: &str, username: &str) -> Author {
    Author {
        id: id.to_string(),
        username: username.to_string(),
        display_name: username.to_uppercase(),
    }
}

pub fn post(id: &str, username: &str, text: &str) -> Post {
    Post {
        id: id.to_string(),
        author: author(&format!("user-{}", username), username),
        text: text.to_string(),
        created_at: ts(12),
        conversation_id: id.to_string(),
        in_reply_to_id: None,
        quoted_id: None,
        reposted_id: None,
        is_reply: false,
        is_repost: false,
        is_quote: false,
        media: Vec::new(),
        metrics: Engagement::default(),
        sensitive: false,
        permalink: format!("https://twitter.com/{}/status/{}", username, id),
    }
}

/// In-memory feed source with scripted pages and call counters.
#[derive(Default)]
pub struct FakeFeed {
    pub posts: Mutex<HashMap<String, Post>>,
    pub authors: Mutex<HashMap<String, Author>>,
    /// Pages served per author id, consumed front-to-back; empty page when
    /// exhausted.
    pub pages: Mutex<HashMap<String, Vec<TimelinePage>>>,
    pub timeline: Mutex<Vec<Post>>,
    pub fail_user_posts: AtomicBool,
    pub user_posts_calls: AtomicUsize,
    pub timeline_calls: AtomicUsize,
    pub last_since: Mutex<Option<Option<DateTime<Utc>>>>,
}

impl FakeFeed {
    pub fn with_post(self, post: Post) -> Self {
        self.posts.lock().insert(post.id.clone(), post);
        self
    }

    pub fn with_author(self, author: Author) -> Self {
        self.authors.lock().insert(author.username.clone(), author);
        self
    }

    pub fn push_page(&self, author_id: &str, page: TimelinePage) {
        self.pages.lock().entry(author_id.to_string()).or_default().push(page);
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn get_post_by_id(&self, id: &str) -> Result<Option<Post>, WatchError> {
        Ok(self.posts.lock().get(id).cloned())
    }

    async fn get_author_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Author>, WatchError> {
        Ok(self.authors.lock().get(username).cloned())
    }

    async fn get_user_posts(
        &self,
        author_id: &str,
        since: Option<DateTime<Utc>>,
        _page_size: usize,
    ) -> Result<TimelinePage, WatchError> {
        self.user_posts_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_since.lock() = Some(since);
        if self.fail_user_posts.load(Ordering::SeqCst) {
            return Err(WatchError::FetchError("scripted failure".to_string()));
        }
        let mut pages = self.pages.lock();
        let page = match pages.get_mut(author_id) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => TimelinePage::default(),
        };
        Ok(page)
    }

    async fn get_home_timeline(&self, _limit: usize) -> Result<Vec<Post>, WatchError> {
        self.timeline_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.timeline.lock().clone())
    }
}

/// In-memory memory store.
#[derive(Default)]
pub struct InMemoryStore {
    pub records: Mutex<HashMap<String, Memory>>,
}

impl InMemoryStore {
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.lock().contains_key(id)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Memory>, WatchError> {
        Ok(self.records.lock().get(id).cloned())
    }

    async fn create(&self, memory: Memory) -> Result<(), WatchError> {
        self.records.lock().insert(memory.id.clone(), memory);
        Ok(())
    }
}

/// In-memory cache store.
#[derive(Default)]
pub struct MemCache {
    pub entries: Mutex<HashMap<String, String>>,
}

impl CacheStore for MemCache {
    fn get(&self, key: &str) -> Result<Option<String>, WatchError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), WatchError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), WatchError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Classifier returning a scripted decision for every post.
pub struct ScriptedClassifier {
    pub decision: Mutex<ResponseDecision>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    /// Ids of the thread ancestors seen in the most recent context.
    pub last_thread: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new(decision: ResponseDecision) -> Self {
        Self {
            decision: Mutex::new(decision),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_thread: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        context: &ConversationContext,
    ) -> Result<ResponseDecision, WatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_thread.lock() = context.thread.iter().map(|p| p.id.clone()).collect();
        if self.fail.load(Ordering::SeqCst) {
            return Err(WatchError::GenerationFailure("scripted failure".to_string()));
        }
        Ok(*self.decision.lock())
    }
}

/// Generator returning scripted text.
pub struct ScriptedGenerator {
    pub text: Mutex<String>,
    pub action: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
            action: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_action(text: &str, action: &str) -> Self {
        let generator = Self::new(text);
        *generator.action.lock() = Some(action.to_string());
        generator
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        _context: &ConversationContext,
    ) -> Result<GeneratedReply, WatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedReply {
            text: self.text.lock().clone(),
            action: self.action.lock().clone(),
            reply_to: None,
        })
    }
}

/// Publisher recording every publish call.
pub struct RecordingPublisher {
    /// (reply text, triggering post id) per publish call.
    pub published: Mutex<Vec<(String, String)>>,
    /// How many memories each publish yields (thread split simulation).
    pub segments: usize,
    pub fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::with_segments(1)
    }

    pub fn with_segments(segments: usize) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            segments,
            fail: AtomicBool::new(false),
        }
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().len()
    }
}

#[async_trait]
impl PublishService for RecordingPublisher {
    async fn publish(&self, text: &str, in_reply_to: &Post) -> Result<Vec<Memory>, WatchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WatchError::PublishFailure("scripted failure".to_string()));
        }
        self.published
            .lock()
            .push((text.to_string(), in_reply_to.id.clone()));

        let memories = (0..self.segments)
            .map(|index| Memory {
                id: format!("reply-{}-{}", in_reply_to.id, index),
                agent_id: String::new(),
                user_id: "agent".to_string(),
                room_id: in_reply_to.conversation_id.clone(),
                text: format!("segment {}", index),
                action: None,
                in_reply_to: None,
                url: None,
                created_at: Utc::now(),
            })
            .collect();
        Ok(memories)
    }
}

/// Hooks counting their invocations.
#[derive(Default)]
pub struct CountingHooks {
    pub evaluate_calls: AtomicUsize,
    pub process_calls: AtomicUsize,
}

#[async_trait]
impl ActionHooks for CountingHooks {
    async fn evaluate(&self, _message: &Memory) -> Result<(), WatchError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn process(&self, _message: &Memory, _replies: &[Memory]) -> Result<(), WatchError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// All collaborators wired to one pipeline, kept accessible for assertions.
pub struct Harness {
    pub agent: AgentConfig,
    pub feed: Arc<FakeFeed>,
    pub memory: Arc<InMemoryStore>,
    pub cache: Arc<MemCache>,
    pub classifier: Arc<ScriptedClassifier>,
    pub generator: Arc<ScriptedGenerator>,
    pub publisher: Arc<RecordingPublisher>,
    pub hooks: Arc<CountingHooks>,
    pub context: Arc<feedwatch::context::ContextBuilder>,
    pub dedup: feedwatch::dedup::DedupStore,
    pub pipeline: Arc<feedwatch::pipeline::ResponsePipeline>,
}

impl Harness {
    pub fn new(decision: ResponseDecision, reply_text: &str) -> Self {
        Self::build(
            Arc::new(FakeFeed::default()),
            Arc::new(ScriptedClassifier::new(decision)),
            Arc::new(ScriptedGenerator::new(reply_text)),
            Arc::new(RecordingPublisher::new()),
        )
    }

    pub fn build(
        feed: Arc<FakeFeed>,
        classifier: Arc<ScriptedClassifier>,
        generator: Arc<ScriptedGenerator>,
        publisher: Arc<RecordingPublisher>,
    ) -> Self {
        let agent = agent();
        let memory = Arc::new(InMemoryStore::default());
        let cache = Arc::new(MemCache::default());
        let hooks = Arc::new(CountingHooks::default());

        let context = Arc::new(feedwatch::context::ContextBuilder::new(
            feed.clone() as Arc<dyn FeedSource>,
            cache.clone() as Arc<dyn CacheStore>,
            agent.clone(),
            50,
        ));
        let dedup =
            feedwatch::dedup::DedupStore::new(memory.clone() as Arc<dyn MemoryStore>, &agent.agent_id);
        let pipeline = Arc::new(feedwatch::pipeline::ResponsePipeline::new(
            agent.clone(),
            context.clone(),
            dedup.clone(),
            memory.clone() as Arc<dyn MemoryStore>,
            cache.clone() as Arc<dyn CacheStore>,
            classifier.clone() as Arc<dyn Classifier>,
            generator.clone() as Arc<dyn Generator>,
            publisher.clone() as Arc<dyn PublishService>,
            hooks.clone() as Arc<dyn ActionHooks>,
        ));

        Self {
            agent,
            feed,
            memory,
            cache,
            classifier,
            generator,
            publisher,
            hooks,
            context,
            dedup,
            pipeline,
        }
    }
}
