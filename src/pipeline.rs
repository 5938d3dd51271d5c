//! Response pipeline.
//!
//! Strictly sequential state machine per post:
//! FETCH_CONTEXT -> CLASSIFY -> {IGNORE|STOP terminal} or
//! GENERATE -> PUBLISH -> RECORD -> EVALUATE.
//!
//! Concurrent runs for different posts are fine; the dedup store is the
//! idempotency guard. Failures from GENERATE onward are caught here and
//! logged so a slow or broken collaborator never propagates past one run.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::{transcript_key, CacheStore};
use crate::config::AgentConfig;
use crate::context::{ContextBuilder, ConversationContext};
use crate::dedup::DedupStore;
use crate::error::WatchError;
use crate::feed::PublishService;
use crate::memory::{post_memory_id, room_id, Memory, MemoryStore};
use crate::post::Post;
use crate::services::{ActionHooks, Classifier, GeneratedReply, Generator, ResponseDecision, CONTINUE_ACTION};

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The post was authored by the agent itself.
    SkippedSelf,
    /// The post carried no text.
    SkippedEmpty,
    /// A processed-record already exists for this post.
    AlreadyHandled,
    /// Classification declined to respond.
    Declined(ResponseDecision),
    /// Generation returned empty text; treated like IGNORE.
    EmptyGeneration,
    /// Reply published and recorded; number of resulting memories.
    Replied { memories: usize },
    /// The act phase failed after a RESPOND decision. Logged, not rethrown;
    /// the post stays unmarked unless RECORD already ran.
    Failed,
}

/// Drives one post through context assembly, classification, generation,
/// publishing, and recording.
pub struct ResponsePipeline {
    agent: AgentConfig,
    context: Arc<ContextBuilder>,
    dedup: DedupStore,
    memory: Arc<dyn MemoryStore>,
    cache: Arc<dyn CacheStore>,
    classifier: Arc<dyn Classifier>,
    generator: Arc<dyn Generator>,
    publisher: Arc<dyn PublishService>,
    hooks: Arc<dyn ActionHooks>,
}

impl ResponsePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: AgentConfig,
        context: Arc<ContextBuilder>,
        dedup: DedupStore,
        memory: Arc<dyn MemoryStore>,
        cache: Arc<dyn CacheStore>,
        classifier: Arc<dyn Classifier>,
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn PublishService>,
        hooks: Arc<dyn ActionHooks>,
    ) -> Self {
        Self {
            agent,
            context,
            dedup,
            memory,
            cache,
            classifier,
            generator,
            publisher,
            hooks,
        }
    }

    /// Run one post through the pipeline. `thread` is the reply ancestry
    /// when the caller reconstructed it; pollers pass an empty thread.
    pub async fn handle(
        &self,
        post: &Post,
        thread: Vec<Post>,
    ) -> Result<PipelineOutcome, WatchError> {
        if post.is_authored_by(&self.agent.username) {
            debug!(post_id = %post.id, "skipping own post");
            return Ok(PipelineOutcome::SkippedSelf);
        }
        if !post.has_text() {
            debug!(post_id = %post.id, "skipping post with no text");
            return Ok(PipelineOutcome::SkippedEmpty);
        }
        if self.dedup.has_processed(&post.id).await? {
            debug!(post_id = %post.id, "post already handled");
            return Ok(PipelineOutcome::AlreadyHandled);
        }

        info!(post_id = %post.id, author = %post.author.username, "handling post");
        let context = self.context.build(post, thread).await?;
        self.save_inbound(post).await?;

        let decision = self.classifier.classify(&context).await?;
        if decision != ResponseDecision::Respond {
            debug!(post_id = %post.id, decision = ?decision, "not responding");
            return Ok(PipelineOutcome::Declined(decision));
        }

        let mut reply = self.generator.generate(&context).await?;
        if reply.text.trim().is_empty() {
            debug!(post_id = %post.id, "generation returned empty text, ignoring");
            return Ok(PipelineOutcome::EmptyGeneration);
        }
        reply.reply_to = Some(post_memory_id(&post.id, &self.agent.agent_id));

        match self.act(post, &context, &reply).await {
            Ok(memories) => {
                info!(post_id = %post.id, memories, "reply published");
                Ok(PipelineOutcome::Replied { memories })
            }
            Err(err) => {
                error!(post_id = %post.id, error = %err, "reply delivery failed");
                Ok(PipelineOutcome::Failed)
            }
        }
    }

    /// PUBLISH -> RECORD -> EVALUATE. Returns the number of reply memories.
    async fn act(
        &self,
        post: &Post,
        context: &ConversationContext,
        reply: &GeneratedReply,
    ) -> Result<usize, WatchError> {
        let mut memories = self.publisher.publish(&reply.text, post).await?;

        // The final segment of a split thread carries the generator's action
        // tag; earlier segments are continuations.
        let last = memories.len().saturating_sub(1);
        for (index, memory) in memories.iter_mut().enumerate() {
            memory.action = if index == last {
                reply.action.clone()
            } else {
                Some(CONTINUE_ACTION.to_string())
            };
            memory.in_reply_to = reply.reply_to.clone();
        }

        for memory in &memories {
            self.memory.create(memory.clone()).await?;
        }
        self.dedup
            .mark_processed(&post.id, self.inbound_memory(post))
            .await?;

        let inbound = self.inbound_memory(post);
        self.hooks.evaluate(&inbound).await?;
        self.hooks.process(&inbound, &memories).await?;

        self.write_transcript(post, context, reply);
        Ok(memories.len())
    }

    /// Persist the inbound post as a memory if it is not stored yet.
    async fn save_inbound(&self, post: &Post) -> Result<(), WatchError> {
        let id = post_memory_id(&post.id, &self.agent.agent_id);
        if self.memory.get_by_id(&id).await?.is_some() {
            return Ok(());
        }
        debug!(post_id = %post.id, "saving inbound post memory");
        self.memory.create(self.inbound_memory(post)).await
    }

    /// Memory-record view of an inbound post.
    fn inbound_memory(&self, post: &Post) -> Memory {
        Memory {
            id: post_memory_id(&post.id, &self.agent.agent_id),
            agent_id: self.agent.agent_id.clone(),
            user_id: post.author.id.clone(),
            room_id: room_id(&post.conversation_id, &self.agent.agent_id),
            text: post.text.clone(),
            action: None,
            in_reply_to: post
                .in_reply_to_id
                .as_deref()
                .map(|id| post_memory_id(id, &self.agent.agent_id)),
            url: Some(post.permalink.clone()),
            created_at: post.created_at,
        }
    }

    /// Best-effort debug transcript, keyed by the triggering post id.
    fn write_transcript(&self, post: &Post, context: &ConversationContext, reply: &GeneratedReply) {
        let body = format!(
            "Context:\n\n{}\n\n{}\n\nSelected Post: {} - {}: {}\nAgent's Output:\n{}",
            context.timeline, context.current_post, post.id, post.author.username, post.text,
            reply.text
        );
        if let Err(err) = self.cache.put(&transcript_key(&post.id), &body) {
            warn!(post_id = %post.id, error = %err, "failed to write generation transcript");
        }
    }
}
