//! Idempotency guard over the memory store.
//!
//! Existence of a processed-record for (post, agent) means the post has been
//! handled. Records are created, never deleted. The check and the write are
//! not atomic across the store boundary, so two racing pipeline runs can
//! both pass the check before either records; the accepted guarantee is
//! at-least-once, with exactly-once after the record is durable.

use std::sync::Arc;

use tracing::debug;

use crate::error::WatchError;
use crate::memory::{processed_record_id, Memory, MemoryStore};

/// Per-agent dedup store backed by the external memory store.
#[derive(Clone)]
pub struct DedupStore {
    memory: Arc<dyn MemoryStore>,
    agent_id: String,
}

impl DedupStore {
    pub fn new(memory: Arc<dyn MemoryStore>, agent_id: impl Into<String>) -> Self {
        Self {
            memory,
            agent_id: agent_id.into(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Whether a processed-record exists for this post.
    pub async fn has_processed(&self, post_id: &str) -> Result<bool, WatchError> {
        let id = processed_record_id(post_id, &self.agent_id);
        Ok(self.memory.get_by_id(&id).await?.is_some())
    }

    /// Record the post as handled. Idempotent: an existing record is left
    /// untouched.
    pub async fn mark_processed(&self, post_id: &str, mut record: Memory) -> Result<(), WatchError> {
        let id = processed_record_id(post_id, &self.agent_id);
        if self.memory.get_by_id(&id).await?.is_some() {
            debug!(post_id = %post_id, "post already marked processed");
            return Ok(());
        }
        record.id = id;
        record.agent_id = self.agent_id.clone();
        self.memory.create(record).await
    }
}
