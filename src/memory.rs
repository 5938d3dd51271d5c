//! Conversational memory records and the store boundary.
//!
//! The long-term memory store is an external collaborator; this module only
//! defines its contract and the deterministic id scheme the watch core keys
//! records by. The same (post, agent) pair always derives the same id, which
//! is what makes dedup survive restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// A single conversational memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub agent_id: String,
    /// Author of the content (the counterpart user, or the agent itself for
    /// its own replies).
    pub user_id: String,
    /// Conversation scope the record belongs to.
    pub room_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Derived id of the memory this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Derive a deterministic id from string parts (blake3, hex-encoded).
pub fn memory_id(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"-");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

/// Id under which an inbound post is stored as a memory for this agent.
pub fn post_memory_id(post_id: &str, agent_id: &str) -> String {
    memory_id(&[post_id, agent_id])
}

/// Id of the processed-record for a (post, agent) pair.
///
/// Distinct from [`post_memory_id`]: saving an inbound post for context must
/// not mark it handled, otherwise a post the agent decided to ignore would
/// never be reconsidered.
pub fn processed_record_id(post_id: &str, agent_id: &str) -> String {
    memory_id(&["processed", post_id, agent_id])
}

/// Id of the conversation room for a (conversation, agent) pair.
pub fn room_id(conversation_id: &str, agent_id: &str) -> String {
    memory_id(&[conversation_id, agent_id])
}

/// External memory store contract. Backs both conversational history and the
/// dedup guard.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<Memory>, WatchError>;
    async fn create(&self, memory: Memory) -> Result<(), WatchError>;
}
