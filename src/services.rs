//! Collaborator contracts for classification, generation, and post-reply
//! action hooks. The implementations live in the excluded agent runtime;
//! the pipeline only drives them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ConversationContext;
use crate::error::WatchError;
use crate::memory::Memory;

/// Outcome of the should-respond classification.
///
/// STOP and IGNORE have identical pipeline effects; any special treatment of
/// STOP (ending engagement with a thread) belongs to the conversation-state
/// consumer outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseDecision {
    Respond,
    Ignore,
    Stop,
}

/// Action tag applied to all but the last memory of a split reply thread.
pub const CONTINUE_ACTION: &str = "CONTINUE";

/// A generated reply, alive only within a single pipeline run.
#[derive(Debug, Clone)]
pub struct GeneratedReply {
    pub text: String,
    /// Action tag the generator attached, carried on the final reply memory.
    pub action: Option<String>,
    /// Derived memory id of the triggering post. Set by the pipeline before
    /// publishing.
    pub reply_to: Option<String>,
}

/// External should-respond classification capability.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, context: &ConversationContext)
        -> Result<ResponseDecision, WatchError>;
}

/// External reply generation capability.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, context: &ConversationContext)
        -> Result<GeneratedReply, WatchError>;
}

/// Opaque pass-through hooks into the agent runtime, invoked after a reply
/// has been published and recorded.
#[async_trait]
pub trait ActionHooks: Send + Sync {
    /// Evaluate the updated conversational state for the inbound message.
    async fn evaluate(&self, message: &Memory) -> Result<(), WatchError>;

    /// Process any actions attached to the published replies.
    async fn process(&self, message: &Memory, replies: &[Memory]) -> Result<(), WatchError>;
}
