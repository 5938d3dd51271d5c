//! Feedwatch: incremental social-feed watching with a response pipeline.
//!
//! Continuously monitors a configured set of feed authors and individual
//! posts, deduplicates observed posts per agent, and drives each new post
//! through a classify -> generate -> publish pipeline exactly once. The
//! network client, classification/generation services, and long-term memory
//! store are external collaborators behind trait boundaries.

pub mod cache;
pub mod config;
pub mod context;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod logging;
pub mod memory;
pub mod pipeline;
pub mod post;
pub mod services;
pub mod watch;

pub use error::WatchError;
pub use post::Post;
