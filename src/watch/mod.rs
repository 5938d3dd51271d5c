//! Watcher lifecycle: cancellation, per-author pollers, the single-post
//! fetcher, the registry, and the reconciliation loop that drives them.

pub mod cancel;
pub mod poller;
pub mod registry;
pub mod runtime;
pub mod single;

pub use cancel::CancelToken;
pub use poller::FeedPoller;
pub use registry::WatcherRegistry;
pub use runtime::WatchRuntime;
pub use single::SinglePostFetcher;
