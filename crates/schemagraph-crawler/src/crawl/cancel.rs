use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal for a running crawl
///
/// Clones share the same flag. The crawler checks it before every metadata
/// source call; calls already in flight are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CrawlCancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CrawlCancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; calling it again has no further effect
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!("crawl cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
