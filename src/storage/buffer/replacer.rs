use crate::storage::page::PageId;
use std::fmt::Debug;

/// Recency bookkeeping for the buffer pool. Tracks exactly the set of cached
/// page ids and decides which one to give up when the pool is full.
pub trait Replacer: Send + Sync + Debug {
    /// Record that a page was admitted or touched.
    fn record_access(&mut self, page_id: PageId);

    /// Forget a page. Returns false if it was not tracked.
    fn remove(&mut self, page_id: PageId) -> bool;

    /// The page that should be evicted next, without removing it.
    fn victim(&self) -> Option<PageId>;

    /// Tracked pages, most recently used first.
    fn recency_order(&self) -> Vec<PageId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
