//! Sequential scan over a table file.

use crate::access::tuple::Tuple;
use crate::storage::buffer::{BufferPool, Permissions};
use crate::storage::disk::DbFile;
use crate::storage::error::StorageResult;
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use std::collections::VecDeque;
use std::sync::Arc;

/// Yields every stored tuple in page order, then slot order.
///
/// Pages are fetched through the buffer pool one at a time, so the scan sees
/// changes that have not been flushed yet. The page count is re-read whenever
/// the scan moves to a new page. A page that cannot be read or decoded yields
/// one error and is skipped.
pub struct HeapScan {
    file: Arc<dyn DbFile>,
    buffer_pool: BufferPool,
    tid: TransactionId,
    next_page: u32,
    pending: VecDeque<Tuple>,
}

impl HeapScan {
    pub fn new(file: Arc<dyn DbFile>, buffer_pool: BufferPool, tid: TransactionId) -> Self {
        Self {
            file,
            buffer_pool,
            tid,
            next_page: 0,
            pending: VecDeque::new(),
        }
    }

    /// Restarts the scan at page 0.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.pending.clear();
    }

    fn try_next_tuple(&mut self) -> StorageResult<Option<Tuple>> {
        loop {
            if let Some(tuple) = self.pending.pop_front() {
                return Ok(Some(tuple));
            }
            if self.next_page >= self.file.num_pages() {
                return Ok(None);
            }

            // step past the page before reading it so a failing page is reported once
            let page_id = PageId::new(self.file.id(), self.next_page);
            self.next_page += 1;

            let page = self
                .buffer_pool
                .get_page(self.tid, page_id, Permissions::ReadOnly)?;
            let tuples = page.read().tuples()?;
            self.pending.extend(tuples);
        }
    }
}

impl Iterator for HeapScan {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next_tuple().transpose()
    }
}
