pub mod heap_page;

use crate::catalog::TableId;
use crate::transaction::TransactionId;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses one page of one table's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub table_id: TableId,
    pub page_number: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_number: u32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.table_id, self.page_number)
    }
}

pub trait Page {
    fn page_id(&self) -> PageId;

    /// The transaction that last dirtied this page, if it is dirty.
    fn dirtier(&self) -> Option<TransactionId>;

    fn mark_dirty(&mut self, dirtier: Option<TransactionId>);

    /// Owned snapshot of the on-disk encoding of this page.
    fn page_data(&self) -> Bytes;

    fn is_dirty(&self) -> bool {
        self.dirtier().is_some()
    }
}

pub use heap_page::HeapPage;
