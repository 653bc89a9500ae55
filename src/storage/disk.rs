//! Table files and the page store interface the buffer pool talks to.

pub mod heap_file;

use crate::access::tuple::Tuple;
use crate::access::value::Schema;
use crate::catalog::TableId;
use crate::storage::buffer::{BufferPool, PageRef};
use crate::storage::error::StorageResult;
use crate::storage::page::{HeapPage, Page, PageId};
use crate::transaction::TransactionId;
use std::path::Path;
use std::sync::Arc;

/// Bytes per page, the unit of file I/O and of caching.
pub const PAGE_SIZE: usize = 4096;

/// A page store backed by one file on disk.
///
/// Stores do not keep pages themselves. Tuple placement acquires pages through
/// the buffer pool and reports the pages it modified so the pool can mark
/// them dirty.
pub trait DbFile: Send + Sync {
    /// Stable identifier of this table.
    fn id(&self) -> TableId;

    fn path(&self) -> &Path;

    fn schema(&self) -> Arc<Schema>;

    fn num_pages(&self) -> u32;

    fn read_page(&self, page_id: PageId) -> StorageResult<HeapPage>;

    fn write_page(&self, page: &dyn Page) -> StorageResult<()>;

    /// Places `tuple` in the first page with a free slot, growing the file by
    /// one page if none has room. Attaches the new record id to `tuple`.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: &mut Tuple,
        pool: &BufferPool,
    ) -> StorageResult<Vec<PageRef>>;

    /// Frees the slot named by the tuple's record id.
    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> StorageResult<Vec<PageRef>>;
}

pub use heap_file::HeapFile;
