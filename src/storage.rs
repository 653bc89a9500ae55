//! Storage layer implementation for heapdb.
//!
//! This module turns flat files into fixed-size pages and caches them:
//!
//! - **Page**: Fixed-size (4KB) blocks of data, the basic unit of I/O and caching
//! - **HeapPage**: Bitmap-plus-slots page format for fixed-width tuples
//! - **HeapFile**: One backing file per table, page reads/writes and first-fit insertion
//! - **BufferPool**: Bounded in-memory cache of pages with LRU eviction and write-back

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPool, PageRef, Permissions};
pub use disk::{DbFile, HeapFile, PAGE_SIZE};
pub use error::{StorageError, StorageResult};
pub use page::{HeapPage, Page, PageId};
