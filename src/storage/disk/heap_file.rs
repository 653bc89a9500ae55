use crate::access::scan::HeapScan;
use crate::access::tuple::Tuple;
use crate::access::value::Schema;
use crate::catalog::TableId;
use crate::storage::buffer::{BufferPool, PageRef, Permissions};
use crate::storage::disk::{DbFile, PAGE_SIZE};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::heap_page::slots_per_page;
use crate::storage::page::{HeapPage, Page, PageId};
use crate::transaction::TransactionId;
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Unordered collection of fixed-width tuples stored in one file.
///
/// Page `n` occupies bytes `[n * PAGE_SIZE, (n + 1) * PAGE_SIZE)`. There is no
/// file header: the page count is derived from the file length. The file is
/// opened for the duration of each read or write only.
pub struct HeapFile {
    path: PathBuf,
    id: TableId,
    schema: Arc<Schema>,
    num_pages: AtomicU32,
    sync_writes: bool,
    // serialises allocation of new pages at the end of the file
    append_lock: Mutex<()>,
}

impl HeapFile {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: &Path, schema: Arc<Schema>, sync_writes: bool) -> StorageResult<Self> {
        File::create(path)?;
        Self::open(path, schema, sync_writes)
    }

    /// Opens an existing table file.
    pub fn open(path: &Path, schema: Arc<Schema>, sync_writes: bool) -> StorageResult<Self> {
        if schema.is_empty() || slots_per_page(schema.tuple_width()) == 0 {
            return Err(StorageError::SchemaMismatch(format!(
                "schema with {} columns and width {} cannot be stored in {}-byte pages",
                schema.len(),
                schema.tuple_width(),
                PAGE_SIZE
            )));
        }

        let path = path.canonicalize()?;
        let file_size = std::fs::metadata(&path)?.len();
        let id = table_id_for(&path);
        debug!(
            "opened table {} at {} ({} bytes)",
            id,
            path.display(),
            file_size
        );

        Ok(Self {
            id,
            path,
            schema,
            num_pages: AtomicU32::new(pages_for(file_size)),
            sync_writes,
            append_lock: Mutex::new(()),
        })
    }

    /// Scans every tuple of this table through `pool`.
    pub fn iter(self: &Arc<Self>, tid: TransactionId, pool: &BufferPool) -> HeapScan {
        HeapScan::new(self.clone(), pool.clone(), tid)
    }

    fn page_offset(page_id: PageId) -> u64 {
        page_id.page_number as u64 * PAGE_SIZE as u64
    }

    fn check_table(&self, page_id: PageId) -> StorageResult<()> {
        if page_id.table_id != self.id {
            return Err(StorageError::Internal(format!(
                "page {} does not belong to table {}",
                page_id, self.id
            )));
        }
        Ok(())
    }

    /// Appends a page holding only `tuple` and persists it immediately. The
    /// page is then acquired through the pool, so any copy another caller
    /// loaded in the meantime already contains the tuple.
    ///
    /// Returns `None` if the file grew past `seen_pages` since the caller
    /// scanned it; those pages must be scanned before growing again.
    fn append_page(
        &self,
        tid: TransactionId,
        tuple: &mut Tuple,
        pool: &BufferPool,
        seen_pages: u32,
    ) -> StorageResult<Option<PageRef>> {
        let _growth = self.append_lock.lock();
        if self.num_pages() != seen_pages {
            return Ok(None);
        }

        let page_id = PageId::new(self.id, seen_pages);
        let mut page = HeapPage::empty(page_id, self.schema.clone())?;
        let record_id = page.insert_tuple(tuple)?;
        self.write_page(&page)?;
        tuple.record_id = Some(record_id);
        debug!("{} grew table {} to {} pages", tid, self.id, self.num_pages());

        let page = pool.get_page(tid, page_id, Permissions::ReadWrite)?;
        page.write().mark_dirty(Some(tid));
        Ok(Some(page))
    }
}

impl DbFile for HeapFile {
    fn id(&self) -> TableId {
        self.id
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::SeqCst)
    }

    fn read_page(&self, page_id: PageId) -> StorageResult<HeapPage> {
        self.check_table(page_id)?;
        let num_pages = self.num_pages();
        if page_id.page_number >= num_pages {
            return Err(StorageError::PageOutOfRange { page_id, num_pages });
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;

        // The last page may be short; whatever is present is decoded as-is.
        let mut buf = Vec::with_capacity(PAGE_SIZE);
        file.take(PAGE_SIZE as u64).read_to_end(&mut buf)?;

        HeapPage::new(page_id, &buf, self.schema.clone())
    }

    fn write_page(&self, page: &dyn Page) -> StorageResult<()> {
        let page_id = page.page_id();
        self.check_table(page_id)?;

        let data = page.page_data();
        if data.len() != PAGE_SIZE {
            return Err(StorageError::Internal(format!(
                "page {} encodes to {} bytes",
                page_id,
                data.len()
            )));
        }

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.write_all(&data)?;
        if self.sync_writes {
            file.sync_data()?;
        }

        let file_size = file.metadata()?.len();
        self.num_pages.fetch_max(pages_for(file_size), Ordering::SeqCst);
        Ok(())
    }

    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: &mut Tuple,
        pool: &BufferPool,
    ) -> StorageResult<Vec<PageRef>> {
        // Reject bad tuples before any page is touched.
        self.schema.validate(&tuple.values)?;

        let mut page_number = 0;
        loop {
            let num_pages = self.num_pages();
            while page_number < num_pages {
                let page_id = PageId::new(self.id, page_number);
                let page = pool.get_page(tid, page_id, Permissions::ReadWrite)?;
                {
                    let mut guard = page.write();
                    if guard.first_free_slot().is_some() {
                        let record_id = guard.insert_tuple(tuple)?;
                        // dirty under the same guard so a concurrent eviction writes it back
                        guard.mark_dirty(Some(tid));
                        tuple.record_id = Some(record_id);
                        drop(guard);
                        return Ok(vec![page]);
                    }
                }
                page_number += 1;
            }

            if let Some(page) = self.append_page(tid, tuple, pool, num_pages)? {
                return Ok(vec![page]);
            }
        }
    }

    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> StorageResult<Vec<PageRef>> {
        let record_id = tuple.record_id.ok_or(StorageError::MissingRecordId)?;
        if record_id.page_id.table_id != self.id
            || record_id.page_id.page_number >= self.num_pages()
        {
            return Err(StorageError::TupleNotFound { record_id });
        }

        let page = pool.get_page(tid, record_id.page_id, Permissions::ReadWrite)?;
        {
            let mut guard = page.write();
            guard.delete_tuple(tuple)?;
            guard.mark_dirty(Some(tid));
        }
        Ok(vec![page])
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("num_pages", &self.num_pages())
            .finish()
    }
}

fn pages_for(file_size: u64) -> u32 {
    file_size.div_ceil(PAGE_SIZE as u64) as u32
}

/// 32-bit FNV-1a of the canonical path, so the id survives restarts.
fn table_id_for(path: &Path) -> TableId {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in path.to_string_lossy().as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
