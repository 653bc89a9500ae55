pub mod lru;
pub mod replacer;

use crate::access::tuple::Tuple;
use crate::catalog::{Catalog, TableId};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, Page, PageId};
use crate::transaction::TransactionId;
use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};
use replacer::Replacer;
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of pages cached when no capacity is configured.
pub const DEFAULT_PAGES: usize = 50;

/// Shared handle to a cached page.
///
/// Page guards must be released before calling back into the pool: eviction
/// takes the page lock while holding the pool lock.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Access mode requested for a page. Reserved for a lock manager placed in
/// front of the pool; the pool itself grants every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// Bounded cache of pages, shared by cloning.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    catalog: Arc<Catalog>,
    // page map and recency order change together under this one lock
    state: Mutex<PoolState>,
    capacity: usize,
}

struct PoolState {
    pages: HashMap<PageId, PageRef>,
    replacer: Box<dyn Replacer>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        let replacer = Box::new(lru::LruReplacer::new(capacity));
        Self::with_replacer(catalog, replacer, capacity)
    }

    pub fn with_replacer(
        catalog: Arc<Catalog>,
        replacer: Box<dyn Replacer>,
        capacity: usize,
    ) -> Self {
        let capacity = if capacity == 0 {
            warn!("buffer pool capacity 0 requested, using 1");
            1
        } else {
            capacity
        };

        Self {
            inner: Arc::new(BufferPoolInner {
                catalog,
                state: Mutex::new(PoolState {
                    pages: HashMap::with_capacity(capacity),
                    replacer,
                }),
                capacity,
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.inner.state.lock().pages.contains_key(&page_id)
    }

    /// Cached page ids, most recently used first.
    pub fn cached_page_ids(&self) -> Vec<PageId> {
        self.inner.state.lock().replacer.recency_order()
    }

    /// Returns the cached page, reading it from its table's file on a miss.
    ///
    /// A miss on a full pool evicts the least recently used page, writing it
    /// back first if dirty. A failed read leaves the pool untouched.
    pub fn get_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permissions,
    ) -> StorageResult<PageRef> {
        let mut state = self.inner.state.lock();

        if let Some(page) = state.pages.get(&page_id).cloned() {
            state.replacer.record_access(page_id);
            trace!("{} hit page {} ({:?})", tid, page_id, perm);
            return Ok(page);
        }

        let file = self.inner.catalog.file(page_id.table_id)?;
        let page = Arc::new(RwLock::new(file.read_page(page_id)?));
        debug!("{} loaded page {} ({:?})", tid, page_id, perm);

        self.admit(&mut state, page_id, page.clone())?;
        Ok(page)
    }

    /// Inserts `tuple` into table `table_id` and attaches its new record id.
    /// Every page the store modified is marked dirty by `tid` and cached.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> StorageResult<()> {
        let file = self.inner.catalog.file(table_id)?;
        let dirtied = file.insert_tuple(tid, tuple, self)?;
        self.admit_dirtied(tid, dirtied)
    }

    /// Deletes the tuple named by `tuple.record_id` from its table.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> StorageResult<()> {
        let record_id = tuple.record_id.ok_or(StorageError::MissingRecordId)?;
        let file = self.inner.catalog.file(record_id.page_id.table_id)?;
        let dirtied = file.delete_tuple(tid, tuple, self)?;
        self.admit_dirtied(tid, dirtied)
    }

    /// Writes the page back if dirty and drops it from the pool.
    pub fn flush_page(&self, page_id: PageId) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        self.flush_and_remove(&mut state, page_id)
    }

    /// Writes back every dirty page. Pages stay cached.
    pub fn flush_all_pages(&self) -> StorageResult<()> {
        let state = self.inner.state.lock();
        for page in state.pages.values() {
            self.write_back(page)?;
        }
        Ok(())
    }

    /// Writes back every page last dirtied by `tid`. Pages stay cached.
    pub fn flush_pages(&self, tid: TransactionId) -> StorageResult<()> {
        let state = self.inner.state.lock();
        for page in state.pages.values() {
            if page.read().dirtier() == Some(tid) {
                self.write_back(page)?;
            }
        }
        Ok(())
    }

    /// Drops a page from the pool without writing it back.
    pub fn discard_page(&self, page_id: PageId) {
        let mut state = self.inner.state.lock();
        if state.pages.remove(&page_id).is_some() {
            state.replacer.remove(page_id);
            debug!("discarded page {}", page_id);
        }
    }

    fn admit_dirtied(&self, tid: TransactionId, dirtied: Vec<PageRef>) -> StorageResult<()> {
        for page in dirtied {
            let page_id = {
                let mut guard = page.write();
                guard.mark_dirty(Some(tid));
                guard.page_id()
            };
            let mut state = self.inner.state.lock();
            self.admit(&mut state, page_id, page)?;
        }
        Ok(())
    }

    /// Installs `page` as the most recently used entry for `page_id`,
    /// evicting first if a new entry would exceed capacity.
    fn admit(&self, state: &mut PoolState, page_id: PageId, page: PageRef) -> StorageResult<()> {
        if !state.pages.contains_key(&page_id) {
            while state.pages.len() >= self.inner.capacity {
                self.evict_page(state)?;
            }
        }

        state.pages.insert(page_id, page);
        state.replacer.record_access(page_id);
        debug_assert_eq!(state.pages.len(), state.replacer.len());
        Ok(())
    }

    fn evict_page(&self, state: &mut PoolState) -> StorageResult<()> {
        let victim = state.replacer.victim().ok_or_else(|| {
            StorageError::Internal("eviction requested on an empty buffer pool".to_string())
        })?;
        self.flush_and_remove(state, victim)?;
        debug!("evicted page {}", victim);
        Ok(())
    }

    fn flush_and_remove(&self, state: &mut PoolState, page_id: PageId) -> StorageResult<()> {
        let Some(page) = state.pages.get(&page_id).cloned() else {
            if state.replacer.remove(page_id) {
                return Err(StorageError::Internal(format!(
                    "page {} tracked for recency but not cached",
                    page_id
                )));
            }
            return Ok(());
        };

        // Only forget the page once its bytes are safely on disk.
        self.write_back(&page)?;
        state.pages.remove(&page_id);
        state.replacer.remove(page_id);
        Ok(())
    }

    fn write_back(&self, page: &PageRef) -> StorageResult<()> {
        let mut guard = page.write();
        if let Some(dirtier) = guard.dirtier() {
            let page_id = guard.page_id();
            let file = self.inner.catalog.file(page_id.table_id)?;
            file.write_page(&*guard)?;
            guard.mark_dirty(None);
            debug!("flushed page {} dirtied by {}", page_id, dirtier);
        }
        Ok(())
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.inner.capacity)
            .field("cached", &self.len())
            .finish()
    }
}
