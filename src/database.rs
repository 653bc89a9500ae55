use crate::access::{Column, HeapScan, RecordId, Schema, Tuple, Value};
use crate::catalog::{Catalog, TableId};
use crate::storage::buffer::{BufferPool, DEFAULT_PAGES};
use crate::storage::disk::HeapFile;
use crate::transaction::{TransactionId, TransactionIdGenerator};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the catalog manifest inside the data directory.
pub const CATALOG_FILE: &str = "catalog.bin";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Maximum number of pages held by the buffer pool.
    pub buffer_pool_pages: usize,
    /// Sync table files after every page write.
    pub sync_writes: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            buffer_pool_pages: DEFAULT_PAGES,
            sync_writes: true,
        }
    }
}

/// Owns the catalog and the buffer pool of one data directory.
pub struct Database {
    data_dir: PathBuf,
    config: DatabaseConfig,
    catalog: Arc<Catalog>,
    buffer_pool: BufferPool,
    tx_ids: TransactionIdGenerator,
}

impl Database {
    /// Opens the database in `data_dir`, creating the directory if needed and
    /// reloading tables from the catalog manifest if one exists.
    pub fn open(data_dir: &Path, config: DatabaseConfig) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let manifest = data_dir.join(CATALOG_FILE);
        let catalog = if manifest.exists() {
            Catalog::load(&manifest, config.sync_writes)
                .with_context(|| format!("Failed to load catalog from {:?}", manifest))?
        } else {
            Catalog::new()
        };
        let catalog = Arc::new(catalog);
        let buffer_pool = BufferPool::new(catalog.clone(), config.buffer_pool_pages);
        info!(
            "opened database at {:?} with {} tables, {} buffer pages",
            data_dir,
            catalog.len(),
            buffer_pool.capacity()
        );

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            catalog,
            buffer_pool,
            tx_ids: TransactionIdGenerator::new(),
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    /// Allocates a fresh transaction id.
    pub fn begin(&self) -> TransactionId {
        self.tx_ids.next()
    }

    /// Creates an empty table stored in `<data_dir>/<name>.dat`.
    pub fn create_table(&self, name: &str, columns: Vec<Column>) -> Result<TableId> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("Invalid table name '{}'", name);
        }
        if self.catalog.table_id(name).is_some() {
            bail!("Table '{}' already exists", name);
        }

        let path = self.data_dir.join(format!("{}.dat", name));
        let file = HeapFile::create(&path, Arc::new(Schema::new(columns)), self.config.sync_writes)
            .with_context(|| format!("Failed to create table file {:?}", path))?;
        let table_id = self.catalog.add_table(name, Arc::new(file))?;
        self.save_catalog()?;

        info!("created table '{}' ({})", name, table_id);
        Ok(table_id)
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.catalog
            .table_id(name)
            .ok_or_else(|| anyhow::anyhow!("Table '{}' does not exist", name))
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .catalog
            .table_ids()
            .into_iter()
            .filter_map(|id| self.catalog.table_name(id))
            .collect();
        names.sort();
        names
    }

    pub fn insert(&self, tid: TransactionId, table: &str, values: Vec<Value>) -> Result<RecordId> {
        let table_id = self.table_id(table)?;
        let mut tuple = Tuple::new(values);
        self.buffer_pool
            .insert_tuple(tid, table_id, &mut tuple)
            .with_context(|| format!("Failed to insert into '{}'", table))?;
        tuple
            .record_id
            .ok_or_else(|| anyhow::anyhow!("Inserted tuple has no record id"))
    }

    pub fn delete(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        self.buffer_pool
            .delete_tuple(tid, tuple)
            .context("Failed to delete tuple")?;
        Ok(())
    }

    pub fn scan(&self, tid: TransactionId, table: &str) -> Result<HeapScan> {
        let file = self.catalog.file(self.table_id(table)?)?;
        Ok(HeapScan::new(file, self.buffer_pool.clone(), tid))
    }

    /// Writes every dirty page back and persists the catalog manifest.
    pub fn checkpoint(&self) -> Result<()> {
        self.buffer_pool
            .flush_all_pages()
            .context("Failed to flush buffer pool")?;
        self.save_catalog()
    }

    fn save_catalog(&self) -> Result<()> {
        let manifest = self.data_dir.join(CATALOG_FILE);
        self.catalog
            .save(&manifest)
            .with_context(|| format!("Failed to save catalog to {:?}", manifest))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Best effort checkpoint on drop
        if let Err(e) = self.checkpoint() {
            warn!("checkpoint on close failed: {:#}", e);
        }
    }
}
