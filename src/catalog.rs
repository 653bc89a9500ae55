//! Registry of tables: maps a table id to its page store and schema.

use crate::access::value::Schema;
use crate::storage::disk::{DbFile, HeapFile};
use crate::storage::error::{StorageError, StorageResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type TableId = u32;

const MANIFEST_VERSION: u32 = 1;

struct TableEntry {
    name: String,
    file: Arc<dyn DbFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableManifest {
    name: String,
    path: PathBuf,
    schema: Schema,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogManifest {
    version: u32,
    tables: Vec<TableManifest>,
}

#[derive(Default)]
pub struct Catalog {
    tables: DashMap<TableId, TableEntry>,
    names: DashMap<String, TableId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` under `name`. Registering the same file again replaces
    /// the previous entry; a different file with an id already in use is
    /// rejected.
    pub fn add_table(&self, name: &str, file: Arc<dyn DbFile>) -> StorageResult<TableId> {
        let table_id = file.id();

        if let Some(existing) = self.tables.get(&table_id) {
            if existing.file.path() != file.path() {
                return Err(StorageError::TableIdCollision {
                    table_id,
                    existing: existing.file.path().to_path_buf(),
                    path: file.path().to_path_buf(),
                });
            }
        }

        match self.names.entry(name.to_string()) {
            Entry::Occupied(existing) if *existing.get() != table_id => {
                return Err(StorageError::DuplicateTable(name.to_string()));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(table_id);
            }
        }

        let entry = TableEntry {
            name: name.to_string(),
            file,
        };
        if let Some(previous) = self.tables.insert(table_id, entry) {
            if previous.name != name {
                self.names.remove(&previous.name);
            }
        }

        debug!("registered table '{}' as {}", name, table_id);
        Ok(table_id)
    }

    pub fn file(&self, table_id: TableId) -> StorageResult<Arc<dyn DbFile>> {
        self.tables
            .get(&table_id)
            .map(|entry| entry.file.clone())
            .ok_or(StorageError::NoSuchTable(table_id))
    }

    pub fn schema(&self, table_id: TableId) -> StorageResult<Arc<Schema>> {
        Ok(self.file(table_id)?.schema())
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.names.get(name).map(|id| *id)
    }

    pub fn table_name(&self, table_id: TableId) -> Option<String> {
        self.tables.get(&table_id).map(|entry| entry.name.clone())
    }

    /// Registered table ids, ascending.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.tables.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Writes the table list (name, file, schema) to `path`.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let mut tables: Vec<_> = self
            .tables
            .iter()
            .map(|entry| TableManifest {
                name: entry.name.clone(),
                path: entry.file.path().to_path_buf(),
                schema: entry.file.schema().as_ref().clone(),
            })
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));

        let manifest = CatalogManifest {
            version: MANIFEST_VERSION,
            tables,
        };
        let bytes = bincode::serialize(&manifest)?;

        // replace atomically so a crash never leaves a torn manifest
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        debug!("saved catalog with {} tables to {}", manifest.tables.len(), path.display());
        Ok(())
    }

    /// Rebuilds a catalog from a manifest written by [`Catalog::save`],
    /// reopening every table file.
    pub fn load(path: &Path, sync_writes: bool) -> StorageResult<Self> {
        let bytes = std::fs::read(path)?;
        let manifest: CatalogManifest = bincode::deserialize(&bytes)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StorageError::Corrupted(format!(
                "unsupported catalog manifest version {}",
                manifest.version
            )));
        }

        let catalog = Self::new();
        for table in manifest.tables {
            let file = HeapFile::open(&table.path, Arc::new(table.schema), sync_writes)?;
            catalog.add_table(&table.name, Arc::new(file))?;
        }
        info!("loaded {} tables from {}", catalog.len(), path.display());
        Ok(catalog)
    }
}
