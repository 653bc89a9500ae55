use anyhow::Result;
use heapdb::access::{Column, DataType, Schema, Tuple, Value};
use heapdb::catalog::Catalog;
use heapdb::database::{Database, DatabaseConfig};
use heapdb::storage::page::heap_page::{header_size, slots_per_page};
use heapdb::storage::{BufferPool, DbFile, HeapFile, Page, PageId, Permissions, PAGE_SIZE};
use heapdb::transaction::TransactionId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const TID: TransactionId = TransactionId(1);

struct Engine {
    _dir: TempDir,
    file: Arc<HeapFile>,
    pool: BufferPool,
}

fn engine(int_columns: usize, capacity: usize) -> Result<Engine> {
    let dir = tempdir()?;
    let schema = Arc::new(Schema::from_types(&vec![DataType::Int32; int_columns]));
    let file = Arc::new(HeapFile::create(&dir.path().join("heap.dat"), schema, false)?);
    let catalog = Arc::new(Catalog::new());
    catalog.add_table("heap", file.clone())?;
    Ok(Engine {
        _dir: dir,
        file,
        pool: BufferPool::new(catalog, capacity),
    })
}

fn row(columns: usize, value: i32) -> Tuple {
    Tuple::new(vec![Value::Int32(value); columns])
}

fn insert_rows(engine: &Engine, columns: usize, count: usize) -> Result<Vec<Tuple>> {
    let mut stored = Vec::with_capacity(count);
    for i in 0..count {
        let mut tuple = row(columns, i as i32);
        engine.pool.insert_tuple(TID, engine.file.id(), &mut tuple)?;
        stored.push(tuple);
    }
    Ok(stored)
}

fn occupancy(engine: &Engine) -> Result<Vec<usize>> {
    (0..engine.file.num_pages())
        .map(|n| {
            let page = engine.pool.get_page(
                TID,
                PageId::new(engine.file.id(), n),
                Permissions::ReadOnly,
            )?;
            let guard = page.read();
            Ok(guard.num_slots() - guard.num_empty_slots())
        })
        .collect()
}

#[test]
fn test_capacity_two_scenario() -> Result<()> {
    let engine = engine(1, 2)?;
    insert_rows(&engine, 1, slots_per_page(4) * 3)?;
    engine.pool.flush_all_pages()?;
    for n in 0..3 {
        engine.pool.discard_page(PageId::new(engine.file.id(), n));
    }

    let [a, b, c] = [0, 1, 2].map(|n| PageId::new(engine.file.id(), n));
    for pid in [a, b, c] {
        engine.pool.get_page(TID, pid, Permissions::ReadOnly)?;
    }

    assert!(!engine.pool.is_cached(a));
    assert_eq!(engine.pool.cached_page_ids(), vec![c, b]);
    Ok(())
}

#[test]
fn test_random_access_matches_lru_model() -> Result<()> {
    let capacity = 4;
    let engine = engine(1, capacity)?;
    insert_rows(&engine, 1, slots_per_page(4) * 12)?;
    assert_eq!(engine.file.num_pages(), 12);

    let mut model: Vec<PageId> = engine.pool.cached_page_ids();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let pid = PageId::new(engine.file.id(), rng.gen_range(0..12));
        engine.pool.get_page(TID, pid, Permissions::ReadOnly)?;

        model.retain(|p| *p != pid);
        model.insert(0, pid);
        model.truncate(capacity);

        assert!(engine.pool.len() <= capacity);
        assert_eq!(engine.pool.cached_page_ids(), model);
    }
    Ok(())
}

#[test]
fn test_evicted_dirty_page_matches_disk() -> Result<()> {
    let engine = engine(2, 1)?;
    let per_page = slots_per_page(8);
    insert_rows(&engine, 2, per_page + 1)?;
    assert_eq!(engine.file.num_pages(), 2);

    // dirty page 0 and capture its encoding
    let p0 = PageId::new(engine.file.id(), 0);
    let stored = engine.file.iter(TID, &engine.pool).next().unwrap()?;
    engine.pool.delete_tuple(TransactionId(2), &stored)?;
    let page = engine.pool.get_page(TID, p0, Permissions::ReadOnly)?;
    assert!(page.read().is_dirty());
    let expected = page.read().page_data();
    drop(page);

    // touching page 1 evicts page 0
    engine
        .pool
        .get_page(TID, PageId::new(engine.file.id(), 1), Permissions::ReadOnly)?;
    assert!(!engine.pool.is_cached(p0));

    let on_disk = std::fs::read(engine.file.path())?;
    assert_eq!(&on_disk[..PAGE_SIZE], &expected[..]);
    Ok(())
}

#[test]
fn test_first_fit_page_count() -> Result<()> {
    let engine = engine(3, 8)?;
    let per_page = slots_per_page(12);
    let n = per_page * 4 + per_page / 3;

    insert_rows(&engine, 3, n)?;
    let expected_pages = n.div_ceil(per_page);
    assert_eq!(engine.file.num_pages() as usize, expected_pages);

    let counts = occupancy(&engine)?;
    assert!(counts[..expected_pages - 1].iter().all(|&c| c == per_page));
    assert_eq!(counts[expected_pages - 1], n - per_page * (expected_pages - 1));
    Ok(())
}

#[test]
fn test_slot_reuse_prefers_lowest_page() -> Result<()> {
    let engine = engine(1, 8)?;
    let per_page = slots_per_page(4);
    let stored = insert_rows(&engine, 1, per_page * 2)?;

    let freed = &stored[per_page + 3];
    engine.pool.delete_tuple(TID, freed)?;

    let mut fresh = row(1, -1);
    engine.pool.insert_tuple(TID, engine.file.id(), &mut fresh)?;
    assert_eq!(fresh.record_id, freed.record_id);
    assert_eq!(engine.file.num_pages(), 2);

    // with both pages full again, the next insert appends
    let mut overflow = row(1, -2);
    engine.pool.insert_tuple(TID, engine.file.id(), &mut overflow)?;
    assert_eq!(overflow.record_id.unwrap().page_id.page_number, 2);
    Ok(())
}

#[test]
fn test_twenty_byte_tuples_fill_one_page() -> Result<()> {
    let engine = engine(5, 8)?;
    let slots = slots_per_page(20);
    assert_eq!(header_size(slots), 26);

    insert_rows(&engine, 5, slots)?;
    assert_eq!(engine.file.num_pages(), 1);
    assert_eq!(occupancy(&engine)?, vec![slots]);

    let mut extra = row(5, 0);
    engine.pool.insert_tuple(TID, engine.file.id(), &mut extra)?;
    assert_eq!(extra.record_id.unwrap().page_id, PageId::new(engine.file.id(), 1));
    Ok(())
}

#[test]
fn test_heavy_eviction_preserves_every_row() -> Result<()> {
    let engine = engine(2, 2)?;
    let stored = insert_rows(&engine, 2, slots_per_page(8) * 6 + 11)?;

    let mut rng = StdRng::seed_from_u64(7);
    let mut deleted = Vec::new();
    for tuple in &stored {
        if rng.gen_bool(0.3) {
            engine.pool.delete_tuple(TID, tuple)?;
            deleted.push(tuple.values[0].clone());
        }
    }

    let survivors: Vec<Value> = engine
        .file
        .iter(TID, &engine.pool)
        .map(|t| t.map(|t| t.values[0].clone()))
        .collect::<Result<_, _>>()?;
    assert_eq!(survivors.len() + deleted.len(), stored.len());
    assert!(survivors.iter().all(|v| !deleted.contains(v)));

    // everything must also be correct on disk once flushed
    engine.pool.flush_all_pages()?;
    let mut on_disk = 0;
    for n in 0..engine.file.num_pages() {
        on_disk += engine
            .file
            .read_page(PageId::new(engine.file.id(), n))?
            .tuples()?
            .len();
    }
    assert_eq!(on_disk, survivors.len());
    Ok(())
}

#[test]
fn test_database_survives_restart() -> Result<()> {
    let dir = tempdir()?;
    let config = DatabaseConfig {
        buffer_pool_pages: 3,
        sync_writes: false,
    };
    let columns = vec![
        Column::new("id", DataType::Int32),
        Column::new("label", DataType::Varchar),
        Column::new("flag", DataType::Boolean),
    ];

    {
        let db = Database::open(dir.path(), config.clone())?;
        db.create_table("events", columns)?;
        let tid = db.begin();
        for id in 0..200 {
            db.insert(
                tid,
                "events",
                vec![
                    Value::Int32(id),
                    Value::String(format!("event-{}", id)),
                    Value::Boolean(id % 3 == 0),
                ],
            )?;
        }
    }

    let db = Database::open(dir.path(), config)?;
    let rows: Vec<Tuple> = db.scan(db.begin(), "events")?.collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 200);
    assert_eq!(rows[150].values[1], Value::String("event-150".to_string()));
    assert_eq!(rows[99].values[2], Value::Boolean(true));
    Ok(())
}
