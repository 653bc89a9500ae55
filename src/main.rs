//! heapdb - command line front end for the heap storage engine

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use heapdb::access::{Column, DataType, RecordId, Tuple, Value};
use heapdb::database::{Database, DatabaseConfig};
use heapdb::storage::buffer::DEFAULT_PAGES;
use heapdb::storage::PageId;
use rand::Rng;
use std::path::PathBuf;

/// heapdb - page cache and heap file storage engine
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory
    #[arg(short = 'D', long, default_value = "./heapdb_data")]
    data_dir: PathBuf,

    /// Buffer pool capacity in pages
    #[arg(short, long, default_value_t = DEFAULT_PAGES)]
    pages: usize,

    /// Skip fsync after page writes
    #[arg(long)]
    no_sync: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a table, e.g. `create users id:int name:varchar active:bool`
    Create {
        table: String,
        #[arg(required = true)]
        columns: Vec<String>,
    },
    /// Insert one row given as positional values
    Insert {
        table: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Insert random rows
    Fill {
        table: String,
        #[arg(short, long, default_value_t = 1000)]
        rows: usize,
    },
    /// Print every row with its location
    Scan { table: String },
    /// Delete the row stored at a page and slot
    Delete { table: String, page: u32, slot: u16 },
    /// List tables
    Tables,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = DatabaseConfig {
        buffer_pool_pages: args.pages,
        sync_writes: !args.no_sync,
    };
    let db = Database::open(&args.data_dir, config).context("Failed to open database")?;

    match args.command {
        Command::Create { table, columns } => {
            let columns = columns
                .iter()
                .map(|text| parse_column(text))
                .collect::<Result<Vec<_>>>()?;
            let table_id = db.create_table(&table, columns)?;
            println!("created table '{}' (id {})", table, table_id);
        }
        Command::Insert { table, values } => {
            let schema = db.catalog().schema(db.table_id(&table)?)?;
            if values.len() != schema.len() {
                bail!("'{}' has {} columns, got {} values", table, schema.len(), values.len());
            }
            let values = values
                .iter()
                .zip(schema.columns())
                .map(|(text, column)| Value::parse_as(text, column.data_type))
                .collect::<Result<Vec<_>, _>>()?;
            let rid = db.insert(db.begin(), &table, values)?;
            println!("inserted at {}", rid);
        }
        Command::Fill { table, rows } => {
            let schema = db.catalog().schema(db.table_id(&table)?)?;
            let tid = db.begin();
            let mut rng = rand::thread_rng();
            for _ in 0..rows {
                let values = schema
                    .columns()
                    .iter()
                    .map(|column| random_value(&mut rng, column.data_type))
                    .collect();
                db.insert(tid, &table, values)?;
            }
            println!("inserted {} rows into '{}'", rows, table);
        }
        Command::Scan { table } => {
            let mut count = 0;
            for tuple in db.scan(db.begin(), &table)? {
                let tuple = tuple?;
                if let Some(rid) = tuple.record_id {
                    println!("{}\t{}", rid, tuple);
                }
                count += 1;
            }
            println!("({} rows)", count);
        }
        Command::Delete { table, page, slot } => {
            let table_id = db.table_id(&table)?;
            let rid = RecordId::new(PageId::new(table_id, page), slot);
            db.delete(db.begin(), &Tuple::with_record_id(rid, Vec::new()))?;
            println!("deleted {}", rid);
        }
        Command::Tables => {
            for name in db.table_names() {
                let schema = db.catalog().schema(db.table_id(&name)?)?;
                let columns: Vec<_> = schema
                    .columns()
                    .iter()
                    .map(|c| format!("{}:{:?}", c.name, c.data_type))
                    .collect();
                println!("{} ({})", name, columns.join(", "));
            }
        }
    }

    db.checkpoint()?;
    Ok(())
}

/// Parses `name:type`.
fn parse_column(text: &str) -> Result<Column> {
    let (name, type_name) = text
        .split_once(':')
        .with_context(|| format!("Column '{}' must look like name:type", text))?;
    let data_type = DataType::parse(type_name)
        .with_context(|| format!("Unknown type '{}' for column '{}'", type_name, name))?;
    Ok(Column::new(name, data_type))
}

fn random_value(rng: &mut impl Rng, data_type: DataType) -> Value {
    match data_type {
        DataType::Boolean => Value::Boolean(rng.gen()),
        DataType::Int32 => Value::Int32(rng.gen_range(0..1_000_000)),
        DataType::Varchar => {
            let len = rng.gen_range(1..=16);
            let s = (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect();
            Value::String(s)
        }
    }
}
