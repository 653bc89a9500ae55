//! Access layer for tuple-oriented operations.
//!
//! - **Tuple** / **RecordId**: logical records and where they are stored
//! - **Schema** / **Value** / **DataType**: fixed-width field encoding
//! - **HeapScan**: page-ordered scan of a table through the buffer pool

pub mod scan;
pub mod tuple;
pub mod value;

pub use scan::HeapScan;
pub use tuple::{RecordId, Tuple};
pub use value::{Column, DataType, Schema, Value, STRING_LEN};
