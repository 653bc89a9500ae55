//! Transaction identity.
//!
//! The storage core does not run a lock manager; transaction ids are threaded
//! through every page-mutating call so a concurrency layer can be placed in
//! front of the buffer pool later.

pub mod id;

pub use id::{TransactionId, TransactionIdGenerator};
