//! Transaction ID generation.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the transaction that requested or dirtied a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// Hands out monotonically increasing transaction ids, starting at 1.
#[derive(Debug)]
pub struct TransactionIdGenerator {
    next_id: AtomicU64,
}

impl TransactionIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first),
        }
    }

    pub fn next(&self) -> TransactionId {
        TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for TransactionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_display() {
        assert_eq!(TransactionId::new(7).to_string(), "tx7");
    }

    #[test]
    fn test_sequential_ids() {
        let generator = TransactionIdGenerator::new();
        assert_eq!(generator.next(), TransactionId(1));
        assert_eq!(generator.next(), TransactionId(2));

        let generator = TransactionIdGenerator::starting_at(100);
        assert_eq!(generator.next().value(), 100);
    }

    #[test]
    fn test_unique_across_threads() {
        let generator = Arc::new(TransactionIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                thread::spawn(move || (0..100).map(|_| generator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
