use crate::access::value::Value;
use crate::storage::page::PageId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Storage location of one tuple: a page and a slot within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Scan order: page first, then slot
        self.page_id
            .cmp(&other.page_id)
            .then(self.slot.cmp(&other.slot))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot)
    }
}

/// Represents a row in the database. Freshly built tuples carry no record id;
/// one is attached when the tuple is read from or written to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub record_id: Option<RecordId>,
    pub values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            record_id: None,
            values,
        }
    }

    pub fn with_record_id(record_id: RecordId, values: Vec<Value>) -> Self {
        Self {
            record_id: Some(record_id),
            values,
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.values {
            if !first {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_record_id_equality_and_hash() {
        let a = RecordId::new(PageId::new(1, 2), 3);
        let b = RecordId::new(PageId::new(1, 2), 3);
        let c = RecordId::new(PageId::new(2, 2), 3);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_record_id_ordering() {
        let r1 = RecordId::new(PageId::new(1, 0), 5);
        let r2 = RecordId::new(PageId::new(1, 0), 10);
        let r3 = RecordId::new(PageId::new(1, 1), 0);

        assert!(r1 < r2);
        assert!(r2 < r3);
    }

    #[test]
    fn test_fresh_tuple_is_detached() {
        let tuple = Tuple::new(vec![Value::Int32(1)]);
        assert!(tuple.record_id.is_none());

        let rid = RecordId::new(PageId::new(9, 0), 1);
        let stored = Tuple::with_record_id(rid, tuple.values.clone());
        assert_eq!(stored.record_id, Some(rid));
    }

    #[test]
    fn test_display() {
        let tuple = Tuple::new(vec![
            Value::Int32(1),
            Value::String("bob".to_string()),
            Value::Boolean(false),
        ]);
        assert_eq!(tuple.to_string(), "1\tbob\tfalse");
    }
}
