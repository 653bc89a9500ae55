//! Heap page layout.
//!
//! ```text
//! +----------------------+----------+----------+-----+--------------+--------+
//! | occupancy bitmap     | slot 0   | slot 1   | ... | slot n-1     | unused |
//! | ceil(n / 8) bytes    | w bytes  | w bytes  |     | w bytes      |        |
//! +----------------------+----------+----------+-----+--------------+--------+
//! ```
//!
//! `n = floor(PAGE_SIZE * 8 / (w * 8 + 1))` where `w` is the tuple width of the
//! table. Bit `i` (byte `i / 8`, bit `i % 8`, LSB first) is set iff slot `i`
//! holds a tuple. The bytes of unused slots are carried along untouched.

use crate::access::tuple::{RecordId, Tuple};
use crate::access::value::Schema;
use crate::storage::PAGE_SIZE;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{Page, PageId};
use crate::transaction::TransactionId;
use bytes::Bytes;
use std::sync::Arc;

/// Number of tuple slots on a page for records of `tuple_width` bytes.
pub fn slots_per_page(tuple_width: usize) -> usize {
    (PAGE_SIZE * 8) / (tuple_width * 8 + 1)
}

/// Size of the occupancy bitmap for `num_slots` slots.
pub fn header_size(num_slots: usize) -> usize {
    num_slots.div_ceil(8)
}

/// Canonical bytes of a freshly allocated page: no slot occupied.
pub fn empty_page_data() -> Vec<u8> {
    vec![0u8; PAGE_SIZE]
}

pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    data: Box<[u8; PAGE_SIZE]>,
    num_slots: usize,
    dirtier: Option<TransactionId>,
}

impl HeapPage {
    /// Decodes a page from bytes read off disk. A short buffer (the tail page of
    /// a file that was never padded) is treated as if zero-filled.
    pub fn new(page_id: PageId, bytes: &[u8], schema: Arc<Schema>) -> StorageResult<Self> {
        if bytes.len() > PAGE_SIZE {
            return Err(StorageError::Corrupted(format!(
                "page {} is {} bytes, expected at most {}",
                page_id,
                bytes.len(),
                PAGE_SIZE
            )));
        }

        let num_slots = slots_per_page(schema.tuple_width());
        if num_slots == 0 {
            return Err(StorageError::SchemaMismatch(format!(
                "tuples of {} bytes do not fit in a page",
                schema.tuple_width()
            )));
        }

        let mut data = Box::new([0u8; PAGE_SIZE]);
        data[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            page_id,
            schema,
            data,
            num_slots,
            dirtier: None,
        })
    }

    pub fn empty(page_id: PageId, schema: Arc<Schema>) -> StorageResult<Self> {
        Self::new(page_id, &empty_page_data(), schema)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn header_size(&self) -> usize {
        header_size(self.num_slots)
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots && self.data[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        let mask = 1u8 << (slot % 8);
        if used {
            self.data[slot / 8] |= mask;
        } else {
            self.data[slot / 8] &= !mask;
        }
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots).filter(|&s| !self.is_slot_used(s)).count()
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        (0..self.num_slots).find(|&s| !self.is_slot_used(s))
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let width = self.schema.tuple_width();
        let start = self.header_size() + slot * width;
        start..start + width
    }

    fn record_id(&self, slot: usize) -> RecordId {
        RecordId::new(self.page_id, slot as u16)
    }

    /// Decodes the tuple in `slot`, or `None` if the slot is empty.
    pub fn tuple(&self, slot: usize) -> StorageResult<Option<Tuple>> {
        if !self.is_slot_used(slot) {
            return Ok(None);
        }
        let values = self.schema.decode(&self.data[self.slot_range(slot)])?;
        Ok(Some(Tuple::with_record_id(self.record_id(slot), values)))
    }

    /// All occupied slots in ascending slot order, record ids attached.
    pub fn tuples(&self) -> StorageResult<Vec<Tuple>> {
        let mut tuples = Vec::with_capacity(self.num_slots - self.num_empty_slots());
        for slot in 0..self.num_slots {
            if let Some(tuple) = self.tuple(slot)? {
                tuples.push(tuple);
            }
        }
        Ok(tuples)
    }

    /// Writes `tuple` into the first free slot and returns its new location.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> StorageResult<RecordId> {
        let slot = self
            .first_free_slot()
            .ok_or(StorageError::PageFull(self.page_id))?;

        let range = self.slot_range(slot);
        self.schema.encode(&tuple.values, &mut self.data[range])?;
        self.set_slot_used(slot, true);

        Ok(self.record_id(slot))
    }

    /// Clears the occupancy bit of the slot named by the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> StorageResult<()> {
        let record_id = tuple.record_id.ok_or(StorageError::MissingRecordId)?;
        let slot = record_id.slot as usize;
        if record_id.page_id != self.page_id || !self.is_slot_used(slot) {
            return Err(StorageError::TupleNotFound { record_id });
        }

        self.set_slot_used(slot, false);
        Ok(())
    }
}

impl Page for HeapPage {
    fn page_id(&self) -> PageId {
        self.page_id
    }

    fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }

    fn page_data(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data[..])
    }
}

impl std::fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapPage")
            .field("page_id", &self.page_id)
            .field("num_slots", &self.num_slots)
            .field("empty_slots", &self.num_empty_slots())
            .field("dirtier", &self.dirtier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::{DataType, Value};
    use anyhow::Result;

    fn int_schema(columns: usize) -> Arc<Schema> {
        Arc::new(Schema::from_types(&vec![DataType::Int32; columns]))
    }

    fn row(schema: &Schema, seed: i32) -> Tuple {
        Tuple::new((0..schema.len() as i32).map(|i| Value::Int32(seed + i)).collect())
    }

    #[test]
    fn test_slot_math_for_20_byte_tuples() -> Result<()> {
        // floor(32768 / 161) = 203 slots, ceil(203 / 8) = 26 header bytes
        assert_eq!(slots_per_page(20), 203);
        assert_eq!(header_size(203), 26);

        let page = HeapPage::empty(PageId::new(1, 0), int_schema(5))?;
        assert_eq!(page.num_slots(), 203);
        assert_eq!(page.header_size(), 26);
        assert_eq!(page.num_empty_slots(), 203);
        assert!(page.header_size() + page.num_slots() * 20 <= PAGE_SIZE);
        Ok(())
    }

    #[test]
    fn test_fill_page_exactly() -> Result<()> {
        let schema = int_schema(5);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone())?;

        for i in 0..203 {
            let rid = page.insert_tuple(&row(&schema, i))?;
            assert_eq!(rid.slot as i32, i);
        }
        assert_eq!(page.num_empty_slots(), 0);
        assert!(matches!(
            page.insert_tuple(&row(&schema, 999)),
            Err(StorageError::PageFull(_))
        ));
        Ok(())
    }

    #[test]
    fn test_insert_uses_first_free_slot() -> Result<()> {
        let schema = int_schema(2);
        let mut page = HeapPage::empty(PageId::new(3, 7), schema.clone())?;

        let rids: Vec<_> = (0..4)
            .map(|i| page.insert_tuple(&row(&schema, i * 10)))
            .collect::<StorageResult<_>>()?;

        let victim = page.tuple(1)?.expect("slot 1 occupied");
        page.delete_tuple(&victim)?;
        assert!(!page.is_slot_used(1));
        assert_eq!(page.tuple(1)?, None);

        let rid = page.insert_tuple(&row(&schema, 500))?;
        assert_eq!(rid, rids[1]);
        assert_eq!(page.tuple(1)?.unwrap().values, row(&schema, 500).values);
        Ok(())
    }

    #[test]
    fn test_delete_checks() -> Result<()> {
        let schema = int_schema(1);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone())?;
        let rid = page.insert_tuple(&row(&schema, 1))?;

        assert!(matches!(
            page.delete_tuple(&row(&schema, 1)),
            Err(StorageError::MissingRecordId)
        ));

        let elsewhere = Tuple::with_record_id(RecordId::new(PageId::new(1, 5), rid.slot), vec![]);
        assert!(matches!(
            page.delete_tuple(&elsewhere),
            Err(StorageError::TupleNotFound { .. })
        ));

        let stored = page.tuple(rid.slot as usize)?.unwrap();
        page.delete_tuple(&stored)?;
        assert!(matches!(
            page.delete_tuple(&stored),
            Err(StorageError::TupleNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_encode_decode_round_trip() -> Result<()> {
        let schema = Arc::new(Schema::from_types(&[DataType::Int32, DataType::Varchar]));
        let page_id = PageId::new(4, 2);
        let mut page = HeapPage::empty(page_id, schema.clone())?;

        for (i, name) in ["ann", "bo", "cy"].iter().enumerate() {
            page.insert_tuple(&Tuple::new(vec![
                Value::Int32(i as i32),
                Value::String(name.to_string()),
            ]))?;
        }
        let middle = page.tuple(1)?.unwrap();
        page.delete_tuple(&middle)?;

        let encoded = page.page_data();
        assert_eq!(encoded.len(), PAGE_SIZE);

        let decoded = HeapPage::new(page_id, &encoded, schema)?;
        assert_eq!(decoded.page_data(), encoded);
        assert_eq!(decoded.tuples()?, page.tuples()?);
        assert!(decoded.is_slot_used(0));
        assert!(!decoded.is_slot_used(1));
        assert!(decoded.is_slot_used(2));
        Ok(())
    }

    #[test]
    fn test_unused_slot_bytes_survive() -> Result<()> {
        let schema = int_schema(1);
        let mut bytes = empty_page_data();
        let header = header_size(slots_per_page(4));
        bytes[header..header + 4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let page = HeapPage::new(PageId::new(1, 0), &bytes, schema)?;
        assert!(page.tuples()?.is_empty());
        assert_eq!(&page.page_data()[..], &bytes[..]);
        Ok(())
    }

    #[test]
    fn test_short_buffer_is_zero_padded() -> Result<()> {
        let schema = int_schema(1);
        let page = HeapPage::new(PageId::new(1, 0), &[0b0000_0001, 0, 0], schema)?;
        assert!(page.is_slot_used(0));
        assert_eq!(page.page_data().len(), PAGE_SIZE);
        let oversized = vec![0u8; PAGE_SIZE + 1];
        assert!(HeapPage::new(PageId::new(1, 0), &oversized, int_schema(1)).is_err());
        Ok(())
    }

    #[test]
    fn test_oversized_schema_rejected() {
        let schema = Arc::new(Schema::from_types(&vec![DataType::Varchar; 32]));
        assert!(matches!(
            HeapPage::empty(PageId::new(1, 0), schema),
            Err(StorageError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_dirty_tracking() -> Result<()> {
        let mut page = HeapPage::empty(PageId::new(1, 0), int_schema(1))?;
        assert!(!page.is_dirty());
        page.mark_dirty(Some(TransactionId(5)));
        assert_eq!(page.dirtier(), Some(TransactionId(5)));
        page.mark_dirty(None);
        assert!(!page.is_dirty());
        Ok(())
    }
}
