//! Capture buffer
//!
//! Append-only, insertion-ordered store of event records. Storage sits behind
//! `RecordStore` so a capped variant can replace the default unbounded one.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::record::EventRecord;

/// Where the interception layer sends records
pub trait CaptureSink {
    fn capture(&self, record: EventRecord);
}

/// Backing storage for a capture buffer
pub trait RecordStore {
    fn push(&mut self, record: EventRecord);
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Option<&EventRecord>;
    fn iter(&self) -> Box<dyn Iterator<Item = &EventRecord> + '_>;

    /// Records dropped from the front so far
    fn evicted(&self) -> u64 {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grows without limit
#[derive(Debug, Default)]
pub struct UnboundedStore {
    records: Vec<EventRecord>,
}

impl UnboundedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for UnboundedStore {
    fn push(&mut self, record: EventRecord) {
        self.records.push(record);
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> Option<&EventRecord> {
        self.records.get(index)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &EventRecord> + '_> {
        Box::new(self.records.iter())
    }
}

/// Keeps the newest `capacity` records. A capacity of 0 is raised to 1.
#[derive(Debug)]
pub struct RingStore {
    records: VecDeque<EventRecord>,
    capacity: usize,
    evicted: u64,
}

impl RingStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

}

impl RecordStore for RingStore {
    fn push(&mut self, record: EventRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
            self.evicted += 1;
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> Option<&EventRecord> {
        self.records.get(index)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &EventRecord> + '_> {
        Box::new(self.records.iter())
    }

    fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// The overlay's record store
pub struct CaptureBuffer {
    store: RefCell<Box<dyn RecordStore>>,
    // Records captured while the store is borrowed by a reader
    pending: RefCell<VecDeque<EventRecord>>,
}

impl CaptureBuffer {
    /// Unbounded buffer
    pub fn new() -> Self {
        Self::with_store(Box::new(UnboundedStore::new()))
    }

    /// Capped buffer
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_store(Box::new(RingStore::new(capacity)))
    }

    pub fn with_store(store: Box<dyn RecordStore>) -> Self {
        Self {
            store: RefCell::new(store),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    /// Append one record
    pub fn push(&self, record: EventRecord) {
        match self.store.try_borrow_mut() {
            Ok(mut store) => {
                Self::drain_pending(&self.pending, &mut store);
                store.push(record);
            }
            Err(_) => self.pending.borrow_mut().push_back(record),
        }
    }

    pub fn len(&self) -> usize {
        self.flush();
        self.store.borrow().len() + self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records evicted by a capped store; position `i` holds the
    /// `evicted() + i`-th record ever appended
    pub fn evicted(&self) -> u64 {
        self.flush();
        self.store.borrow().evicted()
    }

    pub fn get(&self, index: usize) -> Option<EventRecord> {
        self.flush();
        self.store.borrow().get(index).cloned()
    }

    /// Owned copy of every record, oldest first
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.with_records(|records| records.cloned().collect())
    }

    /// Borrow the records in insertion order
    pub fn with_records<R>(&self, f: impl FnOnce(&mut dyn Iterator<Item = &EventRecord>) -> R) -> R {
        self.flush();
        let store = self.store.borrow();
        let mut iter = store.iter();
        f(&mut iter)
    }

    fn flush(&self) {
        if let Ok(mut store) = self.store.try_borrow_mut() {
            Self::drain_pending(&self.pending, &mut store);
        }
    }

    fn drain_pending(pending: &RefCell<VecDeque<EventRecord>>, store: &mut Box<dyn RecordStore>) {
        let mut pending = pending.borrow_mut();
        while let Some(record) = pending.pop_front() {
            store.push(record);
        }
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSink for CaptureBuffer {
    fn capture(&self, record: EventRecord) {
        tracing::trace!(kind = %record.kind(), "captured record");
        self.push(record);
    }
}
