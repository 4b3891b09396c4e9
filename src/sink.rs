//! Destination table abstraction.
//!
//! A [`Sink`] hands out transactions; nothing becomes visible to other
//! sessions until [`SinkTx::commit`] succeeds, and dropping a transaction
//! without committing discards everything staged in it.

use crate::error::SinkError;
use crate::types::ActivityRecord;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const TABLE: &str = "activity_log";

pub trait Sink {
    type Tx<'a>: SinkTx
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Tx<'_>, SinkError>;
}

pub trait SinkTx {
    /// Empty the table.
    fn truncate(&mut self) -> Result<(), SinkError>;

    fn insert(&mut self, record: &ActivityRecord) -> Result<(), SinkError>;

    fn commit(self) -> Result<(), SinkError>;
}

/// In-process `activity_log`, shared between every sink created from it.
///
/// Used by `--dry-run` and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Arc<Mutex<Vec<ActivityRecord>>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new session on this table.
    pub fn sink(&self) -> MemorySink {
        MemorySink {
            table: self.clone(),
            fail_on_insert: None,
            inserts: 0,
        }
    }

    /// Committed rows, in insertion order.
    pub fn rows(&self) -> Vec<ActivityRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ActivityRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct MemorySink {
    table: MemoryTable,
    fail_on_insert: Option<usize>,
    inserts: usize,
}

impl MemorySink {
    /// Make the `n`th insert issued through this session (0-based) fail.
    #[must_use]
    pub fn fail_on_insert(mut self, n: usize) -> Self {
        self.fail_on_insert = Some(n);
        self
    }
}

impl Sink for MemorySink {
    type Tx<'a> = MemoryTx<'a>;

    fn begin(&mut self) -> Result<MemoryTx<'_>, SinkError> {
        Ok(MemoryTx {
            sink: self,
            truncate: false,
            staged: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub struct MemoryTx<'a> {
    sink: &'a mut MemorySink,
    truncate: bool,
    staged: Vec<ActivityRecord>,
}

impl SinkTx for MemoryTx<'_> {
    fn truncate(&mut self) -> Result<(), SinkError> {
        self.truncate = true;
        self.staged.clear();
        Ok(())
    }

    fn insert(&mut self, record: &ActivityRecord) -> Result<(), SinkError> {
        let n = self.sink.inserts;
        self.sink.inserts += 1;
        if self.sink.fail_on_insert == Some(n) {
            return Err(SinkError::Rejected(format!(
                "insert #{n} rejected ({})",
                record.relative_path()
            )));
        }
        self.staged.push(record.clone());
        Ok(())
    }

    fn commit(self) -> Result<(), SinkError> {
        let mut rows = self.sink.table.lock();
        if self.truncate {
            rows.clear();
        }
        rows.extend(self.staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityType;
    use chrono::DateTime;

    fn rec(secs: i32) -> ActivityRecord {
        ActivityRecord {
            activity_type: ActivityType::Run,
            timestamp: DateTime::parse_from_rfc3339("2024-01-01T08:00:00+00:00").unwrap(),
            active_seconds: secs,
            average_heart_rate: 100,
            max_heart_rate: 140,
        }
    }

    #[test]
    fn nothing_is_visible_before_commit() {
        let table = MemoryTable::new();
        let mut sink = table.sink();

        let mut tx = sink.begin().unwrap();
        tx.insert(&rec(1)).unwrap();
        assert!(table.is_empty());
        tx.commit().unwrap();

        assert_eq!(table.rows(), vec![rec(1)]);
    }

    #[test]
    fn dropped_transaction_is_rolled_back() {
        let table = MemoryTable::new();
        let mut sink = table.sink();
        {
            let mut tx = sink.begin().unwrap();
            tx.insert(&rec(1)).unwrap();
            tx.commit().unwrap();
        }
        {
            let mut tx = sink.begin().unwrap();
            tx.truncate().unwrap();
            tx.insert(&rec(2)).unwrap();
        }
        assert_eq!(table.rows(), vec![rec(1)]);
    }

    #[test]
    fn sessions_share_the_table() {
        let table = MemoryTable::new();
        let mut a = table.sink();
        let mut b = table.sink();

        let mut tx = a.begin().unwrap();
        tx.insert(&rec(1)).unwrap();
        tx.commit().unwrap();

        let mut tx = b.begin().unwrap();
        tx.insert(&rec(2)).unwrap();
        tx.commit().unwrap();

        assert_eq!(table.len(), 2);
    }

    #[test]
    fn injected_failure_hits_the_requested_insert() {
        let table = MemoryTable::new();
        let mut sink = table.sink().fail_on_insert(1);

        let mut tx = sink.begin().unwrap();
        tx.insert(&rec(1)).unwrap();
        assert!(matches!(tx.insert(&rec(2)), Err(SinkError::Rejected(_))));
        tx.insert(&rec(3)).unwrap();
    }
}
