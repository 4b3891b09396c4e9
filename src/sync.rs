use crate::error::SinkError;
use crate::sink::{Sink, SinkTx};
use crate::types::ActivityRecord;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub elapsed: Duration,
}

/// Replace the whole table with `records`.
///
/// Truncate and inserts share one transaction: on any error the transaction is
/// dropped uncommitted and the table keeps its previous contents.
pub fn replace_all<S: Sink>(sink: &mut S, records: &[ActivityRecord]) -> Result<SyncReport, SinkError> {
    let started = Instant::now();

    let mut tx = sink.begin()?;
    tx.truncate()?;
    for record in records {
        tx.insert(record)?;
    }
    tx.commit()?;

    let report = SyncReport {
        inserted: records.len(),
        elapsed: started.elapsed(),
    };
    tracing::info!(
        rows = report.inserted,
        elapsed_ms = report.elapsed.as_millis(),
        "table replaced"
    );
    Ok(report)
}

/// Insert a single row and commit it.
pub fn append<S: Sink>(sink: &mut S, record: &ActivityRecord) -> Result<(), SinkError> {
    let mut tx = sink.begin()?;
    tx.insert(record)?;
    tx.commit()
}
