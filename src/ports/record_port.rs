//! Export port for book history.

use crate::domain::error::LedgerError;
use crate::domain::event::Record;

/// Sink for the tagged signal/order/fill history of a finished run.
pub trait RecordSink {
    /// Persist `records`, returning how many were written.
    fn write_records(&mut self, records: &[Record]) -> Result<usize, LedgerError>;
}
