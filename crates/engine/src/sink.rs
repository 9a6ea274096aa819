//! Output sinks for finished service records

use flowprint_common::{FlowprintError, FlowprintResult, ServiceRecord, Sink};
use parking_lot::Mutex;
use std::io::Write;

/// Writes one JSON object per record, newline delimited.
///
/// Write failures surface to the pipeline owner; there is no retry here.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Flush and hand the writer back, e.g. to inspect an in-memory buffer.
    pub fn into_inner(self) -> FlowprintResult<W> {
        let mut writer = self.writer.into_inner();
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
    fn emit(&self, record: &ServiceRecord) -> FlowprintResult<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| FlowprintError::Sink(e.to_string()))?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

/// Collects records in memory; for tests and for text-format CLI output.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ServiceRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<ServiceRecord> {
        self.records.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Sink for MemorySink {
    fn emit(&self, record: &ServiceRecord) -> FlowprintResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
