//! Core traits for flowprint pipeline stages
//!
//! The matching path is synchronous by design: all synchronization is
//! short-held mutual exclusion, nothing in the engine suspends. Traits are
//! object-safe so the pipeline can hold `Arc<dyn Sink>` etc.

use crate::error::FlowprintResult;
use crate::types::{FlowEvent, ServiceRecord, Transport};

/// Three-phase contract every pipeline stage must honor.
///
/// `setup` is idempotent and runs once; a failure there is fatal to the
/// whole pipeline. `feed` runs once per reassembled banner event and must
/// not block the caller beyond store/record lock hold times. `teardown`
/// drains whatever the stage accumulated; the host pipeline guarantees all
/// feeds have drained before calling it.
pub trait Encoder: Send + Sync {
    fn setup(&mut self) -> FlowprintResult<()>;

    fn feed(&self, event: FlowEvent) -> FlowprintResult<()>;

    fn teardown(&self) -> FlowprintResult<()>;
}

/// Output sink for finished service records.
///
/// In streaming mode `emit` is called once per record at creation time; in
/// batch mode it is called for every stored record during teardown. Write
/// failures are escalated to the pipeline owner; retry policy belongs to
/// the sink, not the matcher.
pub trait Sink: Send + Sync {
    fn emit(&self, record: &ServiceRecord) -> FlowprintResult<()>;
}

/// Best-effort port to well-known-service-name resolution.
///
/// Pure and side-effect free; must not block. `None` on unknown ports,
/// which leaves the record's `name` field empty and is never an error.
pub trait PortResolver: Send + Sync {
    fn lookup(&self, port: u16, transport: Transport) -> Option<&str>;
}
