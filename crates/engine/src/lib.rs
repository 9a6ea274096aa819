//! Flowprint Engine - concurrent store, matching pipeline, sinks
//!
//! The synchronization core of flowprint:
//! - `ServiceStore`: deduplicating registry, atomic get-or-create per flow
//! - `ServiceEncoder`: setup / feed / teardown lifecycle around the
//!   probe-matching pipeline
//! - `JsonLinesSink` / `MemorySink`: streaming or batch record output

mod encoder;
mod sink;
mod store;

pub use encoder::{ProbeSource, ServiceEncoder};
pub use sink::{JsonLinesSink, MemorySink};
pub use store::{ServiceHandle, ServiceStore};
