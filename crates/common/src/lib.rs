//! Flowprint Common - Shared types and traits
//!
//! This crate provides the core types, traits, and errors used across the
//! flowprint service identification engine.
//!
//! Key pieces:
//! - `FlowEvent` / `ServiceRecord`: input and output of the matching pipeline
//! - `EngineConfig`: banner cap, regex engine, sink mode
//! - `Encoder` / `Sink` / `PortResolver`: the seams between pipeline stages

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{FlowprintError, FlowprintResult};
pub use traits::{Encoder, PortResolver, Sink};
pub use types::{EngineConfig, FlowEvent, MatchEngine, ServiceRecord, SinkMode, Transport};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
