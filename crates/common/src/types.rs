//! Core data types for the flowprint service identification engine
//!
//! Tuned the same way as the rest of the workspace hot paths:
//! - public fields on event/record types for direct access in the feed loop
//! - builder-style methods that consume `self` to avoid extra clones
//! - `#[inline]` on small helpers
//!
//! NOTE: `first_seen` is a `chrono::DateTime<Utc>` so records serialize to a
//! stable, human-readable timestamp in the JSONL sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Transport layer of an observed flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    TCP,
    UDP,
}

impl Transport {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Transport::TCP => "tcp",
            Transport::UDP => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regex engine used to match probe patterns against banners.
///
/// `Linear` is the default for arbitrary network input: worst-case cost is
/// bounded by banner length x pattern size, so a crafted banner cannot
/// trigger catastrophic backtracking. `Backtracking` supports backreferences
/// at the cost of potentially exponential matching time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchEngine {
    #[default]
    Linear,
    Backtracking,
}

/// Whether finished records are emitted per flow or flushed once at teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkMode {
    Streaming,
    #[default]
    Batch,
}

/// Engine tuning options, resolved once at setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on stored banner bytes; bytes beyond it are discarded
    /// before matching. Unlimited retention is a memory-exhaustion risk.
    pub banner_max_bytes: usize,
    pub match_engine: MatchEngine,
    pub sink_mode: SinkMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            banner_max_bytes: 512,
            match_engine: MatchEngine::Linear,
            sink_mode: SinkMode::Batch,
        }
    }
}

impl EngineConfig {
    /// Streaming preset: emit each record at creation time.
    #[inline]
    #[must_use]
    pub fn streaming() -> Self {
        Self {
            sink_mode: SinkMode::Streaming,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_banner_max_bytes(mut self, cap: usize) -> Self {
        self.banner_max_bytes = cap;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_match_engine(mut self, engine: MatchEngine) -> Self {
        self.match_engine = engine;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_sink_mode(mut self, mode: SinkMode) -> Self {
        self.sink_mode = mode;
        self
    }
}

/// One reassembled banner event delivered by the capture pipeline.
///
/// The supplier guarantees per-flow ordering: a flow's first banner arrives
/// before any later banner for the same flow. No cross-flow ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    /// Stable flow identifier; dedup key for the service store.
    pub flow_id: String,
    pub first_seen: DateTime<Utc>,
    pub src_ip: IpAddr,
    pub src_port: u16,
    pub dst_ip: IpAddr,
    pub dst_port: u16,
    pub transport: Transport,
    /// Raw application-layer bytes captured at the start of the connection.
    #[serde(with = "banner_bytes")]
    pub banner: Vec<u8>,
}

impl FlowEvent {
    #[inline]
    #[must_use]
    pub fn new(
        flow_id: impl Into<String>,
        first_seen: DateTime<Utc>,
        dst_ip: IpAddr,
        dst_port: u16,
    ) -> Self {
        Self {
            flow_id: flow_id.into(),
            first_seen,
            src_ip: dst_ip,
            src_port: 0,
            dst_ip,
            dst_port,
            transport: Transport::TCP,
            banner: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_source(mut self, src_ip: IpAddr, src_port: u16) -> Self {
        self.src_ip = src_ip;
        self.src_port = src_port;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<Vec<u8>>) -> Self {
        self.banner = banner.into();
        self
    }
}

/// The identification result for one observed service endpoint.
///
/// `product`, `vendor`, `version` and `notes` are accumulator fields: each
/// matching probe appends evidence through the combine rule rather than
/// overwriting, so partial matches from several probes all survive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub first_seen: Option<DateTime<Utc>>,
    /// Client flow discriminator, e.g. "10.0.0.5:51234->192.168.1.1:22".
    pub flow: String,
    pub ip: String,
    pub port: u16,
    pub transport: Option<Transport>,
    /// Well-known service name from the port resolver; set at most once,
    /// empty on resolver miss.
    pub name: String,
    /// Stored banner, already truncated to the configured cap.
    #[serde(with = "banner_bytes")]
    pub banner: Vec<u8>,
    pub product: String,
    pub vendor: String,
    pub version: String,
    pub notes: String,
}

impl ServiceRecord {
    /// Records start from a timestamp only; the pipeline fills in the rest.
    #[inline]
    #[must_use]
    pub fn new(first_seen: DateTime<Utc>) -> Self {
        Self {
            first_seen: Some(first_seen),
            ..Default::default()
        }
    }

    /// True when no probe contributed any evidence.
    #[inline]
    #[must_use]
    pub fn is_unidentified(&self) -> bool {
        self.product.is_empty()
            && self.vendor.is_empty()
            && self.version.is_empty()
            && self.notes.is_empty()
    }
}

/// Serialize banner bytes as a (lossy) UTF-8 string so JSONL events and
/// records stay hand-editable; deserialization takes the string's bytes.
mod banner_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        Ok(s.into_bytes())
    }
}
