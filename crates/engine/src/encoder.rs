//! The service identification encoder
//!
//! Drives one banner event through the pipeline: dedup against the store,
//! truncate, match every probe, accumulate evidence, publish. Many flow
//! workers call `feed` concurrently; the store's atomic get-or-create
//! guarantees exactly one record per flow, and only the creating caller
//! pays for matching.

use crate::sink::MemorySink;
use crate::store::ServiceStore;
use flowprint_common::{
    Encoder, EngineConfig, FlowEvent, FlowprintError, FlowprintResult, PortResolver,
    ServiceRecord, Sink, SinkMode,
};
use flowprint_probes::template::{apply, combine};
use flowprint_probes::{Captures, ProbeDb, ServiceProbe};
use flowprint_resolver::WellKnownPorts;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the probe database is loaded from at setup.
#[derive(Debug, Clone, Default)]
pub enum ProbeSource {
    #[default]
    Builtin,
    Inline(String),
    Path(PathBuf),
}

pub struct ServiceEncoder {
    config: EngineConfig,
    probe_source: ProbeSource,
    db: Option<Arc<ProbeDb>>,
    store: ServiceStore,
    resolver: Arc<dyn PortResolver>,
    sink: Arc<dyn Sink>,
}

impl ServiceEncoder {
    #[must_use]
    pub fn new(config: EngineConfig, sink: Arc<dyn Sink>) -> Self {
        Self {
            config,
            probe_source: ProbeSource::default(),
            db: None,
            store: ServiceStore::new(),
            resolver: Arc::new(WellKnownPorts),
            sink,
        }
    }

    /// Convenience constructor for tests and text-mode output.
    #[must_use]
    pub fn with_memory_sink(config: EngineConfig) -> (Self, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Self::new(config, sink.clone()), sink)
    }

    #[must_use]
    pub fn with_probe_source(mut self, source: ProbeSource) -> Self {
        self.probe_source = source;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn PortResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &ServiceStore {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply one probe match to the record's accumulator fields.
    ///
    /// The identifier and the expanded info template feed `product`, the
    /// vendor template feeds `vendor`, version feeds `version`, and the
    /// hostname template lands in `notes`. Empty templates contribute
    /// nothing.
    fn accumulate(record: &mut ServiceRecord, probe: &ServiceProbe, captures: &Captures) {
        record.product = combine(&record.product, &probe.ident);
        if !probe.info.is_empty() {
            record.product = combine(&record.product, &apply(&probe.info, captures));
        }
        if !probe.vendor.is_empty() {
            record.vendor = combine(&record.vendor, &apply(&probe.vendor, captures));
        }
        if !probe.version.is_empty() {
            record.version = combine(&record.version, &apply(&probe.version, captures));
        }
        if !probe.hostname.is_empty() {
            record.notes = combine(&record.notes, &apply(&probe.hostname, captures));
        }
    }
}

impl Encoder for ServiceEncoder {
    /// Load the probe database. Idempotent; a load failure is fatal to the
    /// whole pipeline.
    fn setup(&mut self) -> FlowprintResult<()> {
        if self.db.is_some() {
            return Ok(());
        }

        let db = match &self.probe_source {
            ProbeSource::Builtin => ProbeDb::load_builtin(self.config.match_engine)?,
            ProbeSource::Inline(source) => ProbeDb::load(source, self.config.match_engine)?,
            ProbeSource::Path(path) => {
                let source = std::fs::read_to_string(path)?;
                ProbeDb::load(&source, self.config.match_engine)?
            }
        };

        info!(
            probes = db.len(),
            engine = ?self.config.match_engine,
            sink_mode = ?self.config.sink_mode,
            "service encoder ready"
        );
        self.db = Some(Arc::new(db));
        Ok(())
    }

    fn feed(&self, event: FlowEvent) -> FlowprintResult<()> {
        let db = self.db.as_ref().ok_or(FlowprintError::NotSetUp)?;

        // The first observed banner for a flow is authoritative; repeat
        // deliveries (retransmits, chunked application data) are dropped.
        if self.store.contains(&event.flow_id) {
            return Ok(());
        }

        let FlowEvent {
            flow_id,
            first_seen,
            dst_ip,
            dst_port,
            transport,
            mut banner,
            ..
        } = event;

        let (handle, created) = self
            .store
            .get_or_create(&flow_id, || ServiceRecord::new(first_seen));
        if !created {
            // lost the race; the winner populates the record
            return Ok(());
        }

        banner.truncate(self.config.banner_max_bytes);

        // Matching is a pure function over the local byte copy; no lock
        // is held while the probe set runs.
        let matches = db.match_all(&banner);
        let name = self
            .resolver
            .lookup(dst_port, transport)
            .unwrap_or_default()
            .to_string();

        debug!(flow = %flow_id, matches = matches.len(), "service record created");

        handle.with_lock(|record| {
            record.flow = flow_id;
            record.ip = dst_ip.to_string();
            record.port = dst_port;
            record.transport = Some(transport);
            record.name = name;
            record.banner = banner;
            for (probe, captures) in &matches {
                Self::accumulate(record, probe, captures);
            }
        });

        if self.config.sink_mode == SinkMode::Streaming {
            handle.with_lock(|record| self.sink.emit(record))?;
        }
        Ok(())
    }

    /// Batch mode: flush every stored record through the sink, each read
    /// under its record lock. Streaming mode already published at creation
    /// time, so this is a no-op.
    fn teardown(&self) -> FlowprintResult<()> {
        if self.config.sink_mode == SinkMode::Streaming {
            return Ok(());
        }

        let mut result = Ok(());
        self.store.for_each(|_, handle| {
            if result.is_ok() {
                result = handle.with_lock(|record| self.sink.emit(record));
            }
        });
        info!(records = self.store.len(), "service store flushed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flowprint_common::{MatchEngine, Transport};
    use std::net::{IpAddr, Ipv4Addr};

    fn event(flow_id: &str, port: u16, banner: &[u8]) -> FlowEvent {
        FlowEvent::new(
            flow_id,
            Utc::now(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            port,
        )
        .with_source(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 51234)
        .with_banner(banner.to_vec())
    }

    fn batch_encoder(source: ProbeSource) -> (ServiceEncoder, Arc<MemorySink>) {
        let (mut encoder, sink) = ServiceEncoder::with_memory_sink(EngineConfig::default());
        encoder = encoder.with_probe_source(source);
        encoder.setup().unwrap();
        (encoder, sink)
    }

    #[test]
    fn feed_before_setup_fails() {
        let (encoder, _) = ServiceEncoder::with_memory_sink(EngineConfig::default());
        let err = encoder.feed(event("f", 22, b"SSH-2.0-X\r\n")).unwrap_err();
        assert!(matches!(err, FlowprintError::NotSetUp));
    }

    #[test]
    fn setup_is_idempotent() {
        let (mut encoder, _) = ServiceEncoder::with_memory_sink(EngineConfig::default());
        encoder.setup().unwrap();
        encoder.setup().unwrap();
    }

    #[test]
    fn identifies_ssh_with_builtin_probes() {
        let (encoder, sink) = batch_encoder(ProbeSource::Builtin);
        encoder
            .feed(event("192.168.1.10:22", 22, b"SSH-2.0-OpenSSH_8.9\r\n"))
            .unwrap();
        encoder.teardown().unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.name, "ssh");
        assert_eq!(rec.ip, "192.168.1.10");
        assert_eq!(rec.port, 22);
        assert_eq!(rec.transport, Some(Transport::TCP));
        assert!(rec.product.contains("ssh"));
        assert!(rec.vendor.contains("OpenBSD"));
        assert!(rec.version.contains("8.9"));
    }

    #[test]
    fn scenario_openssh_version_excludes_trailing_crlf() {
        let source = "match OpenSSH m|^SSH-2\\.0-OpenSSH_(\\S+)| v/$1/";
        let (encoder, sink) = batch_encoder(ProbeSource::Inline(source.into()));
        encoder
            .feed(event("f", 22, b"SSH-2.0-OpenSSH_8.9\r\n"))
            .unwrap();
        encoder.teardown().unwrap();

        let rec = &sink.records()[0];
        assert_eq!(rec.product, "OpenSSH");
        assert_eq!(rec.version, "8.9");
    }

    #[test]
    fn accumulation_preserves_database_order() {
        let source = "\
match generic m|^SSH-| v/unknown/
match OpenSSH m|^SSH-2\\.0-OpenSSH_(\\S+)| v/$1/
";
        let (encoder, sink) = batch_encoder(ProbeSource::Inline(source.into()));
        encoder
            .feed(event("f", 22, b"SSH-2.0-OpenSSH_8.9\r\n"))
            .unwrap();
        encoder.teardown().unwrap();

        let rec = &sink.records()[0];
        assert_eq!(rec.product, "generic | OpenSSH");
        assert_eq!(rec.version, "unknown | 8.9");
    }

    #[test]
    fn empty_match_still_produces_a_record() {
        let (encoder, sink) = batch_encoder(ProbeSource::Builtin);
        encoder
            .feed(event("192.168.1.10:9999", 9999, b"\x00\x01\x02 proprietary"))
            .unwrap();
        encoder.teardown().unwrap();

        let rec = &sink.records()[0];
        assert!(rec.is_unidentified());
        assert!(rec.name.is_empty()); // 9999 is not a well-known port
        assert_eq!(rec.ip, "192.168.1.10");
        assert_eq!(rec.port, 9999);
        assert!(rec.first_seen.is_some());
    }

    #[test]
    fn first_banner_is_authoritative() {
        let (encoder, sink) = batch_encoder(ProbeSource::Builtin);
        encoder
            .feed(event("192.168.1.10:22", 22, b"SSH-2.0-OpenSSH_8.9\r\n"))
            .unwrap();
        encoder
            .feed(event("192.168.1.10:22", 22, b"SSH-2.0-OpenSSH_9.6\r\n"))
            .unwrap();
        encoder.teardown().unwrap();

        assert_eq!(encoder.store().len(), 1);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].version.contains("8.9"));
        assert!(!records[0].version.contains("9.6"));
    }

    #[test]
    fn truncation_caps_stored_banner_and_matching() {
        // cap cuts the banner off before the version suffix
        let config = EngineConfig::default().with_banner_max_bytes(16);
        let (mut encoder, sink) = ServiceEncoder::with_memory_sink(config);
        encoder = encoder.with_probe_source(ProbeSource::Inline(
            "match OpenSSH m|^SSH-2\\.0-OpenSSH_(\\S+)| v/$1/\nmatch ssh m|^SSH-2\\.0| i/generic/\n"
                .into(),
        ));
        encoder.setup().unwrap();

        let banner = b"SSH-2.0-OpenSSH_8.9p1 extra trailing data";
        encoder.feed(event("f", 22, banner)).unwrap();
        encoder.teardown().unwrap();

        let rec = &sink.records()[0];
        assert_eq!(rec.banner, &banner[..16]);
        // the version probe needs byte 17+, so only the generic probe hits:
        // truncate-then-match behaves exactly like matching the prefix alone
        assert_eq!(rec.product, "ssh | generic");
        assert!(rec.version.is_empty());
    }

    #[test]
    fn streaming_emits_at_creation_and_teardown_is_a_noop() {
        let (mut encoder, sink) = ServiceEncoder::with_memory_sink(EngineConfig::streaming());
        encoder.setup().unwrap();

        encoder
            .feed(event("192.168.1.10:22", 22, b"SSH-2.0-OpenSSH_8.9\r\n"))
            .unwrap();
        assert_eq!(sink.len(), 1);

        encoder.teardown().unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn udp_transport_resolves_udp_names() {
        let (encoder, sink) = batch_encoder(ProbeSource::Builtin);
        let ev = FlowEvent::new(
            "10.0.0.1:161",
            Utc::now(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            161,
        )
        .with_transport(Transport::UDP)
        .with_banner(b"\x30\x26\x02\x01".to_vec());
        encoder.feed(ev).unwrap();
        encoder.teardown().unwrap();

        assert_eq!(sink.records()[0].name, "snmp");
    }

    #[test]
    fn custom_resolver_feeds_the_name_field() {
        struct StaticResolver;
        impl flowprint_common::PortResolver for StaticResolver {
            fn lookup(&self, port: u16, _transport: Transport) -> Option<&str> {
                (port == 4222).then_some("nats")
            }
        }

        let (mut encoder, sink) = ServiceEncoder::with_memory_sink(EngineConfig::default());
        encoder = encoder.with_resolver(Arc::new(StaticResolver));
        encoder.setup().unwrap();
        encoder.feed(event("f", 4222, b"INFO {}\r\n")).unwrap();
        encoder.teardown().unwrap();

        assert_eq!(sink.records()[0].name, "nats");
    }

    #[test]
    fn distinct_flows_make_distinct_records() {
        let (encoder, sink) = batch_encoder(ProbeSource::Builtin);
        encoder
            .feed(event("192.168.1.10:22", 22, b"SSH-2.0-OpenSSH_8.9\r\n"))
            .unwrap();
        encoder
            .feed(event("192.168.1.10:80", 80, b"HTTP/1.1 200 OK\r\n"))
            .unwrap();
        encoder.teardown().unwrap();

        assert_eq!(encoder.store().len(), 2);
        assert_eq!(sink.len(), 2);
    }
}
