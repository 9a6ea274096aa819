//! Probe database: load-once, match-many
//!
//! The database is immutable after a successful load and safe for
//! unsynchronized concurrent reads; matching is a pure function over the
//! caller's bytes. Loading is all-or-nothing: one malformed record or
//! pattern and the whole database is rejected.

use crate::parser::{parse_source, RawProbe};
use crate::pattern::CompiledPattern;
use flowprint_common::{FlowprintError, FlowprintResult, MatchEngine};
use tracing::debug;

/// Ordered capture groups from one probe match; index 0 is the full match.
pub type Captures = Vec<Option<String>>;

/// One signature probe with its compiled pattern and field templates.
#[derive(Debug)]
pub struct ServiceProbe {
    pub ident: String,
    pub vendor: String,
    pub version: String,
    pub info: String,
    pub hostname: String,
    pattern: CompiledPattern,
}

impl ServiceProbe {
    fn compile(raw: RawProbe, engine: MatchEngine) -> FlowprintResult<Self> {
        let pattern = CompiledPattern::compile(&raw.pattern, raw.flags, engine).map_err(
            |message| FlowprintError::ProbeCompile {
                line: raw.line,
                message,
            },
        )?;
        Ok(Self {
            ident: raw.ident,
            vendor: raw.vendor,
            version: raw.version,
            info: raw.info,
            hostname: raw.hostname,
            pattern,
        })
    }
}

/// The immutable probe set, compiled for one engine at load time.
#[derive(Debug)]
pub struct ProbeDb {
    probes: Vec<ServiceProbe>,
    engine: MatchEngine,
}

/// Builtin probe set shipped with the crate; enough for smoke tests and
/// replays without an external nmap-service-probes file.
const BUILTIN_PROBES: &str = include_str!("../data/service-probes");

impl ProbeDb {
    /// Load a probe source, compiling every pattern for `engine`.
    pub fn load(source: &str, engine: MatchEngine) -> FlowprintResult<Self> {
        let probes = parse_source(source)?
            .into_iter()
            .map(|raw| ServiceProbe::compile(raw, engine))
            .collect::<FlowprintResult<Vec<_>>>()?;
        debug!(count = probes.len(), ?engine, "probe database loaded");
        Ok(Self { probes, engine })
    }

    /// Load the builtin probe set.
    pub fn load_builtin(engine: MatchEngine) -> FlowprintResult<Self> {
        Self::load(BUILTIN_PROBES, engine)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn engine(&self) -> MatchEngine {
        self.engine
    }

    /// Iterate probe identifiers in database order.
    pub fn idents(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|p| p.ident.as_str())
    }

    /// Try every probe against the banner, in database order, and return
    /// all matches. Matching never stops at the first hit: a generic probe
    /// and a vendor-specific one may both legitimately match, and later,
    /// more specific probes append additional evidence.
    pub fn match_all(&self, banner: &[u8]) -> Vec<(&ServiceProbe, Captures)> {
        let text = String::from_utf8_lossy(banner);
        self.probes
            .iter()
            .filter_map(|probe| probe.pattern.captures(&text).map(|caps| (probe, caps)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SSH_PROBES: &str = "\
match ssh m|^SSH-[\\d.]+-| i/generic/
match ssh m|^SSH-2\\.0-OpenSSH_(\\S+)| p/OpenBSD/ v/$1/
";

    #[test]
    fn builtin_set_loads_on_both_engines() {
        let linear = ProbeDb::load_builtin(MatchEngine::Linear).unwrap();
        assert!(!linear.is_empty());
        let backtracking = ProbeDb::load_builtin(MatchEngine::Backtracking).unwrap();
        assert_eq!(linear.len(), backtracking.len());
    }

    #[test]
    fn match_all_returns_every_hit_in_database_order() {
        let db = ProbeDb::load(TWO_SSH_PROBES, MatchEngine::Linear).unwrap();
        let matches = db.match_all(b"SSH-2.0-OpenSSH_8.9\r\n");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].0.info, "generic");
        assert_eq!(matches[1].0.vendor, "OpenBSD");
        // \S+ stops before the CRLF
        assert_eq!(matches[1].1[1].as_deref(), Some("OpenSSH_8.9"));
    }

    #[test]
    fn no_matches_on_unknown_banner() {
        let db = ProbeDb::load(TWO_SSH_PROBES, MatchEngine::Linear).unwrap();
        assert!(db.match_all(b"\x00\x01\x02 nothing here").is_empty());
    }

    #[test]
    fn load_is_all_or_nothing() {
        let src = "match good m|^ok|\nmatch bad m|([unclosed|\n";
        let err = ProbeDb::load(src, MatchEngine::Linear).unwrap_err();
        match err {
            FlowprintError::ProbeCompile { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_utf8_banner_still_matches_ascii_prefix() {
        let db = ProbeDb::load(TWO_SSH_PROBES, MatchEngine::Linear).unwrap();
        let mut banner = b"SSH-2.0-OpenSSH_9.6".to_vec();
        banner.extend_from_slice(&[0xff, 0xfe, 0x00]);
        let matches = db.match_all(&banner);
        assert_eq!(matches.len(), 2);
    }
}
