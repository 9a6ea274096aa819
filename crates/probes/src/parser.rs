//! Parser for the line-oriented signature probe format
//!
//! A pragmatic subset of the nmap-service-probes grammar: one `match`
//! record per line, `m|pattern|flags` plus `p// v// i// h//` versioninfo
//! field templates (see <https://nmap.org/book/vscan-fileformat.html>).
//! Directive lines that only matter for active probing (`Probe`, `rarity`,
//! `ports`, ...) are skipped, as are `softmatch` records and comments.
//!
//! Parsing is strict about the records it does consume: a malformed
//! `match` line aborts the whole load with its line number.

use crate::pattern::PatternFlags;
use flowprint_common::{FlowprintError, FlowprintResult};

/// A `match` record as written in the probe file, before pattern
/// compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProbe {
    /// 1-based line number in the source, for load-error diagnostics.
    pub line: usize,
    /// Short name of the matched service family.
    pub ident: String,
    pub pattern: String,
    pub flags: PatternFlags,
    /// `p//` template: vendor / product name.
    pub vendor: String,
    /// `v//` template.
    pub version: String,
    /// `i//` template.
    pub info: String,
    /// `h//` template.
    pub hostname: String,
}

/// Parse an entire probe source into raw records, in file order.
pub fn parse_source(source: &str) -> FlowprintResult<Vec<RawProbe>> {
    let mut probes = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("match ") {
            probes.push(parse_match(rest.trim_start(), line_no)?);
            continue;
        }
        // softmatch records and active-probe directives (Probe, rarity,
        // ports, fallback, Exclude, ...) carry nothing we can use.
    }

    Ok(probes)
}

fn parse_err(line: usize, message: impl Into<String>) -> FlowprintError {
    FlowprintError::ProbeParse {
        line,
        message: message.into(),
    }
}

/// Parse the remainder of a `match` line: `<ident> m|pattern|flags [fields]`.
fn parse_match(rest: &str, line: usize) -> FlowprintResult<RawProbe> {
    let (ident, rest) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| parse_err(line, "missing pattern after service identifier"))?;
    let rest = rest.trim_start();

    let rest = rest
        .strip_prefix('m')
        .ok_or_else(|| parse_err(line, "expected m<delim>pattern<delim>"))?;
    let (pattern, rest) = read_delimited(rest)
        .ok_or_else(|| parse_err(line, "unterminated pattern delimiter"))?;

    let mut flags = PatternFlags::default();
    let mut rest = rest;
    while let Some(c) = rest.chars().next() {
        match c {
            'i' => flags.case_insensitive = true,
            's' => flags.dot_matches_newline = true,
            c if c.is_whitespace() => break,
            other => return Err(parse_err(line, format!("unknown pattern flag '{other}'"))),
        }
        rest = &rest[c.len_utf8()..];
    }

    let mut probe = RawProbe {
        line,
        ident: ident.to_string(),
        pattern: pattern.to_string(),
        flags,
        ..Default::default()
    };
    parse_versioninfo(rest.trim_start(), line, &mut probe)?;
    Ok(probe)
}

/// Parse trailing versioninfo fields: `p/../ v/../ i/../ h/../ o/../ d/../`
/// plus `cpe:/../`. OS, device type and CPE fields are recognized but not
/// retained; identification here is about the service, not the platform.
fn parse_versioninfo(mut rest: &str, line: usize, probe: &mut RawProbe) -> FlowprintResult<()> {
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(());
        }

        if let Some(cpe_rest) = rest.strip_prefix("cpe:") {
            let (_, after) = read_delimited(cpe_rest)
                .ok_or_else(|| parse_err(line, "unterminated cpe field"))?;
            rest = after.strip_prefix('a').unwrap_or(after);
            continue;
        }

        let letter = rest.chars().next().unwrap_or_default();
        let (value, after) = read_delimited(&rest[letter.len_utf8()..])
            .ok_or_else(|| parse_err(line, format!("unterminated '{letter}' field")))?;
        match letter {
            'p' => probe.vendor = value.to_string(),
            'v' => probe.version = value.to_string(),
            'i' => probe.info = value.to_string(),
            'h' => probe.hostname = value.to_string(),
            'o' | 'd' => {}
            other => {
                return Err(parse_err(line, format!("unknown versioninfo field '{other}'")))
            }
        }
        rest = after;
    }
}

/// Read `<delim>content<delim>` where the first character names the
/// delimiter; returns the content and what follows the closing delimiter.
fn read_delimited(s: &str) -> Option<(&str, &str)> {
    let delim = s.chars().next()?;
    let body = &s[delim.len_utf8()..];
    let end = body.find(delim)?;
    Some((&body[..end], &body[end + delim.len_utf8()..]))
}
