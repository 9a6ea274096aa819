//! Flowprint Probes - signature database and template engine
//!
//! This crate owns everything about probe signatures:
//! - parsing the line-oriented (nmap-service-probes style) match format
//! - compiling patterns for the linear or backtracking regex engine
//! - running every probe against a banner, in database order
//! - `$N` template substitution and the evidence combine rule

mod db;
mod parser;
mod pattern;
pub mod template;

pub use db::{Captures, ProbeDb, ServiceProbe};
pub use parser::{parse_source, RawProbe};
pub use pattern::{CompiledPattern, PatternFlags};
