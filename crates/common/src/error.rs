//! Error types for the flowprint engine
//!
//! A probe database that fails to parse is fatal: no identification is
//! possible without it. Everything that can go wrong per-event (resolver
//! miss, zero matches, out-of-range capture group) is deliberately NOT an
//! error and never surfaces here.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowprintError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("probe database parse error at line {line}: {message}")]
    ProbeParse { line: usize, message: String },

    #[error("probe pattern failed to compile at line {line}: {message}")]
    ProbeCompile { line: usize, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("encoder used before setup completed")]
    NotSetUp,
}

/// Result type alias for flowprint operations
pub type FlowprintResult<T> = Result<T, FlowprintError>;
