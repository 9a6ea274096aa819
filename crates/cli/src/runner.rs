// runner.rs
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use flowprint_common::{
    Encoder, EngineConfig, FlowEvent, MatchEngine, Sink, SinkMode,
};
use flowprint_engine::{JsonLinesSink, MemorySink, ProbeSource, ServiceEncoder};
use flowprint_probes::ProbeDb;

use crate::output::print_records;

pub async fn run_replay(
    input: Option<PathBuf>,
    probes: Option<PathBuf>,
    banner_max_bytes: usize,
    engine: String,
    sink_mode: String,
    output_format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = EngineConfig::default()
        .with_banner_max_bytes(banner_max_bytes)
        .with_match_engine(parse_engine(&engine)?)
        .with_sink_mode(parse_sink_mode(&sink_mode)?);

    info!("Starting replay...");
    info!("Banner cap: {} bytes", config.banner_max_bytes);
    info!("Match engine: {}", engine);
    info!("Sink mode: {}", sink_mode);

    // Text output collects in memory and prints a table at the end; json
    // streams records through the JSONL sink as the engine publishes them.
    let (sink, collected): (Arc<dyn Sink>, Option<Arc<MemorySink>>) =
        match output_format.as_str() {
            "json" => {
                let writer: Box<dyn Write + Send> = match &output {
                    Some(path) => Box::new(
                        std::fs::File::create(path)
                            .with_context(|| format!("cannot create {}", path.display()))?,
                    ),
                    None => Box::new(std::io::stdout()),
                };
                (Arc::new(JsonLinesSink::new(writer)), None)
            }
            _ => {
                let mem = Arc::new(MemorySink::new());
                (mem.clone(), Some(mem))
            }
        };

    let probe_source = match probes {
        Some(path) => ProbeSource::Path(path),
        None => ProbeSource::Builtin,
    };
    let mut encoder = ServiceEncoder::new(config, sink).with_probe_source(probe_source);
    encoder
        .setup()
        .context("failed to load probe database")?;

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let start = Instant::now();
    let mut events = 0usize;
    let mut skipped = 0usize;
    let mut line_no = 0usize;

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<FlowEvent>(line) {
            Ok(event) => {
                events += 1;
                encoder.feed(event)?;
            }
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed event at line {}: {}", line_no, e);
            }
        }
    }

    encoder.teardown().context("failed to flush records")?;
    let duration = start.elapsed();

    info!(
        "Replay complete: {} events, {} skipped, {} records",
        events,
        skipped,
        encoder.store().len()
    );

    if let Some(mem) = collected {
        print_records(&mem.records(), duration);
    }
    Ok(())
}

pub fn run_probes(file: Option<PathBuf>, engine: String) -> Result<()> {
    let engine = parse_engine(&engine)?;
    let db = match &file {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            ProbeDb::load(&source, engine).context("probe database rejected")?
        }
        None => ProbeDb::load_builtin(engine).context("builtin probe set rejected")?,
    };

    println!(
        "{} probes loaded ({:?} engine)",
        db.len(),
        db.engine()
    );
    let mut idents: Vec<&str> = db.idents().collect();
    idents.sort_unstable();
    idents.dedup();
    println!("services: {}", idents.join(", "));
    Ok(())
}

fn parse_engine(s: &str) -> Result<MatchEngine> {
    match s {
        "linear" => Ok(MatchEngine::Linear),
        "backtracking" => Ok(MatchEngine::Backtracking),
        other => Err(anyhow!("Invalid match engine '{}'", other)),
    }
}

fn parse_sink_mode(s: &str) -> Result<SinkMode> {
    match s {
        "streaming" => Ok(SinkMode::Streaming),
        "batch" => Ok(SinkMode::Batch),
        other => Err(anyhow!("Invalid sink mode '{}'", other)),
    }
}
