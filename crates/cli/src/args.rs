use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowprint")]
#[command(version = "0.1.0")]
#[command(about = "Passive service identification from captured flow banners", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay reassembled flow events (JSONL) through the identification engine
    Replay {
        /// Flow events file, one JSON event per line; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Probe database file (nmap-service-probes match subset); builtin set when omitted
        #[arg(long)]
        probes: Option<PathBuf>,

        /// Hard cap on stored banner bytes; longer banners are truncated
        #[arg(long, default_value = "512")]
        banner_max_bytes: usize,

        /// Pattern engine: "linear" is DoS-safe against crafted banners,
        /// "backtracking" supports backreferences
        #[arg(long, default_value = "linear", value_parser = ["linear", "backtracking"])]
        engine: String,

        /// "streaming" emits each record at creation; "batch" flushes once at the end
        #[arg(long, default_value = "batch", value_parser = ["streaming", "batch"])]
        sink_mode: String,

        /// Output format: text, json (JSONL, one record per line)
        #[arg(short = 'f', long, default_value = "text", value_parser = ["text", "json"])]
        output_format: String,

        /// Write json output here instead of stdout (text always prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a probe database file and summarize it
    Probes {
        /// Probe database file; builtin set when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Pattern engine to compile against
        #[arg(long, default_value = "linear", value_parser = ["linear", "backtracking"])]
        engine: String,
    },
}
