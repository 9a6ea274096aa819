mod args;
mod output;
mod runner;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Cli, Commands};
use runner::{run_probes, run_replay};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay {
            input,
            probes,
            banner_max_bytes,
            engine,
            sink_mode,
            output_format,
            output,
        } => {
            run_replay(
                input,
                probes,
                banner_max_bytes,
                engine,
                sink_mode,
                output_format,
                output,
            )
            .await?;
        }
        Commands::Probes { file, engine } => {
            run_probes(file, engine)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}
