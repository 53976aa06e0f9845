use std::io::{Write, stdout};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use hoststat::config::{Config, load_config, load_config_from_path};
use hoststat::format::{process_table, summary_line};
use hoststat::logging;
use hoststat::system::{HostSampler, Snapshot};
use tokio::time::MissedTickBehavior;

#[derive(Parser)]
#[command(
    name = "hoststat",
    about = "Sample host CPU, memory, disk, network and top processes on a fixed cadence"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Polling interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many polls (runs until Ctrl-C if omitted)
    #[arg(long)]
    count: Option<u64>,

    /// Process rows to print per poll in text mode
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Maximum processes kept per snapshot
    #[arg(long)]
    max_processes: Option<usize>,

    /// Emit one JSON object per poll instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log filter, e.g. `debug` or `hoststat=trace`
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli)?;
    logging::init(&config.logging)?;

    run(config, &cli).await
}

async fn run(config: Config, cli: &Cli) -> Result<()> {
    let period = Duration::from_millis(config.general.refresh_rate_ms);
    tracing::info!(
        period_ms = config.general.refresh_rate_ms,
        max_processes = config.sampler.max_processes,
        "starting sampler"
    );
    let mut sampler = HostSampler::host(config.sampler);

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; wait one full period after the
    // primer reads so the first poll measures a real interval.
    ticker.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut polls = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                tracing::info!(polls, "interrupted");
                break;
            }
        }

        let snapshot = sampler.poll();
        emit(&snapshot, cli)?;

        polls += 1;
        if cli.count.is_some_and(|count| polls >= count) {
            break;
        }
    }

    Ok(())
}

fn emit(snapshot: &Snapshot, cli: &Cli) -> Result<()> {
    let mut out = stdout().lock();
    if cli.json {
        serde_json::to_writer(&mut out, snapshot)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", summary_line(snapshot))?;
        if cli.top > 0 {
            for line in process_table(snapshot, cli.top) {
                writeln!(out, "{line}")?;
            }
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(interval) = cli.interval_ms {
        if interval == 0 {
            return Err(eyre!("--interval-ms must be greater than 0"));
        }
        config.general.refresh_rate_ms = interval;
    }
    if let Some(max) = cli.max_processes {
        if max == 0 {
            return Err(eyre!("--max-processes must be greater than 0"));
        }
        config.sampler.max_processes = max;
    }
    if cli.count == Some(0) {
        return Err(eyre!("--count must be greater than 0"));
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    Ok(config.validated())
}
